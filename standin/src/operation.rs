// vim: tw=80
//! Dispatch seams.
//!
//! A mockable type embeds a [`Seam`] and routes each of its mockable methods
//! through an [`Operation`].  The operation looks for an active expectation
//! in the seam's registry and runs the method's original body when there is
//! none, so a type built with [`Seam::detached`] behaves exactly as if it were
//! not mockable at all.
//!
//! ```
//! use standin::*;
//!
//! struct Greeter {
//!     name: String,
//!     seam: Seam,
//! }
//!
//! impl Greeter {
//!     const GREET: Operation<Self, (), String> = Operation::new("greet");
//!
//!     fn greet(&self) -> String {
//!         Self::GREET.call(self, (), |()| format!("hello, {}", self.name))
//!     }
//! }
//!
//! impl Mockable for Greeter {
//!     const OPERATIONS: &'static [&'static str] = &["greet"];
//!     fn seam(&self) -> &Seam { &self.seam }
//! }
//!
//! let registry = Registry::new();
//! let greeter = Greeter { name: "Ann".to_string(), seam: registry.seam() };
//! assert_eq!("hello, Ann", greeter.greet());
//!
//! greeter.expects(Greeter::GREET).returns("hi".to_string());
//! assert_eq!("hi", greeter.greet());
//! ```

use std::{
    fmt,
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering}
};

use crate::{
    error::Error,
    expectation::Expectation,
    matcher::Arguments,
    registry::Registry
};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Identity of one mockable object.
///
/// Unique for the life of the process.  Never derived from the object's
/// address, so moving the object does not change it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        InstanceId(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The dispatch capability a mockable object carries.
///
/// Cloning a seam yields a fresh identity attached to the same registry, so a
/// cloned object never shares expectations with its original.
pub struct Seam {
    id: InstanceId,
    registry: Option<Registry>,
}

impl Seam {
    /// A seam that always runs the original operations.
    pub fn detached() -> Self {
        Seam { id: InstanceId::next(), registry: None }
    }

    /// A seam whose operations can be mocked through `registry`.
    pub fn attached(registry: &Registry) -> Self {
        Seam { id: InstanceId::next(), registry: Some(registry.clone()) }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.registry.is_some()
    }

    /// An owned copy of this seam's identity and registry handle.
    ///
    /// Methods that borrow `self` mutably, or consume it, take the route
    /// before their body runs.
    pub fn route(&self) -> Route {
        Route { id: self.id, registry: self.registry.clone() }
    }
}

impl Clone for Seam {
    fn clone(&self) -> Self {
        Seam { id: InstanceId::next(), registry: self.registry.clone() }
    }
}

impl Default for Seam {
    fn default() -> Self {
        Seam::detached()
    }
}

impl fmt::Debug for Seam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seam")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// See [`Seam::route`].
#[derive(Clone, Debug)]
pub struct Route {
    id: InstanceId,
    registry: Option<Registry>,
}

impl Route {
    pub fn id(&self) -> InstanceId {
        self.id
    }
}

/// A type whose operations can be mocked.
///
/// Usually implemented by [`#[mockable]`](crate::mockable).
pub trait Mockable: 'static {
    /// Names of every operation that may be mocked.
    const OPERATIONS: &'static [&'static str];

    fn seam(&self) -> &Seam;
}

/// Shorthand for mocking through the target's own seam.
pub trait MockableExt: Mockable + Sized {
    /// Mock `operation` on `self`, or fetch its existing expectation.
    ///
    /// # Panics
    ///
    /// If [`try_expects`](#method.try_expects) fails.
    fn expects<I, O, Y>(&self, operation: Operation<Self, I, O, Y>)
        -> Expectation<I, O, Y>
        where I: 'static, O: 'static, Y: 'static
    {
        self.try_expects(operation).unwrap_or_else(|e| e.fail())
    }

    fn try_expects<I, O, Y>(&self, operation: Operation<Self, I, O, Y>)
        -> Result<Expectation<I, O, Y>, Error>
        where I: 'static, O: 'static, Y: 'static
    {
        match self.seam().registry() {
            Some(registry) => registry.try_expects(self, operation),
            None => Err(Error::DetachedTarget {
                target: crate::registry::instance_label::<Self>(
                    self.seam().id()),
                operation: operation.name()
            })
        }
    }
}

impl<T: Mockable> MockableExt for T {}

/// A statically declared, mockable operation of `T`.
///
/// `I` is the operation's argument list, a tuple (or a `Vec` for variadic
/// operations).  `O` is its return type and `Y` the type of the values it
/// hands to a caller-supplied block, if any.
pub struct Operation<T, I, O, Y = ()> {
    name: &'static str,
    _marker: PhantomData<fn(&T, I, Y) -> O>,
}

impl<T, I, O, Y> Operation<T, I, O, Y> {
    pub const fn new(name: &'static str) -> Self {
        Operation { name, _marker: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T, I, O, Y> Operation<T, I, O, Y>
    where T: Mockable, I: Arguments + 'static, O: 'static, Y: 'static
{
    /// Invoke the operation on `target`.
    ///
    /// `original` is the operation's real body.  It runs when nothing mocks
    /// the operation, or when the matching expectation passes through.
    ///
    /// # Panics
    ///
    /// If the expectation rejects the call or is scripted to raise.  A
    /// scripted failure is the panic payload.
    pub fn call<F>(&self, target: &T, args: I, original: F) -> O
        where F: FnOnce(I) -> O
    {
        self.try_call(target, args, original).unwrap_or_else(|e| e.fail())
    }

    pub fn try_call<F>(&self, target: &T, args: I, original: F)
        -> Result<O, Error>
        where F: FnOnce(I) -> O
    {
        let seam = target.seam();
        self.invoke(seam.id, seam.registry(), args, None,
                    |args, _| original(args))
    }

    /// Invoke an operation that may yield to a block.
    ///
    /// # Panics
    ///
    /// Like [`call`](#method.call).
    pub fn call_with_block<F>(&self, target: &T, args: I,
                              block: Option<&mut dyn FnMut(Y)>, original: F)
        -> O
        where F: FnOnce(I, Option<&mut dyn FnMut(Y)>) -> O
    {
        self.try_call_with_block(target, args, block, original)
            .unwrap_or_else(|e| e.fail())
    }

    pub fn try_call_with_block<F>(&self, target: &T, args: I,
                                  block: Option<&mut dyn FnMut(Y)>,
                                  original: F)
        -> Result<O, Error>
        where F: FnOnce(I, Option<&mut dyn FnMut(Y)>) -> O
    {
        let seam = target.seam();
        self.invoke(seam.id, seam.registry(), args, block, original)
    }

    /// Invoke the operation through a [`Route`] taken from the target.
    ///
    /// # Panics
    ///
    /// Like [`call`](#method.call).
    pub fn call_via<F>(&self, route: Route, args: I, original: F) -> O
        where F: FnOnce(I) -> O
    {
        self.try_call_via(route, args, original).unwrap_or_else(|e| e.fail())
    }

    pub fn try_call_via<F>(&self, route: Route, args: I, original: F)
        -> Result<O, Error>
        where F: FnOnce(I) -> O
    {
        self.invoke(route.id, route.registry.as_ref(), args, None,
                    |args, _| original(args))
    }

    fn invoke<F>(&self, id: InstanceId, registry: Option<&Registry>, args: I,
                 block: Option<&mut dyn FnMut(Y)>, original: F)
        -> Result<O, Error>
        where F: FnOnce(I, Option<&mut dyn FnMut(Y)>) -> O
    {
        let expectation = match registry {
            Some(registry) => registry.resolve::<T, I, O, Y>(id, self.name)?,
            None => None
        };
        match expectation {
            Some(expectation) => expectation.dispatch(args, block, original),
            None => Ok(original(args, block))
        }
    }
}

impl<T, I, O, Y> Clone for Operation<T, I, O, Y> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, I, O, Y> Copy for Operation<T, I, O, Y> {}

impl<T, I, O, Y> fmt::Debug for Operation<T, I, O, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation").field(&self.name).finish()
    }
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn cloned_seam_gets_a_new_identity() {
        let registry = Registry::new();
        let a = registry.seam();
        let b = a.clone();
        assert_ne!(a.id(), b.id());
        assert!(b.registry().unwrap().ptr_eq(&registry));
    }

    #[test]
    fn default_seam_is_detached() {
        let seam = Seam::default();
        assert!(!seam.is_attached());
        assert!(seam.route().registry.is_none());
    }

    #[test]
    fn route_keeps_identity() {
        let seam = Registry::new().seam();
        assert_eq!(seam.id(), seam.route().id());
    }

    #[test]
    fn operation_is_copy() {
        struct Nothing;
        const OP: Operation<Nothing, (), ()> = Operation::new("op");
        let a = OP;
        let b = a;
        assert_eq!(a.name(), b.name());
    }
}
