// vim: tw=80
//! A single mocked operation.
//!
//! An [`Expectation`] is a handle onto shared state.  The registry's table
//! holds one reference, every handle returned to the test holds another, and
//! every copy observes the same configuration and the same call budget.

use cfg_if::cfg_if;
use downcast::*;
use fragile::Fragile;
use std::{
    any::{self, Any as StdAny},
    fmt,
    marker::PhantomData,
    sync::{Arc, Mutex, MutexGuard, PoisonError}
};
use tracing::{debug, trace};

use crate::{
    error::{Error, ScriptedFailure},
    matcher::{ArgumentList, ArgumentSpec, Arguments},
    registry::{Key, Registry}
};

/// Lock a mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How many more calls an expectation will accept.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Budget {
    /// Exactly this many.  `Exactly(0)` rejects every call.
    Exactly(usize),
    /// Any number, including none.  Never decremented.
    Unlimited,
}

impl Budget {
    fn consume(&mut self) {
        if let Budget::Exactly(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Budget::Exactly(1)
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::Exactly(n) => write!(f, "{}", n),
            Budget::Unlimited => f.write_str("unlimited")
        }
    }
}

trait ReturnDefault<O> {
    fn return_default() -> Option<O>;
}

struct DefaultReturner<O: 'static>(PhantomData<O>);

/// The absence value every operation has: `()` for operations returning
/// nothing.
fn unit_default<O: 'static>() -> Option<O> {
    let unit: Box<dyn StdAny> = Box::new(());
    unit.downcast::<O>().ok().map(|o| *o)
}

cfg_if! {
    if #[cfg(feature = "nightly")] {
        impl<O: 'static> ReturnDefault<O> for DefaultReturner<O> {
            default fn return_default() -> Option<O> {
                unit_default()
            }
        }

        impl<O: Default + 'static> ReturnDefault<O> for DefaultReturner<O> {
            fn return_default() -> Option<O> {
                Some(O::default())
            }
        }
    } else {
        impl<O: 'static> ReturnDefault<O> for DefaultReturner<O> {
            fn return_default() -> Option<O> {
                unit_default()
            }
        }
    }
}

/// Return functions for expectations
///
/// Cloned out of the expectation before being called, so a return function
/// may itself call the operation it mocks.
enum Rfunc<I, O> {
    Default,
    Fn(Arc<dyn Fn(I) -> O + Send + Sync>),
}

impl<I, O: 'static> Rfunc<I, O> {
    fn call(&self, args: I) -> Option<O> {
        match self {
            Rfunc::Default => DefaultReturner::<O>::return_default(),
            Rfunc::Fn(f) => Some(f(args))
        }
    }
}

impl<I, O> Clone for Rfunc<I, O> {
    fn clone(&self) -> Self {
        match self {
            Rfunc::Default => Rfunc::Default,
            Rfunc::Fn(f) => Rfunc::Fn(f.clone())
        }
    }
}

struct State<I, Y> {
    expected: Budget,
    remaining: Budget,
    calls: usize,
    args: Arc<ArgumentSpec<I>>,
    raises: Option<ScriptedFailure>,
    yields: Option<Box<dyn Fn() -> Y + Send>>,
    pass_through: bool,
    installed: bool,
}

impl<I, Y> State<I, Y> {
    fn new() -> Self {
        State {
            expected: Budget::default(),
            remaining: Budget::default(),
            calls: 0,
            args: Arc::new(ArgumentSpec::default()),
            raises: None,
            yields: None,
            pass_through: false,
            installed: true
        }
    }
}

pub(crate) struct Inner<I, O, Y> {
    key: Key,
    target: String,
    seq: u64,
    state: Mutex<State<I, Y>>,
    rfunc: Mutex<Rfunc<I, O>>,
}

impl<I, O, Y> Inner<I, O, Y> {
    fn addr(&self) -> *const () {
        self as *const Self as *const ()
    }

    fn verify(&self) -> Result<(), Error> {
        let state = lock(&self.state);
        match state.remaining {
            Budget::Exactly(remaining) if remaining > 0 => {
                Err(Error::VerificationFailed {
                    target: self.target.clone(),
                    operation: self.key.operation,
                    remaining,
                    called: state.calls
                })
            },
            _ => Ok(())
        }
    }

    /// Mark the expectation restored.  Returns whether it was installed.
    fn uninstall(&self) -> bool {
        let mut state = lock(&self.state);
        if !state.installed {
            return false;
        }
        state.installed = false;
        state.remaining = Budget::Unlimited;
        debug!(subject = %self.target, operation = self.key.operation,
               "restored");
        true
    }
}

impl<I: Arguments, O: 'static, Y> Inner<I, O, Y> {
    fn budget_exceeded(&self, state: &State<I, Y>) -> Error {
        debug!(subject = %self.target, operation = self.key.operation,
               "call budget exceeded");
        let expected = match state.expected {
            Budget::Exactly(n) => n,
            Budget::Unlimited => state.calls
        };
        Error::CallBudgetExceeded {
            target: self.target.clone(),
            operation: self.key.operation,
            expected
        }
    }

    /// Match a call and produce its result.
    ///
    /// No lock is held while user code runs: argument matchers, blocks, the
    /// original body and return functions may all call back into this very
    /// expectation.
    fn call<F>(&self, args: I, mut block: Option<&mut dyn FnMut(Y)>,
               original: F) -> Result<O, Error>
        where F: FnOnce(I, Option<&mut dyn FnMut(Y)>) -> O
    {
        let spec = {
            let state = lock(&self.state);
            if state.remaining == Budget::Exactly(0) {
                return Err(self.budget_exceeded(&state));
            }
            state.args.clone()
        };
        if !spec.matches(&args) {
            debug!(subject = %self.target, operation = self.key.operation,
                   "argument mismatch");
            return Err(Error::ArgumentMismatch {
                target: self.target.clone(),
                operation: self.key.operation,
                detail: spec.mismatch(&args)
            });
        }

        let (yielded, raises, pass_through) = {
            let mut state = lock(&self.state);
            // A matcher may have spent the budget in the meantime
            if state.remaining == Budget::Exactly(0) {
                return Err(self.budget_exceeded(&state));
            }
            if state.yields.is_some() && block.is_none() {
                debug!(subject = %self.target, operation = self.key.operation,
                       "no block given");
                return Err(Error::MissingBlock {
                    target: self.target.clone(),
                    operation: self.key.operation
                });
            }
            state.remaining.consume();
            state.calls += 1;
            trace!(subject = %self.target, operation = self.key.operation,
                   calls = state.calls, remaining = %state.remaining,
                   "accepted call");
            (state.yields.as_ref().map(|f| f()),
             state.raises.clone(),
             state.pass_through)
        };

        if let (Some(b), Some(value)) = (block.as_mut(), yielded) {
            b(value);
        }
        if let Some(failure) = raises {
            return Err(Error::Scripted(failure));
        }
        if pass_through {
            return Ok(original(args, block));
        }
        let rfunc = lock(&self.rfunc).clone();
        rfunc.call(args)
            .ok_or_else(|| Error::MissingReturnValue {
                target: self.target.clone(),
                operation: self.key.operation
            })
    }
}

/// Type-erased view of an expectation, as stored in the registry.
pub(crate) trait AnyExpectation: Any + Send {
    fn verify(&self) -> Result<(), Error>;
    fn uninstall(&self);
    fn addr(&self) -> *const ();
    fn seq(&self) -> u64;
    fn signature(&self) -> String;
}
downcast!(dyn AnyExpectation);

pub(crate) struct Slot<I, O, Y>(pub(crate) Arc<Inner<I, O, Y>>);

impl<I, O, Y> AnyExpectation for Slot<I, O, Y>
    where I: 'static, O: 'static, Y: 'static
{
    fn verify(&self) -> Result<(), Error> {
        self.0.verify()
    }

    fn uninstall(&self) {
        self.0.uninstall();
    }

    fn addr(&self) -> *const () {
        self.0.addr()
    }

    fn seq(&self) -> u64 {
        self.0.seq
    }

    fn signature(&self) -> String {
        signature::<I, O, Y>()
    }
}

pub(crate) fn signature<I, O, Y>() -> String {
    format!("{} -> {} (yields {})", any::type_name::<I>(),
            any::type_name::<O>(), any::type_name::<Y>())
}

/// One mocked operation on one target, or on every instance of a type.
///
/// Obtained from [`Registry::expects`] or [`MockableExt::expects`].  Every
/// configuration method consumes and returns the handle, so a test can chain
/// them:
///
/// ```
/// # use standin::*;
/// # struct Greeter { seam: Seam }
/// # impl Greeter {
/// #     const GREET: Operation<Self, (), String> = Operation::new("greet");
/// # }
/// # impl Mockable for Greeter {
/// #     const OPERATIONS: &'static [&'static str] = &["greet"];
/// #     fn seam(&self) -> &Seam { &self.seam }
/// # }
/// let registry = Registry::new();
/// let greeter = Greeter { seam: registry.seam() };
/// greeter.expects(Greeter::GREET)
///     .times(2)
///     .returns("hi".to_string());
/// ```
///
/// Unless configured otherwise an expectation accepts exactly one call with no
/// arguments.
///
/// [`MockableExt::expects`]: crate::MockableExt::expects
pub struct Expectation<I, O, Y = ()> {
    inner: Arc<Inner<I, O, Y>>,
    registry: Registry,
}

impl<I, O, Y> Expectation<I, O, Y>
    where I: 'static, O: 'static, Y: 'static
{
    pub(crate) fn new(key: Key, target: String, seq: u64, registry: Registry)
        -> Self
    {
        let inner = Arc::new(Inner {
            key,
            target,
            seq,
            state: Mutex::new(State::new()),
            rfunc: Mutex::new(Rfunc::Default)
        });
        Expectation { inner, registry }
    }

    pub(crate) fn from_slot(slot: &Slot<I, O, Y>, registry: Registry) -> Self {
        Expectation { inner: slot.0.clone(), registry }
    }

    pub(crate) fn slot(&self) -> Box<dyn AnyExpectation> {
        Box::new(Slot(self.inner.clone()))
    }

    /// Accept only calls whose arguments match these per-position tokens.
    ///
    /// ```
    /// # use standin::*;
    /// # struct Scale { seam: Seam }
    /// # impl Scale {
    /// #     const WEIGH: Operation<Self, (u32, &'static str), f64> =
    /// #         Operation::new("weigh");
    /// # }
    /// # impl Mockable for Scale {
    /// #     const OPERATIONS: &'static [&'static str] = &["weigh"];
    /// #     fn seam(&self) -> &Seam { &self.seam }
    /// # }
    /// # let registry = Registry::new();
    /// # let scale = Scale { seam: registry.seam() };
    /// scale.expects(Scale::WEIGH)
    ///     .with((within(1u32..10), eq("kg")))
    ///     .returns(2.5);
    /// ```
    pub fn with<L>(self, list: L) -> Self
        where L: ArgumentList<I> + Send + Sync + 'static
    {
        lock(&self.inner.state).args = Arc::new(ArgumentSpec::list(list));
        self
    }

    /// Accept only calls for which `f` returns `true`.
    pub fn withf<F>(self, f: F) -> Self
        where F: Fn(&I) -> bool + Send + Sync + 'static
    {
        lock(&self.inner.state).args = Arc::new(ArgumentSpec::predicate(f));
        self
    }

    /// Return a clone of `value` from every call.
    pub fn returns(self, value: O) -> Self
        where O: Clone + Send
    {
        let value = Mutex::new(value);
        self.returning(move |_| lock(&value).clone())
    }

    /// Supply a closure that will provide the return value.  The operation's
    /// arguments are passed to the closure by value.
    ///
    /// The closure may call the mocked operation again, so it is shared
    /// rather than borrowed mutably.  Keep any state it needs behind a
    /// `Mutex` or an atomic.
    pub fn returning<F>(self, f: F) -> Self
        where F: Fn(I) -> O + Send + Sync + 'static
    {
        *lock(&self.inner.rfunc) = Rfunc::Fn(Arc::new(f));
        self
    }

    /// Single-threaded version of [`returning`](#method.returning).  Can be
    /// used when the closure or the return type isn't `Send`.
    ///
    /// It is a runtime error to call the mocked operation from a different
    /// thread than the one that configured it.
    pub fn returning_st<F>(self, f: F) -> Self
        where F: Fn(I) -> O + 'static
    {
        let fragile = Fragile::new(f);
        let f = move |i: I| {
            (fragile.get())(i)
        };
        *lock(&self.inner.rfunc) = Rfunc::Fn(Arc::new(f));
        self
    }

    /// Fail every accepted call with `failure`.
    pub fn raises(self, failure: impl Into<ScriptedFailure>) -> Self {
        lock(&self.inner.state).raises = Some(failure.into());
        self
    }

    /// Hand a clone of `value` to the caller's block on every accepted call.
    ///
    /// Calls that supply no block are then rejected.
    pub fn yields(self, value: Y) -> Self
        where Y: Clone + Send
    {
        lock(&self.inner.state).yields = Some(Box::new(move || value.clone()));
        self
    }

    /// Require exactly `n` calls.
    pub fn times(self, n: usize) -> Self {
        self.budget(Budget::Exactly(n))
    }

    /// Forbid calls altogether.
    pub fn never(self) -> Self {
        self.times(0)
    }

    /// Require exactly one call.  This is the default.
    pub fn once(self) -> Self {
        self.times(1)
    }

    /// Accept any number of calls, including none.
    pub fn any_time(self) -> Self {
        self.budget(Budget::Unlimited)
    }

    /// Run the operation's original body for every accepted call.
    pub fn pass_through(self) -> Self {
        lock(&self.inner.state).pass_through = true;
        self
    }

    fn budget(self, budget: Budget) -> Self {
        {
            let mut state = lock(&self.inner.state);
            state.expected = budget;
            state.remaining = budget;
        }
        self
    }

    /// Check that the expectation received every call it requires.
    pub fn verify(&self) -> Result<&Self, Error> {
        self.inner.verify()?;
        Ok(self)
    }

    /// Take the expectation out of dispatch.
    ///
    /// Afterwards the operation runs its original body again and the handle
    /// accepts any number of calls.  Restoring twice does nothing.
    pub fn restore(&self) -> &Self {
        if self.inner.uninstall() {
            self.registry.forget(&self.inner.key, self.inner.addr());
        }
        self
    }

    /// Match a call against this expectation and produce its result.
    pub(crate) fn dispatch<F>(&self, args: I, block: Option<&mut dyn FnMut(Y)>,
                              original: F) -> Result<O, Error>
        where I: Arguments, F: FnOnce(I, Option<&mut dyn FnMut(Y)>) -> O
    {
        self.inner.call(args, block, original)
    }
}

impl<I, O, Y> Expectation<I, O, Y> {
    /// Do both handles refer to the same expectation?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Has the expectation not been restored yet?
    ///
    /// [`Registry::clear`] forgets expectations without restoring them, so a
    /// handle obtained before a `clear` still reports `true` here.  Use
    /// [`is_active`](#method.is_active) to ask whether calls still reach it.
    pub fn is_installed(&self) -> bool {
        lock(&self.inner.state).installed
    }

    /// Does dispatch currently reach this expectation?
    pub fn is_active(&self) -> bool {
        self.registry.holds(&self.inner.key, self.inner.addr())
    }

    /// Whether the expectation applies to every instance of a type.
    pub fn is_any_instance(&self) -> bool {
        self.inner.key.is_any_instance()
    }

    pub fn remaining(&self) -> Budget {
        lock(&self.inner.state).remaining
    }

    /// How many calls were accepted so far.
    pub fn calls(&self) -> usize {
        lock(&self.inner.state).calls
    }

    pub fn operation(&self) -> &'static str {
        self.inner.key.operation
    }

    /// `Type#id` for an instance expectation, `Type` for an any-instance one.
    pub fn target(&self) -> &str {
        &self.inner.target
    }
}

impl<I, O, Y> Clone for Expectation<I, O, Y> {
    fn clone(&self) -> Self {
        Expectation {
            inner: self.inner.clone(),
            registry: self.registry.clone()
        }
    }
}

impl<I, O, Y> fmt::Debug for Expectation<I, O, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Expectation")
            .field("target", &self.inner.target)
            .field("operation", &self.inner.key.operation)
            .field("remaining", &state.remaining)
            .field("args", &state.args)
            .field("installed", &state.installed)
            .finish()
    }
}
