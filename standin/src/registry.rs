// vim: tw=80
//! The table of active expectations.
//!
//! Every entry is keyed by the target it applies to (one instance, or every
//! instance of a type) and the operation's name.  An entry's presence in the
//! table is what redirects dispatch: [`Operation`](crate::Operation)
//! consults the table on every call and runs the original body when it finds
//! nothing.

use std::{
    any::{self, TypeId},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    mem,
    sync::{Arc, Mutex}
};
use tracing::debug;

use crate::{
    error::{Error, TeardownError},
    expectation::{lock, signature, AnyExpectation, Expectation, Slot},
    operation::{InstanceId, Mockable, Operation, Seam}
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Scope {
    Instance(InstanceId),
    AnyInstance(TypeId),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct Key {
    pub(crate) scope: Scope,
    pub(crate) operation: &'static str,
}

impl Key {
    pub(crate) fn instance(id: InstanceId, operation: &'static str) -> Self {
        Key { scope: Scope::Instance(id), operation }
    }

    pub(crate) fn any_instance<T: 'static>(operation: &'static str) -> Self {
        Key { scope: Scope::AnyInstance(TypeId::of::<T>()), operation }
    }

    pub(crate) fn is_any_instance(&self) -> bool {
        matches!(self.scope, Scope::AnyInstance(_))
    }
}

/// The bare name of a type, without its module path.
pub(crate) fn type_label<T: ?Sized>() -> &'static str {
    let name = any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    let start = base.rfind("::").map_or(0, |i| i + 2);
    &name[start..]
}

pub(crate) fn instance_label<T: ?Sized>(id: InstanceId) -> String {
    format!("{}#{}", type_label::<T>(), id)
}

#[derive(Default)]
struct Table {
    /// Installation order, used by teardown.
    next_seq: u64,
    entries: HashMap<Key, Box<dyn AnyExpectation>>,
}

/// Holds every active expectation of one test.
///
/// Cloning a `Registry` yields another handle onto the same table.  Targets
/// reach the registry through the [`Seam`] they were built with, so a test
/// usually creates one registry, hands [`Registry::seam`] to the objects it
/// wants to mock, and tears the registry down when it is done.  The
/// [`Lifecycle`](crate::Lifecycle) adapter does the last part.
#[derive(Clone, Default)]
pub struct Registry {
    table: Arc<Mutex<Table>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a seam for a new target, attached to this registry.
    pub fn seam(&self) -> Seam {
        Seam::attached(self)
    }

    /// Do both handles refer to the same table?
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    /// Mock `operation` on `target`, or fetch its existing expectation.
    ///
    /// # Panics
    ///
    /// If [`try_expects`](#method.try_expects) fails.
    pub fn expects<T, I, O, Y>(&self, target: &T,
                               operation: Operation<T, I, O, Y>)
        -> Expectation<I, O, Y>
        where T: Mockable, I: 'static, O: 'static, Y: 'static
    {
        self.try_expects(target, operation).unwrap_or_else(|e| e.fail())
    }

    /// Mock `operation` on `target`, or fetch its existing expectation.
    ///
    /// Requesting the same operation on the same target twice returns two
    /// handles onto the same expectation.
    pub fn try_expects<T, I, O, Y>(&self, target: &T,
                                   operation: Operation<T, I, O, Y>)
        -> Result<Expectation<I, O, Y>, Error>
        where T: Mockable, I: 'static, O: 'static, Y: 'static
    {
        let seam = target.seam();
        let label = instance_label::<T>(seam.id());
        let name = operation.name();
        if !T::OPERATIONS.contains(&name) {
            return Err(Error::NoSuchOperation {
                target: label,
                operation: name
            });
        }
        if !seam.registry().map_or(false, |r| r.ptr_eq(self)) {
            return Err(Error::DetachedTarget {
                target: label,
                operation: name
            });
        }
        self.install(Key::instance(seam.id(), name), label)
    }

    /// Mock operations on every instance of `T`.
    ///
    /// Instance expectations take precedence: an instance with an expectation
    /// of its own for an operation never reaches the any-instance one.
    pub fn any_instance<T: Mockable>(&self) -> AnyInstance<'_, T> {
        AnyInstance { registry: self, _marker: PhantomData }
    }

    fn install<I, O, Y>(&self, key: Key, target: String)
        -> Result<Expectation<I, O, Y>, Error>
        where I: 'static, O: 'static, Y: 'static
    {
        let mut table = lock(&self.table);
        if let Some(entry) = table.entries.get(&key) {
            return match entry.downcast_ref::<Slot<I, O, Y>>() {
                Ok(slot) => Ok(Expectation::from_slot(slot, self.clone())),
                Err(_) => Err(Error::SignatureMismatch {
                    target,
                    operation: key.operation,
                    detail: format!("mocked as {}, requested as {}",
                                    entry.signature(), signature::<I, O, Y>())
                })
            };
        }
        let seq = table.next_seq;
        table.next_seq += 1;
        let expectation = Expectation::new(key, target, seq, self.clone());
        table.entries.insert(key, expectation.slot());
        debug!(subject = %expectation.target(), operation = key.operation,
               "installed");
        Ok(expectation)
    }

    /// Find the expectation a call of `operation` on instance `id` should be
    /// matched against.
    pub(crate) fn resolve<T, I, O, Y>(&self, id: InstanceId,
                                      operation: &'static str)
        -> Result<Option<Expectation<I, O, Y>>, Error>
        where T: 'static, I: 'static, O: 'static, Y: 'static
    {
        let table = lock(&self.table);
        let keys = [Key::instance(id, operation),
                    Key::any_instance::<T>(operation)];
        for key in keys.iter() {
            if let Some(entry) = table.entries.get(key) {
                return entry.downcast_ref::<Slot<I, O, Y>>()
                    .map(|slot| Some(Expectation::from_slot(slot, self.clone())))
                    .map_err(|_| Error::SignatureMismatch {
                        target: instance_label::<T>(id),
                        operation,
                        detail: format!("mocked as {}, called as {}",
                                        entry.signature(),
                                        signature::<I, O, Y>())
                    });
            }
        }
        Ok(None)
    }

    /// Remove `key`'s entry, but only if it is still the expectation at
    /// `addr`.
    pub(crate) fn forget(&self, key: &Key, addr: *const ()) {
        let removed = {
            let mut table = lock(&self.table);
            let current = table.entries.get(key)
                .map_or(false, |entry| entry.addr() == addr);
            if current {
                table.entries.remove(key)
            } else {
                None
            }
        };
        drop(removed);
    }

    /// Is the entry for `key` the expectation at `addr`?
    pub(crate) fn holds(&self, key: &Key, addr: *const ()) -> bool {
        lock(&self.table).entries.get(key)
            .map_or(false, |entry| entry.addr() == addr)
    }

    /// Is `operation` currently mocked on this very instance?
    pub fn is_mocked<T: Mockable>(&self, target: &T, operation: &str) -> bool {
        let scope = Scope::Instance(target.seam().id());
        lock(&self.table).entries.keys()
            .any(|k| k.scope == scope && k.operation == operation)
    }

    /// How many expectations are active.
    pub fn len(&self) -> usize {
        lock(&self.table).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every expectation without verifying or restoring any of them.
    ///
    /// Handles obtained earlier keep their state, and still report
    /// [`is_installed`](crate::Expectation::is_installed), but no longer take
    /// part in dispatch: their
    /// [`is_active`](crate::Expectation::is_active) turns `false`.
    pub fn clear(&self) {
        let entries = mem::take(&mut lock(&self.table).entries);
        debug!(expectations = entries.len(), "cleared");
    }

    /// Verify and restore every expectation.
    ///
    /// Expectations are processed in installation order.  With
    /// `should_verify` unset (the test already failed) nothing is verified.
    /// Every expectation is restored regardless of verification failures,
    /// which are collected into the returned error.
    pub fn teardown(&self, should_verify: bool) -> Result<(), TeardownError> {
        let mut entries = mem::take(&mut lock(&self.table).entries)
            .into_values()
            .collect::<Vec<_>>();
        entries.sort_by_key(|e| e.seq());
        let mut failures = Vec::new();
        for entry in entries.iter() {
            if should_verify {
                if let Err(e) = entry.verify() {
                    failures.push(e);
                }
            }
            entry.uninstall();
        }
        debug!(expectations = entries.len(), failures = failures.len(),
               "teardown");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TeardownError::new(failures))
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("expectations", &self.len())
            .finish()
    }
}

/// Builder for expectations that apply to every instance of `T`.
///
/// Obtained from [`Registry::any_instance`].
pub struct AnyInstance<'a, T> {
    registry: &'a Registry,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Mockable> AnyInstance<'a, T> {
    /// Mock `operation` on every instance of `T`.
    ///
    /// # Panics
    ///
    /// If [`try_expects`](#method.try_expects) fails.
    pub fn expects<I, O, Y>(&self, operation: Operation<T, I, O, Y>)
        -> Expectation<I, O, Y>
        where I: 'static, O: 'static, Y: 'static
    {
        self.try_expects(operation).unwrap_or_else(|e| e.fail())
    }

    pub fn try_expects<I, O, Y>(&self, operation: Operation<T, I, O, Y>)
        -> Result<Expectation<I, O, Y>, Error>
        where I: 'static, O: 'static, Y: 'static
    {
        let name = operation.name();
        if !T::OPERATIONS.contains(&name) {
            return Err(Error::NoSuchOperation {
                target: type_label::<T>().to_string(),
                operation: name
            });
        }
        self.registry.install(Key::any_instance::<T>(name),
                              type_label::<T>().to_string())
    }

    /// Is `operation` currently mocked for every instance of `T`?
    pub fn is_mocked(&self, operation: &str) -> bool {
        let scope = Scope::AnyInstance(TypeId::of::<T>());
        lock(&self.registry.table).entries.keys()
            .any(|k| k.scope == scope && k.operation == operation)
    }
}

#[cfg(test)]
mod t {
    use super::*;

    mod app {
        pub struct Item;
        pub struct Wrapper<T>(pub T);
    }

    #[test]
    fn type_label_strips_module_path() {
        assert_eq!("Item", type_label::<app::Item>());
        assert_eq!("u32", type_label::<u32>());
    }

    #[test]
    fn type_label_keeps_generic_arguments() {
        let label = type_label::<app::Wrapper<app::Item>>();
        assert!(label.starts_with("Wrapper<"), "{}", label);
        assert!(label.ends_with("Item>"), "{}", label);
    }

    #[test]
    fn empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        registry.clear();
        assert!(registry.teardown(true).is_ok());
    }

    #[test]
    fn clones_share_a_table() {
        let a = Registry::new();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Registry::new()));
    }
}
