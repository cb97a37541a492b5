// vim: tw=80
//! Glue between a test runner and the registry.

use std::{
    panic::{self, AssertUnwindSafe},
    thread
};
use tracing::debug;

use crate::{error::TeardownError, registry::Registry};

/// Drives a [`Registry`] through the life of one test.
///
/// A test harness with setup and teardown hooks calls
/// [`on_test_start`](#method.on_test_start) and
/// [`on_test_end`](#method.on_test_end).  Plain `#[test]` functions can wrap
/// their body in [`run`](#method.run), or hold the guard returned by
/// [`begin`](#method.begin).
///
/// ```
/// # use standin::*;
/// # struct Greeter { seam: Seam }
/// # impl Greeter {
/// #     const GREET: Operation<Self, (), String> = Operation::new("greet");
/// #     fn greet(&self) -> String {
/// #         Self::GREET.call(self, (), |()| "hello".to_string())
/// #     }
/// # }
/// # impl Mockable for Greeter {
/// #     const OPERATIONS: &'static [&'static str] = &["greet"];
/// #     fn seam(&self) -> &Seam { &self.seam }
/// # }
/// let lifecycle = Lifecycle::new();
/// let greeting = lifecycle.run(|registry| {
///     let greeter = Greeter { seam: registry.seam() };
///     greeter.expects(Greeter::GREET).returns("hi".to_string());
///     greeter.greet()
/// });
/// assert_eq!("hi", greeting);
/// assert!(lifecycle.registry().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Lifecycle {
    registry: Registry,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Registry) -> Self {
        Lifecycle { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Forget anything a previous test left behind, without verifying it.
    pub fn on_test_start(&self) {
        debug!("test starting");
        self.registry.clear();
    }

    /// Verify every expectation if the test passed, then restore them all.
    pub fn on_test_end(&self, passed: bool) -> Result<(), TeardownError> {
        debug!(passed, "test finished");
        self.registry.teardown(passed)
    }

    /// Run a test body between the start and end hooks.
    ///
    /// # Panics
    ///
    /// Re-raises the body's panic after teardown.  If the body returns
    /// normally, panics when any expectation fails verification.
    pub fn run<F, R>(&self, body: F) -> R
        where F: FnOnce(&Registry) -> R
    {
        self.on_test_start();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            body(&self.registry)
        }));
        let teardown = self.on_test_end(outcome.is_ok());
        match outcome {
            Ok(r) => {
                if let Err(e) = teardown {
                    panic!("{}", e);
                }
                r
            },
            Err(payload) => panic::resume_unwind(payload)
        }
    }

    /// Start a test.  The returned guard ends it when dropped.
    pub fn begin(&self) -> TestGuard {
        self.on_test_start();
        TestGuard { registry: self.registry.clone() }
    }
}

/// Ends a test when dropped.
///
/// If the thread is already panicking the test is considered failed: nothing
/// is verified, but every expectation is still restored.  Otherwise a
/// verification failure panics.
#[must_use = "the test ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TestGuard {
    registry: Registry,
}

impl TestGuard {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        let passed = !thread::panicking();
        debug!(passed, "test finished");
        if let Err(e) = self.registry.teardown(passed) {
            panic!("{}", e);
        }
    }
}
