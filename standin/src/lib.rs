// vim: tw=80
//! Expectation-based test doubles for real objects.
//!
//! Standin replaces a single operation of a real object, or of every instance
//! of a type, with a substitute that checks its arguments, counts its calls
//! and returns, raises or yields whatever the test scripted.  When the test is
//! over the original operation is restored.  Everything else about the object
//! keeps working as usual.
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Matching arguments`](#matching-arguments)
//! * [`Call counts`](#call-counts)
//! * [`Return values`](#return-values)
//! * [`Failures and blocks`](#failures-and-blocks)
//! * [`Every instance of a type`](#every-instance-of-a-type)
//! * [`Test lifecycle`](#test-lifecycle)
//! * [`Crate features`](#crate-features)
//!
//! ## Getting Started
//!
//! A mockable type embeds a [`Seam`] and marks the `impl` block whose methods
//! may be mocked with [`#[mockable]`](mockable).  Each method gets an
//! [`Operation`] constant named after it.  Production code builds its objects
//! with a detached seam; tests attach them to a [`Registry`].
//!
//! ```
//! use standin::*;
//!
//! struct Greeter {
//!     name: String,
//!     seam: Seam,
//! }
//!
//! #[mockable]
//! impl Greeter {
//!     pub fn greet(&self) -> String {
//!         format!("hello, {}", self.name)
//!     }
//! }
//!
//! let registry = Registry::new();
//! let greeter = Greeter { name: "Ann".to_string(), seam: registry.seam() };
//! greeter.expects(Greeter::GREET).returns("hi".to_string());
//! assert_eq!("hi", greeter.greet());
//!
//! // Verify and restore
//! registry.teardown(true).unwrap();
//! assert_eq!("hello, Ann", greeter.greet());
//! ```
//!
//! Requesting the same operation on the same object twice returns the same
//! [`Expectation`], so a test may configure it in several steps.
//!
//! ## Matching arguments
//!
//! By default an expectation only accepts calls without arguments.
//! [`with`](Expectation::with) takes one token per argument: [`eq`],
//! [`within`], [`is_a`], `like` (regular expressions), [`any`], or any
//! [`Predicate`] from the `predicates` crate.
//! [`withf`](Expectation::withf) takes a closure over the whole argument list
//! instead.
//!
//! ```
//! # use standin::*;
//! # struct Scale { seam: Seam }
//! #[mockable]
//! impl Scale {
//!     fn weigh(&self, grams: u32, unit: &'static str) -> f64 {
//!         // ...
//! #       0.0
//!     }
//! }
//! # let registry = Registry::new();
//! # let scale = Scale { seam: registry.seam() };
//! scale.expects(Scale::WEIGH)
//!     .with((within(1000u32..2000), eq("kg")))
//!     .returns(1.5);
//! assert_eq!(1.5, scale.weigh(1500, "kg"));
//! ```
//!
//! A call whose arguments do not match fails the test with a message naming
//! the object, the operation, and the expected and actual arguments.
//!
//! ## Call counts
//!
//! An expectation accepts exactly one call unless told otherwise with
//! [`times`](Expectation::times), [`once`](Expectation::once),
//! [`never`](Expectation::never) or [`any_time`](Expectation::any_time).
//! Surplus calls fail immediately.  Missing calls are reported by
//! [`verify`](Expectation::verify), which [`Registry::teardown`] runs for
//! every expectation.
//!
//! ## Return values
//!
//! [`returns`](Expectation::returns) returns a clone of a fixed value, and
//! [`returning`](Expectation::returning) computes one from the arguments.
//! [`pass_through`](Expectation::pass_through) runs the original operation
//! while still checking arguments and counting calls.  Operations returning
//! `()` need no return value at all.  With the `nightly` feature, so do
//! operations whose return type implements `Default`.
//!
//! ## Failures and blocks
//!
//! [`raises`](Expectation::raises) makes every accepted call fail with a
//! [`ScriptedFailure`].  Called through [`Operation::call`] (and therefore
//! through `#[mockable]` methods) the failure becomes the panic payload;
//! [`Operation::try_call`] returns it as [`Error::Scripted`].
//!
//! Operations invoked through [`Operation::call_with_block`] may hand values
//! to a caller-supplied block.  [`yields`](Expectation::yields) configures the
//! value; calls without a block are then rejected.
//!
//! ## Every instance of a type
//!
//! [`Registry::any_instance`] mocks an operation for every object of a type
//! that is attached to the registry, including objects created later.  An
//! object's own expectation for the same operation takes precedence.
//!
//! ## Test lifecycle
//!
//! [`Lifecycle`] connects a registry to a test: it clears leftovers when a
//! test starts and, when it ends, verifies every expectation if the test
//! passed and restores them all regardless.
//!
//! ```
//! # use standin::*;
//! struct Clock {
//!     seam: Seam,
//! }
//!
//! #[mockable]
//! impl Clock {
//!     fn now(&self) -> u64 {
//!         // ...
//! #       1_700_000_000
//!     }
//! }
//!
//! let lifecycle = Lifecycle::new();
//! let now = lifecycle.run(|registry| {
//!     let clock = Clock { seam: registry.seam() };
//!     clock.expects(Clock::NOW).returns(0);
//!     clock.now()
//! });
//! assert_eq!(0, now);
//! assert!(lifecycle.registry().is_empty());
//! ```
//!
//! A test may instead hold the guard returned by [`Lifecycle::begin`], which
//! ends the test when it is dropped.
//!
//! ## Crate features
//!
//! * `regex` (default): the `like` argument token.
//! * `nightly`: default return values for every `Default` type.  Requires a
//!   nightly compiler.

#![cfg_attr(feature = "nightly", feature(specialization))]
#![cfg_attr(feature = "nightly", allow(incomplete_features))]

mod error;
mod expectation;
mod lifecycle;
pub mod matcher;
mod operation;
mod registry;

pub use error::{Error, ScriptedFailure, TeardownError};
pub use expectation::{Budget, Expectation};
pub use lifecycle::{Lifecycle, TestGuard};
pub use operation::{
    InstanceId,
    Mockable,
    MockableExt,
    Operation,
    Route,
    Seam
};
pub use registry::{AnyInstance, Registry};

pub use matcher::{any, eq, is_a, within, ArgumentList, ArgumentSpec, Arguments};
#[cfg(feature = "regex")]
pub use matcher::like;
pub use predicates::prelude::{
    predicate,
    Predicate,
    PredicateBooleanExt,
    PredicateBoxExt
};
pub use standin_derive::mockable;
