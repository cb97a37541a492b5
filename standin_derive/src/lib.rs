// vim: tw=80
//! Proc Macros for use with standin
//!
//! You probably don't want to use this crate directly.  Instead, use its
//! reexports via the [`standin`](../standin/index.html) crate.

extern crate proc_macro;

mod mockable;
use crate::mockable::do_mockable;

/// Make the methods of an inherent `impl` block mockable.
///
/// The type must embed a `standin::Seam`, in a field named `seam` unless
/// the attribute names another one with `#[mockable(seam = field)]`.
///
/// For every method that takes `self` in any form, the attribute
/// * adds an associated `standin::Operation` constant named after the method
///   in upper case,
/// * reroutes the method through that operation.  The method's original body
///   runs whenever no expectation intercepts the call.
///
/// It also implements `standin::Mockable` for the type, listing every
/// rerouted method.  Only one `impl` block per type may carry the attribute.
/// Methods without a receiver are left alone, and so are methods marked
/// `#[standin(skip)]`.
///
/// # Restrictions
///
/// Mockable methods may not be generic, `async`, `const` or `unsafe`, and
/// their argument and return types may not contain `impl Trait` or
/// references with a lifetime other than `'static`.  Argument types must
/// implement `Debug`, so that mismatched calls can be reported.
///
/// # Examples
/// ```ignore
/// use standin::*;
///
/// struct Counter {
///     count: u32,
///     seam: Seam,
/// }
///
/// #[mockable]
/// impl Counter {
///     pub fn new() -> Self {
///         Counter { count: 0, seam: Seam::detached() }
///     }
///
///     pub fn add(&mut self, n: u32) -> u32 {
///         self.count += n;
///         self.count
///     }
///
///     #[standin(skip)]
///     pub fn count(&self) -> u32 {
///         self.count
///     }
/// }
///
/// let mut counter = Counter::new();
/// assert_eq!(3, counter.add(3));
/// assert_eq!(&["add"], Counter::OPERATIONS);
/// assert_eq!("add", Counter::ADD.name());
/// ```
#[proc_macro_attribute]
pub fn mockable(attrs: proc_macro::TokenStream,
                input: proc_macro::TokenStream)
    -> proc_macro::TokenStream
{
    do_mockable(attrs.into(), input.into()).into()
}
