// vim: tw=80
//! Argument matching.
//!
//! An expectation accepts a call when its [`ArgumentSpec`] matches the call's
//! argument list.  Argument lists are tuples for operations with a fixed
//! arity, or a `Vec` for variadic operations.  A spec is either an ordered
//! list of per-position tokens, a predicate over the whole argument list, or
//! the default "no arguments at all".
//!
//! Tokens are [`Predicate`]s.  Besides everything in the `predicates` crate,
//! this module provides tokens with compact, `Debug`-style descriptions:
//!
//! * [`eq`] accepts an equal value,
//! * [`is_a`] accepts a boxed `Any` holding a given type,
//! * [`within`] accepts a value inside a range,
//! * `like` accepts strings matching a regular expression (feature `regex`),
//! * [`any`] accepts everything.
//!
//! Equality and pattern tokens can be combined with
//! [`PredicateBooleanExt::or`](predicates::prelude::PredicateBooleanExt::or),
//! which tries the left-hand token first.
//!
//! ```
//! # use standin::matcher::*;
//! let spec = ArgumentSpec::list((eq(1u32), within(10u32..20), any()));
//! assert!(spec.matches(&(1u32, 15u32, "anything")));
//! assert!(!spec.matches(&(1u32, 25u32, "anything")));
//! assert_eq!("[1, 10..20, _]", spec.describe());
//! ```

use cfg_if::cfg_if;
use std::{
    any::{self, Any},
    fmt::{self, Debug, Display},
    marker::PhantomData,
    ops::RangeBounds
};

use predicates::reflection::PredicateReflection;
use predicates_tree::CaseTreeExt;

pub use predicates::prelude::Predicate;

/// An argument list, as seen by the matcher.
///
/// Implemented for tuples of up to eight `Debug` values and for `Vec`s of
/// `Debug` values.
pub trait Arguments {
    /// How many arguments there are
    fn arity(&self) -> usize;

    /// The `Debug` representation of each argument
    fn render(&self) -> Vec<String>;
}

impl Arguments for () {
    fn arity(&self) -> usize {
        0
    }

    fn render(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<A: Debug> Arguments for Vec<A> {
    fn arity(&self) -> usize {
        self.len()
    }

    fn render(&self) -> Vec<String> {
        self.iter().map(|a| format!("{:?}", a)).collect()
    }
}

/// An ordered list of expected tokens, one per argument position.
///
/// Implemented for tuples of [`Predicate`]s matching tuples of arguments,
/// and for a `Vec` of predicates matching a variadic `Vec` of arguments.
pub trait ArgumentList<I> {
    /// Does every position accept its argument?
    fn matches(&self, args: &I) -> bool;

    /// Description of every position's token
    fn expected(&self) -> Vec<String>;

    /// Explanations for the positions that rejected their argument
    fn explain(&self, args: &I) -> Vec<String>;
}

impl ArgumentList<()> for () {
    fn matches(&self, _args: &()) -> bool {
        true
    }

    fn expected(&self) -> Vec<String> {
        Vec::new()
    }

    fn explain(&self, _args: &()) -> Vec<String> {
        Vec::new()
    }
}

impl<A, P: Predicate<A>> ArgumentList<Vec<A>> for Vec<P> {
    fn matches(&self, args: &Vec<A>) -> bool {
        self.len() == args.len() &&
            self.iter().zip(args.iter()).all(|(p, a)| p.eval(a))
    }

    fn expected(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }

    fn explain(&self, args: &Vec<A>) -> Vec<String> {
        if self.len() != args.len() {
            return vec![format!("expected {} argument(s), got {}",
                                self.len(), args.len())];
        }
        self.iter()
            .zip(args.iter())
            .enumerate()
            .filter_map(|(i, (p, a))| {
                p.find_case(false, a)
                    .map(|case| format!("argument {}: {}", i, case.tree()))
            }).collect()
    }
}

macro_rules! tuple_arguments {
    ($($a:ident $p:ident $idx:tt),+) => {
        impl<$($a: Debug),+> Arguments for ($($a,)+) {
            fn arity(&self) -> usize {
                [$(stringify!($a)),+].len()
            }

            fn render(&self) -> Vec<String> {
                vec![$(format!("{:?}", self.$idx)),+]
            }
        }

        impl<$($a,)+ $($p),+> ArgumentList<($($a,)+)> for ($($p,)+)
            where $($p: Predicate<$a>),+
        {
            fn matches(&self, args: &($($a,)+)) -> bool {
                true $(&& self.$idx.eval(&args.$idx))+
            }

            fn expected(&self) -> Vec<String> {
                vec![$(self.$idx.to_string()),+]
            }

            fn explain(&self, args: &($($a,)+)) -> Vec<String> {
                let mut explanations = Vec::new();
                $(
                    if let Some(case) = self.$idx.find_case(false, &args.$idx) {
                        explanations.push(
                            format!("argument {}: {}", $idx, case.tree()));
                    }
                )+
                explanations
            }
        }
    }
}

tuple_arguments!{A0 P0 0}
tuple_arguments!{A0 P0 0, A1 P1 1}
tuple_arguments!{A0 P0 0, A1 P1 1, A2 P2 2}
tuple_arguments!{A0 P0 0, A1 P1 1, A2 P2 2, A3 P3 3}
tuple_arguments!{A0 P0 0, A1 P1 1, A2 P2 2, A3 P3 3, A4 P4 4}
tuple_arguments!{A0 P0 0, A1 P1 1, A2 P2 2, A3 P3 3, A4 P4 4, A5 P5 5}
tuple_arguments!{A0 P0 0, A1 P1 1, A2 P2 2, A3 P3 3, A4 P4 4, A5 P5 5,
                 A6 P6 6}
tuple_arguments!{A0 P0 0, A1 P1 1, A2 P2 2, A3 P3 3, A4 P4 4, A5 P5 5,
                 A6 P6 6, A7 P7 7}

/// What an expectation requires of a call's arguments.
pub enum ArgumentSpec<I> {
    /// The call must have no arguments.  This is the default.
    Nothing,
    /// Every position must match its token.
    List(Box<dyn ArgumentList<I> + Send + Sync>),
    /// The predicate must return `true` for the whole argument list.
    Predicate(Box<dyn Fn(&I) -> bool + Send + Sync>),
}

impl<I> ArgumentSpec<I> {
    pub fn list<L>(list: L) -> Self
        where L: ArgumentList<I> + Send + Sync + 'static
    {
        ArgumentSpec::List(Box::new(list))
    }

    pub fn predicate<F>(f: F) -> Self
        where F: Fn(&I) -> bool + Send + Sync + 'static
    {
        ArgumentSpec::Predicate(Box::new(f))
    }

    /// Human-readable form of the expected arguments, eg `[1, None, 2]`.
    pub fn describe(&self) -> String {
        match self {
            ArgumentSpec::Nothing => bracket(Vec::new()),
            ArgumentSpec::List(list) => bracket(list.expected()),
            ArgumentSpec::Predicate(_) => "<argument predicate>".to_string()
        }
    }
}

impl<I: Arguments> ArgumentSpec<I> {
    /// Does this spec accept `args`?
    pub fn matches(&self, args: &I) -> bool {
        match self {
            ArgumentSpec::Nothing => args.arity() == 0,
            ArgumentSpec::List(list) => list.matches(args),
            ArgumentSpec::Predicate(f) => f(args)
        }
    }

    /// Explain why `args` were rejected.
    pub fn mismatch(&self, args: &I) -> String {
        let actual = bracket(args.render());
        match self {
            ArgumentSpec::Predicate(_) => {
                format!("argument predicate returned false for {}", actual)
            },
            ArgumentSpec::Nothing => {
                format!("wrong arguments {}\nexpected []", actual)
            },
            ArgumentSpec::List(list) => {
                let mut msg = format!("wrong arguments {}\nexpected {}",
                                      actual, bracket(list.expected()));
                for explanation in list.explain(args) {
                    msg.push('\n');
                    msg.push_str(&explanation);
                }
                msg
            }
        }
    }
}

impl<I> Default for ArgumentSpec<I> {
    fn default() -> Self {
        ArgumentSpec::Nothing
    }
}

impl<I> Debug for ArgumentSpec<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

pub(crate) fn bracket(items: Vec<String>) -> String {
    format!("[{}]", items.join(", "))
}

/// Token accepting values equal to the expected one.
pub struct Equals<T>(T);

/// Create an [`Equals`] token.
pub fn eq<T: Debug>(expected: T) -> Equals<T> {
    Equals(expected)
}

impl<T: Debug> Display for Equals<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl<T: Debug> PredicateReflection for Equals<T> {}

impl<T, A> Predicate<A> for Equals<T>
    where T: PartialEq<A> + Debug, A: ?Sized
{
    fn eval(&self, actual: &A) -> bool {
        self.0 == *actual
    }
}

/// Token accepting every value.
pub struct Anything;

/// Create an [`Anything`] token.
pub fn any() -> Anything {
    Anything
}

impl Display for Anything {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("_")
    }
}

impl PredicateReflection for Anything {}

impl<A: ?Sized> Predicate<A> for Anything {
    fn eval(&self, _: &A) -> bool {
        true
    }
}

/// Token accepting type-erased values of one concrete type.
///
/// Rust has no subtyping between concrete types, so "is a" means "holds
/// exactly a `T`".
pub struct IsA<T>(PhantomData<fn() -> T>);

/// Create an [`IsA`] token.
pub fn is_a<T: Any>() -> IsA<T> {
    IsA(PhantomData)
}

impl<T> Display for IsA<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "is_a {}", any::type_name::<T>())
    }
}

impl<T> PredicateReflection for IsA<T> {}

impl<T: Any> Predicate<dyn Any> for IsA<T> {
    fn eval(&self, actual: &dyn Any) -> bool {
        actual.is::<T>()
    }
}

impl<T: Any> Predicate<Box<dyn Any>> for IsA<T> {
    fn eval(&self, actual: &Box<dyn Any>) -> bool {
        (**actual).is::<T>()
    }
}

impl<T: Any> Predicate<Box<dyn Any + Send>> for IsA<T> {
    fn eval(&self, actual: &Box<dyn Any + Send>) -> bool {
        (**actual).is::<T>()
    }
}

/// Token accepting values inside a range.
pub struct Within<R>(R);

/// Create a [`Within`] token.
pub fn within<R: Debug>(range: R) -> Within<R> {
    Within(range)
}

impl<R: Debug> Display for Within<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl<R: Debug> PredicateReflection for Within<R> {}

impl<T, R> Predicate<T> for Within<R>
    where T: PartialOrd, R: RangeBounds<T> + Debug
{
    fn eval(&self, actual: &T) -> bool {
        self.0.contains(actual)
    }
}

cfg_if! {
    if #[cfg(feature = "regex")] {
        use predicates::str::{RegexError, RegexPredicate};

        /// Token accepting strings that match a regular expression.
        pub struct Like {
            pattern: String,
            regex: RegexPredicate,
        }

        /// Create a [`Like`] token.
        ///
        /// Fails if `pattern` is not a valid regular expression.
        pub fn like(pattern: &str) -> Result<Like, RegexError> {
            let regex = predicates::str::is_match(pattern)?;
            Ok(Like{pattern: pattern.to_string(), regex})
        }

        impl Display for Like {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "/{}/", self.pattern)
            }
        }

        impl PredicateReflection for Like {}

        impl<S: AsRef<str> + ?Sized> Predicate<S> for Like {
            fn eval(&self, actual: &S) -> bool {
                self.regex.eval(actual.as_ref())
            }
        }
    }
}
