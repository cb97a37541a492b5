// vim: tw=80
//! Expectations whose own callbacks call back into the mocked operation
#![deny(warnings)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc
};
use standin::*;

struct Calc {
    seam: Seam,
}

#[mockable]
impl Calc {
    fn fact(&self, n: u64) -> u64 {
        (1..=n).product()
    }
}

#[test]
fn recursive_returning() {
    let registry = Registry::new();
    let c = Arc::new(Calc { seam: registry.seam() });
    let c2 = c.clone();
    let e = c.expects(Calc::FACT)
        .withf(|(n,)| *n < 10)
        .returning(move |(n,)| if n == 0 { 1 } else { n * c2.fact(n - 1) })
        .any_time();
    assert_eq!(6, c.fact(3));
    assert_eq!(4, e.calls());
    // Restoring breaks the reference cycle through the closure
    registry.teardown(true).unwrap();
    assert_eq!(24, c.fact(4));
}

#[test]
fn recursion_respects_the_budget() {
    let registry = Registry::new();
    let c = Arc::new(Calc { seam: registry.seam() });
    let c2 = c.clone();
    c.expects(Calc::FACT)
        .with((any(),))
        .returning(move |(n,)| {
            Calc::FACT.try_call(&c2, (n,), |_| 0).unwrap_or(0) + 1
        })
        .times(1);
    // The nested call finds the budget already spent
    assert_eq!(1, c.fact(5));
    registry.teardown(true).unwrap();
}

#[test]
fn matcher_may_inspect_its_expectation() {
    let registry = Registry::new();
    let c = Calc { seam: registry.seam() };
    let e = c.expects(Calc::FACT);
    let handle = e.clone();
    let e = e.withf(move |_| handle.calls() < 2)
        .returns(0)
        .any_time();
    assert_eq!(0, c.fact(1));
    assert_eq!(0, c.fact(1));
    let r = Calc::FACT.try_call(&c, (1,), |_| 1);
    assert!(matches!(r, Err(Error::ArgumentMismatch { .. })), "{:?}", r);
    assert_eq!(2, e.calls());
    registry.teardown(true).unwrap();
}

#[test]
fn stateful_returning() {
    let registry = Registry::new();
    let c = Calc { seam: registry.seam() };
    let counter = AtomicUsize::new(0);
    c.expects(Calc::FACT)
        .with((any(),))
        .returning(move |_| counter.fetch_add(1, Ordering::Relaxed) as u64)
        .times(3);
    assert_eq!(0, c.fact(9));
    assert_eq!(1, c.fact(9));
    assert_eq!(2, c.fact(9));
}
