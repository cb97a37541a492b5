// vim: tw=80
//! Mocking an operation on every instance of a type
#![deny(warnings)]

use standin::*;

struct Item {
    base: u32,
    seam: Seam,
}

#[mockable]
impl Item {
    fn new(registry: &Registry, base: u32) -> Self {
        Item { base, seam: registry.seam() }
    }

    fn price(&self) -> u32 {
        self.base
    }

    fn discounted(&self, percent: u32) -> u32 {
        self.base * (100 - percent) / 100
    }
}

#[test]
fn scenario() {
    let registry = Registry::new();
    let a = Item::new(&registry, 1);
    let b = Item::new(&registry, 2);
    let e = registry.any_instance::<Item>()
        .expects(Item::PRICE)
        .returns(9)
        .any_time();
    assert_eq!(9, a.price());
    assert_eq!(9, b.price());

    e.restore();
    assert_eq!(1, a.price());
    assert_eq!(2, b.price());
}

#[test]
fn instances_created_later() {
    let registry = Registry::new();
    registry.any_instance::<Item>()
        .expects(Item::PRICE)
        .returns(9)
        .any_time();
    let c = Item::new(&registry, 3);
    assert_eq!(9, c.price());
}

#[test]
fn target_is_the_type() {
    let registry = Registry::new();
    let e = registry.any_instance::<Item>().expects(Item::PRICE);
    assert_eq!("Item", e.target());
    assert!(e.is_any_instance());
    assert!(registry.any_instance::<Item>().is_mocked("price"));
    assert!(!registry.any_instance::<Item>().is_mocked("discounted"));
    let err = e.verify().unwrap_err();
    assert_eq!("Item.price expected. not called 1 more time(s) \
                (called 0 time(s))", err.to_string());
}

#[test]
fn identity_reuse() {
    let registry = Registry::new();
    let first = registry.any_instance::<Item>().expects(Item::PRICE);
    let second = registry.any_instance::<Item>().expects(Item::PRICE);
    assert!(first.ptr_eq(&second));
}

#[test]
fn shared_budget() {
    let registry = Registry::new();
    let a = Item::new(&registry, 1);
    let b = Item::new(&registry, 2);
    let e = registry.any_instance::<Item>()
        .expects(Item::DISCOUNTED)
        .with((eq(10u32),))
        .returns(5)
        .times(2);
    assert_eq!(5, a.discounted(10));
    assert_eq!(5, b.discounted(10));
    assert!(e.verify().is_ok());
    let r = Item::DISCOUNTED.try_call(&a, (10,), |_| 0);
    assert!(matches!(r, Err(Error::CallBudgetExceeded { .. })), "{:?}", r);
}

#[test]
fn instance_takes_precedence() {
    let registry = Registry::new();
    let a = Item::new(&registry, 1);
    let b = Item::new(&registry, 2);
    registry.any_instance::<Item>()
        .expects(Item::PRICE)
        .returns(9)
        .any_time();
    let mine = a.expects(Item::PRICE).returns(5);
    assert_eq!(5, a.price());
    assert_eq!(9, b.price());

    // An exhausted instance expectation does not fall back
    let r = Item::PRICE.try_call(&a, (), |()| 0);
    assert!(matches!(r, Err(Error::CallBudgetExceeded { .. })), "{:?}", r);

    // Until it is restored
    mine.restore();
    assert_eq!(9, a.price());
}

#[test]
fn other_registries_are_unaffected() {
    let registry = Registry::new();
    let other = Registry::new();
    let a = Item::new(&registry, 1);
    let elsewhere = Item::new(&other, 4);
    let detached = Item { base: 6, seam: Seam::detached() };
    registry.any_instance::<Item>()
        .expects(Item::PRICE)
        .returns(9)
        .any_time();
    assert_eq!(9, a.price());
    assert_eq!(4, elsewhere.price());
    assert_eq!(6, detached.price());
}

#[test]
fn teardown_restores_every_instance() {
    let registry = Registry::new();
    let a = Item::new(&registry, 1);
    let b = Item::new(&registry, 2);
    registry.any_instance::<Item>()
        .expects(Item::PRICE)
        .returns(9)
        .times(2);
    assert_eq!(9, a.price());
    assert_eq!(9, b.price());
    registry.teardown(true).unwrap();
    assert_eq!(1, a.price());
    assert_eq!(2, b.price());
}
