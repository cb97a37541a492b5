// vim: tw=80
//! Mocking a single operation of a single object.
#![deny(warnings)]

use standin::*;

#[derive(Clone)]
struct Greeter {
    name: String,
    seam: Seam,
}

#[mockable]
impl Greeter {
    fn new(registry: &Registry, name: &str) -> Self {
        Greeter { name: name.to_string(), seam: registry.seam() }
    }

    fn greet(&self) -> String {
        format!("hello, {}", self.name)
    }
}

#[test]
fn unmocked() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    assert_eq!("hello, Ann", g.greet());
    assert!(registry.is_empty());
}

#[test]
fn returns() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    g.expects(Greeter::GREET).returns("hi".to_string());
    assert_eq!("hi", g.greet());
}

#[test]
fn scenario() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    let e = g.expects(Greeter::GREET).returns("hi".to_string());
    assert_eq!("hi", g.greet());

    let r = Greeter::GREET.try_call(&g, (), |()| "original".to_string());
    match r {
        Err(Error::CallBudgetExceeded { expected, operation, .. }) => {
            assert_eq!(1, expected);
            assert_eq!("greet", operation);
        },
        other => panic!("Unexpected result {:?}", other)
    }
    assert!(e.verify().is_ok());
    assert_eq!(1, e.calls());

    registry.teardown(true).unwrap();
    assert_eq!("hello, Ann", g.greet());
}

#[test]
#[should_panic(expected = ".greet called too many times (expected 1 call(s))")]
fn second_call_panics() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    g.expects(Greeter::GREET).returns("hi".to_string());
    g.greet();
    g.greet();
    panic!("Shouldn't get here!");
}

#[test]
fn error_names_the_instance() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    g.expects(Greeter::GREET).never();
    let err = Greeter::GREET.try_call(&g, (), |()| String::new())
        .unwrap_err();
    let expected = format!("Greeter#{}.greet called too many times",
                           g.seam.id());
    assert!(err.to_string().starts_with(&expected), "{}", err);
}

#[test]
fn identity_reuse() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    let first = g.expects(Greeter::GREET);
    let second = registry.expects(&g, Greeter::GREET);
    assert!(first.ptr_eq(&second));
    assert_eq!(1, registry.len());

    // Configuration through either handle is visible through the other
    second.returns("hi".to_string()).times(2);
    assert_eq!(Budget::Exactly(2), first.remaining());
}

#[test]
fn restore_idempotence() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    let e = g.expects(Greeter::GREET).returns("hi".to_string()).times(3);
    assert!(registry.is_mocked(&g, "greet"));

    assert!(e.is_active());
    e.restore();
    assert!(!e.is_installed());
    assert!(!e.is_active());
    assert!(!registry.is_mocked(&g, "greet"));
    assert_eq!(Budget::Unlimited, e.remaining());
    assert!(e.verify().is_ok());
    assert_eq!("hello, Ann", g.greet());

    e.restore();
    assert!(!e.is_installed());
    assert!(registry.is_empty());
    assert_eq!("hello, Ann", g.greet());
}

#[test]
fn mock_again_after_restore() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    let old = g.expects(Greeter::GREET).returns("hi".to_string());
    old.restore();
    let new = g.expects(Greeter::GREET).returns("hey".to_string());
    assert!(!old.ptr_eq(&new));
    assert_eq!("hey", g.greet());
}

#[test]
fn other_instances_are_unaffected() {
    let registry = Registry::new();
    let ann = Greeter::new(&registry, "Ann");
    let bob = Greeter::new(&registry, "Bob");
    ann.expects(Greeter::GREET).returns("hi".to_string());
    assert_eq!("hello, Bob", bob.greet());
    assert_eq!("hi", ann.greet());
}

#[test]
fn clones_get_their_own_identity() {
    let registry = Registry::new();
    let ann = Greeter::new(&registry, "Ann");
    ann.expects(Greeter::GREET).returns("hi".to_string());
    let twin = ann.clone();
    assert_ne!(ann.seam.id(), twin.seam.id());
    assert_eq!("hello, Ann", twin.greet());
    assert_eq!("hi", ann.greet());
}

#[test]
fn detached_objects_run_the_original() {
    let g = Greeter { name: "Ann".to_string(), seam: Seam::detached() };
    assert_eq!("hello, Ann", g.greet());
}

#[test]
fn debug() {
    let registry = Registry::new();
    let g = Greeter::new(&registry, "Ann");
    let e = g.expects(Greeter::GREET);
    let s = format!("{:?}", e);
    assert!(s.contains("operation: \"greet\""), "{}", s);
    assert!(s.contains("remaining: Exactly(1)"), "{}", s);
    assert_eq!("Registry { expectations: 1 }", format!("{:?}", registry));
}
