// vim: tw=80
//! Requests that cannot be turned into an expectation
#![deny(warnings)]

use standin::*;

struct Robot {
    seam: Seam,
}

impl Robot {
    const BEEP: Operation<Self, (), String> = Operation::new("beep");
    const BEEP_TWICE: Operation<Self, (bool,), String> =
        Operation::new("beep");
    // Exists, but is not declared mockable
    const WAVE: Operation<Self, (), ()> = Operation::new("wave");

    fn beep(&self) -> String {
        Self::BEEP.call(self, (), |()| "beep".to_string())
    }
}

impl Mockable for Robot {
    const OPERATIONS: &'static [&'static str] = &["beep"];

    fn seam(&self) -> &Seam {
        &self.seam
    }
}

#[test]
fn no_such_operation() {
    let registry = Registry::new();
    let r = Robot { seam: registry.seam() };
    let err = registry.try_expects(&r, Robot::WAVE).unwrap_err();
    assert_eq!(Error::NoSuchOperation {
        target: format!("Robot#{}", r.seam.id()),
        operation: "wave"
    }, err);
    assert!(registry.is_empty());

    let err = registry.any_instance::<Robot>().try_expects(Robot::WAVE)
        .unwrap_err();
    assert_eq!("Robot does not expose an operation named `wave`",
               err.to_string());
}

#[test]
#[should_panic(expected = "does not expose an operation named `wave`")]
fn no_such_operation_panics() {
    let registry = Registry::new();
    let r = Robot { seam: registry.seam() };
    r.expects(Robot::WAVE);
}

#[test]
fn detached_target() {
    let r = Robot { seam: Seam::detached() };
    let err = r.try_expects(Robot::BEEP).unwrap_err();
    assert!(matches!(err, Error::DetachedTarget { operation: "beep", .. }),
            "{:?}", err);
    assert_eq!("beep", r.beep());
}

#[test]
fn target_of_another_registry() {
    let registry = Registry::new();
    let other = Registry::new();
    let r = Robot { seam: other.seam() };
    let err = registry.try_expects(&r, Robot::BEEP).unwrap_err();
    assert!(matches!(err, Error::DetachedTarget { .. }), "{:?}", err);
    assert!(registry.is_empty());
    assert!(other.is_empty());
}

#[test]
fn signature_mismatch() {
    let registry = Registry::new();
    let r = Robot { seam: registry.seam() };
    r.expects(Robot::BEEP).returns("boop".to_string());
    let err = r.try_expects(Robot::BEEP_TWICE).unwrap_err();
    assert!(matches!(err, Error::SignatureMismatch { operation: "beep", .. }),
            "{:?}", err);

    let err = Robot::BEEP_TWICE.try_call(&r, (true,), |_| String::new())
        .unwrap_err();
    assert!(matches!(err, Error::SignatureMismatch { .. }), "{:?}", err);

    // The original expectation is untouched
    assert_eq!("boop", r.beep());
}
