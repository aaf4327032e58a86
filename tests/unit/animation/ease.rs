use super::*;

#[test]
fn endpoints_are_stable() {
    for ease in Ease::ALL {
        assert!(ease.apply(0.0).abs() < 1e-9, "{ease:?} at 0");
        assert!((ease.apply(1.0) - 1.0).abs() < 1e-9, "{ease:?} at 1");
    }
}

#[test]
fn input_is_clamped() {
    for ease in Ease::ALL {
        assert_eq!(ease.apply(-3.0), ease.apply(0.0));
        assert_eq!(ease.apply(7.0), ease.apply(1.0));
        assert_eq!(ease.apply(f64::NAN), ease.apply(0.0));
    }
}

#[test]
fn monotonic_spot_check() {
    for ease in [Ease::Linear, Ease::EaseIn, Ease::EaseOut, Ease::EaseInOut] {
        let a = ease.apply(0.25);
        let b = ease.apply(0.5);
        let c = ease.apply(0.75);
        assert!(a < b);
        assert!(b < c);
    }
}

#[test]
fn quadratic_formulas() {
    assert!((Ease::EaseIn.apply(0.5) - 0.25).abs() < 1e-12);
    assert!((Ease::EaseOut.apply(0.5) - 0.75).abs() < 1e-12);
    assert!((Ease::EaseInOut.apply(0.25) - 0.125).abs() < 1e-12);
    assert!((Ease::EaseInOut.apply(0.75) - 0.875).abs() < 1e-12);
}

#[test]
fn bounce_segments_meet() {
    // Segment boundaries land on the top of each bounce.
    assert!((Ease::Bounce.apply(1.0 / 2.75) - 1.0).abs() < 1e-9);
    assert!((Ease::Bounce.apply(2.0 / 2.75) - 1.0).abs() < 1e-9);
    assert!((Ease::Bounce.apply(1.5 / 2.75) - 0.75).abs() < 1e-9);
}

#[test]
fn back_anticipates_and_elastic_overshoots() {
    assert!(Ease::Back.apply(0.2) < 0.0);
    let max = (1..100)
        .map(|i| Ease::Elastic.apply(f64::from(i) / 100.0))
        .fold(f64::MIN, f64::max);
    assert!(max > 1.0);
}

#[test]
fn interpolate_maps_onto_range() {
    assert!((Ease::Linear.interpolate(0.0, 100.0, 150.0 / 299.0) - 50.1672).abs() < 1e-3);
    assert_eq!(Ease::EaseIn.interpolate(10.0, 20.0, 1.0), 20.0);
    assert_eq!(Ease::EaseIn.interpolate(20.0, 10.0, 0.0), 20.0);
}

#[test]
fn serde_names_are_kebab_case() {
    assert_eq!(
        serde_json::to_string(&Ease::EaseInOut).unwrap(),
        "\"ease-in-out\""
    );
    let e: Ease = serde_json::from_str("\"elastic\"").unwrap();
    assert_eq!(e, Ease::Elastic);
}
