//! Property-based tests for command argument clamping.
//!
//! Volume lands in 0-100, speed lands on the 0.25 grid inside 0.25-2, and
//! seek targets stay inside the known duration, whatever the caller sends.

use proptest::prelude::*;

use ytcontroller::services::page_probe::{clamp_position, clamp_speed, clamp_volume, MAX_SPEED, MIN_SPEED, SPEED_GRID};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn volume_is_always_a_percentage(volume in prop::num::f64::ANY) {
        let clamped = clamp_volume(volume);
        prop_assert!((0.0..=100.0).contains(&clamped));
        if (0.0..=100.0).contains(&volume) {
            prop_assert_eq!(clamped, volume);
        }
    }

    #[test]
    fn speed_snaps_to_grid(speed in -10.0f64..10.0) {
        let clamped = clamp_speed(speed);
        prop_assert!((MIN_SPEED..=MAX_SPEED).contains(&clamped));
        let steps = clamped / SPEED_GRID;
        prop_assert_eq!(steps, steps.round());
        if (MIN_SPEED..=MAX_SPEED).contains(&speed) {
            prop_assert!((clamped - speed).abs() <= SPEED_GRID / 2.0);
        }
    }

    #[test]
    fn position_stays_inside_known_duration(time in -1_000.0f64..10_000.0, duration in 1.0f64..5_000.0) {
        let clamped = clamp_position(time, duration);
        prop_assert!(clamped >= 0.0);
        prop_assert!(clamped <= duration);
    }

    #[test]
    fn position_with_unknown_duration_is_only_bounded_below(time in -1_000.0f64..10_000.0) {
        prop_assert_eq!(clamp_position(time, f64::NAN), time.max(0.0));
        prop_assert_eq!(clamp_position(time, 0.0), time.max(0.0));
    }
}

#[test]
fn test_non_finite_inputs_fall_back() {
    assert_eq!(clamp_volume(f64::NAN), 0.0);
    assert_eq!(clamp_speed(f64::INFINITY), 1.0);
    assert_eq!(clamp_speed(1.3), 1.25);
    assert_eq!(clamp_speed(3.0), 2.0);
}
