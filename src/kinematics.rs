//! Differential drive integration and Create arc-drive conversion.

use crate::config::{ARC_STRAIGHT_MAX, ARC_STRAIGHT_MIN};
use crate::types::Location;
use crate::utils::round_half_up;

/// Linear force and angular rate produced by a pair of wheel speeds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelMotion {
    pub force: f64, // mm/s along the heading
    pub omega: f64, // rad/s, positive is counter-clockwise
}

/// Combines commanded wheel speeds. `factor` scales commands to mm/s and
/// `radius` is the wheel-to-center distance.
pub fn wheel_motion(left: i32, right: i32, factor: f64, radius: f64) -> WheelMotion {
    let l = left as f64 * factor;
    let r = right as f64 * factor;
    let torque = (r - l) / 2.0;
    WheelMotion {
        force: (l + r) / 2.0,
        omega: torque / radius,
    }
}

/// Advances a pose by `dt_ms`. Heading is updated first and the position
/// moves along the new heading.
pub fn integrate(loc: &Location, force: f64, omega: f64, dt_ms: f64) -> Location {
    let mut next = *loc;
    next.theta += omega * dt_ms / 1000.0;
    next.velocity = force;
    next.increment(dt_ms);
    next
}

/// Converts a Create `(velocity, radius)` drive command into
/// `(left, right)` wheel speeds. `axle` is the wheel-to-center distance.
pub fn arc_drive(velocity: i32, radius: i32, axle: f64) -> (i32, i32) {
    if radius >= ARC_STRAIGHT_MAX || radius <= ARC_STRAIGHT_MIN {
        return (velocity, velocity);
    }
    match radius {
        0 => (0, 0),
        1 => (-velocity, velocity),
        -1 => (velocity, -velocity),
        r if r > 0 => {
            let r = r as f64;
            let inner = round_half_up(velocity as f64 / (axle + r) * (r - axle)) as i32;
            (inner, velocity)
        }
        r => {
            let r = -r as f64;
            let inner = round_half_up(velocity as f64 / (axle + r) * (r - axle)) as i32;
            (velocity, inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_equal_wheels_drive_straight() {
        let motion = wheel_motion(100, 100, 1.0, 120.0);
        assert_approx_eq!(motion.force, 100.0);
        assert_approx_eq!(motion.omega, 0.0);

        let start = Location::at(0.0, 0.0, 0.0);
        let next = integrate(&start, motion.force, motion.omega, 10.0);
        assert_approx_eq!(next.x, 1.0);
        assert_approx_eq!(next.y, 0.0);
        assert_approx_eq!(next.theta, 0.0);
    }

    #[test]
    fn test_opposite_wheels_spin_in_place() {
        let v = 50;
        let radius = 100.0;
        let motion = wheel_motion(v, -v, 1.0, radius);
        assert_approx_eq!(motion.force, 0.0);
        assert_approx_eq!(motion.omega.abs(), v as f64 / radius);

        let start = Location::at(10.0, 20.0, 0.3);
        let next = integrate(&start, motion.force, motion.omega, 1000.0);
        assert_approx_eq!(next.x, 10.0);
        assert_approx_eq!(next.y, 20.0);
        assert_approx_eq!(next.theta, 0.3 - 0.5);
    }

    #[test]
    fn test_factor_scales_both_terms() {
        let motion = wheel_motion(0, 200, 0.5, 50.0);
        assert_approx_eq!(motion.force, 50.0);
        assert_approx_eq!(motion.omega, 1.0);
    }

    #[test]
    fn test_heading_updates_before_position() {
        let start = Location::at(0.0, 0.0, 0.0);
        let next = integrate(&start, 100.0, PI / 2.0, 1000.0);
        assert_approx_eq!(next.x, 0.0);
        assert_approx_eq!(next.y, 100.0);
    }

    #[test]
    fn test_arc_drive_special_radii() {
        assert_eq!(arc_drive(200, 32767, 130.0), (200, 200));
        assert_eq!(arc_drive(200, -32768, 130.0), (200, 200));
        assert_eq!(arc_drive(200, 40000, 130.0), (200, 200));
        assert_eq!(arc_drive(200, 1, 130.0), (-200, 200));
        assert_eq!(arc_drive(200, -1, 130.0), (200, -200));
        assert_eq!(arc_drive(200, 0, 130.0), (0, 0));
    }

    #[test]
    fn test_arc_drive_curves() {
        // 200 / (130 + 390) * (390 - 130) = 100
        assert_eq!(arc_drive(200, 390, 130.0), (100, 200));
        assert_eq!(arc_drive(200, -390, 130.0), (200, 100));
    }

    #[test]
    fn test_arc_drive_mirror_symmetry() {
        for &v in &[-500, -123, 0, 77, 250, 500] {
            for &r in &[2, 50, 129, 130, 131, 500, 2000, 32766] {
                let (l, rt) = arc_drive(v, r, 130.0);
                let (ml, mr) = arc_drive(v, -r, 130.0);
                assert_eq!((l, rt), (mr, ml), "v={} r={}", v, r);
            }
        }
    }
}
