//! Geometry helpers for the manipulation engine.
//!
//! Screen coordinates are left-handed: `y` grows downward and a positive
//! angle turns clockwise, the same way a CSS `rotate()` does. All angles
//! taken or returned by this module are in degrees unless the name says
//! otherwise.

use kurbo::{Insets, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing angles against exact quarter turns.
const QUARTER_TURN_EPSILON: f64 = 1e-9;

/// Box-model values of a laid out element.
///
/// `width`/`height` are the border-box dimensions; margin is never part of
/// the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxMetrics {
    pub width: f64,
    pub height: f64,
    pub padding: Insets,
    pub border: Insets,
}

/// Content size of a box: its dimensions minus border and padding.
pub fn measure_box_model(metrics: &BoxMetrics) -> Size {
    let width = metrics.width - metrics.padding.x_value() - metrics.border.x_value();
    let height = metrics.height - metrics.padding.y_value() - metrics.border.y_value();
    Size::new(width.max(0.0), height.max(0.0))
}

/// Width-to-height ratio, kept to at least three decimals of precision.
///
/// A zero height yields `1.0` so callers never divide by zero later.
pub fn natural_aspect_ratio(size: Size) -> f64 {
    if size.height <= 0.0 {
        return 1.0;
    }
    (size.width * 1000.0) / (size.height * 1000.0)
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round a tiny negative input up to exactly 360.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Clockwise angle of `point` around `center`, with 0° pointing straight up.
pub fn angle_between(center: Point, point: Point) -> f64 {
    let delta = point - center;
    let angle = -(delta.x.atan2(delta.y).to_degrees() - 180.0);
    normalize_degrees(angle)
}

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Rotate `point` about the origin by `angle_deg` screen degrees.
///
/// The matrix uses the negated angle because screen rotation runs opposite
/// to the mathematical convention.
pub fn rotate_point(point: Point, angle_deg: f64) -> Point {
    let theta = deg_to_rad(-angle_deg);
    let (sin, cos) = theta.sin_cos();
    Point::new(cos * point.x + sin * point.y, cos * point.y - sin * point.x)
}

/// Vector form of [`rotate_point`].
pub fn rotate_vec(vec: Vec2, angle_deg: f64) -> Vec2 {
    rotate_point(vec.to_point(), angle_deg).to_vec2()
}

/// Express `point` relative to `origin`.
pub fn normalize(point: Point, origin: Point) -> Point {
    Point::new(point.x - origin.x, point.y - origin.y)
}

/// Axis-aligned bounding box of a `size` rectangle rotated about its centre.
pub fn rotated_bounds(size: Size, angle_deg: f64) -> Size {
    let angle = normalize_degrees(angle_deg);

    // Quarter turns are exact; skip the trigonometry noise.
    let near = |target: f64| (angle - target).abs() < QUARTER_TURN_EPSILON;
    if near(0.0) || near(180.0) || near(360.0) {
        return size;
    }
    if near(90.0) || near(270.0) {
        return Size::new(size.height, size.width);
    }

    let rect = Rect::from_center_size(Point::ZERO, size);
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    let rotated: Vec<Point> = corners.iter().map(|&p| rotate_point(p, angle)).collect();

    let min_x = rotated.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = rotated.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = rotated.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = rotated.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    Size::new(max_x - min_x, max_y - min_y)
}

/// Swap width and height.
pub fn transpose(size: Size) -> Size {
    Size::new(size.height, size.width)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: rotating forward then backward returns the original point.
        #[test]
        fn prop_rotation_round_trip(
            x in -10_000.0f64..10_000.0,
            y in -10_000.0f64..10_000.0,
            angle in -720.0f64..720.0,
        ) {
            let p = Point::new(x, y);
            let back = rotate_point(rotate_point(p, angle), -angle);
            prop_assert!((back.x - p.x).abs() < 1e-6);
            prop_assert!((back.y - p.y).abs() < 1e-6);
        }

        /// Property: the angle is always inside [0, 360).
        #[test]
        fn prop_angle_in_range(
            x in -1_000.0f64..1_000.0,
            y in -1_000.0f64..1_000.0,
        ) {
            let angle = angle_between(Point::ZERO, Point::new(x, y));
            prop_assert!((0.0..360.0).contains(&angle));
        }

        /// Property: a rotated rectangle's bounds always contain the original area.
        #[test]
        fn prop_rotated_bounds_cover_rect(
            w in 1.0f64..500.0,
            h in 1.0f64..500.0,
            angle in 0.0f64..360.0,
        ) {
            let bounds = rotated_bounds(Size::new(w, h), angle);
            prop_assert!(bounds.width * bounds.height + 1e-6 >= w * h);
        }

        /// Property: rotation preserves distance from the origin.
        #[test]
        fn prop_rotation_preserves_length(
            x in -1_000.0f64..1_000.0,
            y in -1_000.0f64..1_000.0,
            angle in 0.0f64..360.0,
        ) {
            let p = Point::new(x, y);
            let r = rotate_point(p, angle);
            prop_assert!((r.to_vec2().hypot() - p.to_vec2().hypot()).abs() < 1e-6);
        }
    }
}
