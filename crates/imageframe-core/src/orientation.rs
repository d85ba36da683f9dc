//! Which edge of the unrotated image faces up on screen.

use crate::controls::Corner;
use crate::geometry::normalize_degrees;
use serde::{Deserialize, Serialize};

/// Compass orientation of an image, derived from its rotation.
///
/// The buckets are uneven: the four cardinal ones are 60° wide, the
/// diagonals only 30°.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    T,
    TR,
    R,
    BR,
    B,
    BL,
    L,
    TL,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Orientation::T,
        Orientation::TR,
        Orientation::R,
        Orientation::BR,
        Orientation::B,
        Orientation::BL,
        Orientation::L,
        Orientation::TL,
    ];

    /// Classify a rotation in degrees. Any finite angle is accepted.
    pub fn from_degrees(angle: f64) -> Self {
        let angle = normalize_degrees(angle);
        match angle {
            a if a < 30.0 => Orientation::T,
            a if a < 60.0 => Orientation::TL,
            a if a < 120.0 => Orientation::L,
            a if a < 150.0 => Orientation::BL,
            a if a < 210.0 => Orientation::B,
            a if a < 240.0 => Orientation::BR,
            a if a < 300.0 => Orientation::R,
            a if a < 330.0 => Orientation::TR,
            _ => Orientation::T,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::T => "t",
            Orientation::TR => "tr",
            Orientation::R => "r",
            Orientation::BR => "br",
            Orientation::B => "b",
            Orientation::BL => "bl",
            Orientation::L => "l",
            Orientation::TL => "tl",
        }
    }

    pub fn from_str_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == name)
    }

    /// Quarter turn the overlays are laid out in.
    pub fn base_angle(self) -> f64 {
        match self {
            Orientation::T | Orientation::TL | Orientation::TR => 0.0,
            Orientation::L => 90.0,
            Orientation::B | Orientation::BL | Orientation::BR => 180.0,
            Orientation::R => 270.0,
        }
    }

    /// Whether the image's width runs along the screen's vertical axis.
    pub fn is_sideways(self) -> bool {
        matches!(self, Orientation::L | Orientation::R)
    }

    /// Overlay corner that holds the image's own top-left corner.
    pub fn crop_anchor(self) -> Corner {
        match self {
            Orientation::R => Corner::BottomLeft,
            Orientation::B | Orientation::BR | Orientation::BL => Corner::BottomRight,
            Orientation::L => Corner::TopRight,
            Orientation::T | Orientation::TR | Orientation::TL => Corner::TopLeft,
        }
    }
}

/// Integer degrees stored in the `rot-deg-<n>` class: rounded, then wrapped.
pub fn round_rotation(angle: f64) -> u16 {
    if !angle.is_finite() {
        return 0;
    }
    // Always below 360 after rem_euclid, so the cast cannot truncate.
    (angle.round() as i64).rem_euclid(360) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(deg: u32) -> Orientation {
        match deg {
            330..=359 | 0..=29 => Orientation::T,
            30..=59 => Orientation::TL,
            60..=119 => Orientation::L,
            120..=149 => Orientation::BL,
            150..=209 => Orientation::B,
            210..=239 => Orientation::BR,
            240..=299 => Orientation::R,
            _ => Orientation::TR,
        }
    }

    #[test]
    fn test_every_degree_lands_in_its_bucket() {
        for deg in 0..360u32 {
            assert_eq!(Orientation::from_degrees(deg as f64), expected(deg), "{deg}");
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(Orientation::from_degrees(29.0), Orientation::T);
        assert_eq!(Orientation::from_degrees(30.0), Orientation::TL);
        assert_eq!(Orientation::from_degrees(329.999), Orientation::TR);
        assert_eq!(Orientation::from_degrees(330.0), Orientation::T);
        assert_eq!(Orientation::from_degrees(-90.0), Orientation::R);
        assert_eq!(Orientation::from_degrees(450.0), Orientation::L);
    }

    #[test]
    fn test_crop_anchor_table() {
        assert_eq!(Orientation::R.crop_anchor(), Corner::BottomLeft);
        assert_eq!(Orientation::B.crop_anchor(), Corner::BottomRight);
        assert_eq!(Orientation::BR.crop_anchor(), Corner::BottomRight);
        assert_eq!(Orientation::BL.crop_anchor(), Corner::BottomRight);
        assert_eq!(Orientation::L.crop_anchor(), Corner::TopRight);
        assert_eq!(Orientation::TL.crop_anchor(), Corner::TopLeft);
        assert_eq!(Orientation::TR.crop_anchor(), Corner::TopLeft);
    }

    #[test]
    fn test_round_rotation_never_reaches_360() {
        assert_eq!(round_rotation(359.6), 0);
        assert_eq!(round_rotation(359.4), 359);
        assert_eq!(round_rotation(-0.4), 0);
        assert_eq!(round_rotation(-1.0), 359);
        assert_eq!(round_rotation(f64::NAN), 0);
    }

    #[test]
    fn test_names_round_trip() {
        for orientation in Orientation::ALL {
            assert_eq!(Orientation::from_str_name(orientation.as_str()), Some(orientation));
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: rounding always yields a whole degree below a full turn.
        #[test]
        fn prop_round_rotation_in_range(angle in -10_000.0f64..10_000.0) {
            prop_assert!(round_rotation(angle) < 360);
        }

        /// Property: whole turns never change the orientation bucket.
        #[test]
        fn prop_orientation_is_periodic(tenths in 0u32..3600, turns in -3i32..3) {
            let angle = tenths as f64 / 10.0;
            let shifted = angle + 360.0 * turns as f64;
            prop_assert_eq!(Orientation::from_degrees(shifted), Orientation::from_degrees(angle));
        }
    }
}
