//! Class names of the editing scaffold.
//!
//! These names end up in saved content, so they are part of the persisted
//! format and must not change.

/// Outer wrapper, sized to the rotated bounding box.
pub const WRAPPER: &str = "imageframe-wrapper";
/// Inner wrapper, carrying the rotation and the unrotated size.
pub const INNER_WRAPPER: &str = "imageframe-inner";
/// Marker for nodes that never survive into saved content.
pub const CONTROL: &str = "imageframe-control";
/// Zero-size helper pinned at the inner wrapper's local origin.
pub const COORDS: &str = "imageframe-coords";
/// Wrapper of the image currently being edited.
pub const ACTIVE: &str = "imageframe-active";

pub const RESIZE_OVERLAY: &str = "imageframe-resize";
pub const CROP_OVERLAY: &str = "imageframe-crop";
pub const ROTATE_HANDLE: &str = "imageframe-rotate-handle";
pub const HANDLE: &str = "imageframe-handle";

const ROTATION_PREFIX: &str = "rot-deg-";
const ORIENTATION_PREFIX: &str = "orientation-";

pub fn rotation_class(degrees: u16) -> String {
    format!("{ROTATION_PREFIX}{degrees}")
}

/// Degrees encoded by a `rot-deg-<n>` class, if `class` is one.
pub fn parse_rotation_class(class: &str) -> Option<u16> {
    class
        .strip_prefix(ROTATION_PREFIX)?
        .parse::<u16>()
        .ok()
        .filter(|&d| d < 360)
}

pub fn is_rotation_class(class: &str) -> bool {
    class.starts_with(ROTATION_PREFIX)
}

pub fn orientation_class(name: &str) -> String {
    format!("{ORIENTATION_PREFIX}{name}")
}

pub fn is_orientation_class(class: &str) -> bool {
    class.starts_with(ORIENTATION_PREFIX)
}
