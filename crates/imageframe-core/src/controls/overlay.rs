//! Rotated overlay rectangles with eight resize handles.
//!
//! An overlay lives in its own frame: a rectangle of `size` centred on
//! `center` and turned by `angle` degrees on screen. Drags are converted
//! into that frame before they change the rectangle, so the handle the user
//! grabs follows the pointer while the opposite side stays put.

use super::handles::{Corner, Handle, HandleKind, RESIZE_HANDLES};
use crate::classes;
use crate::dom::{Document, NodeId};
use crate::editable::EditableImage;
use crate::error::Result;
use crate::geometry::{natural_aspect_ratio, rotate_vec};
use kurbo::{Point, Rect, Size, Vec2};

/// Screen geometry of an overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayFrame {
    pub center: Point,
    pub size: Size,
    /// Clockwise screen rotation in degrees.
    pub angle: f64,
}

impl OverlayFrame {
    pub fn new(center: Point, size: Size, angle: f64) -> Self {
        Self {
            center,
            size,
            angle,
        }
    }

    /// Screen position of a point given relative to the frame centre.
    fn to_screen(&self, local: Vec2) -> Point {
        self.center + rotate_vec(local, self.angle)
    }

    fn half(&self) -> Vec2 {
        self.size.to_vec2() / 2.0
    }

    pub fn corner(&self, corner: Corner) -> Point {
        let d = corner.direction();
        let half = self.half();
        self.to_screen(Vec2::new(d.x * half.x, d.y * half.y))
    }

    /// Screen positions of the eight resize handles.
    pub fn handles(&self) -> Vec<Handle> {
        let half = self.half();
        RESIZE_HANDLES
            .iter()
            .map(|&kind| {
                let d = kind.direction();
                Handle::new(self.to_screen(Vec2::new(d.x * half.x, d.y * half.y)), kind)
            })
            .collect()
    }

    /// Find which handle (if any) is hit at the given screen point.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<HandleKind> {
        self.handles()
            .into_iter()
            .find(|h| h.hit_test(point, tolerance))
            .map(|h| h.kind)
    }

    /// Whether a screen point lies inside the rotated rectangle.
    pub fn contains(&self, point: Point) -> bool {
        let local = rotate_vec(point - self.center, -self.angle);
        Rect::from_center_size(Point::ZERO, self.size).contains(local.to_point())
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            center: self.center + delta,
            ..*self
        }
    }

    /// Resize by dragging `handle` by `delta` screen units.
    ///
    /// The side or corner opposite the handle stays fixed. With
    /// `keep_aspect_ratio` every handle preserves the starting ratio; edge
    /// handles then grow the other axis symmetrically.
    pub fn resized(&self, handle: HandleKind, delta: Vec2, keep_aspect_ratio: bool, min_size: f64) -> Self {
        let dir = handle.direction();
        if dir == Vec2::ZERO {
            return *self;
        }
        let local = rotate_vec(delta, -self.angle);
        let mut width = self.size.width + dir.x * local.x;
        let mut height = self.size.height + dir.y * local.y;

        if keep_aspect_ratio {
            let ratio = natural_aspect_ratio(self.size);
            match (dir.x != 0.0, dir.y != 0.0) {
                (true, true) => {
                    // Follow whichever axis asks for the bigger box.
                    if width.abs() >= (height * ratio).abs() {
                        height = width / ratio;
                    } else {
                        width = height * ratio;
                    }
                }
                (true, false) => height = width / ratio,
                _ => width = height * ratio,
            }
            if width < min_size {
                width = min_size;
                height = width / ratio;
            }
            if height < min_size {
                height = min_size;
                width = height * ratio;
            }
        } else {
            width = width.max(min_size);
            height = height.max(min_size);
        }

        let half = self.half();
        let anchor = Vec2::new(-dir.x * half.x, -dir.y * half.y);
        let center = anchor + Vec2::new(dir.x * width / 2.0, dir.y * height / 2.0);
        Self {
            center: self.to_screen(center),
            size: Size::new(width, height),
            angle: self.angle,
        }
    }
}

/// Overlay node of a controller, with its handle nodes.
#[derive(Debug)]
pub struct Overlay {
    node: NodeId,
    handles: Vec<(NodeId, HandleKind)>,
}

impl Overlay {
    /// Create the overlay as a control of `image`.
    pub fn create(doc: &mut Document, image: &EditableImage, class: &str) -> Result<Self> {
        let node = doc.create_element("div");
        doc.add_class(node, class)?;
        image.add_control(doc, node)?;

        let mut handles = Vec::with_capacity(RESIZE_HANDLES.len());
        for kind in RESIZE_HANDLES {
            let handle = doc.create_element("span");
            doc.add_class(handle, classes::CONTROL)?;
            doc.add_class(handle, classes::HANDLE)?;
            doc.add_class(handle, kind.class_name())?;
            doc.append_child(node, handle)?;
            handles.push((handle, kind));
        }
        Ok(Self { node, handles })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The handle kind of `node`, if it is one of this overlay's handles.
    pub fn handle_for(&self, node: NodeId) -> Option<HandleKind> {
        self.handles
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, kind)| *kind)
    }

    /// Write `frame` into the overlay's style, relative to `origin`, the
    /// page position of the wrapper.
    pub fn layout(&self, doc: &mut Document, origin: Point, frame: &OverlayFrame, handle_size: f64) -> Result<()> {
        let top_left = frame.center - frame.size.to_vec2() / 2.0 - origin.to_vec2();
        let style = doc.style_mut(self.node)?;
        style.set_size(frame.size);
        style.set_position(top_left);

        let half = frame.size.to_vec2() / 2.0;
        for &(handle, kind) in &self.handles {
            let d = kind.direction();
            let position = Point::new(
                half.x + d.x * half.x - handle_size / 2.0,
                half.y + d.y * half.y - handle_size / 2.0,
            );
            let style = doc.style_mut(handle)?;
            style.set_size(Size::new(handle_size, handle_size));
            style.set_position(position);
        }
        Ok(())
    }

    pub fn remove(self, doc: &mut Document, image: &EditableImage) -> Result<()> {
        image.remove_control(doc, self.node)
    }
}
