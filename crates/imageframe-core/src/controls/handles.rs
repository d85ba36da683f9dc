//! Manipulation handle definitions.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Corner {
    /// Unit direction from the centre, `-1`/`1` per axis.
    pub fn direction(self) -> Vec2 {
        match self {
            Corner::TopLeft => Vec2::new(-1.0, -1.0),
            Corner::TopRight => Vec2::new(1.0, -1.0),
            Corner::BottomLeft => Vec2::new(-1.0, 1.0),
            Corner::BottomRight => Vec2::new(1.0, 1.0),
        }
    }
}

/// Type of manipulation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Corner handle, resizes both axes.
    Corner(Corner),
    /// Edge midpoint handle, resizes one axis.
    Edge(Edge),
    /// Rotation handle (positioned outside the image).
    Rotate,
}

/// The eight resize handles of an overlay, corners first.
pub const RESIZE_HANDLES: [HandleKind; 8] = [
    HandleKind::Corner(Corner::TopLeft),
    HandleKind::Corner(Corner::TopRight),
    HandleKind::Corner(Corner::BottomRight),
    HandleKind::Corner(Corner::BottomLeft),
    HandleKind::Edge(Edge::Top),
    HandleKind::Edge(Edge::Right),
    HandleKind::Edge(Edge::Bottom),
    HandleKind::Edge(Edge::Left),
];

impl HandleKind {
    /// Direction of the handle from the overlay centre. Each component is
    /// `-1`, `0` or `1`; a zero component means the axis is not resized.
    pub fn direction(self) -> Vec2 {
        match self {
            HandleKind::Corner(corner) => corner.direction(),
            HandleKind::Edge(Edge::Top) => Vec2::new(0.0, -1.0),
            HandleKind::Edge(Edge::Right) => Vec2::new(1.0, 0.0),
            HandleKind::Edge(Edge::Bottom) => Vec2::new(0.0, 1.0),
            HandleKind::Edge(Edge::Left) => Vec2::new(-1.0, 0.0),
            HandleKind::Rotate => Vec2::ZERO,
        }
    }

    /// Class name of the handle node.
    pub fn class_name(self) -> &'static str {
        match self {
            HandleKind::Corner(Corner::TopLeft) => "imageframe-handle-tl",
            HandleKind::Corner(Corner::TopRight) => "imageframe-handle-tr",
            HandleKind::Corner(Corner::BottomLeft) => "imageframe-handle-bl",
            HandleKind::Corner(Corner::BottomRight) => "imageframe-handle-br",
            HandleKind::Edge(Edge::Top) => "imageframe-handle-t",
            HandleKind::Edge(Edge::Right) => "imageframe-handle-r",
            HandleKind::Edge(Edge::Bottom) => "imageframe-handle-b",
            HandleKind::Edge(Edge::Left) => "imageframe-handle-l",
            HandleKind::Rotate => "imageframe-handle-rotate",
        }
    }
}

/// A handle with its position on screen.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a screen point hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_hit_test() {
        let handle = Handle::new(Point::new(50.0, 50.0), HandleKind::Rotate);
        assert!(handle.hit_test(Point::new(50.0, 50.0), 10.0));
        assert!(handle.hit_test(Point::new(55.0, 55.0), 10.0));
        assert!(!handle.hit_test(Point::new(70.0, 50.0), 10.0));
    }

    #[test]
    fn test_class_names_are_unique() {
        let mut names: Vec<_> = RESIZE_HANDLES.iter().map(|h| h.class_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RESIZE_HANDLES.len());
    }
}
