//! Pointer input delivered to the editing controls.

use crate::dom::NodeId;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Pointer event type for unified mouse/touch handling.
///
/// Positions are page coordinates. `target` is the node the host found
/// under the pointer, if any; controls fall back to geometric hit testing
/// when it is missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        target: Option<NodeId>,
    },
    Move {
        position: Point,
    },
    Up {
        position: Point,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position } => position,
        }
    }
}

/// State of an active drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState<K> {
    /// What is being dragged.
    pub grip: K,
    /// Starting point of the drag.
    pub start_point: Point,
    /// Current point of the drag.
    pub current_point: Point,
}

impl<K> DragState<K> {
    pub fn new(grip: K, start_point: Point) -> Self {
        Self {
            grip,
            start_point,
            current_point: start_point,
        }
    }

    /// Get the drag delta.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }
}
