//! Events emitted by an editable image.

use crate::dom::NodeId;

/// Something that happened to an [`EditableImage`](crate::editable::EditableImage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEvent {
    /// Size, rotation or crop rectangle changed.
    Transform,
    /// The wrapper was re-measured after a transform.
    Recalculated,
    /// The image was removed from the document.
    Delete,
    /// A click landed on a node of the scaffold.
    Click(NodeId),
    DoubleClick(NodeId),
}

/// Pending events of one model, drained by whoever drives the session.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    pending: Vec<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Take pending events, oldest first (drains the queue).
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
