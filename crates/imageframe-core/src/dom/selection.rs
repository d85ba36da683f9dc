//! Document selection.

use super::NodeId;
use serde::{Deserialize, Serialize};

/// A position between two children of `node` (or inside a text node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

/// A selected range, from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

impl Range {
    /// A caret at `offset` inside `node`.
    pub fn collapsed(node: NodeId, offset: usize) -> Self {
        let boundary = Boundary { node, offset };
        Self {
            start: boundary,
            end: boundary,
        }
    }

    /// The range covering exactly the child at `index` of `parent`.
    pub fn around(parent: NodeId, index: usize) -> Self {
        Self {
            start: Boundary {
                node: parent,
                offset: index,
            },
            end: Boundary {
                node: parent,
                offset: index + 1,
            },
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}
