//! Child-list mutation observation.
//!
//! Structural changes are recorded synchronously and queued per observer.
//! They only reach observers when the owner of the document takes the
//! queued batches, which mirrors the asynchronous delivery of browser
//! mutation observers: whatever runs between the mutation and the delivery
//! may already have invalidated the observer's interest.

use super::NodeId;
use std::collections::BTreeMap;

/// Handle to a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// What an observer wants to hear about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Report insertions and removals of the target's children.
    pub child_list: bool,
    /// Extend `child_list` to every descendant of the target.
    pub subtree: bool,
}

impl ObserveOptions {
    /// Direct children only.
    pub fn children() -> Self {
        Self {
            child_list: true,
            subtree: false,
        }
    }

    /// Children of the target and of all its descendants.
    pub fn subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
        }
    }
}

/// One structural change under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose child list changed.
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Records delivered to one observer in one checkpoint.
#[derive(Debug, Clone)]
pub struct MutationBatch {
    pub observer: ObserverId,
    pub records: Vec<MutationRecord>,
}

#[derive(Debug)]
struct Registration {
    target: NodeId,
    options: ObserveOptions,
    pending: Vec<MutationRecord>,
}

/// Observer bookkeeping owned by a document.
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    registrations: BTreeMap<ObserverId, Registration>,
}

impl ObserverRegistry {
    pub fn register(&mut self, target: NodeId, options: ObserveOptions) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.registrations.insert(
            id,
            Registration {
                target,
                options,
                pending: Vec::new(),
            },
        );
        id
    }

    /// Drop an observer together with anything still queued for it.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        self.registrations.remove(&id).is_some()
    }

    pub fn is_registered(&self, id: ObserverId) -> bool {
        self.registrations.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Observers interested in a child-list change of `target`.
    ///
    /// `contains(ancestor, node)` answers whether `node` lies inside
    /// `ancestor`; it must be evaluated before the tree changes.
    pub fn interested(
        &self,
        target: NodeId,
        contains: impl Fn(NodeId, NodeId) -> bool,
    ) -> Vec<ObserverId> {
        self.registrations
            .iter()
            .filter(|(_, reg)| reg.options.child_list)
            .filter(|(_, reg)| {
                reg.target == target || (reg.options.subtree && contains(reg.target, target))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn enqueue(&mut self, observers: &[ObserverId], record: &MutationRecord) {
        for id in observers {
            if let Some(reg) = self.registrations.get_mut(id) {
                reg.pending.push(record.clone());
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.registrations.values().any(|reg| !reg.pending.is_empty())
    }

    /// Drain every non-empty queue, one batch per observer.
    pub fn take_batches(&mut self) -> Vec<MutationBatch> {
        self.registrations
            .iter_mut()
            .filter(|(_, reg)| !reg.pending.is_empty())
            .map(|(id, reg)| MutationBatch {
                observer: *id,
                records: std::mem::take(&mut reg.pending),
            })
            .collect()
    }
}
