//! Deletion detection over document mutation records.

use crate::dom::{Document, MutationBatch, NodeId, ObserveOptions, ObserverId};
use crate::error::{Error, Result};

type DeleteCallback = Box<dyn FnMut(NodeId)>;

/// Watches a node for its own removal and for removals inside its subtree.
///
/// Two observers are registered: one on the node's subtree and one on its
/// parent's child list. Deliveries are handled per checkpoint, so however
/// many records a checkpoint carries the watcher reports at most once.
pub struct DeletionWatcher {
    node: NodeId,
    active: bool,
    subtree_observer: Option<ObserverId>,
    parent_observer: Option<ObserverId>,
    callback: Option<DeleteCallback>,
}

impl std::fmt::Debug for DeletionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionWatcher")
            .field("node", &self.node)
            .field("active", &self.active)
            .field("subtree_observer", &self.subtree_observer)
            .field("parent_observer", &self.parent_observer)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl DeletionWatcher {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            active: false,
            subtree_observer: None,
            parent_observer: None,
            callback: None,
        }
    }

    /// Call `callback` with the watched node whenever a deletion is reported.
    pub fn with_callback(mut self, callback: impl FnMut(NodeId) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start observing. Does nothing if already active.
    ///
    /// The node must have a parent, otherwise its own removal could never
    /// be seen.
    pub fn start(&mut self, doc: &mut Document) -> Result<()> {
        if self.active {
            return Ok(());
        }
        let parent = doc.parent(self.node).ok_or(Error::DetachedNode(self.node))?;
        self.subtree_observer = Some(doc.observe(self.node, ObserveOptions::subtree()));
        self.parent_observer = Some(doc.observe(parent, ObserveOptions::children()));
        self.active = true;
        log::debug!("Deletion watcher started on {:?}", self.node);
        Ok(())
    }

    /// Stop observing and drop the callback. Batches collected before this
    /// call are ignored when handed in later.
    pub fn stop(&mut self, doc: &mut Document) {
        if let Some(observer) = self.subtree_observer.take() {
            doc.disconnect(observer);
        }
        if let Some(observer) = self.parent_observer.take() {
            doc.disconnect(observer);
        }
        if self.active {
            log::debug!("Deletion watcher stopped on {:?}", self.node);
        }
        self.active = false;
        self.callback = None;
    }

    /// Inspect one checkpoint's batches. Returns true, and runs the
    /// callback once, if any of them reports a deletion.
    pub fn handle_batches(&mut self, batches: &[MutationBatch]) -> bool {
        if !self.active {
            return false;
        }
        let deleted = batches.iter().any(|batch| self.reports_deletion(batch));
        if deleted {
            if let Some(callback) = self.callback.as_mut() {
                callback(self.node);
            }
        }
        deleted
    }

    fn reports_deletion(&self, batch: &MutationBatch) -> bool {
        if Some(batch.observer) == self.subtree_observer {
            return batch.records.iter().any(|r| !r.removed.is_empty());
        }
        if Some(batch.observer) == self.parent_observer {
            return batch.records.iter().any(|r| r.removed.contains(&self.node));
        }
        false
    }
}
