//! The staging queue.
//!
//! Validated files wait here, each tagged with a [`WarmthTag`], until the user
//! submits. The queue is an ordinary owned value: whoever holds `&mut
//! StagingQueue` is the only writer, and the [`Submitter`](crate::submit::Submitter)
//! takes it by mutable reference to drain it.
//!
//! Files picked but not yet tagged sit in a [`PendingSelection`]; choosing a
//! tag calls [`StagingQueue::confirm`], which stages all of them or none.
//!
//! Every item owns a [`PreviewHandle`]. Removing an item, replacing its
//! source, draining it for submission or dropping the queue releases the
//! handle through `Drop`.

use crate::config::LimitsConfig;
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::types::{SourceFile, WarmthTag};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is full (capacity {capacity})")]
    Full { capacity: usize },
}

/// Opaque, process-unique item identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(Uuid);

impl ItemId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One staged file.
#[derive(Debug)]
pub struct QueueItem {
    pub id: ItemId,
    pub source: SourceFile,
    pub preview: PreviewHandle,
    pub warmth: WarmthTag,
    /// Presentation only; submission ignores it.
    pub editing: bool,
}

/// Validated files waiting for a tag.
#[derive(Debug, Default)]
pub struct PendingSelection {
    files: Vec<SourceFile>,
}

impl PendingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(files: Vec<SourceFile>) -> Self {
        Self { files }
    }

    pub fn push(&mut self, file: SourceFile) {
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Abandon the selection (the "cancel" path).
    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Ordered, bounded collection of [`QueueItem`]s.
#[derive(Debug)]
pub struct StagingQueue {
    items: Vec<QueueItem>,
    capacity: usize,
    previews: PreviewRegistry,
}

impl StagingQueue {
    pub fn new(capacity: usize) -> Self {
        Self::with_registry(capacity, PreviewRegistry::new())
    }

    pub fn with_registry(capacity: usize, previews: PreviewRegistry) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            previews,
        }
    }

    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self::new(limits.queue_capacity)
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    pub fn get(&self, id: ItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Stage `source` with `tag`. Fails when the queue is at capacity.
    pub fn add(&mut self, source: SourceFile, tag: WarmthTag) -> Result<ItemId, QueueError> {
        if self.items.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        let id = ItemId::new();
        let preview = self.previews.acquire(&source.name);
        tracing::debug!(%id, name = %source.name, tag = %tag, "staged");
        self.items.push(QueueItem {
            id,
            source,
            preview,
            warmth: tag,
            editing: false,
        });
        Ok(id)
    }

    /// Stage every pending file with `tag`, or none of them.
    ///
    /// On success the pending selection is emptied. When the files do not all
    /// fit, nothing is staged and the selection is left as it was.
    pub fn confirm(
        &mut self,
        pending: &mut PendingSelection,
        tag: WarmthTag,
    ) -> Result<Vec<ItemId>, QueueError> {
        if pending.len() > self.remaining() {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        let mut ids = Vec::with_capacity(pending.len());
        for file in pending.files.drain(..) {
            ids.push(self.add(file, tag)?);
        }
        Ok(ids)
    }

    /// Remove an item, releasing its preview. `false` if absent.
    pub fn remove(&mut self, id: ItemId) -> bool {
        match self.position(id) {
            Some(idx) => {
                let item = self.items.remove(idx);
                tracing::debug!(%id, name = %item.source.name, "removed");
                true
            }
            None => false,
        }
    }

    pub fn update_tag(&mut self, id: ItemId, tag: WarmthTag) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.warmth = tag;
                true
            }
            None => false,
        }
    }

    /// Flip the editing flag and return its new value.
    pub fn toggle_edit(&mut self, id: ItemId) -> Option<bool> {
        let item = self.get_mut(id)?;
        item.editing = !item.editing;
        Some(item.editing)
    }

    /// Swap an item's source. The old preview is released and a new one issued.
    pub fn replace_source(&mut self, id: ItemId, source: SourceFile) -> bool {
        let preview = self.previews.acquire(&source.name);
        match self.get_mut(id) {
            Some(item) => {
                item.source = source;
                // Assigning drops the previous handle.
                item.preview = preview;
                true
            }
            None => false,
        }
    }

    /// Remove and return the listed items, in queue order. Unknown ids are ignored.
    pub fn drain(&mut self, ids: &[ItemId]) -> Vec<QueueItem> {
        let (drained, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| ids.contains(&item.id));
        self.items = kept;
        drained
    }

    /// Remove and return everything, in queue order.
    pub fn drain_all(&mut self) -> Vec<QueueItem> {
        std::mem::take(&mut self.items)
    }
}

impl Default for StagingQueue {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::default())
    }
}
