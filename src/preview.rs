//! Revocable preview handles for staged items.
//!
//! A [`PreviewHandle`] stands for whatever display resource a front end
//! derives from a staged file (an object URL, a decoded thumbnail). The handle
//! registers itself with a [`PreviewRegistry`] on creation and unregisters in
//! `Drop`, so removing, replacing, submitting or dropping an item always
//! releases it exactly once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Tracks which preview handles are alive.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<Uuid>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the set, recovering it if a holder panicked.
    fn live(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issue a new handle for the file called `name`.
    pub fn acquire(&self, name: &str) -> PreviewHandle {
        let token = Uuid::new_v4();
        self.live().insert(token);
        tracing::trace!(%token, name, "preview acquired");
        PreviewHandle {
            token,
            registry: self.clone(),
        }
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    pub fn is_live(&self, token: Uuid) -> bool {
        self.live().contains(&token)
    }

    fn release(&self, token: Uuid) {
        self.live().remove(&token);
        tracing::trace!(%token, "preview released");
    }
}

/// A live preview. Released when dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    token: Uuid,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn token(&self) -> Uuid {
        self.token
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.token);
    }
}
