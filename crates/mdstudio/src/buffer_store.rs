//! The single owner of the source buffer.
//!
//! Every mutation goes through [`BufferStore::update`], which replaces the
//! buffer in full, persists it, and then notifies subscribers in the order
//! they subscribed. Storage failures never block editing: the store keeps
//! working in memory and reports the degradation through
//! [`BufferStore::is_persistent`].

use crate::storage::{KeyValueStore, StorageError, CONTENT_KEY, VERSION_KEY};

/// Schema version of the persisted buffer for this release.
pub const CURRENT_VERSION: &str = "v1.0";

pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(&str)>;

pub struct BufferStore {
    storage: Box<dyn KeyValueStore>,
    version: String,
    fallback: String,
    buffer: String,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: SubscriptionId,
    persistent: bool,
}

impl BufferStore {
    /// Create the store and immediately load the persisted buffer.
    pub fn open(
        storage: Box<dyn KeyValueStore>,
        version: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        let fallback = fallback.into();
        let mut store = Self {
            storage,
            version: version.into(),
            buffer: fallback.clone(),
            fallback,
            listeners: Vec::new(),
            next_id: 0,
            persistent: true,
        };
        store.load();
        store
    }

    /// Read the persisted buffer, falling back to the bundled document when
    /// nothing is stored or the stored schema version is stale. On a stale or
    /// missing version tag the fallback replaces the stored buffer before the
    /// tag is rewritten, so old content can never reappear under a new tag.
    pub fn load(&mut self) -> String {
        self.buffer = match self.read_persisted() {
            Ok(Some(content)) => content,
            Ok(None) => self.fallback.clone(),
            Err(e) => {
                self.mark_degraded(&e);
                self.fallback.clone()
            }
        };
        self.buffer.clone()
    }

    fn read_persisted(&mut self) -> Result<Option<String>, StorageError> {
        let stored_version = self.storage.get(VERSION_KEY)?;
        if stored_version.as_deref() != Some(self.version.as_str()) {
            log::info!(
                "Stored schema version {:?} does not match {}, using default document",
                stored_version,
                self.version
            );
            self.storage.set(CONTENT_KEY, &self.fallback)?;
            self.storage.set(VERSION_KEY, &self.version)?;
            return Ok(None);
        }

        // An empty stored buffer counts as no buffer
        Ok(self
            .storage
            .get(CONTENT_KEY)?
            .filter(|content| !content.is_empty()))
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether the last storage operation succeeded.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn update(&mut self, new: impl Into<String>) {
        self.buffer = new.into();

        match self.storage.set(CONTENT_KEY, &self.buffer) {
            Ok(()) => {
                if !self.persistent {
                    log::info!("Storage is writable again");
                }
                self.persistent = true;
            }
            Err(e) => self.mark_degraded(&e),
        }

        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.buffer);
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn mark_degraded(&mut self, error: &StorageError) {
        if self.persistent {
            log::warn!("Storage unavailable, continuing in memory: {}", error);
        } else {
            log::debug!("Storage still unavailable: {}", error);
        }
        self.persistent = false;
    }
}
