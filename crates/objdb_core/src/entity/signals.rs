//! Lifecycle signals for observing entity construction, saves and deletes.
//!
//! Every entity type owns a [`Signals`] hub. Receivers are connected per
//! [`Signal`] and called synchronously, in connection order, by the code
//! path that emits the event:
//! - construction emits `PreInit` then `PostInit`
//! - saves emit `PreSave` then `PostSave`
//! - deletes emit `PreDelete` then `PostDelete`
//!
//! # Usage
//!
//! ```rust,ignore
//! let id = book_type.signals().connect(Signal::PostSave, |event| {
//!     if let SignalEvent::PostSave { entity, created } = event {
//!         tracing::info!(pkey = ?entity.pkey(), created, "book saved");
//!     }
//! });
//! book_type.signals().disconnect(id);
//! ```

use super::instance::Entity;
use super::types::EntityType;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Attributes were filtered; the entity does not exist yet.
    PreInit,
    /// Construction finished.
    PostInit,
    /// A save is about to start.
    PreSave,
    /// A save finished.
    PostSave,
    /// A delete is about to start.
    PreDelete,
    /// A delete finished.
    PostDelete,
}

/// A lifecycle event delivered to receivers.
#[derive(Debug)]
pub enum SignalEvent<'a> {
    /// Emitted before attributes are assigned.
    PreInit {
        /// The type being constructed.
        entity_type: &'a EntityType,
        /// The filtered attributes.
        attrs: &'a BTreeMap<String, Value>,
    },
    /// Emitted after construction.
    PostInit {
        /// The new entity.
        entity: &'a Entity,
    },
    /// Emitted before a save.
    PreSave {
        /// The entity being saved.
        entity: &'a Entity,
    },
    /// Emitted after a save.
    PostSave {
        /// The saved entity.
        entity: &'a Entity,
        /// `true` if the save inserted a new document.
        created: bool,
    },
    /// Emitted before a delete.
    PreDelete {
        /// The entity being deleted.
        entity: &'a Entity,
    },
    /// Emitted after a delete.
    PostDelete {
        /// The deleted entity.
        entity: &'a Entity,
    },
}

impl SignalEvent<'_> {
    /// Returns the signal this event belongs to.
    #[must_use]
    pub fn signal(&self) -> Signal {
        match self {
            Self::PreInit { .. } => Signal::PreInit,
            Self::PostInit { .. } => Signal::PostInit,
            Self::PreSave { .. } => Signal::PreSave,
            Self::PostSave { .. } => Signal::PostSave,
            Self::PreDelete { .. } => Signal::PreDelete,
            Self::PostDelete { .. } => Signal::PostDelete,
        }
    }
}

/// A connected receiver.
pub type Receiver = Arc<dyn Fn(&SignalEvent<'_>) + Send + Sync>;

/// Handle returned by [`Signals::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(u64);

/// Observer lists of one entity type.
#[derive(Default)]
pub struct Signals {
    receivers: RwLock<Vec<(ReceiverId, Signal, Receiver)>>,
    next_id: AtomicU64,
}

impl Signals {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a receiver to a signal.
    pub fn connect(
        &self,
        signal: Signal,
        receiver: impl Fn(&SignalEvent<'_>) + Send + Sync + 'static,
    ) -> ReceiverId {
        let id = ReceiverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.receivers.write().push((id, signal, Arc::new(receiver)));
        id
    }

    /// Disconnects a receiver. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ReceiverId) -> bool {
        let mut receivers = self.receivers.write();
        let before = receivers.len();
        receivers.retain(|(connected, _, _)| *connected != id);
        receivers.len() != before
    }

    /// Delivers an event to every receiver of its signal.
    ///
    /// Receivers run without the internal lock held, so they may connect or
    /// disconnect receivers themselves. Returns the number of receivers
    /// called.
    pub fn send(&self, event: &SignalEvent<'_>) -> usize {
        let signal = event.signal();
        let matching: Vec<Receiver> = self
            .receivers
            .read()
            .iter()
            .filter(|(_, connected, _)| *connected == signal)
            .map(|(_, _, receiver)| Arc::clone(receiver))
            .collect();
        for receiver in &matching {
            receiver(event);
        }
        matching.len()
    }

    /// Returns the number of receivers connected to `signal`.
    #[must_use]
    pub fn receiver_count(&self, signal: Signal) -> usize {
        self.receivers
            .read()
            .iter()
            .filter(|(_, connected, _)| *connected == signal)
            .count()
    }

    /// Disconnects every receiver.
    pub fn reset(&self) {
        self.receivers.write().clear();
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("receivers", &self.receivers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Configuration, EntityType, Registry, ValueType};
    use std::sync::atomic::AtomicUsize;

    fn registry_with_note() -> (Registry, Arc<EntityType>) {
        let registry = Registry::new();
        let note = registry
            .register(
                EntityType::in_memory("Note")
                    .config(Configuration::new().with_attribute("text", [ValueType::Text])),
            )
            .unwrap();
        (registry, note)
    }

    #[test]
    fn construction_emits_init_signals() {
        let (_registry, note) = registry_with_note();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for signal in [Signal::PreInit, Signal::PostInit] {
            let seen = Arc::clone(&seen);
            note.signals().connect(signal, move |event| {
                seen.lock().push(event.signal());
            });
        }

        note.create([("text", "hi")]).unwrap();
        assert_eq!(*seen.lock(), vec![Signal::PreInit, Signal::PostInit]);
    }

    #[test]
    fn disconnect_and_reset() {
        let signals = Signals::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = signals.connect(Signal::PreSave, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        signals.connect(Signal::PostSave, |_| {});

        assert_eq!(signals.receiver_count(Signal::PreSave), 1);
        assert!(signals.disconnect(id));
        assert!(!signals.disconnect(id));
        assert_eq!(signals.receiver_count(Signal::PreSave), 0);

        signals.reset();
        assert_eq!(signals.receiver_count(Signal::PostSave), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn receivers_only_see_their_signal() {
        let (_registry, note) = registry_with_note();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        note.signals().connect(Signal::PostDelete, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let entity = note.create([("text", "hi")]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let delivered = note
            .signals()
            .send(&SignalEvent::PostDelete { entity: &entity });
        assert_eq!(delivered, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
