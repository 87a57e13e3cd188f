//! In-memory session registry shared by every relay connection.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use sealchat_core::protocol::{ClientEntry, KeyMaterial, Record};

/// A registered session: who it is and how to reach it.
pub struct SessionRecord {
    /// Transport endpoint address of the owning connection.
    pub identifier: String,
    /// Display name supplied at registration.
    pub name: Option<String>,
    /// Public key exactly as the client sent it.
    pub public_key: KeyMaterial,
    /// Queue drained by the connection's writer task.
    outbound: mpsc::Sender<Record>,
    /// Registration order; survives re-registration.
    seq: u64,
}

impl SessionRecord {
    /// Push a record to this session's connection without waiting.
    ///
    /// A full queue counts as unwritable: a receiver that stops reading must
    /// not stall the sessions that message it.
    pub fn deliver(&self, record: Record) -> Result<(), mpsc::error::TrySendError<Record>> {
        self.outbound.try_send(record)
    }

    /// Whether the connection's writer is still draining the queue.
    pub fn is_writable(&self) -> bool {
        !self.outbound.is_closed()
    }

    pub fn entry(&self) -> ClientEntry {
        ClientEntry {
            identifier: self.identifier.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, Arc<SessionRecord>>,
    next_seq: u64,
}

impl Sessions {
    /// Records in registration order.
    fn ordered(&self) -> Vec<&Arc<SessionRecord>> {
        let mut records: Vec<_> = self.by_id.values().collect();
        records.sort_by_key(|r| r.seq);
        records
    }
}

/// Thread-safe registry of registered sessions, keyed by connection identifier.
///
/// Every operation takes the lock once, so each insert, lookup, removal and
/// snapshot is atomic with respect to other connections.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<Sessions>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the entry for `identifier`.
    ///
    /// Re-registering keeps the entry's place in registration order.
    pub async fn register(
        &self,
        identifier: String,
        name: Option<String>,
        public_key: KeyMaterial,
        outbound: mpsc::Sender<Record>,
    ) -> Arc<SessionRecord> {
        let mut sessions = self.sessions.write().await;
        let existing_seq = sessions.by_id.get(&identifier).map(|r| r.seq);
        let seq = if let Some(seq) = existing_seq {
            seq
        } else {
            sessions.next_seq += 1;
            sessions.next_seq
        };
        let record = Arc::new(SessionRecord {
            identifier: identifier.clone(),
            name,
            public_key,
            outbound,
            seq,
        });
        let replaced = sessions
            .by_id
            .insert(identifier.clone(), Arc::clone(&record))
            .is_some();
        info!(identifier = %identifier, name = ?record.name, replaced, "Session registered");
        record
    }

    /// Remove a session. Removing an absent entry is a no-op.
    pub async fn unregister(&self, identifier: &str) -> Option<Arc<SessionRecord>> {
        let record = self.sessions.write().await.by_id.remove(identifier);
        if record.is_some() {
            info!(identifier = %identifier, "Session unregistered");
        } else {
            debug!(identifier = %identifier, "No session to unregister");
        }
        record
    }

    /// Get a session by identifier.
    pub async fn get(&self, identifier: &str) -> Option<Arc<SessionRecord>> {
        self.sessions.read().await.by_id.get(identifier).cloned()
    }

    /// Every registered session, in registration order.
    pub async fn snapshot(&self) -> Vec<ClientEntry> {
        self.sessions
            .read()
            .await
            .ordered()
            .into_iter()
            .map(|r| r.entry())
            .collect()
    }

    /// Resolve a chat target: exact identifier first, then the first other
    /// session (registration order) whose display name equals `target`.
    pub async fn resolve_target(&self, target: &str, requester: &str) -> Option<Arc<SessionRecord>> {
        let sessions = self.sessions.read().await;
        if let Some(record) = sessions.by_id.get(target) {
            return Some(Arc::clone(record));
        }
        sessions
            .ordered()
            .into_iter()
            .find(|r| r.identifier != requester && r.name.as_deref() == Some(target))
            .cloned()
    }

    /// Count of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.by_id.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(n: &str) -> KeyMaterial {
        KeyMaterial {
            e: "3".into(),
            n: n.into(),
        }
    }

    async fn add(registry: &SessionRegistry, id: &str, name: Option<&str>) -> mpsc::Receiver<Record> {
        let (tx, rx) = mpsc::channel(16);
        registry
            .register(id.into(), name.map(String::from), key("3233"), tx)
            .await;
        rx
    }

    #[tokio::test]
    async fn register_and_get_session() {
        let registry = SessionRegistry::new();
        let _rx = add(&registry, "10.0.0.1:1000", Some("alice")).await;

        let record = registry.get("10.0.0.1:1000").await.unwrap();
        assert_eq!(record.name.as_deref(), Some("alice"));
        assert_eq!(record.public_key, key("3233"));
        assert!(registry.get("10.0.0.2:1000").await.is_none());
    }

    #[tokio::test]
    async fn reregister_overwrites_in_place() {
        let registry = SessionRegistry::new();
        let _a = add(&registry, "a", Some("alice")).await;
        let _b = add(&registry, "b", Some("bob")).await;
        let _a2 = add(&registry, "a", Some("alicia")).await;

        assert_eq!(registry.len().await, 2);
        let names: Vec<_> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.name.unwrap())
            .collect();
        assert_eq!(names, vec!["alicia", "bob"]);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = SessionRegistry::new();
        let _rx = add(&registry, "a", None).await;

        assert!(registry.unregister("a").await.is_some());
        assert!(registry.unregister("a").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn snapshot_in_registration_order() {
        let registry = SessionRegistry::new();
        let _c = add(&registry, "c", Some("carol")).await;
        let _a = add(&registry, "a", Some("alice")).await;
        let _b = add(&registry, "b", None).await;

        let ids: Vec<_> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.identifier)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn resolve_prefers_identifier_then_name() {
        let registry = SessionRegistry::new();
        let _a = add(&registry, "a", Some("b")).await;
        let _b = add(&registry, "b", Some("bob")).await;

        // "b" is both an identifier and a display name; identifier wins.
        let hit = registry.resolve_target("b", "x").await.unwrap();
        assert_eq!(hit.identifier, "b");

        let hit = registry.resolve_target("bob", "x").await.unwrap();
        assert_eq!(hit.identifier, "b");

        assert!(registry.resolve_target("nobody", "x").await.is_none());
    }

    #[tokio::test]
    async fn name_scan_skips_requester_and_takes_first_match() {
        let registry = SessionRegistry::new();
        let _a = add(&registry, "a", Some("sam")).await;
        let _b = add(&registry, "b", Some("sam")).await;
        let _c = add(&registry, "c", Some("sam")).await;

        let hit = registry.resolve_target("sam", "a").await.unwrap();
        assert_eq!(hit.identifier, "b");
        let hit = registry.resolve_target("sam", "z").await.unwrap();
        assert_eq!(hit.identifier, "a");
    }

    #[tokio::test]
    async fn deliver_reaches_queue_and_detects_closed() {
        let registry = SessionRegistry::new();
        let mut rx = add(&registry, "a", None).await;
        let record = registry.get("a").await.unwrap();

        record.deliver(Record::ListRequest).unwrap();
        assert_eq!(rx.recv().await.unwrap(), Record::ListRequest);

        drop(rx);
        assert!(!record.is_writable());
        assert!(matches!(
            record.deliver(Record::ListRequest),
            Err(mpsc::error::TrySendError::Closed(_))
        ));
    }

    #[tokio::test]
    async fn deliver_to_full_queue_fails_immediately() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let record = registry
            .register("a".into(), None, key("3233"), tx)
            .await;

        record.deliver(Record::ListRequest).unwrap();
        assert!(matches!(
            record.deliver(Record::ListRequest),
            Err(mpsc::error::TrySendError::Full(_))
        ));
    }
}
