use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tether_core::{
    EntityId, EventDraft, EventPage, EventRecord, GraphRemote, RemoteEntity, RemoteState,
    Result, StatePatch, TetherError,
};
use uuid::Uuid;

/// In-memory graph remote with scriptable failures.
///
/// Models the semantics the real service promises: idempotent upserts,
/// versioned field-level state patches, and an append-only event stream
/// that deduplicates on idempotency key.
#[derive(Default)]
pub struct ScriptedRemote {
    inner: Mutex<Inner>,
}

struct Inner {
    online: bool,
    /// Entities whose writes are rejected with a validation error.
    rejected: BTreeSet<EntityId>,
    upserts: Vec<RemoteEntity>,
    patches: Vec<(EntityId, StatePatch)>,
    states: BTreeMap<EntityId, RemoteState>,
    stream: Vec<EventRecord>,
    seen_keys: BTreeMap<Uuid, EventRecord>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            online: true,
            rejected: BTreeSet::new(),
            upserts: Vec::new(),
            patches: Vec::new(),
            states: BTreeMap::new(),
            stream: Vec::new(),
            seen_keys: BTreeMap::new(),
        }
    }
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, online: bool) {
        self.inner.lock().unwrap().online = online;
    }

    /// Makes every write for this entity fail with a validation error.
    pub fn reject_entity(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .rejected
            .insert(EntityId::new(id));
    }

    /// Seeds remote-side state, as if another client had written it.
    pub fn seed_state(&self, id: &str, version: u64, fields: &[(&str, Value)]) {
        let entity_id = EntityId::new(id);
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.inner.lock().unwrap().states.insert(
            entity_id.clone(),
            RemoteState {
                entity_id,
                version,
                fields,
            },
        );
    }

    /// Seeds the remote event stream.
    pub fn seed_event(&self, entity_id: &str, description: &str) {
        let mut inner = self.inner.lock().unwrap();
        let record = EventRecord {
            id: format!("evt-{:04}", inner.stream.len() + 1),
            entity_id: EntityId::new(entity_id),
            timestamp: 1_700_000_000,
            category: tether_core::EventCategory::Note,
            description: description.to_string(),
            actor: "remote".to_string(),
        };
        inner.stream.push(record);
    }

    pub fn upsert_count(&self) -> usize {
        self.inner.lock().unwrap().upserts.len()
    }

    pub fn patch_count(&self) -> usize {
        self.inner.lock().unwrap().patches.len()
    }

    pub fn event_count(&self) -> usize {
        self.inner.lock().unwrap().stream.len()
    }

    pub fn upserted_ids(&self) -> Vec<EntityId> {
        self.inner
            .lock()
            .unwrap()
            .upserts
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn patches_for(&self, id: &str) -> Vec<StatePatch> {
        let entity_id = EntityId::new(id);
        self.inner
            .lock()
            .unwrap()
            .patches
            .iter()
            .filter(|(id, _)| *id == entity_id)
            .map(|(_, patch)| patch.clone())
            .collect()
    }

    pub fn state_of(&self, id: &str) -> Option<RemoteState> {
        self.inner.lock().unwrap().states.get(&EntityId::new(id)).cloned()
    }
}

impl GraphRemote for ScriptedRemote {
    fn upsert_content(&self, entity: &RemoteEntity) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable(&entity.id)?;
        inner.upserts.push(entity.clone());
        Ok(())
    }

    fn patch_state(&self, entity_id: &EntityId, patch: &StatePatch) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable(entity_id)?;
        inner.patches.push((entity_id.clone(), patch.clone()));

        let state = inner
            .states
            .entry(entity_id.clone())
            .or_insert_with(|| RemoteState {
                entity_id: entity_id.clone(),
                version: 0,
                fields: BTreeMap::new(),
            });
        for (field, value) in patch.fields() {
            state.fields.insert(field.clone(), value.clone());
        }
        state.version += 1;
        Ok(state.version)
    }

    fn append_event(&self, event: &EventDraft) -> Result<EventRecord> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable(&event.entity_id)?;

        if let Some(existing) = inner.seen_keys.get(&event.idempotency_key) {
            return Ok(existing.clone());
        }

        let record = EventRecord {
            id: format!("evt-{:04}", inner.stream.len() + 1),
            entity_id: event.entity_id.clone(),
            timestamp: 1_700_000_000,
            category: event.category,
            description: event.description.clone(),
            actor: event.actor.clone(),
        };
        inner.stream.push(record.clone());
        inner.seen_keys.insert(event.idempotency_key, record.clone());
        Ok(record)
    }

    fn fetch_state(&self, entity_id: &EntityId) -> Result<Option<RemoteState>> {
        let inner = self.inner.lock().unwrap();
        if !inner.online {
            return Err(TetherError::Transient("remote offline".to_string()));
        }
        Ok(inner.states.get(entity_id).cloned())
    }

    fn fetch_events_since(&self, cursor: Option<&str>, limit: usize) -> Result<EventPage> {
        let inner = self.inner.lock().unwrap();
        if !inner.online {
            return Err(TetherError::Transient("remote offline".to_string()));
        }

        let start = match cursor {
            Some(cursor) => inner
                .stream
                .iter()
                .position(|e| e.id == cursor)
                .map(|i| i + 1)
                .unwrap_or(inner.stream.len()),
            None => 0,
        };

        let events: Vec<_> = inner.stream[start..].iter().take(limit).cloned().collect();
        let next_cursor = if start + events.len() < inner.stream.len() {
            events.last().map(|e| e.id.clone())
        } else {
            None
        };
        Ok(EventPage {
            events,
            next_cursor,
        })
    }

    fn probe(&self) -> bool {
        self.inner.lock().unwrap().online
    }
}

impl Inner {
    fn check_writable(&self, entity_id: &EntityId) -> Result<()> {
        if !self.online {
            return Err(TetherError::Transient("remote offline".to_string()));
        }
        if self.rejected.contains(entity_id) {
            return Err(TetherError::Validation {
                entity_id: entity_id.to_string(),
                message: "rejected by script".to_string(),
            });
        }
        Ok(())
    }
}
