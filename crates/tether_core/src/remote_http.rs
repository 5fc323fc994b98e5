//! HTTP implementation of the remote graph client.
//!
//! Synchronous `ureq` agent with a bounded per-request timeout and a plain
//! retry loop: transient transport errors and 5xx responses are retried
//! with exponential backoff; authentication failures and validation errors
//! surface immediately.

use crate::config::{RemoteConfig, SyncContext};
use crate::entity::EntityId;
use crate::error::{Result, TetherError};
use crate::remote::{
    EventDraft, EventPage, EventRecord, GraphRemote, RemoteEntity, RemoteState, StatePatch,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Response body of a state patch.
#[derive(Deserialize)]
struct PatchResponse {
    version: u64,
}

/// Outcome of a single HTTP call after error mapping.
enum HttpOutcome {
    Ok(ureq::Response),
    NotFound,
}

/// Production [`GraphRemote`] backed by the graph service's HTTP API.
pub struct HttpGraphClient {
    agent: ureq::Agent,
    probe_agent: ureq::Agent,
    base_url: String,
    context: SyncContext,
    retry_attempts: u32,
    retry_base_delay: Duration,
}

impl HttpGraphClient {
    /// Builds a client from remote configuration and a sync context.
    pub fn new(config: &RemoteConfig, context: SyncContext) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout()).build();
        // Probes get their own short deadline so auto-push never stalls a
        // status-mutation command behind the full request timeout.
        let probe_agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(3))
            .build();

        Self {
            agent,
            probe_agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            context,
            retry_attempts: config.retry_attempts.max(1),
            retry_base_delay: config.retry_base_delay(),
        }
    }

    /// Overrides the probe timeout (auto-push reachability check).
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_agent = ureq::AgentBuilder::new().timeout(timeout).build();
        self
    }

    /// Converts this client into its auto-push variant: every call runs
    /// on the short probe deadline with a single attempt, so a
    /// status-mutation command never stalls behind the full request
    /// timeout or the backoff loop. Failures degrade to the offline queue
    /// instead of being retried.
    pub fn into_autopush(self) -> Self {
        Self {
            agent: self.probe_agent.clone(),
            retry_attempts: 1,
            ..self
        }
    }

    fn entity_url(&self, entity_id: &EntityId) -> String {
        format!(
            "{}/projects/{}/entities/{}",
            self.base_url, self.context.project_id, entity_id
        )
    }

    fn events_url(&self) -> String {
        format!("{}/projects/{}/events", self.base_url, self.context.project_id)
    }

    fn authorize(&self, req: ureq::Request) -> ureq::Request {
        match &self.context.token {
            Some(token) => req.set("Authorization", &format!("Bearer {}", token)),
            None => req,
        }
    }

    /// Runs one remote call with retry.
    ///
    /// Retried: transport errors, 408, 429, 5xx. Not retried: 401/403
    /// (auth) and other 4xx (validation). 404 is reported as `NotFound`
    /// so reads can distinguish "never pushed" from a real failure.
    fn call_with_retry<F>(&self, op: &str, entity: Option<&EntityId>, f: F) -> Result<HttpOutcome>
    where
        F: Fn() -> std::result::Result<ureq::Response, ureq::Error>,
    {
        let mut delay = self.retry_base_delay;
        let mut last_transient = String::new();

        for attempt in 1..=self.retry_attempts {
            match f() {
                Ok(resp) => return Ok(HttpOutcome::Ok(resp)),
                Err(ureq::Error::Status(code, resp)) => {
                    let body = resp.into_string().unwrap_or_default();
                    let message = truncate(&body, 200);

                    match code {
                        401 | 403 => return Err(TetherError::Auth(message)),
                        404 => return Ok(HttpOutcome::NotFound),
                        408 | 429 | 500..=599 => {
                            last_transient = format!("{} returned {}: {}", op, code, message);
                        }
                        _ => {
                            return Err(TetherError::Validation {
                                entity_id: entity
                                    .map(|e| e.to_string())
                                    .unwrap_or_else(|| "-".to_string()),
                                message: format!("{} ({})", message, code),
                            })
                        }
                    }
                }
                Err(ureq::Error::Transport(t)) => {
                    last_transient = format!("{}: {}", op, t);
                }
            }

            if attempt < self.retry_attempts {
                debug!(op, attempt, delay_ms = delay.as_millis() as u64, "retrying remote call");
                std::thread::sleep(delay);
                delay *= 2;
            }
        }

        warn!(op, "remote call failed after {} attempts", self.retry_attempts);
        Err(TetherError::Transient(last_transient))
    }
}

impl GraphRemote for HttpGraphClient {
    fn upsert_content(&self, entity: &RemoteEntity) -> Result<()> {
        let url = self.entity_url(&entity.id);
        let body = serde_json::to_value(entity)
            .map_err(|e| TetherError::Serialization(e.to_string()))?;

        match self.call_with_retry("upsert_content", Some(&entity.id), || {
            self.authorize(self.agent.put(&url)).send_json(body.clone())
        })? {
            HttpOutcome::Ok(_) => Ok(()),
            HttpOutcome::NotFound => Err(TetherError::Validation {
                entity_id: entity.id.to_string(),
                message: "remote project not found".to_string(),
            }),
        }
    }

    fn patch_state(&self, entity_id: &EntityId, patch: &StatePatch) -> Result<u64> {
        let url = format!("{}/state", self.entity_url(entity_id));
        let body = serde_json::json!({ "fields": patch });

        match self.call_with_retry("patch_state", Some(entity_id), || {
            self.authorize(self.agent.request("PATCH", &url))
                .send_json(body.clone())
        })? {
            HttpOutcome::Ok(resp) => {
                let parsed: PatchResponse = resp
                    .into_json()
                    .map_err(|e| TetherError::Transient(format!("patch_state: {}", e)))?;
                Ok(parsed.version)
            }
            HttpOutcome::NotFound => Err(TetherError::Validation {
                entity_id: entity_id.to_string(),
                message: "entity not found on remote; push its content first".to_string(),
            }),
        }
    }

    fn append_event(&self, event: &EventDraft) -> Result<EventRecord> {
        let url = self.events_url();
        let body = serde_json::to_value(event)
            .map_err(|e| TetherError::Serialization(e.to_string()))?;
        let key = event.idempotency_key.to_string();

        match self.call_with_retry("append_event", Some(&event.entity_id), || {
            self.authorize(self.agent.post(&url))
                .set("Idempotency-Key", &key)
                .send_json(body.clone())
        })? {
            HttpOutcome::Ok(resp) => resp
                .into_json()
                .map_err(|e| TetherError::Transient(format!("append_event: {}", e))),
            HttpOutcome::NotFound => Err(TetherError::Validation {
                entity_id: event.entity_id.to_string(),
                message: "remote project not found".to_string(),
            }),
        }
    }

    fn fetch_state(&self, entity_id: &EntityId) -> Result<Option<RemoteState>> {
        let url = format!("{}/state", self.entity_url(entity_id));

        match self.call_with_retry("fetch_state", Some(entity_id), || {
            self.authorize(self.agent.get(&url)).call()
        })? {
            HttpOutcome::Ok(resp) => {
                let state: RemoteState = resp
                    .into_json()
                    .map_err(|e| TetherError::Transient(format!("fetch_state: {}", e)))?;
                Ok(Some(state))
            }
            HttpOutcome::NotFound => Ok(None),
        }
    }

    fn fetch_events_since(&self, cursor: Option<&str>, limit: usize) -> Result<EventPage> {
        let url = self.events_url();

        match self.call_with_retry("fetch_events", None, || {
            let mut req = self
                .authorize(self.agent.get(&url))
                .query("limit", &limit.to_string());
            if let Some(cursor) = cursor {
                req = req.query("after", cursor);
            }
            req.call()
        })? {
            HttpOutcome::Ok(resp) => resp
                .into_json()
                .map_err(|e| TetherError::Transient(format!("fetch_events: {}", e))),
            HttpOutcome::NotFound => Ok(EventPage {
                events: vec![],
                next_cursor: None,
            }),
        }
    }

    fn probe(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.probe_agent.get(&url).call() {
            Ok(_) => true,
            // Any HTTP status means the service answered; only transport
            // failures count as unreachable.
            Err(ureq::Error::Status(_, _)) => true,
            Err(ureq::Error::Transport(_)) => false,
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
