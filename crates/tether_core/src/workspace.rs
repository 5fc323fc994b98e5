//! Workspace handle providing the main tether API.

use crate::autopush::{auto_push, AutoPushOutcome};
use crate::cache::{CachedState, EventCache, StateCache};
use crate::config::{Config, SyncContext};
use crate::detect::SyncScope;
use crate::entity::{EntityId, EntityKind, EntityStatus};
use crate::error::{Result, TetherError};
use crate::pull::{self, PullReport};
use crate::push::{self, PushReport};
use crate::queue::{OfflineQueue, QueuedOp};
use crate::remote::{EventCategory, EventDraft, GraphRemote, StatePatch};
use crate::remote_http::HttpGraphClient;
use crate::session::{SessionCursor, SessionStore};
use crate::sync_state::{SyncStateRecord, SyncStateStore};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Name of the hidden state directory.
const TETHER_DIR: &str = ".tether";

/// Tether workspace handle.
///
/// Owns the paths to all local state and mediates every sync operation.
/// Explicit context (project id, credentials) flows from here into each
/// component; nothing reads globals.
pub struct TetherWorkspace {
    /// Root directory containing the workspace (parent of .tether).
    root: PathBuf,
    /// Loaded configuration.
    config: Config,
    /// Time provider for testing (None = use system time).
    time_provider: Option<std::sync::Arc<dyn Fn() -> i64 + Send + Sync>>,
}

impl TetherWorkspace {
    /// Opens an existing tether workspace.
    ///
    /// # Errors
    ///
    /// Returns `NotAWorkspace` if the .tether directory doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let tether_dir = root.join(TETHER_DIR);

        if !tether_dir.exists() {
            return Err(TetherError::NotAWorkspace(root));
        }

        let config = Config::load(&tether_dir)?;

        Ok(Self {
            root,
            config,
            time_provider: None,
        })
    }

    /// Initializes a new tether workspace, scaffolding the content
    /// directories and default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a workspace already exists here.
    pub fn init(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let tether_dir = root.join(TETHER_DIR);

        if tether_dir.exists() {
            return Err(TetherError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "tether workspace already exists in this directory",
            )));
        }

        fs::create_dir_all(tether_dir.join("cache"))?;
        config.save(&tether_dir)?;

        // Caches and the queue are rebuildable or machine-local; the
        // sync-state file is per-clone bookkeeping and stays out of git.
        let gitignore = "sync-state.json\nqueue.json\nsession.json\ncache/\nLOCK\n*.tmp\n";
        fs::write(tether_dir.join(".gitignore"), gitignore)?;

        for dir in ["epics", "sprints", "tasks", "adr", "patterns", "gotchas"] {
            fs::create_dir_all(root.join(dir))?;
        }

        let charter = root.join("charter.md");
        if !charter.exists() {
            fs::write(&charter, "# Project Charter\n\nDescribe the project here.\n")?;
        }

        Ok(Self {
            root,
            config,
            time_provider: None,
        })
    }

    /// Sets a custom time provider for testing.
    pub fn with_time_provider(
        mut self,
        provider: impl Fn() -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.time_provider = Some(std::sync::Arc::new(provider));
        self
    }

    /// Workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn tether_dir(&self) -> PathBuf {
        self.root.join(TETHER_DIR)
    }

    /// Current Unix timestamp from the configured time source.
    pub fn now(&self) -> i64 {
        match &self.time_provider {
            Some(provider) => provider(),
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
        }
    }

    /// Builds the production HTTP client for this workspace's remote.
    pub fn remote_client(&self) -> HttpGraphClient {
        let context = SyncContext::from_config(&self.config);
        HttpGraphClient::new(&self.config.remote, context)
            .with_probe_timeout(self.config.sync.autopush_timeout())
    }

    /// Short-deadline, single-attempt client for the fire-and-forget
    /// auto-push path (status mutations, event logging).
    pub fn autopush_client(&self) -> HttpGraphClient {
        self.remote_client().into_autopush()
    }

    /// Loads the sync-state store.
    pub fn sync_state(&self) -> Result<SyncStateStore> {
        SyncStateStore::load(self.tether_dir().join("sync-state.json"))
    }

    /// Loads the offline queue.
    pub fn queue(&self) -> Result<OfflineQueue> {
        OfflineQueue::load(self.tether_dir().join("queue.json"))
    }

    /// Loads the state read cache.
    pub fn state_cache(&self) -> Result<StateCache> {
        StateCache::load(self.tether_dir().join("cache/state.json"))
    }

    /// Event stream read cache.
    pub fn event_cache(&self) -> EventCache {
        EventCache::new(self.tether_dir().join("cache/events.jsonl"))
    }

    /// Session cursor store.
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.tether_dir().join("session.json"))
    }

    /// Runs a blocking push cycle under the workspace sync lock.
    pub fn push(&self, remote: &dyn GraphRemote, scope: &SyncScope) -> Result<PushReport> {
        let _lock = self.acquire_sync_lock()?;
        let mut sync_state = self.sync_state()?;
        let mut queue = self.queue()?;

        push::push(
            &self.root,
            &mut sync_state,
            &mut queue,
            remote,
            scope,
            self.config.sync.workers,
            self.now(),
        )
    }

    /// Runs a blocking pull cycle under the workspace sync lock.
    pub fn pull(&self, remote: &dyn GraphRemote, scope: &SyncScope) -> Result<PullReport> {
        let _lock = self.acquire_sync_lock()?;
        let mut sync_state = self.sync_state()?;
        let mut state_cache = self.state_cache()?;
        let event_cache = self.event_cache();

        pull::pull(
            &mut sync_state,
            &mut state_cache,
            &event_cache,
            remote,
            scope,
            self.config.sync.event_page_size,
            self.now(),
        )
    }

    /// Applies a status mutation: local state cache first, then
    /// fire-and-forget auto-push.
    ///
    /// The returned outcome describes the sync side only; once the local
    /// update succeeds the mutation itself has succeeded, whatever the
    /// network does.
    pub fn mutate_status(
        &self,
        remote: &dyn GraphRemote,
        entity_id: &EntityId,
        status: EntityStatus,
        actor: &str,
    ) -> Result<AutoPushOutcome> {
        let now = self.now();
        let kind = self.resolve_kind(entity_id)?;

        // Local read cache reflects the mutation immediately so status
        // output is right even fully offline. The version is left alone:
        // only the remote assigns versions.
        let mut cache = self.state_cache()?;
        let mut cached = cache.get(entity_id).cloned().unwrap_or(CachedState {
            version: 0,
            fields: Default::default(),
            pulled_at: now,
        });
        cached.fields.insert(
            "status".to_string(),
            serde_json::Value::String(status.as_str().to_string()),
        );
        cache.put(entity_id.clone(), cached);
        cache.save()?;

        // Track the entity even if it has never been pushed, so pull
        // picks it up once the remote learns about it.
        let mut sync_state = self.sync_state()?;
        if sync_state.get(entity_id).is_none() {
            sync_state.put(SyncStateRecord::new(entity_id.clone(), kind));
            sync_state.save()?;
        }

        let event = EventDraft::new(
            entity_id.clone(),
            EventCategory::Status,
            format!("{} -> {}", entity_id, status.as_str()),
            actor,
        );

        let mut queue = self.queue()?;
        Ok(auto_push(
            &mut queue,
            remote,
            entity_id.clone(),
            kind,
            StatePatch::status(status),
            Some(event),
            now,
        ))
    }

    /// Appends a free-form event to an entity's log, advancing the active
    /// session cursor when the append reaches the remote.
    ///
    /// Offline, the event is queued; the cursor advances when the drained
    /// event is later pulled back into the cache.
    pub fn log_event(
        &self,
        remote: &dyn GraphRemote,
        entity_id: &EntityId,
        category: EventCategory,
        description: &str,
        actor: &str,
    ) -> Result<AutoPushOutcome> {
        let now = self.now();
        let draft = EventDraft::new(entity_id.clone(), category, description, actor);

        if remote.probe() {
            match remote.append_event(&draft) {
                Ok(record) => {
                    self.event_cache().append(std::slice::from_ref(&record))?;
                    let session = self.session_store();
                    if session.active().is_ok() {
                        session.advance(&record.id, now)?;
                    }
                    return Ok(AutoPushOutcome::Applied);
                }
                Err(e) => {
                    warn!(entity = %entity_id, error = %e, "event append failed, queueing");
                }
            }
        }

        let mut queue = self.queue()?;
        queue.enqueue(QueuedOp::AppendEvent { draft }, now)?;
        Ok(AutoPushOutcome::Queued)
    }

    /// Read-only summary for the `status` command.
    pub fn status_summary(&self) -> Result<StatusSummary> {
        let sync_state = self.sync_state()?;
        let cache = self.state_cache()?;

        let entities = sync_state
            .list()
            .map(|record| EntityStatusLine {
                entity_id: record.entity_id.clone(),
                entity_type: record.entity_type,
                pushed: record.last_pushed_hash.is_some(),
                last_pulled_version: record.last_pulled_version,
                last_synced_at: record.last_synced_at,
                status: cache
                    .get(&record.entity_id)
                    .and_then(|c| c.fields.get("status"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            })
            .collect();

        Ok(StatusSummary {
            entities,
            queue_depth: self.queue()?.len(),
            session: self.session_store().get()?,
        })
    }

    /// Resolves an entity's kind from the sync-state store, falling back
    /// to the id prefix convention ("TASK-01" is a task).
    fn resolve_kind(&self, entity_id: &EntityId) -> Result<EntityKind> {
        if let Some(record) = self.sync_state()?.get(entity_id) {
            return Ok(record.entity_type);
        }

        let prefix = entity_id
            .as_str()
            .split('-')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        EntityKind::parse(&prefix)
            .ok_or_else(|| TetherError::UnknownEntity(PathBuf::from(entity_id.as_str())))
    }

    /// Acquires the exclusive sync lock for this workspace.
    ///
    /// The lock file holds the owning PID. There is no waiting: a lock
    /// held by a live process fails fast so two concurrent invocations
    /// cannot interleave state writes (concurrent multi-process sync is
    /// out of scope). A lock left behind by a dead process is removed
    /// and acquisition retried.
    fn acquire_sync_lock(&self) -> Result<SyncLockGuard> {
        let lock_path = self.tether_dir().join("LOCK");
        self.acquire_sync_lock_with_retry(&lock_path, 0)
    }

    fn acquire_sync_lock_with_retry(
        &self,
        lock_path: &Path,
        retry_count: u32,
    ) -> Result<SyncLockGuard> {
        // Bounded so racing cleanups cannot loop forever.
        if retry_count > 2 {
            return Err(TetherError::SyncInProgress { pid: 0 });
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(mut file) => {
                let pid = std::process::id();
                writeln!(file, "{}", pid)?;
                file.flush()?;
                file.try_lock_exclusive()
                    .map_err(|_| TetherError::SyncInProgress { pid })?;
                Ok(SyncLockGuard {
                    _file: file,
                    path: lock_path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                self.handle_existing_lock(lock_path, retry_count)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A lock file already exists: held if its PID is alive, stale if not.
    fn handle_existing_lock(&self, lock_path: &Path, retry_count: u32) -> Result<SyncLockGuard> {
        match fs::read_to_string(lock_path) {
            Ok(content) => {
                if let Ok(pid) = content.trim().parse::<u32>() {
                    if is_process_alive(pid) {
                        return Err(TetherError::SyncInProgress { pid });
                    }

                    warn!(pid, "removing stale sync lock left by a dead process");
                    if let Err(e) = fs::remove_file(lock_path) {
                        // Another process may have cleaned it up first.
                        if e.kind() != std::io::ErrorKind::NotFound {
                            return Err(e.into());
                        }
                    }
                    return self.acquire_sync_lock_with_retry(lock_path, retry_count + 1);
                }

                warn!("sync lock file has invalid content, removing");
                let _ = fs::remove_file(lock_path);
                self.acquire_sync_lock_with_retry(lock_path, retry_count + 1)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Removed between the create attempt and the read.
                self.acquire_sync_lock_with_retry(lock_path, retry_count + 1)
            }
            Err(_) => Err(TetherError::SyncInProgress { pid: 0 }),
        }
    }
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    // Zombies keep a /proc entry but lose their stat file, so check stat.
    Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    // No /proc on macOS/BSD; signal 0 probes liveness without sending.
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    // No cheap liveness check on Windows; stale locks need manual removal.
    true
}

/// Guard removing the lock file on drop.
struct SyncLockGuard {
    _file: File,
    path: PathBuf,
}

impl Drop for SyncLockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove sync lock");
        }
    }
}

/// One line of `status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStatusLine {
    /// Entity identifier.
    pub entity_id: EntityId,
    /// Entity kind.
    pub entity_type: EntityKind,
    /// True once content has been pushed at least once.
    pub pushed: bool,
    /// Remote state version last pulled, if any.
    pub last_pulled_version: Option<u64>,
    /// Unix timestamp of the last successful sync.
    pub last_synced_at: i64,
    /// Cached status value, if pulled or mutated locally.
    pub status: Option<String>,
}

/// Read-only workspace summary.
#[derive(Debug, Clone)]
pub struct StatusSummary {
    /// Per-entity sync lines, sorted by id.
    pub entities: Vec<EntityStatusLine>,
    /// Pending offline operations.
    pub queue_depth: usize,
    /// Session cursor, if one was ever started.
    pub session: Option<SessionCursor>,
}
