// Live reading sessions keyed by id, one synchronizer each

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
    time::Instant,
};
use uuid::Uuid;

use crate::{
    domain::models::{Percent, PositionSignal, ProgressKey},
    storage::ProgressStore,
    sync::{ProgressSynchronizer, SessionStart, SessionState, SignalStep, SyncOutcome, SyncSettings},
};

/// Sessions nobody has touched for this long are dropped.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub key: Option<ProgressKey>,
    pub state: SessionState,
    pub percent: Percent,
}

struct Session {
    sync: ProgressSynchronizer,
    last_active: Instant,
}

impl Session {
    fn touch(&mut self) -> &mut ProgressSynchronizer {
        self.last_active = Instant::now();
        &mut self.sync
    }
}

pub struct SessionRegistry {
    store: Arc<dyn ProgressStore>,
    settings: SyncSettings,
    idle_ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn ProgressStore>, settings: SyncSettings) -> Self {
        Self {
            store,
            settings,
            idle_ttl: DEFAULT_IDLE_TTL,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[tracing::instrument(level = "debug", skip(self), fields(key = %key))]
    pub async fn open(&self, key: ProgressKey) -> (Uuid, SessionStart) {
        self.evict_idle().await;

        let id = Uuid::new_v4();
        let mut sync = ProgressSynchronizer::new(Arc::clone(&self.store), self.settings);
        let start = sync.initialize_session(key).await;
        let session = Session {
            sync,
            last_active: Instant::now(),
        };
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        tracing::debug!(session_id = %id, ?start, "session opened");
        (id, start)
    }

    /// The store write, if any, runs after the session lock is released so a
    /// slow write never holds up the next signal.
    pub async fn signal(&self, id: Uuid, signal: &PositionSignal) -> Option<SyncOutcome> {
        let session = self.get(id).await?;
        let step = session.lock().await.touch().prepare_signal(signal);
        Some(match step {
            SignalStep::Done(outcome) => outcome,
            SignalStep::Write(write) => write.run().await,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn change_language(&self, id: Uuid, language_id: String) -> Option<SessionStart> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        let start = session.touch().on_language_change(language_id).await;
        session.touch();
        Some(start)
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<SessionSnapshot> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        let sync = session.touch();
        Some(SessionSnapshot {
            id,
            key: sync.key().cloned(),
            state: sync.state(),
            percent: sync.percent(),
        })
    }

    /// Drop the session. Writes already in flight are left to finish on their own.
    pub async fn close(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "session closed");
        }
        removed
    }

    /// Viewers usually vanish without closing their session; drop the ones
    /// idle for longer than the TTL. A session busy with a signal is kept.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let ttl = self.idle_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => now.saturating_duration_since(s.last_active) < ttl,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Periodically evict idle sessions for as long as the registry lives.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let period = self.idle_ttl.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle().await;
            }
        })
    }
}
