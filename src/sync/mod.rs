//! Reading-progress synchronization.
//!
//! A [`ProgressSynchronizer`] sits between the content viewer's position
//! signals and a [`ProgressStore`]. It seeds the displayed percentage when a
//! session starts, drops noise, and spaces store writes at least
//! [`SyncSettings::min_interval`] apart. Store failures never interrupt reading:
//! they are logged and reported back as [`SyncOutcome::LocalOnly`].

mod gate;

use std::sync::Arc;

use tokio::time::Instant;

pub use gate::SyncSettings;
use gate::{GateDecision, SignalGate};

use crate::{
    domain::models::{Percent, PositionSignal, ProgressKey},
    storage::ProgressStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
}

/// How a session obtained its initial percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    /// An existing record was found
    Resumed(Percent),
    /// First open: a 0% record was created
    Created,
    /// The store could not be reached; reading continues from 0% locally
    Fallback { reason: String },
    /// Missing user, book or language: nothing was done
    Skipped,
}

impl SessionStart {
    pub fn percent(&self) -> Percent {
        match self {
            SessionStart::Resumed(p) => *p,
            _ => Percent::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("session is not ready")]
    NotReady,
    #[error("position is not a number")]
    NotNumeric,
    #[error("change is below the minimum step")]
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalOnlyReason {
    #[error("rate limited")]
    RateLimited,
    /// The store rejected the write. The new value is still what the session
    /// reports as current, so the displayed position runs ahead of the store
    /// until a later write lands. This differs from a reader that falls back
    /// to the last persisted value on failure.
    #[error("store write failed: {0}")]
    StoreFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Persisted(Percent),
    /// Displayed locally, not (yet) in the store
    LocalOnly {
        percent: Percent,
        reason: LocalOnlyReason,
    },
    Rejected(RejectReason),
}

/// Result of the synchronous half of signal handling.
pub enum SignalStep {
    Done(SyncOutcome),
    Write(PendingWrite),
}

/// A store write that has been decided but not performed. It owns its store
/// handle, so it can be awaited in place or spawned without holding the
/// synchronizer.
pub struct PendingWrite {
    store: Arc<dyn ProgressStore>,
    key: ProgressKey,
    percent: Percent,
}

impl PendingWrite {
    #[tracing::instrument(level = "debug", skip(self), fields(key = %self.key, percent = self.percent.get()))]
    pub async fn run(self) -> SyncOutcome {
        match self.store.upsert(&self.key, self.percent).await {
            Ok(()) => {
                tracing::debug!("progress persisted");
                SyncOutcome::Persisted(self.percent)
            }
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "progress write failed, keeping local value");
                SyncOutcome::LocalOnly {
                    percent: self.percent,
                    reason: LocalOnlyReason::StoreFailed(e.to_string()),
                }
            }
        }
    }
}

pub struct ProgressSynchronizer {
    store: Arc<dyn ProgressStore>,
    state: SessionState,
    key: Option<ProgressKey>,
    gate: SignalGate,
}

impl ProgressSynchronizer {
    pub fn new(store: Arc<dyn ProgressStore>, settings: SyncSettings) -> Self {
        Self {
            store,
            state: SessionState::Uninitialized,
            key: None,
            gate: SignalGate::new(settings),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn key(&self) -> Option<&ProgressKey> {
        self.key.as_ref()
    }

    /// Percentage the reader should currently see.
    pub fn percent(&self) -> Percent {
        self.gate.last_accepted()
    }

    /// Load the record for `key`, creating it at 0% on first open.
    #[tracing::instrument(level = "debug", skip(self), fields(key = %key))]
    pub async fn initialize_session(&mut self, key: ProgressKey) -> SessionStart {
        if !key.is_complete() {
            tracing::debug!("incomplete session key, skipping progress sync");
            self.key = None;
            self.state = SessionState::Uninitialized;
            self.gate.reset(Percent::ZERO);
            return SessionStart::Skipped;
        }

        self.state = SessionState::Loading;
        let start = match self.store.read(&key).await {
            Ok(Some(existing)) => {
                tracing::debug!(percent = existing.percent.get(), "resuming progress");
                SessionStart::Resumed(existing.percent)
            }
            Ok(None) => match self.store.insert_if_absent(&key).await {
                Ok(()) => {
                    tracing::info!(key = %key, "created progress record");
                    SessionStart::Created
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{:#}", e), "could not create progress record");
                    SessionStart::Fallback {
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "could not load progress");
                SessionStart::Fallback {
                    reason: e.to_string(),
                }
            }
        };

        self.gate.reset(start.percent());
        self.key = Some(key);
        self.state = SessionState::Ready;
        start
    }

    /// Switch the session to another translation of the same book. Each
    /// language keeps its own record.
    pub async fn on_language_change(&mut self, language_id: impl Into<String>) -> SessionStart {
        let Some(next) = self.key.as_ref().map(|k| k.with_language(language_id)) else {
            tracing::debug!("language change without an active session");
            return SessionStart::Skipped;
        };
        self.initialize_session(next).await
    }

    /// Gate a signal and, if it qualifies for a write, hand the write back
    /// instead of performing it.
    pub fn prepare_signal(&mut self, signal: &PositionSignal) -> SignalStep {
        let key = match (&self.state, &self.key) {
            (SessionState::Ready, Some(key)) => key,
            _ => return SignalStep::Done(SyncOutcome::Rejected(RejectReason::NotReady)),
        };

        match self.gate.evaluate(signal, Instant::now()) {
            GateDecision::Rejected(reason) => {
                tracing::trace!(?signal, %reason, "position signal dropped");
                SignalStep::Done(SyncOutcome::Rejected(reason))
            }
            GateDecision::Display(percent) => SignalStep::Done(SyncOutcome::LocalOnly {
                percent,
                reason: LocalOnlyReason::RateLimited,
            }),
            GateDecision::Persist(percent) => SignalStep::Write(PendingWrite {
                store: Arc::clone(&self.store),
                key: key.clone(),
                percent,
            }),
        }
    }

    pub async fn on_position_signal(&mut self, signal: &PositionSignal) -> SyncOutcome {
        match self.prepare_signal(signal) {
            SignalStep::Done(outcome) => outcome,
            SignalStep::Write(write) => write.run().await,
        }
    }
}
