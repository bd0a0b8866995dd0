//! FlowRunner – loads a session, applies exactly **one** event to it, and persists the
//! updated session back to storage.
//!
//! ## Why a runner?
//! Every HTTP request in the service maps to one [`SessionEvent`]. The runner wraps the
//! _load → handle → save_ sequence so handlers never forget to persist, and so events for
//! the same session are applied one at a time.
//!
//! ## Ordering
//! Each session id gets its own `tokio::sync::Mutex`. Two requests for the same session
//! are applied in arrival order, and neither can overwrite the other's changes. Requests
//! for different sessions do not contend. The lock is held across OCR and the remote
//! summarization call, so a slow remote call also delays further events of that session.
//!
//! ## Failed events
//! The session is saved even when the event fails. Flows only change state on the paths
//! they intend to keep (e.g. a patient stays in `FileUploaded` after an OCR error), and a
//! rejected event leaves the session untouched.
//!
//! ```rust,ignore
//! let runner = FlowRunner::new(storage, adapters);
//! let session_id = runner.create_session().await?;
//! runner.run(&session_id, SessionEvent::SwitchMode(Mode::Doctor)).await?;
//! ```

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, info, info_span, warn};

use crate::{
    adapter::Adapters,
    error::{FlowError, Result},
    session::{EventOutcome, Session, SessionEvent, SessionView},
    storage::SessionStorage,
};

/// Result of running one event: the outcome plus the view after the event.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub outcome: EventOutcome,
    pub view: SessionView,
}

#[derive(Clone)]
pub struct FlowRunner {
    storage: Arc<dyn SessionStorage>,
    adapters: Adapters,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl FlowRunner {
    pub fn new(storage: Arc<dyn SessionStorage>, adapters: Adapters) -> Self {
        Self {
            storage,
            adapters,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        self.storage.clone()
    }

    pub async fn create_session(&self) -> Result<Session> {
        let session = Session::new_random();
        self.storage.save(session.clone()).await?;
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    pub async fn view(&self, session_id: &str) -> Result<SessionView> {
        self.storage
            .get(session_id)
            .await?
            .map(|session| session.view())
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }

    /// Ends a session; its records are dropped with it.
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        let removed = self.storage.delete(session_id).await?;
        self.locks.remove(session_id);

        if !removed {
            return Err(FlowError::SessionNotFound(session_id.to_string()));
        }
        info!(session_id = %session_id, "Session ended");
        Ok(())
    }

    /// Apply **exactly one** event to the session and persist the result.
    pub async fn run(&self, session_id: &str, event: SessionEvent) -> Result<RunResult> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        // 1. Load session
        let Some(mut session) = self.storage.get(session_id).await? else {
            self.locks.remove(session_id);
            return Err(FlowError::SessionNotFound(session_id.to_string()));
        };

        // 2. Handle the event
        let span = info_span!("session_event", session_id = %session_id, event = event.name());
        let outcome = session.handle(event, &self.adapters).instrument(span).await;
        let view = session.view();

        // 3. Persist, whatever the outcome
        self.storage.save(session).await?;

        match outcome {
            Ok(outcome) => Ok(RunResult { outcome, view }),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, kind = e.kind(), "Event failed");
                Err(e)
            }
        }
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let entry = self.locks.entry(session_id.to_string()).or_default();
        Arc::clone(entry.value())
    }
}
