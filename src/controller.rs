//! Per-viewer selection state and the transitions that re-render the dashboard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::filter::{ReviewClass, ReviewFilter};
use crate::store::ReviewStore;
use crate::views::{self, CommentsView, DashboardView};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown session {0}")]
    UnknownSession(Uuid),
    #[error("session limit of {0} reached")]
    TooManySessions(usize),
}

pub const DEFAULT_MAX_SESSIONS: usize = 1000;
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// Bounds on the session registry. Sessions idle for longer than
/// `idle_timeout` are dropped; `max_sessions` caps how many may be live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: DEFAULT_SESSION_IDLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    SelectVendor(String),
    Reset,
    SelectClass(ReviewClass),
}

/// What a transition pushes to the page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scope", content = "view", rename_all = "snake_case")]
pub enum ViewUpdate {
    Dashboard(Box<DashboardView>),
    Comments(CommentsView),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub vendor_id: Option<String>,
    pub class: ReviewClass,
}

impl Session {
    pub fn filter(&self) -> ReviewFilter {
        ReviewFilter::vendor(self.vendor_id.clone()).with_class(self.class)
    }

    /// Applies the transition and recomputes every view it affects before returning.
    pub fn apply(&mut self, transition: Transition, store: &ReviewStore, max_rows: usize) -> ViewUpdate {
        match transition {
            Transition::SelectVendor(vendor_id) => {
                self.vendor_id = Some(vendor_id);
                ViewUpdate::Dashboard(Box::new(self.render(store, max_rows)))
            }
            Transition::Reset => {
                self.vendor_id = None;
                ViewUpdate::Dashboard(Box::new(self.render(store, max_rows)))
            }
            Transition::SelectClass(class) => {
                self.class = class;
                ViewUpdate::Comments(views::comments(store, &self.filter()))
            }
        }
    }

    pub fn render(&self, store: &ReviewStore, max_rows: usize) -> DashboardView {
        views::dashboard(store, &self.filter(), max_rows)
    }
}

struct SessionSlot {
    session: Session,
    last_seen: Instant,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            session,
            last_seen: Instant::now(),
        }
    }

    fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() >= timeout
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

/// Live sessions. Each session is behind its own lock so transitions on one
/// session are serialized while different sessions proceed in parallel.
pub struct Controller {
    store: Arc<ReviewStore>,
    max_rows: usize,
    limits: SessionLimits,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionSlot>>>>,
}

impl Controller {
    pub fn new(store: Arc<ReviewStore>, max_rows: usize, limits: SessionLimits) -> Self {
        Self {
            store,
            max_rows,
            limits,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &ReviewStore {
        &self.store
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Registers a new session after sweeping idle ones. Fails once the
    /// registry is full of sessions that are still active.
    pub async fn open(&self) -> Result<(Uuid, DashboardView), SessionError> {
        let mut sessions = self.sessions.write().await;
        let swept = sweep_idle(&mut sessions, self.limits.idle_timeout);
        if swept > 0 {
            info!(swept, open = sessions.len(), "dropped idle dashboard sessions");
        }
        if sessions.len() >= self.limits.max_sessions {
            warn!(limit = self.limits.max_sessions, "refusing new dashboard session");
            return Err(SessionError::TooManySessions(self.limits.max_sessions));
        }

        let id = Uuid::new_v4();
        let session = Session::default();
        let view = session.render(&self.store, self.max_rows);
        sessions.insert(id, Arc::new(Mutex::new(SessionSlot::new(session))));
        debug!(session = %id, open = sessions.len(), "opened dashboard session");
        Ok((id, view))
    }

    pub async fn close(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn session(&self, id: Uuid) -> Result<Session, SessionError> {
        let handle = self.handle(id).await?;
        let mut slot = handle.lock().await;
        slot.touch();
        Ok(slot.session.clone())
    }

    pub async fn apply(&self, id: Uuid, transition: Transition) -> Result<ViewUpdate, SessionError> {
        let handle = self.handle(id).await?;
        let mut slot = handle.lock().await;
        slot.touch();
        debug!(session = %id, ?transition, "applying transition");
        Ok(slot.session.apply(transition, &self.store, self.max_rows))
    }

    /// Looks a session up, forgetting it instead if it has gone idle.
    async fn handle(&self, id: Uuid) -> Result<Arc<Mutex<SessionSlot>>, SessionError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownSession(id))?;

        if handle.lock().await.is_idle(self.limits.idle_timeout) {
            self.sessions.write().await.remove(&id);
            debug!(session = %id, "dropped idle dashboard session on lookup");
            return Err(SessionError::UnknownSession(id));
        }
        Ok(handle)
    }
}

/// Removes idle sessions. A session whose lock is held is mid-transition and kept.
fn sweep_idle(sessions: &mut HashMap<Uuid, Arc<Mutex<SessionSlot>>>, timeout: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, slot| match slot.try_lock() {
        Ok(slot) => !slot.is_idle(timeout),
        Err(_) => true,
    });
    before - sessions.len()
}
