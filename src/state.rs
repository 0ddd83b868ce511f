use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::Catalog;
use crate::services::crm::CrmSink;
use crate::services::wizard::BookingWizard;

/// Idle time after which an abandoned wizard session is dropped.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// A live wizard plus its activity timestamp, used for eviction.
pub struct WizardSession {
    pub wizard: BookingWizard,
    pub last_activity: Instant,
}

impl WizardSession {
    pub fn new(wizard: BookingWizard) -> Self {
        Self {
            wizard,
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub catalog: Catalog,
    /// `None` runs the service in demo mode: submissions are simulated.
    pub crm: Option<Box<dyn CrmSink>>,
    /// In-progress wizards keyed by session id. Each wizard is only ever
    /// mutated under this lock, so all draft mutation stays serialized.
    pub sessions: Mutex<HashMap<Uuid, WizardSession>>,
}

impl AppState {
    pub fn demo_mode(&self) -> bool {
        self.crm.is_none()
    }

    /// Drop sessions idle past the TTL. Sessions with a submission in
    /// flight are kept so the pending outcome still has somewhere to land.
    pub fn evict_stale_sessions(&self) {
        self.evict_sessions_older_than(SESSION_TTL);
    }

    fn evict_sessions_older_than(&self, ttl: Duration) {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.wizard.is_in_flight() || s.last_activity.elapsed() < ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted stale booking sessions");
        }
    }
}
