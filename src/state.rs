use crate::api::MealApi;
use crate::config::AppConfig;
use crate::dashboard::DashboardController;
use crate::session::Session;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use tracing::info;

struct Registered {
    dashboard: Arc<DashboardController>,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api: Arc<dyn MealApi>,
    dashboards: Arc<Mutex<HashMap<String, Registered>>>,
}

impl AppState {
    pub fn new(config: AppConfig, api: Arc<dyn MealApi>) -> Self {
        Self {
            config: Arc::new(config),
            api,
            dashboards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A fresh dashboard for a new login. A previous one for the same user
    /// has its in-flight fetches cancelled.
    pub async fn start_session(&self, session: &Session) -> Arc<DashboardController> {
        let dashboard = Arc::new(self.build(session));
        let replaced = self.dashboards.lock().await.insert(
            session.username().to_owned(),
            Registered {
                dashboard: Arc::clone(&dashboard),
                last_seen: Instant::now(),
            },
        );
        if let Some(previous) = replaced {
            previous.dashboard.cancel();
        }
        info!(username = %session.username(), "session started");
        dashboard
    }

    /// The user's dashboard, created on first use (e.g. a cookie that
    /// outlived a restart or an idle eviction).
    pub async fn dashboard(&self, session: &Session) -> Arc<DashboardController> {
        let mut dashboards = self.dashboards.lock().await;
        let registered = dashboards
            .entry(session.username().to_owned())
            .or_insert_with(|| Registered {
                dashboard: Arc::new(self.build(session)),
                last_seen: Instant::now(),
            });
        registered.last_seen = Instant::now();
        Arc::clone(&registered.dashboard)
    }

    pub async fn end_session(&self, session: &Session) {
        if let Some(registered) = self.dashboards.lock().await.remove(session.username()) {
            registered.dashboard.cancel();
        }
        info!(username = %session.username(), "session ended");
    }

    /// Drops dashboards nobody has touched for `max_idle`. Returns how many
    /// went.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut dashboards = self.dashboards.lock().await;
        let before = dashboards.len();
        dashboards.retain(|username, registered| {
            let keep = now.duration_since(registered.last_seen) < max_idle;
            if !keep {
                registered.dashboard.cancel();
                info!(%username, "idle session evicted");
            }
            keep
        });
        before - dashboards.len()
    }

    /// Sweeps idle dashboards every `every` for as long as the server runs.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.evict_idle(state.config.session_idle).await;
            }
        })
    }

    pub async fn session_count(&self) -> usize {
        self.dashboards.lock().await.len()
    }

    fn build(&self, session: &Session) -> DashboardController {
        DashboardController::new(session.clone(), self.config.entry_mode, Arc::clone(&self.api))
    }
}
