use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dates::Clock;
use crate::db::ContractStore;
use crate::models::{PrincipalId, RequestContext};
use crate::services::{ContractSession, ListingService};

pub mod auth;
pub mod contracts;

pub type SharedSession = Arc<Mutex<ContractSession>>;

/// Shared state behind every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ContractStore>,
    pub clock: Arc<dyn Clock>,
    pub listing: ListingService,
    sessions: Arc<RwLock<HashMap<PrincipalId, SharedSession>>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ContractStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            listing: ListingService::new(store.clone(), clock.clone()),
            store,
            clock,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The caller's session, created on first use. Anonymous callers get
    /// a throwaway session on which every operation is a no-op.
    pub async fn session_for(&self, ctx: &RequestContext) -> SharedSession {
        let Some(principal) = ctx.principal() else {
            return Arc::new(Mutex::new(self.new_session()));
        };

        if let Some(session) = self.sessions.read().await.get(principal) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        evict_idle(&mut sessions);
        sessions
            .entry(principal.clone())
            .or_insert_with(|| {
                tracing::info!("Opening session for principal {}", principal);
                Arc::new(Mutex::new(self.new_session()))
            })
            .clone()
    }

    /// Number of sessions currently held in the registry
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn new_session(&self) -> ContractSession {
        ContractSession::new(
            self.store.clone(),
            self.clock.clone(),
            self.config.default_category,
        )
    }
}

/// Drops sessions that no request holds and that have no action open.
/// Their listing is re-fetched on the next request anyway.
fn evict_idle(sessions: &mut HashMap<PrincipalId, SharedSession>) {
    let before = sessions.len();
    sessions.retain(|_, session| {
        Arc::strong_count(session) > 1
            || session
                .try_lock()
                .map_or(true, |s| s.active_interaction().is_some())
    });
    let evicted = before - sessions.len();
    if evicted > 0 {
        tracing::debug!("Evicted {} idle sessions", evicted);
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Contract expiry server is running." }))
        .route("/dashboard", get(contracts::dashboard))
        .route(
            "/contracts",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route("/contracts/{id}", axum::routing::delete(contracts::delete_contract))
        .route(
            "/contracts/{id}/interaction",
            get(contracts::interaction_state).delete(contracts::cancel_interaction),
        )
        .route(
            "/contracts/{id}/edit",
            post(contracts::start_edit).put(contracts::confirm_edit),
        )
        .route(
            "/contracts/{id}/renewal/manual",
            post(contracts::start_manual_renewal).put(contracts::confirm_manual_renewal),
        )
        .route(
            "/contracts/{id}/renewal/quick",
            post(contracts::preview_quick_renewal).put(contracts::confirm_quick_renewal),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
