use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    handlers::{auth::Caller, AppState},
    models::{Category, DecoratedContract},
    services::{
        interaction::{EditDraft, InteractionState, QuickRenewal},
        listing::Dashboard,
        ContractSession, Outcome,
    },
    validation::ContractInput,
};

/// Category filter for listings
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<Category>,
}

/// Explicit acknowledgement of an irreversible action
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ManualRenewalRequest {
    pub date: String,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuickRenewalRequest {
    pub period: QuickRenewal,
}

#[derive(Debug, Serialize)]
pub struct InteractionView {
    pub contract_id: String,
    #[serde(flatten)]
    pub state: InteractionState,
}

/// Snapshot of a session returned by every contract route
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub scope: Option<Category>,
    pub contracts: Vec<DecoratedContract>,
    pub alerts: Vec<DecoratedContract>,
    pub expired: Vec<DecoratedContract>,
    pub interaction: Option<InteractionView>,
}

impl SessionView {
    fn of(session: &ContractSession, outcome: Option<Outcome>) -> Self {
        Self {
            outcome,
            scope: session.scope(),
            contracts: session.contracts().to_vec(),
            alerts: session.alerts(),
            expired: session.expired(),
            interaction: session
                .active_interaction()
                .map(|(id, state)| InteractionView {
                    contract_id: id.clone(),
                    state: state.clone(),
                }),
        }
    }

    /// Empty view returned when an anonymous caller tries an action
    fn suppressed() -> Self {
        Self {
            outcome: Some(Outcome::Suppressed),
            scope: None,
            contracts: Vec::new(),
            alerts: Vec::new(),
            expired: Vec::new(),
            interaction: None,
        }
    }
}

/// Aggregate counts and the contracts expiring within five days
pub async fn dashboard(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<impl IntoResponse> {
    let dashboard: Dashboard = state.listing.dashboard(&ctx).await?;
    Ok((StatusCode::OK, Json(dashboard)))
}

/// List contracts, optionally for one category
pub async fn list_contracts(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    session.refresh(&ctx, query.category).await?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, None))))
}

/// Create a contract in the current scope
pub async fn create_contract(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(input): Json<ContractInput>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let outcome = session.create(&ctx, &input).await?;
    let status = match outcome {
        Outcome::Committed => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(SessionView::of(&session, Some(outcome)))))
}

/// Delete a contract; requires `?confirmed=true`
pub async fn delete_contract(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmRequest>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let scope = session.scope();
    session.refresh(&ctx, scope).await?;

    let confirmed = confirm.confirmed;
    let outcome = session.remove(&ctx, &id, &|_: &str| confirmed).await?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, Some(outcome)))))
}

pub async fn interaction_state(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let session = session.lock().await;
    let view = InteractionView {
        state: session.state_of(&id),
        contract_id: id,
    };
    Ok((StatusCode::OK, Json(view)))
}

pub async fn cancel_interaction(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(_id): Path<String>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    session.cancel();
    Ok((StatusCode::OK, Json(SessionView::of(&session, None))))
}

/// Open the edit form, pre-filled from the stored contract
pub async fn start_edit(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    if ctx.principal().is_none() {
        tracing::warn!("edit suppressed: no authenticated principal");
        return Ok((StatusCode::OK, Json(SessionView::suppressed())));
    }

    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let scope = session.scope();
    session.refresh(&ctx, scope).await?;
    session.start_edit(&id)?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, None))))
}

pub async fn confirm_edit(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Json(draft): Json<EditDraft>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let outcome = session.confirm_edit(&ctx, &id, draft).await?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, Some(outcome)))))
}

pub async fn start_manual_renewal(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    if ctx.principal().is_none() {
        tracing::warn!("renewal suppressed: no authenticated principal");
        return Ok((StatusCode::OK, Json(SessionView::suppressed())));
    }

    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let scope = session.scope();
    session.refresh(&ctx, scope).await?;
    session.start_manual_renewal(&id)?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, None))))
}

pub async fn confirm_manual_renewal(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Json(request): Json<ManualRenewalRequest>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let confirmed = request.confirmed;
    let outcome = session
        .confirm_manual_renewal(&ctx, &id, &request.date, &|_: &str| confirmed)
        .await?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, Some(outcome)))))
}

/// Show the date a renewal shortcut would set, without writing it
pub async fn preview_quick_renewal(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Json(request): Json<QuickRenewalRequest>,
) -> Result<impl IntoResponse> {
    if ctx.principal().is_none() {
        tracing::warn!("renewal preview suppressed: no authenticated principal");
        return Ok((StatusCode::OK, Json(SessionView::suppressed())));
    }

    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let scope = session.scope();
    session.refresh(&ctx, scope).await?;
    session.preview_quick_renewal(&id, request.period)?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, None))))
}

pub async fn confirm_quick_renewal(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> Result<impl IntoResponse> {
    let session = state.session_for(&ctx).await;
    let mut session = session.lock().await;
    let confirmed = request.confirmed;
    let outcome = session
        .confirm_quick_renewal(&ctx, &id, &|_: &str| confirmed)
        .await?;
    Ok((StatusCode::OK, Json(SessionView::of(&session, Some(outcome)))))
}
