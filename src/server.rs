use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::controller::{Controller, Session, SessionError, Transition, ViewUpdate};
use crate::filter::{ReviewClass, ReviewFilter};
use crate::views::{self, AnalysisView, DashboardView};

#[derive(Clone)]
pub struct AppState {
    controller: Arc<Controller>,
}

impl AppState {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionError::UnknownSession(_) => StatusCode::NOT_FOUND,
            SessionError::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    vendor_id: Option<String>,
    #[serde(default)]
    class: ReviewClass,
}

/// A blank or `null` vendor clears the selection.
#[derive(Debug, Deserialize)]
pub struct VendorRequest {
    #[serde(default)]
    vendor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassRequest {
    class: ReviewClass,
}

#[derive(Debug, Serialize)]
pub struct SessionOpened {
    session_id: Uuid,
    dashboard: DashboardView,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/home", get(home))
        .route("/analysis", get(analysis))
        .route("/dashboard", get(dashboard))
        .route("/api/vendors", get(vendors))
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/:id", get(session_state).delete(close_session))
        .route("/api/sessions/:id/vendor", post(select_vendor))
        .route("/api/sessions/:id/reset", post(reset))
        .route("/api/sessions/:id/class", post(select_class))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn home() -> Html<&'static str> {
    Html(views::HOME_HTML)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404")
}

async fn analysis(State(state): State<AppState>) -> Json<AnalysisView> {
    Json(views::analysis(state.controller.store()))
}

async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardView> {
    let vendor_id = query.vendor_id.filter(|v| !v.is_empty());
    let filter = ReviewFilter::vendor(vendor_id).with_class(query.class);
    Json(views::dashboard(
        state.controller.store(),
        &filter,
        state.controller.max_rows(),
    ))
}

async fn vendors(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.controller.store().vendor_options())
}

async fn open_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionOpened>), SessionError> {
    let (session_id, dashboard) = state.controller.open().await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionOpened {
            session_id,
            dashboard,
        }),
    ))
}

async fn session_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, SessionError> {
    Ok(Json(state.controller.session(id).await?))
}

async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.controller.close(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn select_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<VendorRequest>,
) -> Result<Json<ViewUpdate>, SessionError> {
    let transition = match request.vendor_id.filter(|v| !v.trim().is_empty()) {
        Some(vendor_id) => Transition::SelectVendor(vendor_id),
        None => Transition::Reset,
    };
    let update = state.controller.apply(id, transition).await?;
    Ok(Json(update))
}

async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewUpdate>, SessionError> {
    Ok(Json(state.controller.apply(id, Transition::Reset).await?))
}

async fn select_class(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ClassRequest>,
) -> Result<Json<ViewUpdate>, SessionError> {
    let update = state
        .controller
        .apply(id, Transition::SelectClass(request.class))
        .await?;
    Ok(Json(update))
}
