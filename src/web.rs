use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::grade::{GradeError, QualityGrade};
use crate::review::{self, Difficulty};
use crate::sm2;
use crate::state::ReviewState;
use crate::store::{CardRecord, CsvStore, ReviewStore, StoreError};

// The lock is held across load/advance/save so concurrent reviews of one card serialize.
type SharedState = Arc<Mutex<CsvStore>>;

// -- Errors --

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Grade(#[from] GradeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no card with id {0:?}")]
    UnknownCard(String),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Grade(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnknownCard(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => {
                tracing::warn!("store failure: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

// -- Views --

#[derive(Debug, Serialize)]
pub struct CardView {
    pub id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub state: ReviewState,
    pub due: bool,
    pub days_until_due: i64,
    pub difficulty: Difficulty,
}

impl CardView {
    fn new(record: &CardRecord, now: DateTime<Utc>) -> Self {
        CardView {
            id: record.id.clone(),
            prompt: record.prompt.clone(),
            state: record.state,
            due: sm2::is_due(&record.state, now),
            days_until_due: sm2::days_until_due(&record.state, now),
            difficulty: review::classify(&record.state),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub due_total: usize,
    pub recommended: usize,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub grade: i64,
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub prompt: String,
}

fn find<'a>(store: &'a CsvStore, id: &str) -> Result<&'a CardRecord, ApiError> {
    store
        .records()
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| ApiError::UnknownCard(id.to_string()))
}

// -- Route handlers --

async fn list_cards(State(state): State<SharedState>) -> Json<Vec<CardView>> {
    let store = state.lock().await;
    let now = Utc::now();
    Json(
        store
            .records()
            .iter()
            .map(|r| CardView::new(r, now))
            .collect(),
    )
}

async fn get_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CardView>, ApiError> {
    let store = state.lock().await;
    let record = find(&store, &id)?;
    Ok(Json(CardView::new(record, Utc::now())))
}

async fn session(State(state): State<SharedState>) -> Json<SessionView> {
    let store = state.lock().await;
    let now = Utc::now();
    let records = store.records();
    let due_total = review::filter_due(records, now).len();
    let batch = review::build_session(records, now);
    Json(SessionView {
        due_total,
        recommended: review::recommend_session_size(due_total),
        cards: batch
            .into_iter()
            .map(|i| CardView::new(&records[i], now))
            .collect(),
    })
}

async fn enroll(
    State(state): State<SharedState>,
    Json(req): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".into()));
    }
    let mut store = state.lock().await;
    let now = Utc::now();
    let id = store.enroll(prompt, now)?;
    let record = find(&store, &id)?;
    Ok((StatusCode::CREATED, Json(CardView::new(record, now))))
}

async fn review_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<CardView>, ApiError> {
    let grade = QualityGrade::try_from(req.grade)?;
    let mut store = state.lock().await;
    if store.load(&id)?.is_none() {
        return Err(ApiError::UnknownCard(id));
    }
    let now = Utc::now();
    review::grade_card(&mut *store, &id, grade, now)?;
    let record = find(&store, &id)?;
    Ok(Json(CardView::new(record, now)))
}

pub fn router(store: CsvStore) -> Router {
    let state: SharedState = Arc::new(Mutex::new(store));
    Router::new()
        .route("/api/cards", get(list_cards).post(enroll))
        .route("/api/cards/{id}", get(get_card))
        .route("/api/cards/{id}/review", post(review_card))
        .route("/api/session", get(session))
        .with_state(state)
}

pub async fn serve(store: CsvStore, port: u16) -> std::io::Result<()> {
    let app = router(store);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("serving at http://localhost:{port}");
    axum::serve(listener, app).await
}
