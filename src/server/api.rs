use axum::{
    extract::{ Query, Request, State },
    http::StatusCode,
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::get,
    Json,
    Router,
};
use log::{ error, info, warn };
use serde::{ Deserialize, Serialize };
use serde_json::json;
use std::error::Error;
use tokio::net::TcpListener;
use tower_http::cors::{ Any, CorsLayer };

use crate::conversation::Submission;
use crate::dashboard::Dashboard;
use crate::gateway::http::API_KEY_HEADER;
use crate::gateway::ReplySource;
use crate::models::chat::Message;
use crate::models::resources::{ ApiKey, TelegramBot, TrainingExample };
use crate::resources::ResourceError;

#[derive(Clone)]
struct AppState {
    dashboard: Dashboard,
    api_key: Option<String>,
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub message: String,
}

#[derive(Serialize)]
struct SendResponse {
    user_message: Message,
    reply: Option<Message>,
    source: Option<ReplySource>,
}

#[derive(Deserialize)]
pub struct CleanupQuery {
    pub days: Option<u32>,
}

#[derive(Deserialize)]
pub struct IdQuery {
    pub id: String,
}

#[derive(Deserialize)]
pub struct BotsQuery {
    pub api_key: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateKeyBody {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterBotBody {
    pub api_key: String,
    pub telegram_token: String,
}

#[derive(Deserialize)]
pub struct ToggleBotBody {
    pub api_key: String,
    pub bot_id: String,
}

#[derive(Deserialize)]
pub struct TrainingBody {
    pub input: String,
    pub output: String,
    pub category: String,
}

struct ApiError(StatusCode, String);

impl From<ResourceError> for ApiError {
    fn from(e: ResourceError) -> Self {
        let status = match &e {
            ResourceError::Validation(_) => StatusCode::BAD_REQUEST,
            ResourceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResourceError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ResourceError::Transport(_) | ResourceError::Status { .. } | ResourceError::Malformed(_) =>
                StatusCode::BAD_GATEWAY,
        };
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Builds the local API. With `api_key` set, every request must carry it in `X-Api-Key`.
pub fn router(dashboard: Dashboard, api_key: Option<String>) -> Router {
    let state = AppState {
        dashboard,
        api_key: api_key.filter(|k| !k.trim().is_empty()),
    };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/messages", get(list_messages).post(send_message).delete(cleanup_messages))
        .route("/api/keys", get(list_keys).post(create_key).delete(delete_key))
        .route("/api/bots", get(list_bots).post(register_bot).put(toggle_bot))
        .route("/api/training", get(list_training).post(add_training).delete(delete_training))
        .route("/api/notices", get(drain_notices))
        .route("/api/stats", get(stats))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: &str,
    dashboard: Dashboard,
    api_key: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
        e
    })?;
    info!("Starting HTTP API server on: http://{}", listener.local_addr()?);

    let app = router(dashboard, api_key);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(required) = &state.api_key {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(required.as_str()) {
            warn!("{} {}: bad or missing API key", req.method(), req.uri().path());
            return ApiError(StatusCode::UNAUTHORIZED, "Unauthorized".into()).into_response();
        }
    }
    next.run(req).await
}

async fn list_messages(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.dashboard.conversation().messages())
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>
) -> Result<Json<SendResponse>, ApiError> {
    match state.dashboard.send_message(&req.message) {
        Submission::Ignored => Err(ApiError(StatusCode::BAD_REQUEST, "Empty message".into())),
        Submission::Rejected =>
            Err(ApiError(StatusCode::CONFLICT, "Previous message is still being answered".into())),
        Submission::Accepted { user_message, reply } => {
            let resolution = reply.wait().await;
            Ok(
                Json(SendResponse {
                    user_message,
                    source: resolution.as_ref().map(|r| r.source),
                    reply: resolution.map(|r| r.message),
                })
            )
        }
    }
}

async fn cleanup_messages(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>
) -> Response {
    match state.dashboard.cleanup_messages(query.days.unwrap_or(1)).await {
        Some(report) => Json(report).into_response(),
        None => ApiError(StatusCode::BAD_GATEWAY, "Cleanup failed".into()).into_response(),
    }
}

async fn list_keys(State(state): State<AppState>) -> ApiResult<Vec<ApiKey>> {
    Ok(Json(state.dashboard.refresh_keys().await?))
}

async fn create_key(
    State(state): State<AppState>,
    Json(body): Json<CreateKeyBody>
) -> Result<(StatusCode, Json<ApiKey>), ApiError> {
    let key = state.dashboard.create_key(body.name.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(key)))
}

async fn delete_key(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>
) -> Result<StatusCode, ApiError> {
    state.dashboard.delete_key(&query.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_bots(
    State(state): State<AppState>,
    Query(query): Query<BotsQuery>
) -> ApiResult<Vec<TelegramBot>> {
    Ok(Json(state.dashboard.refresh_bots(query.api_key.as_deref()).await?))
}

async fn register_bot(
    State(state): State<AppState>,
    Json(body): Json<RegisterBotBody>
) -> Result<(StatusCode, Json<TelegramBot>), ApiError> {
    let bot = state.dashboard.register_bot(&body.api_key, &body.telegram_token).await?;
    Ok((StatusCode::CREATED, Json(bot)))
}

async fn toggle_bot(
    State(state): State<AppState>,
    Json(body): Json<ToggleBotBody>
) -> ApiResult<TelegramBot> {
    Ok(Json(state.dashboard.toggle_bot(&body.api_key, &body.bot_id).await?))
}

async fn list_training(
    State(state): State<AppState>
) -> Json<Vec<TrainingExample>> {
    Json(state.dashboard.training().list())
}

async fn add_training(
    State(state): State<AppState>,
    Json(body): Json<TrainingBody>
) -> Result<(StatusCode, Json<TrainingExample>), ApiError> {
    let example = state.dashboard.add_training_example(&body.input, &body.output, &body.category)?;
    Ok((StatusCode::CREATED, Json(example)))
}

async fn delete_training(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>
) -> Result<StatusCode, ApiError> {
    state.dashboard.delete_training_example(&query.id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn drain_notices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.notices().drain())
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.stats())
}
