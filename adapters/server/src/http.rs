//! JSON-over-HTTP surface for room operations.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use maze_sabotage_core::{Difficulty, Direction, RoomState, SabotageKind};
use maze_sabotage_store::{RoomId, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::service::{Presence, PresenceView, RoomService, RoomView, ServiceError};

const NEW_VIEWER_HEADER: &str = "x-new-viewer";
const FALLBACK_WARNING: &str =
    "Room store unavailable; serving process-local state that will not be persisted.";

/// Builds the HTTP router for the provided service.
pub fn router(service: Arc<RoomService>) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/rooms", get(list_rooms).post(create_room))
        .route("/api/rooms/:room_id", get(peek_room))
        .route("/api/rooms/:room_id/state", get(room_state))
        .route("/api/rooms/:room_id/start", post(start_game))
        .route("/api/rooms/:room_id/move", post(move_player))
        .route("/api/rooms/:room_id/enemy-move", post(enemy_move))
        .route("/api/rooms/:room_id/check-collision", post(check_collision))
        .route(
            "/api/rooms/:room_id/presence",
            post(presence_ping).delete(presence_leave),
        )
        .route("/api/rooms/:room_id/sabotage", post(sabotage))
        .route("/api/rooms/:room_id/sabotage/check", post(sabotage_check))
        .route("/api/rooms/:room_id/sabotage/classify", post(classify))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Error response returned by every handler.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Rejected(rejection) => Self::BadRequest(rejection.to_string()),
            ServiceError::Store(store) => {
                error!(error = %store, "room store failure");
                Self::Internal("Room store failure".to_owned())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ServiceError::Store(error).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct StateBody {
    #[serde(flatten)]
    state: RoomState,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'static str>,
}

impl From<RoomView> for StateBody {
    fn from(view: RoomView) -> Self {
        Self {
            state: view.state,
            fallback: view.fallback,
            warning: view.fallback.then_some(FALLBACK_WARNING),
        }
    }
}

#[derive(Serialize)]
struct PresenceBody {
    success: bool,
    viewers: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    fallback: bool,
}

impl From<PresenceView> for PresenceBody {
    fn from(view: PresenceView) -> Self {
        Self {
            success: true,
            viewers: view.viewers,
            fallback: view.fallback,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    room_id: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    difficulty: Option<String>,
    player_wallet: Option<String>,
}

#[derive(Deserialize)]
struct MoveRequest {
    #[serde(alias = "dx")]
    x: i32,
    #[serde(alias = "dy")]
    y: i32,
}

#[derive(Deserialize)]
struct SabotageRequest {
    action: String,
    viewer: Option<String>,
}

#[derive(Deserialize)]
struct ClassifyRequest {
    text: String,
}

fn room_id(raw: String) -> ApiResult<RoomId> {
    RoomId::new(raw).ok_or_else(|| ApiError::BadRequest("Room ID required".to_owned()))
}

fn sabotage_kind(action: &str) -> ApiResult<SabotageKind> {
    action
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid sabotage action `{action}`")))
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn list_rooms(State(service): State<Arc<RoomService>>) -> ApiResult<impl IntoResponse> {
    let rooms: Vec<String> = service
        .list_rooms()?
        .into_iter()
        .map(|id| id.as_str().to_owned())
        .collect();
    let total = rooms.len();
    Ok(Json(json!({ "rooms": rooms, "total": total })))
}

async fn create_room(
    State(service): State<Arc<RoomService>>,
    request: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = request?;
    let id = room_id(request.room_id)?;
    let view = service.create_room(&id)?;
    Ok(Json(json!({
        "success": true,
        "roomId": id.as_str(),
        "fallback": view.fallback,
    })))
}

async fn peek_room(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<StateBody>> {
    Ok(Json(service.peek(&room_id(raw)?)?.into()))
}

async fn room_state(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<StateBody>> {
    Ok(Json(service.state(&room_id(raw)?)?.into()))
}

async fn start_game(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
    request: Result<Json<StartRequest>, JsonRejection>,
) -> ApiResult<Json<StateBody>> {
    let id = room_id(raw)?;
    let request = match request {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => StartRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let difficulty = request
        .difficulty
        .as_deref()
        .map_or(Difficulty::default(), Difficulty::parse_or_default);
    Ok(Json(
        service
            .start_game(&id, difficulty, request.player_wallet)?
            .into(),
    ))
}

async fn move_player(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
    request: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<Json<StateBody>> {
    let Json(request) = request?;
    let id = room_id(raw)?;
    let direction = Direction::from_delta(request.x, request.y).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid move delta ({}, {})",
            request.x, request.y
        ))
    })?;
    Ok(Json(service.move_player(&id, direction)?.into()))
}

async fn enemy_move(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<StateBody>> {
    Ok(Json(service.enemy_tick(&room_id(raw)?)?.into()))
}

async fn check_collision(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<StateBody>> {
    Ok(Json(service.check_collision(&room_id(raw)?)?.into()))
}

async fn presence_ping(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<PresenceBody>> {
    let joined = headers
        .get(NEW_VIEWER_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"));
    let presence = if joined {
        Presence::Join
    } else {
        Presence::Heartbeat
    };
    Ok(Json(service.presence(&room_id(raw)?, presence)?.into()))
}

async fn presence_leave(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<PresenceBody>> {
    Ok(Json(service.presence(&room_id(raw)?, Presence::Leave)?.into()))
}

async fn sabotage_check(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
    request: Result<Json<SabotageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = request?;
    let id = room_id(raw)?;
    let kind = sabotage_kind(&request.action)?;
    let viewer = request.viewer.unwrap_or_default();
    let view = service.precheck_sabotage(&id, kind, &viewer)?;
    Ok(Json(json!({ "allowed": view.allowed, "reason": view.reason })))
}

async fn sabotage(
    State(service): State<Arc<RoomService>>,
    Path(raw): Path<String>,
    request: Result<Json<SabotageRequest>, JsonRejection>,
) -> ApiResult<Json<StateBody>> {
    let Json(request) = request?;
    let id = room_id(raw)?;
    let kind = sabotage_kind(&request.action)?;
    let viewer = request.viewer.unwrap_or_default();
    match service.sabotage(&id, kind, &viewer) {
        Ok(view) => Ok(Json(view.into())),
        Err(ServiceError::Rejected(rejection)) => {
            warn!(room = %id, %kind, reason = %rejection, "sabotage rejected");
            Err(ApiError::BadRequest(rejection.to_string()))
        }
        Err(other) => Err(other.into()),
    }
}

async fn classify(
    request: Result<Json<ClassifyRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = request?;
    let kind = SabotageKind::classify_keywords(&request.text);
    Ok(Json(json!({
        "action": kind.map(SabotageKind::id),
        "name": kind.map(SabotageKind::name),
        "description": kind.map(SabotageKind::description),
        "cost": kind.map(SabotageKind::cost),
    })))
}
