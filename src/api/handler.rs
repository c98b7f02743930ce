use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::server::{AppState, JsonResult, RouteError};
use crate::constants::{
    DEFAULT_LEADERBOARD_LIMIT, DEFAULT_STREAM_TITLE, VK_DEFAULT_COUNT, VK_MAX_COUNT,
    YOUTUBE_DEFAULT_MAX_RESULTS, YOUTUBE_MAX_RESULTS,
};
use crate::db::prelude::*;
use crate::util::vk::{Vk, VkVideo};
use crate::util::youtube::{Youtube, YoutubeVideo};

/// Query-string side of a `/streaming` request.
#[derive(Debug, Deserialize)]
pub struct ActionParams {
    pub action: Option<String>,
    pub limit: Option<i64>,
}

/// JSON side of a `/streaming` request; every command shares one body shape
/// and validates the fields it needs.
#[derive(Debug, Default, Deserialize)]
pub struct CommandBody {
    pub username: Option<String>,
    pub phone_id: Option<String>,
    pub title: Option<String>,
    pub stream_id: Option<StreamId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAction {
    List,
    Leaderboard,
    Start,
    Stop,
    Join,
}

impl FromStr for StreamAction {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(StreamAction::List),
            "leaderboard" => Ok(StreamAction::Leaderboard),
            "start" => Ok(StreamAction::Start),
            "stop" => Ok(StreamAction::Stop),
            "join" => Ok(StreamAction::Join),
            other => Err(RouteError::InvalidAction(other.to_string())),
        }
    }
}

/// Single entry point for the stream/points surface. The `action` query
/// parameter selects the command (defaulting to `list`); a method/action
/// pair outside the table below is rejected.
#[instrument(skip(state, body))]
pub async fn streaming(
    method: Method,
    Query(params): Query<ActionParams>,
    State(state): State<Arc<AppState>>,
    body: Option<Json<CommandBody>>,
) -> Result<Response, RouteError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }

    let action = params
        .action
        .as_deref()
        .unwrap_or("list")
        .parse::<StreamAction>()?;
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match (method.as_str(), action) {
        ("GET", StreamAction::List) => Ok(list_streams(&state).await?.into_response()),
        ("GET", StreamAction::Leaderboard) => {
            Ok(leaderboard(&state, params.limit).await?.into_response())
        }
        ("POST", StreamAction::Start) => Ok(start_stream(&state, body).await?.into_response()),
        ("POST", StreamAction::Stop) => Ok(stop_stream(&state, body).await?.into_response()),
        ("POST", StreamAction::Join) => Ok(join_stream(&state, body).await?.into_response()),
        (_, action) => Err(RouteError::InvalidAction(format!("{method} {action:?}"))),
    }
}

#[derive(Debug, Serialize)]
pub struct StreamListResponse {
    pub streams: Vec<ActiveStreamRow>,
}

#[instrument(skip(state))]
async fn list_streams(state: &AppState) -> JsonResult<StreamListResponse> {
    let streams = StreamRepository::new(state.db_pool).list_active().await?;

    Ok(Json(StreamListResponse { streams }))
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[instrument(skip(state))]
async fn leaderboard(state: &AppState, limit: Option<i64>) -> JsonResult<LeaderboardResponse> {
    let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);

    let leaders = StreamerRepository::new(state.db_pool)
        .get_by_range(limit, 0)
        .await?;

    Ok(Json(LeaderboardResponse {
        leaderboard: leaders.into_iter().map(LeaderboardEntry::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StartStreamResponse {
    pub stream_id: StreamId,
    pub streamer_id: StreamerId,
    pub message: &'static str,
}

#[instrument(skip(state, body))]
async fn start_stream(state: &AppState, body: CommandBody) -> JsonResult<StartStreamResponse> {
    let (username, phone_id) = required_start_fields(&body)?;
    let title = body.title.as_deref().unwrap_or(DEFAULT_STREAM_TITLE);

    let (streamer_id, stream_id) = StreamRepository::new(state.db_pool)
        .open(username, phone_id, title)
        .await?;

    tracing::info!(%streamer_id, %stream_id, "stream started");

    Ok(Json(StartStreamResponse {
        stream_id,
        streamer_id,
        message: "Stream started",
    }))
}

#[derive(Debug, Serialize)]
pub struct StopStreamResponse {
    pub points_earned: i64,
    pub duration: i64,
    pub message: &'static str,
}

#[instrument(skip(state, body))]
async fn stop_stream(state: &AppState, body: CommandBody) -> JsonResult<StopStreamResponse> {
    let stream_id = required_stream_id(&body)?;
    let repo = StreamRepository::new(state.db_pool);

    match repo.close(stream_id).await? {
        Some(receipt) => {
            tracing::info!(
                %stream_id,
                points = receipt.points_earned,
                duration = receipt.duration,
                "stream ended"
            );

            Ok(Json(StopStreamResponse {
                points_earned: receipt.points_earned,
                duration: receipt.duration,
                message: "Stream ended",
            }))
        }
        None => {
            // distinguish unknown id from an already-ended stream in the
            // logs; the response is the same either way
            let known = repo.exists(stream_id).await;
            tracing::warn!(%stream_id, known, "stop rejected, no active stream");

            Err(RouteError::StreamNotFound)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JoinStreamResponse {
    pub viewer_id: ViewerId,
    pub viewers_count: i64,
}

#[instrument(skip(state, body))]
async fn join_stream(state: &AppState, body: CommandBody) -> JsonResult<JoinStreamResponse> {
    let stream_id = required_stream_id(&body)?;
    let repo = StreamRepository::new(state.db_pool);

    match repo.join(stream_id).await? {
        Some(joined) => Ok(Json(JoinStreamResponse {
            viewer_id: joined.viewer_id,
            viewers_count: joined.viewers_count,
        })),
        None => {
            let known = repo.exists(stream_id).await;
            tracing::warn!(%stream_id, known, "join rejected, no active stream");

            Err(RouteError::StreamNotFound)
        }
    }
}

fn required_start_fields(body: &CommandBody) -> Result<(&str, &str), RouteError> {
    let username = body.username.as_deref().filter(|v| !v.is_empty());
    let phone_id = body.phone_id.as_deref().filter(|v| !v.is_empty());

    match (username, phone_id) {
        (Some(username), Some(phone_id)) => Ok((username, phone_id)),
        _ => Err(RouteError::MissingField("username and phone_id")),
    }
}

fn required_stream_id(body: &CommandBody) -> Result<StreamId, RouteError> {
    body.stream_id
        .ok_or(RouteError::MissingField("stream_id"))
}

// ---
//  vendor search proxies
// ---

#[derive(Debug, Deserialize)]
pub struct VkSearchParams {
    pub q: Option<String>,
    pub count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VkSearchResponse {
    pub videos: Vec<VkVideo>,
    pub count: usize,
}

#[instrument(skip(params))]
pub async fn vk_search(Query(params): Query<VkSearchParams>) -> JsonResult<VkSearchResponse> {
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or(RouteError::MissingQuery("Missing query parameter"))?;
    let count = clamped(params.count, VK_DEFAULT_COUNT, VK_MAX_COUNT);

    let videos = Vk::search(&query, count).await?;

    Ok(Json(VkSearchResponse {
        count: videos.len(),
        videos,
    }))
}

#[derive(Debug, Deserialize)]
pub struct YoutubeSearchParams {
    pub q: Option<String>,
    #[serde(rename = "maxResults")]
    pub max_results: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct YoutubeSearchResponse {
    pub videos: Vec<YoutubeVideo>,
    pub total: usize,
}

#[instrument(skip(params))]
pub async fn youtube_search(
    Query(params): Query<YoutubeSearchParams>,
) -> JsonResult<YoutubeSearchResponse> {
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or(RouteError::MissingQuery("Search query is required"))?;
    let max_results = clamped(
        params.max_results,
        YOUTUBE_DEFAULT_MAX_RESULTS,
        YOUTUBE_MAX_RESULTS,
    );

    let videos = Youtube::search(&query, max_results).await?;

    Ok(Json(YoutubeSearchResponse {
        total: videos.len(),
        videos,
    }))
}

fn clamped(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_action_tags_parse() {
        assert_eq!("list".parse::<StreamAction>().unwrap(), StreamAction::List);
        assert_eq!(
            "leaderboard".parse::<StreamAction>().unwrap(),
            StreamAction::Leaderboard
        );
        assert_eq!("start".parse::<StreamAction>().unwrap(), StreamAction::Start);
        assert_eq!("stop".parse::<StreamAction>().unwrap(), StreamAction::Stop);
        assert_eq!("join".parse::<StreamAction>().unwrap(), StreamAction::Join);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(matches!(
            "delete".parse::<StreamAction>(),
            Err(RouteError::InvalidAction(_))
        ));
        assert!(matches!(
            "LIST".parse::<StreamAction>(),
            Err(RouteError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_start_requires_both_identity_fields() {
        let body = CommandBody {
            username: Some(String::from("alice")),
            ..CommandBody::default()
        };
        assert!(required_start_fields(&body).is_err());

        let body = CommandBody {
            username: Some(String::from("alice")),
            phone_id: Some(String::new()),
            ..CommandBody::default()
        };
        assert!(required_start_fields(&body).is_err());

        let body = CommandBody {
            username: Some(String::from("alice")),
            phone_id: Some(String::from("phone_1")),
            ..CommandBody::default()
        };
        let (username, phone_id) = required_start_fields(&body).unwrap();
        assert_eq!((username, phone_id), ("alice", "phone_1"));
    }

    #[test]
    fn test_stream_id_is_required() {
        assert!(required_stream_id(&CommandBody::default()).is_err());

        let body = CommandBody {
            stream_id: Some(StreamId(7)),
            ..CommandBody::default()
        };
        assert_eq!(required_stream_id(&body).unwrap(), StreamId(7));
    }

    #[test]
    fn test_count_clamping() {
        assert_eq!(clamped(None, VK_DEFAULT_COUNT, VK_MAX_COUNT), 20);
        assert_eq!(clamped(Some(0), VK_DEFAULT_COUNT, VK_MAX_COUNT), 1);
        assert_eq!(clamped(Some(10_000), VK_DEFAULT_COUNT, VK_MAX_COUNT), 200);
        assert_eq!(
            clamped(Some(10_000), YOUTUBE_DEFAULT_MAX_RESULTS, YOUTUBE_MAX_RESULTS),
            50
        );
    }

    #[test]
    fn test_start_response_shape() {
        let value = serde_json::to_value(StartStreamResponse {
            stream_id: StreamId(1),
            streamer_id: StreamerId(2),
            message: "Stream started",
        })
        .unwrap();

        assert_eq!(value["stream_id"], 1);
        assert_eq!(value["streamer_id"], 2);
        assert_eq!(value["message"], "Stream started");
    }

    #[test]
    fn test_join_response_shape() {
        let value = serde_json::to_value(JoinStreamResponse {
            viewer_id: ViewerId(3),
            viewers_count: 2,
        })
        .unwrap();

        assert_eq!(value["viewer_id"], 3);
        assert_eq!(value["viewers_count"], 2);
    }

    #[test]
    fn test_command_body_accepts_partial_json() {
        let body: CommandBody = serde_json::from_str(r#"{"stream_id": 12}"#).unwrap();
        assert_eq!(body.stream_id, Some(StreamId(12)));
        assert!(body.username.is_none());
    }
}
