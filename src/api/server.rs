use std::net::SocketAddr;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::api::middleware::cors::cors_layer;
use crate::db::prelude::*;
use crate::util::env::Var;
use crate::util::vk::VkErr;
use crate::util::youtube::YoutubeErr;
use crate::var;

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db_pool: &'static PgPool,
}

#[instrument(skip(tx))]
pub async fn router(tx: UnboundedSender<SocketAddr>) {
    let state = Arc::new(AppState {
        db_pool: db_pool().await.unwrap(),
    });

    let app = Router::new()
        .route("/", get(|| async { Response::new(Body::empty()) }))
        //
        // stream lifecycle + points, dispatched by the `action` query param
        .route("/streaming", any(streaming))
        //
        // proxied vendor search requests
        .route("/search/vk", get(vk_search))
        .route("/search/youtube", get(youtube_search))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(cors_layer())
        .with_state(state);

    let port = var!(Var::ServerApiPort)
        .await
        .unwrap()
        .parse::<u16>()
        .unwrap();

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await.unwrap();

    tx.send(socket_addr).unwrap();
    axum::serve(listener, app).await.unwrap()
}

/// Custom error trace handler for `RouteError`-type responses; handlers stash
/// the error in the response extensions on the way out.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[instrument]
pub async fn start_server(
    tx: UnboundedSender<SocketAddr>,
    mut rx: UnboundedReceiver<SocketAddr>,
) -> Result<Vec<JoinHandle<()>>, RouteError> {
    tracing::info!("starting server");
    let server_handle = tokio::task::spawn(async move {
        router(tx).await;
    });

    let logging_handle = tokio::task::spawn(async move {
        while !rx.is_closed() {
            if let Some(msg) = rx.recv().await {
                tracing::info!(
                    server_url = %format!("http://127.0.0.1:{}", msg.port()),
                    "server ready"
                );
                break;
            }
        }
    });

    let handles = vec![server_handle, logging_handle];
    Ok(handles)
}

#[allow(dead_code)]
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    QueryError(#[from] PgError),

    #[error(transparent)]
    SqlxError(#[from] sqlx::error::Error),

    #[error("Invalid action")]
    InvalidAction(String),

    #[error("{0} required")]
    MissingField(&'static str),

    #[error("{0}")]
    MissingQuery(&'static str),

    #[error("Stream not found")]
    StreamNotFound,

    #[error("{0}")]
    VkError(#[from] VkErr),

    #[error("{0}")]
    YoutubeError(#[from] YoutubeErr),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match &self {
            RouteError::InvalidAction(_)
            | RouteError::MissingField(_)
            | RouteError::MissingQuery(_) => (StatusCode::BAD_REQUEST, self.to_string()),

            RouteError::StreamNotFound => (StatusCode::NOT_FOUND, self.to_string()),

            // VK signals request-level failures inside its envelope
            RouteError::VkError(VkErr::Api(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            RouteError::VkError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),

            // vendor body and status pass through untouched
            RouteError::YoutubeError(YoutubeErr::Vendor { status, body }) => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body.clone(),
            ),
            RouteError::YoutubeError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),

            RouteError::QueryError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            RouteError::SqlxError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        let mut response = (status, Json(ErrorResponse { error })).into_response();
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::env::EnvErr;

    #[test]
    fn test_validation_errors_are_400() {
        let res = RouteError::MissingField("stream_id").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = RouteError::InvalidAction(String::from("PUT Leaderboard")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_stream_is_404() {
        let res = RouteError::StreamNotFound.into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_vk_api_error_is_400() {
        let res = RouteError::VkError(VkErr::Api(String::from("User authorization failed")))
            .into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_vendor_status_passes_through() {
        let res = RouteError::YoutubeError(YoutubeErr::Vendor {
            status: 403,
            body: String::from("quota exceeded"),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_missing_credential_is_500() {
        let res = RouteError::VkError(VkErr::Env(EnvErr::NotConfigured("VK_SERVICE_TOKEN")))
            .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_field_message() {
        let err = RouteError::MissingField("username and phone_id");
        assert_eq!(err.to_string(), "username and phone_id required");
    }
}
