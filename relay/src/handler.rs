use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

const CACHE_DIRECTIVE: &str = "s-maxage=86400, stale-while-revalidate";

#[derive(Clone, Default)]
pub struct RelayState {
    pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct RelayParams {
    #[serde(rename = "targetUrl")]
    pub target_url: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("the targetUrl parameter is required")]
    MissingTargetUrl,
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    UpstreamStatus(StatusCode),
    #[error("upstream returned a non-JSON body")]
    NonJsonBody,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // Upstream failure detail stays in the logs; callers only get
        // a generic payload.
        let (status, message) = match &self {
            RelayError::MissingTargetUrl => (StatusCode::BAD_REQUEST, self.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal relay error".to_string(),
            ),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// `GET /api/relay?targetUrl=<absolute url>`
///
/// Pass-through fetch for browser clients blocked by CORS. The
/// upstream body is checked to be JSON and echoed back byte for byte,
/// never re-serialized.
pub async fn relay_handler(
    State(state): State<RelayState>,
    Query(params): Query<RelayParams>,
) -> Result<Response, RelayError> {
    let target = params.target_url.ok_or(RelayError::MissingTargetUrl)?;
    relay(&state.client, &target).await
}

/// One outbound GET, no extra headers, no retries.
async fn relay(client: &reqwest::Client, target: &str) -> Result<Response, RelayError> {
    tracing::debug!(%target, "relaying request");

    let upstream = client.get(target).send().await.map_err(|error| {
        tracing::error!(%target, %error, "upstream request failed");
        RelayError::Upstream(error)
    })?;

    let status = upstream.status();
    if !status.is_success() {
        tracing::error!(%target, %status, "upstream returned failure status");
        return Err(RelayError::UpstreamStatus(status));
    }

    let body: Bytes = upstream.bytes().await?;
    if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
        tracing::error!(%target, "upstream body is not valid JSON");
        return Err(RelayError::NonJsonBody);
    }

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_DIRECTIVE)),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use tokio::net::TcpListener;

    const UPSTREAM_BODY: &str =
        "{\"success\": true, \"result\": {\"records\": [{\"SigUF\": \"SP\"}]}}";

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route("/data", get(|| async { UPSTREAM_BODY }))
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/text", get(|| async { "not json" }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn success_is_a_byte_for_byte_pass_through() {
        let base = spawn_upstream().await;
        let client = reqwest::Client::new();

        let response = relay(&client, &format!("{base}/data")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("*"))
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static(CACHE_DIRECTIVE))
        );
        assert_eq!(body_bytes(response).await.as_ref(), UPSTREAM_BODY.as_bytes());
    }

    #[tokio::test]
    async fn missing_target_url_is_a_client_error_without_any_outbound_call() {
        let response = relay_handler(
            State(RelayState::default()),
            Query(RelayParams { target_url: None }),
        )
        .await
        .unwrap_err()
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_bytes(response).await;
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed["error"].as_str().unwrap().contains("targetUrl"));
    }

    #[tokio::test]
    async fn upstream_failure_status_becomes_a_generic_server_error() {
        let base = spawn_upstream().await;
        let client = reqwest::Client::new();

        let err = relay(&client, &format!("{base}/broken")).await.unwrap_err();
        assert!(matches!(err, RelayError::UpstreamStatus(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_bytes(response).await;
        // The upstream body must not leak into the error payload.
        assert!(!body.as_ref().windows(4).any(|w| w == b"boom"));
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "internal relay error");
    }

    #[tokio::test]
    async fn non_json_upstream_body_is_a_server_error() {
        let base = spawn_upstream().await;
        let client = reqwest::Client::new();

        let err = relay(&client, &format!("{base}/text")).await.unwrap_err();
        assert!(matches!(err, RelayError::NonJsonBody));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_server_error() {
        let client = reqwest::Client::new();

        // Nothing listens on this port.
        let err = relay(&client, "http://127.0.0.1:1/data").await.unwrap_err();
        assert!(matches!(err, RelayError::Upstream(_)));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
