//! Assembles the Axum [`Router`] for the mock agent.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, post},
    Router,
};

use crate::{
    config::AgentConfig,
    handlers::{self, AppState},
    state::AgentState,
};

/// Path that redirects (307) to the command path.
pub const REDIRECT_PATH: &str = "/redirect";

/// `/redirect/{n}` takes exactly `n` redirects (307, `n >= 1`) to reach the
/// command path.
pub const REDIRECT_CHAIN_PATH: &str = "/redirect/{n}";

/// Path that redirects (307) to itself forever.
pub const REDIRECT_LOOP_PATH: &str = "/redirect-loop";

/// Build the router with shared state. Unrouted paths answer `404`.
pub fn build_router(agent: Arc<AgentState>, config: AgentConfig) -> Router {
    let target = config.path.clone();
    let state = AppState { agent, config };

    Router::new()
        .route(&target, post(handlers::command))
        .route(
            REDIRECT_PATH,
            any(move || {
                let target = target.clone();
                async move {
                    (
                        StatusCode::TEMPORARY_REDIRECT,
                        [(header::LOCATION, target)],
                    )
                        .into_response()
                }
            }),
        )
        .route(REDIRECT_CHAIN_PATH, any(redirect_chain))
        .route(
            REDIRECT_LOOP_PATH,
            any(|| async {
                (
                    StatusCode::TEMPORARY_REDIRECT,
                    [(header::LOCATION, REDIRECT_LOOP_PATH)],
                )
                    .into_response()
            }),
        )
        .with_state(state)
}

async fn redirect_chain(State(state): State<AppState>, Path(n): Path<u32>) -> Response {
    let location = if n > 1 {
        format!("{REDIRECT_PATH}/{}", n - 1)
    } else {
        state.config.path.clone()
    };
    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::SESSION_COOKIE;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn build_app(agent: Arc<AgentState>) -> Router {
        build_router(agent, AgentConfig::default())
    }

    fn command(body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri("/eID-Client")
            .header("content-type", "application/json");
        if let Some(id) = cookie {
            req = req.header("cookie", format!("{SESSION_COOKIE}={id}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn first_request_opens_a_session() {
        let agent = Arc::new(AgentState::new());
        let resp = build_app(Arc::clone(&agent))
            .oneshot(command(json!({ "cmd": "GET_API_LEVEL" }), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("eidagent-session="));

        let body = json_body(resp).await;
        assert_eq!(body["msg"], "API_LEVEL");
        assert_eq!(body["current"], 1);

        let ids = agent.session_ids();
        assert_eq!(ids.len(), 1);
        assert_eq!(agent.session(&ids[0]).unwrap().history, vec!["GET_API_LEVEL"]);
    }

    #[tokio::test]
    async fn known_cookie_reuses_session() {
        let agent = Arc::new(AgentState::new());
        let id = agent.open_session();
        let resp = build_app(Arc::clone(&agent))
            .oneshot(command(json!({ "cmd": "SET_API_LEVEL", "level": 2 }), Some(&id)))
            .await
            .unwrap();
        assert!(resp.headers().get("set-cookie").is_none());
        assert_eq!(agent.session(&id).unwrap().api_level, 2);
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let agent = Arc::new(AgentState::new());
        let resp = build_app(agent)
            .oneshot(command(json!({ "cmd": "FROBNICATE" }), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["msg"], "UNKNOWN_COMMAND");
        assert_eq!(body["error"], "FROBNICATE");
    }

    #[tokio::test]
    async fn malformed_known_command_is_invalid() {
        let agent = Arc::new(AgentState::new());
        let resp = build_app(agent)
            .oneshot(command(json!({ "cmd": "SET_API_LEVEL" }), None))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["msg"], "INVALID");
    }

    #[tokio::test]
    async fn canned_reply_wins() {
        let agent = Arc::new(AgentState::new());
        agent.script("GET_INFO", 500, "boom");
        let resp = build_app(Arc::clone(&agent))
            .oneshot(command(json!({ "cmd": "GET_INFO" }), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"boom");
    }

    #[tokio::test]
    async fn redirect_points_at_command_path() {
        let agent = Arc::new(AgentState::new());
        let req = Request::builder()
            .method("POST")
            .uri(REDIRECT_PATH)
            .body(Body::empty())
            .unwrap();
        let resp = build_app(agent).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers().get("location").unwrap(), "/eID-Client");
    }

    #[tokio::test]
    async fn redirect_chain_counts_down() {
        let agent = Arc::new(AgentState::new());
        let hop = |uri: &str| {
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };
        let resp = build_app(Arc::clone(&agent))
            .oneshot(hop("/redirect/3"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers().get("location").unwrap(), "/redirect/2");

        let resp = build_app(agent).oneshot(hop("/redirect/1")).await.unwrap();
        assert_eq!(resp.headers().get("location").unwrap(), "/eID-Client");
    }

    #[tokio::test]
    async fn request_headers_are_recorded() {
        let agent = Arc::new(AgentState::new());
        let body = json!({ "cmd": "GET_INFO" }).to_string();
        let req = Request::builder()
            .method("POST")
            .uri("/eID-Client")
            .header("content-type", "application/json")
            .header("content-length", body.len())
            .header("user-agent", "test-agent/1")
            .body(Body::from(body.clone()))
            .unwrap();
        build_app(Arc::clone(&agent)).oneshot(req).await.unwrap();

        let id = &agent.session_ids()[0];
        let seen = &agent.session(id).unwrap().requests[0];
        assert_eq!(seen.content_type.as_deref(), Some("application/json"));
        assert_eq!(seen.content_length, Some(body.len().to_string()));
        assert_eq!(seen.user_agent.as_deref(), Some("test-agent/1"));
        assert_eq!(seen.body_len, body.len());
    }

    #[tokio::test]
    async fn other_paths_are_404() {
        let agent = Arc::new(AgentState::new());
        let req = Request::builder()
            .method("POST")
            .uri("/elsewhere")
            .body(Body::empty())
            .unwrap();
        let resp = build_app(agent).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
