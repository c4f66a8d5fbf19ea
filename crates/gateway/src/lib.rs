//! HTTP API gateway for ddrgate.
//!
//! Exposes the decision engine facade over JSON: stage evaluation,
//! transitions, simulation, finalization, hash verification, and the
//! contract registry. The server holds no session state; clients send
//! the full session value with every call and receive the next one back.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
mod error;

pub use error::GatewayError;

use axum::extract::{DefaultBodyLimit, MatchedPath, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use ddrgate_config::AppConfig;
use ddrgate_engine::DecisionEngine;
use ddrgate_registry::ContractRegistry;
use ddrgate_security::{
    ANONYMOUS, AuditEvent, AuditLogger, AuditOutcome, Principal, RateLimiter, Scope,
    TokenAuthenticator, TracingSink,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

/// Version of the decision engine semantics served by this gateway.
pub const ENGINE_VERSION: &str = "1.0.0";
/// Version of the contract artifact layout.
pub const ARTIFACT_SCHEMA_VERSION: &str = "1.0.0";
pub const API_VERSION: &str = "v1";
pub const HASH_ALGORITHM: &str = "SHA-256";

/// Response header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state for the gateway.
pub struct GatewayState {
    pub engine: DecisionEngine,
    pub meta_contract_id: String,
    pub authenticator: TokenAuthenticator,
    pub rate_limiter: RateLimiter,
    pub audit: AuditLogger,
    pub registry: ContractRegistry,
    pub max_body_bytes: usize,
    pub allowed_origins: Vec<String>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            engine: DecisionEngine::new(config.engine.default_version.clone()),
            meta_contract_id: config.engine.meta_contract_id.clone(),
            authenticator: TokenAuthenticator::from_config(&config.auth),
            rate_limiter: RateLimiter::from_config(&config.rate_limit),
            audit: AuditLogger::with_sinks(vec![Box::new(TracingSink)])
                .with_max_entries(config.gateway.audit_max_entries),
            registry: ContractRegistry::new(),
            max_body_bytes: config.gateway.max_body_bytes,
            allowed_origins: config.gateway.allowed_origins.clone(),
        }
    }
}

/// Id assigned to the request by the gateway middleware.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Attached to a response by a handler (or an error) to replace the
/// default `api_request` audit event for that request.
#[derive(Debug, Clone)]
pub(crate) struct AuditNote {
    pub event: AuditEvent,
    /// Overrides the endpoint as audit target, e.g. with a contract hash.
    pub target: Option<String>,
}

/// Build the full router.
///
/// Layers applied:
/// - Request id, bearer authentication, scope check, rate limiting and
///   audit on every route (`/health` skips auth and rate limiting)
/// - Request body size limit from config
/// - CORS restricted to configured origins
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let origins: Vec<HeaderValue> = state
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .merge(api_v1::v1_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gateway_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(&config));

    if state.authenticator.is_open() {
        warn!("No API tokens configured, serving in open mode as '{ANONYMOUS}'");
    }

    let app = build_router(state);

    info!(addr = %addr, engine_version = ENGINE_VERSION, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Scope an endpoint requires, or `None` for public endpoints.
fn required_scope(endpoint: &str) -> Option<Scope> {
    match endpoint {
        "/api/v1/sessions" | "/api/v1/evaluate" | "/api/v1/transition" => Some(Scope::Validate),
        "/api/v1/simulate" => Some(Scope::Simulate),
        "/api/v1/finalize" => Some(Scope::Finalize),
        "/api/v1/verify" => Some(Scope::Verify),
        path if path.starts_with("/api/v1/contracts") => Some(Scope::Read),
        _ => None,
    }
}

/// Authenticate, authorize and rate-limit one request.
///
/// On refusal, returns the actor name to audit along with the error.
fn admit(
    state: &GatewayState,
    endpoint: &str,
    headers: &HeaderMap,
) -> Result<Principal, (String, GatewayError)> {
    let Some(scope) = required_scope(endpoint) else {
        return Ok(Principal::anonymous());
    };

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let principal = state
        .authenticator
        .authenticate(authorization)
        .map_err(|e| (ANONYMOUS.to_string(), e.into()))?;

    state
        .authenticator
        .authorize(&principal, scope)
        .map_err(|e| (principal.name.clone(), e.into()))?;

    if !state.rate_limiter.check(&principal.name, endpoint) {
        return Err((
            principal.name.clone(),
            GatewayError::RateLimited {
                endpoint: endpoint.to_string(),
            },
        ));
    }

    Ok(principal)
}

/// Request id, auth, rate limit and audit for every request.
async fn gateway_middleware(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = req.method().clone();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let (actor, mut response) = match admit(&state, &endpoint, req.headers()) {
        Ok(principal) => {
            let actor = principal.name.clone();
            req.extensions_mut().insert(RequestId(request_id.clone()));
            req.extensions_mut().insert(principal);
            (actor, next.run(req).await)
        }
        Err((actor, error)) => {
            warn!(request_id = %request_id, actor = %actor, endpoint = %endpoint, error = %error, "Request refused");
            (actor, error.into_response())
        }
    };

    let status = response.status();
    let outcome = match status {
        s if s.is_success() => AuditOutcome::Success,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            AuditOutcome::Denied
        }
        _ => AuditOutcome::Failure,
    };
    let note = response.extensions_mut().remove::<AuditNote>();
    let (event, target) = match note {
        Some(AuditNote { event, target }) => (event, target.unwrap_or_else(|| endpoint.clone())),
        None => (
            AuditEvent::ApiRequest {
                endpoint: endpoint.clone(),
            },
            endpoint.clone(),
        ),
    };
    let latency_ms = started.elapsed().as_millis();
    state.audit.log(
        &request_id,
        event,
        &actor,
        &target,
        outcome,
        Some(format!("{method} {} {latency_ms}ms", status.as_u16())),
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    debug!(request_id = %request_id, method = %method, endpoint = %endpoint, status = status.as_u16(), latency_ms, "Request handled");
    response
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    engine_version: &'static str,
    artifact_schema_version: &'static str,
    api_version: &'static str,
    hash_algorithm: &'static str,
    timestamp: DateTime<Utc>,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        engine_version: ENGINE_VERSION,
        artifact_schema_version: ARTIFACT_SCHEMA_VERSION,
        api_version: API_VERSION,
        hash_algorithm: HASH_ALGORITHM,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ddrgate_config::{AuthConfig, RateLimitConfig, TokenConfig};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_state(config: &AppConfig) -> SharedState {
        Arc::new(GatewayState::from_config(config))
    }

    fn secured_config() -> AppConfig {
        AppConfig {
            auth: AuthConfig {
                tokens: vec![
                    TokenConfig {
                        token: "author-token".into(),
                        principal: "author".into(),
                        scopes: vec!["validate".into(), "read".into()],
                    },
                    TokenConfig {
                        token: "viewer-token".into(),
                        principal: "viewer".into(),
                        scopes: vec!["read".into()],
                    },
                ],
            },
            ..AppConfig::default()
        }
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let state = test_state(&secured_config());
        let app = build_router(state.clone());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["engine_version"], ENGINE_VERSION);
        assert_eq!(body["hash_algorithm"], "SHA-256");
        assert_eq!(state.audit.count(), 1);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let state = test_state(&secured_config());
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json("/api/v1/sessions", None, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let request_id = response.headers()[REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(body_json(response).await["error"], "UNAUTHORIZED");

        let entries = state.audit.entries_for_request(&request_id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, AuditEvent::AuthFailure);
        assert_eq!(entries[0].outcome, AuditOutcome::Denied);
        assert_eq!(entries[0].actor, ANONYMOUS);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let app = build_router(test_state(&secured_config()));
        let response = app
            .oneshot(post_json("/api/v1/sessions", Some("nope"), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_scope_is_forbidden() {
        let state = test_state(&secured_config());
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json("/api/v1/sessions", Some("viewer-token"), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let entries = state.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, "viewer");
        assert_eq!(
            entries[0].event,
            AuditEvent::ScopeDenied {
                scope: "validate".into()
            }
        );
    }

    #[tokio::test]
    async fn scoped_token_is_admitted() {
        let state = test_state(&secured_config());
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json("/api/v1/sessions", Some("author-token"), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let entries = state.audit.entries();
        assert_eq!(entries[0].actor, "author");
        assert_eq!(entries[0].outcome, AuditOutcome::Success);
        assert_eq!(
            entries[0].event,
            AuditEvent::ApiRequest {
                endpoint: "/api/v1/sessions".into()
            }
        );
    }

    #[tokio::test]
    async fn exhausted_bucket_is_rate_limited() {
        let config = AppConfig {
            rate_limit: RateLimitConfig {
                capacity: 1,
                refill_per_sec: 0.001,
            },
            ..AppConfig::default()
        };
        let state = test_state(&config);

        let first = build_router(state.clone())
            .oneshot(post_json("/api/v1/sessions", None, json!({})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = build_router(state.clone())
            .oneshot(post_json("/api/v1/sessions", None, json!({})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(second).await["error"], "RATE_LIMITED");

        // Other endpoints keep their own bucket, health is never limited.
        let health = build_router(state.clone())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        let verify = build_router(state)
            .oneshot(post_json("/api/v1/verify", None, json!({"canonical_json": {}, "hash": "x"})))
            .await
            .unwrap();
        assert_eq!(verify.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_ids_are_unique() {
        let state = test_state(&AppConfig::default());
        let mut ids = Vec::new();
        for _ in 0..3 {
            let response = build_router(state.clone())
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            ids.push(response.headers()[REQUEST_ID_HEADER].clone());
        }
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(state.audit.count(), 3);
    }

    #[tokio::test]
    async fn audit_log_keeps_only_the_configured_number_of_entries() {
        let mut config = AppConfig::default();
        config.gateway.audit_max_entries = 2;
        let state = test_state(&config);
        let mut ids = Vec::new();
        for _ in 0..4 {
            let response = build_router(state.clone())
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            ids.push(response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string());
        }
        let kept: Vec<_> = state.audit.entries().into_iter().map(|e| e.request_id).collect();
        assert_eq!(kept, ids[2..]);
    }

    #[test]
    fn scopes_by_endpoint() {
        assert_eq!(required_scope("/health"), None);
        assert_eq!(required_scope("/api/v1/evaluate"), Some(Scope::Validate));
        assert_eq!(required_scope("/api/v1/transition"), Some(Scope::Validate));
        assert_eq!(required_scope("/api/v1/simulate"), Some(Scope::Simulate));
        assert_eq!(required_scope("/api/v1/finalize"), Some(Scope::Finalize));
        assert_eq!(required_scope("/api/v1/verify"), Some(Scope::Verify));
        assert_eq!(required_scope("/api/v1/contracts/{hash}"), Some(Scope::Read));
    }
}
