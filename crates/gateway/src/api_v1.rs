//! HTTP API v1: the decision engine facade and the contract registry.
//!
//! Endpoints:
//!
//! - `POST /api/v1/sessions`                  Create a fresh intake session
//! - `POST /api/v1/evaluate`                  Validate and store a stage artifact
//! - `POST /api/v1/transition`                Advance the stage pointer
//! - `POST /api/v1/simulate`                  Run simulation cases
//! - `POST /api/v1/finalize`                  Finalize and register the contract
//! - `POST /api/v1/verify`                    Verify a contract hash
//! - `GET  /api/v1/contracts`                 List registered contracts
//! - `GET  /api/v1/contracts/{hash}`          Get one contract
//! - `GET  /api/v1/contracts/{hash}/lineage`  One-hop lineage of a contract

use axum::{
    Extension, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use ddrgate_core::{
    EvaluationResult, FinalizeResult, Session, SimulationCase, SimulationResult, Stage,
    TransitionResult,
};
use ddrgate_engine::{HashVerification, canonicalize_value, verify_contract_hash};
use ddrgate_registry::{Lineage, LineageRefs, StoredContract};
use ddrgate_security::{AuditEvent, Principal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    ARTIFACT_SCHEMA_VERSION, AuditNote, ENGINE_VERSION, GatewayError, HASH_ALGORITHM,
    SharedState,
};

/// Build the v1 API router. Merged into the main router, which supplies state.
pub fn v1_router() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/sessions", post(create_session_handler))
        .route("/api/v1/evaluate", post(evaluate_handler))
        .route("/api/v1/transition", post(transition_handler))
        .route("/api/v1/simulate", post(simulate_handler))
        .route("/api/v1/finalize", post(finalize_handler))
        .route("/api/v1/verify", post(verify_handler))
        .route("/api/v1/contracts", get(list_contracts_handler))
        .route("/api/v1/contracts/{hash}", get(get_contract_handler))
        .route("/api/v1/contracts/{hash}/lineage", get(lineage_handler))
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub session: Session,
    pub stage: Stage,
    pub artifacts: Value,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub session: Session,
    pub from_stage: Stage,
    pub to_stage: Stage,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub session: Session,
    #[serde(default)]
    pub cases: Vec<SimulationCase>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub session: Session,
    #[serde(default)]
    pub acceptance_confirmed: bool,
    #[serde(default)]
    pub requested_version: Option<String>,
    #[serde(default)]
    pub lineage: LineageRefs,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    #[serde(flatten)]
    pub result: FinalizeResult,
    /// Exact canonical text that was hashed; present when ACCEPTED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Lineage>,
}

/// `canonical_json` may be the record itself or its canonical text.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub canonical_json: Option<Value>,
    #[serde(default)]
    pub hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    #[serde(flatten)]
    pub verification: HashVerification,
    pub engine_version: &'static str,
    pub artifact_schema_version: &'static str,
    pub hash_algorithm: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Registry metadata without the contract body.
#[derive(Debug, Serialize)]
pub struct ContractSummary {
    pub contract_id: String,
    pub contract_hash: String,
    pub finalized_at: DateTime<Utc>,
    pub engine_version: String,
    pub lineage: LineageRefs,
    pub superseded_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContractListResponse {
    pub contracts: Vec<ContractSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    #[serde(flatten)]
    pub contract: StoredContract,
    pub superseded_by: Option<String>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn create_session_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let session = Session::new(
        uuid::Uuid::new_v4().to_string(),
        state.meta_contract_id.clone(),
        Utc::now(),
    );
    info!(session = %session.intake_session_id, "Session created");
    (StatusCode::CREATED, Json(session))
}

async fn evaluate_handler(
    State(state): State<SharedState>,
    Json(req): Json<EvaluateRequest>,
) -> Json<EvaluationResult> {
    Json(
        state
            .engine
            .evaluate_stage(&req.session, req.stage, req.artifacts, Utc::now()),
    )
}

async fn transition_handler(
    State(state): State<SharedState>,
    Json(req): Json<TransitionRequest>,
) -> Json<TransitionResult> {
    Json(
        state
            .engine
            .request_transition(&req.session, req.from_stage, req.to_stage, Utc::now()),
    )
}

async fn simulate_handler(
    State(state): State<SharedState>,
    Json(req): Json<SimulateRequest>,
) -> Json<SimulationResult> {
    Json(state.engine.run_simulation(&req.session, &req.cases, Utc::now()))
}

/// Finalize, then validate lineage and register the contract.
///
/// Lineage is checked only for ACCEPTED results; BLOCK and REJECT results
/// are returned as-is and nothing is registered.
async fn finalize_handler(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<FinalizeRequest>,
) -> Result<Response, GatewayError> {
    let now = Utc::now();
    let result = state.engine.finalize(
        &req.session,
        req.acceptance_confirmed,
        req.requested_version.as_deref(),
        now,
    );

    let Some(artifact) = result.contract_artifact.clone() else {
        return Ok(Json(FinalizeResponse {
            result,
            canonical_text: None,
            lineage: None,
        })
        .into_response());
    };

    let lineage = req.lineage.normalized();
    state.registry.validate_lineage(
        lineage.parent_hash.as_deref(),
        lineage.supersedes.as_deref(),
        &artifact.hash,
    )?;
    state.registry.register(StoredContract::from_artifact(
        &artifact,
        now,
        ENGINE_VERSION,
        lineage,
    ))?;

    info!(
        principal = %principal.name,
        contract_id = %artifact.contract_id,
        hash = %artifact.hash,
        "Contract finalized"
    );

    let mut response = Json(FinalizeResponse {
        canonical_text: canonicalize_value(&artifact.canonical_json).ok(),
        lineage: state.registry.lineage(&artifact.hash),
        result,
    })
    .into_response();
    response.extensions_mut().insert(AuditNote {
        event: AuditEvent::ContractRegistered {
            hash: artifact.hash.clone(),
        },
        target: Some(artifact.hash),
    });
    Ok(response)
}

async fn verify_handler(Json(req): Json<VerifyRequest>) -> Result<Json<VerifyResponse>, GatewayError> {
    let canonical_json = req
        .canonical_json
        .ok_or_else(|| GatewayError::BadRequest("canonical_json is required".into()))?;
    let hash = req
        .hash
        .ok_or_else(|| GatewayError::BadRequest("hash is required".into()))?;

    Ok(Json(VerifyResponse {
        verification: verify_contract_hash(&canonical_json, &hash),
        engine_version: ENGINE_VERSION,
        artifact_schema_version: ARTIFACT_SCHEMA_VERSION,
        hash_algorithm: HASH_ALGORITHM,
        timestamp: Utc::now(),
    }))
}

async fn list_contracts_handler(State(state): State<SharedState>) -> Json<ContractListResponse> {
    let contracts: Vec<ContractSummary> = state
        .registry
        .all()
        .into_iter()
        .map(|contract| ContractSummary {
            superseded_by: state.registry.superseding_hash(&contract.contract_hash),
            contract_id: contract.contract_id,
            contract_hash: contract.contract_hash,
            finalized_at: contract.finalized_at,
            engine_version: contract.engine_version,
            lineage: contract.lineage,
        })
        .collect();
    Json(ContractListResponse {
        count: contracts.len(),
        contracts,
    })
}

async fn get_contract_handler(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
) -> Result<Json<ContractResponse>, GatewayError> {
    let contract = state
        .registry
        .get(&hash)
        .ok_or_else(|| GatewayError::ContractNotFound(hash.clone()))?;
    Ok(Json(ContractResponse {
        superseded_by: state.registry.superseding_hash(&hash),
        contract,
    }))
}

async fn lineage_handler(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
) -> Result<Json<Lineage>, GatewayError> {
    state
        .registry
        .lineage(&hash)
        .map(Json)
        .ok_or(GatewayError::ContractNotFound(hash))
}
