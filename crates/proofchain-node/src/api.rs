//! HTTP API for the proofchain node.
//!
//! Each route translates directly to one core operation on the shared
//! [`MiningEngine`], [`PeerRegistry`] or [`ConsensusResolver`].

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use proofchain_consensus::{
    Block, BlockLink, ChainFetcher, ConsensusError, ConsensusResolver, MiningEngine, PeerChain,
    PeerRegistry, Record,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, NodeConfig};
use crate::fetch::HttpChainFetcher;
use crate::schema::RecordSchema;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The node's ledger.
    pub engine: Arc<MiningEngine>,
    /// Known peers.
    pub peers: Arc<PeerRegistry>,
    /// Longest-chain resolver.
    pub resolver: Arc<ConsensusResolver>,
    /// Transport used to fetch peer chains.
    pub fetcher: Arc<dyn ChainFetcher>,
    /// Random identity, used as the mining reward recipient.
    pub node_id: Arc<str>,
    /// Accepted record shape.
    pub schema: RecordSchema,
}

impl AppState {
    /// Creates state with a fresh random node id.
    pub fn new(
        engine: MiningEngine,
        resolver: ConsensusResolver,
        fetcher: Arc<dyn ChainFetcher>,
        schema: RecordSchema,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            peers: Arc::new(PeerRegistry::new()),
            resolver: Arc::new(resolver),
            fetcher,
            node_id: generate_node_id().into(),
            schema,
        }
    }

    /// Builds the full node state from configuration.
    pub fn from_config(config: &NodeConfig) -> Result<Self, ConfigError> {
        let engine = MiningEngine::with_pow(config.pow());
        let resolver = ConsensusResolver::new(config.validator())
            .with_peer_timeout(config.peer_timeout());
        let fetcher = HttpChainFetcher::new(config.peer_timeout(), &config.peer_chain_path)
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;

        let state = Self::new(engine, resolver, Arc::new(fetcher), config.record_schema);
        state
            .peers
            .register_all(&config.peers)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(state)
    }

    /// Runs one resolution round against the registered peers.
    pub async fn resolve(&self) -> bool {
        self.resolver
            .resolve(&self.engine, &self.peers, self.fetcher.as_ref())
            .await
    }
}

/// Generates a node identity: a UUID v4 without dashes.
pub fn generate_node_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedRequest(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("consensus error: {0}")]
    Consensus(ConsensusError),
}

impl From<ConsensusError> for ApiError {
    fn from(e: ConsensusError) -> Self {
        match e {
            ConsensusError::InvalidAddress(address) => ApiError::InvalidAddress(address),
            other => ApiError::Consensus(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MalformedRequest(_) | ApiError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            ApiError::Consensus(ConsensusError::IndexOverflow(_)) => StatusCode::CONFLICT,
            ApiError::Consensus(e) => {
                tracing::error!(error = %e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Response to `GET /mine`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Record>,
    pub proof: u64,
    pub previous_hash: BlockLink,
}

/// Generic `{message}` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Request to register peers.
#[derive(Debug, Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Option<Vec<String>>,
}

/// Response to `POST /nodes/register`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

/// Response to `GET /nodes/resolve`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    pub chain: Vec<Block>,
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Ledger
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/chain", get(full_chain))
        // Peers and consensus
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_nodes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "node_id": &*state.node_id,
        "length": state.engine.len(),
    }))
}

/// Mines the pending records into a new block.
async fn mine(State(state): State<AppState>) -> Result<Json<MineResponse>, ApiError> {
    let reward = state.schema.reward(&state.node_id);
    let block = state.engine.mine(Some(reward)).await?;

    Ok(Json(MineResponse {
        message: "New Block Forged".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

/// Queues a record for the next block.
async fn new_transaction(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let record = state.schema.parse_record(body)?;
    let index = state.engine.submit(record)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Transaction will be added to Block {index}"),
        }),
    ))
}

/// Returns the full chain.
async fn full_chain(State(state): State<AppState>) -> Json<PeerChain> {
    Json(PeerChain::new(state.engine.chain()))
}

/// Registers peer addresses. Nothing is registered if any address is invalid.
async fn register_nodes(
    State(state): State<AppState>,
    payload: Result<Json<RegisterNodesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let nodes = request.nodes.ok_or_else(|| {
        ApiError::MalformedRequest("Please supply a valid list of nodes".to_string())
    })?;

    state.peers.register_all(&nodes)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterNodesResponse {
            message: "New nodes have been added".to_string(),
            total_nodes: state.peers.members().iter().map(ToString::to_string).collect(),
        }),
    ))
}

/// Runs consensus resolution against all registered peers.
async fn resolve_nodes(State(state): State<AppState>) -> Json<ResolveResponse> {
    let replaced = state.resolve().await;
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };

    Json(ResolveResponse {
        message: message.to_string(),
        chain: state.engine.chain(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_format() {
        let id = generate_node_id();

        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, generate_node_id());
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ApiError::MalformedRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::from(ConsensusError::InvalidAddress("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(ConsensusError::IndexOverflow(u64::MAX)),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(ConsensusError::EmptyChain),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
