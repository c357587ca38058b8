//! # Proofchain Node
//!
//! HTTP front end for a proofchain ledger. The node owns one
//! [`MiningEngine`](proofchain_consensus::MiningEngine), accepts records and
//! mining requests over HTTP, and reconciles with its peers by fetching
//! their chains and adopting the longest valid one.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Proofchain Node                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP API (axum)                                            │
//! │  • GET  /mine               • POST /transactions/new        │
//! │  • GET  /chain              • POST /nodes/register          │
//! │  • GET  /nodes/resolve      • GET  /health                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  proofchain-consensus                                       │
//! │  • MiningEngine (ledger + off-lock proof search)            │
//! │  • PeerRegistry • ConsensusResolver • ChainValidator        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HttpChainFetcher (reqwest) ──▶ GET http://{peer}/chain     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run --bin proofchain-node -- --port 5000
//! ```
//!
//! ## Modules
//!
//! - [`api`] - HTTP routes and shared state
//! - [`config`] - YAML configuration and validation
//! - [`fetch`] - HTTP transport for peer chains
//! - [`observability`] - Structured logging
//! - [`schema`] - Accepted record shapes and mining rewards
//! - [`server`] - Serving, periodic resolution and shutdown

pub mod api;
pub mod config;
pub mod fetch;
pub mod observability;
pub mod schema;
pub mod server;
