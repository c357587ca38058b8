//! # Observability Module
//!
//! Structured logging for the proofchain node. HTTP requests are traced by
//! the `TraceLayer` installed in [`crate::api::create_router`]; this module
//! sets up the subscriber those spans and events go to.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use proofchain_node::observability::{init_logging, LogFormat};
//!
//! init_logging("info", LogFormat::Pretty);
//! ```

mod logging;

pub use logging::{default_directives, init_logging, LogFormat};
