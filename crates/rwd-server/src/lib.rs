//! RWD Server - HTTP front end
//!
//! Wires configuration, logging and the session store behind one warp
//! filter. Request handling itself lives in [`App`], which is synchronous
//! and network-free:
//!
//! ```text
//! warp filter ──► ApiRequest ──► App::handle ──► Route ──► SessionStore
//!                                    │
//!      Received → SessionKeyResolved → ViewResolved → Served | Failed
//! ```
//!
//! # Example
//!
//! ```rust
//! use rwd_server::{ApiRequest, App, ServerConfig};
//!
//! let app = App::from_config(&ServerConfig::default().with_demo_data(true)).unwrap();
//! let response = app.handle(ApiRequest::get("/tags"));
//! assert_eq!(response.status.as_u16(), 200);
//! ```

#![warn(unreachable_pub)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod routes;
pub mod session_key;
pub mod wire;

pub use app::{ApiRequest, ApiResponse, App};
pub use config::{ConfigError, LogConfig, OriginPolicy, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorEnvelope};
pub use lifecycle::{RequestLifecycle, RequestPhase};
pub use routes::Route;
pub use session_key::CallerContext;
