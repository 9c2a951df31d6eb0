//! Protocol client and execution engine for kbctl: transport configuration,
//! the blocking HTTP session (auth modes, login, password encryption), the
//! statement dispatcher and the benchmark engine.

pub mod bench;
pub mod crypto;
pub mod dispatch;
mod error;
pub mod http;
pub mod transport;

pub use bench::{BenchRunner, BenchSummary};
pub use dispatch::{required_mode, success_predicate, Dispatcher, Output};
pub use error::{ClientError, Result};
pub use http::{AuthKind, HttpClient, Mode, Response};
pub use transport::{ApiBase, Transport, DEFAULT_HOST, DEFAULT_PORT};
