//! # Observability
//!
//! Structured logging via `tracing`. Library code only emits events; binaries,
//! examples and benches opt in to output with [`init_logging`].
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   operator / norm / solver / grid            │
//! │   tracing::{trace, debug, info, warn}!()     │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                        ▼
//!          EnvFilter (filter | RUST_LOG | level)
//!                        │
//!                        ▼
//!             fmt layer: json | pretty | compact
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
