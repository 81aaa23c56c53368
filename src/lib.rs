//! Cruddy - chat relay for local language models and a voice robot client
//!
//! This library provides both halves of the system:
//! - A relay server that forwards chat requests to a local model runtime
//! - A robot client that records, asks the relay, and speaks the answer
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐         ┌──────────────────────────────┐
//! │         Robot client         │  HTTPS  │         Relay server         │
//! │ mic → typed text → /chat ────┼────────►│ auth → registry → prompt     │
//! │ TTS → speaker → servo stub   │         │   → backend → JSON parse     │
//! └──────────────────────────────┘         └──────────────┬───────────────┘
//!                                                         │
//!                                          ┌──────────────▼───────────────┐
//!                                          │  Ollama (/api/generate,      │
//!                                          │          /api/tags)          │
//!                                          └──────────────────────────────┘
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod hardware;
pub mod registry;
pub mod relay;
pub mod robot;
pub mod voice;

pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use backend::{Backend, OllamaBackend};
pub use config::Config;
pub use error::{Error, Result};
pub use hardware::{GpuProbe, GpuStats, HardwareMonitor};
pub use registry::{ModelEntry, ModelRegistry};
pub use relay::{ChatRelay, ChatRequest, ChatResponse, OptimizedChatRequest};
pub use robot::{RelayClient, Robot, RobotConfig};
