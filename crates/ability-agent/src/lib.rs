//! Worker context for voice abilities.
//!
//! An ability never talks to the platform directly.  It receives a
//! [`Worker`] that speaks, listens, calls the text model, reads and writes
//! the user's files, runs managed background tasks, and finally resumes the
//! host's normal flow.
//!
//! ## Modules
//!
//! - [`llm`] -- Anthropic / OpenAI client and wire types.
//! - [`model`] -- The [`TextModel`] seam (prompt + history -> text).
//! - [`host`] -- [`Speech`], [`ResumeGuard`], and the [`Worker`] itself.
//! - [`scripted`] -- Deterministic doubles for tests and demos.
//! - [`error`] -- Agent error types.

pub mod error;
pub mod host;
pub mod llm;
pub mod model;
pub mod scripted;

pub use error::{AgentError, Result};
pub use host::{ResumeCounter, ResumeGuard, Speech, Worker};
pub use llm::{ChatRequest, LlmClient, LlmClientConfig, LlmProvider, Message, Role};
pub use model::TextModel;
pub use scripted::{ScriptedModel, ScriptedSpeech};
