//! Voice abilities: manifests, the session loop, and the built-ins.
//!
//! - **[`manifest`]** -- `config.json` loading and validation.
//! - **[`session`]** -- The [`Conversation`] trait and [`run_session`], which
//!   owns greeting, exit and idle handling, turn limits and apologies.
//! - **[`host`]** -- [`AbilityHost`], the local harness that routes
//!   utterances, runs sessions under a timeout and counts resumes.
//! - **[`abilities`]** -- Grocery list, weather, voice journal, unit
//!   converter and trivia.

pub mod abilities;
pub mod error;
pub mod host;
pub mod manifest;
pub mod session;

pub use abilities::builtin_abilities;
pub use error::{Result, SkillError};
pub use host::{
    Ability, AbilityHost, CRASH_MESSAGE, ConversationAbility, HostSettings, InvocationReport,
    SessionOutcome, run_ability,
};
pub use manifest::{
    AbilityManifest, MANIFEST_FILE, ValidationReport, load_manifest, load_manifests_from_dir,
};
pub use session::{Conversation, EndReason, SessionSummary, TurnOutcome, run_session};
