//! Turn-level understanding for voice abilities.
//!
//! - **Classification**: model output to a closed intent enum with a
//!   fallback arm via [`IntentClassifier`].
//! - **Exit detection**: keyword tiers plus an optional model check via
//!   [`ExitDetector`].
//! - **Idle detection**: warn, then exit, via [`IdleTracker`].
//! - **Slot filling**: [`PendingState`] for multi-turn flows.
//! - **Fast paths**: [`parse_confirmation`] and [`KeywordTable`].

pub mod classifier;
pub mod confirm;
pub mod error;
pub mod exit;
pub mod idle;
pub mod keywords;
pub mod pending;

pub use classifier::{
    IntentClassifier, IntentRecord, IntentSchema, parse_intent_record, parse_json_object,
    strip_json_fences,
};
pub use confirm::{Confirmation, parse_confirmation};
pub use error::{IntentError, Result};
pub use exit::{ExitCheck, ExitDetector, ExitReason, clean_input};
pub use idle::{IdleAction, IdleState, IdleTracker, is_substantive};
pub use keywords::{KeywordMatch, KeywordTable};
pub use pending::PendingState;
