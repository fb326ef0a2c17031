//! notelift library crate
//!
//! A pure, synchronous pipeline that converts free-form meeting and product
//! notes (markdown) into ranked, evidence-grounded suggestion cards. Hosts
//! embed it behind their own UI and persistence layers; this crate does no
//! I/O of its own.

pub mod classify;
pub mod config;
pub mod consolidate;
pub mod ledger;
pub mod note;
pub mod pipeline;
pub mod preprocess;
pub mod route;
pub mod rules;
pub mod score;
pub mod suggest;
pub mod synthesize;
pub mod title;
pub mod util;
pub mod validate;

pub use config::PipelineConfig;
pub use note::{InitiativeSnapshot, NoteInput};
pub use pipeline::{run, PipelineOutput};
pub use suggest::{Suggestion, SuggestionKind};
