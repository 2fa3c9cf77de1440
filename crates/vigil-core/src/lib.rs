//! Core types, configuration, and error handling for the Vigil triage engine.
//!
//! This crate provides the shared foundation used by the other Vigil crates:
//! - [`VigilError`] — unified error type using `thiserror`
//! - [`VigilConfig`] — configuration loaded from `.vigil.toml`
//! - The comment data model: [`Comment`], [`CommentMetadata`],
//!   [`CodeSuggestion`], [`ResponseAction`], and the closed enums
//!   [`Intent`], [`Priority`], [`CommentStatus`], [`Urgency`], [`Complexity`]

mod config;
mod error;
mod types;

pub use config::{
    EscalationAction, EscalationCondition, EscalationRule, MonitorConfig, TriageConfig, VigilConfig,
};
pub use error::VigilError;
pub use types::{
    ActionStatus, ActionType, CodeSuggestion, Comment, CommentMetadata, CommentStatus, CommentType,
    Complexity, Intent, Priority, ResponseAction, Urgency,
};

/// A convenience `Result` type for Vigil operations.
pub type Result<T> = std::result::Result<T, VigilError>;
