//! # Engine Module
//!
//! Stage types and the machinery that turns them into input files.
//!
//! - [`stage`] defines the [`stage::Stage`] trait: shared parameters, the five write hooks
//!   and the fluent setters common to every stage.
//! - [`stages`] holds the concrete minimization and dynamics stages and the closed
//!   [`stages::AnyStage`] set.
//! - [`error`] and [`progress`] carry failures and progress events to callers.

pub mod error;
pub mod progress;
pub mod stage;
pub mod stages;
