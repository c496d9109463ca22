//! # Workflows Module
//!
//! Multi-stage entry points built on the [`engine`](crate::engine) stages.
//!
//! - **Protocols** ([`protocol`]) - Ordered stage lists written into an output directory,
//!   with duplicate-name detection and progress reporting.
//! - **Equilibration** ([`equilibration`]) - The standard minimize, heat, release and
//!   produce preparation sequence.

pub mod equilibration;
pub mod protocol;
