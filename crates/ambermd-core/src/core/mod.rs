//! # Core Module
//!
//! Stateless building blocks shared by every stage: the [`models::system::SystemInfo`]
//! contract, the restraint [`mask`] grammar and namelist formatting in [`io`].

pub mod io;
pub mod mask;
pub mod models;
