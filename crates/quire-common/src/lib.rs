//! Common utilities for the quire layout engine.
//!
//! This crate provides shared infrastructure used by all quire components:
//! - **Warning System** - deduplicated warnings for recovered input problems

pub mod warning;
