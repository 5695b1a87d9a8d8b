//! Common utilities for the Cascara style engine.
//!
//! This crate provides shared infrastructure used by all style components:
//! - **Warning System** - colored terminal output for dropped or unsupported CSS

pub mod warning;
