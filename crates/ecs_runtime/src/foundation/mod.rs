//! Foundation module - utilities shared by the runtime
//!
//! - Logging setup

pub mod logging;
