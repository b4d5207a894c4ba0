//! ocbridge library: exposes modules for the binary and integration tests.

pub mod commands;
pub mod http;
