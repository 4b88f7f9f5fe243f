//! Reply suggestion daemon library - exposes modules for testing.

pub mod completion;
pub mod config;
pub mod error;
pub mod request;
pub mod routes;
pub mod rules;
pub mod selector;
pub mod server;
pub mod shadow;
pub mod styler;
pub mod suggestion;
