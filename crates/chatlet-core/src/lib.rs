//! Core chatlet library (widget session, streaming client, renderer, config).

pub mod client;
pub mod config;
pub mod embed;
pub mod render;
pub mod session;
