//! Reactive client-side state for a bring-your-own-key LLM chat app.
//!
//! [`store`] provides observable stores and derived views; [`state`] builds
//! the application container on top of them. The remaining modules make up
//! the replay/interactive console shipped as the `byok-state` binary.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod display;
pub mod input;
pub mod state;
pub mod store;
pub mod types;
