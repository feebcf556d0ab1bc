//! # Maildrop Server
//!
//! The HTTP front end of the maildrop message buffer: route dispatch for
//! append/retrieve/watch, the channel-backed sink that turns watch
//! sessions into streamed response bodies, and the command-line
//! configuration for the `maildrop` binary.

pub mod config;
pub mod http;
pub mod watch;

pub use config::Cli;
pub use http::{AppState, create_router};
pub use watch::ChannelSink;
