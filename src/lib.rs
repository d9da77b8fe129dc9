//! idiombot - idiom guessing game for chat bots

pub mod bus;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod lock;
pub mod provider;
pub mod session;
pub mod telemetry;
pub mod template;
pub mod transport;
