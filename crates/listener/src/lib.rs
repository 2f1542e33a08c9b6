//! `genflow-listener` library crate.
//!
//! Client-side completion listener: subscribes to job row changes over the
//! realtime feed, polls the jobs API for watched jobs alongside it, and
//! reconciles finished assets into workspace state. The binary entrypoint
//! lives in `main.rs`.

pub mod channel;
pub mod client;
pub mod config;
pub mod delivery;
pub mod error;
pub mod fetcher;
pub mod messages;
pub mod poller;
pub mod reconnect;
pub mod signals;
pub mod workspace;
