//! In-process event bus and row-change fan-out.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: a row change as published by handlers.
//! - [`ChangeFeed`]: background task turning job change events into
//!   [`RowChange`]s for realtime subscribers.

pub mod bus;
pub mod changes;

pub use bus::{EventBus, PlatformEvent};
pub use changes::{ChangeFeed, ChangeSink, RowChange};
