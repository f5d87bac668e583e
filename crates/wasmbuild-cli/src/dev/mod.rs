//! Development server module.
//!
//! Provides the watch-and-serve loop:
//! - Live reload via Server-Sent Events
//! - In-memory serving of the compiled artefact
//! - Dependency watching with debouncing
//! - Compile error overlay in the browser

pub mod broadcast;
pub mod builder;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod watcher;

// Re-exports
pub use broadcast::{Broadcaster, ClientChannel, Delivery, ServeMessage};
pub use builder::DevBuilder;
pub use server::{server_url, DevServer};
pub use shutdown::ShutdownToken;
pub use state::{BuildStatus, DevServerState, SharedState};
pub use watcher::{ChangeWatcher, Debouncer, Signal, DEBOUNCE_WINDOW};
