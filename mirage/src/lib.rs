pub mod cache;
pub mod catalog;
pub mod client;
pub mod interaction;
pub mod prompt;
pub mod shell;
pub mod surface;

// Re-exports
pub use cache::ViewCache;
pub use catalog::{AppDefinition, builtin_catalog, find_app};
pub use client::{
    ClientError, GeminiBackend, GenerativeBackend, StreamEvent, ViewStream, stream_view,
};
pub use interaction::{InteractionData, InteractionKind, NavigationPath, record};
pub use shell::{Directive, Settings, SettingsError, Shell, ShellState, StreamState};
pub use surface::{InteractiveElement, scan_markup};
