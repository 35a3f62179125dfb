//! Drives the MCM menu movie from VR controller input.
//!
//! [`handler::MenuInputHandler`] owns the per-session input state and calls
//! into [`bridge::MenuBridge`], which is the only code that touches the UI
//! tree. The tree itself sits behind [`movie::MovieRoot`] so the same logic
//! runs against the game or against [`memory::MemoryHost`].

pub mod bridge;
pub mod config;
pub mod handler;
pub mod listeners;
pub mod memory;
pub mod movie;

pub use bridge::{GoBackOutcome, ListKind, MenuBridge, NavigateOutcome};
pub use config::{ConfigError, HelpListLeft, InputConfig, InputSource, StickNavigation, UiPaths};
pub use handler::{MenuInputHandler, DEFAULT_LISTENER_ID};
pub use listeners::{register_listener, InputListeners, ListenerId};
pub use memory::{FixtureError, MemoryHost, MemoryMovie, MenuFixture, UiCall};
pub use movie::{MovieRoot, ObjectHandle, UiHost, UiValue};
