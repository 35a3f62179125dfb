//! VR controller input for the MCM menu.
//!
//! Raw controller state comes either from a direct OpenVR poll
//! ([`openvr::HardwarePoller`]) or from the engine's own input events
//! ([`engine_event`]). Both are classified into edges and stick directions,
//! mapped onto the small [`NavigationAction`] vocabulary and paced by the
//! repeat and debounce timers. Nothing here touches the menu itself.

pub mod actions;
pub mod classify;
pub mod clock;
pub mod engine_event;
pub mod openvr;
pub mod repeat;
pub mod snapshot;

pub use actions::{
    keycodes, map_controller_buttons, ActionFlags, ActionState, HardwareFrame, LedgerKey,
    MenuCommand, NavigationAction, Phase, TickLedger,
};
pub use classify::{classify_direction, classify_direction_with, StickDirection, STICK_THRESHOLD};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine_event::{
    resolve_button_event, ButtonEvent, ButtonResolution, DeviceType, EventOrigin, Stick,
    ThumbstickEvent,
};
pub use openvr::{
    ControllerRole, HardwarePoller, PollReport, PollerError, SystemProvider, TrackedDeviceIndex,
    VrSystem, INVALID_DEVICE_INDEX,
};
pub use repeat::{DebounceGate, HoldPhase, RepeatTiming, StickUpdate, ThumbstickHold};
pub use snapshot::{ControllerAxis, ControllerPair, ControllerSnapshot, Hand, HandSnapshots, VrButton};
