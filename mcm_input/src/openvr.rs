//! Direct controller polling through the OpenVR system interface.
//!
//! Only two interface methods are used: "device index for controller role"
//! and "controller state". Both sit behind [`VrSystem`] so the poller can be
//! driven by a recorded session or a test double as easily as by the real
//! runtime ([`ffi::OpenVrApi`]).

pub mod ffi;

use log::{debug, info};
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

use crate::snapshot::{ControllerPair, ControllerSnapshot, Hand};

pub type TrackedDeviceIndex = u32;

/// `k_unTrackedDeviceIndexInvalid`.
pub const INVALID_DEVICE_INDEX: TrackedDeviceIndex = 0xFFFF_FFFF;

/// Interface versions tried in order; the first the runtime accepts wins.
pub const SYSTEM_INTERFACE_VERSIONS: [&str; 4] = [
    "IVRSystem_022",
    "IVRSystem_021",
    "IVRSystem_020",
    "IVRSystem_019",
];

const DIAGNOSTIC_UPDATES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ControllerRole {
    Invalid = 0,
    LeftHand = 1,
    RightHand = 2,
}

impl From<Hand> for ControllerRole {
    fn from(hand: Hand) -> Self {
        match hand {
            Hand::Left => ControllerRole::LeftHand,
            Hand::Right => ControllerRole::RightHand,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollerError {
    #[error("VR runtime is not loaded in this process")]
    RuntimeNotLoaded,
    #[error("VR runtime does not export {0}")]
    EntryPointMissing(&'static str),
    #[error("interface {version} unavailable (init error {code})")]
    InterfaceUnavailable { version: &'static str, code: i32 },
    #[error("no supported system interface version is available")]
    NoInterfaceVersion,
    #[error("system interface has a null vtable")]
    NullVtable,
    #[error("system interface vtable slot {slot} is null")]
    NullVtableSlot { slot: usize },
}

/// The two system-interface calls the poller needs.
pub trait VrSystem {
    fn device_index_for_role(&self, role: ControllerRole) -> TrackedDeviceIndex;

    /// Fills `state` and returns `true` on success. On failure `state` must
    /// be considered garbage.
    fn controller_state(&self, index: TrackedDeviceIndex, state: &mut ControllerSnapshot) -> bool;
}

/// Hands out a system interface for a version string.
pub trait SystemProvider {
    fn acquire(&self, version: &'static str) -> Result<Box<dyn VrSystem>, PollerError>;
}

/// Which hands received a fresh snapshot during the last update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub left_fresh: bool,
    pub right_fresh: bool,
}

impl PollReport {
    pub fn is_fresh(&self, hand: Hand) -> bool {
        match hand {
            Hand::Left => self.left_fresh,
            Hand::Right => self.right_fresh,
        }
    }

    fn set(&mut self, hand: Hand, fresh: bool) {
        match hand {
            Hand::Left => self.left_fresh = fresh,
            Hand::Right => self.right_fresh = fresh,
        }
    }
}

#[derive(Default)]
pub struct HardwarePoller {
    system: Option<Box<dyn VrSystem>>,
    interface_version: Option<&'static str>,
    controllers: ControllerPair,
    last_report: PollReport,
    updates: u32,
}

impl std::fmt::Debug for HardwarePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwarePoller")
            .field("interface_version", &self.interface_version)
            .field("controllers", &self.controllers)
            .field("last_report", &self.last_report)
            .field("updates", &self.updates)
            .finish()
    }
}

impl HardwarePoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.system.is_some()
    }

    pub fn interface_version(&self) -> Option<&'static str> {
        self.interface_version
    }

    /// Acquires the system interface, trying each known version in order.
    /// Versions the runtime rejects are skipped; any other failure aborts.
    /// The poller is left untouched on error.
    pub fn initialize<P>(&mut self, provider: &P) -> Result<&'static str, PollerError>
    where
        P: SystemProvider + ?Sized,
    {
        if let Some(version) = self.interface_version {
            return Ok(version);
        }
        for version in SYSTEM_INTERFACE_VERSIONS {
            match provider.acquire(version) {
                Ok(system) => {
                    info!("acquired {version}");
                    self.system = Some(system);
                    self.interface_version = Some(version);
                    self.controllers = ControllerPair::default();
                    self.updates = 0;
                    return Ok(version);
                }
                Err(PollerError::InterfaceUnavailable { version, code }) => {
                    debug!("{version} unavailable (code {code})");
                }
                Err(err) => return Err(err),
            }
        }
        Err(PollerError::NoInterfaceVersion)
    }

    /// Polls both hands. Returns `false` when not initialized. A hand whose
    /// device index is invalid or whose state query fails keeps its stale
    /// snapshot.
    pub fn update(&mut self) -> bool {
        let Some(system) = self.system.as_deref() else {
            return false;
        };

        self.controllers.advance();
        let verbose = self.updates < DIAGNOSTIC_UPDATES;
        self.updates = self.updates.saturating_add(1);

        let mut report = PollReport::default();
        for hand in Hand::BOTH {
            let index = system.device_index_for_role(hand.into());
            if verbose {
                debug!("update {}: {} index {index:#x}", self.updates, hand.as_str());
            }
            if index == INVALID_DEVICE_INDEX {
                continue;
            }
            let mut state = ControllerSnapshot::default();
            if !system.controller_state(index, &mut state) {
                continue;
            }
            let slot = self.controllers.hand_mut(hand);
            if state.button_pressed != slot.previous.button_pressed {
                debug!(
                    "{} buttons {:#x} -> {:#x}",
                    hand.as_str(),
                    slot.previous.button_pressed,
                    state.button_pressed
                );
            }
            slot.current = state;
            report.set(hand, true);
        }
        self.last_report = report;
        true
    }

    pub fn shutdown(&mut self) {
        if self.system.take().is_some() {
            info!("hardware poller shut down");
        }
        self.interface_version = None;
        self.controllers = ControllerPair::default();
        self.last_report = PollReport::default();
        self.updates = 0;
    }

    pub fn controllers(&self) -> &ControllerPair {
        &self.controllers
    }

    pub fn last_report(&self) -> PollReport {
        self.last_report
    }
}
