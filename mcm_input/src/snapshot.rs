//! Raw per-hand controller state as reported by the VR runtime.
//!
//! [`ControllerSnapshot`] mirrors `VRControllerState001_t` field for field so
//! the runtime can write straight into it. Each hand keeps the current and the
//! immediately previous snapshot; edge detection only ever compares those two.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::classify;

/// Number of analog axes carried by a controller state packet.
pub const AXIS_COUNT: usize = 5;

/// Logical hand a tracked controller is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

/// OpenVR button ids (`EVRButtonId`) the menu cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum VrButton {
    System = 0,
    /// B/Y on Touch controllers.
    ApplicationMenu = 1,
    Grip = 2,
    DPadLeft = 3,
    DPadUp = 4,
    DPadRight = 5,
    DPadDown = 6,
    /// A/X on Touch controllers.
    A = 7,
    /// `k_EButton_Axis0`, thumbstick or touchpad click.
    Thumbstick = 32,
    /// `k_EButton_Axis1`.
    Trigger = 33,
}

impl VrButton {
    pub fn mask(self) -> u64 {
        1u64 << (self as u32)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct ControllerAxis {
    pub x: f32,
    pub y: f32,
}

/// One polled controller state packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[repr(C)]
pub struct ControllerSnapshot {
    pub packet_num: u32,
    pub button_pressed: u64,
    pub button_touched: u64,
    pub axis: [ControllerAxis; AXIS_COUNT],
}

// The runtime fills this struct in place; its size is passed alongside.
const _: () = assert!(std::mem::size_of::<ControllerSnapshot>() == 64);

impl ControllerSnapshot {
    pub fn with_pressed(buttons: &[VrButton]) -> Self {
        let mut snapshot = Self::default();
        for button in buttons {
            snapshot.button_pressed |= button.mask();
        }
        snapshot
    }

    pub fn with_stick(x: f32, y: f32) -> Self {
        let mut snapshot = Self::default();
        snapshot.axis[0] = ControllerAxis { x, y };
        snapshot
    }

    /// Thumbstick (or touchpad) position, axis 0.
    pub fn stick(&self) -> ControllerAxis {
        self.axis[0]
    }
}

/// Current and previous snapshot for one hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandSnapshots {
    pub current: ControllerSnapshot,
    pub previous: ControllerSnapshot,
}

impl HandSnapshots {
    /// Copies current into previous. Must run before the next fetch so edges
    /// compare against the immediately prior packet.
    pub fn advance(&mut self) {
        self.previous = self.current;
    }

    pub fn just_pressed(&self, button: VrButton) -> bool {
        classify::just_pressed(
            button,
            self.current.button_pressed,
            self.previous.button_pressed,
        )
    }

    pub fn just_released(&self, button: VrButton) -> bool {
        classify::just_released(
            button,
            self.current.button_pressed,
            self.previous.button_pressed,
        )
    }

    pub fn held(&self, button: VrButton) -> bool {
        classify::held(button, self.current.button_pressed)
    }

    pub fn was_held(&self, button: VrButton) -> bool {
        classify::held(button, self.previous.button_pressed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerPair {
    pub left: HandSnapshots,
    pub right: HandSnapshots,
}

impl ControllerPair {
    pub fn hand(&self, hand: Hand) -> &HandSnapshots {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn hand_mut(&mut self, hand: Hand) -> &mut HandSnapshots {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    pub fn advance(&mut self) {
        self.left.advance();
        self.right.advance();
    }
}
