//! Pure classification of raw button masks and stick axes.

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::actions::NavigationAction;
use crate::snapshot::VrButton;

/// Axis magnitude a stick must exceed before it counts as a direction.
pub const STICK_THRESHOLD: f32 = 0.5;

/// `true` iff the button is down in `current` and was up in `previous`.
pub fn just_pressed(button: VrButton, current: u64, previous: u64) -> bool {
    let mask = button.mask();
    current & mask != 0 && previous & mask == 0
}

pub fn just_released(button: VrButton, current: u64, previous: u64) -> bool {
    just_pressed(button, previous, current)
}

pub fn held(button: VrButton, current: u64) -> bool {
    current & button.mask() != 0
}

/// Coarse 4-way stick direction. The numeric values match the engine's
/// thumbstick event encoding (1 = up, 2 = right, 3 = down, 4 = left).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum StickDirection {
    #[default]
    None = 0,
    Up = 1,
    Right = 2,
    Down = 3,
    Left = 4,
}

impl StickDirection {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => StickDirection::Up,
            2 => StickDirection::Right,
            3 => StickDirection::Down,
            4 => StickDirection::Left,
            _ => StickDirection::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == StickDirection::None
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, StickDirection::Up | StickDirection::Down)
    }

    pub fn action(self) -> NavigationAction {
        match self {
            StickDirection::None => NavigationAction::None,
            StickDirection::Up => NavigationAction::Up,
            StickDirection::Right => NavigationAction::Right,
            StickDirection::Down => NavigationAction::Down,
            StickDirection::Left => NavigationAction::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StickDirection::None => "none",
            StickDirection::Up => "up",
            StickDirection::Right => "right",
            StickDirection::Down => "down",
            StickDirection::Left => "left",
        }
    }
}

/// Classifies a stick position using [`STICK_THRESHOLD`].
pub fn classify_direction(x: f32, y: f32) -> StickDirection {
    classify_direction_with(x, y, STICK_THRESHOLD)
}

/// Vertical wins over horizontal: the checks run Up, Right, Down, Left.
pub fn classify_direction_with(x: f32, y: f32, threshold: f32) -> StickDirection {
    if y > threshold {
        StickDirection::Up
    } else if x > threshold {
        StickDirection::Right
    } else if y < -threshold {
        StickDirection::Down
    } else if x < -threshold {
        StickDirection::Left
    } else {
        StickDirection::None
    }
}
