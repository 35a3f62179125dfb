//! Input events delivered by the engine's own dispatch, and how each one
//! resolves into menu input.
//!
//! VR controllers show up either under device type 4 or, through some
//! runtime shims, under ordinary device types with VR control names. Both
//! forms collapse into the same [`NavigationAction`] stream as the hardware
//! poller.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::actions::{keycodes, MenuCommand, NavigationAction, Phase};
use crate::classify::StickDirection;

/// Engine `InputEvent` device discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceType(pub u32);

impl DeviceType {
    pub const KEYBOARD: DeviceType = DeviceType(0);
    pub const MOUSE: DeviceType = DeviceType(1);
    pub const GAMEPAD: DeviceType = DeviceType(2);
    pub const VR: DeviceType = DeviceType(4);

    pub fn is_vr(self) -> bool {
        self == DeviceType::VR
    }
}

/// Key mask the VR runtime reports for the grip.
pub const VR_GRIP_KEY_MASK: u32 = 34;

/// Keycodes sent while the menu is binding a hotkey to a VR control.
pub mod vr_keycodes {
    pub const RIGHT_TRIGGER: u32 = 300;
    pub const RIGHT_GRIP: u32 = 301;
    pub const RIGHT_A: u32 = 302;
    pub const RIGHT_B: u32 = 303;
    pub const RIGHT_THUMBSTICK: u32 = 304;
    pub const LEFT_TRIGGER: u32 = 305;
    pub const LEFT_GRIP: u32 = 306;
    pub const LEFT_X: u32 = 307;
    pub const LEFT_Y: u32 = 308;
    pub const LEFT_THUMBSTICK: u32 = 309;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub device: DeviceType,
    #[serde(default)]
    pub control: String,
    #[serde(default)]
    pub key_mask: u32,
    /// 1.0 while down, 0.0 once released.
    pub value: f32,
    /// Seconds the button has been held; 0.0 on the initial press.
    #[serde(default)]
    pub timer: f32,
}

impl ButtonEvent {
    pub fn is_down(&self) -> bool {
        self.value == 1.0 && self.timer == 0.0
    }

    pub fn is_up(&self) -> bool {
        self.value == 0.0 && self.timer != 0.0
    }

    pub fn phase(&self) -> Option<Phase> {
        if self.is_down() {
            Some(Phase::Press)
        } else if self.is_up() {
            Some(Phase::Release)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum Stick {
    Left = 0xB,
    Right = 0xC,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThumbstickEvent {
    pub stick: Stick,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub direction: StickDirection,
}

/// Keycode for a VR control while the menu is in remap mode.
pub fn remap_key_code(control: &str, key_mask: u32) -> Option<u32> {
    let code = match control {
        "WandTrigger" => vr_keycodes::RIGHT_TRIGGER,
        "WandGrip" => vr_keycodes::RIGHT_GRIP,
        "WandButton1" | "Primary" => vr_keycodes::RIGHT_A,
        "WandButton2" | "Secondary" => vr_keycodes::RIGHT_B,
        "WandThumbstick" => vr_keycodes::RIGHT_THUMBSTICK,
        "SecondaryTrigger" => vr_keycodes::LEFT_TRIGGER,
        "SecondaryGrip" => vr_keycodes::LEFT_GRIP,
        "Grip" if key_mask == VR_GRIP_KEY_MASK => vr_keycodes::LEFT_GRIP,
        "SecondaryButton1" => vr_keycodes::LEFT_X,
        "SecondaryButton2" => vr_keycodes::LEFT_Y,
        "SecondaryThumbstick" => vr_keycodes::LEFT_THUMBSTICK,
        _ => return None,
    };
    Some(code)
}

/// Translates an XInput button mask into an engine keycode.
pub fn gamepad_mask_to_keycode(mask: u32) -> u32 {
    match mask {
        0x0001 => keycodes::DPAD_UP,
        0x0002 => keycodes::DPAD_DOWN,
        0x0004 => keycodes::DPAD_LEFT,
        0x0008 => keycodes::DPAD_RIGHT,
        0x0010 => keycodes::START,
        0x0020 => keycodes::BACK,
        0x0040 => keycodes::LEFT_THUMB,
        0x0080 => keycodes::RIGHT_THUMB,
        0x0100 => keycodes::LEFT_SHOULDER,
        0x0200 => keycodes::RIGHT_SHOULDER,
        0x1000 => keycodes::A,
        0x2000 => keycodes::B,
        0x4000 => keycodes::X,
        0x8000 => keycodes::Y,
        0x0009 => keycodes::LEFT_TRIGGER,
        0x000A => keycodes::RIGHT_TRIGGER,
        _ => keycodes::MAX_MACROS,
    }
}

fn vr_device_action(control: &str, key_mask: u32) -> Option<NavigationAction> {
    let action = match control {
        "WandTrigger" | "SecondaryTrigger" => NavigationAction::Accept,
        "WandGrip" | "SecondaryGrip" | "Grip" => NavigationAction::TabLeft,
        _ if key_mask == VR_GRIP_KEY_MASK => NavigationAction::TabLeft,
        "Forward" => NavigationAction::Up,
        "Back" => NavigationAction::Down,
        "StrafeLeft" => NavigationAction::Left,
        "StrafeRight" => NavigationAction::Right,
        _ => return None,
    };
    Some(action)
}

fn vr_named_action(control: &str) -> Option<NavigationAction> {
    match control {
        "WandTrigger" | "SecondaryTrigger" | "Primary" => Some(NavigationAction::Accept),
        "WandGrip" | "SecondaryGrip" | "Grip" | "Secondary" => Some(NavigationAction::TabLeft),
        _ => None,
    }
}

/// Which rule produced a navigation resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    VrDevice,
    VrControlName,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonResolution {
    /// Send this keycode as a press immediately followed by a release.
    Remap(u32),
    Navigate {
        action: NavigationAction,
        phase: Phase,
        origin: EventOrigin,
    },
    Passthrough(MenuCommand),
    Ignored,
}

impl ButtonResolution {
    /// Command to forward to the menu, if any.
    pub fn command(&self) -> Option<MenuCommand> {
        match self {
            ButtonResolution::Navigate { action, phase, .. } => action.command(*phase),
            ButtonResolution::Passthrough(command) => Some(command.clone()),
            ButtonResolution::Remap(_) | ButtonResolution::Ignored => None,
        }
    }

    /// A released grip steps one menu level back.
    pub fn requests_go_back(&self) -> bool {
        matches!(
            self,
            ButtonResolution::Navigate {
                action: NavigationAction::TabLeft,
                phase: Phase::Release,
                ..
            }
        )
    }
}

/// Resolves one engine button event. `remap_mode` only matters for VR
/// releases; callers may skip the query otherwise.
pub fn resolve_button_event(event: &ButtonEvent, remap_mode: bool) -> ButtonResolution {
    let control = event.control.as_str();
    let phase = event.phase();

    if event.device.is_vr() {
        if remap_mode && phase == Some(Phase::Release) {
            if let Some(code) = remap_key_code(control, event.key_mask) {
                return ButtonResolution::Remap(code);
            }
        }
        return match (vr_device_action(control, event.key_mask), phase) {
            (Some(action), Some(phase)) => ButtonResolution::Navigate {
                action,
                phase,
                origin: EventOrigin::VrDevice,
            },
            _ => ButtonResolution::Ignored,
        };
    }

    if let Some(action) = vr_named_action(control) {
        return match phase {
            Some(phase) => ButtonResolution::Navigate {
                action,
                phase,
                origin: EventOrigin::VrControlName,
            },
            None => ButtonResolution::Ignored,
        };
    }

    if control == "Activate" || control == "Accept" {
        return match phase {
            Some(phase) => ButtonResolution::Navigate {
                action: NavigationAction::Accept,
                phase,
                origin: EventOrigin::Generic,
            },
            None => ButtonResolution::Ignored,
        };
    }

    let key_code = match event.device {
        DeviceType::MOUSE => {
            // Buttons 1 and 2 and the wheel stay with the engine.
            if !(2..=7).contains(&event.key_mask) {
                return ButtonResolution::Ignored;
            }
            keycodes::MOUSE_OFFSET + event.key_mask
        }
        DeviceType::GAMEPAD => gamepad_mask_to_keycode(event.key_mask),
        _ => event.key_mask,
    };
    match phase {
        Some(phase) => ButtonResolution::Passthrough(MenuCommand {
            action: NavigationAction::None,
            key_code,
            control: event.control.clone(),
            device: event.device,
            phase,
        }),
        None => ButtonResolution::Ignored,
    }
}
