//! Menu action vocabulary and the hardware button mapping.
//!
//! Both input sources (the direct hardware poll and the engine's event
//! callback) end up as [`MenuCommand`]s: a keycode, a control name and a
//! device type, delivered to the UI as one key event and one user event.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::StickDirection;
use crate::engine_event::DeviceType;
use crate::snapshot::{ControllerPair, Hand, VrButton};

/// Engine `InputMap` keycodes.
pub mod keycodes {
    pub const MOUSE_OFFSET: u32 = 256;
    pub const GAMEPAD_OFFSET: u32 = 266;

    pub const DPAD_UP: u32 = GAMEPAD_OFFSET;
    pub const DPAD_DOWN: u32 = 267;
    pub const DPAD_LEFT: u32 = 268;
    pub const DPAD_RIGHT: u32 = 269;
    pub const START: u32 = 270;
    pub const BACK: u32 = 271;
    pub const LEFT_THUMB: u32 = 272;
    pub const RIGHT_THUMB: u32 = 273;
    pub const LEFT_SHOULDER: u32 = 274;
    pub const RIGHT_SHOULDER: u32 = 275;
    pub const A: u32 = 276;
    pub const B: u32 = 277;
    pub const X: u32 = 278;
    pub const Y: u32 = 279;
    pub const LEFT_TRIGGER: u32 = 280;
    pub const RIGHT_TRIGGER: u32 = 281;
    /// First code past the gamepad range; also the "unknown" sentinel.
    pub const MAX_MACROS: u32 = 282;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationAction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    Accept,
    Cancel,
    TabLeft,
    TabRight,
}

impl NavigationAction {
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Control name the menu expects in `ProcessUserEvent`.
    pub fn control_name(self) -> Option<&'static str> {
        let name = match self {
            NavigationAction::None => return None,
            NavigationAction::Up => "Up",
            NavigationAction::Down => "Down",
            NavigationAction::Left => "Left",
            NavigationAction::Right => "Right",
            NavigationAction::Accept => "Accept",
            NavigationAction::Cancel => "Cancel",
            NavigationAction::TabLeft => "LShoulder",
            NavigationAction::TabRight => "RShoulder",
        };
        Some(name)
    }

    /// Gamepad keycode the action is reported as.
    pub fn key_code(self) -> Option<u32> {
        let code = match self {
            NavigationAction::None => return None,
            NavigationAction::Up => keycodes::DPAD_UP,
            NavigationAction::Down => keycodes::DPAD_DOWN,
            NavigationAction::Left => keycodes::DPAD_LEFT,
            NavigationAction::Right => keycodes::DPAD_RIGHT,
            NavigationAction::Accept => keycodes::A,
            NavigationAction::Cancel => keycodes::B,
            NavigationAction::TabLeft => keycodes::LEFT_SHOULDER,
            NavigationAction::TabRight => keycodes::RIGHT_SHOULDER,
        };
        Some(code)
    }

    pub fn command(self, phase: Phase) -> Option<MenuCommand> {
        Some(MenuCommand {
            action: self,
            key_code: self.key_code()?,
            control: self.control_name()?.to_string(),
            device: DeviceType::GAMEPAD,
            phase,
        })
    }
}

/// Bitset of [`NavigationAction`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionFlags(pub u32);

impl ActionFlags {
    pub fn insert(&mut self, action: NavigationAction) {
        self.0 |= action.bit();
    }

    pub fn contains(self, action: NavigationAction) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Per-tick query surface. Stable until the next update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionState {
    pub pressed: ActionFlags,
    pub held: ActionFlags,
    pub stick_x: f32,
    pub stick_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Press,
    Release,
}

impl Phase {
    pub fn is_down(self) -> bool {
        self == Phase::Press
    }
}

/// One logical input forwarded to the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuCommand {
    pub action: NavigationAction,
    pub key_code: u32,
    pub control: String,
    pub device: DeviceType,
    pub phase: Phase,
}

impl MenuCommand {
    pub fn is_down(&self) -> bool {
        self.phase.is_down()
    }
}

const ACCEPT_GROUP: [(Hand, VrButton); 4] = [
    (Hand::Right, VrButton::A),
    (Hand::Right, VrButton::Trigger),
    (Hand::Left, VrButton::A),
    (Hand::Left, VrButton::Trigger),
];

const CANCEL_GROUP: [(Hand, VrButton); 4] = [
    (Hand::Right, VrButton::ApplicationMenu),
    (Hand::Left, VrButton::ApplicationMenu),
    (Hand::Right, VrButton::Grip),
    (Hand::Left, VrButton::Grip),
];

/// Commands and flags derived from one polled frame of buttons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HardwareFrame {
    pub commands: Vec<MenuCommand>,
    pub pressed: ActionFlags,
    pub held: ActionFlags,
}

/// Maps the button groups of both hands to Accept and Cancel. A group
/// presses when any member was just pressed and releases once no member
/// is held after at least one was.
pub fn map_controller_buttons(controllers: &ControllerPair) -> HardwareFrame {
    let mut frame = HardwareFrame::default();
    for (action, group) in [
        (NavigationAction::Accept, &ACCEPT_GROUP),
        (NavigationAction::Cancel, &CANCEL_GROUP),
    ] {
        let pressed = group
            .iter()
            .any(|&(hand, button)| controllers.hand(hand).just_pressed(button));
        let held_now = group
            .iter()
            .any(|&(hand, button)| controllers.hand(hand).held(button));
        let held_before = group
            .iter()
            .any(|&(hand, button)| controllers.hand(hand).was_held(button));

        if held_now {
            frame.held.insert(action);
        }
        if pressed {
            frame.pressed.insert(action);
            frame.commands.extend(action.command(Phase::Press));
        } else if held_before && !held_now {
            frame.commands.extend(action.command(Phase::Release));
        }
    }
    frame
}

/// Things that may reach the UI at most once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerKey {
    Command {
        key_code: u32,
        control: String,
        down: bool,
    },
    Navigate(StickDirection),
    GoBack,
}

impl LedgerKey {
    pub fn for_command(command: &MenuCommand) -> Self {
        LedgerKey::Command {
            key_code: command.key_code,
            control: command.control.clone(),
            down: command.is_down(),
        }
    }
}

/// Tracks which UI invocations already happened during the current tick.
#[derive(Debug, Default)]
pub struct TickLedger {
    seen: HashSet<LedgerKey>,
}

impl TickLedger {
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Returns `false` if the key was already claimed this tick.
    pub fn claim(&mut self, key: LedgerKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ControllerSnapshot;

    fn press(pair: &mut ControllerPair, hand: Hand, buttons: &[VrButton]) {
        pair.advance();
        pair.hand_mut(hand).current = ControllerSnapshot::with_pressed(buttons);
    }

    #[test]
    fn right_trigger_presses_then_releases_accept() {
        let mut pair = ControllerPair::default();

        press(&mut pair, Hand::Right, &[VrButton::Trigger]);
        let frame = map_controller_buttons(&pair);
        assert_eq!(frame.commands.len(), 1);
        let command = &frame.commands[0];
        assert_eq!(command.action, NavigationAction::Accept);
        assert_eq!(command.key_code, keycodes::A);
        assert!(command.is_down());
        assert!(frame.pressed.contains(NavigationAction::Accept));
        assert!(frame.held.contains(NavigationAction::Accept));

        press(&mut pair, Hand::Right, &[VrButton::Trigger]);
        let frame = map_controller_buttons(&pair);
        assert!(frame.commands.is_empty());
        assert!(frame.pressed.is_empty());
        assert!(frame.held.contains(NavigationAction::Accept));

        press(&mut pair, Hand::Right, &[]);
        let frame = map_controller_buttons(&pair);
        assert_eq!(frame.commands.len(), 1);
        assert_eq!(frame.commands[0].phase, Phase::Release);
        assert_eq!(frame.commands[0].key_code, keycodes::A);
    }

    #[test]
    fn group_members_collapse_into_one_press() {
        let mut pair = ControllerPair::default();
        pair.right.current = ControllerSnapshot::with_pressed(&[VrButton::A, VrButton::Trigger]);
        pair.left.current = ControllerSnapshot::with_pressed(&[VrButton::Grip]);

        let frame = map_controller_buttons(&pair);
        let actions: Vec<_> = frame.commands.iter().map(|c| c.action).collect();
        assert_eq!(actions, vec![NavigationAction::Accept, NavigationAction::Cancel]);
        assert_eq!(frame.commands[1].key_code, keycodes::B);
        assert_eq!(frame.commands[1].control, "Cancel");
    }

    #[test]
    fn release_waits_for_every_group_member() {
        let mut pair = ControllerPair::default();
        press(&mut pair, Hand::Left, &[VrButton::Grip]);
        pair.right.current = ControllerSnapshot::with_pressed(&[VrButton::ApplicationMenu]);
        map_controller_buttons(&pair);

        press(&mut pair, Hand::Left, &[]);
        let frame = map_controller_buttons(&pair);
        assert!(frame.commands.is_empty());
        assert!(frame.held.contains(NavigationAction::Cancel));

        pair.advance();
        pair.right.current = ControllerSnapshot::default();
        let frame = map_controller_buttons(&pair);
        assert_eq!(frame.commands.len(), 1);
        assert_eq!(frame.commands[0].phase, Phase::Release);
    }

    #[test]
    fn ledger_claims_once_per_tick() {
        let mut ledger = TickLedger::default();
        let command = NavigationAction::Accept
            .command(Phase::Press)
            .expect("accept has a command");
        assert!(ledger.claim(LedgerKey::for_command(&command)));
        assert!(!ledger.claim(LedgerKey::for_command(&command)));
        assert!(ledger.claim(LedgerKey::Navigate(StickDirection::Up)));
        ledger.clear();
        assert!(ledger.claim(LedgerKey::for_command(&command)));
    }

    #[test]
    fn tab_actions_use_shoulder_codes() {
        assert_eq!(NavigationAction::TabLeft.key_code(), Some(keycodes::LEFT_SHOULDER));
        assert_eq!(NavigationAction::TabRight.control_name(), Some("RShoulder"));
        assert!(NavigationAction::None.command(Phase::Press).is_none());
    }
}
