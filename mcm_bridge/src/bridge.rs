//! Calls into the open menu's movie.
//!
//! Every operation re-resolves the menu and its root; a closed menu or a
//! missing node ends the operation quietly with an outcome describing why.

pub mod strategies;

use std::time::{Duration, Instant};

use log::{debug, trace};
use mcm_input::{DebounceGate, DeviceType, StickDirection};
use serde::Serialize;

use self::strategies::ADJUST_STRATEGIES;
use crate::config::{HelpListLeft, InputConfig, UiPaths};
use crate::movie::{MovieRoot, ObjectHandle, UiHost, UiValue};

/// Value of the mode field while the menu is binding a hotkey.
pub const REMAP_MODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Config,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigateOutcome {
    MenuUnavailable,
    MissingNode { node: &'static str },
    NoActiveList,
    Moved { list: ListKind },
    Adjusted { strategy: &'static str, child: i32 },
    NotAdjusted,
    EnteredSubmenu,
    WentBack { result: GoBackOutcome },
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoBackOutcome {
    Debounced,
    MenuUnavailable,
    /// At the top level: a Cancel press and release was sent to close.
    ClosedFromRoot,
    /// Inside a mod's page: stepped back to the mod list.
    LeftSubmenu,
}

#[derive(Debug, Clone, Copy)]
enum ActiveList {
    Config(ObjectHandle),
    Help(ObjectHandle),
}

#[derive(Debug)]
pub struct MenuBridge {
    paths: UiPaths,
    help_list_left: HelpListLeft,
    go_back_gate: DebounceGate,
}

impl MenuBridge {
    pub fn new(paths: UiPaths, help_list_left: HelpListLeft, go_back_interval: Duration) -> Self {
        Self {
            paths,
            help_list_left,
            go_back_gate: DebounceGate::new(go_back_interval),
        }
    }

    pub fn from_config(config: &InputConfig) -> Self {
        Self::new(
            config.ui.clone(),
            config.help_list_left,
            config.go_back_interval(),
        )
    }

    pub fn paths(&self) -> &UiPaths {
        &self.paths
    }

    fn root<'h>(&self, host: &'h mut dyn UiHost) -> Option<&'h mut dyn MovieRoot> {
        if !host.is_menu_open(&self.paths.menu) {
            trace!("{} is not open", self.paths.menu);
            return None;
        }
        let root = host.movie_root(&self.paths.menu);
        if root.is_none() {
            debug!("{} has no movie root", self.paths.menu);
        }
        root
    }

    /// Sends a key event to every key entry point in order. Returns `false`
    /// if the menu was not reachable.
    pub fn dispatch_key_event(&self, host: &mut dyn UiHost, key_code: u32, is_down: bool) -> bool {
        let Some(root) = self.root(host) else {
            return false;
        };
        let args = [UiValue::Int(key_code as i32), UiValue::Bool(is_down)];
        for entry_point in &self.paths.key_event_entry_points() {
            if root.invoke_path(entry_point, &args).is_none() {
                trace!("{entry_point} rejected key {key_code}");
            }
        }
        true
    }

    pub fn dispatch_user_event(
        &self,
        host: &mut dyn UiHost,
        control: &str,
        is_down: bool,
        device: DeviceType,
    ) -> bool {
        let Some(root) = self.root(host) else {
            return false;
        };
        let args = [
            UiValue::from(control),
            UiValue::Bool(is_down),
            UiValue::Int(device.0 as i32),
        ];
        if root
            .invoke_path(&self.paths.user_event_path(), &args)
            .is_none()
        {
            debug!("user event {control} was not delivered");
        }
        true
    }

    pub fn refresh_menu(&self, host: &mut dyn UiHost) -> bool {
        let Some(root) = self.root(host) else {
            return false;
        };
        root.invoke_path(&self.paths.refresh_path(), &[])
            .is_some()
    }

    /// `true` while the menu is waiting for a key to bind.
    pub fn is_in_remap_mode(&self, host: &mut dyn UiHost) -> bool {
        let Some(root) = self.root(host) else {
            return false;
        };
        let mode = root
            .get_variable(&self.paths.mode_path())
            .and_then(|value| value.as_number())
            .map(|value| value as i32)
            .unwrap_or(0);
        mode == REMAP_MODE
    }

    /// Moves within whichever list currently has focus. The config list is
    /// active when it has a selection; otherwise the help list is.
    pub fn navigate_list(
        &mut self,
        host: &mut dyn UiHost,
        direction: StickDirection,
        now: Instant,
    ) -> NavigateOutcome {
        let Some(root) = self.root(host) else {
            return NavigateOutcome::MenuUnavailable;
        };
        let paths = &self.paths;
        let mcm_path = paths.mcm_menu_path();
        let Some(mcm_menu) = root.variable_object(&mcm_path) else {
            debug!("{mcm_path} not found");
            return NavigateOutcome::MissingNode { node: "mcm_menu" };
        };

        let config_list = root
            .member_object(mcm_menu, &paths.config_panel)
            .and_then(|panel| root.member_object(panel, &paths.config_list));
        let help_list = root
            .member_object(mcm_menu, &paths.help_panel)
            .and_then(|panel| root.member_object(panel, &paths.help_list));
        let config_index = config_list.map(|list| selected_index(root, list, paths));
        debug!(
            "navigate {} config_index={config_index:?} help_list={}",
            direction.as_str(),
            help_list.is_some()
        );

        let active = match (config_list, config_index) {
            (Some(list), Some(index)) if index >= 0 => Some(ActiveList::Config(list)),
            _ => help_list.map(ActiveList::Help),
        };

        match (direction, active) {
            (StickDirection::None, _) => NavigateOutcome::Ignored,
            (_, None) => NavigateOutcome::NoActiveList,
            (StickDirection::Left, Some(ActiveList::Config(list))) => {
                adjust_selected(root, list, Adjust::Decrease, paths)
            }
            (StickDirection::Right, Some(ActiveList::Config(list))) => {
                adjust_selected(root, list, Adjust::Increase, paths)
            }
            (StickDirection::Right, Some(ActiveList::Help(_))) => {
                match root.invoke(mcm_menu, &paths.enter_submenu, &[]) {
                    Some(_) => NavigateOutcome::EnteredSubmenu,
                    None => NavigateOutcome::MissingNode {
                        node: "enter_submenu",
                    },
                }
            }
            (StickDirection::Left, Some(ActiveList::Help(_))) => match self.help_list_left {
                HelpListLeft::Ignore => NavigateOutcome::Ignored,
                HelpListLeft::GoBack => NavigateOutcome::WentBack {
                    result: self.go_back_one_menu(host, now),
                },
            },
            (StickDirection::Up | StickDirection::Down, Some(active)) => {
                let (list, kind) = match active {
                    ActiveList::Config(list) => (list, ListKind::Config),
                    ActiveList::Help(list) => (list, ListKind::Help),
                };
                if kind == ListKind::Help {
                    // The help list draws its highlight from stage focus.
                    let stage_path = format!("{mcm_path}.{}", paths.stage);
                    match root.variable_object(&stage_path) {
                        Some(stage) => {
                            root.set_member(stage, &paths.focus, UiValue::Object(list));
                        }
                        None => debug!("{stage_path} not found"),
                    }
                }
                let method = if direction == StickDirection::Up {
                    &paths.move_up
                } else {
                    &paths.move_down
                };
                match root.invoke(list, method, &[]) {
                    Some(_) => NavigateOutcome::Moved { list: kind },
                    None => NavigateOutcome::MissingNode { node: "move_selection" },
                }
            }
        }
    }

    /// Steps back one menu level, at most once per debounce interval.
    pub fn go_back_one_menu(&mut self, host: &mut dyn UiHost, now: Instant) -> GoBackOutcome {
        if !self.go_back_gate.try_accept(now) {
            debug!("go back debounced");
            return GoBackOutcome::Debounced;
        }
        let Some(root) = self.root(host) else {
            return GoBackOutcome::MenuUnavailable;
        };
        let paths = &self.paths;
        let config_list = root.variable_object(&paths.config_list_path());
        let index = config_list
            .map(|list| selected_index(root, list, paths))
            .unwrap_or(-1);

        let Some(config_list) = config_list.filter(|_| index >= 0) else {
            let mut args = [
                UiValue::from("Cancel"),
                UiValue::Bool(true),
                UiValue::Int(DeviceType::GAMEPAD.0 as i32),
            ];
            let user_event = paths.user_event_path();
            root.invoke_path(&user_event, &args);
            args[1] = UiValue::Bool(false);
            root.invoke_path(&user_event, &args);
            debug!("go back at top level: sent cancel");
            return GoBackOutcome::ClosedFromRoot;
        };

        let leave = format!("{}.{}", paths.mcm_menu_path(), paths.leave_submenu);
        if root.invoke_path(&leave, &[]).is_none() {
            debug!("{leave} was not delivered");
        }
        root.set_member(config_list, &paths.selected_index, UiValue::Int(-1));
        root.invoke(config_list, &paths.invalidate, &[]);
        if let Some(help_list) = root.variable_object(&paths.help_list_path()) {
            root.invoke(help_list, &paths.invalidate, &[]);
        }
        debug!("go back from entry {index}");
        GoBackOutcome::LeftSubmenu
    }
}

fn selected_index(root: &dyn MovieRoot, list: ObjectHandle, paths: &UiPaths) -> i32 {
    root.get_member(list, &paths.selected_index)
        .and_then(|value| value.as_index())
        .unwrap_or(-1)
}

/// Finds the control hosted by the selected row and adjusts it. Children
/// are searched last to first.
fn adjust_selected(
    root: &mut dyn MovieRoot,
    list: ObjectHandle,
    adjust: Adjust,
    paths: &UiPaths,
) -> NavigateOutcome {
    let Some(entry) = root
        .get_member(list, &paths.selected_entry)
        .filter(UiValue::is_present)
        .and_then(|value| value.as_object())
    else {
        debug!("no selected entry");
        return NavigateOutcome::NotAdjusted;
    };
    let clip_index = root
        .get_member(entry, &paths.clip_index)
        .and_then(|value| value.as_clip_index())
        .unwrap_or(-1);
    if clip_index < 0 {
        debug!("selected entry has no clip index");
        return NavigateOutcome::NotAdjusted;
    }
    let Some(item) = root
        .invoke(list, &paths.clip_by_index, &[UiValue::Number(f64::from(clip_index))])
        .and_then(|value| value.as_object())
    else {
        debug!("no clip at index {clip_index}");
        return NavigateOutcome::NotAdjusted;
    };
    let Some(child_count) = root
        .get_member(item, &paths.num_children)
        .and_then(|value| value.as_index())
    else {
        return NavigateOutcome::NotAdjusted;
    };

    for child_index in (0..child_count).rev() {
        let Some(child) = root
            .invoke(item, &paths.child_at, &[UiValue::Number(f64::from(child_index))])
            .and_then(|value| value.as_object())
        else {
            continue;
        };
        for strategy in ADJUST_STRATEGIES {
            if strategy.apply(root, child, adjust, paths) {
                debug!("adjusted child {child_index} via {}", strategy.name());
                return NavigateOutcome::Adjusted {
                    strategy: strategy.name(),
                    child: child_index,
                };
            }
        }
    }
    debug!("no adjustable control under clip {clip_index}");
    NavigateOutcome::NotAdjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryHost, UiCall};

    const MENU: &str = r#"{
        "menu": "PauseMenu",
        "open": true,
        "root": {"members": {
            "Menu_mc": {"methods": {"ProcessKeyEvent": {"kind": "noop"}}},
            "mcm_loader": {"members": {"content": {
                "methods": {
                    "ProcessKeyEvent": {"kind": "noop"},
                    "ProcessUserEvent": {"kind": "noop"},
                    "RefreshMCM": {"kind": "noop"}
                },
                "members": {"mcmMenu": {
                    "methods": {
                        "RShoulderPressed": {"kind": "noop"},
                        "LShoulderPressed": {"kind": "noop"}
                    },
                    "members": {
                        "iMode": 0,
                        "stage": {"members": {"focus": null}},
                        "configPanel_mc": {"members": {"configList_mc": {
                            "members": {
                                "selectedIndex": SELECTED,
                                "selectedEntry": {"members": {"clipIndex": "1"}}
                            },
                            "methods": {
                                "moveSelectionUp": {"kind": "noop"},
                                "moveSelectionDown": {"kind": "noop"},
                                "InvalidateData": {"kind": "noop"},
                                "GetClipByIndex": {"kind": "select", "items": [
                                    null,
                                    {"members": {"numChildren": 2}, "methods": {"getChildAt": {"kind": "select", "items": [
                                        {"members": {"index": INDEX}},
                                        {"members": {"label": "Volume"}}
                                    ]}}}
                                ]}
                            }
                        }}},
                        "HelpPanel_mc": {"members": {"HelpList_mc": {
                            "members": {"selectedIndex": 0},
                            "methods": {
                                "moveSelectionUp": {"kind": "noop"},
                                "moveSelectionDown": {"kind": "noop"},
                                "InvalidateData": {"kind": "noop"}
                            }
                        }}}
                    }
                }}
            }}}
        }}
    }"#;

    const CONFIG_LIST: &str = "root.mcm_loader.content.mcmMenu.configPanel_mc.configList_mc";
    const HELP_LIST: &str = "root.mcm_loader.content.mcmMenu.HelpPanel_mc.HelpList_mc";

    fn host(selected: i32, index: i32) -> MemoryHost {
        let json = MENU
            .replace("SELECTED", &selected.to_string())
            .replace("INDEX", &index.to_string());
        MemoryHost::from_fixture_str(&json).expect("fixture")
    }

    fn bridge() -> MenuBridge {
        MenuBridge::from_config(&InputConfig::default())
    }

    fn ms(origin: Instant, ms: u64) -> Instant {
        origin + Duration::from_millis(ms)
    }

    fn invoked(host: &MemoryHost, target: &str, method: &str) -> usize {
        host.movie
            .calls()
            .iter()
            .filter(|call| {
                matches!(call, UiCall::Invoke { target: t, method: m, .. } if t == target && m == method)
            })
            .count()
    }

    #[test]
    fn key_event_attempts_every_entry_point() {
        let mut host = host(-1, 0);
        assert!(bridge().dispatch_key_event(&mut host, 276, true));
        let targets: Vec<_> = host
            .movie
            .calls()
            .iter()
            .filter_map(|call| match call {
                UiCall::Invoke {
                    target,
                    method,
                    delivered,
                    ..
                } => Some((format!("{target}.{method}"), *delivered)),
                _ => None,
            })
            .collect();
        assert_eq!(
            targets,
            vec![
                ("root.mcm_loader.content.ProcessKeyEvent".to_string(), true),
                ("root.Menu_mc.ProcessKeyEvent".to_string(), true),
                ("root.ProcessKeyEvent".to_string(), false),
            ]
        );
    }

    #[test]
    fn closed_menu_is_a_no_op() {
        let mut host = host(-1, 0);
        host.set_open(false);
        let mut bridge = bridge();
        assert!(!bridge.dispatch_user_event(&mut host, "Accept", true, DeviceType::GAMEPAD));
        assert_eq!(
            bridge.navigate_list(&mut host, StickDirection::Up, Instant::now()),
            NavigateOutcome::MenuUnavailable
        );
        assert!(host.movie.calls().is_empty());
    }

    #[test]
    fn right_on_slider_calls_increment_only() {
        let json = MENU
            .replace("SELECTED", "2")
            .replace(
                r#"{"members": {"label": "Volume"}}"#,
                r#"{"methods": {"Increment": {"kind": "noop"}, "Decrement": {"kind": "noop"}}}"#,
            )
            .replace("INDEX", "0");
        let mut host = MemoryHost::from_fixture_str(&json).expect("fixture");
        let outcome = bridge().navigate_list(&mut host, StickDirection::Right, Instant::now());
        assert_eq!(
            outcome,
            NavigateOutcome::Adjusted {
                strategy: "step_method",
                child: 1
            }
        );
        assert_eq!(host.value_at(&format!("{CONFIG_LIST}.selectedIndex")), Some(UiValue::Int(2)));
    }

    #[test]
    fn stepper_index_moves_without_upper_clamp() {
        let mut host = host(1, 5);
        let mut bridge = bridge();
        let item = "root.mcm_loader.content.mcmMenu.configPanel_mc.configList_mc.GetClipByIndex[1]";
        let stepper = format!("{item}.getChildAt[0]");

        let outcome = bridge.navigate_list(&mut host, StickDirection::Right, Instant::now());
        assert_eq!(
            outcome,
            NavigateOutcome::Adjusted {
                strategy: "index_field",
                child: 0
            }
        );
        assert_eq!(
            host.value_at(&format!("{stepper}.index")),
            Some(UiValue::Number(6.0))
        );
    }

    #[test]
    fn stepper_index_stops_at_zero() {
        let mut host = host(1, 0);
        let outcome = bridge().navigate_list(&mut host, StickDirection::Left, Instant::now());
        assert_eq!(outcome, NavigateOutcome::NotAdjusted);
    }

    #[test]
    fn help_list_right_enters_submenu() {
        let mut host = host(-1, 0);
        let outcome = bridge().navigate_list(&mut host, StickDirection::Right, Instant::now());
        assert_eq!(outcome, NavigateOutcome::EnteredSubmenu);
        assert_eq!(
            invoked(&host, "root.mcm_loader.content.mcmMenu", "RShoulderPressed"),
            1
        );
    }

    #[test]
    fn help_list_left_follows_policy() {
        let mut first = host(-1, 0);
        let mut go_back = bridge();
        assert_eq!(
            go_back.navigate_list(&mut first, StickDirection::Left, Instant::now()),
            NavigateOutcome::WentBack {
                result: GoBackOutcome::ClosedFromRoot
            }
        );

        let mut host = host(-1, 0);
        let mut ignore = MenuBridge::new(
            UiPaths::default(),
            HelpListLeft::Ignore,
            Duration::from_millis(200),
        );
        assert_eq!(
            ignore.navigate_list(&mut host, StickDirection::Left, Instant::now()),
            NavigateOutcome::Ignored
        );
        assert!(host.movie.calls().is_empty());
    }

    #[test]
    fn help_list_vertical_sets_stage_focus_first() {
        let mut host = host(-1, 0);
        let outcome = bridge().navigate_list(&mut host, StickDirection::Down, Instant::now());
        assert_eq!(outcome, NavigateOutcome::Moved { list: ListKind::Help });
        let calls = host.movie.calls();
        assert!(matches!(
            &calls[0],
            UiCall::SetMember { target, member, .. }
                if target == "root.mcm_loader.content.mcmMenu.stage" && member == "focus"
        ));
        assert_eq!(invoked(&host, HELP_LIST, "moveSelectionDown"), 1);
    }

    #[test]
    fn config_list_vertical_moves_config_selection() {
        let mut host = host(3, 0);
        let outcome = bridge().navigate_list(&mut host, StickDirection::Up, Instant::now());
        assert_eq!(outcome, NavigateOutcome::Moved { list: ListKind::Config });
        assert_eq!(invoked(&host, CONFIG_LIST, "moveSelectionUp"), 1);
        assert_eq!(invoked(&host, HELP_LIST, "moveSelectionUp"), 0);
    }

    #[test]
    fn go_back_from_root_sends_cancel_pair() {
        let mut host = host(-1, 0);
        let outcome = bridge().go_back_one_menu(&mut host, Instant::now());
        assert_eq!(outcome, GoBackOutcome::ClosedFromRoot);
        assert_eq!(
            invoked(&host, "root.mcm_loader.content", "ProcessUserEvent"),
            2
        );
        assert_eq!(
            invoked(&host, "root.mcm_loader.content.mcmMenu", "LShoulderPressed"),
            0
        );
    }

    #[test]
    fn go_back_from_submenu_resets_selection() {
        let mut host = host(4, 0);
        let outcome = bridge().go_back_one_menu(&mut host, Instant::now());
        assert_eq!(outcome, GoBackOutcome::LeftSubmenu);
        assert_eq!(
            invoked(&host, "root.mcm_loader.content.mcmMenu", "LShoulderPressed"),
            1
        );
        assert_eq!(
            host.value_at(&format!("{CONFIG_LIST}.selectedIndex")),
            Some(UiValue::Int(-1))
        );
        assert_eq!(invoked(&host, CONFIG_LIST, "InvalidateData"), 1);
        assert_eq!(invoked(&host, HELP_LIST, "InvalidateData"), 1);
        assert_eq!(
            invoked(&host, "root.mcm_loader.content", "ProcessUserEvent"),
            0
        );
    }

    #[test]
    fn go_back_is_debounced() {
        let origin = Instant::now();
        let mut host = host(-1, 0);
        let mut bridge = bridge();
        assert_eq!(
            bridge.go_back_one_menu(&mut host, ms(origin, 0)),
            GoBackOutcome::ClosedFromRoot
        );
        assert_eq!(
            bridge.go_back_one_menu(&mut host, ms(origin, 150)),
            GoBackOutcome::Debounced
        );
        assert_eq!(
            bridge.go_back_one_menu(&mut host, ms(origin, 200)),
            GoBackOutcome::ClosedFromRoot
        );
    }

    #[test]
    fn remap_mode_reads_mode_field() {
        let mut host = host(-1, 0);
        let bridge = bridge();
        assert!(!bridge.is_in_remap_mode(&mut host));
        host.movie
            .set_variable("root.mcm_loader.content.mcmMenu.iMode", UiValue::Int(1));
        assert!(bridge.is_in_remap_mode(&mut host));
    }

    #[test]
    fn refresh_invokes_content_entry_point() {
        let mut host = host(-1, 0);
        assert!(bridge().refresh_menu(&mut host));
        assert_eq!(invoked(&host, "root.mcm_loader.content", "RefreshMCM"), 1);
    }
}
