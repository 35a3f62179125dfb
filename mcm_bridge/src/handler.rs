//! The composition root: owns all per-session input state and turns each
//! tick's input into bridge calls.

use std::time::Instant;

use log::{debug, info, warn};
use mcm_input::openvr::ffi::OpenVrApi;
use mcm_input::{
    classify_direction_with, map_controller_buttons, resolve_button_event, ActionState,
    ButtonEvent, ButtonResolution, ControllerAxis, ControllerPair, DeviceType, EventOrigin, Hand,
    HardwarePoller, LedgerKey, MenuCommand, NavigationAction, Phase, PollReport, PollerError,
    RepeatTiming, Stick, StickDirection, SystemProvider, ThumbstickEvent, ThumbstickHold,
    TickLedger,
};
use mcm_trace::{ControllerFrame, TraceEvent, TraceSink};

use crate::bridge::{GoBackOutcome, MenuBridge, NavigateOutcome};
use crate::config::{InputConfig, InputSource, StickNavigation};
use crate::listeners::{register_listener, InputListeners, ListenerId};
use crate::movie::UiHost;

pub const DEFAULT_LISTENER_ID: ListenerId = ListenerId(0x4d43_4d00);

#[derive(Debug, Clone, PartialEq)]
enum HardwareState {
    Untried,
    Ready(&'static str),
    /// Never retried for the rest of the session.
    Unavailable(PollerError),
}

pub struct MenuInputHandler {
    config: InputConfig,
    timing: RepeatTiming,
    bridge: MenuBridge,
    poller: HardwarePoller,
    hardware: HardwareState,
    left_stick: ThumbstickHold,
    right_stick: ThumbstickHold,
    ledger: TickLedger,
    state: ActionState,
    enabled: bool,
    listener: ListenerId,
    sink: Option<Box<dyn TraceSink>>,
}

impl std::fmt::Debug for MenuInputHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuInputHandler")
            .field("source", &self.config.source)
            .field("hardware", &self.hardware)
            .field("enabled", &self.enabled)
            .field("state", &self.state)
            .finish()
    }
}

impl MenuInputHandler {
    pub fn new(config: InputConfig) -> Self {
        Self {
            timing: config.repeat_timing(),
            bridge: MenuBridge::from_config(&config),
            config,
            poller: HardwarePoller::new(),
            hardware: HardwareState::Untried,
            left_stick: ThumbstickHold::default(),
            right_stick: ThumbstickHold::default(),
            ledger: TickLedger::default(),
            state: ActionState::default(),
            enabled: false,
            listener: DEFAULT_LISTENER_ID,
            sink: None,
        }
    }

    pub fn with_listener_id(mut self, listener: ListenerId) -> Self {
        self.listener = listener;
        self
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = Some(sink);
    }

    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.sink.take()
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    pub fn bridge(&self) -> &MenuBridge {
        &self.bridge
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Binds the hardware poller to the OpenVR runtime already loaded in
    /// this process.
    pub fn attach_runtime(&mut self) -> Result<&'static str, PollerError> {
        self.attach_with(|poller| poller.initialize(&OpenVrApi::load()?))
    }

    /// Binds the hardware poller. Only the first call does any work; an
    /// unavailable runtime is reported once and then remembered.
    pub fn attach_hardware<P>(&mut self, provider: &P) -> Result<&'static str, PollerError>
    where
        P: SystemProvider + ?Sized,
    {
        self.attach_with(|poller| poller.initialize(provider))
    }

    fn attach_with<F>(&mut self, init: F) -> Result<&'static str, PollerError>
    where
        F: FnOnce(&mut HardwarePoller) -> Result<&'static str, PollerError>,
    {
        match &self.hardware {
            HardwareState::Ready(version) => return Ok(*version),
            HardwareState::Unavailable(err) => return Err(err.clone()),
            HardwareState::Untried => {}
        }
        match init(&mut self.poller) {
            Ok(version) => {
                info!("hardware polling via {version}");
                self.hardware = HardwareState::Ready(version);
                Ok(version)
            }
            Err(err) => {
                warn!("VR hardware polling disabled for this session: {err}");
                self.hardware = HardwareState::Unavailable(err.clone());
                Err(err)
            }
        }
    }

    /// Hardware polling drives the menu only when configured and bound.
    pub fn hardware_live(&self) -> bool {
        self.config.source == InputSource::HardwarePoll
            && matches!(self.hardware, HardwareState::Ready(_))
    }

    pub fn shutdown(&mut self) {
        self.poller.shutdown();
        if matches!(self.hardware, HardwareState::Ready(_)) {
            self.hardware = HardwareState::Untried;
        }
    }

    /// Starts a new tick and, with hardware polling live, polls and
    /// dispatches. Queries reflect this tick until the next call.
    pub fn update(&mut self, host: &mut dyn UiHost, now: Instant) {
        self.ledger.clear();
        self.state.pressed.clear();
        if !self.hardware_live() || !self.poller.update() {
            return;
        }

        let report = self.poller.last_report();
        let controllers = *self.poller.controllers();
        self.record(
            now,
            &TraceEvent::Controller(ControllerFrame {
                left: report.left_fresh.then_some(controllers.left.current),
                right: report.right_fresh.then_some(controllers.right.current),
            }),
        );

        let frame = map_controller_buttons(&controllers);
        let stick = fresh_stick(&controllers, report, Hand::Right);
        self.state.held = frame.held;
        self.state.stick_x = stick.x;
        self.state.stick_y = stick.y;
        if !self.enabled {
            return;
        }
        self.state.pressed = frame.pressed;
        for command in &frame.commands {
            self.emit(host, command);
        }
        // A hand without fresh data this tick reads as centred.
        for hand in Hand::BOTH {
            let axis = fresh_stick(&controllers, report, hand);
            let direction = classify_direction_with(axis.x, axis.y, self.config.stick_threshold);
            self.drive_stick(host, hand, direction, now);
        }
    }

    /// Engine button callback.
    pub fn on_button_event(
        &mut self,
        host: &mut dyn UiHost,
        event: &ButtonEvent,
        now: Instant,
    ) -> ButtonResolution {
        self.record(now, &TraceEvent::Button(event.clone()));
        if !self.enabled {
            return ButtonResolution::Ignored;
        }
        let remap_mode = event.device.is_vr() && event.is_up() && self.bridge.is_in_remap_mode(host);
        let resolution = resolve_button_event(event, remap_mode);

        if self.hardware_live() {
            if let ButtonResolution::Navigate { origin, .. } = &resolution {
                if *origin != EventOrigin::Generic {
                    debug!("{} handled by hardware polling", event.control);
                    return ButtonResolution::Ignored;
                }
            }
        }

        match &resolution {
            ButtonResolution::Remap(key_code) => {
                info!("remap: sending VR keycode {key_code} for {}", event.control);
                self.bridge.dispatch_key_event(host, *key_code, true);
                self.bridge.dispatch_key_event(host, *key_code, false);
            }
            ButtonResolution::Ignored => {}
            _ => {
                if let Some(command) = resolution.command() {
                    self.emit(host, &command);
                }
                if resolution.requests_go_back() {
                    self.go_back(host, now);
                }
            }
        }
        resolution
    }

    /// Engine thumbstick callback. Ignored while disabled or while hardware
    /// polling owns the sticks.
    pub fn on_thumbstick_event(&mut self, host: &mut dyn UiHost, event: &ThumbstickEvent, now: Instant) {
        self.record(now, &TraceEvent::Thumbstick(*event));
        if !self.enabled || self.hardware_live() {
            return;
        }
        let hand = match event.stick {
            Stick::Left => Hand::Left,
            Stick::Right => Hand::Right,
        };
        self.drive_stick(host, hand, event.direction, now);
    }

    fn drive_stick(&mut self, host: &mut dyn UiHost, hand: Hand, direction: StickDirection, now: Instant) {
        let hold = match hand {
            Hand::Left => &mut self.left_stick,
            Hand::Right => &mut self.right_stick,
        };
        let update = hold.update(direction, now, &self.timing);
        if update.is_empty() {
            return;
        }

        match self.config.stick_navigation {
            StickNavigation::List => {
                if let Some(released) = update.released {
                    if let Some(command) = released.action().command(Phase::Release) {
                        if self.ledger.claim(LedgerKey::for_command(&command)) {
                            self.bridge.dispatch_user_event(
                                host,
                                &command.control,
                                false,
                                DeviceType::GAMEPAD,
                            );
                        }
                    }
                }
                for direction in [update.pressed, update.repeated].into_iter().flatten() {
                    if hand == Hand::Left && direction.is_vertical() {
                        debug!("left stick {} ignored", direction.as_str());
                        continue;
                    }
                    self.navigate(host, direction, now);
                }
            }
            StickNavigation::SyntheticKeys => {
                let commands = [
                    update.released.map(|d| (d, Phase::Release)),
                    update.pressed.map(|d| (d, Phase::Press)),
                    update.repeated.map(|d| (d, Phase::Press)),
                ];
                for (direction, phase) in commands.into_iter().flatten() {
                    if let Some(command) = direction.action().command(phase) {
                        self.emit(host, &command);
                    }
                }
            }
        }
    }

    fn navigate(&mut self, host: &mut dyn UiHost, direction: StickDirection, now: Instant) -> Option<NavigateOutcome> {
        if !self.ledger.claim(LedgerKey::Navigate(direction)) {
            return None;
        }
        self.state.pressed.insert(direction.action());
        let outcome = self.bridge.navigate_list(host, direction, now);
        debug!("navigate {}: {outcome:?}", direction.as_str());
        Some(outcome)
    }

    /// Sends one command as a key event followed by a user event, at most
    /// once per tick.
    fn emit(&mut self, host: &mut dyn UiHost, command: &MenuCommand) -> bool {
        if !self.ledger.claim(LedgerKey::for_command(command)) {
            debug!("{} already sent this tick", command.control);
            return false;
        }
        if command.is_down() && command.action != NavigationAction::None {
            self.state.pressed.insert(command.action);
        }
        self.bridge
            .dispatch_key_event(host, command.key_code, command.is_down());
        self.bridge
            .dispatch_user_event(host, &command.control, command.is_down(), command.device);
        true
    }

    /// Requests one level back, at most once per tick.
    pub fn go_back(&mut self, host: &mut dyn UiHost, now: Instant) -> Option<GoBackOutcome> {
        if !self.ledger.claim(LedgerKey::GoBack) {
            return None;
        }
        let outcome = self.bridge.go_back_one_menu(host, now);
        debug!("go back: {outcome:?}");
        Some(outcome)
    }

    pub fn refresh_menu(&self, host: &mut dyn UiHost) -> bool {
        self.bridge.refresh_menu(host)
    }

    /// Enables or disables the handler and adds or removes its listener.
    pub fn register_for_input(&mut self, listeners: &mut dyn InputListeners, enable: bool) {
        self.enabled = enable;
        register_listener(listeners, self.listener, enable);
    }

    pub fn on_menu_open(&mut self, listeners: &mut dyn InputListeners, now: Instant) {
        self.record(now, &TraceEvent::MenuOpened);
        self.register_for_input(listeners, true);
    }

    pub fn on_menu_close(&mut self, listeners: &mut dyn InputListeners, now: Instant) {
        self.record(now, &TraceEvent::MenuClosed);
        self.register_for_input(listeners, false);
        self.left_stick.reset();
        self.right_stick.reset();
    }

    pub fn was_action_pressed(&self, action: NavigationAction) -> bool {
        self.state.pressed.contains(action)
    }

    pub fn is_action_held(&self, action: NavigationAction) -> bool {
        self.state.held.contains(action)
    }

    /// Right-hand stick position from the last poll.
    pub fn thumbstick(&self) -> (f32, f32) {
        (self.state.stick_x, self.state.stick_y)
    }

    pub fn action_state(&self) -> ActionState {
        self.state
    }

    fn record(&mut self, now: Instant, event: &TraceEvent) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(err) = sink.record(now, event) {
            warn!("input capture stopped: {err}");
            self.sink = None;
        }
    }
}

fn fresh_stick(controllers: &ControllerPair, report: PollReport, hand: Hand) -> ControllerAxis {
    if report.is_fresh(hand) {
        controllers.hand(hand).current.stick()
    } else {
        ControllerAxis::default()
    }
}
