use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, warn};
use mcm_bridge::{InputConfig, InputSource, ListenerId, MemoryHost, MenuInputHandler, UiCall};
use mcm_input::{
    Clock, ControllerRole, ControllerSnapshot, ManualClock, PollerError, SystemProvider,
    TrackedDeviceIndex, VrSystem, INVALID_DEVICE_INDEX,
};
use mcm_trace::{ControllerFrame, CaptureError, TraceEntry, TraceEvent, TraceSink};
use serde::Serialize;

use crate::queue::TraceQueue;

const LEFT_DEVICE: TrackedDeviceIndex = 1;
const RIGHT_DEVICE: TrackedDeviceIndex = 2;

/// A system interface that reports the most recent recorded controller
/// frame. A hand missing from the frame has no device.
struct ReplaySystem {
    frame: Rc<RefCell<ControllerFrame>>,
}

impl VrSystem for ReplaySystem {
    fn device_index_for_role(&self, role: ControllerRole) -> TrackedDeviceIndex {
        let frame = self.frame.borrow();
        match role {
            ControllerRole::LeftHand if frame.left.is_some() => LEFT_DEVICE,
            ControllerRole::RightHand if frame.right.is_some() => RIGHT_DEVICE,
            _ => INVALID_DEVICE_INDEX,
        }
    }

    fn controller_state(&self, index: TrackedDeviceIndex, state: &mut ControllerSnapshot) -> bool {
        let frame = self.frame.borrow();
        let snapshot = match index {
            LEFT_DEVICE => frame.left,
            RIGHT_DEVICE => frame.right,
            _ => None,
        };
        match snapshot {
            Some(snapshot) => {
                *state = snapshot;
                true
            }
            None => false,
        }
    }
}

pub struct ReplayProvider {
    frame: Rc<RefCell<ControllerFrame>>,
}

impl SystemProvider for ReplayProvider {
    fn acquire(&self, _version: &'static str) -> Result<Box<dyn VrSystem>, PollerError> {
        Ok(Box::new(ReplaySystem {
            frame: Rc::clone(&self.frame),
        }))
    }
}

/// Shares one sink between the handler and whoever needs it back after the
/// session ends.
pub struct SharedSink<S>(pub Rc<RefCell<S>>);

impl<S: TraceSink> TraceSink for SharedSink<S> {
    fn record(&mut self, now: Instant, event: &TraceEvent) -> Result<(), CaptureError> {
        self.0.borrow_mut().record(now, event)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayLog {
    pub entries: usize,
    pub ticks: usize,
    pub hardware_interface: Option<&'static str>,
    pub calls: Vec<UiCall>,
}

impl ReplayLog {
    pub fn undelivered(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    UiCall::Invoke {
                        delivered: false,
                        ..
                    } | UiCall::SetMember { applied: false, .. }
                )
            })
            .count()
    }
}

/// Feeds recorded entries to a [`MenuInputHandler`] driving a
/// [`MemoryHost`]. A new tick starts on every tick or controller entry and
/// whenever the timestamp moves.
pub struct ReplaySession {
    clock: ManualClock,
    frame: Rc<RefCell<ControllerFrame>>,
    handler: MenuInputHandler,
    host: MemoryHost,
    listeners: Vec<ListenerId>,
    hardware_interface: Option<&'static str>,
    tick_ms: Option<u64>,
    ticks: usize,
}

impl ReplaySession {
    pub fn new(config: InputConfig, host: MemoryHost) -> Self {
        let frame = Rc::new(RefCell::new(ControllerFrame::default()));
        let source = config.source;
        let mut handler = MenuInputHandler::new(config);
        let mut hardware_interface = None;
        if source == InputSource::HardwarePoll {
            let provider = ReplayProvider {
                frame: Rc::clone(&frame),
            };
            match handler.attach_hardware(&provider) {
                Ok(version) => hardware_interface = Some(version),
                Err(err) => warn!("replaying without hardware polling: {err}"),
            }
        }
        Self {
            clock: ManualClock::new(),
            frame,
            handler,
            host,
            listeners: Vec::new(),
            hardware_interface,
            tick_ms: None,
            ticks: 0,
        }
    }

    /// Instant that recorded timestamps are measured from.
    pub fn origin(&self) -> Instant {
        self.clock.origin()
    }

    pub fn record_to(&mut self, sink: Box<dyn TraceSink>) {
        self.handler.set_trace_sink(sink);
    }

    fn tick(&mut self, time_ms: u64, now: Instant) {
        self.handler.update(&mut self.host, now);
        self.tick_ms = Some(time_ms);
        self.ticks += 1;
    }

    fn ensure_tick(&mut self, time_ms: u64, now: Instant) {
        if self.tick_ms != Some(time_ms) {
            self.tick(time_ms, now);
        }
    }

    pub fn apply(&mut self, entry: &TraceEntry) {
        self.clock.set_ms(entry.time_ms);
        let now = self.clock.now();
        match &entry.event {
            TraceEvent::MenuOpened => {
                self.host.set_open(true);
                self.handler.on_menu_open(&mut self.listeners, now);
            }
            TraceEvent::MenuClosed => {
                self.handler.on_menu_close(&mut self.listeners, now);
                self.host.set_open(false);
            }
            TraceEvent::Tick => self.tick(entry.time_ms, now),
            TraceEvent::Controller(frame) => {
                *self.frame.borrow_mut() = *frame;
                self.tick(entry.time_ms, now);
            }
            TraceEvent::Button(event) => {
                self.ensure_tick(entry.time_ms, now);
                let resolution = self.handler.on_button_event(&mut self.host, event, now);
                debug!("{}ms {}: {resolution:?}", entry.time_ms, event.control);
            }
            TraceEvent::Thumbstick(event) => {
                self.ensure_tick(entry.time_ms, now);
                self.handler
                    .on_thumbstick_event(&mut self.host, event, now);
            }
        }
    }

    /// Replays every queued entry and returns the resulting call log. The
    /// handler, and with it any recording sink, is dropped on return.
    pub fn run(mut self, queue: &mut TraceQueue) -> ReplayLog {
        while let Some(entry) = queue.next() {
            self.apply(&entry);
        }
        self.handler.shutdown();
        ReplayLog {
            entries: queue.replayed(),
            ticks: self.ticks,
            hardware_interface: self.hardware_interface,
            calls: self.host.movie.take_calls(),
        }
    }
}

#[cfg(test)]
mod tests {
    use mcm_input::{ButtonEvent, DeviceType, VrButton};
    use mcm_trace::TraceRecorder;

    use super::*;

    const MENU: &str = r#"{"root": {"members": {"mcm_loader": {"members": {"content": {
        "methods": {
            "ProcessKeyEvent": {"kind": "noop"},
            "ProcessUserEvent": {"kind": "noop"}
        }
    }}}}}}"#;

    fn host() -> MemoryHost {
        MemoryHost::from_fixture_str(MENU).expect("fixture")
    }

    fn key_events(log: &ReplayLog) -> Vec<(i64, bool)> {
        log.calls
            .iter()
            .filter_map(|call| match call {
                UiCall::Invoke {
                    target,
                    method,
                    args,
                    ..
                } if target == "root.mcm_loader.content" && method == "ProcessKeyEvent" => {
                    Some((args[0].as_i64()?, args[1].as_bool()?))
                }
                _ => None,
            })
            .collect()
    }

    fn at(time_ms: u64, event: TraceEvent) -> TraceEntry {
        TraceEntry { time_ms, event }
    }

    fn trigger(down: bool) -> TraceEvent {
        TraceEvent::Button(ButtonEvent {
            device: DeviceType::VR,
            control: "WandTrigger".to_string(),
            key_mask: 33,
            value: if down { 1.0 } else { 0.0 },
            timer: if down { 0.0 } else { 0.25 },
        })
    }

    #[test]
    fn controller_frames_drive_hardware_polling() {
        let config = InputConfig {
            source: InputSource::HardwarePoll,
            ..InputConfig::default()
        };
        let pressed = ControllerSnapshot::with_pressed(&[VrButton::Trigger]);
        let mut queue = TraceQueue::new(vec![
            at(0, TraceEvent::MenuOpened),
            at(16, TraceEvent::Controller(ControllerFrame { left: None, right: Some(pressed) })),
            at(32, TraceEvent::Controller(ControllerFrame { left: None, right: Some(pressed) })),
            at(48, TraceEvent::Controller(ControllerFrame {
                left: None,
                right: Some(ControllerSnapshot::default()),
            })),
            // Engine events are left to the poller while it is live.
            at(48, trigger(true)),
        ]);
        let log = ReplaySession::new(config, host()).run(&mut queue);

        assert_eq!(log.hardware_interface, Some("IVRSystem_022"));
        assert_eq!(log.entries, 5);
        assert_eq!(log.ticks, 3);
        assert_eq!(key_events(&log), vec![(276, true), (276, false)]);
    }

    #[test]
    fn events_sharing_a_timestamp_share_a_tick() {
        let mut queue = TraceQueue::new(vec![
            at(0, TraceEvent::MenuOpened),
            at(16, trigger(true)),
            at(16, TraceEvent::Button(ButtonEvent {
                device: DeviceType::GAMEPAD,
                control: "Activate".to_string(),
                key_mask: 0x1000,
                value: 1.0,
                timer: 0.0,
            })),
            at(40, trigger(false)),
        ]);
        let log = ReplaySession::new(InputConfig::default(), host()).run(&mut queue);

        assert_eq!(log.ticks, 2);
        assert_eq!(key_events(&log), vec![(276, true), (276, false)]);
        assert_eq!(log.undelivered(), 4);
    }

    #[test]
    fn recording_sink_sees_session_events() {
        let mut session = ReplaySession::new(InputConfig::default(), host());
        let recorder = Rc::new(RefCell::new(TraceRecorder::new(session.origin())));
        session.record_to(Box::new(SharedSink(Rc::clone(&recorder))));
        let entries = vec![
            at(0, TraceEvent::MenuOpened),
            at(16, trigger(true)),
            at(40, trigger(false)),
            at(60, TraceEvent::MenuClosed),
        ];
        let mut queue = TraceQueue::new(entries.clone());
        session.run(&mut queue);

        assert_eq!(recorder.borrow().entries, entries);
    }
}
