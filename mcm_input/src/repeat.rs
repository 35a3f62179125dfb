//! Auto-repeat and debounce timing for held directions and go-back requests.

use std::time::{Duration, Instant};

use crate::classify::StickDirection;

pub const DEFAULT_REPEAT_DELAY: Duration = Duration::from_millis(400);
pub const DEFAULT_REPEAT_RATE: Duration = Duration::from_millis(80);
pub const DEFAULT_GO_BACK_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatTiming {
    /// Hold time before the first repeat.
    pub initial_delay: Duration,
    /// Minimum spacing between repeats once repeating.
    pub repeat_rate: Duration,
}

impl Default for RepeatTiming {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_REPEAT_DELAY,
            repeat_rate: DEFAULT_REPEAT_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HoldPhase {
    #[default]
    Idle,
    Pressed,
    Repeating,
}

/// What a single stick sample produced. A release of the previous direction
/// is always handled before a press of the new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StickUpdate {
    pub released: Option<StickDirection>,
    pub pressed: Option<StickDirection>,
    pub repeated: Option<StickDirection>,
}

impl StickUpdate {
    pub fn is_empty(&self) -> bool {
        self.released.is_none() && self.pressed.is_none() && self.repeated.is_none()
    }
}

/// Hold state for one thumbstick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbstickHold {
    direction: StickDirection,
    phase: HoldPhase,
    started_at: Option<Instant>,
    last_repeat_at: Option<Instant>,
}

impl ThumbstickHold {
    pub fn direction(&self) -> StickDirection {
        self.direction
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(
        &mut self,
        direction: StickDirection,
        now: Instant,
        timing: &RepeatTiming,
    ) -> StickUpdate {
        let mut out = StickUpdate::default();

        if direction != self.direction {
            if self.phase != HoldPhase::Idle {
                out.released = Some(self.direction);
            }
            self.direction = direction;
            if direction.is_none() {
                self.phase = HoldPhase::Idle;
                self.started_at = None;
                self.last_repeat_at = None;
            } else {
                self.phase = HoldPhase::Pressed;
                self.started_at = Some(now);
                self.last_repeat_at = Some(now);
                out.pressed = Some(direction);
            }
            return out;
        }

        let (Some(started), Some(last)) = (self.started_at, self.last_repeat_at) else {
            return out;
        };
        let fire = match self.phase {
            HoldPhase::Idle => false,
            HoldPhase::Pressed => now.saturating_duration_since(started) >= timing.initial_delay,
            HoldPhase::Repeating => now.saturating_duration_since(last) >= timing.repeat_rate,
        };
        if fire {
            self.phase = HoldPhase::Repeating;
            self.last_repeat_at = Some(now);
            out.repeated = Some(direction);
        }
        out
    }
}

/// Drops requests that arrive sooner than `min_interval` after the last
/// accepted one. Rejected requests do not move the window.
#[derive(Debug, Clone, Copy)]
pub struct DebounceGate {
    last_accepted: Option<Instant>,
    min_interval: Duration,
}

impl DebounceGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_accepted: None,
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn try_accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEFAULT_GO_BACK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(origin: Instant, ms: u64) -> Instant {
        origin + Duration::from_millis(ms)
    }

    #[test]
    fn hold_fires_press_then_repeats_on_schedule() {
        let origin = Instant::now();
        let timing = RepeatTiming::default();
        let mut hold = ThumbstickHold::default();

        let first = hold.update(StickDirection::Down, at(origin, 0), &timing);
        assert_eq!(first.pressed, Some(StickDirection::Down));
        assert_eq!(first.released, None);

        let mut repeats = Vec::new();
        for ms in (16..=1000).step_by(16) {
            let update = hold.update(StickDirection::Down, at(origin, ms), &timing);
            assert!(update.pressed.is_none());
            if update.repeated.is_some() {
                repeats.push(ms);
            }
        }
        assert!(repeats[0] >= 400, "first repeat at {}", repeats[0]);
        for pair in repeats.windows(2) {
            assert!(pair[1] - pair[0] >= 80, "repeats {pair:?}");
        }
        assert_eq!(hold.phase(), HoldPhase::Repeating);
    }

    #[test]
    fn direction_change_releases_before_pressing() {
        let origin = Instant::now();
        let timing = RepeatTiming::default();
        let mut hold = ThumbstickHold::default();

        hold.update(StickDirection::Up, at(origin, 0), &timing);
        let update = hold.update(StickDirection::Right, at(origin, 20), &timing);
        assert_eq!(update.released, Some(StickDirection::Up));
        assert_eq!(update.pressed, Some(StickDirection::Right));

        // Hold timer restarted at the change.
        let early = hold.update(StickDirection::Right, at(origin, 400), &timing);
        assert!(early.repeated.is_none());
        let due = hold.update(StickDirection::Right, at(origin, 420), &timing);
        assert_eq!(due.repeated, Some(StickDirection::Right));

        let released = hold.update(StickDirection::None, at(origin, 430), &timing);
        assert_eq!(released.released, Some(StickDirection::Right));
        assert_eq!(hold.phase(), HoldPhase::Idle);
        assert!(hold
            .update(StickDirection::None, at(origin, 500), &timing)
            .is_empty());
    }

    #[test]
    fn debounce_drops_close_requests() {
        let origin = Instant::now();
        let mut gate = DebounceGate::default();
        assert!(gate.try_accept(at(origin, 1000)));
        assert!(!gate.try_accept(at(origin, 1150)));
        assert!(!gate.try_accept(at(origin, 1199)));
        assert!(gate.try_accept(at(origin, 1200)));
    }
}
