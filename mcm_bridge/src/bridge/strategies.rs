//! Ways to nudge a selected option control left or right.
//!
//! Option rows host different control kinds: sliders expose
//! `Increment`/`Decrement`, steppers only an `index` field. Strategies are
//! tried in order and the first that applies wins.

use log::debug;

use super::Adjust;
use crate::config::UiPaths;
use crate::movie::{MovieRoot, ObjectHandle, UiValue};

pub trait AdjustStrategy {
    fn name(&self) -> &'static str;

    /// Returns `true` if the control was adjusted.
    fn apply(
        &self,
        root: &mut dyn MovieRoot,
        control: ObjectHandle,
        adjust: Adjust,
        paths: &UiPaths,
    ) -> bool;
}

/// Calls `Increment`/`Decrement` on the control.
pub struct StepMethod;

impl AdjustStrategy for StepMethod {
    fn name(&self) -> &'static str {
        "step_method"
    }

    fn apply(
        &self,
        root: &mut dyn MovieRoot,
        control: ObjectHandle,
        adjust: Adjust,
        paths: &UiPaths,
    ) -> bool {
        let method = match adjust {
            Adjust::Increase => &paths.increment,
            Adjust::Decrease => &paths.decrement,
        };
        root.invoke(control, method, &[]).is_some()
    }
}

/// Moves the control's `index` field by one. Decreasing stops at zero;
/// increasing is not clamped because the option count is not exposed.
pub struct IndexField;

impl AdjustStrategy for IndexField {
    fn name(&self) -> &'static str {
        "index_field"
    }

    fn apply(
        &self,
        root: &mut dyn MovieRoot,
        control: ObjectHandle,
        adjust: Adjust,
        paths: &UiPaths,
    ) -> bool {
        let current = match root.get_member(control, &paths.index_field) {
            Some(UiValue::Int(value)) => value,
            Some(UiValue::Number(value)) => value as i32,
            _ => return false,
        };
        let next = match adjust {
            Adjust::Decrease if current > 0 => current - 1,
            Adjust::Decrease => return false,
            Adjust::Increase => current.saturating_add(1),
        };
        let applied = root.set_member(control, &paths.index_field, UiValue::Number(f64::from(next)));
        if applied {
            debug!("stepper index {current} -> {next}");
        }
        applied
    }
}

pub const ADJUST_STRATEGIES: &[&dyn AdjustStrategy] = &[&StepMethod, &IndexField];
