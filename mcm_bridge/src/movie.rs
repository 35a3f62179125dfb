//! The menu's remote object graph, seen through a narrow call/query surface.
//!
//! Objects are addressed by opaque handles that are only valid for the
//! duration of one bridge call; nothing holds on to them across ticks.

use std::fmt;

/// Opaque reference to an object inside the movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

/// A value crossing the bridge, mirroring the runtime's value kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UiValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Number(f64),
    String(String),
    Object(ObjectHandle),
}

impl UiValue {
    pub fn is_present(&self) -> bool {
        !matches!(self, UiValue::Undefined | UiValue::Null)
    }

    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            UiValue::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            UiValue::Int(value) => Some(f64::from(*value)),
            UiValue::UInt(value) => Some(f64::from(*value)),
            UiValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer view of a numeric value, truncating fractions.
    pub fn as_index(&self) -> Option<i32> {
        self.as_number().map(|value| value as i32)
    }

    /// Like [`as_index`](Self::as_index) but also accepts numeric strings,
    /// reading the leading integer the way `atoi` does.
    pub fn as_clip_index(&self) -> Option<i32> {
        match self {
            UiValue::String(text) => Some(leading_int(text)),
            other => other.as_index(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            UiValue::String(text) => Some(text),
            _ => None,
        }
    }
}

impl From<bool> for UiValue {
    fn from(value: bool) -> Self {
        UiValue::Bool(value)
    }
}

impl From<i32> for UiValue {
    fn from(value: i32) -> Self {
        UiValue::Int(value)
    }
}

impl From<&str> for UiValue {
    fn from(value: &str) -> Self {
        UiValue::String(value.to_string())
    }
}

impl fmt::Display for UiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiValue::Undefined => f.write_str("undefined"),
            UiValue::Null => f.write_str("null"),
            UiValue::Bool(value) => write!(f, "{value}"),
            UiValue::Int(value) => write!(f, "{value}"),
            UiValue::UInt(value) => write!(f, "{value}"),
            UiValue::Number(value) => write!(f, "{value}"),
            UiValue::String(value) => write!(f, "{value:?}"),
            UiValue::Object(handle) => write!(f, "<object {}>", handle.0),
        }
    }
}

fn leading_int(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1i64, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(byte - b'0')).min(i64::from(i32::MAX) + 1);
    }
    (sign * value).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// The movie root of an open menu. Paths are dotted from `root`.
///
/// Invocation returns `None` when the call could not be made (missing
/// target or method); a successful call with no result yields
/// `Some(UiValue::Undefined)`.
pub trait MovieRoot {
    fn get_variable(&self, path: &str) -> Option<UiValue>;

    fn invoke_path(&mut self, path: &str, args: &[UiValue]) -> Option<UiValue>;

    fn get_member(&self, object: ObjectHandle, name: &str) -> Option<UiValue>;

    fn set_member(&mut self, object: ObjectHandle, name: &str, value: UiValue) -> bool;

    fn invoke(&mut self, object: ObjectHandle, method: &str, args: &[UiValue]) -> Option<UiValue>;

    fn member_object(&self, object: ObjectHandle, name: &str) -> Option<ObjectHandle> {
        self.get_member(object, name).and_then(|value| value.as_object())
    }

    fn variable_object(&self, path: &str) -> Option<ObjectHandle> {
        self.get_variable(path).and_then(|value| value.as_object())
    }
}

/// The UI system hosting named menus.
pub trait UiHost {
    fn is_menu_open(&self, menu: &str) -> bool;

    /// Resolves the menu's movie root. Callers re-resolve on every use.
    fn movie_root(&mut self, menu: &str) -> Option<&mut dyn MovieRoot>;
}
