//! An in-memory menu movie built from a JSON fixture.
//!
//! Used by the replay host and the tests in place of the real UI runtime.
//! Every invocation and member write is appended to a call log so a session
//! can be compared against an expected transcript.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::movie::{MovieRoot, ObjectHandle, UiHost, UiValue};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read ui fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ui fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A literal value or a nested object in a fixture.
///
/// Whole numbers that fit an `i32` load as [`UiValue::Int`]; other numbers
/// load as [`UiValue::Number`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FixtureValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Node(Box<NodeSpec>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    #[serde(default)]
    pub members: BTreeMap<String, FixtureValue>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MethodSpec {
    /// Succeeds and returns nothing.
    Noop,
    Return { value: FixtureValue },
    /// Returns `items[args[0]]`, or undefined when out of range.
    Select { items: Vec<FixtureValue> },
    /// Adds `delta` to a numeric member.
    Step {
        member: String,
        #[serde(default = "default_step")]
        delta: f64,
    },
}

fn default_step() -> f64 {
    1.0
}

fn default_menu() -> String {
    "PauseMenu".to_string()
}

fn default_open() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuFixture {
    #[serde(default = "default_menu")]
    pub menu: String,
    #[serde(default = "default_open")]
    pub open: bool,
    pub root: NodeSpec,
}

/// One logged interaction with the movie.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum UiCall {
    Invoke {
        target: String,
        method: String,
        args: Vec<Value>,
        delivered: bool,
    },
    SetMember {
        target: String,
        member: String,
        value: Value,
        applied: bool,
    },
}

#[derive(Debug, Clone)]
enum Method {
    Noop,
    Return(UiValue),
    Select(Vec<UiValue>),
    Step { member: String, delta: f64 },
}

#[derive(Debug, Clone)]
struct Node {
    path: String,
    members: BTreeMap<String, UiValue>,
    methods: BTreeMap<String, Method>,
}

#[derive(Debug, Clone)]
pub struct MemoryMovie {
    nodes: Vec<Node>,
    calls: Vec<UiCall>,
}

const ROOT: ObjectHandle = ObjectHandle(0);

impl MemoryMovie {
    pub fn from_spec(root: &NodeSpec) -> Self {
        let mut movie = Self {
            nodes: Vec::new(),
            calls: Vec::new(),
        };
        movie.add_node("root".to_string(), root);
        movie
    }

    fn add_node(&mut self, path: String, spec: &NodeSpec) -> ObjectHandle {
        let handle = ObjectHandle(self.nodes.len() as u64);
        self.nodes.push(Node {
            path: path.clone(),
            members: BTreeMap::new(),
            methods: BTreeMap::new(),
        });
        for (name, value) in &spec.members {
            let value = self.load_value(format!("{path}.{name}"), value);
            self.nodes[handle.0 as usize].members.insert(name.clone(), value);
        }
        for (name, method) in &spec.methods {
            let method = match method {
                MethodSpec::Noop => Method::Noop,
                MethodSpec::Return { value } => {
                    Method::Return(self.load_value(format!("{path}.{name}()"), value))
                }
                MethodSpec::Select { items } => Method::Select(
                    items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| self.load_value(format!("{path}.{name}[{index}]"), item))
                        .collect(),
                ),
                MethodSpec::Step { member, delta } => Method::Step {
                    member: member.clone(),
                    delta: *delta,
                },
            };
            self.nodes[handle.0 as usize]
                .methods
                .insert(name.clone(), method);
        }
        handle
    }

    fn load_value(&mut self, path: String, value: &FixtureValue) -> UiValue {
        match value {
            FixtureValue::Null => UiValue::Null,
            FixtureValue::Bool(value) => UiValue::Bool(*value),
            FixtureValue::Number(value) => {
                if value.fract() == 0.0 && *value >= f64::from(i32::MIN) && *value <= f64::from(i32::MAX) {
                    UiValue::Int(*value as i32)
                } else {
                    UiValue::Number(*value)
                }
            }
            FixtureValue::Text(text) => UiValue::String(text.clone()),
            FixtureValue::Node(spec) => UiValue::Object(self.add_node(path, spec)),
        }
    }

    pub fn calls(&self) -> &[UiCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<UiCall> {
        std::mem::take(&mut self.calls)
    }

    fn node(&self, handle: ObjectHandle) -> Option<&Node> {
        self.nodes.get(handle.0 as usize)
    }

    fn node_by_path(&self, path: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.path == path)
    }

    fn target_name(&self, handle: ObjectHandle) -> String {
        self.node(handle)
            .map(|node| node.path.clone())
            .unwrap_or_else(|| format!("<object {}>", handle.0))
    }

    fn describe(&self, value: &UiValue) -> Value {
        match value {
            UiValue::Undefined | UiValue::Null => Value::Null,
            UiValue::Bool(value) => json!(value),
            UiValue::Int(value) => json!(value),
            UiValue::UInt(value) => json!(value),
            UiValue::Number(value) => json!(value),
            UiValue::String(value) => json!(value),
            UiValue::Object(handle) => json!({ "object": self.target_name(*handle) }),
        }
    }

    /// Writes a value at a dotted path without logging it. The parent must
    /// already exist.
    pub fn set_variable(&mut self, path: &str, value: UiValue) -> bool {
        let Some((parent, name)) = path.rsplit_once('.') else {
            return false;
        };
        let Some(handle) = self.get_variable(parent).and_then(|v| v.as_object()) else {
            return false;
        };
        match self.nodes.get_mut(handle.0 as usize) {
            Some(node) => {
                node.members.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Reads a member by the path of the node that owns it, including nodes
    /// only reachable through method results.
    pub fn value_at(&self, path: &str) -> Option<UiValue> {
        if let Some((owner, name)) = path.rsplit_once('.') {
            if let Some(node) = self.node_by_path(owner) {
                return node.members.get(name).cloned();
            }
        }
        self.get_variable(path)
    }
}

impl MovieRoot for MemoryMovie {
    fn get_variable(&self, path: &str) -> Option<UiValue> {
        let mut segments = path.split('.');
        if segments.next() != Some("root") {
            return None;
        }
        let mut current = UiValue::Object(ROOT);
        for segment in segments {
            let handle = current.as_object()?;
            current = self.node(handle)?.members.get(segment)?.clone();
        }
        Some(current)
    }

    fn invoke_path(&mut self, path: &str, args: &[UiValue]) -> Option<UiValue> {
        let (parent, method) = path.rsplit_once('.')?;
        match self.get_variable(parent).and_then(|value| value.as_object()) {
            Some(handle) => self.invoke(handle, method, args),
            None => {
                let args = args.iter().map(|arg| self.describe(arg)).collect();
                self.calls.push(UiCall::Invoke {
                    target: parent.to_string(),
                    method: method.to_string(),
                    args,
                    delivered: false,
                });
                None
            }
        }
    }

    fn get_member(&self, object: ObjectHandle, name: &str) -> Option<UiValue> {
        self.node(object)?.members.get(name).cloned()
    }

    fn set_member(&mut self, object: ObjectHandle, name: &str, value: UiValue) -> bool {
        let described = self.describe(&value);
        let target = self.target_name(object);
        let applied = match self.nodes.get_mut(object.0 as usize) {
            Some(node) => {
                node.members.insert(name.to_string(), value);
                true
            }
            None => false,
        };
        self.calls.push(UiCall::SetMember {
            target,
            member: name.to_string(),
            value: described,
            applied,
        });
        applied
    }

    fn invoke(&mut self, object: ObjectHandle, method: &str, args: &[UiValue]) -> Option<UiValue> {
        let described = args.iter().map(|arg| self.describe(arg)).collect();
        let target = self.target_name(object);
        let behaviour = self
            .node(object)
            .and_then(|node| node.methods.get(method))
            .cloned();
        let result = match behaviour {
            None => None,
            Some(Method::Noop) => Some(UiValue::Undefined),
            Some(Method::Return(value)) => Some(value),
            Some(Method::Select(items)) => Some(
                args.first()
                    .and_then(UiValue::as_index)
                    .and_then(|index| usize::try_from(index).ok())
                    .and_then(|index| items.get(index).cloned())
                    .unwrap_or(UiValue::Undefined),
            ),
            Some(Method::Step { member, delta }) => {
                if let Some(node) = self.nodes.get_mut(object.0 as usize) {
                    let current = node
                        .members
                        .get(&member)
                        .and_then(UiValue::as_number)
                        .unwrap_or(0.0);
                    node.members.insert(member, UiValue::Number(current + delta));
                }
                Some(UiValue::Undefined)
            }
        };
        self.calls.push(UiCall::Invoke {
            target,
            method: method.to_string(),
            args: described,
            delivered: result.is_some(),
        });
        result
    }
}

/// A single-menu UI host around a [`MemoryMovie`].
#[derive(Debug, Clone)]
pub struct MemoryHost {
    pub menu: String,
    open: bool,
    pub movie: MemoryMovie,
}

impl MemoryHost {
    pub fn new(menu: impl Into<String>, movie: MemoryMovie) -> Self {
        Self {
            menu: menu.into(),
            open: true,
            movie,
        }
    }

    pub fn from_fixture(fixture: &MenuFixture) -> Self {
        let mut host = Self::new(fixture.menu.clone(), MemoryMovie::from_spec(&fixture.root));
        host.open = fixture.open;
        host
    }

    pub fn from_fixture_str(json: &str) -> Result<Self, FixtureError> {
        let fixture: MenuFixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(&fixture))
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_fixture_str(&raw)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn value_at(&self, path: &str) -> Option<UiValue> {
        self.movie.value_at(path)
    }
}

impl UiHost for MemoryHost {
    fn is_menu_open(&self, menu: &str) -> bool {
        self.open && self.menu == menu
    }

    fn movie_root(&mut self, menu: &str) -> Option<&mut dyn MovieRoot> {
        if self.is_menu_open(menu) {
            Some(&mut self.movie)
        } else {
            None
        }
    }
}
