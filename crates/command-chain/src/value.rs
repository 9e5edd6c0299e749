use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::command::WrappedCommand;

/// Object a chained command can be applied to.
///
/// The set of data properties and commands an object exposes is owned by
/// the command catalog that produced it, not by the chaining engine.
pub trait ChainTarget: Send + Sync + fmt::Debug {
    /// Catalog name of the object type, e.g. `"element"`.
    fn kind(&self) -> &str;

    fn property(&self, name: &str) -> Option<Value>;

    fn command(&self, name: &str) -> Option<WrappedCommand>;

    fn to_json(&self) -> Value;
}

/// Settled value of a wrapped command.
#[derive(Clone, Debug)]
pub enum Resolved {
    Scalar(Value),
    Single(Arc<dyn ChainTarget>),
    Sequence(Vec<Resolved>),
}

impl Resolved {
    pub fn null() -> Self {
        Resolved::Scalar(Value::Null)
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        Resolved::Scalar(value.into())
    }

    pub fn object(target: impl ChainTarget + 'static) -> Self {
        Resolved::Single(Arc::new(target))
    }

    pub fn sequence(items: impl IntoIterator<Item = Resolved>) -> Self {
        Resolved::Sequence(items.into_iter().collect())
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Resolved::Scalar(_) => "scalar",
            Resolved::Single(_) => "object",
            Resolved::Sequence(_) => "sequence",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Resolved::Scalar(value) => value.clone(),
            Resolved::Single(target) => target.to_json(),
            Resolved::Sequence(items) => Value::Array(items.iter().map(Resolved::to_json).collect()),
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Scalar(value)
    }
}

/// Commands available on one object type, keyed by name.
#[derive(Clone, Default)]
pub struct CommandCatalog {
    commands: HashMap<String, WrappedCommand>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, command: WrappedCommand) -> Self {
        self.insert(command);
        self
    }

    pub fn insert(&mut self, command: WrappedCommand) -> Option<WrappedCommand> {
        self.commands.insert(command.name().to_string(), command)
    }

    pub fn get(&self, name: &str) -> Option<WrappedCommand> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for CommandCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCatalog")
            .field("commands", &self.names())
            .finish()
    }
}

/// Remote object described by a set of data properties and a shared catalog.
#[derive(Clone)]
pub struct RemoteObject {
    kind: String,
    properties: BTreeMap<String, Value>,
    catalog: Arc<CommandCatalog>,
}

impl RemoteObject {
    pub fn new(kind: impl Into<String>, catalog: Arc<CommandCatalog>) -> Self {
        Self {
            kind: kind.into(),
            properties: BTreeMap::new(),
            catalog,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn catalog(&self) -> &Arc<CommandCatalog> {
        &self.catalog
    }
}

impl ChainTarget for RemoteObject {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }

    fn command(&self, name: &str) -> Option<WrappedCommand> {
        self.catalog.get(name)
    }

    fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Value::Object(map)
    }
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .finish()
    }
}
