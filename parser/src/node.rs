use std::collections::BTreeMap;
use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};

use serde::Serialize;

use super::occurs::MaxOccurs;

/// A reference to a [`DataStructureElement`] stored in a [`DataStructure`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    fn from_len(len: usize) -> Self {
        // We use the size for the ID, which is non-zero after the push
        let size = NonZeroUsize::new(len).expect("arena is empty after a push");
        Self(size.try_into().expect("ID did not fit into 32-bit integer"))
    }

    fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scalar stored in [`DataStructureElement::options`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<MaxOccurs> for OptionValue {
    fn from(value: MaxOccurs) -> Self {
        match value {
            MaxOccurs::Count(count) => count.into(),
            MaxOccurs::Unbounded => Self::Str(value.to_string()),
        }
    }
}

pub type Options = BTreeMap<String, OptionValue>;

// Keys of `options` written by the compiler
pub const OPTION_MIN: &str = "min";
pub const OPTION_MAX: &str = "max";
pub const OPTION_TYPE: &str = "type";
pub const OPTION_SELECTED: &str = "selected";
pub const OPTION_MODULE: &str = "module";
pub const OPTION_USE: &str = "use";
pub const OPTION_RELOAD_ERROR: &str = "reload_error";

/// One field or group of a generated form
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataStructureElement {
    pub tag: String,
    pub value: Option<String>,
    pub options: Options,
    pub children: Vec<NodeId>,
}

impl DataStructureElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn set_option(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.options.insert(key.to_string(), value.into());
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// `Some` only for nodes produced by a choice alternative.
    pub fn is_selected(&self) -> Option<bool> {
        self.option(OPTION_SELECTED).and_then(OptionValue::as_bool)
    }

    pub fn reload_error(&self) -> Option<&str> {
        self.option(OPTION_RELOAD_ERROR).and_then(OptionValue::as_str)
    }

    pub fn module(&self) -> Option<&str> {
        self.option(OPTION_MODULE).and_then(OptionValue::as_str)
    }
}

/// The schema construct a node was compiled from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Attribute,
    Sequence,
    Choice,
}

#[derive(Clone, Debug)]
struct Slot {
    element: DataStructureElement,
    kind: NodeKind,
    full_path: String,
    namespace: Option<String>,
}

/// Arena owning the nodes of one or more compiled trees.
///
/// Besides the nodes, the arena records compiler-side properties that are not part of a
/// persisted element: the kind of each node, its `full_path` (the location used to correlate it
/// with instance data and with registered modules) and the namespace of qualified elements.
#[derive(Clone, Debug, Default)]
pub struct DataStructure {
    slots: Vec<Slot>,
}

impl DataStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn create(
        &mut self,
        kind: NodeKind,
        full_path: String,
        element: DataStructureElement,
    ) -> NodeId {
        self.slots.push(Slot {
            element,
            kind,
            full_path,
            namespace: None,
        });
        NodeId::from_len(self.slots.len())
    }

    fn slot(&self, id: NodeId) -> &Slot {
        self.slots
            .get(id.index())
            .expect("Invalid node reference (out-of-bounds)")
    }

    /// Retrieves a node by reference. Panics if `id` was not created by this arena.
    pub fn get(&self, id: NodeId) -> &DataStructureElement {
        &self.slot(id).element
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut DataStructureElement {
        &mut self
            .slots
            .get_mut(id.index())
            .expect("Invalid node reference (out-of-bounds)")
            .element
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.slot(id).kind
    }

    pub fn full_path(&self, id: NodeId) -> &str {
        &self.slot(id).full_path
    }

    /// Namespace name of a qualified element, `None` for unqualified ones.
    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        self.slot(id).namespace.as_deref()
    }

    pub(crate) fn set_namespace(&mut self, id: NodeId, namespace: &str) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.namespace = Some(namespace.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The subtree rooted at `root`, in pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.get(id).children.iter().rev());
        }
        order
    }

    /// The first node below `root` (inclusive) with the given `full_path`.
    pub fn find_by_path(&self, root: NodeId, full_path: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.full_path(*id) == full_path)
    }
}
