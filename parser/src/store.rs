//! Persistence of compiled trees.
//!
//! Stored elements reference their children by id, so a subtree can be loaded and updated one
//! element at a time. Compiler-side properties (node kind, full path) are not persisted.

use std::collections::BTreeMap;
use std::fmt;


use super::{
    error::ModelError,
    node::{DataStructure, NodeId, Options},
};

/// Identifier assigned by a [`DataStructureStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredElement {
    pub tag: String,
    pub value: Option<String>,
    pub options: Options,
    pub children: Vec<StoreId>,
}

pub trait DataStructureStore {
    /// Stores a new element and returns its id.
    fn save(&mut self, element: StoredElement) -> Result<StoreId, ModelError>;

    fn update(&mut self, id: StoreId, element: StoredElement) -> Result<(), ModelError>;

    fn load(&self, id: StoreId) -> Result<StoredElement, ModelError>;

    /// Ids of the elements listing `child` among their children.
    fn find_parents_containing(&self, child: StoreId) -> Result<Vec<StoreId>, ModelError>;

    fn all(&self) -> Result<Vec<(StoreId, StoredElement)>, ModelError>;
}

/// Saves the subtree rooted at `root`, children before their parents, and returns the id of the
/// stored root.
pub fn persist(
    tree: &DataStructure,
    root: NodeId,
    store: &mut impl DataStructureStore,
) -> Result<StoreId, ModelError> {
    let element = tree.get(root);
    let children = element
        .children
        .iter()
        .map(|child| persist(tree, *child, store))
        .collect::<Result<Vec<_>, _>>()?;

    store.save(StoredElement {
        tag: element.tag.clone(),
        value: element.value.clone(),
        options: element.options.clone(),
        children,
    })
}

/// In-process store. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryStore {
    elements: BTreeMap<StoreId, StoredElement>,
    last_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl DataStructureStore for MemoryStore {
    fn save(&mut self, element: StoredElement) -> Result<StoreId, ModelError> {
        self.last_id += 1;
        let id = StoreId(self.last_id);
        self.elements.insert(id, element);
        Ok(id)
    }

    fn update(&mut self, id: StoreId, element: StoredElement) -> Result<(), ModelError> {
        match self.elements.get_mut(&id) {
            Some(stored) => {
                *stored = element;
                Ok(())
            }
            None => Err(ModelError::DoesNotExist(id)),
        }
    }

    fn load(&self, id: StoreId) -> Result<StoredElement, ModelError> {
        self.elements
            .get(&id)
            .cloned()
            .ok_or(ModelError::DoesNotExist(id))
    }

    fn find_parents_containing(&self, child: StoreId) -> Result<Vec<StoreId>, ModelError> {
        Ok(self
            .elements
            .iter()
            .filter(|(_, element)| element.children.contains(&child))
            .map(|(id, _)| *id)
            .collect())
    }

    fn all(&self) -> Result<Vec<(StoreId, StoredElement)>, ModelError> {
        Ok(self
            .elements
            .iter()
            .map(|(id, element)| (*id, element.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::Compiler, config::CompilerConfig, navigator::SchemaNavigator};
    use roxmltree::Document;

    #[test]
    fn persists_children_before_parents() {
        let doc = Document::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="root">
                    <xs:complexType>
                        <xs:sequence><xs:element name="a"/><xs:element name="b"/></xs:sequence>
                    </xs:complexType>
                </xs:element>
            </xs:schema>"#,
        )
        .unwrap();
        let navigator = SchemaNavigator::new(&doc).unwrap();
        let mut compiler = Compiler::new(&navigator, CompilerConfig::default());
        let root = compiler.compile_root(None).unwrap();

        let mut store = MemoryStore::new();
        let stored_root = persist(compiler.tree(), root, &mut store).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(stored_root, StoreId(4));

        let sequence = store.load(stored_root).unwrap().children[0];
        assert_eq!(sequence, StoreId(3));
        let sequence = store.load(sequence).unwrap();
        assert_eq!(sequence.tag, "sequence");
        assert_eq!(sequence.children, vec![StoreId(1), StoreId(2)]);
        assert_eq!(
            store.find_parents_containing(StoreId(2)).unwrap(),
            vec![StoreId(3)]
        );
    }

    #[test]
    fn unknown_ids_do_not_exist() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.load(StoreId(7)),
            Err(ModelError::DoesNotExist(StoreId(7)))
        ));
        let element = StoredElement {
            tag: "a".into(),
            value: None,
            options: Options::new(),
            children: Vec::new(),
        };
        assert!(store.update(StoreId(1), element.clone()).is_err());
        let id = store.save(element).unwrap();
        assert_eq!(id, StoreId(1));
        assert_eq!(store.all().unwrap().len(), 1);
    }
}
