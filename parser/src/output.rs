//! Externally visible shapes of a compiled tree: the node structure as JSON, and the minimal XML
//! instance the tree describes.

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde::{ser::SerializeStruct, Serialize, Serializer};

use super::{
    error::OutputError,
    node::{DataStructure, NodeId, NodeKind},
};

/// Serializable view of the subtree rooted at one node.
///
/// Serializes as `{"tag", "value", "options", "children"}`, recursively.
#[derive(Copy, Clone)]
pub struct NodeView<'t> {
    tree: &'t DataStructure,
    id: NodeId,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let element = self.tree.get(self.id);
        let children = Children {
            tree: self.tree,
            ids: &element.children,
        };

        let mut state = serializer.serialize_struct("DataStructureElement", 4)?;
        state.serialize_field("tag", &element.tag)?;
        state.serialize_field("value", &element.value)?;
        state.serialize_field("options", &element.options)?;
        state.serialize_field("children", &children)?;
        state.end()
    }
}

struct Children<'t> {
    tree: &'t DataStructure,
    ids: &'t [NodeId],
}

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.ids.iter().map(|id| self.tree.view(*id)))
    }
}

impl DataStructure {
    pub fn view(&self, id: NodeId) -> NodeView<'_> {
        NodeView { tree: self, id }
    }

    pub fn to_json(&self, id: NodeId) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.view(id))
    }

    /// Renders the XML instance described by the subtree of element `id`.
    ///
    /// Groups are transparent and only the selected alternatives of a choice are written.
    /// Attribute nodes become attributes of their element when they have a value. Qualified
    /// elements are written in their namespace as the default one, undeclared again below for
    /// unqualified children.
    pub fn to_xml(&self, id: NodeId) -> Result<String, OutputError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| OutputError::Write(e.to_string()))?;
        self.write_element(&mut writer, id, None)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_element(
        &self,
        writer: &mut Writer<Vec<u8>>,
        id: NodeId,
        default_namespace: Option<&str>,
    ) -> Result<(), OutputError> {
        let element = self.get(id);
        let namespace = self.namespace(id);
        let mut start = BytesStart::new(element.tag.as_str());
        if namespace != default_namespace {
            start.push_attribute(("xmlns", namespace.unwrap_or("")));
        }
        for child in &element.children {
            if self.kind(*child) != NodeKind::Attribute {
                continue;
            }
            let attribute = self.get(*child);
            if let Some(value) = &attribute.value {
                start.push_attribute((attribute.tag.as_str(), value.as_str()));
            }
        }

        let mut content = Vec::new();
        for child in &element.children {
            self.written_elements(*child, &mut content);
        }

        if element.value.is_none() && content.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| OutputError::Write(e.to_string()));
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| OutputError::Write(e.to_string()))?;
        if let Some(value) = &element.value {
            writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(|e| OutputError::Write(e.to_string()))?;
        }
        for child in content {
            self.write_element(writer, child, namespace)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(element.tag.as_str())))
            .map_err(|e| OutputError::Write(e.to_string()))
    }

    /// Collects the element nodes `id` contributes to its parent's content.
    fn written_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.kind(id) {
            NodeKind::Element => out.push(id),
            NodeKind::Attribute => {}
            NodeKind::Sequence => {
                for child in &self.get(id).children {
                    self.written_elements(*child, out);
                }
            }
            NodeKind::Choice => {
                for child in &self.get(id).children {
                    if self.get(*child).is_selected() == Some(true) {
                        self.written_elements(*child, out);
                    }
                }
            }
        }
    }
}
