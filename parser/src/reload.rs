//! Edit mode: reconciling a compilation with an existing XML instance.
//!
//! The instance is never traversed on its own. Each complex element opens an [`InstanceCursor`]
//! over the element children of its occurrence, and the particles of its content model consume
//! that cursor in schema order while they are compiled.

use std::collections::BTreeSet;

use roxmltree::{Node, NodeId};

use super::{
    error::{ReloadError, SchemaError},
    navigator::SchemaNavigator,
    occurs::MaxOccurs,
    particle::{describe_definition, Particle},
    values::required_attribute,
};

/// Position within the element children of one instance element.
#[derive(Debug)]
pub struct InstanceCursor<'d, 'di> {
    parent: Node<'d, 'di>,
    children: Vec<Node<'d, 'di>>,
    position: usize,
    /// Number of repeatable groups currently being instantiated over this cursor
    repetitions: u32,
}

impl<'d, 'di: 'd> InstanceCursor<'d, 'di> {
    pub fn new(parent: Node<'d, 'di>) -> Self {
        Self {
            parent,
            children: parent.children().filter(|c| c.is_element()).collect(),
            position: 0,
            repetitions: 0,
        }
    }

    /// The instance element whose children are traversed; attribute values are read from it.
    pub fn parent(&self) -> Node<'d, 'di> {
        self.parent
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn peek(&self) -> Option<Node<'d, 'di>> {
        self.children.get(self.position).copied()
    }

    /// The children that have not been consumed yet.
    pub fn remaining(&self) -> &[Node<'d, 'di>] {
        &self.children[self.position..]
    }

    /// Consumes consecutive children named `name`, at most as many as `limit` admits.
    pub fn take_named(&mut self, name: &str, limit: MaxOccurs) -> Vec<Node<'d, 'di>> {
        let mut taken = Vec::new();
        while let Some(next) = self.peek() {
            if next.tag_name().name() != name || !limit.admits(taken.len() as u64 + 1) {
                break;
            }
            taken.push(next);
            self.position += 1;
        }
        taken
    }

    /// While inside a repeatable group, surplus occurrences are left for the next instantiation
    /// of the group instead of being attached to the current one.
    pub(crate) fn in_repetition(&self) -> bool {
        self.repetitions > 0
    }

    pub(crate) fn enter_repetition(&mut self) {
        self.repetitions += 1;
    }

    pub(crate) fn leave_repetition(&mut self) {
        self.repetitions = self.repetitions.saturating_sub(1);
    }
}

/// The text of a simple-typed occurrence. Whitespace-only text counts as no value.
pub fn leaf_text(occurrence: Node) -> Result<Option<String>, ReloadError> {
    if occurrence.children().any(|c| c.is_element()) {
        return Err(ReloadError::UnexpectedContent {
            tag: occurrence.tag_name().name().to_string(),
        });
    }
    let text: String = occurrence
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    Ok((!text.trim().is_empty()).then_some(text))
}

/// Tags of the instance elements that one instantiation of `particle` can consume directly,
/// i.e. without descending into element content.
pub fn head_tags<'a, 'input: 'a>(
    particle: &Particle<'a, 'input>,
    navigator: &SchemaNavigator<'a, 'input>,
) -> Result<BTreeSet<String>, SchemaError> {
    let mut tags = BTreeSet::new();
    collect_head_tags(particle, navigator, &mut Vec::new(), &mut tags)?;
    Ok(tags)
}

fn collect_head_tags<'a, 'input: 'a>(
    particle: &Particle<'a, 'input>,
    navigator: &SchemaNavigator<'a, 'input>,
    visiting: &mut Vec<NodeId>,
    tags: &mut BTreeSet<String>,
) -> Result<(), SchemaError> {
    match particle {
        Particle::Element(node, _) => {
            let declaration = navigator.dereference(*node, SchemaNavigator::element)?;
            tags.insert(required_attribute(declaration, "name")?.to_string());
        }
        Particle::Choice(node, _) | Particle::Sequence(node, _) => {
            if visiting.contains(&node.id()) {
                return Err(SchemaError::RecursiveDefinition {
                    name: describe_definition(*node),
                });
            }
            visiting.push(node.id());
            for member in Particle::children_of(*node, navigator)? {
                collect_head_tags(&member, navigator, visiting, tags)?;
            }
            visiting.pop();
        }
        Particle::Attribute(_) => {}
    }
    Ok(())
}
