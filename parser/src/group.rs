use roxmltree::Node;
use tracing::{debug, trace};

use super::{
    compiler::Compiler,
    config::DefaultChoice,
    error::{ReloadError, SchemaError},
    node::{DataStructureElement, NodeId, NodeKind, OPTION_MAX, OPTION_MIN, OPTION_SELECTED},
    occurs::{Bounds, MaxOccurs},
    particle::Particle,
    reload::{head_tags, InstanceCursor},
};

impl<'n, 'a, 'input: 'a> Compiler<'n, 'a, 'input> {
    pub(crate) fn sequence(
        &mut self,
        sequence: Node<'a, 'input>,
        bounds: Bounds,
        path: &str,
        instance: Option<&mut InstanceCursor<'_, '_>>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        self.guarded(sequence, instance.is_some(), |this| {
            let members = Particle::children_of(sequence, this.navigator)?;
            this.instantiate_group(
                Particle::Sequence(sequence, bounds),
                path,
                instance,
                |this, cursor| this.sequence_instance(&members, bounds, path, cursor),
            )
        })
    }

    pub(crate) fn choice(
        &mut self,
        choice: Node<'a, 'input>,
        bounds: Bounds,
        path: &str,
        instance: Option<&mut InstanceCursor<'_, '_>>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        self.guarded(choice, instance.is_some(), |this| {
            let alternatives = Particle::children_of(choice, this.navigator)?;
            this.instantiate_group(
                Particle::Choice(choice, bounds),
                path,
                instance,
                |this, cursor| this.choice_instance(&alternatives, bounds, path, cursor),
            )
        })
    }

    /// Repeats `build` for the occurrences of a group particle.
    ///
    /// Fresh compilation emits `max(min, 1)` instantiations. In edit mode, instantiation goes on
    /// for as long as the next instance element can start the group, and is padded up to the
    /// same count.
    fn instantiate_group(
        &mut self,
        group: Particle<'a, 'input>,
        path: &str,
        instance: Option<&mut InstanceCursor<'_, '_>>,
        mut build: impl FnMut(&mut Self, Option<&mut InstanceCursor<'_, '_>>) -> Result<NodeId, SchemaError>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        let bounds = group.bounds();
        if bounds.max == MaxOccurs::Count(0) {
            return Ok(Vec::new());
        }
        let required = bounds.min.max(1);
        let mut ids = Vec::new();

        let Some(cursor) = instance else {
            for _ in 0..required {
                ids.push(build(self, None)?);
            }
            return Ok(ids);
        };

        let heads = head_tags(&group, self.navigator)?;
        // Within an enclosing repetition, occurrences past the maximum belong to the next
        // instantiation of the enclosing group.
        let nested = cursor.in_repetition();
        loop {
            let count = ids.len() as u64;
            let starts_group = cursor
                .peek()
                .is_some_and(|next| heads.contains(next.tag_name().name()));
            if count >= required && !starts_group {
                break;
            }
            if count >= required && nested && !bounds.max.admits(count + 1) {
                break;
            }

            let start = cursor.position();
            if bounds.is_repeatable() {
                cursor.enter_repetition();
            }
            let id = build(self, Some(&mut *cursor));
            if bounds.is_repeatable() {
                cursor.leave_repetition();
            }
            let id = id?;
            ids.push(id);

            if let MaxOccurs::Count(max) = bounds.max {
                if count + 1 > max {
                    let error = ReloadError::TooManyOccurrences {
                        tag: self.tree.get(id).tag.clone(),
                        occurrence: count + 1,
                        max,
                    };
                    self.flag(id, error);
                }
            }
            if count + 1 >= required && cursor.position() == start {
                break;
            }
        }

        debug!(path, instantiations = ids.len(), "reconciled group");
        Ok(ids)
    }

    fn group_node(
        &mut self,
        kind: NodeKind,
        bounds: Bounds,
        path: &str,
        children: Vec<NodeId>,
    ) -> NodeId {
        let tag = match kind {
            NodeKind::Choice => "choice",
            _ => "sequence",
        };
        let position = self.next_position(&format!("#{tag}"));
        let full_path = format!("{path}/#{tag}[{position}]");

        let mut element = DataStructureElement::new(tag);
        element.set_option(OPTION_MIN, bounds.min);
        element.set_option(OPTION_MAX, bounds.max);
        element.children = children;
        trace!(path = full_path.as_str(), "compiled group");
        self.tree.create(kind, full_path, element)
    }

    fn sequence_instance(
        &mut self,
        members: &[Particle<'a, 'input>],
        bounds: Bounds,
        path: &str,
        mut cursor: Option<&mut InstanceCursor<'_, '_>>,
    ) -> Result<NodeId, SchemaError> {
        let mut children = Vec::new();
        for member in members {
            children.extend(self.particle(*member, path, cursor.as_deref_mut())?);
        }
        Ok(self.group_node(NodeKind::Sequence, bounds, path, children))
    }

    /// One instantiation of a choice. Every alternative is compiled; only the selected one sees
    /// the instance.
    fn choice_instance(
        &mut self,
        alternatives: &[Particle<'a, 'input>],
        bounds: Bounds,
        path: &str,
        mut cursor: Option<&mut InstanceCursor<'_, '_>>,
    ) -> Result<NodeId, SchemaError> {
        let matched = match cursor.as_deref().and_then(InstanceCursor::peek) {
            Some(next) => self.matching_alternative(alternatives, next.tag_name().name())?,
            None => None,
        };
        let selected = matched.or(match self.config.default_choice {
            DefaultChoice::First if !alternatives.is_empty() => Some(0),
            _ => None,
        });

        let mut children = Vec::new();
        for (index, alternative) in alternatives.iter().enumerate() {
            let instance = match matched {
                Some(matched) if matched == index => cursor.as_deref_mut(),
                _ => None,
            };
            // An optional alternative still needs a node to be selectable
            let ids = match *alternative {
                Particle::Element(node, bounds) => self.element(node, bounds, 1, path, instance)?,
                other => self.particle(other, path, instance)?,
            };
            for id in &ids {
                self.tree
                    .get_mut(*id)
                    .set_option(OPTION_SELECTED, selected == Some(index));
            }
            children.extend(ids);
        }
        Ok(self.group_node(NodeKind::Choice, bounds, path, children))
    }

    /// The first alternative that can start with an instance element named `tag`.
    fn matching_alternative(
        &self,
        alternatives: &[Particle<'a, 'input>],
        tag: &str,
    ) -> Result<Option<usize>, SchemaError> {
        for (index, alternative) in alternatives.iter().enumerate() {
            if head_tags(alternative, self.navigator)?.contains(tag) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}
