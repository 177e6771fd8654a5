use std::collections::HashMap;

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use super::{
    config::CompilerConfig,
    error::{ReloadError, SchemaError},
    navigator::SchemaNavigator,
    node::{DataStructure, NodeId, OPTION_RELOAD_ERROR},
    occurs::Bounds,
    particle::{describe_definition, Particle},
    reload::InstanceCursor,
};

/// State of one compilation: the arena being filled and the guards of the recursive descent.
///
/// Both particle compilers (see the `element` and `group` modules) are implemented on this type
/// and recurse into each other through [`Compiler::particle`]. Passing an instance cursor
/// switches any step into edit mode.
pub struct Compiler<'n, 'a, 'input> {
    pub(crate) navigator: &'n SchemaNavigator<'a, 'input>,
    pub(crate) config: CompilerConfig,
    pub(crate) tree: DataStructure,

    /// Complex types and model groups currently being compiled
    in_progress: Vec<roxmltree::NodeId>,
    /// Per-name occurrence counters of the content currently being compiled, used to build the
    /// `[n]` steps of full paths
    positions: Vec<HashMap<String, u64>>,
}

impl<'n, 'a, 'input: 'a> Compiler<'n, 'a, 'input> {
    pub fn new(navigator: &'n SchemaNavigator<'a, 'input>, config: CompilerConfig) -> Self {
        Self {
            navigator,
            config,
            tree: DataStructure::new(),
            in_progress: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn navigator(&self) -> &'n SchemaNavigator<'a, 'input> {
        self.navigator
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn tree(&self) -> &DataStructure {
        &self.tree
    }

    pub fn into_tree(self) -> DataStructure {
        self.tree
    }

    /// Compiles the global element `name` (or the first global element) into a fresh form.
    pub fn compile_root(&mut self, name: Option<&str>) -> Result<NodeId, SchemaError> {
        let element = self.navigator.root_element(name)?;
        debug!(element = element.attribute("name"), "compiling form");
        let ids = self.scoped(|this| this.element(element, Bounds::EXACTLY_ONE, 1, "", None))?;
        ids.into_iter().next().ok_or(SchemaError::EmptySchema)
    }

    /// Compiles the global element `name` (or the first global element), reconciled with the
    /// existing `instance` document.
    pub fn compile_root_with_instance(
        &mut self,
        name: Option<&str>,
        instance: &Document,
    ) -> Result<NodeId, SchemaError> {
        let element = self.navigator.root_element(name)?;
        debug!(element = element.attribute("name"), "compiling form in edit mode");
        let mut cursor = InstanceCursor::new(instance.root());
        let ids = self.scoped(|this| {
            this.element(element, Bounds::EXACTLY_ONE, 1, "", Some(&mut cursor))
        })?;
        let root = ids.into_iter().next().ok_or(SchemaError::EmptySchema)?;
        if let Some(found) = cursor.remaining().first() {
            let error = ReloadError::RootMismatch {
                expected: self.tree.get(root).tag.clone(),
                found: found.tag_name().name().to_string(),
            };
            self.flag(root, error);
        }
        Ok(root)
    }

    /// Compiles one `<element>` particle found at `path`.
    ///
    /// In edit mode, `instance` is the instance element whose children hold the occurrences.
    pub fn compile_element(
        &mut self,
        element: Node<'a, 'input>,
        path: &str,
        instance: Option<Node>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        self.compile_particle_node(element, "element", path, instance)
    }

    /// Compiles one `<sequence>` particle whose nodes belong to `path`.
    pub fn compile_sequence(
        &mut self,
        sequence: Node<'a, 'input>,
        path: &str,
        instance: Option<Node>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        self.compile_particle_node(sequence, "sequence", path, instance)
    }

    /// Compiles one `<choice>` particle whose nodes belong to `path`.
    pub fn compile_choice(
        &mut self,
        choice: Node<'a, 'input>,
        path: &str,
        instance: Option<Node>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        self.compile_particle_node(choice, "choice", path, instance)
    }

    fn compile_particle_node(
        &mut self,
        node: Node<'a, 'input>,
        expected: &'static str,
        path: &str,
        instance: Option<Node>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        if node.tag_name().name() != expected {
            return Err(SchemaError::Unsupported {
                tag: node.tag_name().name().to_string(),
            }
            .at(path));
        }
        let particle = Particle::from_xml(node, self.navigator)
            .map_err(|e| e.at(path))?
            .ok_or_else(|| SchemaError::Unsupported {
                tag: expected.to_string(),
            })?;
        let mut cursor = instance.map(InstanceCursor::new);
        self.scoped(|this| this.particle(particle, path, cursor.as_mut()))
    }

    pub(crate) fn particle(
        &mut self,
        particle: Particle<'a, 'input>,
        path: &str,
        instance: Option<&mut InstanceCursor<'_, '_>>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        match particle {
            Particle::Element(node, bounds) => self.element(node, bounds, 0, path, instance),
            Particle::Choice(node, bounds) => self.choice(node, bounds, path, instance),
            Particle::Sequence(node, bounds) => self.sequence(node, bounds, path, instance),
            Particle::Attribute(node) => {
                let parent = instance.map(|cursor| cursor.parent());
                Ok(self.attribute(node, path, parent)?.into_iter().collect())
            }
        }
    }

    /// Runs `f` with the definition `node` marked as in progress.
    ///
    /// Nesting deeper than the configured limit is a schema error. So is re-entering a definition
    /// that is already in progress, unless `editing`: instance data is finite and bounds the
    /// recursion by itself.
    pub(crate) fn guarded<T>(
        &mut self,
        node: Node<'a, 'input>,
        editing: bool,
        f: impl FnOnce(&mut Self) -> Result<T, SchemaError>,
    ) -> Result<T, SchemaError> {
        if !editing && self.in_progress.contains(&node.id()) {
            return Err(SchemaError::RecursiveDefinition {
                name: describe_definition(node),
            });
        }
        if self.in_progress.len() >= self.config.max_depth {
            return Err(SchemaError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }

        self.in_progress.push(node.id());
        let result = f(self);
        self.in_progress.pop();
        result
    }

    pub(crate) fn is_in_progress(&self, node: Node) -> bool {
        self.in_progress.contains(&node.id())
    }

    /// Runs `f` with fresh position counters, for the content of one element.
    pub(crate) fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.positions.push(HashMap::new());
        let result = f(self);
        self.positions.pop();
        result
    }

    /// The next 1-based position of `name` within the current content.
    pub(crate) fn next_position(&mut self, name: &str) -> u64 {
        match self.positions.last_mut() {
            Some(counts) => {
                let count = counts.entry(name.to_string()).or_default();
                *count += 1;
                *count
            }
            None => 1,
        }
    }

    /// Records a reload error on `id`. The first error recorded on a node wins.
    pub(crate) fn flag(&mut self, id: NodeId, error: ReloadError) {
        warn!(
            path = self.tree.full_path(id),
            %error,
            "instance does not match the schema"
        );
        let element = self.tree.get_mut(id);
        if element.reload_error().is_none() {
            element.set_option(OPTION_RELOAD_ERROR, error.to_string());
        }
    }
}
