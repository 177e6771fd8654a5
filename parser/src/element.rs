use roxmltree::Node;
use tracing::{debug, trace};

use super::{
    compiler::Compiler,
    config::Placeholder,
    error::{ReloadError, SchemaError},
    navigator::{SchemaNavigator, TypeDefinition},
    node::{
        DataStructureElement, NodeId, NodeKind, OPTION_MAX, OPTION_MIN, OPTION_MODULE,
        OPTION_TYPE, OPTION_USE,
    },
    occurs::{Bounds, MaxOccurs},
    particle::{xs_child, Particle},
    reload::{leaf_text, InstanceCursor},
    values::{actual_value, required_attribute},
    xstypes::QName,
};

/// An element declaration, with `ref` already followed.
struct Declaration<'a, 'input> {
    name: &'a str,
    content: Content<'a, 'input>,
    /// The `type` attribute, as written in the schema
    type_name: Option<&'a str>,
    module: Option<String>,
    /// `default` or `fixed` value constraint
    default_value: Option<&'a str>,
    /// Namespace of the element in instances, `None` when unqualified
    namespace: Option<&'a str>,
}

#[derive(Copy, Clone)]
enum Content<'a, 'input> {
    Simple,
    Complex(Node<'a, 'input>),
}

#[derive(Default)]
struct ComplexContent {
    value: Option<String>,
    children: Vec<NodeId>,
    reload_error: Option<ReloadError>,
}

/// Number of copies fresh compilation emits for a particle with `bounds`.
fn fresh_count(bounds: Bounds, placeholder: Placeholder) -> u64 {
    if bounds.min == 0 && bounds.max.is_unbounded() && placeholder == Placeholder::Template {
        1
    } else {
        bounds.min
    }
}

impl<'n, 'a, 'input: 'a> Compiler<'n, 'a, 'input> {
    fn declaration(&self, particle: Node<'a, 'input>) -> Result<Declaration<'a, 'input>, SchemaError> {
        let declaration = self
            .navigator
            .dereference(particle, SchemaNavigator::element)?;
        let name = required_attribute(declaration, "name")?;

        // {type definition}
        //   The first of the following that applies:
        //   1 The type definition corresponding to the <simpleType> or <complexType> element
        //     information item in the [children], if either is present.
        //   2 The type definition ·resolved· to by the ·actual value· of the type [attribute], if
        //     it is present.
        // An element with neither is compiled as a text leaf.
        let content = if let Some(complex_type) = xs_child(declaration, "complexType") {
            Content::Complex(complex_type)
        } else if xs_child(declaration, "simpleType").is_some() {
            Content::Simple
        } else if let Some(type_) = declaration.attribute("type") {
            let type_name: QName = actual_value(type_, declaration)?;
            match self.navigator.resolve_type(&type_name)? {
                TypeDefinition::Builtin | TypeDefinition::Simple(_) => Content::Simple,
                TypeDefinition::Complex(complex_type) => Content::Complex(complex_type),
            }
        } else {
            Content::Simple
        };

        Ok(Declaration {
            name,
            content,
            type_name: declaration.attribute("type"),
            module: self.module_key(declaration),
            default_value: declaration
                .attribute("default")
                .or_else(|| declaration.attribute("fixed")),
            namespace: self
                .navigator
                .target_namespace()
                .filter(|_| self.navigator.is_qualified(declaration)),
        })
    }

    /// The module key in `<annotation><appinfo><{module_tag_name}>`, if any.
    fn module_key(&self, declaration: Node) -> Option<String> {
        declaration
            .children()
            .filter(|c| c.tag_name().name() == "annotation")
            .flat_map(|annotation| annotation.children())
            .filter(|c| c.tag_name().name() == "appinfo")
            .flat_map(|appinfo| appinfo.children())
            .find(|c| c.is_element() && c.tag_name().name() == self.config.module_tag_name)
            .map(|module| {
                module
                    .children()
                    .filter_map(|c| c.text())
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .filter(|key| !key.is_empty())
    }

    /// Compiles the occurrences of an element particle. At least `at_least` copies are emitted
    /// (never more than `max`), while the options keep the declared bounds.
    pub(crate) fn element(
        &mut self,
        particle: Node<'a, 'input>,
        bounds: Bounds,
        at_least: u64,
        path: &str,
        instance: Option<&mut InstanceCursor<'_, '_>>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        let declaration = self.declaration(particle).map_err(|e| e.at(path))?;
        let at_least = match bounds.max {
            MaxOccurs::Count(max) => at_least.min(max),
            MaxOccurs::Unbounded => at_least,
        };
        let mut ids = Vec::new();

        let Some(cursor) = instance else {
            let count = match declaration.content {
                // A template of the type being compiled would never end
                Content::Complex(complex_type)
                    if bounds.min == 0 && self.is_in_progress(complex_type) =>
                {
                    0
                }
                _ => fresh_count(bounds, self.config.placeholder).max(at_least),
            };
            for _ in 0..count {
                ids.push(self.occurrence(&declaration, bounds, path, None)?);
            }
            return Ok(ids);
        };

        // Surplus occurrences of a bounded element are kept (and flagged), unless an enclosing
        // repeatable group can take them.
        let limit = if cursor.in_repetition() {
            bounds.max
        } else {
            MaxOccurs::Unbounded
        };
        let occurrences = cursor.take_named(declaration.name, limit);
        debug!(
            path,
            tag = declaration.name,
            occurrences = occurrences.len(),
            "reconciling element"
        );

        for (index, occurrence) in occurrences.iter().enumerate() {
            let id = self.occurrence(&declaration, bounds, path, Some(*occurrence))?;
            let count = index as u64 + 1;
            if let MaxOccurs::Count(max) = bounds.max {
                if count > max {
                    let error = ReloadError::TooManyOccurrences {
                        tag: declaration.name.to_string(),
                        occurrence: count,
                        max,
                    };
                    self.flag(id, error);
                }
            }
            ids.push(id);
        }

        // Required copies the instance does not provide
        for _ in occurrences.len() as u64..bounds.min.max(at_least) {
            ids.push(self.occurrence(&declaration, bounds, path, None)?);
        }

        Ok(ids)
    }

    /// Compiles one occurrence of an element, from `occurrence` in edit mode.
    fn occurrence(
        &mut self,
        declaration: &Declaration<'a, 'input>,
        bounds: Bounds,
        path: &str,
        occurrence: Option<Node>,
    ) -> Result<NodeId, SchemaError> {
        let position = self.next_position(declaration.name);
        let full_path = format!("{path}/{}[{position}]", declaration.name);

        let mut element = DataStructureElement::new(declaration.name);
        element.set_option(OPTION_MIN, bounds.min);
        element.set_option(OPTION_MAX, bounds.max);
        if let Some(type_name) = declaration.type_name {
            element.set_option(OPTION_TYPE, type_name);
        }
        if let Some(module) = &declaration.module {
            element.set_option(OPTION_MODULE, module.as_str());
        }

        let mut reload_error = None;
        match declaration.content {
            Content::Simple => {
                element.value = match occurrence {
                    Some(occurrence) => leaf_text(occurrence).unwrap_or_else(|error| {
                        reload_error = Some(error);
                        None
                    }),
                    None => declaration.default_value.map(String::from),
                };
            }
            Content::Complex(complex_type) => {
                let content = self
                    .complex_content(complex_type, &full_path, occurrence)
                    .map_err(|e| e.at(&full_path))?;
                element.value = content.value;
                element.children = content.children;
                reload_error = content.reload_error;
            }
        }

        trace!(path = full_path.as_str(), "compiled element");
        let id = self.tree.create(NodeKind::Element, full_path, element);
        if let Some(namespace) = declaration.namespace {
            self.tree.set_namespace(id, namespace);
        }
        if let Some(error) = reload_error {
            self.flag(id, error);
        }
        Ok(id)
    }

    fn complex_content(
        &mut self,
        complex_type: Node<'a, 'input>,
        path: &str,
        occurrence: Option<Node>,
    ) -> Result<ComplexContent, SchemaError> {
        self.guarded(complex_type, occurrence.is_some(), |this| {
            this.scoped(|this| this.complex_content_items(complex_type, path, occurrence))
        })
    }

    fn complex_content_items(
        &mut self,
        complex_type: Node<'a, 'input>,
        path: &str,
        occurrence: Option<Node>,
    ) -> Result<ComplexContent, SchemaError> {
        let mut cursor = occurrence.map(InstanceCursor::new);
        let mut content = ComplexContent::default();
        let mut simple_content = false;

        for item in complex_type.children().filter(|c| c.is_element()) {
            match item.tag_name().name() {
                "sequence" | "choice" | "group" | "all" | "complexContent" => {
                    if let Some(particle) = Particle::from_xml(item, self.navigator)? {
                        let ids = self.particle(particle, path, cursor.as_mut())?;
                        content.children.extend(ids);
                    }
                }
                "attribute" | "attributeGroup" => {
                    let ids = self.attribute_item(item, path, occurrence)?;
                    content.children.extend(ids);
                }
                "simpleContent" => {
                    // The value of the element is its text; only the attributes of the
                    // derivation contribute children.
                    simple_content = true;
                    if let Some(occurrence) = occurrence {
                        match leaf_text(occurrence) {
                            Ok(value) => content.value = value,
                            Err(error) => content.reload_error = Some(error),
                        }
                    }
                    for derivation in item.children().filter(|c| c.is_element()) {
                        for child in derivation.children().filter(|c| c.is_element()) {
                            let ids = self.attribute_item(child, path, occurrence)?;
                            content.children.extend(ids);
                        }
                    }
                }
                "annotation" | "anyAttribute" => {}
                other => {
                    return Err(SchemaError::Unsupported {
                        tag: other.to_string(),
                    })
                }
            }
        }

        if let Some(cursor) = cursor.as_ref().filter(|_| !simple_content) {
            if let Some(unexpected) = cursor.remaining().first() {
                content.reload_error.get_or_insert(ReloadError::UnexpectedElement {
                    tag: cursor.parent().tag_name().name().to_string(),
                    found: unexpected.tag_name().name().to_string(),
                });
            }
        }

        Ok(content)
    }

    /// Compiles an `<attribute>` or expands an `<attributeGroup>` reference.
    fn attribute_item(
        &mut self,
        item: Node<'a, 'input>,
        path: &str,
        instance: Option<Node>,
    ) -> Result<Vec<NodeId>, SchemaError> {
        match item.tag_name().name() {
            "attribute" => Ok(self.attribute(item, path, instance)?.into_iter().collect()),
            "attributeGroup" => {
                let definition = self
                    .navigator
                    .dereference(item, SchemaNavigator::attribute_group)?;
                self.guarded(definition, false, |this| {
                    let mut ids = Vec::new();
                    for child in definition.children().filter(|c| c.is_element()) {
                        ids.extend(this.attribute_item(child, path, instance)?);
                    }
                    Ok(ids)
                })
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Compiles one attribute use. Prohibited attributes produce no node.
    pub(crate) fn attribute(
        &mut self,
        particle: Node<'a, 'input>,
        path: &str,
        instance: Option<Node>,
    ) -> Result<Option<NodeId>, SchemaError> {
        let use_ = particle.attribute("use").unwrap_or("optional");
        if use_ == "prohibited" {
            return Ok(None);
        }
        let declaration = self
            .navigator
            .dereference(particle, SchemaNavigator::attribute)?;
        let name = required_attribute(declaration, "name")?;

        let mut element = DataStructureElement::new(name);
        element.set_option(OPTION_USE, use_);
        if let Some(type_name) = declaration.attribute("type") {
            element.set_option(OPTION_TYPE, type_name);
        }
        element.value = match instance {
            Some(instance) => instance.attribute(name).map(String::from),
            None => [particle, declaration]
                .iter()
                .find_map(|n| n.attribute("default").or_else(|| n.attribute("fixed")))
                .map(String::from),
        };

        let full_path = format!("{path}/@{name}");
        Ok(Some(self.tree.create(NodeKind::Attribute, full_path, element)))
    }
}
