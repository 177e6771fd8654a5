use std::collections::HashMap;

use roxmltree::{Document, Node};
use tracing::trace;

use super::{
    builtins::is_builtin_type,
    error::SchemaError,
    values::{actual_value, required_attribute},
    xstypes::QName,
};

/// What a `type` reference resolves to.
#[derive(Copy, Clone, Debug)]
pub enum TypeDefinition<'a, 'input> {
    /// One of the `xs:*` built-in types
    Builtin,
    Simple(Node<'a, 'input>),
    Complex(Node<'a, 'input>),
}

/// Index of the top-level components of a `<schema>` document, keyed by their expanded names.
///
/// The navigator is immutable once built, so any number of compilations may share it.
pub struct SchemaNavigator<'a, 'input> {
    schema: Node<'a, 'input>,
    target_namespace: Option<&'a str>,

    element_declarations: HashMap<QName, Node<'a, 'input>>,
    simple_type_definitions: HashMap<QName, Node<'a, 'input>>,
    complex_type_definitions: HashMap<QName, Node<'a, 'input>>,
    model_group_definitions: HashMap<QName, Node<'a, 'input>>,
    attribute_declarations: HashMap<QName, Node<'a, 'input>>,
    attribute_group_definitions: HashMap<QName, Node<'a, 'input>>,

    /// Top-level element declarations in document order
    global_elements: Vec<Node<'a, 'input>>,
}

impl<'a, 'input: 'a> SchemaNavigator<'a, 'input> {
    pub fn new(document: &'a Document<'input>) -> Result<Self, SchemaError> {
        Self::from_schema_node(document.root_element())
    }

    pub fn from_schema_node(schema: Node<'a, 'input>) -> Result<Self, SchemaError> {
        if schema.tag_name().name() != "schema" {
            return Err(SchemaError::NotASchema(schema.tag_name().name().to_string()));
        }

        let mut navigator = Self {
            schema,
            target_namespace: schema.attribute("targetNamespace"),
            element_declarations: HashMap::new(),
            simple_type_definitions: HashMap::new(),
            complex_type_definitions: HashMap::new(),
            model_group_definitions: HashMap::new(),
            attribute_declarations: HashMap::new(),
            attribute_group_definitions: HashMap::new(),
            global_elements: Vec::new(),
        };

        for top_level in schema.children().filter(|c| c.is_element()) {
            let table = match top_level.tag_name().name() {
                "element" => {
                    navigator.global_elements.push(top_level);
                    &mut navigator.element_declarations
                }
                "simpleType" => &mut navigator.simple_type_definitions,
                "complexType" => &mut navigator.complex_type_definitions,
                "group" => &mut navigator.model_group_definitions,
                "attribute" => &mut navigator.attribute_declarations,
                "attributeGroup" => &mut navigator.attribute_group_definitions,
                other => {
                    // annotation, import, include, notation, ...
                    trace!(tag = other, "ignoring top-level schema element");
                    continue;
                }
            };

            // {name} The ·actual value· of the name [attribute].
            // {target namespace} The ·actual value· of the targetNamespace [attribute] of the
            // parent <schema> element information item, or ·absent· if there is none.
            let name: String = actual_value(required_attribute(top_level, "name")?, top_level)?;
            table.insert(
                QName::with_optional_namespace(navigator.target_namespace, name),
                top_level,
            );
        }

        Ok(navigator)
    }

    pub fn target_namespace(&self) -> Option<&'a str> {
        self.target_namespace
    }

    /// Whether the element declared by `declaration` lives in the target namespace: global
    /// declarations always do, local ones per `form` or the schema's `elementFormDefault`.
    pub fn is_qualified(&self, declaration: Node<'a, 'input>) -> bool {
        if declaration.parent_element() == Some(self.schema) {
            return true;
        }
        declaration
            .attribute("form")
            .or_else(|| self.schema.attribute("elementFormDefault"))
            == Some("qualified")
    }

    pub fn global_elements(&self) -> &[Node<'a, 'input>] {
        &self.global_elements
    }

    /// The global element declaration named `name`, or the first one if no name is given.
    pub fn root_element(&self, name: Option<&str>) -> Result<Node<'a, 'input>, SchemaError> {
        match name {
            Some(name) => self
                .global_elements
                .iter()
                .copied()
                .find(|e| e.attribute("name") == Some(name))
                .ok_or_else(|| SchemaError::MissingRootElement(name.to_string())),
            None => self
                .global_elements
                .first()
                .copied()
                .ok_or(SchemaError::EmptySchema),
        }
    }

    fn lookup(
        table: &HashMap<QName, Node<'a, 'input>>,
        kind: &'static str,
        name: &QName,
    ) -> Result<Node<'a, 'input>, SchemaError> {
        table
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::Unresolved {
                kind,
                name: name.clone(),
            })
    }

    pub fn element(&self, name: &QName) -> Result<Node<'a, 'input>, SchemaError> {
        Self::lookup(&self.element_declarations, "element", name)
    }

    pub fn group(&self, name: &QName) -> Result<Node<'a, 'input>, SchemaError> {
        Self::lookup(&self.model_group_definitions, "group", name)
    }

    pub fn attribute(&self, name: &QName) -> Result<Node<'a, 'input>, SchemaError> {
        Self::lookup(&self.attribute_declarations, "attribute", name)
    }

    pub fn attribute_group(&self, name: &QName) -> Result<Node<'a, 'input>, SchemaError> {
        Self::lookup(&self.attribute_group_definitions, "attributeGroup", name)
    }

    pub fn resolve_type(&self, name: &QName) -> Result<TypeDefinition<'a, 'input>, SchemaError> {
        if is_builtin_type(name) {
            return Ok(TypeDefinition::Builtin);
        }
        if let Some(complex) = self.complex_type_definitions.get(name) {
            return Ok(TypeDefinition::Complex(*complex));
        }
        Self::lookup(&self.simple_type_definitions, "type", name).map(TypeDefinition::Simple)
    }

    /// Follows the `ref` attribute of `node`, if any, to the global declaration it names.
    ///
    /// `resolve` is one of the lookup methods above, e.g. [`Self::element`].
    pub fn dereference(
        &self,
        node: Node<'a, 'input>,
        resolve: impl Fn(&Self, &QName) -> Result<Node<'a, 'input>, SchemaError>,
    ) -> Result<Node<'a, 'input>, SchemaError> {
        match node.attribute("ref") {
            Some(ref_) => resolve(self, &actual_value(ref_, node)?),
            None => Ok(node),
        }
    }
}
