use roxmltree::Node;

use super::{
    error::SchemaError, navigator::SchemaNavigator, occurs::Bounds, values::required_attribute,
};

/// A schema declaration that contributes nodes to a compiled tree.
///
/// `<group ref>` particles are resolved on construction: the result is the `Choice` or
/// `Sequence` of the named group definition, with the bounds of the reference.
#[derive(Copy, Clone, Debug)]
pub enum Particle<'a, 'input> {
    Element(Node<'a, 'input>, Bounds),
    Choice(Node<'a, 'input>, Bounds),
    Sequence(Node<'a, 'input>, Bounds),
    Attribute(Node<'a, 'input>),
}

impl<'a, 'input: 'a> Particle<'a, 'input> {
    /// Classifies a child of a `<complexType>`, `<choice>` or `<sequence>`.
    ///
    /// Returns `None` for items that do not map to particles (annotations, text, ...).
    pub fn from_xml(
        node: Node<'a, 'input>,
        navigator: &SchemaNavigator<'a, 'input>,
    ) -> Result<Option<Self>, SchemaError> {
        if !node.is_element() {
            return Ok(None);
        }
        let particle = match node.tag_name().name() {
            "element" => Self::Element(node, Bounds::resolve(node)?),
            "choice" => Self::Choice(node, Bounds::resolve(node)?),
            "sequence" => Self::Sequence(node, Bounds::resolve(node)?),
            "attribute" => Self::Attribute(node),
            "group" => Self::map_from_group_reference(node, navigator)?,
            "all" | "any" | "complexContent" => {
                return Err(SchemaError::Unsupported {
                    tag: node.tag_name().name().to_string(),
                })
            }
            _ => return Ok(None),
        };
        Ok(Some(particle))
    }

    fn map_from_group_reference(
        group: Node<'a, 'input>,
        navigator: &SchemaNavigator<'a, 'input>,
    ) -> Result<Self, SchemaError> {
        required_attribute(group, "ref")?;
        let bounds = Bounds::resolve(group)?;
        let definition = navigator.dereference(group, SchemaNavigator::group)?;

        // {term}: The {model group} of the model group definition ·resolved· to by the ·actual
        // value· of the ref [attribute]
        let compositor = definition
            .children()
            .find(|c| c.is_element() && c.tag_name().name() != "annotation")
            .ok_or_else(|| SchemaError::Unsupported {
                tag: "group".to_string(),
            })?;
        match compositor.tag_name().name() {
            "choice" => Ok(Self::Choice(compositor, bounds)),
            "sequence" => Ok(Self::Sequence(compositor, bounds)),
            other => Err(SchemaError::Unsupported {
                tag: other.to_string(),
            }),
        }
    }

    /// The particles among the children of `group`, in document order.
    pub fn children_of(
        group: Node<'a, 'input>,
        navigator: &SchemaNavigator<'a, 'input>,
    ) -> Result<Vec<Self>, SchemaError> {
        group
            .children()
            .filter_map(|child| Self::from_xml(child, navigator).transpose())
            .collect()
    }

    pub fn node(&self) -> Node<'a, 'input> {
        match self {
            Self::Element(node, _)
            | Self::Choice(node, _)
            | Self::Sequence(node, _)
            | Self::Attribute(node) => *node,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Element(_, bounds) | Self::Choice(_, bounds) | Self::Sequence(_, bounds) => {
                *bounds
            }
            Self::Attribute(_) => Bounds::EXACTLY_ONE,
        }
    }
}

/// The first element child of `node` with the given local name.
pub(crate) fn xs_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

/// Human-readable name of a complex type or model group, for diagnostics.
pub(crate) fn describe_definition(node: Node) -> String {
    let tag = node.tag_name().name();
    if let Some(name) = node.attribute("name") {
        return format!("{tag} {name:?}");
    }
    match node.parent_element() {
        // The compositor of a named <group>
        Some(group) if group.tag_name().name() == "group" => {
            format!("group {:?}", group.attribute("name").unwrap_or_default())
        }
        // The anonymous type of an element
        Some(element) if element.tag_name().name() == "element" => format!(
            "anonymous {tag} of element {:?}",
            element.attribute("name").unwrap_or_default()
        ),
        _ => format!("anonymous {tag}"),
    }
}
