use crate::{error::SchemaError, xstypes::QName};
use roxmltree::Node;

pub trait ActualValue<'a>: Sized {
    fn convert(src: &'a str, parent: Node) -> Result<Self, SchemaError>;
}

impl ActualValue<'_> for String {
    fn convert(src: &'_ str, _parent: Node) -> Result<Self, SchemaError> {
        Ok(src.to_string())
    }
}

impl ActualValue<'_> for QName {
    fn convert(src: &'_ str, parent: Node) -> Result<Self, SchemaError> {
        QName::parse(src.trim(), parent)
    }
}

impl ActualValue<'_> for u64 {
    fn convert(src: &str, _parent: Node) -> Result<Self, SchemaError> {
        src.trim().parse().map_err(|_| SchemaError::InvalidValue {
            value: src.to_string(),
            expected: "a non-negative integer",
        })
    }
}

pub fn actual_value<'a, T: ActualValue<'a>>(x: &'a str, parent: Node) -> Result<T, SchemaError> {
    T::convert(x, parent)
}

/// The value of a required attribute.
pub fn required_attribute<'a>(
    node: Node<'a, '_>,
    attribute: &'static str,
) -> Result<&'a str, SchemaError> {
    node.attribute(attribute)
        .ok_or_else(|| SchemaError::MissingAttribute {
            tag: node.tag_name().name().to_string(),
            attribute,
        })
}
