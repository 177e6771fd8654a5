use std::fmt;

use roxmltree::Node;

use super::error::SchemaError;

/// The namespace name the `xml` prefix is bound to without a declaration.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// An expanded name, used as the key of every named schema component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace_name: Option<String>,
    pub local_name: String,
}

/// Clark notation, `{namespace}local`.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace_name {
            Some(namespace_name) => write!(f, "{{{namespace_name}}}{}", self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

impl QName {
    pub fn with_namespace(
        namespace_name: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self::with_optional_namespace(Some(namespace_name), local_name)
    }

    pub fn with_optional_namespace(
        namespace_name: Option<impl Into<String>>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace_name: namespace_name.map(Into::into),
            local_name: local_name.into(),
        }
    }

    /// Resolves a lexical `prefix:local` (or bare `local`) name against the namespace
    /// declarations in scope at `context`. A bare name takes the default namespace, if any.
    pub fn parse(source: &str, context: Node) -> Result<Self, SchemaError> {
        let Some((prefix, local_name)) = source.rsplit_once(':') else {
            return Ok(Self::with_optional_namespace(
                context.lookup_namespace_uri(None),
                source,
            ));
        };
        let namespace_name = match prefix {
            "xml" => XML_NAMESPACE,
            _ => context
                .lookup_namespace_uri(Some(prefix))
                .ok_or_else(|| SchemaError::NamePrefixNotResolved(prefix.into()))?,
        };
        Ok(Self::with_namespace(namespace_name, local_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_names_resolve_against_in_scope_declarations() {
        let doc = roxmltree::Document::parse(r#"<s xmlns:t="urn:t"><e/></s>"#).unwrap();
        let e = doc.root_element().first_child().unwrap();
        let name = QName::parse("t:item", e).unwrap();
        assert_eq!(name, QName::with_namespace("urn:t", "item"));
    }

    #[test]
    fn unprefixed_names_take_the_default_namespace() {
        let doc = roxmltree::Document::parse(r#"<s xmlns="urn:d"/>"#).unwrap();
        let name = QName::parse("item", doc.root_element()).unwrap();
        assert_eq!(name, QName::with_namespace("urn:d", "item"));

        let doc = roxmltree::Document::parse("<s/>").unwrap();
        let name = QName::parse("item", doc.root_element()).unwrap();
        assert_eq!(name.namespace_name, None);
    }

    #[test]
    fn the_xml_prefix_needs_no_declaration() {
        let doc = roxmltree::Document::parse("<s/>").unwrap();
        let name = QName::parse("xml:lang", doc.root_element()).unwrap();
        assert_eq!(name.to_string(), "{http://www.w3.org/XML/1998/namespace}lang");
    }

    #[test]
    fn unknown_prefix_is_an_error() {
        let doc = roxmltree::Document::parse("<s/>").unwrap();
        let err = QName::parse("nope:item", doc.root_element()).unwrap_err();
        assert!(matches!(err, SchemaError::NamePrefixNotResolved(prefix) if prefix == "nope"));
    }
}
