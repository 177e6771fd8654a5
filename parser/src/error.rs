use thiserror::Error;

use crate::{store::StoreId, xstypes::QName};

/// A schema construct that prevents compilation. Always fatal for the whole tree.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to resolve prefix {0:?} to a namespace URI")]
    NamePrefixNotResolved(String),
    #[error("invalid value {value:?}, expected {expected}")]
    InvalidValue {
        value: String,
        expected: &'static str,
    },
    #[error("maxOccurs ({max}) is lower than minOccurs ({min})")]
    InvalidBounds { min: u64, max: u64 },
    #[error("<{tag}> is missing the required {attribute:?} attribute")]
    MissingAttribute { tag: String, attribute: &'static str },
    #[error("unresolved {kind} reference {name}")]
    Unresolved { kind: &'static str, name: QName },
    #[error("unsupported schema construct <{tag}>")]
    Unsupported { tag: String },
    #[error("{name} is defined in terms of itself")]
    RecursiveDefinition { name: String },
    #[error("nesting depth exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },
    #[error("the document root is <{0}>, expected <schema>")]
    NotASchema(String),
    #[error("the schema declares no global element")]
    EmptySchema,
    #[error("the schema declares no global element named {0:?}")]
    MissingRootElement(String),
    #[error("{path}: {source}")]
    At {
        path: String,
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    /// Attaches the path of the offending particle. Only the innermost path is kept.
    pub fn at(self, path: &str) -> Self {
        match self {
            Self::At { .. } => self,
            source => Self::At {
                path: path.to_string(),
                source: Box::new(source),
            },
        }
    }

    /// The error without its path context.
    pub fn root_cause(&self) -> &SchemaError {
        match self {
            Self::At { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::At { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// An instance subtree that does not fit the shape derived from the schema. Recorded on the
/// affected node, never propagated.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReloadError {
    #[error("<{tag}> has a simple type but contains element content")]
    UnexpectedContent { tag: String },
    #[error("<{tag}> contains unexpected element <{found}>")]
    UnexpectedElement { tag: String, found: String },
    #[error("the instance root is <{found}>, expected <{expected}>")]
    RootMismatch { expected: String, found: String },
    #[error("occurrence {occurrence} of <{tag}> exceeds maxOccurs {max}")]
    TooManyOccurrences {
        tag: String,
        occurrence: u64,
        max: u64,
    },
}

/// Failure of the persistence layer.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no data structure element with id {0}")]
    DoesNotExist(StoreId),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write XML: {0}")]
    Write(String),
    #[error("serialized XML is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The text of a schema or instance document is not well-formed XML.
#[derive(Debug, Error)]
#[error("failed to parse {document}: {source}")]
pub struct ParseError {
    pub document: &'static str,
    #[source]
    pub source: roxmltree::Error,
}
