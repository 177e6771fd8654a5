use std::collections::HashSet;

use lazy_static::lazy_static;

use super::xstypes::QName;

// Namespace used by XML Schema (pt. 1, §1.3.1)
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Built-in datatypes (pt. 2, §3), plus the ur-types. They are all compiled as text leaves.
const BUILTIN_TYPE_NAMES: &[&str] = &[
    "anyType",
    "anySimpleType",
    "anyAtomicType",
    // primitive
    "string",
    "boolean",
    "decimal",
    "float",
    "double",
    "duration",
    "dateTime",
    "time",
    "date",
    "gYearMonth",
    "gYear",
    "gMonthDay",
    "gDay",
    "gMonth",
    "hexBinary",
    "base64Binary",
    "anyURI",
    "QName",
    "NOTATION",
    // ordinary
    "normalizedString",
    "token",
    "language",
    "NMTOKEN",
    "NMTOKENS",
    "Name",
    "NCName",
    "ID",
    "IDREF",
    "IDREFS",
    "ENTITY",
    "ENTITIES",
    "integer",
    "nonPositiveInteger",
    "negativeInteger",
    "long",
    "int",
    "short",
    "byte",
    "nonNegativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
    "positiveInteger",
    "yearMonthDuration",
    "dayTimeDuration",
    "dateTimeStamp",
];

lazy_static! {
    static ref BUILTIN_TYPES: HashSet<QName> = BUILTIN_TYPE_NAMES
        .iter()
        .map(|name| QName::with_namespace(XS_NAMESPACE, *name))
        .collect();
}

pub fn is_builtin_type(name: &QName) -> bool {
    BUILTIN_TYPES.contains(name)
}
