/// What fresh compilation emits for an optional, unbounded particle that has no occurrences.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Placeholder {
    /// Zero nodes
    #[default]
    None,
    /// A single empty node the form can duplicate
    Template,
}

/// Which choice branch fresh compilation marks as selected.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DefaultChoice {
    #[default]
    None,
    First,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MODULE_TAG_NAME: &str = "module";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    pub placeholder: Placeholder,
    pub default_choice: DefaultChoice,
    /// Maximum nesting of complex types and groups
    pub max_depth: usize,
    /// Name of the `<xs:appinfo>` child holding an element's module key
    pub module_tag_name: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            placeholder: Placeholder::default(),
            default_choice: DefaultChoice::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            module_tag_name: DEFAULT_MODULE_TAG_NAME.to_string(),
        }
    }
}
