pub mod compiler;
pub mod config;
pub mod error;
pub mod module;
pub mod navigator;
pub mod node;
pub mod occurs;
pub mod output;
pub mod particle;
pub mod reload;
pub mod store;
pub mod xstypes;

mod builtins;
mod element;
mod group;
mod values;

pub use compiler::Compiler;
pub use config::{CompilerConfig, DefaultChoice, Placeholder};
pub use error::{ModelError, OutputError, ParseError, ReloadError, SchemaError};
pub use module::{handle_module_request, Module, ModuleError, ModuleRegistry, ModuleRequest};
pub use navigator::SchemaNavigator;
pub use node::{DataStructure, DataStructureElement, NodeId, NodeKind, OptionValue, Options};
pub use occurs::{Bounds, MaxOccurs};
pub use particle::Particle;
pub use store::{persist, DataStructureStore, MemoryStore, StoreId, StoredElement};

use roxmltree::{Document, ParsingOptions};

/// Parses schema or instance text. `document` names it in the error.
pub fn parse_document<'input>(
    text: &'input str,
    document: &'static str,
    options: ParsingOptions,
) -> Result<Document<'input>, ParseError> {
    Document::parse_with_options(text, options).map_err(|source| ParseError { document, source })
}

/// Compiles the global element `element` (the first one if `None`) of `schema`, reconciled with
/// `instance` when one is given.
pub fn compile_schema(
    schema: &Document,
    config: CompilerConfig,
    element: Option<&str>,
    instance: Option<&Document>,
) -> Result<(DataStructure, NodeId), SchemaError> {
    let navigator = SchemaNavigator::new(schema)?;
    let mut compiler = Compiler::new(&navigator, config);
    let root = match instance {
        Some(instance) => compiler.compile_root_with_instance(element, instance)?,
        None => compiler.compile_root(element)?,
    };
    Ok((compiler.into_tree(), root))
}
