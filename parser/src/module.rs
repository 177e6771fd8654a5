//! Widgets attached to elements through their module key.
//!
//! The compiler only records the key (`options["module"]`). A [`ModuleRegistry`] maps keys to
//! [`Module`] implementations, and [`handle_module_request`] runs one against a stored element.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::{
    error::ModelError,
    node::{OptionValue, OPTION_MODULE},
    store::{DataStructureStore, StoreId, StoredElement},
};

/// Key of `options` holding the data retrieved by a module
pub const OPTION_DATA: &str = "data";

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("the request has no module id")]
    MissingModuleId,
    #[error("element {0} has no module key")]
    MissingModuleKey(StoreId),
    #[error("no module registered for key {0:?}")]
    UnknownModule(String),
    #[error("module {0:?} returned no data")]
    NoData(String),
    #[error("module {0:?} returned no markup")]
    NoRendering(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleRequest {
    /// Id of the stored element the module is attached to
    pub module_id: Option<StoreId>,
    pub url: Option<String>,
    /// Form data submitted to the module
    pub data: BTreeMap<String, String>,
}

/// Scripts and stylesheets a module needs on the page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ModuleResources {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

pub trait Module {
    /// Markup of the widget for `element`.
    fn render(&self, element: &StoredElement, request: &ModuleRequest) -> Option<String>;

    /// The value the widget produces for `element`.
    fn retrieve(&self, element: &StoredElement, request: &ModuleRequest) -> Option<String>;

    fn resources(&self) -> ModuleResources {
        ModuleResources::default()
    }
}

#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Box<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, module: impl Module + 'static) {
        self.modules.insert(key.into(), Box::new(module));
    }

    pub fn get(&self, key: &str) -> Option<&dyn Module> {
        self.modules.get(key).map(|module| module.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// The resources of module `key` as `{"scripts": [..], "styles": [..]}`.
    pub fn resources_json(&self, key: &str) -> Result<serde_json::Value, ModuleError> {
        let module = self
            .get(key)
            .ok_or_else(|| ModuleError::UnknownModule(key.to_string()))?;
        Ok(serde_json::to_value(module.resources())?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleResponse {
    pub html: String,
    pub data: String,
}

impl ModuleResponse {
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Runs the module of the element named by `request.module_id`.
///
/// The retrieved value is saved into the element's `options["data"]` before rendering.
pub fn handle_module_request(
    store: &mut impl DataStructureStore,
    registry: &ModuleRegistry,
    request: &ModuleRequest,
) -> Result<ModuleResponse, ModuleError> {
    let id = request.module_id.ok_or(ModuleError::MissingModuleId)?;
    let mut element = store.load(id)?;
    let key = element
        .options
        .get(OPTION_MODULE)
        .and_then(OptionValue::as_str)
        .ok_or(ModuleError::MissingModuleKey(id))?
        .to_string();
    let module = registry
        .get(&key)
        .ok_or_else(|| ModuleError::UnknownModule(key.clone()))?;
    debug!(%id, module = key.as_str(), "handling module request");

    let data = module
        .retrieve(&element, request)
        .ok_or_else(|| ModuleError::NoData(key.clone()))?;
    element
        .options
        .insert(OPTION_DATA.to_string(), OptionValue::from(data.as_str()));
    store.update(id, element.clone())?;

    let html = module
        .render(&element, request)
        .ok_or(ModuleError::NoRendering(key))?;
    Ok(ModuleResponse { html, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{node::Options, store::MemoryStore};
    use serde_json::json;

    struct Echo;

    impl Module for Echo {
        fn render(&self, element: &StoredElement, _request: &ModuleRequest) -> Option<String> {
            let data = element.options.get(OPTION_DATA)?.as_str()?;
            Some(format!("<span>{data}</span>"))
        }

        fn retrieve(&self, _element: &StoredElement, request: &ModuleRequest) -> Option<String> {
            request.data.get("value").cloned()
        }
    }

    fn store_with_module(key: Option<&str>) -> (MemoryStore, StoreId) {
        let mut options = Options::new();
        if let Some(key) = key {
            options.insert(OPTION_MODULE.to_string(), key.into());
        }
        let mut store = MemoryStore::new();
        let id = store
            .save(StoredElement {
                tag: "tag".into(),
                value: Some("value".into()),
                options,
                children: Vec::new(),
            })
            .unwrap();
        (store, id)
    }

    struct Picker;

    impl Module for Picker {
        fn render(&self, _element: &StoredElement, _request: &ModuleRequest) -> Option<String> {
            Some("<select/>".into())
        }

        fn retrieve(&self, _element: &StoredElement, _request: &ModuleRequest) -> Option<String> {
            None
        }

        fn resources(&self) -> ModuleResources {
            ModuleResources {
                scripts: vec!["picker.js".into()],
                styles: vec!["picker.css".into()],
            }
        }
    }

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register("echo", Echo);
        registry.register("picker", Picker);
        registry
    }

    #[test]
    fn resources_are_listed_as_json() {
        let registry = registry();
        assert_eq!(
            registry.resources_json("picker").unwrap(),
            json!({"scripts": ["picker.js"], "styles": ["picker.css"]})
        );
        assert_eq!(
            registry.resources_json("echo").unwrap(),
            json!({"scripts": [], "styles": []})
        );
        assert!(matches!(
            registry.resources_json("map"),
            Err(ModuleError::UnknownModule(key)) if key == "map"
        ));
    }

    #[test]
    fn stores_retrieved_data_and_renders() {
        let (mut store, id) = store_with_module(Some("echo"));
        let request = ModuleRequest {
            module_id: Some(id),
            url: Some("/url".into()),
            data: [("value".to_string(), "module result".to_string())].into(),
        };

        let response = handle_module_request(&mut store, &registry(), &request).unwrap();
        assert_eq!(
            response.to_json().unwrap(),
            json!({"html": "<span>module result</span>", "data": "module result"})
        );
        assert_eq!(
            store.load(id).unwrap().options.get(OPTION_DATA),
            Some(&OptionValue::Str("module result".into()))
        );
    }

    #[test]
    fn a_module_without_data_is_an_error() {
        let (mut store, id) = store_with_module(Some("echo"));
        let request = ModuleRequest {
            module_id: Some(id),
            ..ModuleRequest::default()
        };
        assert!(matches!(
            handle_module_request(&mut store, &registry(), &request),
            Err(ModuleError::NoData(key)) if key == "echo"
        ));
        assert_eq!(store.load(id).unwrap().options.get(OPTION_DATA), None);
    }

    #[test]
    fn requests_must_name_a_known_element_and_module() {
        let (mut store, id) = store_with_module(None);
        let registry = registry();

        let request = ModuleRequest::default();
        assert!(matches!(
            handle_module_request(&mut store, &registry, &request),
            Err(ModuleError::MissingModuleId)
        ));

        let request = ModuleRequest {
            module_id: Some(id),
            ..ModuleRequest::default()
        };
        assert!(matches!(
            handle_module_request(&mut store, &registry, &request),
            Err(ModuleError::MissingModuleKey(_))
        ));

        let request = ModuleRequest {
            module_id: Some(StoreId(99)),
            ..ModuleRequest::default()
        };
        assert!(matches!(
            handle_module_request(&mut store, &registry, &request),
            Err(ModuleError::Model(ModelError::DoesNotExist(StoreId(99))))
        ));
    }

    #[test]
    fn modules_have_no_resources_by_default() {
        assert_eq!(registry().get("echo").unwrap().resources(), ModuleResources::default());
        assert_eq!(registry().keys().collect::<Vec<_>>(), vec!["echo", "picker"]);
    }
}
