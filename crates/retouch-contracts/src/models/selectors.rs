use super::registry::{normalize_model_name, ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    /// Identifier sent to the service.
    pub name: String,
    /// Registry entry, absent for names the registry does not know.
    pub spec: Option<ModelSpec>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    /// Resolves the model to call.
    ///
    /// Unknown names pass through with a note so newly released service
    /// models work without a registry update.
    pub fn select(&self, requested: Option<&str>) -> Result<ModelSelection, String> {
        let requested = requested
            .map(normalize_model_name)
            .filter(|value| !value.is_empty());

        if let Some(requested_value) = requested {
            if let Some(model) = self.registry.get(requested_value) {
                return Ok(ModelSelection {
                    name: model.name.clone(),
                    spec: Some(model.clone()),
                    note: None,
                });
            }
            return Ok(ModelSelection {
                name: requested_value.to_string(),
                spec: None,
                note: Some(format!(
                    "Model '{requested_value}' is not in the registry; sending it unchanged."
                )),
            });
        }

        let Some(model) = self.registry.default_model() else {
            return Err("No image models registered.".to_string());
        };
        Ok(ModelSelection {
            name: model.name.clone(),
            spec: Some(model.clone()),
            note: Some("No model specified; using default.".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::models::{ModelRegistry, ModelSelector, DEFAULT_IMAGE_MODEL};

    #[test]
    fn known_model_is_selected_without_note() {
        let selection = ModelSelector::default()
            .select(Some("models/gemini-3-pro-image-preview"))
            .unwrap();
        assert_eq!(selection.name, "gemini-3-pro-image-preview");
        assert!(selection.spec.is_some());
        assert_eq!(selection.note, None);
    }

    #[test]
    fn missing_request_uses_default_with_explanation() {
        let selection = ModelSelector::default().select(Some("  ")).unwrap();
        assert_eq!(selection.name, DEFAULT_IMAGE_MODEL);
        assert_eq!(
            selection.note.as_deref(),
            Some("No model specified; using default.")
        );
    }

    #[test]
    fn unknown_model_passes_through() {
        let selection = ModelSelector::default()
            .select(Some("gemini-9-image"))
            .unwrap();
        assert_eq!(selection.name, "gemini-9-image");
        assert!(selection.spec.is_none());
        assert_eq!(
            selection.note.as_deref(),
            Some("Model 'gemini-9-image' is not in the registry; sending it unchanged.")
        );
    }

    #[test]
    fn empty_registry_without_request_is_an_error() {
        let selector = ModelSelector::new(Some(ModelRegistry::new(Some(IndexMap::new()))));
        assert_eq!(
            selector.select(None).err().unwrap_or_default(),
            "No image models registered."
        );
    }
}
