use indexmap::IndexMap;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// An image-editing model the restorer knows how to address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub label: String,
    /// Whether the model may answer with explanatory text next to (or
    /// instead of) the image.
    pub supports_text_response: bool,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(normalize_model_name(name))
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    /// First registered model; the registry's insertion order is its
    /// preference order.
    pub fn default_model(&self) -> Option<&ModelSpec> {
        self.models.values().next()
    }
}

/// Strips the `models/` resource prefix the service also accepts.
pub fn normalize_model_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix("models/").unwrap_or(trimmed)
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, label: &str| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                label: label.to_string(),
                supports_text_response: true,
            },
        );
    };

    insert(DEFAULT_IMAGE_MODEL, "Gemini 2.5 Flash Image (preview)");
    insert("gemini-2.5-flash-image", "Gemini 2.5 Flash Image");
    insert("gemini-3-pro-image-preview", "Gemini 3 Pro Image (preview)");

    map
}
