mod registry;
mod selectors;

pub use registry::{normalize_model_name, ModelRegistry, ModelSpec, DEFAULT_IMAGE_MODEL};
pub use selectors::{ModelSelection, ModelSelector};
