// Model metadata, tag adapters and the name-based model registry

pub mod adapter;
pub mod registry;
pub mod traits;

pub use adapter::TagAdapter;
pub use registry::{DynResource, Registry, ResourceHandle, Row};
pub use traits::{FieldDescription, FieldKind, FuretuiResource, primary_key_names};
