//! Material registry: the color-to-material table and its persistence.

mod credentials;
mod defaults;
mod registry;
mod store;
mod types;

pub use credentials::{CredentialStore, API_KEY_KEY};
pub use defaults::default_mapping;
pub use registry::{MaterialRegistry, MATERIALS_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{MaterialMapping, MaterialRecord};

pub(crate) use types::non_empty;
