#![warn(missing_docs)]
//! Render Tool - photorealistic re-renders of flat-colored architectural exports.
//!
//! A source image painted with placeholder colors is sent to an
//! edge-conditioned image model together with an instruction that maps each
//! color to a real-world material or component.
//!
//! # Quick Start
//!
//! ```no_run
//! use render_tool::{
//!     GenerationGateway, GenerationRequest, MaterialRegistry, MemoryStore, ReplicateProvider,
//!     SourceImage,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> render_tool::Result<()> {
//!     let registry = MaterialRegistry::new(Arc::new(MemoryStore::new()));
//!     let provider = ReplicateProvider::builder().build()?;
//!     let gateway = GenerationGateway::new(Arc::new(provider))
//!         .with_operator_credential(std::env::var("REPLICATE_API_TOKEN").ok());
//!
//!     let request = GenerationRequest::new(
//!         "Modern, warm evening light",
//!         registry.load(),
//!         SourceImage::from_path("kitchen.png")?,
//!     );
//!     let url = gateway.generate(&request).await?;
//!     println!("{url}");
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `replicate`: Replicate ControlNet provider
//! - `server`: HTTP endpoint (axum)
//! - `cli`: Command-line interface

mod error;

pub mod config;
pub mod gateway;
pub mod image;
pub mod materials;
pub mod prompt;
pub mod provider;

#[cfg(feature = "server")]
pub mod server;

// Re-export error types at crate root
pub use error::{RenderError, Result};

pub use config::Settings;
pub use gateway::{GenerationGateway, GenerationRequest};
pub use image::{ImageFormat, SourceImage};
pub use materials::{
    default_mapping, CredentialStore, FileStore, KeyValueStore, MaterialMapping, MaterialRecord,
    MaterialRegistry, MemoryStore,
};
pub use prompt::compose;
pub use provider::{ProviderInput, ProviderOutput, RenderProvider};

#[cfg(feature = "replicate")]
pub use provider::{ReplicateProvider, ReplicateProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{RenderError, Result};
    pub use crate::gateway::{GenerationGateway, GenerationRequest};
    pub use crate::image::SourceImage;
    pub use crate::materials::{KeyValueStore, MaterialMapping, MaterialRecord, MaterialRegistry};
    pub use crate::prompt::compose;
    pub use crate::provider::RenderProvider;

    #[cfg(feature = "replicate")]
    pub use crate::provider::ReplicateProvider;
}
