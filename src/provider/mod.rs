//! Generation provider adapter.
//!
//! The provider is an opaque remote function: source image plus prompt in,
//! image URL(s) out. [`RenderProvider`] is the seam the gateway calls through,
//! and [`ProviderOutput`] is the one place where "single URL or list of URLs"
//! is turned into a single result locator.

#[cfg(feature = "replicate")]
mod replicate;

#[cfg(feature = "replicate")]
pub use replicate::{ReplicateProvider, ReplicateProviderBuilder};

use crate::error::{RenderError, Result};
use crate::image::SourceImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Steers the model away from low-quality or non-photographic output.
pub const NEGATIVE_PROMPT: &str =
    "low quality, distorted, bad perspective, extra lines, blurry, cartoon, sketch, drawing";

/// Denoising steps per render.
pub const NUM_INFERENCE_STEPS: u32 = 30;

/// How strongly the edge map constrains geometry (0.0 to 1.0).
pub const CONDITIONING_SCALE: f32 = 0.7;

/// Input fields sent to the generation model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInput {
    /// Source image as a data URI.
    pub image: SourceImage,
    /// Positive prompt.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: String,
    /// Inference step count.
    pub num_inference_steps: u32,
    /// Structure-preservation strength in `[0, 1]`.
    pub controlnet_conditioning_scale: f32,
}

impl ProviderInput {
    /// Creates an input with the fixed negative prompt and parameters.
    pub fn new(image: SourceImage, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
            negative_prompt: NEGATIVE_PROMPT.to_string(),
            num_inference_steps: NUM_INFERENCE_STEPS,
            controlnet_conditioning_scale: CONDITIONING_SCALE,
        }
    }
}

/// What the provider returned on success.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProviderOutput {
    /// A single result URL.
    Single(String),
    /// Several result URLs; the first is the render.
    Many(Vec<String>),
}

impl ProviderOutput {
    /// Reduces the output to one result locator.
    pub fn into_locator(self) -> Result<String> {
        let locator = match self {
            Self::Single(url) => Some(url),
            Self::Many(urls) => urls.into_iter().next(),
        };

        locator
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| RenderError::UnexpectedResponse("provider returned no output".into()))
    }
}

/// A remote image generation backend.
#[async_trait]
pub trait RenderProvider: Send + Sync {
    /// Runs one generation with the given credential.
    async fn run(&self, input: &ProviderInput, token: &str) -> Result<ProviderOutput>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;
}
