//! Source image handling.

use crate::error::{RenderError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported source image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        None
    }
}

/// An input image encoded as a `data:` URI, ready to send to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceImage(String);

impl SourceImage {
    /// Encodes raw image bytes, detecting the format from magic bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(data)
            .ok_or_else(|| RenderError::Decode("unknown image format".into()))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        Ok(Self(format!("data:{};base64,{}", format.mime_type(), encoded)))
    }

    /// Reads and encodes an image file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Validates an existing data URI.
    ///
    /// The payload is decoded leniently: embedded whitespace and missing
    /// padding are accepted, as browsers and hand-built clients produce both.
    pub fn from_data_uri(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let uri = uri.trim();

        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| RenderError::Decode("image must be a data: URI".into()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| RenderError::Decode("image data URI must be base64 encoded".into()))?;
        if !mime.starts_with("image/") {
            return Err(RenderError::Decode(format!(
                "expected an image MIME type, got {mime:?}"
            )));
        }

        let bytes = decode_base64_lenient(payload)
            .map_err(|e| RenderError::Decode(format!("invalid base64 image data: {e}")))?;
        if bytes.is_empty() {
            return Err(RenderError::Decode("image data is empty".into()));
        }

        Ok(Self(uri.to_string()))
    }

    /// Returns the data URI.
    pub fn as_data_uri(&self) -> &str {
        &self.0
    }

    /// Returns the MIME type declared by the URI.
    pub fn mime_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("application/octet-stream")
    }
}

fn decode_base64_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }
    base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned)
}
