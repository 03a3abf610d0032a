//! Snapshot text codec
//!
//! Reversible transform between editor text and a storage-safe string. With the
//! compression capability the UTF-8 bytes are zstd-compressed and base64
//! encoded; without it the text is stored as-is. The capability is resolved
//! once, when the codec is built, and both forms are first-class outputs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Whether streaming compression is usable in this build/runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionCapability {
    Available { level: i32 },
    Unavailable,
}

/// Encoded text plus the tag saying which form it is in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub value: String,
    pub compressed: bool,
}

impl Encoded {
    /// Uncompressed passthrough
    pub fn raw(text: &str) -> Self {
        Self {
            value: text.to_string(),
            compressed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Base64(String),
    Compression(String),
    Utf8(String),
    /// A compressed payload reached a codec without the capability
    Unsupported,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Base64(e) => write!(f, "Base64 error: {e}"),
            CodecError::Compression(e) => write!(f, "Compression error: {e}"),
            CodecError::Utf8(e) => write!(f, "UTF-8 error: {e}"),
            CodecError::Unsupported => write!(f, "Compressed payload but compression is unavailable"),
        }
    }
}

impl std::error::Error for CodecError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    capability: CompressionCapability,
}

impl Codec {
    /// Resolve the capability from the build and the caller's preference
    pub fn detect(enabled: bool, level: i32) -> Self {
        let capability = if enabled && cfg!(feature = "compression") {
            CompressionCapability::Available { level }
        } else {
            CompressionCapability::Unavailable
        };
        tracing::debug!("Snapshot codec capability: {:?}", capability);
        Self { capability }
    }

    /// Codec that never compresses
    pub fn uncompressed() -> Self {
        Self {
            capability: CompressionCapability::Unavailable,
        }
    }

    pub fn capability(&self) -> CompressionCapability {
        self.capability
    }

    pub fn encode(&self, text: &str) -> Result<Encoded, CodecError> {
        match self.capability {
            CompressionCapability::Unavailable => Ok(Encoded::raw(text)),
            CompressionCapability::Available { level } => {
                let bytes = compress(text.as_bytes(), level)?;
                Ok(Encoded {
                    value: STANDARD.encode(bytes),
                    compressed: true,
                })
            }
        }
    }

    pub fn decode(&self, value: &str, compressed: bool) -> Result<String, CodecError> {
        if !compressed {
            return Ok(value.to_string());
        }
        if self.capability == CompressionCapability::Unavailable {
            return Err(CodecError::Unsupported);
        }

        let bytes = STANDARD
            .decode(value)
            .map_err(|e| CodecError::Base64(e.to_string()))?;
        let plain = decompress(&bytes)?;
        String::from_utf8(plain).map_err(|e| CodecError::Utf8(e.to_string()))
    }
}

#[cfg(feature = "compression")]
fn compress(bytes: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
    zstd::stream::encode_all(std::io::Cursor::new(bytes), level)
        .map_err(|e| CodecError::Compression(format!("zstd encode failed: {e}")))
}

#[cfg(feature = "compression")]
fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    zstd::stream::decode_all(std::io::Cursor::new(bytes))
        .map_err(|e| CodecError::Compression(format!("zstd decode failed: {e}")))
}

#[cfg(not(feature = "compression"))]
fn compress(_bytes: &[u8], _level: i32) -> Result<Vec<u8>, CodecError> {
    Err(CodecError::Unsupported)
}

#[cfg(not(feature = "compression"))]
fn decompress(_bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    Err(CodecError::Unsupported)
}
