//! Initial-state blobs and their serialization formats.

use std::path::Path;

use crate::error::EngineError;

// ── SerializationFormat ───────────────────────────────────────────────

/// Encoding of an initial-state blob.
///
/// The byte layout behind each format belongs to the engine; the driver
/// only forwards the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum SerializationFormat {
    /// Engine-specific binary encoding.
    Binary,
    /// JSON text.
    #[default]
    Json,
}

impl SerializationFormat {
    /// Guess the format from a file extension (`json` → `Json`,
    /// `pbb`/`bin` → `Binary`). Case-insensitive.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SerializationFormat::Json),
            "pbb" | "bin" => Some(SerializationFormat::Binary),
            _ => None,
        }
    }
}

impl std::fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationFormat::Binary => write!(f, "binary"),
            SerializationFormat::Json => write!(f, "json"),
        }
    }
}

// ── InitialState ──────────────────────────────────────────────────────

/// A serialized starting state together with its format selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialState {
    bytes: Vec<u8>,
    format: SerializationFormat,
}

impl InitialState {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, format: SerializationFormat) -> Self {
        InitialState {
            bytes: bytes.into(),
            format,
        }
    }

    /// Wrap a text document (JSON state files).
    pub fn from_text(text: &str, format: SerializationFormat) -> Self {
        Self::from_bytes(text.as_bytes(), format)
    }

    /// Read a state file. When `format` is `None` it is inferred from the
    /// extension, falling back to JSON.
    pub fn from_file(
        path: impl AsRef<Path>,
        format: Option<SerializationFormat>,
    ) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let format = format
            .or_else(|| SerializationFormat::from_extension(path))
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(bytes, format))
    }

    /// The raw blob.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The blob as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Result<&str, EngineError> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| EngineError::MalformedState(format!("state is not UTF-8: {}", e)))
    }

    /// The declared format.
    #[inline]
    pub fn format(&self) -> SerializationFormat {
        self.format
    }

    /// Blob size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty blob.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SerializationFormat::from_extension(Path::new("states/StandardMale.json")),
            Some(SerializationFormat::Json)
        );
        assert_eq!(
            SerializationFormat::from_extension(Path::new("StandardMale.PBB")),
            Some(SerializationFormat::Binary)
        );
        assert_eq!(SerializationFormat::from_extension(Path::new("state.txt")), None);
        assert_eq!(SerializationFormat::from_extension(Path::new("state")), None);
    }

    #[test]
    fn test_text_accessor() {
        let state = InitialState::from_text("{\"heart_rate\": 72}", SerializationFormat::Json);
        assert_eq!(state.text().unwrap(), "{\"heart_rate\": 72}");
        assert_eq!(state.format(), SerializationFormat::Json);

        let binary = InitialState::from_bytes(vec![0xff, 0xfe], SerializationFormat::Binary);
        assert!(matches!(binary.text(), Err(EngineError::MalformedState(_))));
        assert_eq!(binary.len(), 2);
    }

    #[test]
    fn test_from_file_infers_format() {
        let dir = std::env::temp_dir().join(format!("tempo-state-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path: PathBuf = dir.join("initial.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let state = InitialState::from_file(&path, None).unwrap();
        assert_eq!(state.format(), SerializationFormat::Binary);
        assert_eq!(state.bytes(), &[1, 2, 3]);

        let forced = InitialState::from_file(&path, Some(SerializationFormat::Json)).unwrap();
        assert_eq!(forced.format(), SerializationFormat::Json);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_file_missing() {
        let err = InitialState::from_file("/nonexistent/tempo/state.json", None).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(SerializationFormat::Binary.to_string(), "binary");
        assert_eq!(SerializationFormat::Json.to_string(), "json");
    }
}
