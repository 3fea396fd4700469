/// Error types for the engine
/// Out-of-range ids are programming errors and panic instead of landing here
use std::io;
use std::path::PathBuf;

/// Texture asset could not be resolved
#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    #[error("failed to load texture '{name}' from {path}: {source}")]
    Decode {
        name: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture '{name}' is {width}x{height}, expected {expected_width}x{expected_height}")]
    Size {
        name: String,
        width: u32,
        height: u32,
        expected_width: usize,
        expected_height: usize,
    },
}

/// Chunk or map persistence failure
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("corrupt chunk file {path}: {actual} bytes, expected at least {expected}")]
    Corrupt {
        path: PathBuf,
        actual: usize,
        expected: usize,
    },

    #[error("chunk file {path} references unknown block id {id}")]
    UnknownBlock { path: PathBuf, id: u8 },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ChunkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ChunkError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration file could not be used
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Block table does not satisfy its invariants
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("block table is empty")]
    Empty,

    #[error("block table has {count} entries, at most {max} allowed")]
    TooManyBlocks { count: usize, max: usize },

    #[error("block at index {index} has id {id}")]
    IdMismatch { index: usize, id: u8 },

    #[error("block 0 must be air, found '{name}'")]
    AirNotFirst { name: String },

    #[error("block '{block}' references texture {texture}, registry holds {available}")]
    MissingTexture {
        block: String,
        texture: u8,
        available: usize,
    },
}

/// Session-level error, aggregates everything a frame or startup can report
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Asset(#[from] AssetLoadError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
