use crate::layer::Layer;
use std::path::PathBuf;
use thiserror::Error;

/// Tile registration errors. These are startup bugs: the registry must be
/// consistent before any map is loaded.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tile id '{id}' is already registered on the {layer} layer")]
    DuplicateTileId { layer: Layer, id: String },
}

/// Errors from editing a [`MapGrid`](crate::MapGrid).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("cell ({x}, {y}) is outside the {width}x{height} map")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("tile '{id}' belongs to the {tile_layer} layer, not {layer}")]
    WrongLayer {
        id: String,
        tile_layer: Layer,
        layer: Layer,
    },

    #[error("the {layer} layer already references the maximum number of distinct tiles")]
    IdTableFull { layer: Layer },

    #[error("tile '{id}' comes from a different registry than the {layer} layer")]
    ForeignTile { layer: Layer, id: String },

    #[error("the {layer} layer has no free metadata slots")]
    MetadataSlotsExhausted { layer: Layer },

    #[error("invalid map size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("cell ({x}, {y}) on the {layer} layer points at metadata slot {slot} of {len}")]
    StaleMetadataSlot {
        layer: Layer,
        x: u32,
        y: u32,
        slot: u16,
        len: usize,
    },

    #[error("cell ({x}, {y}) on the {layer} layer references empty ID-table entry {index}")]
    MissingTileEntry {
        layer: Layer,
        x: u32,
        y: u32,
        index: u16,
    },
}

/// Errors from reading or writing a stored map.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("I/O error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse map JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("map format version {found:?} does not match engine version {expected}")]
    FormatVersionMismatch { found: Option<u64>, expected: u64 },

    #[error("map has version {version:?} and could not be read as a legacy map either: {source}")]
    LegacyFallbackFailed {
        version: Option<u64>,
        #[source]
        source: Box<MapError>,
    },

    #[error("malformed map while reading {stage}: {reason}")]
    Malformed { stage: ReadStage, reason: String },

    #[error("invalid layer size for layer '{layer}': expected {expected} cells, found {found}")]
    InvalidLayerSize {
        layer: Layer,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("background task for {path:?} panicked")]
    TaskPanicked { path: PathBuf },
}

/// Where the reader was when a stored map turned out to be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    Header,
    Info,
    Layers,
}

impl std::fmt::Display for ReadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ReadStage::Header => "header",
            ReadStage::Info => "info",
            ReadStage::Layers => "layers",
        })
    }
}

/// Errors from starting a background load or save.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("a load or save is already in progress")]
    Busy,
    #[error("there is no map to save")]
    NoMap,
}
