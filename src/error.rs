//! Error types

use std::path::PathBuf;

/// Geometry that cannot produce zoom limits, usually a transient pre-layout
/// state (nothing opened yet, surface not sized yet)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("world bounds {width}x{height} have no area")]
    EmptyWorld { width: f64, height: f64 },

    #[error("viewport bounds {width}x{height} have no area")]
    EmptyViewport { width: f64, height: f64 },

    #[error("no page reports a native zoom")]
    NoNativeZoom,

    #[error("computed zoom limits are unusable (min {min}, max {max})")]
    InvalidLimits { min: f64, max: f64 },
}

/// Errors from loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write settings file {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings")]
    Serialize(#[from] serde_yaml::Error),
}
