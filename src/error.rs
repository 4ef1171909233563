// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Convenient result alias for waypath.
pub type Result<T> = std::result::Result<T, Error>;

/// Error conditions which may occur while computing routes.
///
/// Only [Error::InvalidCoordinates] is ever returned by
/// [Router::compute_route](crate::Router::compute_route); every other kind
/// is recovered from by falling back to a less precise strategy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A latitude or longitude was not finite or out of range.
    #[error("invalid coordinates: ({lat}, {lon})")]
    InvalidCoordinates { lat: f64, lon: f64 },

    /// Path search exhausted the graph without reaching the destination.
    #[error("no path found")]
    NoPathFound,

    /// Road geometry could not be obtained from the external source.
    #[error("external road data unavailable: {0}")]
    ExternalDataUnavailable(String),

    /// An external collaborator did not answer in time.
    #[error("external request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The cache storage backend failed.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}
