// src/error.rs
//! Ошибки построения карты
//!
//! Единый тип ошибки для всех этапов: чтение таблицы показателей, чтение границ
//! провинций, разбор конфигурации, растеризация и запись PNG.
//! Никаких повторных попыток: ошибка просто поднимается к вызывающему коду.

use std::path::PathBuf;

use thiserror::Error;

/// Ошибка построения или экспорта карты
#[derive(Debug, Error)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// У объекта геометрии нет атрибута с идентификатором провинции
    #[error("feature #{index} has no attribute `{attribute}`")]
    MissingAttribute { index: usize, attribute: String },

    /// Атрибут есть, но не приводится к целому идентификатору
    #[error("feature #{index}: attribute `{attribute}` is not an integer id ({value})")]
    InvalidAttribute {
        index: usize,
        attribute: String,
        value: String,
    },

    #[error("province {id}: unsupported geometry type {kind}")]
    UnsupportedGeometry { id: u32, kind: String },

    #[error("province {0}: geometry is empty, centroid is undefined")]
    EmptyGeometry(u32),

    #[error("CSV has no column `{0}`")]
    MissingColumn(String),

    #[error("CSV row {row}: column `{column}` has invalid value `{value}`")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("unsupported geometry file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to load font from {0}")]
    Font(PathBuf),

    #[error("invalid color `{0}`, expected #rrggbb")]
    InvalidColor(String),

    #[error("metric table is empty")]
    EmptyMetrics,
}

pub type Result<T> = std::result::Result<T, MapError>;
