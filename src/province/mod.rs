pub mod label;
pub mod loader;

use geo::{BoundingRect, Centroid, MultiPolygon, Point, Rect};
use serde::Serialize;

use crate::error::{MapError, Result};

/// Граница одной провинции
#[derive(Debug, Clone, Serialize)]
pub struct ProvinceShape {
    pub id: u32,
    #[serde(skip)]
    pub geometry: MultiPolygon<f64>,
    /// центр масс по площади
    pub centroid: Point<f64>,
}

impl ProvinceShape {
    pub fn new(id: u32, geometry: MultiPolygon<f64>) -> Result<Self> {
        let centroid = geometry.centroid().ok_or(MapError::EmptyGeometry(id))?;
        Ok(Self {
            id,
            geometry,
            centroid,
        })
    }
}

/// Общий охватывающий прямоугольник всех провинций
#[must_use]
pub fn bounds(provinces: &[ProvinceShape]) -> Option<Rect<f64>> {
    provinces
        .iter()
        .filter_map(|p| p.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        })
}
