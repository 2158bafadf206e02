// src/province/loader.rs
//! Чтение границ провинций
//!
//! Поддерживаются два формата, выбор по расширению файла:
//! - **ESRI Shapefile** (`.shp` + `.dbf` рядом) через крейт `shapefile`
//! - **GeoJSON** (`.geojson`, `.json`) через крейт `geojson`
//!
//! Идентификатор провинции берётся из атрибута (по умолчанию `PROVINCE`) и
//! может быть числом или строкой с числом. Принимаются только полигоны и
//! мультиполигоны; всё остальное считается ошибкой входных данных.

use std::fs;
use std::path::Path;

use geo::{Geometry, MultiPolygon};
use geojson::{FeatureCollection, GeoJson};
use serde_json::Value as JsonValue;
use shapefile::Shape;
use shapefile::dbase::{FieldValue, Record};

use crate::error::{MapError, Result};
use crate::metric::{float_to_id, parse_id};
use crate::province::ProvinceShape;

/// Загружает провинции из файла, формат определяется по расширению
pub fn load_provinces(path: &Path, id_attribute: &str) -> Result<Vec<ProvinceShape>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let provinces = match extension.as_deref() {
        Some("shp") => from_shapefile(path, id_attribute)?,
        Some("geojson" | "json") => from_geojson_str(&fs::read_to_string(path)?, id_attribute)?,
        _ => return Err(MapError::UnsupportedFormat(path.to_path_buf())),
    };

    tracing::info!(
        path = %path.display(),
        count = provinces.len(),
        "границы провинций загружены"
    );
    Ok(provinces)
}

/// Читает shapefile вместе с атрибутами из `.dbf`
pub fn from_shapefile(path: &Path, id_attribute: &str) -> Result<Vec<ProvinceShape>> {
    let rows: Vec<(Shape, Record)> = shapefile::read(path)?;

    rows.into_iter()
        .enumerate()
        .map(|(index, (shape, record))| {
            let id = shapefile_id(&record, index, id_attribute)?;
            let geometry = match shape {
                Shape::Polygon(polygon) => MultiPolygon::<f64>::from(polygon),
                Shape::PolygonM(polygon) => MultiPolygon::<f64>::from(polygon),
                Shape::PolygonZ(polygon) => MultiPolygon::<f64>::from(polygon),
                other => {
                    return Err(MapError::UnsupportedGeometry {
                        id,
                        kind: format!("{:?}", other.shapetype()),
                    });
                }
            };
            ProvinceShape::new(id, geometry)
        })
        .collect()
}

fn shapefile_id(record: &Record, index: usize, attribute: &str) -> Result<u32> {
    let value = record
        .get(attribute)
        .ok_or_else(|| MapError::MissingAttribute {
            index,
            attribute: attribute.to_string(),
        })?;

    let id = match value {
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => float_to_id(*n),
        FieldValue::Float(Some(n)) => float_to_id(f64::from(*n)),
        FieldValue::Integer(n) => u32::try_from(*n).ok(),
        FieldValue::Character(Some(s)) => parse_id(s),
        _ => None,
    };

    id.ok_or_else(|| MapError::InvalidAttribute {
        index,
        attribute: attribute.to_string(),
        value: format!("{value:?}"),
    })
}

/// Разбирает GeoJSON: `FeatureCollection` или одиночный `Feature`
pub fn from_geojson_str(text: &str, id_attribute: &str) -> Result<Vec<ProvinceShape>> {
    let geojson: GeoJson = text.parse()?;
    let collection = FeatureCollection::try_from(geojson)?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let value = feature
                .property(id_attribute)
                .ok_or_else(|| MapError::MissingAttribute {
                    index,
                    attribute: id_attribute.to_string(),
                })?;
            let id = json_id(value).ok_or_else(|| MapError::InvalidAttribute {
                index,
                attribute: id_attribute.to_string(),
                value: value.to_string(),
            })?;

            let geometry = feature.geometry.ok_or(MapError::EmptyGeometry(id))?;
            let geometry = Geometry::<f64>::try_from(geometry)?;
            ProvinceShape::new(id, into_multipolygon(id, geometry)?)
        })
        .collect()
}

fn json_id(value: &JsonValue) -> Option<u32> {
    match value {
        JsonValue::Number(n) => match n.as_u64() {
            Some(id) => u32::try_from(id).ok(),
            None => n.as_f64().and_then(float_to_id),
        },
        JsonValue::String(s) => parse_id(s),
        _ => None,
    }
}

fn into_multipolygon(id: u32, geometry: Geometry<f64>) -> Result<MultiPolygon<f64>> {
    let kind = match geometry {
        Geometry::Polygon(polygon) => return Ok(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => return Ok(multi),
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    };
    Err(MapError::UnsupportedGeometry {
        id,
        kind: kind.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PROVINCES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "PROVINCE": 1 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[80, 27], [82, 27], [82, 29], [80, 29], [80, 27]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "PROVINCE": "2" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[82, 27], [83, 27], [83, 28], [82, 28], [82, 27]]],
                        [[[84, 27], [85, 27], [85, 28], [84, 28], [84, 27]]]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn reads_polygons_and_multipolygons() {
        let provinces = from_geojson_str(TWO_PROVINCES, "PROVINCE").unwrap();
        assert_eq!(provinces.len(), 2);
        assert_eq!(provinces[0].id, 1);
        assert_eq!(provinces[1].id, 2);
        assert_eq!(provinces[1].geometry.0.len(), 2);
        assert!((provinces[0].centroid.x() - 81.0).abs() < 1e-9);
        // две равные части → центр между ними
        assert!((provinces[1].centroid.x() - 83.5).abs() < 1e-9);
    }

    #[test]
    fn missing_attribute_is_an_error() {
        let err = from_geojson_str(TWO_PROVINCES, "STATE").unwrap_err();
        assert!(matches!(err, MapError::MissingAttribute { index: 0, .. }));
    }

    #[test]
    fn non_polygon_geometry_is_rejected() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "PROVINCE": 3 },
                "geometry": { "type": "Point", "coordinates": [85, 28] }
            }]
        }"#;
        let err = from_geojson_str(text, "PROVINCE").unwrap_err();
        assert!(matches!(err, MapError::UnsupportedGeometry { id: 3, ref kind } if kind == "Point"));
    }

    mod shapefiles {
        use std::path::Path;

        use shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
        use shapefile::{Point, PointM, Polygon, PolygonM, PolygonRing};

        use crate::error::MapError;
        use crate::province::loader::{from_shapefile, load_provinces};

        /// Квадрат по часовой стрелке (внешнее кольцо shapefile)
        fn square_ring(x: f64) -> Vec<Point> {
            vec![
                Point::new(x, 27.0),
                Point::new(x, 28.0),
                Point::new(x + 1.0, 28.0),
                Point::new(x + 1.0, 27.0),
            ]
        }

        fn record(value: FieldValue) -> Record {
            let mut record = Record::default();
            record.insert("PROVINCE".to_string(), value);
            record
        }

        fn write_squares(path: &Path, table: TableWriterBuilder, ids: Vec<FieldValue>) {
            let mut writer = shapefile::Writer::from_path(path, table).unwrap();
            for (i, id) in ids.into_iter().enumerate() {
                let polygon = Polygon::new(PolygonRing::Outer(square_ring(80.0 + i as f64)));
                writer.write_shape_and_record(&polygon, &record(id)).unwrap();
            }
        }

        fn numeric_table() -> TableWriterBuilder {
            TableWriterBuilder::new().add_numeric_field("PROVINCE".try_into().unwrap(), 10, 0)
        }

        fn character_table() -> TableWriterBuilder {
            TableWriterBuilder::new().add_character_field("PROVINCE".try_into().unwrap(), 10)
        }

        #[test]
        fn reads_numeric_ids_and_centroids() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("provinces.shp");
            write_squares(
                &path,
                numeric_table(),
                vec![FieldValue::Numeric(Some(1.0)), FieldValue::Numeric(Some(2.0))],
            );

            let provinces = load_provinces(&path, "PROVINCE").unwrap();
            let ids: Vec<u32> = provinces.iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![1, 2]);
            assert!((provinces[0].centroid.x() - 80.5).abs() < 1e-9);
            assert!((provinces[0].centroid.y() - 27.5).abs() < 1e-9);
            assert!((provinces[1].centroid.x() - 81.5).abs() < 1e-9);
        }

        #[test]
        fn reads_character_ids() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("provinces.shp");
            write_squares(&path, character_table(), vec![FieldValue::Character(Some("7".to_string()))]);

            let provinces = from_shapefile(&path, "PROVINCE").unwrap();
            assert_eq!(provinces[0].id, 7);
        }

        #[test]
        fn reads_measured_polygons() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("provinces.shp");
            {
                let mut writer = shapefile::Writer::from_path(&path, numeric_table()).unwrap();
                let ring = square_ring(84.0)
                    .into_iter()
                    .map(|p| PointM::new(p.x, p.y, 0.0))
                    .collect();
                let polygon = PolygonM::new(PolygonRing::Outer(ring));
                writer
                    .write_shape_and_record(&polygon, &record(FieldValue::Numeric(Some(3.0))))
                    .unwrap();
            }

            let provinces = from_shapefile(&path, "PROVINCE").unwrap();
            assert_eq!(provinces[0].id, 3);
            assert!((provinces[0].centroid.x() - 84.5).abs() < 1e-9);
        }

        #[test]
        fn missing_attribute_names_the_row() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("provinces.shp");
            write_squares(&path, numeric_table(), vec![FieldValue::Numeric(Some(1.0))]);

            let err = from_shapefile(&path, "STATE").unwrap_err();
            assert!(matches!(err, MapError::MissingAttribute { index: 0, ref attribute } if attribute == "STATE"));
        }

        #[test]
        fn non_numeric_id_is_invalid() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("provinces.shp");
            write_squares(
                &path,
                character_table(),
                vec![
                    FieldValue::Character(Some("1".to_string())),
                    FieldValue::Character(Some("north".to_string())),
                ],
            );

            let err = from_shapefile(&path, "PROVINCE").unwrap_err();
            assert!(matches!(err, MapError::InvalidAttribute { index: 1, .. }));
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_provinces(Path::new("provinces.kml"), "PROVINCE").unwrap_err();
        assert!(matches!(err, MapError::UnsupportedFormat(_)));
    }

    #[test]
    fn json_ids_accept_numbers_and_strings() {
        assert_eq!(json_id(&serde_json::json!(5)), Some(5));
        assert_eq!(json_id(&serde_json::json!(5.0)), Some(5));
        assert_eq!(json_id(&serde_json::json!("6")), Some(6));
        assert_eq!(json_id(&serde_json::json!(-1)), None);
        assert_eq!(json_id(&serde_json::json!(true)), None);
    }
}
