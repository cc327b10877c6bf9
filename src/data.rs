use crate::config::GeometryConfig;
use crate::topojson::{value_to_id, Topology};
use crate::types::GeographyFeature;
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use serde_json::{Map, Value};
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use tracing::{info, warn};

/// Loads the region boundaries named by the geometry config.
pub fn load_features(config: &GeometryConfig) -> Result<Vec<GeographyFeature>> {
    let file_name = config
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Geometry path has no file name: {:?}", config.path))?;

    let features = if file_name.ends_with(".topo.json") || file_name.ends_with(".topojson") {
        load_topojson(config)?
    } else if file_name.ends_with(".geojson") || file_name.ends_with(".json") {
        load_geojson(config)?
    } else if file_name.ends_with(".shp") {
        load_shapefile(config)?
    } else {
        return Err(anyhow!("Unsupported geometry format: {}", file_name));
    };

    info!(count = features.len(), path = ?config.path, "loaded region geometry");
    Ok(features)
}

fn property_name(properties: &Map<String, Value>, key: &str) -> String {
    match properties.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn load_topojson(config: &GeometryConfig) -> Result<Vec<GeographyFeature>> {
    let bytes = fs::read(&config.path)
        .with_context(|| format!("Failed to read TopoJSON file: {:?}", config.path))?;
    let topology = Topology::from_slice(&bytes).context("Failed to parse TopoJSON")?;

    let mut features = Vec::new();
    for feature in topology.features(config.object.as_deref())? {
        let code = match (&feature.id, &config.id_property) {
            (Some(id), _) => id.clone(),
            (None, Some(prop)) => match feature.properties.get(prop).and_then(value_to_id) {
                Some(id) => id,
                None => continue,
            },
            (None, None) => {
                warn!("skipping TopoJSON geometry without an id");
                continue;
            }
        };

        features.push(GeographyFeature {
            name: property_name(&feature.properties, &config.name_property),
            code,
            geometry: feature.geometry,
        });
    }

    Ok(features)
}

fn load_geojson(config: &GeometryConfig) -> Result<Vec<GeographyFeature>> {
    use geojson::{feature::Id, GeoJson};

    let file = File::open(&config.path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", config.path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();

    for feature in collection.features {
        let properties = feature.properties.clone().unwrap_or_default();

        let code = match &config.id_property {
            Some(prop) => properties.get(prop).and_then(value_to_id),
            None => match &feature.id {
                Some(Id::String(s)) => Some(s.clone()),
                Some(Id::Number(n)) => Some(n.to_string()),
                None => None,
            },
        };
        let Some(code) = code else { continue };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        features.push(GeographyFeature {
            name: property_name(&properties, &config.name_property),
            code,
            geometry,
        });
    }

    Ok(features)
}

fn load_shapefile(config: &GeometryConfig) -> Result<Vec<GeographyFeature>> {
    let id_column = config
        .id_property
        .as_deref()
        .ok_or_else(|| anyhow!("geometry.id_property is required for Shapefile input"))?;

    let mut reader = Reader::from_path(&config.path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", config.path))?;

    let mut features = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let code = match record.get(id_column) {
            Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(FieldValue::Character(None)) => continue, // Skip if null
            Some(_) => return Err(anyhow!("Shapefile id column must be a string")),
            None => return Err(anyhow!("Id column '{}' not found in Shapefile", id_column)),
        };

        let name = match record.get(&config.name_property) {
            Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
            _ => String::new(),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue, // Skip non-polygon shapes
        };

        features.push(GeographyFeature { code, name, geometry });
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn config_for(path: &Path) -> GeometryConfig {
        GeometryConfig {
            path: path.to_path_buf(),
            ..GeometryConfig::default()
        }
    }

    #[test]
    fn test_load_topojson_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("india.topo.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"type": "Topology",
                "objects": {{"india": {{"type": "GeometryCollection", "geometries": [
                    {{"type": "Polygon", "id": "MH", "properties": {{"name": "Maharashtra"}}, "arcs": [[0]]}},
                    {{"type": "Polygon", "properties": {{"name": "No Id"}}, "arcs": [[0]]}}
                ]}}}},
                "arcs": [[[73.0, 16.0], [80.0, 16.0], [80.0, 21.0], [73.0, 16.0]]]}}"#
        )
        .unwrap();

        let features = load_features(&config_for(&path)).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].code, "MH");
        assert_eq!(features[0].name, "Maharashtra");
        assert_eq!(features[0].geometry.0.len(), 1);
    }

    #[test]
    fn test_load_geojson_with_id_property() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.geojson");
        fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"st_code": "KL", "name": "Kerala"},
                 "geometry": {"type": "Polygon", "coordinates": [[[75.0, 8.0], [77.0, 8.0], [77.0, 12.0], [75.0, 8.0]]]}},
                {"type": "Feature", "properties": {"st_code": "XX", "name": "Point"},
                 "geometry": {"type": "Point", "coordinates": [75.0, 8.0]}}
            ]}"#,
        )
        .unwrap();

        let mut config = config_for(&path);
        config.id_property = Some("st_code".to_string());

        let features = load_features(&config).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].code, "KL");
        assert_eq!(features[0].name, "Kerala");
    }

    #[test]
    fn test_load_geojson_numeric_feature_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "id": 27, "properties": {"name": "Maharashtra"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[73.0, 16.0], [80.0, 16.0], [80.0, 21.0], [73.0, 16.0]]]]}},
                {"type": "Feature", "properties": {"name": "No Id"},
                 "geometry": {"type": "Polygon", "coordinates": [[[75.0, 8.0], [77.0, 8.0], [77.0, 12.0], [75.0, 8.0]]]}}
            ]}"#,
        )
        .unwrap();

        let features = load_features(&config_for(&path)).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].code, "27");
        assert_eq!(features[0].name, "Maharashtra");
    }

    fn square_ring() -> shapefile::Polygon {
        use shapefile::{Point, PolygonRing};
        // clockwise, as shapefile outer rings are
        shapefile::Polygon::new(PolygonRing::Outer(vec![
            Point::new(73.0, 16.0),
            Point::new(73.0, 21.0),
            Point::new(80.0, 21.0),
            Point::new(80.0, 16.0),
            Point::new(73.0, 16.0),
        ]))
    }

    #[test]
    fn test_load_shapefile() {
        use shapefile::dbase::{FieldName, Record, TableWriterBuilder};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.shp");
        {
            let table = TableWriterBuilder::new()
                .add_character_field(FieldName::try_from("CODE").unwrap(), 8)
                .add_character_field(FieldName::try_from("NAME").unwrap(), 32);
            let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

            let mut record = Record::default();
            record.insert("CODE".to_string(), FieldValue::Character(Some(" MH ".to_string())));
            record.insert("NAME".to_string(), FieldValue::Character(Some("Maharashtra".to_string())));
            writer.write_shape_and_record(&square_ring(), &record).unwrap();
        }

        let mut config = config_for(&path);
        config.id_property = Some("CODE".to_string());
        config.name_property = "NAME".to_string();

        let features = load_features(&config).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].code, "MH");
        assert_eq!(features[0].name, "Maharashtra");
        assert_eq!(features[0].geometry.0.len(), 1);
    }

    #[test]
    fn test_shapefile_numeric_id_column_rejected() {
        use shapefile::dbase::{FieldName, Record, TableWriterBuilder};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.shp");
        {
            let table =
                TableWriterBuilder::new().add_numeric_field(FieldName::try_from("CODE").unwrap(), 10, 0);
            let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

            let mut record = Record::default();
            record.insert("CODE".to_string(), FieldValue::Numeric(Some(27.0)));
            writer.write_shape_and_record(&square_ring(), &record).unwrap();
        }

        let mut config = config_for(&path);
        config.id_property = Some("CODE".to_string());

        let err = load_features(&config).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_shapefile_requires_id_property() {
        let config = config_for(Path::new("states.shp"));
        let err = load_features(&config).unwrap_err();
        assert!(err.to_string().contains("id_property"));
    }

    #[test]
    fn test_unsupported_extension() {
        let config = config_for(Path::new("regions.kml"));
        assert!(load_features(&config).is_err());
    }
}
