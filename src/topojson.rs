//! Minimal TopoJSON decoder: quantized, delta-encoded arcs stitched into
//! `geo` polygons. Only Polygon and MultiPolygon geometries are produced.

use anyhow::{anyhow, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    objects: BTreeMap<String, TopoObject>,
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TopoObject {
    GeometryCollection { geometries: Vec<TopoGeometry> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct TopoGeometry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    arcs: Option<Value>,
}

/// A decoded geometry with its id and properties.
#[derive(Debug, Clone)]
pub struct TopoFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
}

impl Topology {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decodes the named object, or the first object in name order when `name` is `None`.
    pub fn features(&self, name: Option<&str>) -> Result<Vec<TopoFeature>> {
        let (object_name, object) = match name {
            Some(n) => self
                .objects
                .get_key_value(n)
                .ok_or_else(|| anyhow!("TopoJSON has no object named '{}'", n))?,
            None => self
                .objects
                .iter()
                .next()
                .ok_or_else(|| anyhow!("TopoJSON has no objects"))?,
        };

        let geometries = match object {
            TopoObject::GeometryCollection { geometries } => geometries,
            TopoObject::Other => {
                return Err(anyhow!(
                    "TopoJSON object '{}' is not a GeometryCollection",
                    object_name
                ))
            }
        };

        let arcs = self.decode_arcs();
        let mut features = Vec::with_capacity(geometries.len());

        for geometry in geometries {
            let rings_by_polygon: Vec<Vec<Vec<i64>>> = match (geometry.kind.as_deref(), &geometry.arcs) {
                (Some("Polygon"), Some(a)) => vec![serde_json::from_value(a.clone())?],
                (Some("MultiPolygon"), Some(a)) => serde_json::from_value(a.clone())?,
                _ => continue, // points, lines and null geometries have no fill
            };

            let polygons = rings_by_polygon
                .iter()
                .map(|rings| build_polygon(&arcs, rings))
                .collect::<Result<Vec<_>>>()?;

            features.push(TopoFeature {
                id: geometry.id.as_ref().and_then(value_to_id),
                properties: geometry.properties.clone().unwrap_or_default(),
                geometry: MultiPolygon::new(polygons),
            });
        }

        Ok(features)
    }

    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    // positions are deltas from the previous point in quantized space
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect(),
            })
            .collect()
    }
}

pub fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn build_polygon(arcs: &[Vec<Coord<f64>>], rings: &[Vec<i64>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| stitch_ring(arcs, r));
    let exterior = rings
        .next()
        .transpose()?
        .unwrap_or_else(|| LineString::new(vec![]));
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Joins arcs into one ring. `~i` (a negative index) means arc `i` reversed;
/// each arc after the first repeats the previous arc's last point, so it is dropped.
fn stitch_ring(arcs: &[Vec<Coord<f64>>], indices: &[i64]) -> Result<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::new();

    for &index in indices {
        let (arc_index, reversed) = if index < 0 {
            ((!index) as usize, true)
        } else {
            (index as usize, false)
        };
        let arc = arcs
            .get(arc_index)
            .ok_or_else(|| anyhow!("arc index {} out of range ({} arcs)", index, arcs.len()))?;

        let skip = usize::from(!coords.is_empty());
        if reversed {
            coords.extend(arc.iter().rev().skip(skip));
        } else {
            coords.extend(arc.iter().skip(skip));
        }
    }

    Ok(LineString::new(coords))
}
