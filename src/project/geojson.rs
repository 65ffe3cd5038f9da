use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

/// A GeoJSON feature reduced to its properties and (multi)polygon geometry.
pub type Feature = (Map<String, Value>, Option<MultiPolygon<f64>>);

/// Convert a MultiPolygon into a GeoJSON geometry object.
pub fn geometry_to_json(shape: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| -> Vec<[f64; 2]> { ls.coords().map(|c| [c.x, c.y]).collect() };
    let polygons: Vec<Vec<Vec<[f64; 2]>>> = shape.0.iter()
        .map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()).map(ring).collect())
        .collect();
    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// Parse a GeoJSON `Polygon`/`MultiPolygon` geometry. `null` yields `None`.
pub fn geometry_from_json(value: &Value) -> Result<Option<MultiPolygon<f64>>> {
    if value.is_null() { return Ok(None) }
    let coords = value["coordinates"].as_array().ok_or_else(|| anyhow!("Geometry has no coordinates"))?;
    match value["type"].as_str() {
        Some("Polygon") => Ok(Some(MultiPolygon(vec![parse_polygon(coords)?]))),
        Some("MultiPolygon") => {
            let polygons = coords.iter()
                .map(|polygon| parse_polygon(polygon.as_array().ok_or_else(|| anyhow!("Invalid polygon"))?))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(MultiPolygon(polygons)))
        }
        other => bail!("Unsupported geometry type {other:?}"),
    }
}

/// Rings of one polygon: exterior first, then holes.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| parse_ring(ring.as_array().ok_or_else(|| anyhow!("Invalid ring"))?));
    let exterior = rings.next().ok_or_else(|| anyhow!("Polygon is missing its exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter().map(|pair| {
        let x = pair[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
        let y = pair[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
        Ok(Coord { x, y })
    }).collect::<Result<Vec<_>>>()?;

    // Close the ring
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }
    Ok(LineString(points))
}

/// Serialize features into a GeoJSON FeatureCollection.
pub fn write_feature_collection<'a>(features: impl IntoIterator<Item = (Map<String, Value>, Option<&'a MultiPolygon<f64>>)>) -> Result<Vec<u8>> {
    let features: Vec<Value> = features.into_iter()
        .map(|(properties, geometry)| json!({
            "type": "Feature",
            "geometry": geometry.map_or(Value::Null, geometry_to_json),
            "properties": properties,
        }))
        .collect();
    let collection = json!({ "type": "FeatureCollection", "features": features });
    serde_json::to_vec(&collection).context("Failed to serialize GeoJSON to bytes")
}

/// Parse the features of a GeoJSON FeatureCollection.
pub fn read_feature_collection(bytes: &[u8]) -> Result<Vec<Feature>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    let features = value["features"].as_array().ok_or_else(|| anyhow!("GeoJSON has no feature array"))?;
    features.iter().enumerate().map(|(i, feature)| {
        let properties = feature["properties"].as_object().cloned().unwrap_or_default();
        let geometry = geometry_from_json(&feature["geometry"]).with_context(|| format!("Invalid geometry in feature {i}"))?;
        Ok((properties, geometry))
    }).collect()
}
