//! Minimal GeoJSON model shared by catalog responses, boundary files and exports

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FEATURE_COLLECTION: &str = "FeatureCollection";
pub const FEATURE: &str = "Feature";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a FeatureCollection, found {0:?}")]
    NotACollection(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { kind: FEATURE_COLLECTION.to_string(), metadata: None, crs: None, features }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Parse a response body, rejecting anything that is not a FeatureCollection
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let collection: FeatureCollection = serde_json::from_slice(bytes)?;
        if collection.kind != FEATURE_COLLECTION {
            return Err(ParseError::NotACollection(collection.kind));
        }
        Ok(collection)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self { kind: FEATURE.to_string(), id: None, geometry: Some(geometry), properties }
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    /// A property rendered as text whether it was stored as a string or a number
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The feature id as text, accepting string or numeric ids
    pub fn id_text(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Geometry types this system reads; anything else deserializes as `Other`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    #[serde(other)]
    Other,
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point { coordinates: vec![lon, lat] }
    }

    /// `(x, y, z)` of a point geometry with at least two ordinates
    pub fn as_point(&self) -> Option<(f64, f64, Option<f64>)> {
        match self {
            Geometry::Point { coordinates } if coordinates.len() >= 2 => {
                Some((coordinates[0], coordinates[1], coordinates.get(2).copied()))
            },
            _ => None,
        }
    }

    /// Line geometries as polylines of `[x, y]`; `None` for non-line geometries
    pub fn as_lines(&self) -> Option<Vec<Vec<[f64; 2]>>> {
        let to_line =
            |coords: &Vec<Vec<f64>>| coords.iter().filter(|c| c.len() >= 2).map(|c| [c[0], c[1]]).collect();
        match self {
            Geometry::LineString { coordinates } => Some(vec![to_line(coordinates)]),
            Geometry::MultiLineString { coordinates } => Some(coordinates.iter().map(to_line).collect()),
            _ => None,
        }
    }
}

/// Legacy named CRS member (`{"type": "name", "properties": {"name": ...}}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Crs {
    pub fn named(name: &str) -> Self {
        let mut properties = Map::new();
        properties.insert("name".to_string(), Value::String(name.to_string()));
        Self { kind: "name".to_string(), properties }
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }
}
