//! Coordinate reference normalisation for cached units

use crate::catalog::Crs;
use crate::geo::{TransverseMercator, UtmZone};

pub const WGS84_EPSG: u32 = 4326;

/// Reference system a cached unit's coordinates are expressed in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateReference {
    /// Geographic WGS 84 longitude/latitude
    Wgs84,
    /// WGS 84 / UTM easting/northing
    Utm(UtmZone),
}

/// How the reference was established
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detected {
    Declared(CoordinateReference),
    /// No `crs` member; WGS 84 assumed
    Assumed,
}

impl Detected {
    pub fn reference(&self) -> CoordinateReference {
        match self {
            Detected::Declared(reference) => *reference,
            Detected::Assumed => CoordinateReference::Wgs84,
        }
    }
}

/// Identify the reference of a collection, returning the unsupported name on failure
pub fn detect(crs: Option<&Crs>) -> Result<Detected, String> {
    let Some(crs) = crs else {
        return Ok(Detected::Assumed);
    };
    let name = crs.name().ok_or_else(|| format!("{} CRS without a name", crs.kind))?;
    parse_name(name).map(Detected::Declared).ok_or_else(|| name.to_string())
}

/// Accepts `EPSG:n`, `urn:ogc:def:crs:EPSG::n`, versioned URNs and the CRS84 aliases
pub fn parse_name(name: &str) -> Option<CoordinateReference> {
    let upper = name.trim().to_ascii_uppercase();
    if upper.ends_with("CRS84") {
        return Some(CoordinateReference::Wgs84);
    }

    let (_, after) = upper.split_once("EPSG")?;
    let code: u32 = after.rsplit(':').find(|part| !part.is_empty())?.trim().parse().ok()?;
    if code == WGS84_EPSG {
        return Some(CoordinateReference::Wgs84);
    }
    UtmZone::from_epsg(code).map(CoordinateReference::Utm)
}

/// Map a position to WGS 84 longitude/latitude
pub struct Normalizer {
    projection: Option<TransverseMercator>,
}

impl Normalizer {
    pub fn new(reference: CoordinateReference) -> Self {
        let projection = match reference {
            CoordinateReference::Wgs84 => None,
            CoordinateReference::Utm(zone) => Some(TransverseMercator::for_zone(zone)),
        };
        Self { projection }
    }

    pub fn to_lon_lat(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.projection {
            Some(tm) => tm.inverse(x, y),
            None => (x, y),
        }
    }
}
