//! UTM zone resolution
//!
//! Longitudes are split into sixty six-degree bands numbered eastward from the
//! antimeridian; the hemisphere follows the sign of the latitude. A longitude that
//! falls exactly on a band edge belongs to the lower-numbered band, so `lon = 0`
//! resolves to zone 30 rather than 31.

use super::GeoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ZONE_WIDTH_DEG: f64 = 6.0;
pub const ZONE_COUNT: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

/// A UTM zone: band number 1..=60 plus hemisphere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

impl UtmZone {
    pub fn new(number: u8, hemisphere: Hemisphere) -> Result<Self, GeoError> {
        if !(1..=ZONE_COUNT).contains(&number) {
            return Err(GeoError::InvalidZone(number.to_string()));
        }
        Ok(Self { number, hemisphere })
    }

    #[inline]
    pub fn number(&self) -> u8 {
        self.number
    }

    #[inline]
    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// Longitude of the zone's central meridian in degrees
    pub fn central_meridian(&self) -> f64 {
        -183.0 + ZONE_WIDTH_DEG * self.number as f64
    }

    /// WGS 84 / UTM EPSG code (326NN north, 327NN south)
    pub fn epsg(&self) -> u32 {
        let base = match self.hemisphere {
            Hemisphere::North => 32600,
            Hemisphere::South => 32700,
        };
        base + self.number as u32
    }

    /// Parse an EPSG code of the WGS 84 / UTM family
    pub fn from_epsg(code: u32) -> Option<Self> {
        let (hemisphere, number) = match code {
            32601..=32660 => (Hemisphere::North, code - 32600),
            32701..=32760 => (Hemisphere::South, code - 32700),
            _ => return None,
        };
        Some(Self { number: number as u8, hemisphere })
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = match self.hemisphere {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        };
        write!(f, "{}{}", self.number, h)
    }
}

impl FromStr for UtmZone {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || GeoError::InvalidZone(s.to_string());
        let hemisphere = match s.chars().last() {
            Some('N' | 'n') => Hemisphere::North,
            Some('S' | 's') => Hemisphere::South,
            _ => return Err(invalid()),
        };
        let number = s[..s.len() - 1].parse::<u8>().map_err(|_| invalid())?;
        Self::new(number, hemisphere)
    }
}

impl TryFrom<String> for UtmZone {
    type Error = GeoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UtmZone> for String {
    fn from(zone: UtmZone) -> Self {
        zone.to_string()
    }
}

/// Select the UTM zone used to measure distances around `(lon, lat)`.
///
/// Norway/Svalbard zone exceptions are not applied.
pub fn resolve_zone(lon: f64, lat: f64) -> Result<UtmZone, GeoError> {
    validate_coordinate(lon, lat)?;

    // Bands are (lower, upper]; ceil puts an exact edge in the lower band
    let band = ((lon + 180.0) / ZONE_WIDTH_DEG).ceil() as i64;
    let number = band.clamp(1, ZONE_COUNT as i64) as u8;
    let hemisphere = if lat >= 0.0 { Hemisphere::North } else { Hemisphere::South };

    Ok(UtmZone { number, hemisphere })
}

pub(crate) fn validate_coordinate(lon: f64, lat: f64) -> Result<(), GeoError> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(GeoError::InvalidCoordinate { lon, lat });
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(GeoError::InvalidCoordinate { lon, lat });
    }
    Ok(())
}
