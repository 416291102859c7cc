use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
}

impl Coordinates {
    /// Build a validated point, rejecting NaN and out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let coords = Self {
            latitude,
            longitude,
        };
        coords.validate()?;
        Ok(coords)
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.4}, {:.4}]", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for Coordinates {
    type Err = Error;

    /// Parse `"lat,lon"` as typed on a command line.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidCoordinates {
            latitude: f64::NAN,
            longitude: f64::NAN,
        };
        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let latitude = lat.trim().parse::<f64>().map_err(|_| invalid())?;
        let longitude = lon.trim().parse::<f64>().map_err(|_| invalid())?;
        Self::new(latitude, longitude)
    }
}
