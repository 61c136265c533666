//! Configuration for loading and projecting tracks
//!
//! Projection parameters are always supplied by the analyst; nothing here
//! guesses a UTM zone from the data.

use movetrack_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column layout and parsing options for a delimited track file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Field delimiter (tab for Movebank exports)
    pub delimiter: u8,
    /// Column holding the fix timestamp
    pub timestamp_column: String,
    /// Column holding the longitude in degrees
    pub longitude_column: String,
    /// Column holding the latitude in degrees
    pub latitude_column: String,
    /// Column holding the individual identifier
    pub individual_column: String,
    /// Column holding the tag identifier (optional in the file)
    pub tag_column: String,
    /// Timestamp layouts (`chrono` syntax); empty means the built-in list
    pub timestamp_formats: Vec<String>,
    /// Extra numeric columns carried along as covariates
    pub covariate_columns: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::movebank()
    }
}

impl LoaderConfig {
    /// Tab-separated Movebank export with its standard column names
    pub fn movebank() -> Self {
        Self {
            delimiter: b'\t',
            timestamp_column: "timestamp".to_string(),
            longitude_column: "location-long".to_string(),
            latitude_column: "location-lat".to_string(),
            individual_column: "individual-local-identifier".to_string(),
            tag_column: "tag-local-identifier".to_string(),
            timestamp_formats: Vec::new(),
            covariate_columns: Vec::new(),
        }
    }

    /// Comma-separated file with Movebank column names
    pub fn movebank_csv() -> Self {
        Self {
            delimiter: b',',
            ..Self::movebank()
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the names of the required columns
    pub fn with_columns(
        mut self,
        timestamp: &str,
        longitude: &str,
        latitude: &str,
        individual: &str,
    ) -> Self {
        self.timestamp_column = timestamp.to_string();
        self.longitude_column = longitude.to_string();
        self.latitude_column = latitude.to_string();
        self.individual_column = individual.to_string();
        self
    }

    /// Add an explicit timestamp layout
    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_formats.push(format.to_string());
        self
    }

    /// Carry the named numeric columns as covariates
    pub fn with_covariates<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.covariate_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Reference ellipsoid for the transverse Mercator projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Ellipsoid {
    Wgs84,
    Grs80,
    Custom {
        semi_major_axis: f64,
        inverse_flattening: f64,
    },
}

impl Ellipsoid {
    /// Semi-major axis in metres
    pub fn semi_major_axis(&self) -> f64 {
        match self {
            Ellipsoid::Wgs84 | Ellipsoid::Grs80 => 6_378_137.0,
            Ellipsoid::Custom { semi_major_axis, .. } => *semi_major_axis,
        }
    }

    /// Flattening `f`
    pub fn flattening(&self) -> f64 {
        match self {
            Ellipsoid::Wgs84 => 1.0 / 298.257_223_563,
            Ellipsoid::Grs80 => 1.0 / 298.257_222_101,
            Ellipsoid::Custom {
                inverse_flattening, ..
            } => 1.0 / inverse_flattening,
        }
    }

    fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "WGS84" => Ok(Ellipsoid::Wgs84),
            "GRS80" => Ok(Ellipsoid::Grs80),
            other => Err(Error::Configuration(format!(
                "unsupported ellipsoid '{other}'"
            ))),
        }
    }

    fn from_datum(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "WGS84" => Ok(Ellipsoid::Wgs84),
            "NAD83" | "ETRS89" => Ok(Ellipsoid::Grs80),
            other => Err(Error::Configuration(format!("unsupported datum '{other}'"))),
        }
    }
}

/// UTM hemisphere, selecting the false northing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

/// Universal Transverse Mercator projection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// UTM zone, 1 to 60
    pub zone: u8,
    pub hemisphere: Hemisphere,
    pub ellipsoid: Ellipsoid,
}

impl ProjectionConfig {
    /// UTM zone on the WGS84 ellipsoid
    pub fn utm(zone: u8, hemisphere: Hemisphere) -> Result<Self> {
        let config = Self {
            zone,
            hemisphere,
            ellipsoid: Ellipsoid::Wgs84,
        };
        config.validate()?;
        Ok(config)
    }

    /// Use a different ellipsoid
    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    /// Longitude of the zone's central meridian in degrees
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.zone) * 6.0 - 183.0
    }

    /// Check zone range and ellipsoid parameters
    pub fn validate(&self) -> Result<()> {
        if !(1..=60).contains(&self.zone) {
            return Err(Error::Configuration(format!(
                "UTM zone {} is out of range 1-60",
                self.zone
            )));
        }
        let a = self.ellipsoid.semi_major_axis();
        let f = self.ellipsoid.flattening();
        if !(a > 0.0) || !a.is_finite() || !(0.0..0.1).contains(&f) {
            return Err(Error::Configuration(format!(
                "ellipsoid parameters a={a}, f={f} are not usable"
            )));
        }
        Ok(())
    }

    /// Parse a PROJ-style definition such as `+proj=utm +zone=33 +south +datum=WGS84`
    ///
    /// Only UTM is supported. Missing zones, unknown keys and conflicting
    /// ellipsoid/datum declarations are configuration errors.
    pub fn from_proj_str(definition: &str) -> Result<Self> {
        let mut projection = None;
        let mut zone = None;
        let mut hemisphere = None;
        let mut ellipsoid: Option<Ellipsoid> = None;

        let mut set_hemisphere = |value: Hemisphere| -> Result<()> {
            match hemisphere {
                Some(existing) if existing != value => Err(Error::Configuration(
                    "both +north and +south given".to_string(),
                )),
                _ => {
                    hemisphere = Some(value);
                    Ok(())
                }
            }
        };

        let mut declared_ellipsoids = Vec::new();
        let mut semi_major_axis = None;
        let mut inverse_flattening = None;
        let parse_number = |key: &str, v: &str| -> Result<f64> {
            v.parse::<f64>()
                .map_err(|_| Error::Configuration(format!("+{key}={v} is not a number")))
        };
        for token in definition.split_whitespace() {
            let token = token.strip_prefix('+').ok_or_else(|| {
                Error::Configuration(format!("malformed projection token '{token}'"))
            })?;
            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (token, None),
            };
            match (key, value) {
                ("proj", Some(v)) => projection = Some(v.to_string()),
                ("zone", Some(v)) => {
                    let parsed = v.parse::<u8>().map_err(|_| {
                        Error::Configuration(format!("UTM zone '{v}' is not a number"))
                    })?;
                    if zone.is_some_and(|z| z != parsed) {
                        return Err(Error::Configuration("conflicting +zone values".to_string()));
                    }
                    zone = Some(parsed);
                }
                ("south", None) => set_hemisphere(Hemisphere::South)?,
                ("north", None) => set_hemisphere(Hemisphere::North)?,
                ("ellps", Some(v)) => declared_ellipsoids.push(Ellipsoid::from_name(v)?),
                ("datum", Some(v)) => declared_ellipsoids.push(Ellipsoid::from_datum(v)?),
                ("a", Some(v)) => semi_major_axis = Some(parse_number("a", v)?),
                ("rf", Some(v)) => inverse_flattening = Some(parse_number("rf", v)?),
                ("units", Some("m")) => {}
                ("units", Some(v)) => {
                    return Err(Error::Configuration(format!("unsupported units '{v}'")))
                }
                ("towgs84", Some(v)) => {
                    if v.split(',').any(|c| c.trim().parse::<f64>().map_or(true, |x| x != 0.0)) {
                        return Err(Error::Configuration(format!(
                            "datum shift +towgs84={v} is not supported"
                        )));
                    }
                }
                ("no_defs", None) | ("type", Some("crs")) => {}
                (other, _) => {
                    return Err(Error::Configuration(format!(
                        "unsupported projection parameter '+{other}'"
                    )))
                }
            }
        }

        match (semi_major_axis, inverse_flattening) {
            (Some(semi_major_axis), Some(inverse_flattening)) => {
                declared_ellipsoids.push(Ellipsoid::Custom {
                    semi_major_axis,
                    inverse_flattening,
                })
            }
            (None, None) => {}
            _ => {
                return Err(Error::Configuration(
                    "+a and +rf must be given together".to_string(),
                ))
            }
        }

        for declared in declared_ellipsoids {
            match ellipsoid {
                Some(existing) if existing != declared => {
                    return Err(Error::Configuration(
                        "ellipsoid and datum declarations disagree".to_string(),
                    ))
                }
                _ => ellipsoid = Some(declared),
            }
        }

        match projection.as_deref() {
            Some("utm") => {}
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "unsupported projection '{other}', only utm is available"
                )))
            }
            None => return Err(Error::Configuration("missing +proj".to_string())),
        }

        let zone = zone.ok_or_else(|| Error::Configuration("missing +zone for utm".to_string()))?;
        let config = Self {
            zone,
            hemisphere: hemisphere.unwrap_or(Hemisphere::North),
            ellipsoid: ellipsoid.unwrap_or(Ellipsoid::Wgs84),
        };
        config.validate()?;
        Ok(config)
    }
}

impl FromStr for ProjectionConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_proj_str(s)
    }
}

impl fmt::Display for ProjectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+proj=utm +zone={}", self.zone)?;
        if self.hemisphere == Hemisphere::South {
            write!(f, " +south")?;
        }
        match self.ellipsoid {
            Ellipsoid::Wgs84 => write!(f, " +ellps=WGS84"),
            Ellipsoid::Grs80 => write!(f, " +ellps=GRS80"),
            Ellipsoid::Custom {
                semi_major_axis,
                inverse_flattening,
            } => write!(f, " +a={semi_major_axis} +rf={inverse_flattening}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proj_string() {
        let config: ProjectionConfig = "+proj=utm +zone=33 +south +datum=WGS84 +units=m +no_defs"
            .parse()
            .unwrap();
        assert_eq!(config.zone, 33);
        assert_eq!(config.hemisphere, Hemisphere::South);
        assert_eq!(config.ellipsoid, Ellipsoid::Wgs84);
        assert_eq!(config.central_meridian(), 15.0);
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let config = ProjectionConfig::utm(17, Hemisphere::North)
            .unwrap()
            .with_ellipsoid(Ellipsoid::Grs80);
        let reparsed = ProjectionConfig::from_proj_str(&config.to_string()).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn test_unsupported_and_ambiguous_metadata() {
        let cases = [
            "+proj=longlat +datum=WGS84",
            "+proj=utm +datum=WGS84",
            "+proj=utm +zone=61",
            "+proj=utm +zone=10 +north +south",
            "+proj=utm +zone=10 +ellps=GRS80 +datum=WGS84",
            "+proj=utm +zone=10 +units=us-ft",
            "+proj=utm +zone=10 +towgs84=1,2,3",
            "+proj=utm +zone=10 +lat_0=5",
            "proj=utm zone=10",
        ];
        for case in cases {
            match ProjectionConfig::from_proj_str(case) {
                Err(Error::Configuration(_)) => {}
                other => panic!("{case} should be a configuration error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_custom_ellipsoid() {
        let config = ProjectionConfig::from_proj_str("+proj=utm +zone=32 +a=6378388 +rf=297").unwrap();
        assert_eq!(
            config.ellipsoid,
            Ellipsoid::Custom { semi_major_axis: 6_378_388.0, inverse_flattening: 297.0 }
        );
        assert_eq!(ProjectionConfig::from_proj_str(&config.to_string()).unwrap(), config);
        assert!(ProjectionConfig::from_proj_str("+proj=utm +zone=32 +a=6378388").is_err());
    }

    #[test]
    fn test_zone_range() {
        assert!(ProjectionConfig::utm(0, Hemisphere::North).is_err());
        assert!(ProjectionConfig::utm(60, Hemisphere::South).is_ok());
    }

    #[test]
    fn test_loader_presets() {
        let config = LoaderConfig::movebank_csv().with_covariates(["temperature"]);
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.longitude_column, "location-long");
        assert_eq!(config.covariate_columns, vec!["temperature".to_string()]);
    }
}
