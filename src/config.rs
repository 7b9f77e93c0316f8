use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::layers::error::Error;
use crate::layers::geo_util::BoundingBox;
use crate::layers::zone::{ZoneClassifier, ZoneCenter};

/// Largest number of decimal places used to merge graph nodes
pub const MAX_COORDINATE_PRECISION: u32 = 12;

/// Parameters of one run. Missing keys in a config file take the default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Region kept by the spatial filter
    pub bbox: BoundingBox,
    /// Thresholds splitting the region into four zones
    pub zone_center: ZoneCenter,
    /// Decimal places a coordinate is rounded to before it becomes a graph node
    pub coordinate_precision: u32,
    /// Seed of the route color picker
    pub color_seed: u64,
}

impl Default for Config {
    /// Delhi
    fn default() -> Self {
        Config {
            bbox: BoundingBox {
                min_lon: 77.0,
                min_lat: 28.4,
                max_lon: 77.4,
                max_lat: 28.8,
            },
            zone_center: ZoneCenter::default(),
            coordinate_precision: 7,
            color_seed: 0,
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let reader = BufReader::new(File::open(path)?);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.bbox.validate()?;
        ZoneClassifier::new(self.zone_center)?;
        if self.coordinate_precision > MAX_COORDINATE_PRECISION {
            return Err(Error::Config(format!(
                "coordinate precision {} is above {}",
                self.coordinate_precision, MAX_COORDINATE_PRECISION
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"zone_center": {"lat": 19.07, "lon": 72.87}, "color_seed": 7}"#)
                .unwrap();
        assert_eq!(config.zone_center, ZoneCenter { lat: 19.07, lon: 72.87 });
        assert_eq!(config.color_seed, 7);
        assert_eq!(config.bbox, Config::default().bbox);
        assert_eq!(config.coordinate_precision, 7);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let mut config = Config::default();
        config.bbox.max_lat = config.bbox.min_lat;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.coordinate_precision = 20;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.zone_center.lon = 200.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_path("/definitely/not/a/config.json"),
            Err(Error::IO(_))
        ));
    }
}
