use geo::{Distance, Euclidean, Haversine, Point};
use geo_types::{LineString, Polygon};
use serde::{Deserialize, Serialize};

use super::error::Error;

/// Axis-aligned region in WGS84 degrees. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a bounding box, in the `(minLon, minLat, maxLon, maxLat)` order of the Overpass API.
    ///
    /// # Returns
    /// `Error::Config` if the box is degenerate (min >= max on either axis) or not finite.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<BoundingBox, Error> {
        let bbox = BoundingBox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let corners = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(Error::Config(format!("bounding box {:?} is not finite", self)));
        }
        if self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(Error::Config(format!("bounding box {:?} is degenerate", self)));
        }
        Ok(())
    }

    /// Whether the coordinate lies inside the box, edges included.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.min_lon <= lon && lon <= self.max_lon && self.min_lat <= lat && lat <= self.max_lat
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Closed outline of the box, x = longitude, y = latitude
    pub fn to_polygon(&self) -> Polygon {
        let exterior = LineString::from(vec![
            (self.min_lon, self.min_lat),
            (self.max_lon, self.min_lat),
            (self.max_lon, self.max_lat),
            (self.min_lon, self.max_lat),
            (self.min_lon, self.min_lat),
        ]);
        Polygon::new(exterior, vec![])
    }
}

/// Straight-line distance in coordinate space (degrees). This is the edge weight of the road graph.
pub fn planar_distance(a: Point, b: Point) -> f64 {
    Euclidean::distance(a, b)
}

/// Great-circle distance in meters between two points given as (lon, lat).
pub fn haversine(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    Haversine::distance(Point::new(x1, y1), Point::new(x2, y2))
}

/// Integer key of a coordinate rounded to `precision` decimal places.
/// Coordinates that agree up to that precision share a key.
pub fn coord_key(lat: f64, lon: f64, precision: u32) -> (i64, i64) {
    let scale = 10f64.powi(precision as i32);
    ((lat * scale).round() as i64, (lon * scale).round() as i64)
}
