use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde_json::{json, Value};

use crate::layers::city::City;
use crate::layers::geo_util::BoundingBox;
use crate::layers::transit_network::RoutePath;

/// Colors a route line can be drawn with
pub const ROUTE_COLORS: [&str; 7] = ["blue", "green", "red", "purple", "orange", "brown", "pink"];

/// Picks route colors at random, reproducibly for a given seed
pub struct ColorPicker {
    rng: StdRng,
}

impl ColorPicker {
    pub fn new(seed: u64) -> Self {
        ColorPicker {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn pick(&mut self) -> &'static str {
        ROUTE_COLORS.choose(&mut self.rng).copied().unwrap_or(ROUTE_COLORS[0])
    }
}

pub fn convert_to_geojson(features: &Vec<Value>) -> Value {
    let output = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    return output;
}

/// Features handed to the map: route lines, stop markers and the outline of the bounding box
pub fn get_all_features(city: &City, routes: &[RoutePath]) -> Vec<Value> {
    let mut colors = ColorPicker::new(city.config.color_seed);
    let mut feature_set: Vec<Value> = vec![];
    feature_set.extend(get_route_features(routes, &mut colors));
    feature_set.extend(get_stop_features(city));
    feature_set.push(get_bbox_feature(&city.config.bbox));

    return feature_set;
}

// Build route features from stitched paths
pub fn get_route_features(routes: &[RoutePath], colors: &mut ColorPicker) -> Vec<Value> {
    let features = routes
        .iter()
        // A line needs two points
        .filter(|route| route.nodes.len() >= 2)
        .map(|route| {
            let coordinates: Vec<[f64; 2]> = route.nodes.iter().map(|node| node.x_y()).collect();
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": coordinates,
                },
                "properties": {
                    "trip_id": &route.trip_id,
                    "color": colors.pick(),
                    "segments": route.segments,
                    "length_m": route.length_meters(),
                }
            })
        })
        .collect::<Vec<Value>>();

    return features;
}

// Build stop markers, orphan and out-of-bounds stops get none
pub fn get_stop_features(city: &City) -> Vec<Value> {
    let features = city
        .gtfs
        .stops
        .iter()
        .filter(|stop| city.network.is_visible(&stop.stop_id))
        .map(|stop| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [stop.stop_lon, stop.stop_lat]
                },
                "properties": {
                    "stop_id": &stop.stop_id,
                    "stop_name": &stop.stop_name,
                }
            })
        })
        .collect::<Vec<Value>>();

    return features;
}

pub fn get_bbox_feature(bbox: &BoundingBox) -> Value {
    let ring: Vec<[f64; 2]> = bbox
        .to_polygon()
        .exterior()
        .coords()
        .map(|c| [c.x, c.y])
        .collect();
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [ring],
        },
        "properties": {
            "kind": "bbox",
        }
    })
}
