pub mod error;
pub mod geojson;
pub mod gtfs;
pub mod structs;
