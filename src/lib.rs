pub mod config;
pub mod gtfs;
pub mod layers;
pub mod roster;
