pub mod city;
pub mod error;
pub mod geo_util;
pub mod nearest;
pub mod road_network;
pub mod spatial_filter;
pub mod transit_network;
pub mod zone;
