use crate::error::{Error, Result};
use std::path::PathBuf;

/// Number of spatial clusters the chests are grouped into.
pub const CLUSTER_COUNT: usize = 22;

/// Location names, indexed by cluster label.
/// The order was curated by hand against the labels the clustering step
/// produces for the Chapter 2 Season 5 chest set, so it only holds for that
/// input and these clustering parameters.
pub const LOCATION_NAMES: [&str; CLUSTER_COUNT] = [
    "Salty Towers",
    "Coral Castle",
    "Catty Corner",
    "Steamy Stacks",
    "Misty Meadows",
    "Middle Area",
    "Pleasant Park",
    "Hunter's Haven",
    "Hydro 16",
    "Weeping Woods",
    "West Coast",
    "Frenzy Farm",
    "Slurpy Swamp",
    "Craggy Cliffs",
    "Holly Hedges",
    "Retail Row",
    "Bottom Island",
    "Dirty Docks",
    "Stealthy Stronghold",
    "Lazy Lake",
    "Sweaty Sands",
    "Colossal Coliseum",
];

pub const COORDINATES_FILE: &str = "ChestCoordinates.txt";
pub const MAP_FILE: &str = "Fortnite-Chapter-2-Season-5-Map.jpg";
pub const TITLE: &str = "Chest Locations in Fortnite";

/// Data-space rectangle covered by the background map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// The map image spans x in [0,256] and y in [-256,0].
pub const MAP_EXTENT: Extent = Extent {
    x_min: 0.0,
    x_max: 256.0,
    y_min: -256.0,
    y_max: 0.0,
};

/// Every tunable of the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub coordinates_path: PathBuf,
    pub map_path: PathBuf,
    pub cluster_count: usize,
    pub location_names: Vec<String>,
    pub extent: Extent,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            coordinates_path: PathBuf::from(COORDINATES_FILE),
            map_path: PathBuf::from(MAP_FILE),
            cluster_count: CLUSTER_COUNT,
            location_names: LOCATION_NAMES.iter().map(|s| s.to_string()).collect(),
            extent: MAP_EXTENT,
            title: TITLE.to_string(),
            width: 1200,
            height: 800,
        }
    }
}

impl Config {
    /// Checked before any clustering runs: every label the clusterer can
    /// produce must have a name.
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 {
            return Err(Error::config("cluster count must be at least 1"));
        }
        if self.location_names.len() != self.cluster_count {
            return Err(Error::config(format!(
                "{} location names for {} clusters",
                self.location_names.len(),
                self.cluster_count
            )));
        }
        if !(self.extent.width() > 0.0 && self.extent.height() > 0.0) {
            return Err(Error::config(format!("empty map extent {:?}", self.extent)));
        }
        if self.width < 16 || self.height < 16 {
            return Err(Error::config(format!(
                "figure size {}x{} is too small",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.location_names.len(), CLUSTER_COUNT);
        assert_eq!(config.location_names[0], "Salty Towers");
        assert_eq!(config.location_names[21], "Colossal Coliseum");
    }

    #[test]
    fn short_name_list_is_rejected() {
        let mut config = Config::default();
        config.location_names.pop();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_clusters_is_rejected() {
        let config = Config {
            cluster_count: 0,
            location_names: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn extent_contains_map_corners() {
        assert!(MAP_EXTENT.contains(0.0, 0.0));
        assert!(MAP_EXTENT.contains(256.0, -256.0));
        assert!(!MAP_EXTENT.contains(128.0, 10.0));
    }
}
