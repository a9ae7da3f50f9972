//! Turning cluster labels into place names.
//!
//! Cluster labels carry no meaning of their own. `Positional` naming trusts
//! that label `i` lands on the place listed at `names[i]`, which only holds
//! for the exact input and clustering parameters the list was curated
//! against. `Regions` naming looks at where each cluster actually sits on
//! the map instead.

use crate::cluster::ClusteringResult;
use crate::error::{Error, Result};
use crate::parse::Point;
use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A named axis-aligned rectangle in map coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Region {
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    fn center(&self) -> Point {
        Point {
            x: (self.x_min + self.x_max) / 2.0,
            y: (self.y_min + self.y_max) / 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LocationNamer {
    /// Label `i` is called `names[i]`.
    Positional(Vec<String>),
    /// A cluster is called after the region containing its centroid, or
    /// the region whose centre is nearest when none contains it.
    Regions(Vec<Region>),
}

impl LocationNamer {
    /// Name per cluster label.
    pub fn cluster_names(&self, clustering: &ClusteringResult) -> Result<Vec<String>> {
        match self {
            LocationNamer::Positional(names) => {
                if clustering.num_clusters > names.len() {
                    return Err(Error::Naming(format!(
                        "{} clusters but only {} names",
                        clustering.num_clusters,
                        names.len()
                    )));
                }
                Ok(names[..clustering.num_clusters].to_vec())
            }
            LocationNamer::Regions(regions) => {
                if regions.is_empty() && clustering.num_clusters > 0 {
                    return Err(Error::Naming("no regions to name clusters with".to_string()));
                }
                Ok(clustering
                    .centroids
                    .iter()
                    .map(|c| name_by_region(regions, c))
                    .collect())
            }
        }
    }

    /// Name per point, same order and count as the clustered points.
    pub fn assign(&self, clustering: &ClusteringResult) -> Result<Vec<String>> {
        let names = self.cluster_names(clustering)?;
        for (label, name) in names.iter().enumerate() {
            debug!("Cluster {} -> {}", label, name);
        }
        clustering
            .labels
            .iter()
            .map(|&label| {
                names.get(label).cloned().ok_or_else(|| {
                    Error::Naming(format!("label {} has no name", label))
                })
            })
            .collect()
    }
}

fn name_by_region(regions: &[Region], centroid: &Point) -> String {
    if let Some(region) = regions.iter().find(|r| r.contains(centroid)) {
        return region.name.clone();
    }
    let mut best = &regions[0];
    let mut best_dist = f64::INFINITY;
    for region in regions {
        let c = region.center();
        let d = (c.x - centroid.x).powi(2) + (c.y - centroid.y).powi(2);
        if d < best_dist {
            best_dist = d;
            best = region;
        }
    }
    best.name.clone()
}

/// Load named regions, one per line: `name<TAB>x0,y0,x1,y1`.
pub fn load_regions(path: &Path) -> Result<Vec<Region>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut regions = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let bad_line = |why: &str| {
            Error::config(format!("{:?} line {}: {}", path, line_no + 1, why))
        };

        let (name, bounds) = line.split_once('\t').ok_or_else(|| bad_line("missing tab"))?;
        let values: Vec<f64> = bounds
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| bad_line("bounds are not numbers"))?;
        if values.len() != 4 {
            return Err(bad_line("expected x0,y0,x1,y1"));
        }

        regions.push(Region {
            name: name.trim().to_string(),
            x_min: values[0].min(values[2]),
            y_min: values[1].min(values[3]),
            x_max: values[0].max(values[2]),
            y_max: values[1].max(values[3]),
        });
    }

    info!("Loaded {} named regions from {:?}", regions.len(), path);
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn clustering(labels: Vec<usize>, centroids: Vec<Point>) -> ClusteringResult {
        let num_clusters = centroids.len();
        let mut sizes = vec![0; num_clusters];
        for &l in &labels {
            sizes[l] += 1;
        }
        ClusteringResult { labels, num_clusters, sizes, centroids }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positional_names_follow_labels() {
        let c = clustering(
            vec![0, 1, 0],
            vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
        );
        let namer = LocationNamer::Positional(names(&["A", "B"]));
        assert_eq!(namer.assign(&c).unwrap(), names(&["A", "B", "A"]));
    }

    #[test]
    fn positional_with_too_few_names_fails() {
        let c = clustering(
            vec![0, 1, 2],
            vec![Point { x: 0.0, y: 0.0 }; 3],
        );
        let namer = LocationNamer::Positional(names(&["A", "B"]));
        assert!(matches!(namer.assign(&c), Err(Error::Naming(_))));
    }

    #[test]
    fn regions_name_by_centroid() {
        let regions = vec![
            Region { name: "North".into(), x_min: 0.0, y_min: -50.0, x_max: 256.0, y_max: 0.0 },
            Region { name: "South".into(), x_min: 0.0, y_min: -256.0, x_max: 256.0, y_max: -200.0 },
        ];
        // second centroid lies in neither region but is closer to South's centre
        let c = clustering(
            vec![1, 0, 1],
            vec![Point { x: 10.0, y: -10.0 }, Point { x: 128.0, y: -190.0 }],
        );
        let namer = LocationNamer::Regions(regions);
        assert_eq!(namer.assign(&c).unwrap(), names(&["South", "North", "South"]));
    }

    #[test]
    fn regions_need_at_least_one_entry() {
        let c = clustering(vec![0], vec![Point { x: 0.0, y: 0.0 }]);
        assert!(LocationNamer::Regions(Vec::new()).assign(&c).is_err());
    }

    #[test]
    fn loads_region_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# name\tbounds").unwrap();
        writeln!(file, "Pleasant Park\t60,-80,40,-60").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "Retail Row\t170, -130, 190, -110").unwrap();
        let regions = load_regions(file.path()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "Pleasant Park");
        assert_eq!(regions[0].x_min, 40.0);
        assert_eq!(regions[0].y_max, -60.0);
        assert!(regions[1].contains(&Point { x: 180.0, y: -120.0 }));
    }

    #[test]
    fn malformed_region_line_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Lazy Lake\t1,2,3").unwrap();
        assert!(matches!(load_regions(file.path()), Err(Error::Config(_))));
    }
}
