use crate::error::{Error, Result};
use crate::parse::Point;
use log::info;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One chest: where it is and which place it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub location: String,
}

/// Row-per-point table, in input order.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    rows: Vec<PointRecord>,
}

impl LocationTable {
    pub fn from_parts(points: &[Point], locations: Vec<String>) -> Result<Self> {
        if points.len() != locations.len() {
            return Err(Error::Table(format!(
                "{} points but {} location names",
                points.len(),
                locations.len()
            )));
        }
        let rows = points
            .iter()
            .zip(locations)
            .map(|(p, location)| PointRecord { x: p.x, y: p.y, location })
            .collect();
        Ok(LocationTable { rows })
    }

    pub fn rows(&self) -> &[PointRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct location names in order of first appearance.
    pub fn levels(&self) -> Vec<&str> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut levels = Vec::new();
        for row in &self.rows {
            if seen.insert(row.location.as_str()) {
                levels.push(row.location.as_str());
            }
        }
        levels
    }

    /// Row count per location, in level order.
    pub fn counts(&self) -> Vec<(&str, usize)> {
        let levels = self.levels();
        let index: FxHashMap<&str, usize> =
            levels.iter().enumerate().map(|(i, &name)| (name, i)).collect();
        let mut counts = vec![0usize; levels.len()];
        for row in &self.rows {
            counts[index[row.location.as_str()]] += 1;
        }
        levels.into_iter().zip(counts).collect()
    }

    /// Save the table as TSV: `x_coord`, `y_coord`, `location`.
    pub fn write_tsv(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "x_coord\ty_coord\tlocation")?;
        for row in &self.rows {
            writeln!(out, "{}\t{}\t{}", row.x, row.y, row.location)?;
        }
        out.flush()?;
        info!("Location table saved to {:?}", path);
        Ok(())
    }
}
