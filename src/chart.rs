//! Chart specifications: what to draw, independent of how it is drawn.

use crate::config::{Config, Extent};
use crate::table::LocationTable;
use rustc_hash::FxHashMap;

pub type Rgb = (u8, u8, u8);

/// Axes background (seaborn "darkgrid" face color).
pub const PANEL_BACKGROUND: Rgb = (234, 234, 242);
pub const LABEL_COLOR: Rgb = (255, 255, 255);
pub const TITLE_COLOR: Rgb = (0, 0, 0);

/// Categorical palette with `n` evenly spaced hues, matching seaborn's
/// `hls_palette(n)` (hue offset 0.01, lightness 0.6, saturation 0.65).
pub fn hls_palette(n: usize) -> Vec<Rgb> {
    const HUE_OFFSET: f64 = 0.01;
    const LIGHTNESS: f64 = 0.6;
    const SATURATION: f64 = 0.65;

    (0..n)
        .map(|i| {
            let hue = (i as f64 / n as f64 + HUE_OFFSET).rem_euclid(1.0);
            hls_to_rgb(hue, LIGHTNESS, SATURATION)
        })
        .collect()
}

fn hls_to_rgb(h: f64, l: f64, s: f64) -> Rgb {
    let to_u8 = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    if s == 0.0 {
        let v = to_u8(l);
        return (v, v, v);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        to_u8(hue_channel(m1, m2, h + 1.0 / 3.0)),
        to_u8(hue_channel(m1, m2, h)),
        to_u8(hue_channel(m1, m2, h - 1.0 / 3.0)),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

/// Pixel rectangle on the figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub color: Rgb,
}

/// Every point over the map, colored by location, diamond markers,
/// no legend, ticks or grid.
#[derive(Debug, Clone)]
pub struct ScatterSpec {
    pub points: Vec<ScatterPoint>,
    pub extent: Extent,
    /// Half-diagonal of the diamond marker, in pixels.
    pub marker_radius: f64,
}

impl ScatterSpec {
    /// Largest rectangle with the extent's aspect ratio, centred in `panel`.
    /// The map and the points both go here, so neither is stretched.
    pub fn plot_area(&self, panel: &Rect) -> Rect {
        let aspect = self.extent.width() / self.extent.height();
        let (w, h) = if panel.w / panel.h > aspect {
            (panel.h * aspect, panel.h)
        } else {
            (panel.w, panel.w / aspect)
        };
        Rect {
            x: panel.x + (panel.w - w) / 2.0,
            y: panel.y + (panel.h - h) / 2.0,
            w,
            h,
        }
    }

    /// Map a data coordinate into `rect`; `None` when outside the extent.
    pub fn project(&self, rect: &Rect, x: f64, y: f64) -> Option<(f64, f64)> {
        if !self.extent.contains(x, y) {
            return None;
        }
        let px = rect.x + (x - self.extent.x_min) / self.extent.width() * rect.w;
        let py = rect.y + (self.extent.y_max - y) / self.extent.height() * rect.h;
        Some((px, py))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub count: usize,
    pub color: Rgb,
}

/// Horizontal bars of points per location, largest first.
#[derive(Debug, Clone)]
pub struct BarSpec {
    pub bars: Vec<Bar>,
}

/// Where a bar and its count label go inside the bar panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub rect: Rect,
    pub label_x: f64,
    pub label_y: f64,
}

impl BarSpec {
    pub fn total(&self) -> usize {
        self.bars.iter().map(|b| b.count).sum()
    }

    /// One band per bar; bars fill 80% of their band and the longest bar
    /// leaves a 5% margin to the panel edge.
    pub fn layout(&self, panel: &Rect) -> Vec<BarGeometry> {
        let max_count = self.bars.iter().map(|b| b.count).max().unwrap_or(0);
        if max_count == 0 {
            return Vec::new();
        }
        let band = panel.h / self.bars.len() as f64;
        let scale = panel.w / (max_count as f64 * 1.05);

        self.bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let top = panel.y + i as f64 * band + 0.1 * band;
                let rect = Rect {
                    x: panel.x,
                    y: top,
                    w: bar.count as f64 * scale,
                    h: 0.8 * band,
                };
                BarGeometry {
                    rect,
                    label_x: panel.x + 5.0,
                    label_y: top + 0.4 * band,
                }
            })
            .collect()
    }
}

/// The whole figure: title band on top, scatter left, bars right, no gap.
#[derive(Debug, Clone)]
pub struct FigureSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub scatter: ScatterSpec,
    pub bars: BarSpec,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureLayout {
    pub title: Rect,
    pub scatter: Rect,
    pub bars: Rect,
}

impl FigureSpec {
    pub fn build(table: &LocationTable, config: &Config) -> Self {
        let levels = table.levels();
        // one hue per location even if the table has more names than clusters
        let palette = hls_palette(config.cluster_count.max(levels.len()));
        let colors: FxHashMap<&str, Rgb> = levels.into_iter().zip(palette).collect();

        let points = table
            .rows()
            .iter()
            .map(|row| ScatterPoint {
                x: row.x,
                y: row.y,
                color: colors[row.location.as_str()],
            })
            .collect();

        let mut bars: Vec<Bar> = table
            .counts()
            .into_iter()
            .map(|(name, count)| Bar {
                label: name.to_string(),
                count,
                color: colors[name],
            })
            .collect();
        // stable: equal counts keep first-appearance order
        bars.sort_by(|a, b| b.count.cmp(&a.count));

        let marker_radius = (config.width.min(config.height) as f64 / 160.0).max(2.0);

        FigureSpec {
            title: config.title.clone(),
            width: config.width,
            height: config.height,
            scatter: ScatterSpec {
                points,
                extent: config.extent,
                marker_radius,
            },
            bars: BarSpec { bars },
        }
    }

    /// The title takes the top 15%; the two panels share the rest.
    pub fn layout(&self) -> FigureLayout {
        let w = self.width as f64;
        let h = self.height as f64;
        let margin = (w.min(h) * 0.02).round();
        let title_h = (h * 0.15).round();
        let panel_w = ((w - 2.0 * margin) / 2.0).floor();
        let panel_h = h - title_h - margin;

        let scatter = Rect { x: margin, y: title_h, w: panel_w, h: panel_h };
        let bars = Rect { x: scatter.right(), y: title_h, w: panel_w, h: panel_h };
        FigureLayout {
            title: Rect { x: 0.0, y: 0.0, w, h: title_h },
            scatter,
            bars,
        }
    }
}
