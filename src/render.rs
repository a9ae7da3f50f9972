use crate::chart::{
    FigureSpec, Rect, Rgb, ScatterSpec, LABEL_COLOR, PANEL_BACKGROUND, TITLE_COLOR,
};
use crate::error::Result;
use crate::font::{draw_text, text_width, GLYPH_SIZE};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb as Pixel, RgbImage};
use log::{debug, info};
use std::path::Path;

const WHITE: Rgb = (255, 255, 255);

/// Load the background map.
pub fn load_map(path: &Path) -> Result<DynamicImage> {
    info!("Loading map image {:?}...", path);
    let img = image::open(path)?;
    debug!("Map image is {}x{}", img.width(), img.height());
    Ok(img)
}

fn fill_rect(img: &mut RgbImage, rect: &Rect, color: Rgb) {
    let pixel = Pixel([color.0, color.1, color.2]);
    let x0 = rect.x.round().max(0.0) as u32;
    let y0 = rect.y.round().max(0.0) as u32;
    let x1 = (rect.right().round().max(0.0) as u32).min(img.width());
    let y1 = (rect.bottom().round().max(0.0) as u32).min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, pixel);
        }
    }
}

/// Filled diamond centred on (`cx`, `cy`).
fn draw_diamond(img: &mut RgbImage, cx: f64, cy: f64, radius: f64, color: Rgb) {
    let pixel = Pixel([color.0, color.1, color.2]);
    let r = radius.ceil() as i64;
    let (ix, iy) = (cx.round() as i64, cy.round() as i64);
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx.abs() + dy.abs()) as f64 > radius {
                continue;
            }
            let (x, y) = (ix + dx, iy + dy);
            if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
                img.put_pixel(x as u32, y as u32, pixel);
            }
        }
    }
}

fn render_scatter(img: &mut RgbImage, spec: &ScatterSpec, panel: &Rect, map: &DynamicImage) {
    fill_rect(img, panel, PANEL_BACKGROUND);

    let area = spec.plot_area(panel);
    let (w, h) = (area.w.round() as u32, area.h.round() as u32);
    if w > 0 && h > 0 {
        let background = imageops::resize(&map.to_rgb8(), w, h, FilterType::Triangle);
        imageops::replace(img, &background, area.x.round() as i64, area.y.round() as i64);
    }

    let mut drawn = 0usize;
    for point in &spec.points {
        if let Some((px, py)) = spec.project(&area, point.x, point.y) {
            draw_diamond(img, px, py, spec.marker_radius, point.color);
            drawn += 1;
        }
    }
    debug!("Drew {} of {} points", drawn, spec.points.len());
}

fn label_scale(bar_height: f64) -> u32 {
    ((bar_height * 0.6) / GLYPH_SIZE as f64).floor().clamp(1.0, 4.0) as u32
}

/// Render the figure to an RGB raster.
pub fn render_png(fig: &FigureSpec, map: &DynamicImage) -> RgbImage {
    let layout = fig.layout();
    let mut img = RgbImage::from_pixel(fig.width, fig.height, Pixel([WHITE.0, WHITE.1, WHITE.2]));

    let title_scale = ((layout.title.h * 0.4) / GLYPH_SIZE as f64).floor().max(1.0) as u32;
    let title_x = (layout.title.w - text_width(&fig.title, title_scale) as f64) / 2.0;
    let title_y = (layout.title.h - (GLYPH_SIZE * title_scale) as f64) / 2.0;
    draw_text(&mut img, title_x as i64, title_y as i64, &fig.title, title_scale, TITLE_COLOR);

    render_scatter(&mut img, &fig.scatter, &layout.scatter, map);

    fill_rect(&mut img, &layout.bars, PANEL_BACKGROUND);
    for (bar, geometry) in fig.bars.bars.iter().zip(fig.bars.layout(&layout.bars)) {
        fill_rect(&mut img, &geometry.rect, bar.color);
        let scale = label_scale(geometry.rect.h);
        let text = bar.count.to_string();
        let y = geometry.label_y - (GLYPH_SIZE * scale) as f64 / 2.0;
        draw_text(&mut img, geometry.label_x as i64, y as i64, &text, scale, LABEL_COLOR);
    }
    debug!("Drew {} bars", fig.bars.bars.len());

    img
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rgb(color: Rgb) -> String {
    format!("rgb({},{},{})", color.0, color.1, color.2)
}

fn svg_rect(svg: &mut String, rect: &Rect, color: Rgb) {
    svg.push_str(&format!(
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
        rect.x,
        rect.y,
        rect.w,
        rect.h,
        rgb(color)
    ));
    svg.push('\n');
}

/// Render the figure as SVG. The map is referenced, not embedded, but its
/// header is read so a missing or unreadable map fails here.
pub fn render_svg(fig: &FigureSpec, map_path: &Path) -> Result<String> {
    let (map_w, map_h) = image::image_dimensions(map_path)?;
    debug!("Map image is {}x{}", map_w, map_h);

    let layout = fig.layout();
    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{}" height="{}" viewBox="0 0 {} {}">
<rect width="100%" height="100%" fill="white"/>
"#,
        fig.width, fig.height, fig.width, fig.height
    ));

    let title_size = (layout.title.h * 0.4).max(8.0);
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="{:.1}" text-anchor="middle" dominant-baseline="middle" fill="{}">{}</text>"#,
        layout.title.w / 2.0,
        layout.title.h / 2.0,
        title_size,
        rgb(TITLE_COLOR),
        escape_xml(&fig.title)
    ));
    svg.push('\n');

    // Scatter panel
    let panel = layout.scatter;
    svg_rect(&mut svg, &panel, PANEL_BACKGROUND);
    let area = fig.scatter.plot_area(&panel);
    svg.push_str(&format!(
        r#"<image x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" preserveAspectRatio="none" xlink:href="{}"/>"#,
        area.x,
        area.y,
        area.w,
        area.h,
        escape_xml(&map_path.to_string_lossy())
    ));
    svg.push('\n');
    let r = fig.scatter.marker_radius;
    for point in &fig.scatter.points {
        if let Some((px, py)) = fig.scatter.project(&area, point.x, point.y) {
            svg.push_str(&format!(
                r#"<path d="M{:.1},{:.1} L{:.1},{:.1} L{:.1},{:.1} L{:.1},{:.1} Z" fill="{}"/>"#,
                px, py - r,
                px + r, py,
                px, py + r,
                px - r, py,
                rgb(point.color)
            ));
            svg.push('\n');
        }
    }

    // Bar panel
    svg_rect(&mut svg, &layout.bars, PANEL_BACKGROUND);
    for (bar, geometry) in fig.bars.bars.iter().zip(fig.bars.layout(&layout.bars)) {
        svg.push_str(&format!("<g><title>{}</title>\n", escape_xml(&bar.label)));
        svg_rect(&mut svg, &geometry.rect, bar.color);
        let font_size = (geometry.rect.h * 0.6).max(6.0);
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="{:.1}" dominant-baseline="middle" fill="{}">{}</text>"#,
            geometry.label_x,
            geometry.label_y,
            font_size,
            rgb(LABEL_COLOR),
            bar.count
        ));
        svg.push_str("\n</g>\n");
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}
