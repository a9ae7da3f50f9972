mod chart;
mod cluster;
mod config;
mod display;
mod error;
mod font;
mod naming;
mod parse;
mod render;
mod table;

use clap::Parser;
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chart::FigureSpec;
use config::Config;
use error::Result;
use naming::LocationNamer;
use table::LocationTable;

#[derive(Parser)]
#[command(name = "chestmap")]
#[command(about = "Cluster chest locations on the map and chart them per place.", long_about = None)]
struct Args {
    /// Write the figure to this FILE (PNG or SVG based on extension).
    #[arg(short = 'o', long = "out", value_name = "FILE", default_value = "chest_locations.png")]
    out: PathBuf,

    /// Set the width in pixels of the figure.
    #[arg(short = 'x', long = "width", value_name = "N", default_value_t = 1200)]
    width: u32,

    /// Set the height in pixels of the figure.
    #[arg(short = 'y', long = "height", value_name = "N", default_value_t = 800)]
    height: u32,

    /// Name clusters by the region (name<TAB>x0,y0,x1,y1) containing their
    /// centroid instead of by label order.
    #[arg(short = 'r', long = "regions", value_name = "FILE")]
    regions: Option<PathBuf>,

    /// Open the saved figure in the default viewer.
    #[arg(short = 's', long = "show")]
    show: bool,

    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1)]
    verbose: u8,
}

/// Parse, cluster, name and tabulate the chests.
fn build_table(config: &Config, namer: &LocationNamer) -> Result<LocationTable> {
    let mut pairs = parse::load_coordinates(&config.coordinates_path)?;
    parse::swap_axes(&mut pairs);
    let points = parse::into_points(&pairs);

    info!("Clustering {} chests into {} locations...", points.len(), config.cluster_count);
    let clustering = cluster::ward_clustering(&points, config.cluster_count)?;
    debug!("Cluster sizes: {:?}", clustering.sizes);
    let locations = namer.assign(&clustering)?;

    LocationTable::from_parts(&points, locations)
}

fn write_figure(fig: &FigureSpec, config: &Config, out: &Path) -> Result<()> {
    let is_svg = out
        .extension()
        .map(|ext| ext.to_ascii_lowercase() == "svg")
        .unwrap_or(false);

    if is_svg {
        info!("Rendering SVG...");
        let svg = render::render_svg(fig, &config.map_path)?;
        info!("Saving to {:?}...", out);
        let mut file = File::create(out)?;
        file.write_all(svg.as_bytes())?;
    } else {
        let map = render::load_map(&config.map_path)?;
        info!("Rendering image...");
        let img = render::render_png(fig, &map);
        info!("Saving to {:?}...", out);
        img.save(out)?;
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = Config {
        width: args.width,
        height: args.height,
        ..Config::default()
    };
    config.validate()?;

    let namer = match &args.regions {
        Some(path) => LocationNamer::Regions(naming::load_regions(path)?),
        None => LocationNamer::Positional(config.location_names.clone()),
    };

    let table = build_table(&config, &namer)?;
    if table.is_empty() {
        warn!("No coordinates found in {:?}", config.coordinates_path);
    }
    for (name, count) in table.counts() {
        debug!("{}: {} chests", name, count);
    }

    let fig = FigureSpec::build(&table, &config);
    debug_assert_eq!(fig.bars.total(), table.len());
    info!("{} chests in {} locations", table.len(), fig.bars.bars.len());
    write_figure(&fig, &config, &args.out)?;

    // foo.png -> foo.locations.tsv
    table.write_tsv(&args.out.with_extension("locations.tsv"))?;

    if args.show {
        display::show(&args.out)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    info!("Starting chest map...");

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Done.");
}
