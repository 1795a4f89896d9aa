#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line harness for the scoring engine.
//!
//! Reads grids and POI catalogues in the engine's own JSON record shapes,
//! runs a scoring, growth or point analysis, and prints JSON to stdout.
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use locate_poi_models::PoiKind;

mod commands;

/// Rank candidate locations for a new point of interest.
#[derive(Parser)]
#[command(name = "locate_cli")]
#[command(about = "Rank candidate locations for a new point of interest")]
struct Cli {
    /// TOML document replacing the built-in scoring strategies.
    #[arg(long, global = true)]
    strategies: Option<PathBuf>,

    /// TOML document with factor and growth settings.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Score every grid cell for a POI type.
    Score {
        /// JSON array of grid cells.
        #[arg(long)]
        grid: PathBuf,

        /// JSON array of existing POIs.
        #[arg(long)]
        pois: PathBuf,

        /// Target POI type (e.g. "atm", "hospital").
        #[arg(long, value_parser = PoiKind::parse)]
        poi_type: PoiKind,

        /// Count POIs within this radius of each centroid instead of inside
        /// the cell polygon.
        #[arg(long)]
        buffer_km: Option<f64>,

        /// Only print the best N cells, with explanations.
        #[arg(long)]
        top: Option<usize>,
    },

    /// Classify grid cells by growth trend from POI observation dates.
    Growth {
        /// JSON array of grid cells.
        #[arg(long)]
        grid: PathBuf,

        /// JSON array of existing POIs with `observedAt` timestamps.
        #[arg(long)]
        pois: PathBuf,

        /// Baseline instant (RFC 3339). POIs observed before it form the
        /// baseline density.
        #[arg(long)]
        baseline_as_of: DateTime<Utc>,

        /// Recent instant (RFC 3339). Must be after the baseline instant.
        #[arg(long)]
        recent_as_of: DateTime<Utc>,
    },

    /// Analyze a single candidate point.
    Analyze {
        /// JSON array of grid cells.
        #[arg(long)]
        grid: PathBuf,

        /// JSON array of existing POIs.
        #[arg(long)]
        pois: PathBuf,

        /// Latitude of the candidate point.
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude of the candidate point.
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Target POI type.
        #[arg(long, value_parser = PoiKind::parse)]
        poi_type: PoiKind,

        /// Catchment and competitor search radius in kilometres.
        #[arg(long, default_value = "2.0")]
        radius_km: f64,
    },

    /// Build a square grid over a bounding box and print it as JSON.
    Tessellate {
        /// Southern edge.
        #[arg(long, allow_negative_numbers = true)]
        min_lat: f64,

        /// Western edge.
        #[arg(long, allow_negative_numbers = true)]
        min_lng: f64,

        /// Northern edge.
        #[arg(long, allow_negative_numbers = true)]
        max_lat: f64,

        /// Eastern edge.
        #[arg(long, allow_negative_numbers = true)]
        max_lng: f64,

        /// Cell edge length in kilometres.
        #[arg(long, default_value = "1.0")]
        edge_km: f64,
    },

    /// List the registered scoring strategies.
    Strategies,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = commands::load_config(cli.strategies.as_deref(), cli.settings.as_deref())?;

    match cli.command {
        Commands::Score {
            grid,
            pois,
            poi_type,
            buffer_km,
            top,
        } => commands::score(config, &grid, &pois, poi_type, buffer_km, top),
        Commands::Growth {
            grid,
            pois,
            baseline_as_of,
            recent_as_of,
        } => commands::growth(&config, &grid, &pois, baseline_as_of, recent_as_of),
        Commands::Analyze {
            grid,
            pois,
            lat,
            lng,
            poi_type,
            radius_km,
        } => commands::analyze(&config, &grid, &pois, lat, lng, poi_type, radius_km),
        Commands::Tessellate {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
            edge_km,
        } => commands::tessellate(min_lat, min_lng, max_lat, max_lng, edge_km),
        Commands::Strategies => commands::strategies(&config),
    }
}
