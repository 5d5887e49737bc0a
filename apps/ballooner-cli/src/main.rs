//! Ballooner command line
//!
//! Balloons live in a JSON sidecar next to the PDF (`drawing.balloons.json`),
//! so each invocation loads the session, applies one edit and saves it back.

mod commands;

use anyhow::Result;
use ballooner_core::gdt::{
    Characteristic, DimensionKind, Lay, MaterialCondition, RoughnessParam, RoughnessUnit, SurfaceProcess,
};
use ballooner_core::{BalloonStyle, Config, ExportFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ballooner")]
#[command(version, about = "Numbered balloon callouts for PDF drawings")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Session file to use instead of the sidecar next to the PDF
    #[arg(short, long, global = true)]
    session: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// A point written as `X,Y`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointArg {
    pub x: f64,
    pub y: f64,
}

fn parse_point(s: &str) -> Result<PointArg, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad X in '{}': {}", s, e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad Y in '{}': {}", s, e))?;
    Ok(PointArg { x, y })
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show page geometry and the balloons recorded for a PDF
    Info { pdf: PathBuf },

    /// Create an empty session file for a PDF
    Init {
        pdf: PathBuf,
        /// Overwrite an existing session
        #[arg(long)]
        force: bool,
    },

    /// Place a new balloon
    Add(AddArgs),

    /// Move a balloon's circle and/or its leader target
    Move {
        pdf: PathBuf,
        number: u32,
        /// 1-based page; needed when the number repeats across pages
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        center: Option<PointArg>,
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        target: Option<PointArg>,
        /// Change the displayed number
        #[arg(long)]
        renumber_to: Option<u32>,
    },

    /// Delete a balloon
    Remove {
        pdf: PathBuf,
        number: u32,
        #[arg(long)]
        page: Option<u32>,
    },

    /// Set a balloon's description
    Describe {
        pdf: PathBuf,
        number: u32,
        #[arg(long)]
        page: Option<u32>,
        #[command(subcommand)]
        what: Description,
    },

    /// Renumber all balloons 1..N, top to bottom and page by page
    Renumber { pdf: PathBuf },

    /// Rotate a page's view (persisted, and applied on PDF export)
    Rotate {
        pdf: PathBuf,
        /// 1-based page
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// `cw`, `ccw`, or an absolute angle in degrees
        #[arg(allow_hyphen_values = true)]
        direction: String,
    },

    /// List balloons in table order
    List {
        pdf: PathBuf,
        #[arg(long)]
        page: Option<u32>,
        /// Print JSON instead of columns
        #[arg(long)]
        json: bool,
    },

    /// Export the annotated PDF, a CSV list or an Excel inspection sheet
    Export {
        pdf: PathBuf,
        #[arg(short, long, default_value = "pdf")]
        format: ExportFormat,
        /// Output path; defaults to a name next to the PDF
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub pdf: PathBuf,
    /// 1-based page
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Leader target in document points, or device pixels with --from-view
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub at: PointArg,
    /// Circle centre in document points; defaults to the configured offset
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub center: Option<PointArg>,
    #[arg(long)]
    pub style: Option<BalloonStyle>,
    #[arg(long)]
    pub diameter: Option<f64>,
    #[arg(long)]
    pub font_size: Option<f64>,
    #[arg(long)]
    pub description: Option<String>,
    /// Treat --at as a pixel position in a view with the given zoom, pan and rotation
    #[arg(long)]
    pub from_view: bool,
    #[arg(long, default_value_t = 1.0, requires = "from_view")]
    pub zoom: f64,
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true, requires = "from_view")]
    pub pan: Option<PointArg>,
    /// View rotation in degrees; defaults to the page's saved rotation
    #[arg(long, allow_hyphen_values = true, requires = "from_view")]
    pub rotation: Option<i32>,
}

#[derive(Subcommand, Debug)]
pub enum Description {
    /// Free text
    Text { text: String },

    /// GD&T feature control frame
    Frame {
        characteristic: Characteristic,
        tolerance: String,
        /// Cylindrical (⌀) tolerance zone
        #[arg(long)]
        diameter: bool,
        #[arg(long)]
        material: Option<MaterialCondition>,
        #[arg(long)]
        free_state: bool,
        #[arg(long)]
        tangent_plane: bool,
        #[arg(long)]
        projected: bool,
        #[arg(long)]
        statistical: bool,
        /// Datum reference, up to three
        #[arg(long = "datum")]
        datums: Vec<String>,
    },

    /// Dimension with optional tolerance
    Dimension {
        nominal: String,
        #[arg(long, default_value = "linear")]
        kind: DimensionKind,
        #[arg(long, allow_hyphen_values = true)]
        upper: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lower: Option<String>,
    },

    /// Surface roughness
    Surface {
        /// Roughness value; may be replaced by --grade
        value: Option<String>,
        /// N1..N12 grade, giving an Ra value
        #[arg(long, conflicts_with = "value")]
        grade: Option<String>,
        /// Ra, Rz, Rmax, Rt, Rq, Rsk or Rku
        #[arg(long, default_value = "Ra")]
        param: RoughnessParam,
        #[arg(long, default_value = "any")]
        process: SurfaceProcess,
        #[arg(long, default_value = "um")]
        unit: RoughnessUnit,
        /// Lay symbol: = ⊥ X M C R P
        #[arg(long)]
        lay: Option<Lay>,
        #[arg(long)]
        method: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // stdout carries command output, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    tracing::debug!(?config, "configuration loaded");

    let output = commands::run(cli.command, &config, cli.session.as_deref())?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
