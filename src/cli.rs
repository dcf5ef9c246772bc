use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_MARKER: &str = "Sess";

/// Vertical gap (points) kept between a marker line and the crop edge.
pub const DEFAULT_GAP: f32 = 9.0;

#[derive(Parser, Debug)]
#[command(
    name = "sessplit",
    version,
    about = "Split a scanned session log PDF into one file per session"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Split(SplitArgs),
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// Input PDF to split.
    pub input: PathBuf,

    /// Existing directory that receives one PDF per session.
    pub output_dir: PathBuf,

    /// Attempt sequence recovery for identifiers lost or corrupted by OCR.
    #[arg(short = 'r', long = "recover", default_value_t = false)]
    pub recover: bool,

    /// Marker token that begins every session line.
    #[arg(long, default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// Vertical gap in points between a marker line and the crop edge.
    #[arg(long, default_value_t = DEFAULT_GAP)]
    pub gap: f32,

    /// Where to write the run manifest (defaults into the output directory).
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Input PDF to inspect.
    pub input: PathBuf,

    /// Marker token that begins every session line.
    #[arg(long, default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// Write the per-page report as JSON in addition to logging it.
    #[arg(long)]
    pub json: Option<PathBuf>,
}
