use clap::Parser;
use std::path::PathBuf;

use crate::frame::PixelKind;

/// Image sequence inspector: resolve, preload and summarize a sequence
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Folder containing the image sequence
    #[arg(value_name = "FOLDER")]
    pub folder: Option<PathBuf>,

    /// Load an explicit numeric range instead: path prefix before the frame number
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// File extension: folder filter, or range suffix (required with --prefix)
    #[arg(short, long, value_name = "EXT", default_value = "")]
    pub ext: String,

    /// First frame number of an explicit range
    #[arg(long, value_name = "N")]
    pub start: Option<i32>,

    /// Last frame number of an explicit range (inclusive)
    #[arg(long, value_name = "N")]
    pub end: Option<i32>,

    /// Zero-padding width for range frame numbers (0 = unpadded)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub digits: usize,

    /// Limit the number of frames taken from a folder scan
    #[arg(long = "max-frames", value_name = "N", default_value_t = 0)]
    pub max_frames: usize,

    /// Decode frames on a background thread, polling for completion
    #[arg(short = 't', long)]
    pub threaded: bool,

    /// Eagerly decode every frame before printing the summary
    #[arg(short = 'p', long)]
    pub preload: bool,

    /// Frame rate used for duration and time addressing
    #[arg(long, value_name = "FPS", default_value_t = 30.0)]
    pub fps: f32,

    /// Pixel element kind for decoded buffers
    #[arg(long, value_enum, default_value_t = PixelKindArg::Byte)]
    pub kind: PixelKindArg,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum PixelKindArg {
    Byte,
    Short,
    Float,
}

impl From<PixelKindArg> for PixelKind {
    fn from(kind: PixelKindArg) -> Self {
        match kind {
            PixelKindArg::Byte => PixelKind::Byte,
            PixelKindArg::Short => PixelKind::Short,
            PixelKindArg::Float => PixelKind::Float,
        }
    }
}
