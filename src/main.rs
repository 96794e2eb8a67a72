use anyhow::{Result, bail};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use flipbook::ImageSequence;
use flipbook::cli::Args;

#[derive(Serialize)]
struct Summary {
    frames: usize,
    width: usize,
    height: usize,
    frame_rate: f32,
    seconds: f32,
    percent_loaded: f32,
    failed_frames: Vec<usize>,
    first_frame: Option<PathBuf>,
    last_frame: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let mut seq = ImageSequence::new(args.kind.into());
    seq.set_frame_rate(args.fps);
    seq.set_max_frames(args.max_frames);
    seq.enable_threaded_load(args.threaded);
    seq.set_extension(&args.ext);

    if let Some(folder) = &args.folder {
        seq.load_folder(folder)?;
    } else if let Some(prefix) = &args.prefix {
        let (Some(start), Some(end)) = (args.start, args.end) else {
            bail!("--prefix needs --start and --end");
        };
        if args.ext.is_empty() {
            bail!("--prefix needs --ext");
        }
        seq.load_range(prefix, &args.ext, start, end, args.digits)?;
    } else {
        bail!("give a FOLDER or --prefix/--start/--end");
    }

    if args.threaded {
        let mut last_pct = -1i32;
        while seq.is_loading() {
            seq.update();
            let pct = (seq.percent_loaded() * 100.0) as i32;
            if pct != last_pct {
                info!("loading {}%", pct);
                last_pct = pct;
            }
            thread::sleep(Duration::from_millis(25));
        }
        seq.update();
        if !seq.is_loaded() {
            bail!("load failed");
        }
    } else if args.preload {
        seq.preload_all();
    }

    let frames = seq.total_frames();
    let summary = Summary {
        frames,
        width: seq.width(),
        height: seq.height(),
        frame_rate: seq.frame_rate(),
        seconds: seq.length_in_seconds(),
        percent_loaded: seq.percent_loaded(),
        failed_frames: seq.failed_frames(),
        first_frame: seq.file_path(0),
        last_frame: if frames > 0 { seq.file_path(frames - 1) } else { None },
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("frames:   {}", summary.frames);
        println!("size:     {}x{}", summary.width, summary.height);
        println!("duration: {:.3}s @ {} fps", summary.seconds, summary.frame_rate);
        if let (Some(first), Some(last)) = (&summary.first_frame, &summary.last_frame) {
            println!("first:    {}", first.display());
            println!("last:     {}", last.display());
        }
        if !summary.failed_frames.is_empty() {
            println!("failed:   {:?}", summary.failed_frames);
        }
    }

    Ok(())
}
