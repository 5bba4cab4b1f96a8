//! OceanSync CLI Tool
//!
//! Command-line interface for fusing glider, typhoon and wave-field series
//! into a frame timeline and playing it back.

mod config;
mod logging;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use oceansync_core::dataset::{self, parse_timestamp};
use oceansync_core::{Frame, Overlap, TimeRange, TimelineService};
use oceansync_player::host::DEFAULT_REPAINT_PERIOD;
use oceansync_player::{
    FrameInterval, ManualHost, PlaybackController, RepaintHost, SystemHost, TickHandle, TickOutcome,
};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "oceansync")]
#[command(about = "OceanSync - synchronized playback of ocean observation series")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Wave-field snapshots (JSON Lines)
    #[arg(long)]
    snapshots: PathBuf,

    /// Glider telemetry (JSON Lines)
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Typhoon track (JSON Lines)
    #[arg(long)]
    hazards: Option<PathBuf>,

    /// Settings file (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the typhoon matching tolerance, in minutes
    #[arg(long)]
    hazard_tolerance_min: Option<i64>,

    /// Override the glider window half-width, in minutes
    #[arg(long)]
    asset_window_min: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show series coverage and a summary of the fused timeline
    Info {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Print the frame closest to a point in time
    Frame {
        #[command(flatten)]
        data: DataArgs,

        /// Target time (RFC 3339, "YYYY-MM-DD HH:MM:SS" or a snapshot label)
        #[arg(long)]
        at: String,

        /// Print the whole frame as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play the timeline, printing each selected frame
    Play {
        #[command(flatten)]
        data: DataArgs,

        /// Milliseconds between frames (defaults to the settings file)
        #[arg(long)]
        interval: Option<u64>,

        /// Restart from the first frame after the last one
        #[arg(long = "loop")]
        loop_playback: bool,

        /// Stop after this many advances
        #[arg(long)]
        max_advances: Option<usize>,

        /// Run on a virtual clock instead of sleeping
        #[arg(long = "virtual")]
        virtual_clock: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Info { data } => show_info(&data)?,
        Commands::Frame { data, at, json } => show_frame(&data, &at, json)?,
        Commands::Play {
            data,
            interval,
            loop_playback,
            max_advances,
            virtual_clock,
        } => play(&data, interval, loop_playback, max_advances, virtual_clock)?,
    }

    Ok(())
}

/// Loads the three series and fuses them into frames
fn load_timeline(data: &DataArgs) -> Result<(TimelineService, Settings)> {
    let settings = Settings::load(data.settings.as_deref())?
        .with_tolerances(data.hazard_tolerance_min, data.asset_window_min);
    let mut service = TimelineService::new(settings.sync_config()?);

    let snapshots = dataset::load_snapshots_from_path(&data.snapshots)
        .with_context(|| format!("Failed to load snapshots from {}", data.snapshots.display()))?;
    let assets = match &data.assets {
        Some(path) => {
            dataset::load_point_records_from_path(path)
                .with_context(|| format!("Failed to load glider records from {}", path.display()))?
                .records
        }
        None => Vec::new(),
    };
    let hazards = match &data.hazards {
        Some(path) => {
            dataset::load_point_records_from_path(path)
                .with_context(|| format!("Failed to load typhoon records from {}", path.display()))?
                .records
        }
        None => Vec::new(),
    };

    if snapshots.skipped > 0 {
        tracing::warn!("{} snapshot lines skipped", snapshots.skipped);
    }

    service
        .build(assets, hazards, snapshots.records)
        .context("Failed to build timeline")?;
    Ok((service, settings))
}

fn show_info(data: &DataArgs) -> Result<()> {
    let (service, settings) = load_timeline(data)?;
    let report = service.analyze_overlap();

    println!("\n=== Series Coverage ===");
    println!("Gliders:    {}", describe_range(report.asset_range));
    println!("Typhoon:    {}", describe_range(report.hazard_range));
    println!("Wave field: {}", describe_range(report.snapshot_range));
    match report.intersection {
        Overlap::Overlapping(range) => println!("Overlap:    {}", describe_range(Some(range))),
        Overlap::Disjoint => println!("Overlap:    none (series are disjoint)"),
        Overlap::NotEnoughSeries => println!("Overlap:    fewer than two series have data"),
    }

    println!("\n=== Timeline ===");
    println!(
        "Tolerances: typhoon {} min, gliders +/-{} min",
        settings.hazard_tolerance_minutes, settings.asset_window_minutes
    );
    println!("Frames: {}", service.frame_count());
    println!("Mean frame spacing: {} min", service.frame_interval().num_minutes());
    println!("Span: {}", describe_range(service.time_range()));

    let frames = service.frames();
    let with_hazard = frames.iter().filter(|f| f.has_hazard()).count();
    let bare = frames.iter().filter(|f| f.is_bare()).count();
    println!("Frames with typhoon fix: {}", with_hazard);
    println!("Frames with no observations: {}", bare);

    println!("\n=== Frames (first 10) ===");
    for frame in frames.iter().take(10) {
        println!("  {}", describe_frame(frame));
    }
    if frames.len() > 10 {
        println!("  ... and {} more frames", frames.len() - 10);
    }

    Ok(())
}

fn show_frame(data: &DataArgs, at: &str, json: bool) -> Result<()> {
    let target = parse_timestamp(&Value::String(at.to_string()))
        .with_context(|| format!("Unrecognized time: {}", at))?;
    let (service, _) = load_timeline(data)?;

    let Some(frame) = service.find_frame_by_timestamp(target) else {
        bail!("Timeline is empty");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(frame)?);
    } else {
        println!("{}", describe_frame(frame));
        for point in &frame.asset_points {
            if let Some((lon, lat)) = point.position() {
                println!("    glider {} at ({:.3}, {:.3})", point.id, lon, lat);
            }
        }
    }
    Ok(())
}

fn play(
    data: &DataArgs,
    interval: Option<u64>,
    loop_playback: bool,
    max_advances: Option<usize>,
    virtual_clock: bool,
) -> Result<()> {
    let (service, settings) = load_timeline(data)?;
    let interval = settings.frame_interval(interval)?;
    let looping = loop_playback || settings.loop_playback;

    if service.is_empty() {
        println!("Timeline is empty, nothing to play");
        return Ok(());
    }

    println!(
        "Playing {} frames at {}{}",
        service.frame_count(),
        interval,
        if looping { " (looping)" } else { "" }
    );

    let advances = if virtual_clock {
        let controller = PlaybackController::new(ManualHost::new(), service.frames());
        run_playback(controller, interval, looping, max_advances, |host| {
            host.advance(DEFAULT_REPAINT_PERIOD);
            host.take_pending()
        })
    } else {
        let controller = PlaybackController::new(SystemHost::default(), service.frames());
        run_playback(controller, interval, looping, max_advances, SystemHost::wait_for_repaint)
    };

    println!("Played {} advances", advances);
    Ok(())
}

/// Pumps repaints into the controller until playback stops or the advance
/// budget runs out; returns the number of advances
fn run_playback<H, F>(
    mut controller: PlaybackController<H>,
    interval: FrameInterval,
    looping: bool,
    max_advances: Option<usize>,
    mut next_repaint: F,
) -> usize
where
    H: RepaintHost,
    F: FnMut(&mut H) -> Option<TickHandle>,
{
    controller.set_speed(interval);
    controller.set_loop(looping);
    controller.set_frame_listener(|frame| println!("{}", describe_frame(frame)));
    controller.set_metrics_listener(|metrics| {
        if metrics.target_fps > 0.0 && !metrics.is_stable {
            tracing::warn!("playback falling behind: {}", metrics);
        }
    });

    if let Some(frame) = controller.current_frame() {
        println!("{}", describe_frame(frame));
    }
    controller.play();

    let mut advances = 0;
    while max_advances.map_or(true, |max| advances < max) {
        let Some(handle) = next_repaint(controller.host_mut()) else {
            break;
        };
        match controller.on_repaint(handle) {
            TickOutcome::Advanced => advances += 1,
            TickOutcome::Stopped => {
                advances += 1;
                break;
            }
            TickOutcome::Waiting | TickOutcome::Stale => {}
        }
    }

    controller.pause();
    advances
}

fn describe_range(range: Option<TimeRange>) -> String {
    match range {
        Some(range) => format!(
            "{} .. {} ({} h)",
            range.start.format("%Y-%m-%d %H:%M"),
            range.end.format("%Y-%m-%d %H:%M"),
            range.duration().num_hours()
        ),
        None => "no data".to_string(),
    }
}

fn describe_frame(frame: &Frame) -> String {
    let hazard = match frame.hazard_center.as_deref().and_then(|h| h.position()) {
        Some((lon, lat)) => format!("typhoon ({:.2}, {:.2})", lon, lat),
        None => "typhoon -".to_string(),
    };
    format!(
        "[{:>4}] {} {} | {} | gliders {}",
        frame.index,
        frame.snapshot.time_label,
        frame.timestamp.format("%Y-%m-%d %H:%M"),
        hazard,
        frame.asset_points.len()
    )
}
