use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gif_player::{
    Clock, FileSource, NullSurface, Player, PlayerOpts, PngSequenceSurface, Surface, SystemClock,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gif-player", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print canvas, frame metadata and loop count as JSON.
    Info(InfoArgs),
    /// Write every composited frame as a PNG.
    Frames(FramesArgs),
    /// Play in real time without a display.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input GIF.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Input GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for `frame_NNNN.png`.
    #[arg(long)]
    out: PathBuf,

    /// Expand palettes in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// How long to play for.
    #[arg(long, default_value_t = 1000)]
    duration_ms: u64,

    /// Write every displayed frame into this directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Player options JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frames(args) => cmd_frames(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read gif '{}'", path.display()))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let bytes = read_input(&args.in_path)?;
    let stream = gif_player::decode(&bytes)?;

    let frames: Vec<_> = stream
        .frames
        .iter()
        .map(|f| {
            serde_json::json!({
                "bounds": f.bounds,
                "delay_ms": f.delay_ms,
                "disposal": f.disposal,
                "transparent_index": f.transparent_index,
                "palette_len": f.color_table.len(),
            })
        })
        .collect();
    let total_ms: u64 = stream.frames.iter().map(|f| u64::from(f.delay_ms)).sum();

    let info = serde_json::json!({
        "canvas": stream.canvas,
        "frame_count": stream.frames.len(),
        "loop_count": stream.loop_count,
        "total_duration_ms": total_ms,
        "frames": frames,
    });
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let bytes = read_input(&args.in_path)?;
    let stream = gif_player::decode(&bytes)?;
    let threading = gif_player::CompositeThreading {
        parallel: args.parallel,
        threads: args.threads,
    };
    let frames = gif_player::composite_with(stream.canvas, &stream.frames, &threading)?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;
    for (i, frame) in frames.iter().enumerate() {
        let path = args.out.join(format!("frame_{i:04}.png"));
        gif_player::write_png(&path, &frame.bitmap)?;
    }

    eprintln!("wrote {} frames to {}", frames.len(), args.out.display());
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let opts = match &args.config {
        Some(path) => PlayerOpts::from_path(path)?,
        None => PlayerOpts::default(),
    };
    match &args.out {
        Some(dir) => play(&args, opts, PngSequenceSurface::new(dir)?),
        None => play(&args, opts, NullSurface),
    }
}

fn play<S: Surface>(args: &PlayArgs, opts: PlayerOpts, surface: S) -> anyhow::Result<()> {
    let root = args
        .in_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let locator = args
        .in_path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("input path '{}' has no file name", args.in_path.display()))?;

    let mut player = Player::new(
        Arc::new(FileSource::new(root)),
        surface,
        SystemClock::sixty_hz(),
        opts,
    )?;
    player.load(locator)?;
    player.play();

    let started = Instant::now();
    let budget = Duration::from_millis(args.duration_ms);
    let mut shown = 1u64;
    while started.elapsed() < budget {
        let remaining = budget.saturating_sub(started.elapsed());
        let wait = player
            .scheduler()
            .clock()
            .until_due()
            .unwrap_or(Duration::from_millis(5));
        std::thread::sleep(wait.min(remaining));

        if player.pump()? {
            shown += 1;
            tracing::info!(
                frame = player.current_frame_index().unwrap_or(0),
                at_ms = player.scheduler().clock().now().as_millis() as u64,
                "frame"
            );
        }
    }

    let status = player.status();
    eprintln!(
        "played {} ms: {} frames shown, {}",
        args.duration_ms,
        shown,
        serde_json::to_string(&status)?
    );
    Ok(())
}
