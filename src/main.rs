mod driver;

use crate::driver::{FrameLoop, FrameSink, RunOptions};
use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use wavetimer::WaveTimer;
use wavetimer::colors::{self, Theme};
use wavetimer::conf::{self, Settings};

#[derive(Parser)]
#[command(name = "wavetimer")]
#[command(about = "Countdown timer with an animated filling-water wave")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a countdown in real time (stdin: s start, p pause/resume, c cancel, q quit)
    Run(RunArgs),

    /// Render a single frame
    Snapshot {
        /// Remaining fraction, 1.0 = full
        #[arg(long)]
        progress: f32,

        /// Time since the wave started moving
        #[arg(long, default_value = "0")]
        elapsed_ms: u64,

        /// Write the frame to this PNG file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Colour theme (light or dark)
        #[arg(long)]
        theme: Option<Theme>,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Countdown length in seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Save frames as PNG under the data directory
    #[arg(long)]
    record: bool,

    /// Save frames as PNG under this directory instead
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Save only every N-th frame
    #[arg(long, default_value = "1")]
    every: u64,

    /// Colour theme (light or dark)
    #[arg(long)]
    theme: Option<Theme>,

    /// Wave colour as #rrggbb
    #[arg(long)]
    color: Option<String>,

    /// Wait for an `s` on stdin instead of starting right away
    #[arg(long)]
    no_start: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings as TOML
    Show,
    /// Print the config file location
    Path,
    /// Write the default settings to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

async fn run_countdown(mut settings: Settings, args: RunArgs) -> Result<()> {
    if let Some(duration) = args.duration {
        settings.duration_secs = duration;
    }
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(theme) = args.theme {
        settings.theme = theme;
    }
    if let Some(color) = args.color {
        colors::parse_hex_color(&color).map_err(|e| anyhow!(e))?;
        settings.color = Some(color);
    }

    let frames = match (args.frames, args.record) {
        (Some(dir), _) => Some(dir),
        (None, true) => Some(conf::frames_dir().context("Could not find data directory")?),
        (None, false) => None,
    };
    let sink = frames
        .map(|base| FrameSink::create(&base, args.every))
        .transpose()?;
    if let Some(sink) = &sink {
        println!("Recording frames to {}", sink.dir().display());
    }

    let timer = WaveTimer::new(&settings);
    let commands = FrameLoop::stdin_commands()?;
    let options = RunOptions {
        fps: settings.fps,
        auto_start: !args.no_start,
        background: settings.theme.background(),
        sink,
    };

    let summary = FrameLoop::new(timer, settings.width, settings.height, commands, options)?
        .run()
        .await?;

    log::info!(
        "Rendered {} frames (expired: {})",
        summary.frames,
        summary.expired
    );
    if let Some(dir) = summary.frames_dir {
        println!("Wrote {} frames to {}", summary.written, dir.display());
    }
    Ok(())
}

fn print_snapshot(
    settings: &Settings,
    progress: f32,
    elapsed_ms: u64,
    out: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let report = driver::snapshot(
        settings,
        progress,
        Duration::from_millis(elapsed_ms),
        out.as_deref(),
    )?;

    match format {
        OutputFormat::Text => {
            println!("Size:        {}x{}", report.width, report.height);
            println!("Progress:    {:.3} ({})", report.progress, report.remaining);
            println!("Phase shift: {:.4}", report.phase_shift);
            println!("Amplitude:   {:.4}", report.amplitude_scale);
            println!("Colour:      {}", report.color);
            println!("Drawn:       {}", if report.drawn { "yes" } else { "no" });
            if let Some(path) = &report.output {
                println!("Output:      {}", path.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn handle_config(action: ConfigAction, settings: &Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", settings.to_toml()?);
        }
        ConfigAction::Path => {
            let path = conf::config_path().context("Could not determine config directory")?;
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            let path = conf::config_path().context("Could not determine config directory")?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            let path = Settings::default().save()?;
            println!("Wrote default settings to {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut settings = Settings::load();

    let result = match cli.command {
        Commands::Run(args) => run_countdown(settings, args).await,

        Commands::Snapshot {
            progress,
            elapsed_ms,
            out,
            format,
            theme,
        } => {
            if let Some(theme) = theme {
                settings.theme = theme;
            }
            print_snapshot(&settings, progress, elapsed_ms, out, format)
        }

        Commands::Config { action } => handle_config(action, &settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
