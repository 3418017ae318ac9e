// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::MultiProgress;

use subpipe::app_config::{self, Config};
use subpipe::app_controller::Controller;
use subpipe::transcription::{Device, ModelSize};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ModelSize to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl From<CliModelSize> for ModelSize {
    fn from(cli_size: CliModelSize) -> Self {
        match cli_size {
            CliModelSize::Tiny => ModelSize::Tiny,
            CliModelSize::Base => ModelSize::Base,
            CliModelSize::Small => ModelSize::Small,
            CliModelSize::Medium => ModelSize::Medium,
            CliModelSize::Large => ModelSize::Large,
        }
    }
}

/// CLI Wrapper for Device to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliDevice {
    Cpu,
    Gpu,
}

impl From<CliDevice> for Device {
    fn from(cli_device: CliDevice) -> Self {
        match cli_device {
            CliDevice::Cpu => Device::Cpu,
            CliDevice::Gpu => Device::Gpu,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for subpipe
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subpipe - Subtitle sync and muxing pipeline
///
/// Transcribes the speech of a video with whisper.cpp, writes a SubRip file,
/// and produces a soft-subtitled and a hard-subtitled copy of the video.
#[derive(Parser, Debug)]
#[command(name = "subpipe")]
#[command(version)]
#[command(about = "Generate subtitles for a video and mux them back in")]
#[command(long_about = "subpipe extracts the audio of a video, transcribes it with whisper.cpp, \
writes a SubRip subtitle file, then embeds it as a selectable track and burns it into the frames.

EXAMPLES:
    subpipe movie.mp4                           # Use default config
    subpipe -m medium --device gpu movie.mp4    # Larger model on the GPU
    subpipe -l fr movie.mkv                     # Skip language detection
    subpipe -o out/ movie.mp4                   # Write artifacts to out/
    subpipe --log-level debug /videos/          # Process a directory, show ffmpeg commands
    subpipe completions bash > subpipe.bash     # Generate bash completions

OUTPUTS (next to the source unless --output-dir is given):
    audio-<name>.wav                 extracted audio, reused on reruns
    sub-<name>.<lang>.srt            subtitle document
    subbed-<name>.<ext>              soft subtitles
    hardsubbed-<name>.<ext>          burned-in subtitles

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input video file or directory to process (defaults to the config's source_path)
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Directory for generated files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Whisper model size
    #[arg(short, long, value_enum)]
    model_size: Option<CliModelSize>,

    /// Inference device
    #[arg(short, long, value_enum)]
    device: Option<CliDevice>,

    /// Spoken language code (e.g., 'en', 'fr'); detected when omitted
    #[arg(short, long)]
    language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Produce the soft and hard outputs one after the other
    #[arg(long)]
    sequential: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }

    // @returns: Emoji for log level
    fn emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @converts: Config log level to log filter
fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at trace so a later set_max_level can raise verbosity
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subpipe", &mut std::io::stdout());
        return Ok(());
    }

    run(cli).await
}

// @loads: Config file, creating a default one if missing
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}

// @applies: Command line overrides on top of the config file
fn apply_overrides(config: &mut Config, options: &CommandLineOptions) {
    if let Some(input_path) = &options.input_path {
        config.source_path = Some(input_path.clone());
    }

    if let Some(output_dir) = &options.output_dir {
        config.output_dir = Some(output_dir.clone());
    }

    if let Some(model_size) = &options.model_size {
        config.transcription.model_size = model_size.clone().into();
    }

    if let Some(device) = &options.device {
        config.transcription.device = device.clone().into();
    }

    if let Some(language) = &options.language {
        config.transcription.language = Some(language.clone());
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    if options.sequential {
        config.media.parallel_outputs = false;
    }
}

async fn run(options: CommandLineOptions) -> Result<()> {
    // Apply a command line log level before the config is even read
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level_filter(&config_log_level));
    }

    let mut config = load_config(&options.config_path)?;
    apply_overrides(&mut config, &options);

    config.validate()
        .context("Configuration validation failed")?;

    log::set_max_level(level_filter(&config.log_level));

    let input_path = config.source_path.clone().ok_or_else(|| {
        anyhow!("INPUT_PATH is required when the config has no source_path")
    })?;

    let controller = Controller::with_config(config).with_progress(MultiProgress::new());

    let work = process(&controller, &input_path);

    // Dropping the work future kills any running ffmpeg or whisper process
    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping running jobs");
            Err(anyhow!("Interrupted"))
        }
    }
}

// @processes: One video, or every video under a directory
async fn process(controller: &Controller, input_path: &Path) -> Result<()> {
    if input_path.is_file() {
        let report = controller.run(input_path).await?;
        info!("Subtitles: {:?} ({} cues, sha256 {})", report.subtitle, report.cue_count, report.subtitle_sha256);
        info!("Soft subtitles: {:?}", report.soft_output);
        info!("Hard subtitles: {:?}", report.hard_output);
        Ok(())
    } else if input_path.is_dir() {
        let summary = controller.run_folder(input_path).await?;
        if summary.failures.is_empty() {
            return Ok(());
        }

        for (video, e) in &summary.failures {
            error!("{:?}: {}", video, e);
        }
        Err(anyhow!(
            "{} of {} files failed",
            summary.failures.len(),
            summary.failures.len() + summary.reports.len()
        ))
    } else {
        Err(anyhow!("Input path does not exist: {:?}", input_path))
    }
}
