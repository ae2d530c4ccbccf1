// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use subburn::app_config::{self, Config, TranscriptionProvider};
use subburn::app_controller::{Controller, RunOptions};
use subburn::render;

/// CLI Wrapper for TranscriptionProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranscriptionProvider {
    Groq,
    OpenAI,
}

impl From<CliTranscriptionProvider> for TranscriptionProvider {
    fn from(cli_provider: CliTranscriptionProvider) -> Self {
        match cli_provider {
            CliTranscriptionProvider::Groq => TranscriptionProvider::Groq,
            CliTranscriptionProvider::OpenAI => TranscriptionProvider::OpenAI,
        }
    }
}

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

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Burn translated subtitles into a video or every video in a folder (default command)
    Burn(BurnArgs),

    /// Generate shell completions for subburn
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct BurnArgs {
    /// Input video file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Directory for the subtitled video (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Spoken language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Subtitle language code (e.g., 'he', 'ar', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Speech-to-text provider
    #[arg(short, long, value_enum)]
    provider: Option<CliTranscriptionProvider>,

    /// Also write the translated subtitles as an SRT file
    #[arg(long)]
    srt: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subburn - burn translated subtitles into short videos
///
/// Transcribes the speech of a video, translates every segment and renders
/// the translation into the picture.
#[derive(Parser, Debug)]
#[command(name = "subburn")]
#[command(version)]
#[command(about = "Burns translated subtitles into short videos")]
#[command(long_about = "subburn transcribes a video, translates what is said and burns the translation into the picture.

EXAMPLES:
    subburn clip.mp4                            # Subtitle using default config
    subburn -f clip.mp4                         # Force overwrite existing output
    subburn -s en -t he clip.mp4                # English speech, Hebrew subtitles
    subburn --srt clip.mp4                      # Also write an SRT sidecar
    subburn --log-level debug /videos/          # Process entire directory with debug logging
    subburn completions bash > subburn.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys left empty are read from GROQ_API_KEY
    or OPENAI_API_KEY.

REQUIREMENTS:
    ffmpeg and ffprobe must be on PATH.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input video file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Directory for the subtitled video (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Spoken language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Subtitle language code (e.g., 'he', 'ar', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Speech-to-text provider
    #[arg(short, long, value_enum)]
    provider: Option<CliTranscriptionProvider>,

    /// Also write the translated subtitles as an SRT file
    #[arg(long)]
    srt: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
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
        // The logger itself accepts everything; log::max_level does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => ("", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subburn", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Burn(args)) => run_burn(args).await,
        None => {
            // Bare `subburn <INPUT>` behaves like `subburn burn <INPUT>`
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;

            let args = BurnArgs {
                input_path,
                output_dir: cli.output_dir,
                force_overwrite: cli.force_overwrite,
                source_language: cli.source_language,
                target_language: cli.target_language,
                provider: cli.provider,
                srt: cli.srt,
                config_path: cli.config_path,
                log_level: cli.log_level,
            };
            run_burn(args).await
        }
    }
}

/// Load the config file, writing a default one when it does not exist
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        let file = File::open(path).context(format!("Failed to open config file: {}", path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", path))
    } else {
        warn!("Config file not found at '{}', creating default config.", path);
        let config = Config::default();

        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write default config to file: {}", path))?;

        Ok(config)
    }
}

async fn run_burn(options: BurnArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let mut config = load_config(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.transcription.provider = provider.clone().into();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    config.apply_env_overrides();

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    let controller = Controller::from_config(config).await?;

    // Ctrl-C cancels running jobs; their cleanup still runs
    let cancel = controller.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running jobs...");
            cancel.cancel();
        }
    });

    let run_options = RunOptions {
        force_overwrite: options.force_overwrite,
        write_srt: options.srt,
    };

    let result = if options.input_path.is_file() {
        let output_dir = match options.output_dir.clone() {
            Some(dir) => dir,
            None => options
                .input_path
                .parent()
                .unwrap_or(Path::new("."))
                .to_path_buf(),
        };
        match controller.run(options.input_path.clone(), output_dir, run_options).await? {
            Some(report) => report
                .outcome
                .map(|_| ())
                .map_err(|e| anyhow!(e.user_message())),
            None => Ok(()),
        }
    } else if options.input_path.is_dir() {
        let summary = controller.run_folder(options.input_path.clone(), run_options).await?;
        if summary.failed > 0 {
            Err(anyhow!("{} videos failed", summary.failed))
        } else {
            Ok(())
        }
    } else {
        Err(anyhow!("Input path does not exist: {:?}", options.input_path))
    };

    render::release_shared_font_chain().await;
    if result.is_ok() {
        info!("All done");
    }
    result
}
