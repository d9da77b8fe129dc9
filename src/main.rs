use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use idiombot::commands::doctor::DoctorArgs;
use idiombot::commands::init::InitArgs;
use idiombot::commands::play::PlayArgs;
use idiombot::config::{self, Config};
use idiombot::error::ExitError;
use idiombot::{commands, telemetry};

#[derive(Debug, Parser)]
#[command(name = "idiombot", version, about = "Idiom guessing game for chat bots")]
struct Cli {
    /// Config file (default: ./idiombot.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level: trace, debug, info, warn or error
    #[arg(short, long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play in the terminal: stdin lines are `<channel> <user> <text>`
    Play(PlayArgs),
    /// Write a default idiombot.toml
    Init(InitArgs),
    /// Validate config and puzzle sources
    Doctor(DoctorArgs),
    /// Print the JSON Schema for idiombot.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Play(_) => "play",
            Self::Init(_) => "init",
            Self::Doctor(_) => "doctor",
            Self::Schema => "schema",
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(level) = cli.log_level.as_deref()
        && !config::is_log_level(level)
    {
        return Err(ExitError::Config(format!(
            "unknown log level {level:?}, valid levels: {:?}",
            config::LOG_LEVELS
        ))
        .into());
    }

    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let (config, config_path) = match cli.command {
        // init and schema must work even when the existing config is broken
        Commands::Init(_) | Commands::Schema => {
            let mut config = Config::default();
            config.log.dir.clear();
            (config, None)
        }
        _ => config::load_effective(cli.config.as_deref(), &cwd)?,
    };

    let _telemetry = telemetry::init(&config.log, cli.log_level.as_deref())?;
    let _span = tracing::info_span!("command", name = cli.command.name()).entered();
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Commands::Play(args) => args.execute(&config),
        Commands::Init(args) => args.execute(),
        Commands::Doctor(args) => args.execute(&config, config_path.as_ref()),
        Commands::Schema => commands::schema::run_schema(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
