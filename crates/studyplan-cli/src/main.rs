use std::io;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use studyplan_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyplan", version, about = "Studyplan CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subject management
    Subject {
        #[command(subcommand)]
        action: commands::subject::SubjectAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Study notes
    Note {
        #[command(subcommand)]
        action: commands::note::NoteAction,
    },
    /// Timetable generation and slot updates
    Timetable {
        #[command(subcommand)]
        action: commands::timetable::TimetableAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Install a stderr subscriber; `STUDYPLAN_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("STUDYPLAN_LOG")
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    // No subscriber exists yet, so a broken config file is reported directly.
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("warning: falling back to default config: {e}");
        Config::default()
    });
    init_tracing(&config);

    let result = match cli.command {
        Commands::Subject { action } => commands::subject::run(action, &config),
        Commands::Task { action } => commands::task::run(action),
        Commands::Note { action } => commands::note::run(action),
        Commands::Timetable { action } => commands::timetable::run(action, &config),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "studyplan", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
