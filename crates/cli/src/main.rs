use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use onboard_core::config::OnboardConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "onboard",
    about = "Bulk Active Directory account provisioning from CSV",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "onboard.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Process a CSV of users against the directory
    Run {
        /// create, modify, delete or report
        #[arg(long)]
        action: String,
        /// CSV with firstName, lastName, username, department, jobTitle, email
        #[arg(long)]
        input: Option<PathBuf>,
        /// Log intended changes without touching the directory
        #[arg(long)]
        dry_run: bool,
        /// Use this initial password for every new account
        #[arg(long)]
        password: Option<String>,
        /// Create a home directory for each new account
        #[arg(long)]
        home_dir: bool,
        /// Send a welcome notice for each new account
        #[arg(long)]
        notify: bool,
        /// Include initial passwords in the report file
        #[arg(long)]
        export_passwords: bool,
        /// Directory for the report file (overrides config)
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Bind to the directory and report whether it worked
    TestConnection,
}

/// Console logging, plus a plain-text copy when the config names a log file.
fn init_logging(config_path: &str) {
    let log_file = OnboardConfig::load(Path::new(config_path))
        .ok()
        .and_then(|config| config.logging.file);

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            Err(e) => {
                eprintln!("warning: cannot open log file {path}: {e}");
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(file_layer)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.config);

    let result = match cli.command {
        Commands::Init { force } => commands::init::run(&cli.config, force)
            .await
            .map(|()| ExitCode::SUCCESS),
        Commands::Run {
            action,
            input,
            dry_run,
            password,
            home_dir,
            notify,
            export_passwords,
            report_dir,
        } => {
            let args = commands::run::RunArgs {
                action,
                input,
                dry_run,
                password,
                home_dir,
                notify,
                export_passwords,
                report_dir,
            };
            commands::run::run(&cli.config, args).await
        }
        Commands::TestConnection => commands::test_connection::run(&cli.config)
            .await
            .map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "aborted");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_parse_init_defaults() {
        let cli = Cli::parse_from(["onboard", "init"]);
        assert_eq!(cli.config, "onboard.toml");
        match cli.command {
            Commands::Init { force } => assert!(!force),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_init_force_with_custom_config() {
        let cli = Cli::parse_from(["onboard", "--config", "/etc/onboard.toml", "init", "--force"]);
        assert_eq!(cli.config, "/etc/onboard.toml");
        match cli.command {
            Commands::Init { force } => assert!(force),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_run_defaults() {
        let cli = Cli::parse_from(["onboard", "run", "--action", "create", "--input", "users.csv"]);
        match cli.command {
            Commands::Run {
                action,
                input,
                dry_run,
                password,
                home_dir,
                notify,
                export_passwords,
                report_dir,
            } => {
                assert_eq!(action, "create");
                assert_eq!(input, Some(PathBuf::from("users.csv")));
                assert!(!dry_run);
                assert!(password.is_none());
                assert!(!home_dir);
                assert!(!notify);
                assert!(!export_passwords);
                assert!(report_dir.is_none());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parse_run_all_flags() {
        let cli = Cli::parse_from([
            "onboard",
            "run",
            "--action",
            "Create",
            "--input",
            "new-hires.csv",
            "--dry-run",
            "--password",
            "Welcome2025!",
            "--home-dir",
            "--notify",
            "--export-passwords",
            "--report-dir",
            "/tmp/reports",
        ]);
        match cli.command {
            Commands::Run {
                action,
                dry_run,
                password,
                home_dir,
                notify,
                export_passwords,
                report_dir,
                ..
            } => {
                assert_eq!(action, "Create");
                assert!(dry_run);
                assert_eq!(password.as_deref(), Some("Welcome2025!"));
                assert!(home_dir);
                assert!(notify);
                assert!(export_passwords);
                assert_eq!(report_dir, Some(PathBuf::from("/tmp/reports")));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parse_report_without_input() {
        let cli = Cli::parse_from(["onboard", "run", "--action", "report"]);
        match cli.command {
            Commands::Run { action, input, .. } => {
                assert_eq!(action, "report");
                assert!(input.is_none());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_run_requires_action() {
        assert!(Cli::try_parse_from(["onboard", "run", "--input", "users.csv"]).is_err());
    }

    #[test]
    fn cli_parse_test_connection() {
        let cli = Cli::parse_from(["onboard", "test-connection"]);
        assert!(matches!(cli.command, Commands::TestConnection));
    }
}
