use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use onboard_core::config::{OnboardConfig, PasswordStrategy};
use onboard_core::models::{Action, DepartmentGroupPolicy, RunReport};
use onboard_core::user_csv::{read_records, write_report};
use onboard_directory::client::AdClient;
use onboard_directory::gateway::DirectoryGateway;
use onboard_directory::home::FsHomeDirectory;
use onboard_directory::notify::WebhookNotifier;
use onboard_directory::pipeline::{PipelineOptions, ProvisioningPipeline};
use onboard_directory::resolver::AccountSettings;
use tracing::info;

/// Flags of the `run` command.
pub struct RunArgs {
    pub action: String,
    pub input: Option<PathBuf>,
    pub dry_run: bool,
    pub password: Option<String>,
    pub home_dir: bool,
    pub notify: bool,
    pub export_passwords: bool,
    pub report_dir: Option<PathBuf>,
}

/// Run the `run` command: process one action and write the report.
///
/// Exits non-zero when any record failed.
pub async fn run(config_path: &str, args: RunArgs) -> anyhow::Result<ExitCode> {
    let config = OnboardConfig::load(Path::new(config_path))?;
    config.validate()?;

    let action: Action = args.action.parse()?;

    let batch = match action {
        Action::Report => None,
        _ => {
            let input = args
                .input
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("--input is required for the {action} action"))?;
            Some(read_records(input)?)
        }
    };

    let password = match args.password {
        Some(value) if value.is_empty() => anyhow::bail!("--password must not be empty"),
        Some(value) => PasswordStrategy::Fixed { value },
        None => config.passwords.clone(),
    };

    let options = PipelineOptions {
        dry_run: args.dry_run,
        password,
        provision_home: args.home_dir,
        notify: args.notify,
    };
    let settings = AccountSettings {
        domain: config.directory.domain(),
        users_root: config.directory.users_root().to_string(),
    };

    info!(
        action = %action,
        dry_run = args.dry_run,
        home_dir = args.home_dir,
        notify = args.notify,
        "Starting onboard run"
    );

    let gateway: Arc<dyn DirectoryGateway> = Arc::new(AdClient::new(&config.directory));
    let mut pipeline = ProvisioningPipeline::new(
        gateway,
        DepartmentGroupPolicy::from_config(&config.groups),
        settings,
        options,
    );

    if args.home_dir {
        let home = config.home_directory.as_ref().ok_or_else(|| {
            anyhow::anyhow!("--home-dir needs a [home_directory] section in {config_path}")
        })?;
        pipeline = pipeline.with_home_directory(Arc::new(FsHomeDirectory::from_config(home)));
    }

    if args.notify {
        let notification = config.notification.as_ref().ok_or_else(|| {
            anyhow::anyhow!("--notify needs a [notification] section in {config_path}")
        })?;
        pipeline = pipeline.with_notifier(Arc::new(WebhookNotifier::new(notification)?));
    }

    let report = pipeline.run(action, batch.as_ref()).await?;
    print!("{}", format_summary(&report));

    let report_dir = args
        .report_dir
        .unwrap_or_else(|| PathBuf::from(&config.report.directory));
    let path = write_report(&report, &report_dir, config.report.format, args.export_passwords)?;
    println!("  Report:    {}", path.display());

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn format_summary(report: &RunReport) -> String {
    let mut out = String::new();
    let action = report.action.as_str();
    let counters = &report.counters;

    let _ = writeln!(
        out,
        "onboard {action} {}!",
        if report.dry_run { "preview" } else { "completed" }
    );
    let _ = writeln!(out, "  Processed: {}", report.outcomes.len());
    let _ = writeln!(out, "  Succeeded: {}", counters.success_count);
    let _ = writeln!(out, "  Failed:    {}", counters.failure_count);
    let _ = writeln!(out, "  Warnings:  {}", counters.warning_count);

    let mut failures = report.failures().peekable();
    if failures.peek().is_some() {
        let _ = writeln!(out, "  Error details:");
        for outcome in failures {
            let _ = writeln!(
                out,
                "    {}: {}",
                outcome.username,
                outcome.error_detail.as_deref().unwrap_or_default()
            );
        }
    }

    if report.dry_run {
        let _ = writeln!(out);
        let _ = writeln!(out, "This was a dry run. No changes were made to the directory.");
        let _ = writeln!(out, "Run again without --dry-run to apply changes.");
    }
    out
}
