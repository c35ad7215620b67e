//! Per-record provisioning pipeline for Create, Modify, Delete and Report runs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use onboard_core::config::PasswordStrategy;
use onboard_core::error::{OnboardError, Result};
use onboard_core::models::{
    Action, DepartmentGroupPolicy, InputRecord, OutcomeStatus, ProcessingOutcome, RecordBatch,
    RunReport,
};
use onboard_core::validate::validate;

use crate::aggregator::OutcomeAggregator;
use crate::dry_run::DryRunGateway;
use crate::gateway::DirectoryGateway;
use crate::home::HomeDirectoryProvisioner;
use crate::models::{AttributeDiff, NewUser, UserAttributes};
use crate::notify::{Notifier, WelcomeNotice};
use crate::password::initial_password;
use crate::resolver::{build_new_user, AccountSettings, EnsureOutcome, IdempotencyResolver};

/// Switches selected once per run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Replace every directory mutation with a logged no-op.
    pub dry_run: bool,
    pub password: PasswordStrategy,
    /// Create a home directory for each new account.
    pub provision_home: bool,
    /// Send a welcome notice for each new account.
    pub notify: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            password: PasswordStrategy::default(),
            provision_home: false,
            notify: false,
        }
    }
}

/// Processes records one at a time, in input order. Every gateway call is
/// awaited before the next one starts.
pub struct ProvisioningPipeline {
    gateway: Arc<dyn DirectoryGateway>,
    resolver: IdempotencyResolver,
    policy: DepartmentGroupPolicy,
    settings: AccountSettings,
    options: PipelineOptions,
    home: Option<Arc<dyn HomeDirectoryProvisioner>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ProvisioningPipeline {
    /// In dry-run mode the gateway is wrapped in a [`DryRunGateway`].
    pub fn new(
        gateway: Arc<dyn DirectoryGateway>,
        policy: DepartmentGroupPolicy,
        settings: AccountSettings,
        options: PipelineOptions,
    ) -> Self {
        let gateway: Arc<dyn DirectoryGateway> = if options.dry_run {
            Arc::new(DryRunGateway::new(gateway))
        } else {
            gateway
        };
        Self {
            resolver: IdempotencyResolver::new(gateway.clone()),
            gateway,
            policy,
            settings,
            options,
            home: None,
            notifier: None,
        }
    }

    pub fn with_home_directory(mut self, home: Arc<dyn HomeDirectoryProvisioner>) -> Self {
        self.home = Some(home);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run one action.
    ///
    /// Report ignores `batch`. Every other action validates it first; schema
    /// and empty-input failures abort before any record is processed.
    pub async fn run(&self, action: Action, batch: Option<&RecordBatch>) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(run_id = %run_id, action = %action, dry_run = self.options.dry_run, "starting run");

        let mut aggregator = OutcomeAggregator::new();
        match action {
            Action::Report => self.run_report(&mut aggregator).await?,
            _ => {
                let batch = batch.ok_or(OnboardError::EmptyInput)?;
                self.run_batch(action, batch, &mut aggregator).await?;
            }
        }

        let (counters, outcomes) = aggregator.into_parts();
        info!(
            run_id = %run_id,
            action = %action,
            succeeded = counters.success_count,
            failed = counters.failure_count,
            warnings = counters.warning_count,
            dry_run = self.options.dry_run,
            "run completed"
        );

        Ok(RunReport {
            run_id,
            action,
            dry_run: self.options.dry_run,
            started_at,
            completed_at: Utc::now(),
            counters,
            outcomes,
        })
    }

    async fn run_batch(
        &self,
        action: Action,
        batch: &RecordBatch,
        aggregator: &mut OutcomeAggregator,
    ) -> Result<()> {
        let validation = validate(batch, action)?;
        if !validation.is_clean() {
            warn!(
                records = batch.records.len(),
                flagged = validation.warning_count(),
                "input has data quality warnings, processing anyway"
            );
        }
        for _ in 0..validation.warning_count() {
            aggregator.note_warning();
        }

        for record in &batch.records {
            let outcome = self.process_record(action, record, aggregator).await;
            aggregator.record(outcome);

            let progress = aggregator.summary();
            debug!(
                processed = aggregator.processed(),
                succeeded = progress.success_count,
                failed = progress.failure_count,
                warnings = progress.warning_count,
                "progress"
            );
        }
        Ok(())
    }

    async fn process_record(
        &self,
        action: Action,
        record: &InputRecord,
        aggregator: &mut OutcomeAggregator,
    ) -> ProcessingOutcome {
        if record.username.trim().is_empty() {
            error!(line = record.line_number, "skipping record with blank username");
            return ProcessingOutcome::error(record, action, "username is blank");
        }

        let outcome = match action {
            Action::Create => self.create(record, aggregator).await,
            Action::Modify => self.modify(record).await,
            Action::Delete => self.delete(record).await,
            // Report never reads records.
            Action::Report => ProcessingOutcome::success(record, action),
        };

        if outcome.status == OutcomeStatus::Error {
            error!(
                username = %record.username,
                line = record.line_number,
                action = %action,
                error = outcome.error_detail.as_deref().unwrap_or_default(),
                "record failed"
            );
        }
        outcome
    }

    async fn create(&self, record: &InputRecord, aggregator: &mut OutcomeAggregator) -> ProcessingOutcome {
        let action = Action::Create;
        let username = record.username.trim();
        let department = record.department.trim();
        let mut notes = Vec::new();

        if !department.is_empty() {
            let description = format!("{department} department");
            match self
                .resolver
                .ensure_organizational_unit(department, &self.settings.users_root, &description)
                .await
            {
                EnsureOutcome::Created => {}
                EnsureOutcome::AlreadyExists => {
                    warn!(username = %username, department = %department, "organizational unit already exists");
                    aggregator.note_warning();
                    notes.push(format!("organizational unit {department} already exists"));
                }
                EnsureOutcome::Failed(e) => {
                    return ProcessingOutcome::error(
                        record,
                        action,
                        format!("organizational unit {department}: {e}"),
                    );
                }
            }
        }

        let password = initial_password(&self.options.password);
        let mut user = build_new_user(record, password.clone(), &self.settings);

        let mut home_path = None;
        if self.options.provision_home {
            if let Some(home) = &self.home {
                match home.path_for(username) {
                    Ok(path) => {
                        let path = path.display().to_string();
                        user.home_directory = Some(path.clone());
                        user.home_drive = home.drive().map(str::to_string);
                        home_path = Some(path);
                    }
                    Err(e) => {
                        warn!(username = %username, error = %e, "home directory skipped");
                        aggregator.note_warning();
                        notes.push(e.to_string());
                    }
                }
            }
        }

        match self.resolver.ensure_user_account(&user).await {
            EnsureOutcome::Created => {}
            EnsureOutcome::AlreadyExists => {
                warn!(username = %username, "user already exists, skipping");
                let mut outcome = ProcessingOutcome::warning(record, action, "user already exists");
                for note in notes {
                    outcome.push_note(note);
                }
                return outcome;
            }
            EnsureOutcome::Failed(e) => {
                return ProcessingOutcome::error(record, action, e.to_string());
            }
        }

        let mut outcome = ProcessingOutcome::success(record, action);
        for note in notes {
            outcome.push_note(note);
        }
        outcome.generated_password = Some(password.clone());

        for group in self.policy.groups_for(department) {
            match self.resolver.ensure_group_membership(group, username).await {
                EnsureOutcome::Created | EnsureOutcome::AlreadyExists => {}
                EnsureOutcome::Failed(e) => {
                    warn!(username = %username, group = %group, error = %e, "group assignment failed");
                    aggregator.note_warning();
                    outcome.push_note(format!("group {group}: {e}"));
                }
            }
        }

        if let Some(path) = home_path {
            self.provision_home(username, &mut outcome, aggregator).await;
            outcome.home_directory_path = Some(path);
        }

        if self.options.notify {
            self.send_welcome(&user, &password, &mut outcome, aggregator)
                .await;
        }

        info!(username = %username, principal_name = %user.principal_name, "user provisioned");
        outcome
    }

    async fn provision_home(
        &self,
        username: &str,
        outcome: &mut ProcessingOutcome,
        aggregator: &mut OutcomeAggregator,
    ) {
        let Some(home) = &self.home else {
            return;
        };
        if self.options.dry_run {
            info!(username = %username, "dry run: would create home directory");
            return;
        }
        if let Err(e) = home.provision(username).await {
            warn!(username = %username, error = %e, "home directory provisioning failed");
            aggregator.note_warning();
            outcome.push_note(e.to_string());
        }
    }

    async fn send_welcome(
        &self,
        user: &NewUser,
        password: &str,
        outcome: &mut ProcessingOutcome,
        aggregator: &mut OutcomeAggregator,
    ) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if self.options.dry_run {
            info!(username = %user.username, "dry run: would send welcome notice");
            return;
        }
        let notice = WelcomeNotice {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone().unwrap_or_default(),
            principal_name: user.principal_name.clone(),
            initial_password: Some(password.to_string()),
            home_directory: user.home_directory.clone(),
        };
        if let Err(e) = notifier.send_welcome(&notice).await {
            warn!(username = %user.username, error = %e, "welcome notice failed");
            aggregator.note_warning();
            outcome.push_note(e.to_string());
        }
    }

    async fn modify(&self, record: &InputRecord) -> ProcessingOutcome {
        let action = Action::Modify;
        let username = record.username.trim();

        let current = match self.gateway.get_user(username).await {
            Ok(user) => user,
            Err(e) => return ProcessingOutcome::error(record, action, e.to_string()),
        };

        let diff = AttributeDiff::between(record, &current);
        if diff.is_empty() {
            info!(username = %username, "no changes");
            let mut outcome = ProcessingOutcome::success(record, action);
            outcome.push_note("no changes");
            return outcome;
        }

        match self.gateway.update_user(username, &diff).await {
            Ok(()) => {
                info!(username = %username, fields = %diff.describe(), "user updated");
                let mut outcome = ProcessingOutcome::success(record, action);
                outcome.push_note(format!("updated {}", diff.describe()));
                outcome
            }
            Err(e) => ProcessingOutcome::error(record, action, e.to_string()),
        }
    }

    /// Disable first, then delete. A failed delete leaves the account
    /// disabled.
    async fn delete(&self, record: &InputRecord) -> ProcessingOutcome {
        let action = Action::Delete;
        let username = record.username.trim();

        if let Err(e) = self.gateway.get_user(username).await {
            return ProcessingOutcome::error(record, action, e.to_string());
        }

        if let Err(e) = self.gateway.disable_user(username).await {
            return ProcessingOutcome::error(record, action, format!("disable failed: {e}"));
        }

        if let Err(e) = self.gateway.delete_user(username).await {
            return ProcessingOutcome::error(
                record,
                action,
                format!("delete failed, account left disabled: {e}"),
            );
        }

        info!(username = %username, "user deleted");
        ProcessingOutcome::success(record, action)
    }

    async fn run_report(&self, aggregator: &mut OutcomeAggregator) -> Result<()> {
        let users = self.gateway.list_all_users().await?;
        info!(count = users.len(), "listing directory users");
        for user in &users {
            aggregator.record(report_outcome(user));
        }
        Ok(())
    }
}

fn report_outcome(user: &UserAttributes) -> ProcessingOutcome {
    ProcessingOutcome {
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        email: user.email.clone().unwrap_or_default(),
        department: user.department.clone().unwrap_or_default(),
        action: Action::Report,
        status: OutcomeStatus::Success,
        error_detail: None,
        note: (!user.enabled).then(|| "account disabled".to_string()),
        generated_password: None,
        home_directory_path: None,
    }
}
