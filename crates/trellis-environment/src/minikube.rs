// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use trellis_common_config::{HarnessConfig, Platform};
use trellis_common_exec::CommandRunner;
use trellis_common_wait::{wait_until, CancellationToken, RetryPolicy, WaitError};

use crate::environment::{Environment, SetupReport};
use crate::error::EnvironmentError;
use crate::reconcile::plan;
use crate::status::{ClusterStatus, ObservedState};

const STATUS_COMMAND: &str = "minikube status";
const START_COMMAND: &str = "minikube start --vm-driver=none";
const DELETE_COMMAND: &str = "minikube delete";

/// Where the none driver leaves credentials and state when run as root.
const ROOT_HOME: &str = "/root";
const CREDENTIAL_DIR: &str = ".kube";
const STATE_DIR: &str = ".minikube";

/// Single-node cluster driven by the `minikube` CLI with the VM-less driver.
pub struct Minikube {
	runner: Arc<dyn CommandRunner>,
	cancel: CancellationToken,
	elevated: bool,
	skip_ownership_fix: bool,
	home_dir: PathBuf,
	user: String,
	timeout: Duration,
	wait_unit: Duration,
	status_component: String,
}

impl Minikube {
	pub fn new(
		config: &HarnessConfig,
		runner: Arc<dyn CommandRunner>,
		cancel: CancellationToken,
	) -> Self {
		Self {
			runner,
			cancel,
			elevated: config.use_sudo,
			skip_ownership_fix: config.skip_ownership_fix,
			home_dir: config.home_dir.clone(),
			user: config.user.clone(),
			timeout: config.cluster_timeout,
			wait_unit: config.wait_unit,
			status_component: config.status_component.clone(),
		}
	}

	/// Current state of the configured status component.
	///
	/// A failed probe or a missing component reads as absent so setup
	/// proceeds to start. The probe error, if any, is returned alongside.
	pub async fn observe(&self) -> (ObservedState, Option<EnvironmentError>) {
		match self.status().await {
			Ok(status) => {
				debug!(?status, "cluster status");
				if !status.contains(&self.status_component) {
					warn!(
						component = %self.status_component,
						"component missing from cluster status, treating cluster as absent"
					);
				}
				(ObservedState::from_status(status.get(&self.status_component)), None)
			}
			Err(e) => {
				warn!(error = %e, "cluster status probe failed, treating cluster as absent");
				(ObservedState::Absent, Some(e))
			}
		}
	}

	/// Ownership fix applied after a none-driver start, in order.
	pub fn ownership_commands(&self) -> Vec<String> {
		let home = self.home_dir.display();
		let user = &self.user;
		[CREDENTIAL_DIR, STATE_DIR]
			.iter()
			.flat_map(|dir| {
				[
					format!("mv {ROOT_HOME}/{dir} {home}/{dir}"),
					format!("chown -R {user} {home}/{dir}"),
					format!("chgrp -R {user} {home}/{dir}"),
				]
			})
			.collect()
	}

	async fn start(&self, report: &mut SetupReport) -> Result<(), EnvironmentError> {
		info!("starting cluster");
		self
			.runner
			.run(START_COMMAND, self.elevated)
			.await
			.map_err(EnvironmentError::Start)?;

		if self.skip_ownership_fix {
			debug!("ownership fix left to external supervisor");
			return Ok(());
		}

		for dir in [CREDENTIAL_DIR, STATE_DIR] {
			let path = self.home_dir.join(dir);
			if let Err(e) = self.wait_for_dir(&path).await {
				if e.is_cancelled() {
					return Err(EnvironmentError::Cancelled(path.display().to_string()));
				}
				warn!(path = %path.display(), error = %e, "directory did not appear");
				report.record_failure(format!("wait for {}", path.display()), &e);
			}
		}

		for command in self.ownership_commands() {
			debug!(%command, "fixing ownership");
			match self.runner.run(&command, self.elevated).await {
				Ok(output) => debug!(%command, output = %output.trim_end(), "ownership step done"),
				Err(e) => {
					warn!(%command, error = %e, "ownership step failed, continuing");
					report.record_failure(command, &e);
				}
			}
		}
		Ok(())
	}

	async fn wait_for_dir(&self, path: &Path) -> Result<bool, WaitError<bool, std::io::Error>> {
		let policy = RetryPolicy::with_timeout(self.timeout, self.wait_unit);
		let resource = path.display().to_string();
		wait_until(
			&resource,
			&policy,
			&self.cancel,
			|| tokio::fs::try_exists(path),
			|exists| *exists,
		)
		.await
	}
}

#[async_trait]
impl Environment for Minikube {
	fn platform(&self) -> Platform {
		Platform::Minikube
	}

	#[instrument(skip(self))]
	async fn setup(&self) -> Result<SetupReport, EnvironmentError> {
		let (observed, status_error) = self.observe().await;
		let action = plan(&observed)?;
		info!(%observed, ?action, "planned cluster setup");
		let mut report = SetupReport::new(observed, action);
		if let Some(e) = status_error {
			report.record_failure(STATUS_COMMAND, &e);
		}

		if action.needs_teardown() {
			match self.teardown().await {
				Ok(()) => info!("stopped cluster deleted"),
				Err(e) => {
					warn!(error = %e, "teardown failed, starting anyway; stale cluster state may remain");
					report.teardown_error = Some(e.to_string());
				}
			}
		}

		if action.needs_start() {
			self.start(&mut report).await?;
		} else {
			info!("cluster already running");
		}
		Ok(report)
	}

	async fn status(&self) -> Result<ClusterStatus, EnvironmentError> {
		match self.runner.run(STATUS_COMMAND, self.elevated).await {
			Ok(stdout) => Ok(ClusterStatus::parse(&stdout)),
			// Stopped and absent clusters exit non-zero but still report.
			Err(e) => {
				let reported = e
					.stdout()
					.filter(|stdout| !stdout.trim().is_empty())
					.map(ClusterStatus::parse);
				reported.ok_or(EnvironmentError::Probe(e))
			}
		}
	}

	async fn teardown(&self) -> Result<(), EnvironmentError> {
		self
			.runner
			.run(DELETE_COMMAND, self.elevated)
			.await
			.map(|_| ())
			.map_err(EnvironmentError::Teardown)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use trellis_common_exec::{ExecError, ScriptedRunner};

	fn config(home: &Path, skip_ownership_fix: bool) -> HarnessConfig {
		HarnessConfig {
			platform: Platform::Minikube,
			use_sudo: true,
			verbose: false,
			skip_ownership_fix,
			home_dir: home.to_path_buf(),
			user: "ci".to_string(),
			cluster_timeout: Duration::from_secs(5),
			wait_unit: Duration::from_secs(1),
			status_component: "host".to_string(),
			log_level: "info".to_string(),
		}
	}

	fn minikube(runner: &ScriptedRunner, config: &HarnessConfig) -> Minikube {
		Minikube::new(config, Arc::new(runner.clone()), CancellationToken::new())
	}

	fn stopped_exit(stdout: &str) -> Result<String, ExecError> {
		Err(ExecError::Failed {
			command: STATUS_COMMAND.to_string(),
			code: Some(7),
			stdout: stdout.to_string(),
			stderr: String::new(),
		})
	}

	#[tokio::test]
	async fn stopped_cluster_is_deleted_then_started() {
		let runner = ScriptedRunner::new();
		runner.on("status", stopped_exit("host: Stopped\nkubelet: Stopped\n"));

		let report = minikube(&runner, &config(Path::new("/home/ci"), true))
			.setup()
			.await
			.unwrap();

		assert_eq!(report.observed, ObservedState::Stopped);
		assert_eq!(
			runner.commands(),
			vec![STATUS_COMMAND, DELETE_COMMAND, START_COMMAND]
		);
		assert!(runner.calls().iter().all(|c| c.elevated));
		assert!(report.is_clean());
	}

	#[tokio::test]
	async fn absent_cluster_is_only_started() {
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "");

		let report = minikube(&runner, &config(Path::new("/home/ci"), true))
			.setup()
			.await
			.unwrap();

		assert_eq!(report.observed, ObservedState::Absent);
		assert_eq!(runner.count("delete"), 0);
		assert_eq!(runner.commands(), vec![STATUS_COMMAND, START_COMMAND]);
	}

	#[tokio::test]
	async fn running_cluster_is_left_alone() {
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "host: Running\n");

		let report = minikube(&runner, &config(Path::new("/home/ci"), true))
			.setup()
			.await
			.unwrap();

		assert_eq!(report.action, crate::Action::None);
		assert_eq!(runner.commands(), vec![STATUS_COMMAND]);
	}

	#[tokio::test]
	async fn unknown_state_aborts_before_any_lifecycle_command() {
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "host: Paused\n");

		let err = minikube(&runner, &config(Path::new("/home/ci"), true))
			.setup()
			.await
			.unwrap_err();

		assert!(matches!(err, EnvironmentError::UnknownState(ref s) if s == "Paused"));
		assert_eq!(runner.commands(), vec![STATUS_COMMAND]);
	}

	#[tokio::test]
	async fn teardown_failure_is_recorded_and_start_still_runs() {
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "host: Stopped\n");
		runner.on_fail("delete", "machine does not exist");

		let report = minikube(&runner, &config(Path::new("/home/ci"), true))
			.setup()
			.await
			.unwrap();

		assert!(report
			.teardown_error
			.as_deref()
			.is_some_and(|e| e.contains("machine does not exist")));
		assert_eq!(runner.count("start"), 1);
	}

	#[tokio::test]
	async fn start_failure_is_fatal() {
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "");
		runner.on_fail("start", "driver none requires root");

		let err = minikube(&runner, &config(Path::new("/home/ci"), false))
			.setup()
			.await
			.unwrap_err();

		assert!(matches!(err, EnvironmentError::Start(_)));
		assert_eq!(runner.count("chown"), 0);
	}

	#[tokio::test]
	async fn status_failure_reads_as_absent() {
		let runner = ScriptedRunner::new();
		runner.on_fail("status", "minikube: command not found");

		let report = minikube(&runner, &config(Path::new("/home/ci"), true))
			.setup()
			.await
			.unwrap();

		assert_eq!(report.observed, ObservedState::Absent);
		assert_eq!(runner.count("start"), 1);
		assert!(!report.is_clean());
		assert_eq!(report.failed_steps.len(), 1);
		assert_eq!(report.failed_steps[0].step, STATUS_COMMAND);
		assert!(report.failed_steps[0].error.contains("command not found"));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_during_directory_wait_aborts_setup() {
		let home = tempfile::tempdir().unwrap();
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "");
		let mut config = config(home.path(), false);
		config.cluster_timeout = Duration::from_secs(60);

		let cancel = CancellationToken::new();
		let env = Minikube::new(&config, Arc::new(runner.clone()), cancel.clone());
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(2)).await;
			cancel.cancel();
		});

		let err = env.setup().await.unwrap_err();

		assert!(matches!(err, EnvironmentError::Cancelled(ref path) if path.ends_with(".kube")));
		assert_eq!(runner.count("start"), 1);
		assert_eq!(runner.count("chown"), 0);
		assert_eq!(runner.count("mv "), 0);
	}

	#[tokio::test]
	async fn stopped_status_with_non_zero_exit_is_parsed() {
		let runner = ScriptedRunner::new();
		runner.on("status", stopped_exit("host: Stopped\n"));

		let status = minikube(&runner, &config(Path::new("/home/ci"), true))
			.status()
			.await
			.unwrap();
		assert_eq!(status.get("host"), "Stopped");
	}

	#[tokio::test(start_paused = true)]
	async fn ownership_fix_runs_every_step_despite_failures() {
		let home = tempfile::tempdir().unwrap();
		std::fs::create_dir(home.path().join(".kube")).unwrap();
		std::fs::create_dir(home.path().join(".minikube")).unwrap();

		let runner = ScriptedRunner::new();
		runner.on_ok("status", "");
		runner.on_fail("chgrp", "invalid group");

		let env = minikube(&runner, &config(home.path(), false));
		let report = env.setup().await.unwrap();

		let expected = env.ownership_commands();
		assert_eq!(expected.len(), 6);
		assert_eq!(runner.commands()[2..], expected[..]);
		assert_eq!(report.failed_steps.len(), 1);
		assert!(report.failed_steps[0].step.starts_with("chgrp -R ci"));
	}

	#[tokio::test(start_paused = true)]
	async fn missing_directories_are_recorded_and_fix_still_runs() {
		let home = tempfile::tempdir().unwrap();
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "");

		let report = minikube(&runner, &config(home.path(), false))
			.setup()
			.await
			.unwrap();

		assert_eq!(report.failed_steps.len(), 2);
		assert!(report.failed_steps[0].step.ends_with(".kube"));
		assert_eq!(runner.count("chown"), 2);
	}

	#[test]
	fn ownership_commands_target_home() {
		let runner = ScriptedRunner::new();
		let env = minikube(&runner, &config(Path::new("/home/ci"), false));
		assert_eq!(
			env.ownership_commands(),
			vec![
				"mv /root/.kube /home/ci/.kube",
				"chown -R ci /home/ci/.kube",
				"chgrp -R ci /home/ci/.kube",
				"mv /root/.minikube /home/ci/.minikube",
				"chown -R ci /home/ci/.minikube",
				"chgrp -R ci /home/ci/.minikube",
			]
		);
	}

	#[tokio::test]
	async fn non_zero_status_without_output_is_a_status_error() {
		let runner = ScriptedRunner::new();
		runner.on_fail("status", "");

		let err = minikube(&runner, &config(Path::new("/home/ci"), true))
			.status()
			.await
			.unwrap_err();
		assert!(matches!(err, EnvironmentError::Probe(_)));
	}
}
