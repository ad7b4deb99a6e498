// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trellis_common_config::HarnessConfig;
use trellis_common_exec::{CommandRunner, ShellRunner};
use trellis_common_wait::CancellationToken;
use trellis_environment::{environment_for, DockerRuntime, Environment, SetupReport};
use trellis_k8s::{K8sClient, KubeClient, Workloads};

use crate::error::HarnessError;
use crate::logger::{Logger, TestLogger, TracingLogger};

/// Which harness components to build.
#[derive(Clone, Default)]
pub struct HarnessOptions {
	pub config_path: Option<PathBuf>,
	pub include_environment: bool,
	pub include_k8s: bool,
	pub include_docker: bool,
	pub include_logger: bool,
	/// Sink for the test logger; `tracing` when unset.
	pub logger: Option<Arc<dyn TestLogger>>,
}

impl HarnessOptions {
	pub fn include_all(config_path: Option<PathBuf>, logger: Option<Arc<dyn TestLogger>>) -> Self {
		Self {
			config_path,
			include_environment: true,
			include_k8s: true,
			include_docker: true,
			include_logger: true,
			logger,
		}
	}

	pub fn include_all_but_environment(
		config_path: Option<PathBuf>,
		logger: Option<Arc<dyn TestLogger>>,
	) -> Self {
		Self {
			include_environment: false,
			..Self::include_all(config_path, logger)
		}
	}

	/// Everything except the cluster API client, for use before the cluster
	/// has credentials.
	pub fn include_all_but_k8s(
		config_path: Option<PathBuf>,
		logger: Option<Arc<dyn TestLogger>>,
	) -> Self {
		Self {
			include_k8s: false,
			..Self::include_all(config_path, logger)
		}
	}

	pub fn include_all_but_docker(
		config_path: Option<PathBuf>,
		logger: Option<Arc<dyn TestLogger>>,
	) -> Self {
		Self {
			include_docker: false,
			..Self::include_all(config_path, logger)
		}
	}

	pub fn include_all_but_logger(config_path: Option<PathBuf>) -> Self {
		Self {
			include_logger: false,
			..Self::include_all(config_path, None)
		}
	}
}

/// Entry point for test suites.
pub struct Harness {
	config: HarnessConfig,
	runner: Arc<dyn CommandRunner>,
	cancel: CancellationToken,
	environment: Option<Arc<dyn Environment>>,
	docker: Option<DockerRuntime>,
	workloads: Option<Workloads>,
	logger: Option<Logger>,
}

impl Harness {
	/// Load configuration and build the requested components.
	///
	/// The kube client is only created when `include_k8s` is set.
	pub async fn new(options: HarnessOptions) -> Result<Self, HarnessError> {
		let config = HarnessConfig::load(options.config_path.as_deref())?;
		let client = connect(&options).await?;
		Ok(Self::from_parts(config, &options, Arc::new(ShellRunner::new()), client))
	}

	/// Build from already resolved parts.
	pub fn from_parts(
		config: HarnessConfig,
		options: &HarnessOptions,
		runner: Arc<dyn CommandRunner>,
		client: Option<Arc<dyn K8sClient>>,
	) -> Self {
		let mut harness = Self {
			config,
			runner,
			cancel: CancellationToken::new(),
			environment: None,
			docker: None,
			workloads: None,
			logger: None,
		};
		harness.rebuild(options, client);
		harness
	}

	/// Reload configuration and rebuild the components `options` includes.
	///
	/// Components not included keep their current instance.
	pub async fn reload(&mut self, options: HarnessOptions) -> Result<(), HarnessError> {
		self.config = HarnessConfig::load(options.config_path.as_deref())?;
		let client = connect(&options).await?;
		self.rebuild(&options, client);
		Ok(())
	}

	fn rebuild(&mut self, options: &HarnessOptions, client: Option<Arc<dyn K8sClient>>) {
		let config = &self.config;
		if options.include_environment {
			self.environment = Some(environment_for(
				config,
				Arc::clone(&self.runner),
				self.cancel.clone(),
			));
		}
		if options.include_docker {
			self.docker = Some(DockerRuntime::new(Arc::clone(&self.runner), config.use_sudo));
		}
		if options.include_k8s {
			match client {
				Some(client) => {
					self.workloads = Some(
						Workloads::new(client, Arc::clone(&self.runner), self.cancel.clone())
							.with_wait_unit(config.wait_unit),
					);
				}
				None => warn!("k8s component requested without a client"),
			}
		}
		if options.include_logger {
			let sink = options
				.logger
				.clone()
				.unwrap_or_else(|| Arc::new(TracingLogger));
			self.logger = Some(Logger::new(sink, config.verbose));
		}
		debug!(
			environment = self.environment.is_some(),
			docker = self.docker.is_some(),
			k8s = self.workloads.is_some(),
			logger = self.logger.is_some(),
			"harness components built"
		);
	}

	pub fn config(&self) -> &HarnessConfig {
		&self.config
	}

	/// Token shared by every wait the harness runs.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Cancel in-flight waits on Ctrl-C.
	pub fn cancel_on_interrupt(&self) -> JoinHandle<()> {
		let cancel = self.cancel.clone();
		tokio::spawn(async move {
			match tokio::signal::ctrl_c().await {
				Ok(()) => {
					warn!("interrupt received, cancelling in-flight waits");
					cancel.cancel();
				}
				Err(e) => warn!(error = %e, "unable to listen for interrupt"),
			}
		})
	}

	pub fn environment(&self) -> Result<&Arc<dyn Environment>, HarnessError> {
		self
			.environment
			.as_ref()
			.ok_or(HarnessError::NotIncluded("environment"))
	}

	pub fn docker(&self) -> Result<&DockerRuntime, HarnessError> {
		self.docker.as_ref().ok_or(HarnessError::NotIncluded("docker"))
	}

	pub fn workloads(&self) -> Result<&Workloads, HarnessError> {
		self.workloads.as_ref().ok_or(HarnessError::NotIncluded("k8s"))
	}

	pub fn logger(&self) -> Option<&Logger> {
		self.logger.as_ref()
	}

	/// Bring the cluster to running and report the outcome to the test logger.
	pub async fn setup(&self) -> Result<SetupReport, HarnessError> {
		let environment = self.environment()?;
		let result = environment.setup().await;

		if let Some(logger) = &self.logger {
			match &result {
				Ok(report) => {
					logger.log_fmt(format_args!(
						"{} setup: observed {}, action {:?}",
						environment.platform(),
						report.observed,
						report.action
					));
					if let Some(err) = &report.teardown_error {
						logger.log_error(&format!("teardown before start failed: {err}"));
					}
					for step in &report.failed_steps {
						logger.log_error(&format!("{} failed: {}", step.step, step.error));
					}
				}
				Err(e) => logger.log_error(&format!("{} setup failed: {e}", environment.platform())),
			}
		}

		let report = result?;
		info!(clean = report.is_clean(), "cluster setup finished");
		Ok(report)
	}
}

async fn connect(options: &HarnessOptions) -> Result<Option<Arc<dyn K8sClient>>, HarnessError> {
	if !options.include_k8s {
		return Ok(None);
	}
	let client: Arc<dyn K8sClient> = Arc::new(KubeClient::new().await?);
	Ok(Some(client))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::logger::CapturingLogger;
	use std::path::Path;
	use std::time::Duration;
	use trellis_common_config::Platform;
	use trellis_common_exec::ScriptedRunner;
	use trellis_k8s::{MockK8sClient, WorkloadError};

	fn config() -> HarnessConfig {
		HarnessConfig {
			platform: Platform::Minikube,
			use_sudo: false,
			verbose: true,
			skip_ownership_fix: true,
			home_dir: Path::new("/home/ci").to_path_buf(),
			user: "ci".to_string(),
			cluster_timeout: Duration::from_secs(60),
			wait_unit: Duration::from_secs(1),
			status_component: "host".to_string(),
			log_level: "info".to_string(),
		}
	}

	fn mock_client() -> Option<Arc<dyn K8sClient>> {
		Some(Arc::new(MockK8sClient::new()))
	}

	#[test]
	fn options_exclude_one_component_each() {
		let all = HarnessOptions::include_all(None, None);
		assert!(all.include_environment && all.include_k8s && all.include_docker && all.include_logger);
		assert!(!HarnessOptions::include_all_but_environment(None, None).include_environment);
		assert!(!HarnessOptions::include_all_but_k8s(None, None).include_k8s);
		assert!(!HarnessOptions::include_all_but_docker(None, None).include_docker);
		let no_logger = HarnessOptions::include_all_but_logger(None);
		assert!(!no_logger.include_logger);
		assert!(no_logger.include_k8s);
	}

	#[test]
	fn excluded_components_are_reported() {
		let runner = Arc::new(ScriptedRunner::new());
		let harness = Harness::from_parts(
			config(),
			&HarnessOptions::include_all_but_k8s(None, None),
			runner,
			None,
		);

		assert!(harness.environment().is_ok());
		assert!(harness.docker().is_ok());
		assert!(matches!(
			harness.workloads(),
			Err(HarnessError::NotIncluded("k8s"))
		));
	}

	#[test]
	fn rebuild_adds_components_and_keeps_others() {
		let runner = Arc::new(ScriptedRunner::new());
		let mut harness = Harness::from_parts(
			config(),
			&HarnessOptions::include_all_but_k8s(None, None),
			runner,
			None,
		);

		let only_k8s = HarnessOptions {
			include_k8s: true,
			..Default::default()
		};
		harness.rebuild(&only_k8s, mock_client());

		assert!(harness.workloads().is_ok());
		assert!(harness.environment().is_ok());
		assert!(harness.logger().is_some());
	}

	#[tokio::test]
	async fn setup_reports_to_test_logger() {
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "host: Stopped\n");
		runner.on_fail("delete", "no machine");
		let capture = CapturingLogger::new();

		let harness = Harness::from_parts(
			config(),
			&HarnessOptions::include_all_but_k8s(None, Some(Arc::new(capture.clone()))),
			Arc::new(runner.clone()),
			None,
		);
		let report = harness.setup().await.unwrap();

		assert!(report.teardown_error.is_some());
		assert!(capture.contains("minikube setup: observed Stopped"));
		assert_eq!(capture.errors().len(), 1);
		assert_eq!(runner.count("start"), 1);
		assert!(runner.calls().iter().all(|c| !c.elevated));
	}

	#[tokio::test]
	async fn unknown_state_is_surfaced_and_logged() {
		let runner = ScriptedRunner::new();
		runner.on_ok("status", "host: Error\n");
		let capture = CapturingLogger::new();

		let harness = Harness::from_parts(
			config(),
			&HarnessOptions::include_all_but_k8s(None, Some(Arc::new(capture.clone()))),
			Arc::new(runner),
			None,
		);

		assert!(harness.setup().await.is_err());
		assert!(capture.errors()[0].contains("unknown state"));
	}

	#[tokio::test(start_paused = true)]
	async fn cancelling_the_token_stops_workload_waits() {
		let harness = Harness::from_parts(
			config(),
			&HarnessOptions::include_all(None, None),
			Arc::new(ScriptedRunner::new()),
			mock_client(),
		);
		let cancel = harness.cancellation_token();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(3)).await;
			cancel.cancel();
		});

		let err = harness
			.workloads()
			.unwrap()
			.wait_for_pods_by_prefix("default", "nginx")
			.await
			.unwrap_err();
		assert!(matches!(err, WorkloadError::Cancelled { .. }));
	}
}
