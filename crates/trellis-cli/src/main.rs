// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use trellis::{Harness, HarnessOptions};

#[derive(Parser, Debug)]
#[command(name = "trellis", version, about = "Provision and probe a test cluster", long_about = None)]
struct Args {
	/// Path to a TOML config file
	#[arg(short, long, env = "TRELLIS_CONFIG")]
	config: Option<PathBuf>,

	/// Log level when RUST_LOG is unset
	#[arg(long)]
	log_level: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Bring the cluster to running
	Setup,
	/// Delete the cluster and stop runtime containers
	Teardown,
	/// Print the cluster status
	Status {
		#[arg(long)]
		json: bool,
	},
	/// Wait for pods whose name starts with a prefix
	Pods {
		#[arg(short, long, default_value = "default")]
		namespace: String,
		#[arg(short, long)]
		prefix: String,
	},
	/// Print a pod's log
	Logs {
		#[arg(short, long, default_value = "default")]
		namespace: String,
		pod: String,
	},
	/// Run a command in a pod
	Exec {
		#[arg(short, long, default_value = "default")]
		namespace: String,
		#[arg(short, long)]
		container: Option<String>,
		pod: String,
		#[arg(last = true, required = true)]
		command: Vec<String>,
	},
	/// Apply a manifest with kubectl
	Apply { manifest: PathBuf },
}

impl Command {
	/// Subcommands that talk to the cluster API.
	fn needs_k8s(&self) -> bool {
		matches!(
			self,
			Command::Pods { .. } | Command::Logs { .. } | Command::Exec { .. } | Command::Apply { .. }
		)
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let mut config = trellis::HarnessConfig::load(args.config.as_deref())
		.context("failed to load configuration")?;
	if let Some(level) = &args.log_level {
		config.log_level = level.clone();
	}
	trellis::init_tracing(&config)?;

	let options = HarnessOptions {
		include_k8s: args.command.needs_k8s(),
		..HarnessOptions::include_all_but_k8s(args.config.clone(), None)
	};
	let harness = Harness::new(options)
		.await
		.context("failed to build harness")?;
	let _interrupt = harness.cancel_on_interrupt();

	run(&harness, args.command).await
}

async fn run(harness: &Harness, command: Command) -> Result<()> {
	match command {
		Command::Setup => {
			let report = harness.setup().await?;
			info!(observed = %report.observed, action = ?report.action, "setup complete");
			for step in &report.failed_steps {
				eprintln!("warning: {} failed: {}", step.step, step.error);
			}
		}
		Command::Teardown => {
			harness.environment()?.teardown().await?;
			let failed = harness.docker()?.teardown().await?;
			for step in failed {
				eprintln!("warning: {} failed: {}", step.step, step.error);
			}
		}
		Command::Status { json } => {
			let status = harness.environment()?.status().await?;
			if json {
				println!("{}", serde_json::to_string_pretty(&status)?);
			} else {
				for (component, value) in status.iter() {
					println!("{component}: {value}");
				}
			}
		}
		Command::Pods { namespace, prefix } => {
			let pods = harness
				.workloads()?
				.wait_for_pods_by_prefix(&namespace, &prefix)
				.await?;
			for pod in pods {
				let phase = trellis::Workloads::pod_phase(&pod).to_string();
				println!("{}\t{phase}", pod.metadata.name.unwrap_or_default());
			}
		}
		Command::Logs { namespace, pod } => {
			print!("{}", harness.workloads()?.fetch_log(&pod, &namespace).await?);
		}
		Command::Exec {
			namespace,
			container,
			pod,
			command,
		} => {
			let output = harness
				.workloads()?
				.exec_in_pod(&command.join(" "), container.as_deref(), &pod, &namespace)
				.await?;
			print!("{output}");
		}
		Command::Apply { manifest } => {
			harness.workloads()?.apply_manifest(&manifest).await?;
		}
	}
	Ok(())
}
