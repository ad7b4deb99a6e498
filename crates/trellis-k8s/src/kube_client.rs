// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kube::{
	api::{Api, AttachParams, ListParams, LogParams},
	Client,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{ExecOutput, Namespace, Node, Pod};

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default()
			.await
			.map_err(|e| K8sError::ClientConfig {
				message: e.to_string(),
			})?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	/// Wrap an already configured client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}
}

fn not_found_or(name: &str, err: kube::Error, other: impl FnOnce(kube::Error) -> K8sError) -> K8sError {
	match err {
		kube::Error::Api(ref resp) if resp.code == 404 => K8sError::PodNotFound { name: name.into() },
		e => other(e),
	}
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<String> {
	let mut buf = Vec::new();
	if let Some(mut reader) = reader {
		reader.read_to_end(&mut buf).await?;
	}
	Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn exec_error(message: impl ToString) -> K8sError {
	K8sError::ExecError {
		message: message.to_string(),
	}
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn list_nodes(&self) -> Result<Vec<Node>, K8sError> {
		let nodes: Api<Node> = Api::all(self.client.clone());
		Ok(nodes.list(&ListParams::default()).await?.items)
	}

	async fn list_namespaces(&self) -> Result<Vec<Namespace>, K8sError> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		Ok(namespaces.list(&ListParams::default()).await?.items)
	}

	async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		Ok(pods.list(&ListParams::default()).await?.items)
	}

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		pods
			.get(name)
			.await
			.map_err(|e| not_found_or(name, e, K8sError::from))
	}

	#[instrument(skip(self, command, stdin), fields(command = ?command))]
	async fn exec(
		&self,
		name: &str,
		namespace: &str,
		container: Option<&str>,
		command: Vec<String>,
		stdin: Option<Vec<u8>>,
	) -> Result<ExecOutput, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let ap = AttachParams {
			container: container.map(str::to_string),
			stdin: stdin.is_some(),
			stdout: true,
			stderr: true,
			tty: false,
			..Default::default()
		};

		let mut attached = pods
			.exec(name, command, &ap)
			.await
			.map_err(|e| not_found_or(name, e, exec_error))?;

		if let Some(input) = stdin {
			let mut writer = attached
				.stdin()
				.ok_or_else(|| exec_error("stdin not available"))?;
			writer.write_all(&input).await.map_err(exec_error)?;
			writer.shutdown().await.map_err(exec_error)?;
		}

		let status = attached.take_status();
		let stdout_reader = attached.stdout();
		let stderr_reader = attached.stderr();
		let (stdout, stderr) =
			tokio::try_join!(drain(stdout_reader), drain(stderr_reader)).map_err(exec_error)?;

		if let Some(status) = status {
			if let Some(status) = status.await {
				if status.status.as_deref() == Some("Failure") {
					let message = status.message.unwrap_or_else(|| "command failed".to_string());
					return Err(exec_error(format!("{message}: {}", stderr.trim_end())));
				}
			}
		}

		attached.join().await.map_err(exec_error)?;
		debug!(stdout_len = stdout.len(), stderr_len = stderr.len(), "exec completed");
		Ok(ExecOutput { stdout, stderr })
	}

	async fn logs(&self, name: &str, namespace: &str) -> Result<String, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		pods
			.logs(name, &LogParams::default())
			.await
			.map_err(|e| {
				not_found_or(name, e, |e| K8sError::StreamError {
					message: e.to_string(),
				})
			})
	}
}
