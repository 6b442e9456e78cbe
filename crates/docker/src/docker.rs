//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//!  ServiceControl   QueryExecutor   ArtifactReader   MessagePublisher
//!        │                │               │                 │
//!        └────────────────┴───────┬───────┴─────────────────┘
//!                                 ▼
//!                          ┌─────────────┐
//!                          │DockerClient │ (trait)
//!                          └─────────────┘
//!                              │     │
//!                              ▼     ▼
//!                        ┌───────┐ ┌──────┐
//!                        │Bollard│ │ Mock │
//!                        └───┬───┘ └──────┘
//!                            ▼
//!                       Docker Daemon
//! ```
//!
//! # Container ID Validation
//!
//! Methods that accept container IDs reject anything that is not 1-64 ASCII
//! hex characters before calling the daemon.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::DockerRuntimeError;

/// Default upper bound for a single exec round trip.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Validates a container ID to prevent injection attacks.
fn validate_container_id(id: &str) -> Result<(), DockerRuntimeError> {
    if id.is_empty() || id.len() > 64 {
        return Err(DockerRuntimeError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DockerRuntimeError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// A container as listed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    /// Name without the leading `/`
    pub name: String,
    pub image: String,
    /// Runtime state (`running`, `exited`, `paused`, ...)
    pub state: String,
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// Captured result of a command run inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Bytes,
    pub stderr: Bytes,
    pub exit_code: i64,
}

impl ExecOutput {
    pub fn success(stdout: impl Into<Bytes>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Bytes::new(),
            exit_code: 0,
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_owned()
    }

    /// Turns a non-zero exit into [`DockerRuntimeError::ExecFailed`].
    pub fn into_success(self, container_id: &str) -> Result<Self, DockerRuntimeError> {
        if self.exit_code == 0 {
            Ok(self)
        } else {
            Err(DockerRuntimeError::ExecFailed {
                container_id: container_id.to_owned(),
                exit_code: self.exit_code,
                stderr: self.stderr_text(),
            })
        }
    }
}

/// Trait abstracting Docker API operations.
///
/// All Docker API calls go through this trait, enabling testability via mocking.
///
/// # Error Handling
///
/// - **404**: `DockerRuntimeError::ContainerNotFound`
/// - **409** (container not running): `DockerRuntimeError::NotRunning`
/// - **Socket / transport errors**: `DockerRuntimeError::DockerConnection`
/// - **Stop/start refusals**: `DockerRuntimeError::ActionFailed`
pub trait DockerClient: Send + Sync + 'static {
    /// Lists containers; `all` includes stopped ones.
    fn list_containers(
        &self,
        all: bool,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, DockerRuntimeError>> + Send;

    /// Stops a container with a 10-second grace period.
    fn stop_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), DockerRuntimeError>> + Send;

    /// Starts a stopped container.
    fn start_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), DockerRuntimeError>> + Send;

    /// Runs `cmd` inside a running container and collects its output.
    ///
    /// A non-zero exit code is returned in [`ExecOutput`], not as an error.
    fn exec(
        &self,
        id: &str,
        cmd: &[String],
    ) -> impl Future<Output = Result<ExecOutput, DockerRuntimeError>> + Send;

    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), DockerRuntimeError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
    exec_timeout: Duration,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket.
    pub fn connect_local() -> Result<Self, DockerRuntimeError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            DockerRuntimeError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
        })
    }

    /// Connects to Docker using a specific socket path.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, DockerRuntimeError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    DockerRuntimeError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
        })
    }

    /// Connects using `socket`, or the platform default when it is empty.
    pub fn connect(socket: &str) -> Result<Self, DockerRuntimeError> {
        if socket.is_empty() {
            Self::connect_local()
        } else {
            Self::connect_with_socket(socket)
        }
    }

    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = timeout;
        self
    }

    async fn exec_inner(&self, id: &str, cmd: &[String]) -> Result<ExecOutput, DockerRuntimeError> {
        use bollard::container::LogOutput;
        use bollard::exec::{CreateExecOptions, StartExecResults};
        use futures_util::StreamExt;

        let options = CreateExecOptions::<String> {
            cmd: Some(cmd.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let created = self
            .docker
            .create_exec(id, options)
            .await
            .map_err(|e| classify(id, "create exec", e))?;

        let started = self
            .docker
            .start_exec(&created.id, None)
            .await
            .map_err(|e| classify(id, "start exec", e))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        if let StartExecResults::Attached { mut output, .. } = started {
            while let Some(chunk) = output.next().await {
                match chunk.map_err(|e| classify(id, "read exec output", e))? {
                    LogOutput::StdOut { message } => stdout.extend_from_slice(&message),
                    LogOutput::StdErr { message } => stderr.extend_from_slice(&message),
                    _ => {}
                }
            }
        }

        let inspected = self
            .docker
            .inspect_exec(&created.id)
            .await
            .map_err(|e| classify(id, "inspect exec", e))?;

        Ok(ExecOutput {
            stdout: Bytes::from(stdout),
            stderr: Bytes::from(stderr),
            exit_code: inspected.exit_code.unwrap_or(0),
        })
    }
}

/// Maps a bollard error onto the runtime taxonomy.
fn classify(id: &str, op: &str, err: bollard::errors::Error) -> DockerRuntimeError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => DockerRuntimeError::ContainerNotFound(id.to_owned()),
        bollard::errors::Error::DockerResponseServerError {
            status_code: 409, ..
        } => DockerRuntimeError::NotRunning(id.to_owned()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => DockerRuntimeError::DockerApi(format!("{op} failed ({status_code}): {message}")),
        other => DockerRuntimeError::DockerConnection(format!("{op} failed: {other}")),
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DockerRuntimeError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| classify("", "list containers", e))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let name = container
                .names
                .unwrap_or_default()
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();

            result.push(ContainerSummary {
                id: container.id.unwrap_or_default(),
                name,
                image: container.image.unwrap_or_default(),
                state: container.state.unwrap_or_default(),
                labels: container.labels.unwrap_or_default(),
            });
        }

        Ok(result)
    }

    async fn stop_container(&self, id: &str) -> Result<(), DockerRuntimeError> {
        validate_container_id(id)?;

        use bollard::container::StopContainerOptions;

        self.docker
            .stop_container(id, Some(StopContainerOptions { t: 10 }))
            .await
            .map_err(|e| match classify(id, "stop", e) {
                DockerRuntimeError::DockerApi(reason) => DockerRuntimeError::ActionFailed {
                    container_id: id.to_owned(),
                    reason,
                },
                other => other,
            })
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerRuntimeError> {
        validate_container_id(id)?;

        use bollard::container::StartContainerOptions;

        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| match classify(id, "start", e) {
                DockerRuntimeError::DockerApi(reason) => DockerRuntimeError::ActionFailed {
                    container_id: id.to_owned(),
                    reason,
                },
                other => other,
            })
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<ExecOutput, DockerRuntimeError> {
        validate_container_id(id)?;

        match tokio::time::timeout(self.exec_timeout, self.exec_inner(id, cmd)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(DockerRuntimeError::ExecTimeout {
                container_id: id.to_owned(),
                timeout_secs: self.exec_timeout.as_secs(),
            }),
        }
    }

    async fn ping(&self) -> Result<(), DockerRuntimeError> {
        self.docker
            .ping()
            .await
            .map_err(|e| DockerRuntimeError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// Mock Docker client for unit tests.
///
/// Keeps container state so stop/start are observable, and replays
/// scripted exec outputs in order.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    containers: std::sync::Mutex<Vec<ContainerSummary>>,
    exec_script: std::sync::Mutex<std::collections::VecDeque<ExecOutput>>,
    exec_calls: std::sync::Mutex<Vec<(String, Vec<String>)>>,
    fail_actions: bool,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, id: &str, name: &str, label: Option<(&str, &str)>) -> Self {
        let mut labels = HashMap::new();
        if let Some((key, value)) = label {
            labels.insert(key.to_owned(), value.to_owned());
        }
        self.containers
            .lock()
            .expect("mock lock")
            .push(ContainerSummary {
                id: id.to_owned(),
                name: name.to_owned(),
                image: format!("{name}:latest"),
                state: "running".to_owned(),
                labels,
            });
        self
    }

    pub fn with_failing_actions(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    /// Queues an exec result; exhausted scripts yield empty success.
    pub fn push_exec(&self, output: ExecOutput) {
        self.exec_script.lock().expect("mock lock").push_back(output);
    }

    pub fn exec_calls(&self) -> Vec<(String, Vec<String>)> {
        self.exec_calls.lock().expect("mock lock").clone()
    }

    pub fn state_of(&self, id: &str) -> Option<String> {
        self.containers
            .lock()
            .expect("mock lock")
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.state.clone())
    }

    fn set_state(&self, id: &str, state: &str) -> Result<(), DockerRuntimeError> {
        let mut containers = self.containers.lock().expect("mock lock");
        let container = containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| DockerRuntimeError::ContainerNotFound(id.to_owned()))?;
        container.state = state.to_owned();
        Ok(())
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DockerRuntimeError> {
        let containers = self.containers.lock().expect("mock lock");
        Ok(containers
            .iter()
            .filter(|c| all || c.is_running())
            .cloned()
            .collect())
    }

    async fn stop_container(&self, id: &str) -> Result<(), DockerRuntimeError> {
        if self.fail_actions {
            return Err(DockerRuntimeError::ActionFailed {
                container_id: id.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        self.set_state(id, "exited")
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerRuntimeError> {
        if self.fail_actions {
            return Err(DockerRuntimeError::ActionFailed {
                container_id: id.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        self.set_state(id, "running")
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<ExecOutput, DockerRuntimeError> {
        self.exec_calls
            .lock()
            .expect("mock lock")
            .push((id.to_owned(), cmd.to_vec()));
        match self.state_of(id) {
            None => return Err(DockerRuntimeError::ContainerNotFound(id.to_owned())),
            Some(state) if state != "running" => {
                return Err(DockerRuntimeError::NotRunning(id.to_owned()));
            }
            Some(_) => {}
        }
        Ok(self
            .exec_script
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), DockerRuntimeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_container_id_rejects_bad_ids() {
        assert!(validate_container_id("").is_err());
        assert!(validate_container_id(&"a".repeat(65)).is_err());
        assert!(validate_container_id("abc;rm -rf").is_err());
        assert!(validate_container_id("abc123DEF456").is_ok());
    }

    #[test]
    fn exec_output_into_success() {
        let ok = ExecOutput::success("hello");
        assert_eq!(ok.clone().into_success("abc").unwrap().stdout_text(), "hello");

        let failed = ExecOutput {
            stdout: Bytes::new(),
            stderr: Bytes::from_static(b"psql: could not connect\n"),
            exit_code: 2,
        };
        let err = failed.into_success("abc").unwrap_err();
        assert!(matches!(
            err,
            DockerRuntimeError::ExecFailed { exit_code: 2, ref stderr, .. } if stderr == "psql: could not connect"
        ));
    }

    #[tokio::test]
    async fn mock_list_hides_stopped_unless_all() {
        let client = MockDockerClient::new()
            .with_container("aaa111", "lega-db", None)
            .with_container("bbb222", "lega-keys", None);
        client.stop_container("aaa111").await.unwrap();

        assert_eq!(client.list_containers(false).await.unwrap().len(), 1);
        assert_eq!(client.list_containers(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mock_stop_then_start_round_trips_state() {
        let client = MockDockerClient::new().with_container("aaa111", "lega-db", None);
        client.stop_container("aaa111").await.unwrap();
        assert_eq!(client.state_of("aaa111").as_deref(), Some("exited"));
        client.start_container("aaa111").await.unwrap();
        assert_eq!(client.state_of("aaa111").as_deref(), Some("running"));
    }

    #[tokio::test]
    async fn mock_exec_on_stopped_container_is_not_running() {
        let client = MockDockerClient::new().with_container("aaa111", "lega-db", None);
        client.stop_container("aaa111").await.unwrap();
        let err = client
            .exec("aaa111", &["psql".to_owned()])
            .await
            .unwrap_err();
        assert!(matches!(err, DockerRuntimeError::NotRunning(_)));
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn mock_exec_replays_script_in_order() {
        let client = MockDockerClient::new().with_container("aaa111", "lega-db", None);
        client.push_exec(ExecOutput::success("first"));
        client.push_exec(ExecOutput::success("second"));

        let cmd = vec!["true".to_owned()];
        assert_eq!(client.exec("aaa111", &cmd).await.unwrap().stdout_text(), "first");
        assert_eq!(client.exec("aaa111", &cmd).await.unwrap().stdout_text(), "second");
        assert_eq!(client.exec("aaa111", &cmd).await.unwrap().stdout_text(), "");
        assert_eq!(client.exec_calls().len(), 3);
    }

    #[tokio::test]
    async fn mock_failing_actions() {
        let client = MockDockerClient::new()
            .with_container("aaa111", "lega-db", None)
            .with_failing_actions();
        assert!(matches!(
            client.stop_container("aaa111").await.unwrap_err(),
            DockerRuntimeError::ActionFailed { .. }
        ));
        assert!(client.start_container("aaa111").await.is_err());
    }

    #[test]
    fn docker_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<MockDockerClient>();
        assert_send_sync::<BollardDockerClient>();
    }
}
