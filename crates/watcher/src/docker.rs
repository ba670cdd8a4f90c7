//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests script a
//! `MockDockerClient`. Monitors consume only three capabilities: listing
//! running containers, opening a followed log stream, and pinging the
//! daemon.
//!
//! # Container ID validation
//!
//! Methods that accept container IDs validate them first:
//! - 1-64 characters
//! - ASCII hex digits only
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use quaywatch_watcher::BollardDockerClient;
//!
//! let client = Arc::new(BollardDockerClient::connect_local()?);
//! let running = client.list_running().await?;
//! # Ok::<(), quaywatch_watcher::WatchError>(())
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use quaywatch_core::types::ContainerInfo;

use crate::error::WatchError;

/// A followed container log stream: raw byte chunks or carried errors.
pub type LogStream = BoxStream<'static, Result<Bytes, WatchError>>;

/// Validates a container ID before it reaches the Docker API.
fn validate_container_id(id: &str) -> Result<(), WatchError> {
    if id.is_empty() || id.len() > 64 {
        return Err(WatchError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WatchError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Trait abstracting the container runtime operations monitors depend on.
///
/// `Send + Sync + 'static` so an `Arc<impl DockerClient>` can be shared
/// across monitor tasks.
pub trait DockerClient: Send + Sync + 'static {
    /// Lists running containers only (stopped/exited are filtered out).
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::DockerApi`] if the API call fails.
    fn list_running(&self)
    -> impl Future<Output = Result<Vec<ContainerInfo>, WatchError>> + Send;

    /// Opens a followed log stream for a container.
    ///
    /// The stream keeps growing while the container runs (follow
    /// semantics). When `since` is set, only log content newer than
    /// now minus `since` is included.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::DockerApi`] on an invalid ID or API failure.
    fn open_log_stream(
        &self,
        id: &str,
        since: Option<Duration>,
    ) -> impl Future<Output = Result<LogStream, WatchError>> + Send;

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::DockerConnection`] if the daemon is
    /// unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), WatchError>> + Send;
}

/// Production Docker client backed by `bollard`.
///
/// Communicates with the Docker daemon over a Unix socket. Internally holds
/// `Arc<bollard::Docker>` for cheap sharing across async tasks.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the platform's default local socket.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::DockerConnection`] if the connection fails
    /// (socket missing, permission denied, daemon not running).
    pub fn connect_local() -> Result<Self, WatchError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            WatchError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker at a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::DockerConnection`] if the connection fails.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, WatchError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    WatchError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_running(&self) -> Result<Vec<ContainerInfo>, WatchError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false, // only running containers can be monitored for readiness
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| WatchError::DockerApi(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let id = container.id.unwrap_or_default();
            let names = container.names.unwrap_or_default();
            let name = names
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();
            let image = container.image.unwrap_or_default();
            let status = container.state.unwrap_or_default();
            let created = container.created.unwrap_or_default();
            let created_at = SystemTime::UNIX_EPOCH
                + Duration::from_secs(u64::try_from(created).unwrap_or(0));

            result.push(ContainerInfo {
                id,
                name,
                image,
                status,
                created_at,
            });
        }

        Ok(result)
    }

    async fn open_log_stream(
        &self,
        id: &str,
        since: Option<Duration>,
    ) -> Result<LogStream, WatchError> {
        use bollard::container::LogsOptions;

        validate_container_id(id)?;

        // Docker takes `since` as a unix timestamp; 0 means the full history.
        let since_ts = since
            .map(|d| {
                Utc::now()
                    .timestamp()
                    .saturating_sub(i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            })
            .unwrap_or(0);

        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            since: since_ts,
            ..Default::default()
        };

        let stream = self
            .docker
            .logs(id, Some(options))
            .map(|item| {
                item.map(bollard::container::LogOutput::into_bytes)
                    .map_err(|e| WatchError::DockerApi(format!("log stream error: {e}")))
            })
            .boxed();

        Ok(stream)
    }

    async fn ping(&self) -> Result<(), WatchError> {
        self.docker
            .ping()
            .await
            .map_err(|e| WatchError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// Scriptable mock Docker client for unit tests.
///
/// Serves a fixed container list and per-container scripted log chunks.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockDockerClient {
    /// Containers returned by `list_running`.
    pub containers: Vec<ContainerInfo>,
    /// Scripted log chunks per container ID.
    pub log_chunks: std::collections::HashMap<String, Vec<MockChunk>>,
    /// Keep log streams open after the scripted chunks (follow semantics).
    pub hold_open: bool,
    /// Fail every `open_log_stream` call.
    pub fail_logs: bool,
}

/// One scripted log stream item.
#[cfg(test)]
#[derive(Debug, Clone)]
pub enum MockChunk {
    /// Raw bytes delivered by the stream.
    Data(Bytes),
    /// An error carried in-stream.
    Error(String),
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers(mut self, containers: Vec<ContainerInfo>) -> Self {
        self.containers = containers;
        self
    }

    /// Scripts the log stream for a container from whole text lines.
    pub fn with_log_lines(mut self, id: &str, lines: &[&str]) -> Self {
        let chunks = lines
            .iter()
            .map(|l| MockChunk::Data(Bytes::from(format!("{l}\n"))))
            .collect();
        self.log_chunks.insert(id.to_owned(), chunks);
        self
    }

    pub fn with_log_chunks(mut self, id: &str, chunks: Vec<MockChunk>) -> Self {
        self.log_chunks.insert(id.to_owned(), chunks);
        self
    }

    /// Keeps streams open after their scripted chunks are exhausted.
    pub fn with_held_open_streams(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn with_failing_logs(mut self) -> Self {
        self.fail_logs = true;
        self
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_running(&self) -> Result<Vec<ContainerInfo>, WatchError> {
        Ok(self.containers.clone())
    }

    async fn open_log_stream(
        &self,
        id: &str,
        _since: Option<Duration>,
    ) -> Result<LogStream, WatchError> {
        use futures_util::stream;

        if self.fail_logs {
            return Err(WatchError::DockerApi("mock log failure".to_owned()));
        }

        let chunks = self.log_chunks.get(id).cloned().unwrap_or_default();
        let items = chunks.into_iter().map(|chunk| match chunk {
            MockChunk::Data(bytes) => Ok(bytes),
            MockChunk::Error(reason) => Err(WatchError::DockerApi(reason)),
        });

        if self.hold_open {
            Ok(stream::iter(items).chain(stream::pending()).boxed())
        } else {
            Ok(stream::iter(items).boxed())
        }
    }

    async fn ping(&self) -> Result<(), WatchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_container() -> ContainerInfo {
        ContainerInfo {
            id: "abc123def456".to_owned(),
            name: "web-server".to_owned(),
            image: "nginx:latest".to_owned(),
            status: "running".to_owned(),
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn container_id_validation() {
        assert!(validate_container_id("abc123def456").is_ok());
        assert!(validate_container_id("").is_err());
        assert!(validate_container_id(&"a".repeat(65)).is_err());
        assert!(validate_container_id("abc$123").is_err());
    }

    #[tokio::test]
    async fn mock_lists_containers() {
        let client = MockDockerClient::new().with_containers(vec![sample_container()]);
        let running = client.list_running().await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].name, "web-server");
    }

    #[tokio::test]
    async fn mock_scripted_log_stream() {
        let client = MockDockerClient::new().with_log_lines("abc123", &["line one", "line two"]);
        let mut stream = client.open_log_stream("abc123", None).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, Bytes::from("line one\n"));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second, Bytes::from("line two\n"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn mock_stream_carries_errors() {
        let client = MockDockerClient::new().with_log_chunks(
            "abc123",
            vec![
                MockChunk::Data(Bytes::from("ok\n")),
                MockChunk::Error("read failed".to_owned()),
            ],
        );
        let mut stream = client.open_log_stream("abc123", None).await.unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("read failed"));
    }

    #[tokio::test]
    async fn mock_unknown_container_yields_empty_stream() {
        let client = MockDockerClient::new();
        let mut stream = client.open_log_stream("abc123", None).await.unwrap();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn mock_failing_logs() {
        let client = MockDockerClient::new().with_failing_logs();
        assert!(client.open_log_stream("abc123", None).await.is_err());
    }

    #[tokio::test]
    async fn mock_ping_succeeds() {
        let client = MockDockerClient::new();
        client.ping().await.unwrap();
    }

    #[test]
    fn docker_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<MockDockerClient>();
        assert_send_sync::<BollardDockerClient>();
    }
}
