//! Client for the supervisor's control socket.
//!
//! The protocol is newline-delimited JSON, one request line and one response
//! line per connection:
//!
//! ```text
//! -> {"version":1,"command":"info"}
//! <- {"version":1,"status":"ok","payload":{"sshLocalPort":60022}}
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use super::error::{InspectError, SupervisorError};

/// Protocol version spoken on the control socket
pub const PROTOCOL_VERSION: u32 = 1;

/// Longest reply line accepted from a supervisor
const MAX_REPLY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub version: u32,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub version: u32,
    /// `"ok"` or `"error"`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

/// Live runtime information reported by a running supervisor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// Host port actually forwarded to the guest's sshd
    pub ssh_local_port: u16,
}

/// A connection to one supervisor
#[derive(Debug)]
pub struct SupervisorClient {
    socket: PathBuf,
    #[cfg(unix)]
    stream: tokio::net::UnixStream,
}

impl SupervisorClient {
    #[cfg(unix)]
    pub async fn connect(socket: &Path) -> Result<Self, SupervisorError> {
        let stream = tokio::net::UnixStream::connect(socket)
            .await
            .map_err(SupervisorError::Connect)?;
        Ok(Self {
            socket: socket.to_path_buf(),
            stream,
        })
    }

    #[cfg(not(unix))]
    pub async fn connect(socket: &Path) -> Result<Self, SupervisorError> {
        let _ = socket;
        Err(SupervisorError::Unsupported)
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Ask the supervisor for its runtime info
    pub async fn info(&mut self) -> Result<Info, SupervisorError> {
        let response = self.call("info").await?;
        if response.status != "ok" {
            let (code, message) = response
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_else(|| (response.status.clone(), "unknown error".to_string()));
            return Err(SupervisorError::Remote { code, message });
        }
        let payload = response
            .payload
            .ok_or_else(|| SupervisorError::Protocol("reply has no payload".to_string()))?;
        serde_json::from_value(payload).map_err(|e| SupervisorError::Protocol(e.to_string()))
    }

    #[cfg(unix)]
    async fn call(&mut self, command: &str) -> Result<Response, SupervisorError> {
        use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

        let request = Request {
            version: PROTOCOL_VERSION,
            command: command.to_string(),
        };
        let mut line = serde_json::to_vec(&request)
            .map_err(|e| SupervisorError::Protocol(e.to_string()))?;
        line.push(b'\n');

        let (reader, mut writer) = self.stream.split();
        writer.write_all(&line).await?;
        writer.flush().await?;

        let mut reply = String::new();
        let read = BufReader::new(reader.take(MAX_REPLY_BYTES))
            .read_line(&mut reply)
            .await?;
        if read == 0 {
            return Err(SupervisorError::Protocol(
                "connection closed before reply".to_string(),
            ));
        }
        if !reply.ends_with('\n') && read as u64 >= MAX_REPLY_BYTES {
            return Err(SupervisorError::Protocol(format!(
                "reply exceeds {} bytes",
                MAX_REPLY_BYTES
            )));
        }
        serde_json::from_str(reply.trim_end()).map_err(|e| SupervisorError::Protocol(e.to_string()))
    }

    #[cfg(not(unix))]
    async fn call(&mut self, command: &str) -> Result<Response, SupervisorError> {
        let _ = command;
        Err(SupervisorError::Unsupported)
    }
}

/// Connect to `socket` and fetch [`Info`], all within one deadline.
///
/// Failures are tagged with the socket path so they can be reported on the instance.
pub async fn query_info(socket: &Path, timeout: Duration) -> Result<Info, InspectError> {
    let deadline = Instant::now() + timeout;

    let mut client = match timeout_at(deadline, SupervisorClient::connect(socket)).await {
        Ok(Ok(client)) => client,
        Ok(Err(source)) => {
            return Err(InspectError::SupervisorConnect {
                socket: socket.to_path_buf(),
                source,
            })
        }
        Err(_) => {
            return Err(InspectError::SupervisorConnect {
                socket: socket.to_path_buf(),
                source: SupervisorError::Timeout(timeout),
            })
        }
    };

    let result = match timeout_at(deadline, client.info()).await {
        Ok(result) => result,
        Err(_) => Err(SupervisorError::Timeout(timeout)),
    };
    debug!("Info from {:?}: {:?}", socket, result);

    result.map_err(|source| InspectError::SupervisorInfo {
        socket: socket.to_path_buf(),
        source,
    })
}
