use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use crate::error::{EventsError, Result};

use super::{
    FindMissingMessagesRequest, FindMissingMessagesResponse, GetSignedVaaRequest,
    GetSignedVaaResponse, InjectGovernanceVaaRequest, InjectGovernanceVaaResponse, RpcRequest,
    RpcResponse, FIND_MISSING_MESSAGES, GET_SIGNED_VAA, INJECT_GOVERNANCE_VAA,
};

pub const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the control plane listens and how long one command may take.
#[derive(Debug, Clone)]
pub struct AdminEndpoint {
    pub socket: PathBuf,
    pub timeout: Duration,
}

impl AdminEndpoint {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            timeout: RPC_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Opens a connection, hands it to `f` and bounds the whole exchange by
    /// the endpoint timeout. `f` owns the client, so the connection is closed
    /// when it returns, fails or is cancelled by the timeout.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(AdminClient) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let exchange = async move {
            let client = AdminClient::connect(&self.socket).await?;
            f(client).await
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(EventsError::Unavailable(format!(
                "RPC to {} timed out after {:?}",
                self.socket.display(),
                self.timeout
            ))),
        }
    }
}

pub struct AdminClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl AdminClient {
    pub async fn connect(socket: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket).await.map_err(|e| {
            EventsError::Unavailable(format!("failed to connect to {}: {e}", socket.display()))
        })?;
        tracing::debug!(socket = %socket.display(), "Connected to admin socket");

        let (read, write) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer: write,
        })
    }

    async fn call<P, R>(&mut self, method: &'static str, params: &P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let mut line = serde_json::to_vec(&RpcRequest {
            method: method.to_string(),
            params,
        })?;
        line.push(b'\n');

        let lost = |e: std::io::Error| {
            EventsError::Unavailable(format!("{method}: connection to admin socket lost: {e}"))
        };
        self.writer.write_all(&line).await.map_err(lost)?;
        self.writer.flush().await.map_err(lost)?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply).await.map_err(lost)? == 0 {
            return Err(EventsError::Unavailable(format!(
                "{method}: admin socket closed before replying"
            )));
        }

        match serde_json::from_str::<RpcResponse<R>>(&reply)? {
            RpcResponse::Result(result) => Ok(result),
            RpcResponse::Error(body) => Err(EventsError::Rpc {
                method,
                message: body.message,
            }),
        }
    }

    pub async fn inject_governance_vaa(
        &mut self,
        request: &InjectGovernanceVaaRequest,
    ) -> Result<InjectGovernanceVaaResponse> {
        self.call(INJECT_GOVERNANCE_VAA, request).await
    }

    pub async fn find_missing_messages(
        &mut self,
        request: &FindMissingMessagesRequest,
    ) -> Result<FindMissingMessagesResponse> {
        self.call(FIND_MISSING_MESSAGES, request).await
    }

    pub async fn get_signed_vaa(
        &mut self,
        request: &GetSignedVaaRequest,
    ) -> Result<GetSignedVaaResponse> {
        self.call(GET_SIGNED_VAA, request).await
    }
}
