//! JSON-RPC Engine Gateway
//!
//! Speaks JSON-RPC 2.0 to the storage engine, one connection per call.
//! Responses are not newline delimited, so a response is complete once the
//! buffered bytes parse as a single JSON value.

use super::{EngineAddress, EngineConfig};
use crate::domain::ports::{
    commands, AttachParams, DetachParams, EngineGateway, EngineIoStats, EngineNamespaceList,
    ListParams,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tracing::{debug, warn};

const VERSION_METHOD: &str = "spdk_get_version";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<P>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    #[serde(default)]
    id: Option<u64>,
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

// =============================================================================
// Gateway
// =============================================================================

/// Engine gateway over JSON-RPC 2.0
pub struct JsonRpcGateway {
    address: EngineAddress,
    timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcGateway {
    /// Create a new gateway. No connection is made until the first call.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            address: EngineAddress::parse(&config.address)?,
            timeout: config.call_timeout(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn address(&self) -> &EngineAddress {
        &self.address
    }

    /// Invoke an engine method, bounded by the configured call timeout
    pub async fn call<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = serde_json::to_vec(&RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        })
        .map_err(|e| transport(method, e))?;

        debug!("Sending {} (id {}) to {}", method, id, self.address);

        let raw = match tokio::time::timeout(self.timeout, self.exchange(method, &request)).await {
            Ok(raw) => raw?,
            Err(_) => {
                warn!("{} timed out after {:?}", method, self.timeout);
                return Err(Error::EngineTimeout {
                    command: method.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let response: RpcResponse<R> =
            serde_json::from_slice(&raw).map_err(|e| transport(method, e))?;

        if response.id.is_some_and(|rid| rid != id) {
            return Err(transport(
                method,
                format!("response id {:?} does not match request id {}", response.id, id),
            ));
        }
        if let Some(err) = response.error {
            warn!("{} rejected by engine: {} ({})", method, err.message, err.code);
            return Err(Error::EngineRejected {
                command: method.to_string(),
                reason: format!("code {}: {}", err.code, err.message),
            });
        }
        response
            .result
            .ok_or_else(|| transport(method, "response carries neither result nor error"))
    }

    async fn exchange(&self, method: &str, request: &[u8]) -> Result<Vec<u8>> {
        match &self.address {
            EngineAddress::Unix(path) => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(|e| transport(method, e))?;
                round_trip(stream, method, request).await
            }
            EngineAddress::Tcp(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| transport(method, e))?;
                round_trip(stream, method, request).await
            }
        }
    }

    /// Invoke a method whose result is a success flag
    async fn call_flag<P: Serialize + Send>(&self, method: &str, params: P) -> Result<()> {
        let accepted: bool = self.call(method, Some(params)).await?;
        if accepted {
            Ok(())
        } else {
            Err(Error::EngineRejected {
                command: method.to_string(),
                reason: "engine returned false".into(),
            })
        }
    }
}

async fn round_trip<S>(mut stream: S, method: &str, request: &[u8]) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(request)
        .await
        .map_err(|e| transport(method, e))?;
    stream.flush().await.map_err(|e| transport(method, e))?;

    let mut buf = Vec::with_capacity(4096);
    loop {
        let n = stream
            .read_buf(&mut buf)
            .await
            .map_err(|e| transport(method, e))?;
        if n == 0 {
            return Err(transport(method, "connection closed before a complete response"));
        }
        match serde_json::from_slice::<serde::de::IgnoredAny>(&buf) {
            Ok(_) => return Ok(buf),
            Err(e) if e.is_eof() => continue,
            Err(e) => return Err(transport(method, e)),
        }
    }
}

fn transport(method: &str, reason: impl std::fmt::Display) -> Error {
    Error::EngineTransport {
        command: method.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl EngineGateway for JsonRpcGateway {
    async fn attach(&self, params: AttachParams) -> Result<()> {
        self.call_flag(commands::ATTACH, params).await
    }

    async fn detach(&self, params: DetachParams) -> Result<()> {
        self.call_flag(commands::DETACH, params).await
    }

    async fn list(&self, params: ListParams) -> Result<EngineNamespaceList> {
        self.call(commands::LIST, Some(params)).await
    }

    async fn iostat(&self) -> Result<EngineIoStats> {
        self.call::<(), _>(commands::IOSTAT, None).await
    }

    async fn health_check(&self) -> Result<bool> {
        match self.call::<(), serde_json::Value>(VERSION_METHOD, None).await {
            Ok(version) => {
                debug!("Engine version: {}", version);
                Ok(true)
            }
            Err(e) if e.is_transient() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn engine_name(&self) -> &str {
        "jsonrpc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{json, Value};
    use tokio::net::UnixListener;
    use tokio::task::JoinHandle;

    /// Accept one connection, capture the request, and answer in two chunks
    fn serve_once<F>(listener: UnixListener, reply: F) -> JoinHandle<Value>
    where
        F: FnOnce(&Value) -> Value + Send + 'static,
    {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let request: Value = loop {
                stream.read_buf(&mut buf).await.unwrap();
                if let Ok(v) = serde_json::from_slice(&buf) {
                    break v;
                }
            };
            let body = serde_json::to_vec(&reply(&request)).unwrap();
            let (head, tail) = body.split_at(body.len() / 2);
            stream.write_all(head).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            stream.write_all(tail).await.unwrap();
            request
        })
    }

    fn gateway_for(path: &std::path::Path, timeout_ms: u64) -> JsonRpcGateway {
        JsonRpcGateway::new(&EngineConfig {
            address: format!("unix:{}", path.display()),
            call_timeout_ms: timeout_ms,
        })
        .unwrap()
    }

    fn attach_params() -> AttachParams {
        AttachParams {
            bdev_type: "spdk".into(),
            bdev: "v1".into(),
            nsid: 5,
            subnqn: "nqn.2022-09.io.spdk:opi1".into(),
            cntlid: 0,
            uuid: String::new(),
            nguid: String::new(),
            eui64: "0".into(),
        }
    }

    #[tokio::test]
    async fn test_attach_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = serve_once(listener, |req| {
            json!({"jsonrpc": "2.0", "id": req["id"], "result": true})
        });

        let gateway = gateway_for(&path, 1_000);
        gateway.attach(attach_params()).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request["method"], commands::ATTACH);
        assert_eq!(request["params"]["nsid"], 5);
        assert_eq!(request["params"]["bdev"], "v1");
        assert_eq!(request["params"]["subnqn"], "nqn.2022-09.io.spdk:opi1");
    }

    #[tokio::test]
    async fn test_attach_refused_is_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = serve_once(listener, |req| {
            json!({"jsonrpc": "2.0", "id": req["id"], "result": false})
        });

        let gateway = gateway_for(&path, 1_000);
        let err = gateway.attach(attach_params()).await.unwrap_err();
        assert_matches!(err, Error::EngineRejected { .. });
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_error_object_is_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = serve_once(listener, |req| {
            json!({"jsonrpc": "2.0", "id": req["id"],
                   "error": {"code": -32602, "message": "Invalid parameters"}})
        });

        let gateway = gateway_for(&path, 1_000);
        let err = gateway
            .detach(DetachParams {
                nsid: 5,
                subnqn: "nqn.2022-09.io.spdk:opi1".into(),
                cntlid: 0,
            })
            .await
            .unwrap_err();
        assert_matches!(err, Error::EngineRejected { ref reason, .. } if reason.contains("-32602"));
    }

    #[tokio::test]
    async fn test_list_and_iostat_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sock");

        let listener = UnixListener::bind(&path).unwrap();
        let server = serve_once(listener, |req| {
            json!({"jsonrpc": "2.0", "id": req["id"], "result": {
                "name": "nqn.2022-09.io.spdk:opi1",
                "cntlid": 0,
                "namespaces": [{"nsid": 3, "bdev": "v3"}, {"nsid": 1, "bdev": "v1"}]
            }})
        });
        let gateway = gateway_for(&path, 1_000);
        let list = gateway
            .list(ListParams {
                subnqn: "nqn.2022-09.io.spdk:opi1".into(),
                cntlid: 0,
            })
            .await
            .unwrap();
        assert_eq!(list.namespaces.len(), 2);
        assert_eq!(list.namespaces[0].nsid, 3);
        server.await.unwrap();

        let listener = UnixListener::bind(dir.path().join("iostat.sock")).unwrap();
        let server = serve_once(listener, |req| {
            json!({"jsonrpc": "2.0", "id": req["id"], "result": {
                "controllers": [{"name": "c0", "bdevs": [
                    {"bdev_name": "v1", "read_ios": 10, "write_ios": 3}
                ]}]
            }})
        });
        let gateway = gateway_for(&dir.path().join("iostat.sock"), 1_000);
        let stats = gateway.iostat().await.unwrap();
        assert_eq!(stats.find_device("v1").unwrap().read_ios, 10);

        let request = server.await.unwrap();
        assert_eq!(request["method"], commands::IOSTAT);
        assert!(request.get("params").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_transport_failure() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_for(&dir.path().join("missing.sock"), 1_000);

        let err = gateway.iostat().await.unwrap_err();
        assert_matches!(err, Error::EngineTransport { .. });
        assert!(err.is_retryable());
        assert!(!gateway.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_silent_engine_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let gateway = gateway_for(&path, 50);
        let err = gateway.iostat().await.unwrap_err();
        assert_matches!(err, Error::EngineTimeout { .. });
    }
}
