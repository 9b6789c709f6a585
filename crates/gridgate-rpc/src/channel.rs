//! Framed JSON RPC channel.
//!
//! One request per connection: a 4-byte big-endian length followed by a
//! JSON object `{"id","method","params"}`; the reply carries the same
//! id plus `{"status","message","result"}`. A reply status of 200 yields
//! the result value, anything else becomes an application error with
//! that code. Socket-level failures map to the transport codes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gridgate_core::{GridError, GridResult};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Frames above this size are refused rather than buffered.
const MAX_FRAME: u32 = 16 * 1024 * 1024;

/// Connect and overall deadlines of one call.
#[derive(Debug, Clone, Copy)]
pub struct RpcTimeouts {
    pub connect: Duration,
    pub overall: Duration,
}

impl Default for RpcTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            overall: Duration::from_secs(60),
        }
    }
}

/// Shared channel handing out request ids and applying the deadlines.
pub struct RpcChannel {
    timeouts: RpcTimeouts,
    next_id: AtomicU64,
}

impl RpcChannel {
    pub fn new(timeouts: RpcTimeouts) -> Self {
        Self {
            timeouts,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn timeouts(&self) -> RpcTimeouts {
        self.timeouts
    }

    /// Calls `method` on `addr` under the default overall deadline.
    pub async fn call(&self, addr: &str, method: &str, params: Value) -> GridResult<Value> {
        self.call_deadline(addr, method, params, self.timeouts.overall)
            .await
    }

    /// Calls `method` on `addr` with an explicit overall deadline.
    pub async fn call_deadline(
        &self,
        addr: &str,
        method: &str,
        params: Value,
        overall: Duration,
    ) -> GridResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match tokio::time::timeout(overall, self.exchange(addr, id, method, params)).await {
            Ok(result) => result,
            Err(_) => Err(GridError::timeout(format!(
                "RPC deadline towards [{}] method [{}]",
                addr, method
            ))),
        }
    }

    async fn exchange(
        &self,
        addr: &str,
        id: u64,
        method: &str,
        params: Value,
    ) -> GridResult<Value> {
        let connect = tokio::time::timeout(self.timeouts.connect, TcpStream::connect(addr));
        let mut stream = match connect.await {
            Err(_) => {
                return Err(GridError::timeout(format!("Connect timeout to [{}]", addr)));
            }
            Ok(Err(e)) => {
                return Err(GridError::network(format!("Connect to [{}]: {}", addr, e)));
            }
            Ok(Ok(s)) => s,
        };

        let request = json!({"id": id, "method": method, "params": params});
        let body = serde_json::to_vec(&request)
            .map_err(|e| GridError::internal(format!("Request encoding: {}", e)))?;
        let io_err = |e: std::io::Error| GridError::network(format!("I/O with [{}]: {}", addr, e));

        stream
            .write_all(&(body.len() as u32).to_be_bytes())
            .await
            .map_err(io_err)?;
        stream.write_all(&body).await.map_err(io_err)?;
        stream.flush().await.map_err(io_err)?;

        let mut len = [0u8; 4];
        stream.read_exact(&mut len).await.map_err(io_err)?;
        let len = u32::from_be_bytes(len);
        if len > MAX_FRAME {
            return Err(GridError::network(format!(
                "Oversized frame ({} bytes) from [{}]",
                len, addr
            )));
        }
        let mut frame = vec![0u8; len as usize];
        stream.read_exact(&mut frame).await.map_err(io_err)?;

        let reply: Value = serde_json::from_slice(&frame)
            .map_err(|e| GridError::network(format!("Malformed frame from [{}]: {}", addr, e)))?;
        if reply.get("id").and_then(Value::as_u64) != Some(id) {
            return Err(GridError::network(format!(
                "Reply id mismatch from [{}]",
                addr
            )));
        }

        let status = reply
            .get("status")
            .and_then(Value::as_u64)
            .unwrap_or(u64::from(gridgate_core::CODE_INTERNAL)) as u32;
        if status == 200 {
            Ok(reply.get("result").cloned().unwrap_or(Value::Null))
        } else {
            let message = reply
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            tracing::debug!(addr, method, status, message, "backend error reply");
            Err(GridError::new(status, message))
        }
    }
}
