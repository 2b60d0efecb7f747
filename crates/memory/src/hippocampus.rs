//! Hippocampus client — RESP2 over TCP.
//!
//! Each command opens a fresh connection, writes one request, reads one
//! reply, and closes. The whole round trip is bounded by the configured
//! timeout.
//!
//! | Operation | Command                                   | Success reply      |
//! |-----------|-------------------------------------------|--------------------|
//! | insert    | `HSET ns key text`                        | `+OK`              |
//! | search    | `HSEARCH ns query epsilon threshold top_k`| array of bulk text |
//! | delete    | `DEL ns`                                  | `+OK`              |
//! | ping      | `PING`                                    | `+PONG`            |

use crate::resp::{encode_command, read_value, RespValue};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use warden_core::error::MemoryError;
use warden_core::memory::{MemoryStore, SearchParams};

/// Client for a Hippocampus associative memory server.
#[derive(Debug, Clone)]
pub struct HippocampusClient {
    address: String,
    timeout: Duration,
}

impl HippocampusClient {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send one command and return its decoded reply.
    pub async fn command(&self, args: &[&str]) -> Result<RespValue, MemoryError> {
        match tokio::time::timeout(self.timeout, self.round_trip(args)).await {
            Ok(result) => result,
            Err(_) => Err(MemoryError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn round_trip(&self, args: &[&str]) -> Result<RespValue, MemoryError> {
        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| MemoryError::Connection {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        stream
            .write_all(&encode_command(args))
            .await
            .map_err(|e| MemoryError::Connection {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        let mut reader = BufReader::new(stream);
        read_value(&mut reader).await
    }
}

#[async_trait]
impl MemoryStore for HippocampusClient {
    fn name(&self) -> &str {
        "hippocampus"
    }

    async fn insert(&self, namespace: &str, key: &str, text: &str) -> Result<bool, MemoryError> {
        let reply = self.command(&["HSET", namespace, key, text]).await?;
        if let RespValue::Error(e) = &reply {
            warn!(namespace, key, error = %e, "HSET rejected");
            return Ok(false);
        }
        debug!(namespace, key, "HSET acknowledged");
        Ok(reply.is_ok())
    }

    async fn search(
        &self,
        namespace: &str,
        query: &str,
        params: SearchParams,
    ) -> Result<Vec<String>, MemoryError> {
        let epsilon = params.epsilon.to_string();
        let threshold = params.threshold.to_string();
        let top_k = params.top_k.to_string();
        let reply = self
            .command(&["HSEARCH", namespace, query, &epsilon, &threshold, &top_k])
            .await?;
        let results = reply.into_strings()?;
        debug!(namespace, hits = results.len(), "HSEARCH complete");
        Ok(results)
    }

    async fn delete(&self, namespace: &str) -> Result<bool, MemoryError> {
        let reply = self.command(&["DEL", namespace]).await?;
        if let RespValue::Error(e) = &reply {
            warn!(namespace, error = %e, "DEL rejected");
            return Ok(false);
        }
        Ok(reply.is_ok())
    }

    async fn ping(&self) -> Result<bool, MemoryError> {
        let reply = self.command(&["PING"]).await?;
        Ok(matches!(reply, RespValue::Simple(ref s) if s == "PONG"))
    }
}
