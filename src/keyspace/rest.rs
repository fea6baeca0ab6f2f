//! Redis-over-REST keyspace backend.
//!
//! Commands are POSTed as JSON arrays (`["SCAN", "0", "MATCH", "resource:*",
//! "COUNT", "10"]`) and answered with `{"result": ...}` or `{"error": "..."}`.
//! Several commands can share one round trip through the `/pipeline`
//! endpoint, which answers with one such object per command.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{KeyValueScanClient, ScanError, ScanPage};
use crate::domain::RatingEntry;

/// Reply envelope for a single command
#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl CommandReply {
    fn into_result(self, command: &str) -> Result<Value, ScanError> {
        match (self.error, self.result) {
            (Some(message), _) => Err(ScanError::Command {
                command: command.to_string(),
                message,
            }),
            (None, Some(value)) => Ok(value),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Keyspace client speaking the REST command protocol
pub struct RestKeyspace {
    /// Endpoint base URL (no trailing slash)
    base_url: String,
    /// Opaque bearer token, passed through untouched
    token: Option<String>,
    /// HTTP client
    client: reqwest::Client,
}

impl RestKeyspace {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        let request = self.client.post(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn command(&self, args: &[String]) -> Result<Value, ScanError> {
        let name = args.first().cloned().unwrap_or_default();
        let reply: CommandReply = self
            .post(self.base_url.clone())
            .json(&args)
            .send()
            .await?
            .json()
            .await?;
        reply.into_result(&name)
    }

    async fn pipeline(&self, commands: &[Vec<String>]) -> Result<Vec<CommandReply>, ScanError> {
        let replies: Vec<CommandReply> = self
            .post(format!("{}/pipeline", self.base_url))
            .json(&commands)
            .send()
            .await?
            .json()
            .await?;

        if replies.len() != commands.len() {
            return Err(ScanError::Protocol {
                command: "PIPELINE".to_string(),
                details: format!("sent {} commands, got {} replies", commands.len(), replies.len()),
            });
        }
        Ok(replies)
    }
}

fn scan_args(cursor: &str, pattern: &str, page_size: usize) -> Vec<String> {
    vec![
        "SCAN".to_string(),
        cursor.to_string(),
        "MATCH".to_string(),
        pattern.to_string(),
        "COUNT".to_string(),
        page_size.to_string(),
    ]
}

fn hgetall_args(key: &str) -> Vec<String> {
    vec!["HGETALL".to_string(), key.to_string()]
}

/// Decode a SCAN reply: `[cursor, [key, ...]]`
fn parse_scan(value: Value) -> Result<ScanPage, ScanError> {
    let protocol = |details: String| ScanError::Protocol {
        command: "SCAN".to_string(),
        details,
    };

    let mut parts = match value {
        Value::Array(parts) => parts,
        other => return Err(protocol(format!("expected array, got {}", other))),
    };
    if parts.len() != 2 {
        return Err(protocol(format!("expected 2 elements, got {}", parts.len())));
    }

    let keys = parts.pop().unwrap_or(Value::Null);
    let next_cursor = match parts.pop().unwrap_or(Value::Null) {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => return Err(protocol(format!("bad cursor {}", other))),
    };

    let keys = match keys {
        Value::Array(keys) => keys,
        other => return Err(protocol(format!("bad key list {}", other))),
    };
    let keys = keys
        .into_iter()
        .map(|k| match k {
            Value::String(s) => Ok(s),
            other => Err(protocol(format!("bad key {}", other))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ScanPage { next_cursor, keys })
}

/// Decode an HGETALL reply: flat `[field, value, ...]`, or null for a missing key
fn parse_hash(value: Value) -> Result<RatingEntry, ScanError> {
    match value {
        Value::Null => Ok(RatingEntry::new()),
        Value::Array(items) => {
            let flat = items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(ScanError::Protocol {
                        command: "HGETALL".to_string(),
                        details: format!("bad hash item {}", other),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RatingEntry::from_flat(flat))
        }
        // Some gateways answer HGETALL with an object
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect()),
        other => Err(ScanError::Protocol {
            command: "HGETALL".to_string(),
            details: format!("expected array, got {}", other),
        }),
    }
}

/// One result per pipelined HGETALL; an error reply stays with its key
fn parse_hash_replies(replies: Vec<CommandReply>) -> Vec<Result<RatingEntry, ScanError>> {
    replies
        .into_iter()
        .map(|reply| reply.into_result("HGETALL").and_then(parse_hash))
        .collect()
}

#[async_trait]
impl KeyValueScanClient for RestKeyspace {
    async fn scan(
        &self,
        cursor: &str,
        pattern: &str,
        page_size: usize,
    ) -> Result<ScanPage, ScanError> {
        let value = self.command(&scan_args(cursor, pattern, page_size)).await?;
        parse_scan(value)
    }

    async fn get_hash(&self, key: &str) -> Result<RatingEntry, ScanError> {
        let value = self.command(&hgetall_args(key)).await?;
        parse_hash(value)
    }

    async fn get_hashes(
        &self,
        keys: &[String],
    ) -> Result<Vec<Result<RatingEntry, ScanError>>, ScanError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let commands: Vec<Vec<String>> = keys.iter().map(|k| hgetall_args(k)).collect();
        debug!(count = commands.len(), "Pipelining HGETALL");

        let replies = self.pipeline(&commands).await?;
        Ok(parse_hash_replies(replies))
    }
}
