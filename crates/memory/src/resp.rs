//! Minimal RESP2 codec for the Hippocampus wire protocol.
//!
//! Commands are always sent as arrays of bulk strings. Replies may be any of
//! the five RESP2 types; arrays are only one level deep in practice, so nested
//! arrays are rejected as a protocol error.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use warden_core::error::MemoryError;

/// Largest bulk string accepted from the server.
const MAX_BULK_LEN: i64 = 64 * 1024 * 1024;
/// Largest array reply accepted from the server.
const MAX_ARRAY_LEN: i64 = 1 << 16;

/// A decoded RESP2 reply.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    /// `None` is the nil bulk string (`$-1`).
    Bulk(Option<String>),
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Treat `+OK`, a positive integer, or a non-nil bulk string as success.
    pub fn is_ok(&self) -> bool {
        match self {
            RespValue::Simple(s) => s.eq_ignore_ascii_case("OK"),
            RespValue::Integer(n) => *n > 0,
            RespValue::Bulk(b) => b.is_some(),
            _ => false,
        }
    }

    /// Flatten an array reply into its non-nil string elements.
    pub fn into_strings(self) -> Result<Vec<String>, MemoryError> {
        match self {
            RespValue::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    RespValue::Bulk(b) => b,
                    RespValue::Simple(s) => Some(s),
                    _ => None,
                })
                .collect()),
            RespValue::Bulk(None) => Ok(Vec::new()),
            RespValue::Error(e) => Err(MemoryError::QueryFailed(e)),
            other => Err(MemoryError::Protocol(format!("expected array reply, got {other:?}"))),
        }
    }
}

/// Encode a command as a RESP array of bulk strings. Lengths are byte counts.
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Read one complete reply from the stream.
pub async fn read_value<R>(reader: &mut R) -> Result<RespValue, MemoryError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let (tag, rest) = split_tag(&line)?;
    if tag == b'*' {
        let count = parse_int(rest)?;
        if count < 0 {
            return Ok(RespValue::Bulk(None));
        }
        if count > MAX_ARRAY_LEN {
            return Err(MemoryError::Protocol(format!(
                "array reply of {count} elements exceeds limit of {MAX_ARRAY_LEN}"
            )));
        }
        let mut items = Vec::new();
        for _ in 0..count {
            let line = read_line(reader).await?;
            let (tag, rest) = split_tag(&line)?;
            if tag == b'*' {
                return Err(MemoryError::Protocol("nested arrays are not supported".into()));
            }
            items.push(read_scalar(reader, tag, rest).await?);
        }
        return Ok(RespValue::Array(items));
    }
    read_scalar(reader, tag, rest).await
}

async fn read_scalar<R>(reader: &mut R, tag: u8, rest: &str) -> Result<RespValue, MemoryError>
where
    R: AsyncBufRead + Unpin,
{
    match tag {
        b'+' => Ok(RespValue::Simple(rest.to_string())),
        b'-' => Ok(RespValue::Error(rest.to_string())),
        b':' => Ok(RespValue::Integer(parse_int(rest)?)),
        b'$' => {
            let len = parse_int(rest)?;
            if len < 0 {
                return Ok(RespValue::Bulk(None));
            }
            if len > MAX_BULK_LEN {
                return Err(MemoryError::Protocol(format!(
                    "bulk string of {len} bytes exceeds limit of {MAX_BULK_LEN}"
                )));
            }
            let len = usize::try_from(len)
                .map_err(|_| MemoryError::Protocol(format!("bulk length {len} does not fit in memory")))?;
            let framed = len
                .checked_add(2)
                .ok_or_else(|| MemoryError::Protocol("bulk length overflow".into()))?;
            let mut buf = vec![0u8; framed];
            reader.read_exact(&mut buf).await.map_err(io_err)?;
            if &buf[len..] != b"\r\n" {
                return Err(MemoryError::Protocol("bulk string missing CRLF terminator".into()));
            }
            buf.truncate(len);
            String::from_utf8(buf)
                .map(|s| RespValue::Bulk(Some(s)))
                .map_err(|e| MemoryError::Protocol(format!("bulk string is not UTF-8: {e}")))
        }
        other => Err(MemoryError::Protocol(format!(
            "unknown reply type byte {:?}",
            other as char
        ))),
    }
}

async fn read_line<R>(reader: &mut R) -> Result<String, MemoryError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.map_err(io_err)?;
    if n == 0 {
        return Err(MemoryError::Protocol("connection closed before reply".into()));
    }
    if !line.ends_with("\r\n") {
        return Err(MemoryError::Protocol("reply line missing CRLF terminator".into()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn split_tag(line: &str) -> Result<(u8, &str), MemoryError> {
    let tag = *line
        .as_bytes()
        .first()
        .ok_or_else(|| MemoryError::Protocol("empty reply line".into()))?;
    // The tag is always ASCII, so slicing at 1 stays on a char boundary.
    Ok((tag, &line[1..]))
}

fn parse_int(s: &str) -> Result<i64, MemoryError> {
    s.parse::<i64>()
        .map_err(|_| MemoryError::Protocol(format!("invalid integer in reply: {s:?}")))
}

fn io_err(e: std::io::Error) -> MemoryError {
    MemoryError::Protocol(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode(bytes: &[u8]) -> Result<RespValue, MemoryError> {
        let mut reader = tokio::io::BufReader::new(bytes);
        read_value(&mut reader).await
    }

    #[test]
    fn encodes_commands_with_byte_lengths() {
        let encoded = encode_command(&["HSET", "agent-1", "café"]);
        assert_eq!(encoded, b"*3\r\n$4\r\nHSET\r\n$7\r\nagent-1\r\n$5\r\ncaf\xc3\xa9\r\n".to_vec());
    }

    #[tokio::test]
    async fn decodes_simple_and_error_replies() {
        assert_eq!(decode(b"+OK\r\n").await.unwrap(), RespValue::Simple("OK".into()));
        assert_eq!(
            decode(b"-ERR unknown namespace\r\n").await.unwrap(),
            RespValue::Error("ERR unknown namespace".into())
        );
        assert_eq!(decode(b":3\r\n").await.unwrap(), RespValue::Integer(3));
    }

    #[tokio::test]
    async fn decodes_search_array_with_nil() {
        let reply = decode(b"*3\r\n$11\r\nOpen 9AM-5P\r\n$-1\r\n$5\r\nhello\r\n").await.unwrap();
        assert_eq!(reply.clone().into_strings().unwrap(), vec!["Open 9AM-5P", "hello"]);
        assert!(!reply.is_ok());
    }

    #[tokio::test]
    async fn truncated_reply_is_protocol_error() {
        let err = decode(b"$10\r\nshort\r\n").await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
        let err = decode(b"").await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
    }

    #[tokio::test]
    async fn oversized_headers_are_protocol_errors() {
        let err = decode(b"*9223372036854775807\r\n").await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
        let err = decode(b"$9223372036854775807\r\nabc\r\n").await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
        let err = decode(b"*1\r\n$9223372036854775807\r\nabc\r\n").await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
    }

    #[tokio::test]
    async fn short_array_body_is_protocol_error() {
        let err = decode(b"*65536\r\n$2\r\nok\r\n").await.unwrap_err();
        assert!(matches!(err, MemoryError::Protocol(_)));
    }

    #[test]
    fn error_reply_is_query_failure() {
        let err = RespValue::Error("ERR boom".into()).into_strings().unwrap_err();
        assert!(matches!(err, MemoryError::QueryFailed(_)));
    }
}
