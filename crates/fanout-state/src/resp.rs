//! RESP2 encoding and blocking reply parsing.
//!
//! Commands always go out as arrays of bulk strings. Replies are read one
//! value at a time from a buffered reader:
//!
//! ```text
//! +OK\r\n               simple string
//! -ERR message\r\n      error
//! :1\r\n                integer
//! $5\r\nhello\r\n       bulk string ($-1 is null)
//! *2\r\n...             array (*-1 is null)
//! ```

use std::io::BufRead;

use crate::error::{StoreError, StoreResult};

/// Maximum nesting depth for arrays.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum bulk string size (512MB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array elements.
pub const MAX_ELEMENTS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Vec<u8>),
    Array(Vec<RespValue>),
    Null,
}

impl RespValue {
    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RespValue::SimpleString(s) if s == "OK")
    }

    /// Encode a value into a buffer.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Error(message) => {
                buf.push(b'-');
                buf.extend_from_slice(message.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::BulkString(data) => encode_bulk(data, buf),
            RespValue::Array(elements) => {
                buf.push(b'*');
                buf.extend_from_slice(elements.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for element in elements {
                    element.encode_into(buf);
                }
            }
            RespValue::Null => buf.extend_from_slice(b"$-1\r\n"),
        }
    }
}

/// Append a command as an array of bulk strings.
pub fn encode_command(args: &[&[u8]], buf: &mut Vec<u8>) {
    buf.push(b'*');
    buf.extend_from_slice(args.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    for arg in args {
        encode_bulk(arg, buf);
    }
}

fn encode_bulk(data: &[u8], buf: &mut Vec<u8>) {
    buf.push(b'$');
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}

/// Read exactly one value. A clean EOF before the first byte is [`StoreError::Closed`].
pub fn read_value<R: BufRead>(reader: &mut R) -> StoreResult<RespValue> {
    read_value_at(reader, 0)
}

fn read_value_at<R: BufRead>(reader: &mut R, depth: usize) -> StoreResult<RespValue> {
    if depth > MAX_NESTING_DEPTH {
        return Err(StoreError::Protocol(
            "maximum nesting depth exceeded".to_string(),
        ));
    }

    let line = read_line(reader)?;
    let Some((&type_byte, rest)) = line.split_first() else {
        return Err(StoreError::Protocol("empty reply line".to_string()));
    };

    match type_byte {
        b'+' => Ok(RespValue::SimpleString(
            String::from_utf8_lossy(rest).into_owned(),
        )),
        b'-' => Ok(RespValue::Error(String::from_utf8_lossy(rest).into_owned())),
        b':' => Ok(RespValue::Integer(parse_integer(rest)?)),
        b'$' => {
            let len = parse_integer(rest)?;
            if len == -1 {
                return Ok(RespValue::Null);
            }
            let len = checked_len(len, MAX_BULK_SIZE, "bulk string")?;
            let mut data = vec![0u8; len + 2];
            reader.read_exact(&mut data)?;
            if !data.ends_with(b"\r\n") {
                return Err(StoreError::Protocol(
                    "bulk string not terminated by CRLF".to_string(),
                ));
            }
            data.truncate(len);
            Ok(RespValue::BulkString(data))
        }
        b'*' => {
            let len = parse_integer(rest)?;
            if len == -1 {
                return Ok(RespValue::Null);
            }
            let len = checked_len(len, MAX_ELEMENTS, "array")?;
            let mut elements = Vec::with_capacity(len);
            for _ in 0..len {
                elements.push(read_value_at(reader, depth + 1)?);
            }
            Ok(RespValue::Array(elements))
        }
        other => Err(StoreError::Protocol(format!(
            "unexpected type byte {:?}",
            other as char
        ))),
    }
}

/// Read one CRLF-terminated line, returned without the terminator.
fn read_line<R: BufRead>(reader: &mut R) -> StoreResult<Vec<u8>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Err(StoreError::Closed);
    }
    if !line.ends_with(b"\r\n") {
        return Err(StoreError::Protocol(
            "line not terminated by CRLF".to_string(),
        ));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_integer(data: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            StoreError::Protocol(format!(
                "invalid integer {:?}",
                String::from_utf8_lossy(data)
            ))
        })
}

fn checked_len(len: i64, max: usize, what: &str) -> StoreResult<usize> {
    usize::try_from(len)
        .ok()
        .filter(|len| *len <= max)
        .ok_or_else(|| StoreError::Protocol(format!("invalid {what} length {len}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(data: &[u8]) -> StoreResult<RespValue> {
        read_value(&mut Cursor::new(data.to_vec()))
    }

    #[test]
    fn test_encode_command() {
        let mut buf = Vec::new();
        encode_command(&[b"HSET", b"b:", b"node1", b"{}"], &mut buf);
        assert_eq!(
            buf,
            b"*4\r\n$4\r\nHSET\r\n$2\r\nb:\r\n$5\r\nnode1\r\n$2\r\n{}\r\n"
        );
    }

    #[test]
    fn test_parse_simple_string() {
        assert_eq!(
            parse(b"+OK\r\n").unwrap(),
            RespValue::SimpleString("OK".into())
        );
        assert!(parse(b"+OK\r\n").unwrap().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(
            parse(b"-WRONGPASS invalid password\r\n").unwrap(),
            RespValue::Error("WRONGPASS invalid password".into())
        );
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse(b":1000\r\n").unwrap(), RespValue::Integer(1000));
        assert_eq!(parse(b":-1\r\n").unwrap(), RespValue::Integer(-1));
        assert!(matches!(parse(b":abc\r\n"), Err(StoreError::Protocol(_))));
    }

    #[test]
    fn test_parse_bulk_string() {
        assert_eq!(parse(b"$6\r\nfoobar\r\n").unwrap(), RespValue::bulk("foobar"));
        assert_eq!(parse(b"$0\r\n\r\n").unwrap(), RespValue::bulk(""));
        assert_eq!(parse(b"$-1\r\n").unwrap(), RespValue::Null);
    }

    #[test]
    fn test_bulk_string_may_contain_crlf() {
        assert_eq!(
            parse(b"$4\r\na\r\nb\r\n").unwrap(),
            RespValue::bulk(b"a\r\nb".to_vec())
        );
    }

    #[test]
    fn test_parse_array() {
        let value = parse(b"*2\r\n$3\r\nfoo\r\n:1\r\n").unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![RespValue::bulk("foo"), RespValue::Integer(1)])
        );
        assert_eq!(parse(b"*0\r\n").unwrap(), RespValue::Array(vec![]));
        assert_eq!(parse(b"*-1\r\n").unwrap(), RespValue::Null);
    }

    #[test]
    fn test_parse_nested_array() {
        let value = parse(b"*2\r\n*1\r\n+QUEUED\r\n:2\r\n").unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Array(vec![RespValue::SimpleString("QUEUED".into())]),
                RespValue::Integer(2),
            ])
        );
    }

    #[test]
    fn test_eof_is_closed() {
        assert!(matches!(parse(b""), Err(StoreError::Closed)));
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(parse(b"+OK"), Err(StoreError::Protocol(_))));
        assert!(matches!(parse(b"$6\r\nfoo"), Err(StoreError::Io(_))));
    }

    #[test]
    fn test_rejects_unknown_type_and_bad_lengths() {
        assert!(matches!(parse(b"%1\r\n"), Err(StoreError::Protocol(_))));
        assert!(matches!(parse(b"$-2\r\n"), Err(StoreError::Protocol(_))));
        assert!(matches!(parse(b"*-5\r\n"), Err(StoreError::Protocol(_))));
    }

    #[test]
    fn test_encode_then_parse_reply() {
        let reply = RespValue::Array(vec![
            RespValue::bulk("node1"),
            RespValue::bulk(r#"{"url":"http://a"}"#),
            RespValue::Null,
            RespValue::Error("ERR oops".into()),
        ]);
        let mut buf = Vec::new();
        reply.encode_into(&mut buf);
        assert_eq!(parse(&buf).unwrap(), reply);
    }

    #[test]
    fn test_reads_consecutive_values() {
        let mut cursor = Cursor::new(b"+OK\r\n+QUEUED\r\n:3\r\n".to_vec());
        assert!(read_value(&mut cursor).unwrap().is_ok());
        assert_eq!(
            read_value(&mut cursor).unwrap(),
            RespValue::SimpleString("QUEUED".into())
        );
        assert_eq!(read_value(&mut cursor).unwrap(), RespValue::Integer(3));
        assert!(matches!(read_value(&mut cursor), Err(StoreError::Closed)));
    }
}
