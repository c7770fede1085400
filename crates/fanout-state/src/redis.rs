//! Blocking Redis client speaking RESP2 over a single TCP connection.
//!
//! Only the handful of commands the publisher needs are implemented:
//! `AUTH`, `SELECT`, `DEL`, `HSET`, `HGETALL`, and `MULTI`/`EXEC` for the
//! atomic replace.
//!
//! ```text
//! sequential:  DEL b:            atomic:  MULTI            → +OK
//!              HSET b: node1 ..           DEL b:           → +QUEUED
//!              HSET b: node2 ..           HSET b: node1 .. → +QUEUED
//!                                         EXEC             → *N results
//! ```

use std::collections::BTreeMap;
use std::io::{self, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::resp::{self, RespValue};
use crate::store::KvStore;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub host: String,
    pub port: u16,
    /// Logical database index passed to `SELECT`.
    pub db: u32,
    /// Sent with `AUTH` when present and non-empty.
    pub password: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl ConnectionOptions {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct RedisStore {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    addr: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("addr", &self.addr)
            .finish()
    }
}

impl RedisStore {
    /// Connect, authenticate, and select the logical database.
    pub fn connect(options: &ConnectionOptions) -> StoreResult<Self> {
        let addr = options.addr();
        let stream = open_stream(&options.host, options.port).map_err(|e| StoreError::Connect {
            addr: addr.clone(),
            message: e.to_string(),
        })?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_nodelay(true)?;

        let mut store = Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
            addr,
        };

        if let Some(password) = options.password.as_deref().filter(|p| !p.is_empty()) {
            store
                .command(&[b"AUTH", password.as_bytes()])
                .map_err(|e| match e {
                    StoreError::Command { message, .. } => StoreError::Auth(message),
                    other => other,
                })?;
        }

        if options.db != 0 {
            let db = options.db.to_string();
            store
                .command(&[b"SELECT", db.as_bytes()])
                .map_err(|e| match e {
                    StoreError::Command { message, .. } => StoreError::SelectDb {
                        db: options.db,
                        message,
                    },
                    other => other,
                })?;
        }

        debug!(addr = %store.addr, db = options.db, "connected to redis");
        Ok(store)
    }

    /// Send one command and wait for its reply. Error replies become
    /// [`StoreError::Command`].
    pub fn command(&mut self, args: &[&[u8]]) -> StoreResult<RespValue> {
        let mut buf = Vec::new();
        resp::encode_command(args, &mut buf);
        self.writer.write_all(&buf)?;
        self.read_reply(command_name(args))
    }

    fn read_reply(&mut self, command: &str) -> StoreResult<RespValue> {
        match resp::read_value(&mut self.reader)? {
            RespValue::Error(message) => Err(StoreError::Command {
                command: command.to_string(),
                message,
            }),
            value => Ok(value),
        }
    }
}

impl KvStore for RedisStore {
    fn delete(&mut self, key: &str) -> StoreResult<()> {
        self.command(&[b"DEL", key.as_bytes()])?;
        Ok(())
    }

    fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        self.command(&[b"HSET", key.as_bytes(), field.as_bytes(), value])?;
        Ok(())
    }

    fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        let items = match self.command(&[b"HGETALL", key.as_bytes()])? {
            RespValue::Array(items) => items,
            other => {
                return Err(StoreError::Protocol(format!("HGETALL returned {other:?}")));
            }
        };
        if items.len() % 2 != 0 {
            return Err(StoreError::Protocol(
                "HGETALL returned an odd number of elements".to_string(),
            ));
        }

        let mut fields = BTreeMap::new();
        let mut items = items.into_iter();
        while let (Some(field), Some(value)) = (items.next(), items.next()) {
            let (RespValue::BulkString(field), RespValue::BulkString(value)) = (field, value)
            else {
                return Err(StoreError::Protocol(
                    "HGETALL returned a non-bulk element".to_string(),
                ));
            };
            let field = String::from_utf8(field)
                .map_err(|_| StoreError::Protocol("hash field is not UTF-8".to_string()))?;
            fields.insert(field, value);
        }
        Ok(fields)
    }

    fn replace_hash(&mut self, key: &str, fields: &[(String, Vec<u8>)]) -> StoreResult<()> {
        let opened = self.command(&[b"MULTI"])?;
        if !opened.is_ok() {
            return Err(StoreError::Protocol(format!("MULTI returned {opened:?}")));
        }

        // Everything after MULTI is pipelined; replies are read in order.
        let mut buf = Vec::new();
        let mut queued = vec!["DEL"];
        resp::encode_command(&[b"DEL", key.as_bytes()], &mut buf);
        for (field, value) in fields {
            resp::encode_command(&[b"HSET", key.as_bytes(), field.as_bytes(), value], &mut buf);
            queued.push("HSET");
        }
        resp::encode_command(&[b"EXEC"], &mut buf);
        self.writer.write_all(&buf)?;

        let mut first_error = None;
        for command in queued {
            if let Err(err) = self.read_reply(command) {
                first_error.get_or_insert(err);
            }
        }
        let exec = self.read_reply("EXEC");

        if let Some(err) = first_error {
            // The server discards the transaction on EXEC after a queuing error.
            return Err(err);
        }
        match exec? {
            RespValue::Array(results) => {
                for result in results {
                    if let RespValue::Error(message) = result {
                        return Err(StoreError::Command {
                            command: "EXEC".to_string(),
                            message,
                        });
                    }
                }
                debug!(%key, fields = fields.len(), "hash replaced atomically");
                Ok(())
            }
            RespValue::Null => Err(StoreError::Aborted),
            other => Err(StoreError::Protocol(format!("EXEC returned {other:?}"))),
        }
    }
}

fn command_name(args: &[&[u8]]) -> &'static str {
    match args.first().copied() {
        Some(b"AUTH") => "AUTH",
        Some(b"SELECT") => "SELECT",
        Some(b"DEL") => "DEL",
        Some(b"HSET") => "HSET",
        Some(b"HGETALL") => "HGETALL",
        Some(b"MULTI") => "MULTI",
        Some(b"EXEC") => "EXEC",
        _ => "command",
    }
}

/// Try each resolved address in turn.
fn open_stream(host: &str, port: u16) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}
