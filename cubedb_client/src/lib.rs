//! A minimal asynchronous client for the CubeDB line protocol.
//!
//! The readers mirror the reply framing one-to-one: a status line for OK
//! and errors, a count line followed by that many payload lines for the
//! list shapes. Any negative status is surfaced as [`Error::Server`];
//! both historical server code sets are therefore accepted.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("connection error: {}", source))]
    Connect { source: std::io::Error },

    #[snafu(display("I/O error: {}", source))]
    Io { source: std::io::Error },

    #[snafu(display("server closed the connection"))]
    Closed,

    #[snafu(display("server error {}", code))]
    Server { code: i64 },

    #[snafu(display("unexpected reply line {:?}", line))]
    UnexpectedReply { line: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One protocol connection.
#[derive(Debug)]
pub struct Client {
    stream: BufStream<TcpStream>,
}

impl Client {
    /// Connect to a CubeDB server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.context(ConnectSnafu)?;
        Ok(Self {
            stream: BufStream::new(stream),
        })
    }

    /// Send one request line.
    pub async fn send(&mut self, line: &str) -> Result<()> {
        self.stream.write_all(line.as_bytes()).await.context(IoSnafu)?;
        self.stream.write_all(b"\n").await.context(IoSnafu)?;
        self.stream.flush().await.context(IoSnafu)?;
        Ok(())
    }

    /// Read one reply line without the terminator.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.stream.read_line(&mut line).await.context(IoSnafu)?;
        if read == 0 {
            return Err(Error::Closed);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }

    /// Read a status or count line: negative is a server error, anything
    /// non-numeric is a framing violation.
    async fn read_number(&mut self) -> Result<i64> {
        let line = self.read_line().await?;
        let number: i64 = match line.parse() {
            Ok(number) => number,
            Err(_) => return Err(Error::UnexpectedReply { line }),
        };
        if number < 0 {
            return Err(Error::Server { code: number });
        }
        Ok(number)
    }

    /// Expect the OK reply.
    pub async fn read_ok(&mut self) -> Result<()> {
        match self.read_number().await? {
            0 => Ok(()),
            other => Err(Error::UnexpectedReply {
                line: other.to_string(),
            }),
        }
    }

    /// Expect a bare count.
    pub async fn read_count(&mut self) -> Result<u64> {
        Ok(self.read_number().await? as u64)
    }

    /// Expect a line list.
    pub async fn read_lines(&mut self) -> Result<Vec<String>> {
        let count = self.read_number().await? as usize;
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            lines.push(self.read_line().await?);
        }
        Ok(lines)
    }

    /// Expect a `key value` map; a key may contain spaces, the value is
    /// the token after the last space.
    pub async fn read_map(&mut self) -> Result<BTreeMap<String, u64>> {
        let count = self.read_number().await? as usize;
        let mut map = BTreeMap::new();
        for _ in 0..count {
            let line = self.read_line().await?;
            let (key, value) = split_map_line(&line)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Expect a map of maps (`PCOUNT ... <group>`).
    pub async fn read_nested_map(&mut self) -> Result<BTreeMap<String, BTreeMap<String, u64>>> {
        let outer = self.read_number().await? as usize;
        let mut maps = BTreeMap::new();
        for _ in 0..outer {
            let key = self.read_line().await?;
            let inner = self.read_map().await?;
            maps.insert(key, inner);
        }
        Ok(maps)
    }

    /// Expect a map of line lists (`PART`).
    pub async fn read_map_of_lists(&mut self) -> Result<BTreeMap<String, Vec<String>>> {
        let outer = self.read_number().await? as usize;
        let mut lists = BTreeMap::new();
        for _ in 0..outer {
            let key = self.read_line().await?;
            let lines = self.read_lines().await?;
            lists.insert(key, lines);
        }
        Ok(lists)
    }

    /// Send a line and expect OK. Convenience for write commands.
    pub async fn round_trip_ok(&mut self, line: &str) -> Result<()> {
        self.send(line).await?;
        self.read_ok().await
    }

    /// Send a line and expect the error `code`.
    pub async fn round_trip_error(&mut self, line: &str) -> Result<i64> {
        self.send(line).await?;
        match self.read_number().await {
            Err(Error::Server { code }) => Ok(code),
            Ok(number) => Err(Error::UnexpectedReply {
                line: number.to_string(),
            }),
            Err(other) => Err(other),
        }
    }
}

fn split_map_line(line: &str) -> Result<(String, u64)> {
    let (key, value) = match line.rsplit_once(' ') {
        Some(parts) => parts,
        None => {
            return Err(Error::UnexpectedReply {
                line: line.to_string(),
            })
        }
    };
    let value: u64 = value.parse().map_err(|_| Error::UnexpectedReply {
        line: line.to_string(),
    })?;
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_lines_split_on_the_last_space() {
        assert_eq!(split_map_line("val1 3").unwrap(), ("val1".to_string(), 3));
        assert_eq!(
            split_map_line("a key 1").unwrap(),
            ("a key".to_string(), 1)
        );
        assert!(split_map_line("no-value").is_err());
        assert!(split_map_line("value nan").is_err());
    }
}
