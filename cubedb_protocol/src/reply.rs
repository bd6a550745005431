//! Reply framing.
//!
//! Every reply is ASCII text. The first line is the whole story for OK,
//! errors and counts; list-shaped replies lead with the number of payload
//! lines so a client can read exactly that many. Strings travel raw,
//! without quoting, which is why nothing containing a newline is ever
//! admitted into the store.

use std::collections::BTreeMap;
use std::fmt;

/// Wire error codes.
///
/// This is the newer of the two code sets the original server shipped
/// with; it is fixed here, and reference clients accept either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// Command execution failed (dump I/O, dump not configured).
    Generic,
    /// The verb is not known.
    UnknownCommand,
    /// An argument value is semantically wrong (empty name, count < 1).
    WrongArgument,
    /// The verb got the wrong number of arguments.
    WrongArgumentCount,
    /// An argument could not be parsed or carries non-printable bytes.
    MalformedArgument,
    /// The addressed cube or partition does not exist.
    ObjectNotFound,
    /// The object to create already exists.
    ObjectExists,
}

impl WireError {
    /// The negative decimal sent on the wire.
    pub fn code(&self) -> i32 {
        match self {
            Self::Generic => -3,
            Self::UnknownCommand => -4,
            Self::WrongArgument => -5,
            Self::WrongArgumentCount => -6,
            Self::MalformedArgument => -7,
            Self::ObjectNotFound => -8,
            Self::ObjectExists => -9,
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Generic => "command failed",
            Self::UnknownCommand => "command not found",
            Self::WrongArgument => "command argument is wrong",
            Self::WrongArgumentCount => "command argument number is wrong",
            Self::MalformedArgument => "command argument is malformed",
            Self::ObjectNotFound => "command object not found",
            Self::ObjectExists => "command object already exists",
        };
        write!(f, "{} ({})", message, self.code())
    }
}

/// One framed reply.
///
/// `BTreeMap` keys fix the line order, so identical state always encodes
/// to identical bytes. The wire form is the `Display` impl; [`Reply::encode`]
/// is that rendering as bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `0`.
    Ok,
    /// A negative code.
    Error(WireError),
    /// A bare count.
    Count(u64),
    /// A single raw line (`PONG`).
    Raw(String),
    /// `N` then N lines.
    Lines(Vec<String>),
    /// `N` then N `key value` lines.
    Map(BTreeMap<String, u64>),
    /// `N` then N blocks of `key`, inner count, inner `key value` lines.
    NestedMap(BTreeMap<String, BTreeMap<String, u64>>),
    /// `N` then N blocks of `key`, list length, list lines.
    MapOfLists(BTreeMap<String, Vec<String>>),
}

impl Reply {
    /// Encode the reply into the bytes written to the socket.
    ///
    /// A reply is always produced in one buffer and written with a single
    /// write, so concurrent connections can never interleave fragments.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => writeln!(f, "0"),
            Self::Error(error) => writeln!(f, "{}", error.code()),
            Self::Count(count) => writeln!(f, "{}", count),
            Self::Raw(line) => writeln!(f, "{}", line),
            Self::Lines(lines) => fmt_lines(f, lines.iter().map(String::as_str)),
            Self::Map(map) => fmt_map(f, map),
            Self::NestedMap(maps) => {
                writeln!(f, "{}", maps.len())?;
                for (key, inner) in maps {
                    writeln!(f, "{}", key)?;
                    fmt_map(f, inner)?;
                }
                Ok(())
            }
            Self::MapOfLists(lists) => {
                writeln!(f, "{}", lists.len())?;
                for (key, lines) in lists {
                    writeln!(f, "{}", key)?;
                    fmt_lines(f, lines.iter().map(String::as_str))?;
                }
                Ok(())
            }
        }
    }
}

fn fmt_lines<'a>(
    f: &mut fmt::Formatter<'_>,
    lines: impl ExactSizeIterator<Item = &'a str>,
) -> fmt::Result {
    writeln!(f, "{}", lines.len())?;
    for line in lines {
        writeln!(f, "{}", line)?;
    }
    Ok(())
}

fn fmt_map(f: &mut fmt::Formatter<'_>, map: &BTreeMap<String, u64>) -> fmt::Result {
    writeln!(f, "{}", map.len())?;
    for (key, value) in map {
        writeln!(f, "{} {}", key, value)?;
    }
    Ok(())
}
