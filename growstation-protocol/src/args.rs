//! Request arguments
//!
//! Arguments come from the query string and from the request body
//! (url-encoded pairs, multipart form fields or the raw body). They keep
//! their arrival order so handlers can address them by index.

use heapless::{String, Vec};

/// Maximum number of arguments per request
pub const MAX_ARGS: usize = 8;

/// Maximum decoded argument name length
pub const MAX_ARG_NAME_LEN: usize = 32;

/// Maximum decoded argument value length
pub const MAX_ARG_VALUE_LEN: usize = 128;

/// Name given to a raw, non-form request body
pub const PLAIN_ARG: &str = "plain";

/// Errors from argument decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArgsError {
    /// More than [`MAX_ARGS`] arguments
    TooMany,
    /// Name or value exceeds its maximum length
    TooLong,
    /// Invalid percent escape or non UTF-8 result
    BadEncoding,
}

/// A single name/value argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    /// Decoded name
    pub name: String<MAX_ARG_NAME_LEN>,
    /// Decoded value
    pub value: String<MAX_ARG_VALUE_LEN>,
}

/// Ordered request arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    entries: Vec<Arg, MAX_ARGS>,
}

impl Args {
    /// Create an empty argument list
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no arguments
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the first argument called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.name.as_str() == name)
            .map(|a| a.value.as_str())
    }

    /// Check if an argument called `name` is present
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Value of the argument at `index`, in arrival order
    pub fn nth(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|a| a.value.as_str())
    }

    /// Iterate over all arguments
    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.entries.iter()
    }

    /// Append an already decoded argument
    pub fn push(&mut self, name: &str, value: &str) -> Result<(), ArgsError> {
        let mut arg = Arg {
            name: String::new(),
            value: String::new(),
        };
        arg.name.push_str(name).map_err(|_| ArgsError::TooLong)?;
        arg.value.push_str(value).map_err(|_| ArgsError::TooLong)?;
        self.entries.push(arg).map_err(|_| ArgsError::TooMany)
    }

    /// Decode and append `name=value&...` pairs
    ///
    /// `+` decodes to a space. Empty segments are skipped; a segment
    /// without `=` becomes an argument with an empty value.
    pub fn parse_urlencoded(&mut self, input: &str) -> Result<(), ArgsError> {
        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let name: String<MAX_ARG_NAME_LEN> = percent_decode(raw_name, true)?;
            let value: String<MAX_ARG_VALUE_LEN> = percent_decode(raw_value, true)?;
            self.push(&name, &value)?;
        }
        Ok(())
    }
}

/// Decode `%XX` escapes (and `+` when `plus_as_space`) into a bounded string
pub fn percent_decode<const N: usize>(
    raw: &str,
    plus_as_space: bool,
) -> Result<String<N>, ArgsError> {
    let mut bytes: Vec<u8, N> = Vec::new();
    let mut iter = raw.bytes();

    while let Some(b) = iter.next() {
        let decoded = match b {
            b'%' => {
                let hi = iter.next().and_then(hex_value).ok_or(ArgsError::BadEncoding)?;
                let lo = iter.next().and_then(hex_value).ok_or(ArgsError::BadEncoding)?;
                (hi << 4) | lo
            }
            b'+' if plus_as_space => b' ',
            other => other,
        };
        bytes.push(decoded).map_err(|_| ArgsError::TooLong)?;
    }

    String::from_utf8(bytes).map_err(|_| ArgsError::BadEncoding)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
