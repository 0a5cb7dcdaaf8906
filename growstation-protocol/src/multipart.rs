//! Streaming `multipart/form-data` decoder
//!
//! The decoder never owns body bytes. Each call to
//! [`MultipartParser::feed`] looks at whatever the caller has buffered,
//! reports part events, and returns how many bytes it is done with. Bytes
//! that might still turn out to be part of a delimiter are left in place;
//! the caller keeps them at the front of its buffer and feeds them again
//! together with the next bytes from the network.
//!
//! ```text
//! --BOUNDARY\r\n
//! Content-Disposition: form-data; name="data"; filename="/a.txt"\r\n
//! \r\n
//! <data>\r\n--BOUNDARY--\r\n
//! ```

use heapless::Vec;

use crate::find;
use crate::request::MAX_BOUNDARY_LEN;

/// Maximum size of one part's header block
pub const MAX_PART_HEADER_LEN: usize = 512;

const DELIMITER_CAPACITY: usize = MAX_BOUNDARY_LEN + 4;

/// Errors from multipart decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MultipartError {
    /// Boundary is empty or longer than allowed
    InvalidBoundary,
    /// A part header block exceeded [`MAX_PART_HEADER_LEN`]
    HeaderTooLarge,
    /// Unexpected bytes after a delimiter, or a non UTF-8 header
    Malformed,
}

/// Identification of one part, taken from its `Content-Disposition`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartInfo<'a> {
    /// Form field name
    pub name: &'a str,
    /// Client-side file name, present for file parts only
    pub filename: Option<&'a str>,
}

/// Events reported while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartEvent<'a> {
    /// A new part starts
    Begin(PartInfo<'a>),
    /// Content bytes of the current part, in arrival order
    Data(&'a [u8]),
    /// The current part is complete
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Skipping bytes before the first delimiter
    Preamble,
    /// Reading a part's header block
    Headers,
    /// Passing through part content
    Content,
    /// Final delimiter seen, ignoring the rest
    Epilogue,
}

/// Incremental multipart decoder
#[derive(Debug, Clone)]
pub struct MultipartParser {
    /// `\r\n--` followed by the boundary
    delimiter: Vec<u8, DELIMITER_CAPACITY>,
    state: ParseState,
}

impl MultipartParser {
    /// Create a decoder for the given boundary (without leading dashes)
    pub fn new(boundary: &str) -> Result<Self, MultipartError> {
        if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
            return Err(MultipartError::InvalidBoundary);
        }

        let mut delimiter = Vec::new();
        delimiter
            .extend_from_slice(b"\r\n--")
            .map_err(|_| MultipartError::InvalidBoundary)?;
        delimiter
            .extend_from_slice(boundary.as_bytes())
            .map_err(|_| MultipartError::InvalidBoundary)?;

        Ok(Self {
            delimiter,
            state: ParseState::Preamble,
        })
    }

    /// Check whether the closing delimiter has been seen
    pub fn is_finished(&self) -> bool {
        self.state == ParseState::Epilogue
    }

    /// Check whether a part is open (begun but not ended)
    pub fn in_part(&self) -> bool {
        self.state == ParseState::Content
    }

    /// Decode as much of `input` as possible
    ///
    /// Returns the number of leading bytes of `input` that were consumed.
    pub fn feed<F>(&mut self, input: &[u8], on_event: &mut F) -> Result<usize, MultipartError>
    where
        F: FnMut(PartEvent<'_>),
    {
        let mut pos = 0;

        loop {
            let rest = &input[pos..];

            match self.state {
                ParseState::Preamble => {
                    // The first delimiter may come without its leading CRLF
                    let dashed = &self.delimiter[2..];
                    match find(rest, dashed) {
                        Some(at) => {
                            let after = at + dashed.len();
                            if rest.len() < after + 2 {
                                return Ok(pos + at);
                            }
                            pos += after;
                            self.state = self.after_delimiter(&input[pos..pos + 2])?;
                            pos += 2;
                        }
                        None => {
                            return Ok(pos + rest.len().saturating_sub(dashed.len() + 1));
                        }
                    }
                }
                ParseState::Headers => {
                    if rest.starts_with(b"\r\n") {
                        // Part without any headers
                        on_event(PartEvent::Begin(PartInfo {
                            name: "",
                            filename: None,
                        }));
                        pos += 2;
                        self.state = ParseState::Content;
                        continue;
                    }

                    let Some(end) = find(rest, b"\r\n\r\n") else {
                        if rest.len() >= MAX_PART_HEADER_LEN {
                            return Err(MultipartError::HeaderTooLarge);
                        }
                        return Ok(pos);
                    };

                    let headers =
                        core::str::from_utf8(&rest[..end]).map_err(|_| MultipartError::Malformed)?;
                    on_event(PartEvent::Begin(parse_disposition(headers)));
                    pos += end + 4;
                    self.state = ParseState::Content;
                }
                ParseState::Content => {
                    let dlen = self.delimiter.len();
                    match find(rest, &self.delimiter) {
                        Some(at) => {
                            if at > 0 {
                                on_event(PartEvent::Data(&rest[..at]));
                            }
                            if rest.len() < at + dlen + 2 {
                                // Delimiter suffix not buffered yet
                                return Ok(pos + at);
                            }
                            on_event(PartEvent::End);
                            pos += at + dlen;
                            self.state = self.after_delimiter(&input[pos..pos + 2])?;
                            pos += 2;
                        }
                        None => {
                            let safe = rest.len().saturating_sub(dlen - 1);
                            if safe > 0 {
                                on_event(PartEvent::Data(&rest[..safe]));
                            }
                            return Ok(pos + safe);
                        }
                    }
                }
                ParseState::Epilogue => return Ok(input.len()),
            }
        }
    }

    /// Decide what follows a delimiter from the two bytes after it
    fn after_delimiter(&self, suffix: &[u8]) -> Result<ParseState, MultipartError> {
        match suffix {
            b"--" => Ok(ParseState::Epilogue),
            b"\r\n" => Ok(ParseState::Headers),
            _ => Err(MultipartError::Malformed),
        }
    }
}

/// Extract name and filename from a part's header block
fn parse_disposition(headers: &str) -> PartInfo<'_> {
    let mut info = PartInfo {
        name: "",
        filename: None,
    };

    for line in headers.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if !header.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }

        for param in value.split(';').skip(1) {
            let Some((key, val)) = param.trim().split_once('=') else {
                continue;
            };
            let val = val.trim().trim_matches('"');
            match key.trim() {
                "name" => info.name = val,
                "filename" => info.filename = Some(val),
                _ => {}
            }
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::string::{String, ToString};
    use std::vec::Vec as StdVec;

    const BODY: &[u8] = b"--XyZ\r\n\
        Content-Disposition: form-data; name=\"path\"\r\n\
        \r\n\
        /notes.txt\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"data\"; filename=\"notes.txt\"\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        hello\r\n-- world\r\n\
        --XyZ--\r\n";

    #[derive(Debug, PartialEq)]
    enum Owned {
        Begin(String, Option<String>),
        Data(StdVec<u8>),
        End,
    }

    /// Feed `body` in the given chunk sizes, keeping unconsumed bytes like
    /// a connection buffer would, and merge adjacent data events.
    fn decode(body: &[u8], chunks: &[usize]) -> (StdVec<Owned>, bool) {
        let mut parser = MultipartParser::new("XyZ").unwrap();
        let mut events: StdVec<Owned> = StdVec::new();
        let mut pending: StdVec<u8> = StdVec::new();
        let mut offset = 0;
        let mut sizes = chunks.iter().copied().cycle();

        while offset < body.len() {
            let n = sizes.next().unwrap_or(1).max(1).min(body.len() - offset);
            pending.extend_from_slice(&body[offset..offset + n]);
            offset += n;

            let used = parser
                .feed(&pending, &mut |ev| match ev {
                    PartEvent::Begin(info) => events.push(Owned::Begin(
                        info.name.to_string(),
                        info.filename.map(|f| f.to_string()),
                    )),
                    PartEvent::Data(d) => match events.last_mut() {
                        Some(Owned::Data(buf)) => buf.extend_from_slice(d),
                        _ => events.push(Owned::Data(d.to_vec())),
                    },
                    PartEvent::End => events.push(Owned::End),
                })
                .unwrap();
            pending.drain(..used);
        }

        (events, parser.is_finished())
    }

    #[test]
    fn test_whole_body() {
        let (events, finished) = decode(BODY, &[BODY.len()]);

        assert!(finished);
        assert_eq!(
            events,
            std::vec![
                Owned::Begin("path".to_string(), None),
                Owned::Data(b"/notes.txt".to_vec()),
                Owned::End,
                Owned::Begin("data".to_string(), Some("notes.txt".to_string())),
                Owned::Data(b"hello\r\n-- world".to_vec()),
                Owned::End,
            ]
        );
    }

    #[test]
    fn test_byte_at_a_time() {
        let (whole, _) = decode(BODY, &[BODY.len()]);
        let (split, finished) = decode(BODY, &[1]);
        assert!(finished);
        assert_eq!(whole, split);
    }

    #[test]
    fn test_truncated_body_is_unfinished() {
        let truncated = &BODY[..BODY.len() - 12];
        let (events, finished) = decode(truncated, &[7]);
        assert!(!finished);
        assert_ne!(events.last(), Some(&Owned::End));
    }

    #[test]
    fn test_invalid_boundary() {
        assert!(matches!(
            MultipartParser::new(""),
            Err(MultipartError::InvalidBoundary)
        ));
    }

    #[test]
    fn test_garbage_after_delimiter() {
        let mut parser = MultipartParser::new("XyZ").unwrap();
        let result = parser.feed(b"--XyZ!!junk", &mut |_| {});
        assert_eq!(result, Err(MultipartError::Malformed));
    }

    #[test]
    fn test_header_too_large() {
        let mut parser = MultipartParser::new("XyZ").unwrap();
        let mut body = StdVec::new();
        body.extend_from_slice(b"--XyZ\r\nX-Long: ");
        body.resize(body.len() + MAX_PART_HEADER_LEN, b'a');

        let result = parser.feed(&body, &mut |_| {});
        assert_eq!(result, Err(MultipartError::HeaderTooLarge));
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_events(
            chunks in proptest::collection::vec(1usize..40, 1..8)
        ) {
            let (whole, _) = decode(BODY, &[BODY.len()]);
            let (split, finished) = decode(BODY, &chunks);
            prop_assert!(finished);
            prop_assert_eq!(whole, split);
        }
    }
}
