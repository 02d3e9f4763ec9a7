//! RESP parser, reader and encoder
//!
//! `RespParser` works on whatever bytes are already buffered and reports when
//! it needs more. `RespReader` drives it over a blocking `Read` source, and
//! `RespEncoder` is the inverse mapping.

use super::types::{RespError, RespValue};
use crate::error::Result;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{self, Read};

const CRLF: &[u8] = b"\r\n";

/// Largest bulk string payload accepted (512 MiB)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest array element count accepted
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Deepest array nesting accepted
pub const MAX_DEPTH: usize = 64;

/// Longest text or length line accepted, CRLF excluded (64 KiB)
pub const MAX_LINE_LEN: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

/// RESP Parser
pub struct RespParser;

impl RespParser {
    /// Parse a RESP value from a buffer
    ///
    /// Returns Ok(Some(value)) if a complete value was parsed and consumed,
    /// Ok(None) if more data is needed (nothing is consumed),
    /// Err(e) if the buffered bytes can never form a valid value.
    /// Error positions are relative to the start of `buf`.
    pub fn parse(buf: &mut BytesMut) -> std::result::Result<Option<RespValue>, RespError> {
        match Self::parse_at(buf, 0, 0)? {
            Some((value, end)) => {
                buf.advance(end);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Parse one value starting at `pos`, returning it with the offset just past it
    fn parse_at(
        buf: &[u8],
        pos: usize,
        depth: usize,
    ) -> std::result::Result<Option<(RespValue, usize)>, RespError> {
        let Some(&tag) = buf.get(pos) else {
            return Ok(None);
        };

        match tag {
            b'+' | b'-' => {
                let Some(line_end) = Self::find_line(buf, pos)? else {
                    return Ok(None);
                };
                let text = std::str::from_utf8(&buf[pos + 1..line_end])
                    .map_err(|_| RespError::InvalidUtf8 { position: (pos + 1) as u64 })?
                    .to_string();
                let value = if tag == b'+' {
                    RespValue::SimpleString(text)
                } else {
                    RespValue::Error(text)
                };
                Ok(Some((value, line_end + 2)))
            }
            b'$' => Self::parse_bulk_string(buf, pos),
            b'*' => Self::parse_array(buf, pos, depth),
            _ => Err(RespError::UnknownTag {
                position: pos as u64,
                tag: tag as char,
            }),
        }
    }

    /// Parse bulk string: $6\r\nfoobar\r\n or $-1\r\n (null)
    fn parse_bulk_string(
        buf: &[u8],
        pos: usize,
    ) -> std::result::Result<Option<(RespValue, usize)>, RespError> {
        let Some((len, data_start)) = Self::read_length(buf, pos, "bulk string length", MAX_BULK_LEN)? else {
            return Ok(None);
        };

        let Some(len) = len else {
            return Ok(Some((RespValue::Null, data_start)));
        };

        let data_end = data_start + len;
        if buf.len() < data_end + 2 {
            // A wrong byte where CRLF belongs is already fatal
            if buf.len() > data_end && buf[data_end] != b'\r' {
                return Err(RespError::MissingTerminator { position: data_end as u64 });
            }
            return Ok(None);
        }

        if &buf[data_end..data_end + 2] != CRLF {
            return Err(RespError::MissingTerminator { position: data_end as u64 });
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_end]);
        Ok(Some((RespValue::BulkString(data), data_end + 2)))
    }

    /// Parse array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n or *-1\r\n (null)
    fn parse_array(
        buf: &[u8],
        pos: usize,
        depth: usize,
    ) -> std::result::Result<Option<(RespValue, usize)>, RespError> {
        if depth >= MAX_DEPTH {
            return Err(RespError::NestingTooDeep { position: pos as u64 });
        }

        let Some((count, mut cursor)) = Self::read_length(buf, pos, "array count", MAX_ARRAY_LEN)? else {
            return Ok(None);
        };

        let Some(count) = count else {
            return Ok(Some((RespValue::NullArray, cursor)));
        };

        // Elements are parsed by offset, so an incomplete array consumes nothing
        let mut elements = Vec::with_capacity(count.min(READ_CHUNK));
        for _ in 0..count {
            match Self::parse_at(buf, cursor, depth + 1)? {
                Some((value, next)) => {
                    elements.push(value);
                    cursor = next;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::Array(elements), cursor)))
    }

    /// Read the decimal line after a `$` or `*` tag.
    ///
    /// Yields `Some(None)` for the `-1` null marker, otherwise the length,
    /// together with the offset of the first byte after the line.
    fn read_length(
        buf: &[u8],
        pos: usize,
        what: &'static str,
        max: i64,
    ) -> std::result::Result<Option<(Option<usize>, usize)>, RespError> {
        let Some(line_end) = Self::find_line(buf, pos)? else {
            return Ok(None);
        };

        let line = &buf[pos + 1..line_end];
        let invalid = || RespError::InvalidLength {
            position: (pos + 1) as u64,
            what,
            line: String::from_utf8_lossy(line).into_owned(),
        };

        if line == b"-1" {
            return Ok(Some((None, line_end + 2)));
        }

        // Plain decimal digits only: no sign, no whitespace
        if line.is_empty() || !line.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }

        let n = std::str::from_utf8(line)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|n| *n <= max)
            .ok_or_else(invalid)?;

        Ok(Some((Some(n as usize), line_end + 2)))
    }

    /// Find the CRLF ending the line that follows the tag at `pos`
    ///
    /// Fails as soon as the line is known to exceed `MAX_LINE_LEN`, whether or
    /// not its CRLF has arrived yet.
    fn find_line(buf: &[u8], pos: usize) -> std::result::Result<Option<usize>, RespError> {
        let start = pos + 1;
        let too_long = || RespError::LineTooLong {
            position: start as u64,
            max: MAX_LINE_LEN,
        };

        match Self::find_crlf(buf, start) {
            Some(line_end) if line_end - start <= MAX_LINE_LEN => Ok(Some(line_end)),
            Some(_) => Err(too_long()),
            // One extra byte may still be the CR of a line exactly at the cap
            None if buf.len().saturating_sub(start) <= MAX_LINE_LEN + 1 => Ok(None),
            None => Err(too_long()),
        }
    }

    /// Find the index of the next CRLF at or after `from`
    fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
        if from >= buf.len() {
            return None;
        }
        buf[from..]
            .windows(2)
            .position(|w| w == CRLF)
            .map(|i| from + i)
    }
}

/// Blocking RESP reader over any byte source
///
/// Used to replay the AOF. Tracks how many bytes have been consumed so that
/// protocol errors point at an absolute offset in the stream.
pub struct RespReader<R> {
    inner: R,
    buffer: BytesMut,
    consumed: u64,
}

impl<R: Read> RespReader<R> {
    /// Wrap a byte source
    pub fn new(inner: R) -> Self {
        RespReader {
            inner,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            consumed: 0,
        }
    }

    /// Read the next value
    ///
    /// Returns Ok(None) on a clean end of stream, that is when the source is
    /// exhausted exactly on a value boundary. Running out of bytes inside a
    /// value is a `RespError::Truncated`.
    pub fn read_value(&mut self) -> Result<Option<RespValue>> {
        loop {
            let before = self.buffer.len();
            match RespParser::parse(&mut self.buffer) {
                Ok(Some(value)) => {
                    self.consumed += (before - self.buffer.len()) as u64;
                    return Ok(Some(value));
                }
                Ok(None) => {}
                Err(e) => return Err(e.offset_by(self.consumed).into()),
            }

            if self.fill()? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(RespError::Truncated {
                    position: self.consumed + self.buffer.len() as u64,
                }
                .into());
            }
        }
    }

    /// Bytes consumed by successfully parsed values
    pub fn position(&self) -> u64 {
        self.consumed
    }

    fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// RESP Encoder
pub struct RespEncoder;

impl RespEncoder {
    /// Encode a RESP value to bytes
    pub fn encode(value: &RespValue) -> Bytes {
        let mut buf = BytesMut::new();
        Self::encode_to(&mut buf, value);
        buf.freeze()
    }

    /// Encode a RESP value into an existing buffer
    pub fn encode_to(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                Self::put_text(buf, s);
                buf.put_slice(CRLF);
            }
            RespValue::Error(e) => {
                buf.put_u8(b'-');
                Self::put_text(buf, e);
                buf.put_slice(CRLF);
            }
            RespValue::BulkString(bytes) => {
                buf.put_u8(b'$');
                buf.put_slice(bytes.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(bytes);
                buf.put_slice(CRLF);
            }
            RespValue::Null => {
                buf.put_slice(b"$-1\r\n");
            }
            RespValue::NullArray => {
                buf.put_slice(b"*-1\r\n");
            }
            RespValue::Array(arr) => {
                buf.put_u8(b'*');
                buf.put_slice(arr.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                for elem in arr {
                    Self::encode_to(buf, elem);
                }
            }
        }
    }

    /// Line-framed text cannot carry CR or LF, they become spaces
    fn put_text(buf: &mut BytesMut, text: &str) {
        if text.bytes().any(|b| b == b'\r' || b == b'\n') {
            buf.put_slice(text.replace(['\r', '\n'], " ").as_bytes());
        } else {
            buf.put_slice(text.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn read_all(input: &[u8]) -> Result<Vec<RespValue>> {
        let mut reader = RespReader::new(input);
        let mut values = Vec::new();
        while let Some(value) = reader.read_value()? {
            values.push(value);
        }
        Ok(values)
    }

    #[test]
    fn test_parse_simple_string() {
        let mut buf = BytesMut::from("+OK\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::SimpleString("OK".to_string())));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_parse_error() {
        let mut buf = BytesMut::from("-Error message\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::Error("Error message".to_string())));
    }

    #[test]
    fn test_parse_bulk_string() {
        let mut buf = BytesMut::from("$6\r\nfoobar\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::BulkString(Bytes::from("foobar"))));
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let mut buf = BytesMut::from("$0\r\n\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::bulk_string("")));
    }

    #[test]
    fn test_parse_binary_bulk_string() {
        let mut buf = BytesMut::from(&b"$4\r\na\r\nb\r\n"[..]);
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::bulk_string(&b"a\r\nb"[..])));
    }

    #[test]
    fn test_parse_nulls() {
        let mut buf = BytesMut::from("$-1\r\n*-1\r\n");
        assert_eq!(RespParser::parse(&mut buf).unwrap(), Some(RespValue::Null));
        assert_eq!(RespParser::parse(&mut buf).unwrap(), Some(RespValue::NullArray));
    }

    #[test]
    fn test_parse_array() {
        let mut buf = BytesMut::from("*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::Array(vec![
            RespValue::BulkString(Bytes::from("foo")),
            RespValue::BulkString(Bytes::from("bar")),
        ])));
    }

    #[test]
    fn test_parse_nested_mixed_array() {
        let mut buf = BytesMut::from("*3\r\n+OK\r\n$-1\r\n*1\r\n-ERR x\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::array(vec![
            RespValue::simple_string("OK"),
            RespValue::Null,
            RespValue::array(vec![RespValue::error("ERR x")]),
        ])));
    }

    #[test]
    fn test_incomplete_array_consumes_nothing() {
        let mut buf = BytesMut::from("*2\r\n$3\r\nfoo\r\n$3\r\nba");
        assert_eq!(RespParser::parse(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 19);

        buf.extend_from_slice(b"r\r\n");
        assert!(RespParser::parse(&mut buf).unwrap().is_some());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unknown_tag() {
        let mut buf = BytesMut::from("$3\r\nfoo\r\n!oops\r\n");
        RespParser::parse(&mut buf).unwrap();
        let err = RespParser::parse(&mut buf).unwrap_err();
        assert_eq!(err, RespError::UnknownTag { position: 0, tag: '!' });
    }

    #[test]
    fn test_integer_tag_rejected() {
        let mut buf = BytesMut::from(":1000\r\n");
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::UnknownTag { tag: ':', .. })
        ));
    }

    #[test]
    fn test_invalid_lengths() {
        for input in ["$abc\r\n", "*x\r\n", "$-2\r\n", "*-5\r\n", "$\r\n", "$536870913\r\n"] {
            let mut buf = BytesMut::from(input);
            assert!(
                matches!(RespParser::parse(&mut buf), Err(RespError::InvalidLength { position: 1, .. })),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_length_lines_must_be_plain_decimal() {
        for input in ["$+3\r\nfoo\r\n", "*+1\r\n+OK\r\n", "$-0\r\n", "$ 3\r\n", "*1 \r\n", "$99999999999999999999\r\n"] {
            let mut buf = BytesMut::from(input);
            assert!(
                matches!(RespParser::parse(&mut buf), Err(RespError::InvalidLength { position: 1, .. })),
                "input {:?}",
                input
            );
            assert_eq!(buf.len(), input.len());
        }
    }

    #[test]
    fn test_unterminated_line_over_cap() {
        let mut buf = BytesMut::from(&b"+"[..]);
        buf.extend_from_slice(&vec![b'a'; MAX_LINE_LEN + 1]);
        assert_eq!(RespParser::parse(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"a");
        assert_eq!(
            RespParser::parse(&mut buf).unwrap_err(),
            RespError::LineTooLong { position: 1, max: MAX_LINE_LEN }
        );

        let mut buf = BytesMut::from(&b"*"[..]);
        buf.extend_from_slice(&vec![b'1'; MAX_LINE_LEN + 2]);
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::LineTooLong { position: 1, .. })
        ));
    }

    #[test]
    fn test_line_at_cap_is_accepted() {
        let text = "a".repeat(MAX_LINE_LEN);
        let mut buf = BytesMut::from(format!("-{}\r", text).as_str());
        assert_eq!(RespParser::parse(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\n");
        assert_eq!(RespParser::parse(&mut buf).unwrap(), Some(RespValue::error(text.clone())));

        let mut buf = BytesMut::from(format!("+{}a\r\n", text).as_str());
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_bulk_length_mismatch() {
        let mut buf = BytesMut::from("$3\r\nfoobar\r\n");
        let err = RespParser::parse(&mut buf).unwrap_err();
        assert_eq!(err, RespError::MissingTerminator { position: 7 });
    }

    #[test]
    fn test_nesting_limit() {
        let input = "*1\r\n".repeat(MAX_DEPTH + 1);
        let mut buf = BytesMut::from(input.as_str());
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_simple_string() {
        let mut buf = BytesMut::from(&b"+\xff\xfe\r\n"[..]);
        assert_eq!(
            RespParser::parse(&mut buf).unwrap_err(),
            RespError::InvalidUtf8 { position: 1 }
        );
    }

    #[test]
    fn test_reader_clean_end_of_stream() {
        let values = read_all(b"+OK\r\n$1\r\na\r\n").unwrap();
        assert_eq!(values, vec![RespValue::simple_string("OK"), RespValue::bulk_string("a")]);
        assert!(read_all(b"").unwrap().is_empty());
    }

    #[test]
    fn test_reader_short_bulk_is_truncated() {
        let mut reader = RespReader::new(&b"$5\r\nabc"[..]);
        match reader.read_value() {
            Err(Error::Protocol(RespError::Truncated { position })) => assert_eq!(position, 7),
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_error_position_is_absolute() {
        let mut reader = RespReader::new(&b"+OK\r\n?\r\n"[..]);
        assert!(reader.read_value().unwrap().is_some());
        assert_eq!(reader.position(), 5);
        match reader.read_value() {
            Err(Error::Protocol(err)) => assert_eq!(err.position(), 5),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_large_bulk_across_chunks() {
        let payload = vec![b'x'; READ_CHUNK * 3 + 17];
        let encoded = RespEncoder::encode(&RespValue::bulk_string(payload.clone()));
        let values = read_all(&encoded).unwrap();
        assert_eq!(values, vec![RespValue::bulk_string(payload)]);
    }

    #[test]
    fn test_encode_simple_string() {
        let value = RespValue::SimpleString("OK".to_string());
        let encoded = RespEncoder::encode(&value);
        assert_eq!(encoded, Bytes::from("+OK\r\n"));
    }

    #[test]
    fn test_encode_bulk_string() {
        let value = RespValue::BulkString(Bytes::from("foobar"));
        let encoded = RespEncoder::encode(&value);
        assert_eq!(encoded, Bytes::from("$6\r\nfoobar\r\n"));
    }

    #[test]
    fn test_encode_nulls() {
        assert_eq!(RespEncoder::encode(&RespValue::Null), Bytes::from("$-1\r\n"));
        assert_eq!(RespEncoder::encode(&RespValue::NullArray), Bytes::from("*-1\r\n"));
    }

    #[test]
    fn test_encode_strips_line_breaks() {
        let encoded = RespEncoder::encode(&RespValue::error("ERR bad\r\nthing"));
        assert_eq!(encoded, Bytes::from("-ERR bad  thing\r\n"));
    }

    #[test]
    fn test_round_trip() {
        let value = RespValue::array(vec![
            RespValue::simple_string("OK"),
            RespValue::error("ERR nope"),
            RespValue::bulk_string(""),
            RespValue::bulk_string(&b"\x00\r\n\xff"[..]),
            RespValue::Null,
            RespValue::NullArray,
            RespValue::array(vec![]),
            RespValue::array(vec![RespValue::bulk_string("SET"), RespValue::bulk_string("k")]),
        ]);

        let mut buf = BytesMut::from(&RespEncoder::encode(&value)[..]);
        assert_eq!(RespParser::parse(&mut buf).unwrap(), Some(value));
        assert!(buf.is_empty());
    }

    /// Leaves of every kind, bulk payloads of assorted sizes with all byte values
    fn sample_leaves() -> Vec<RespValue> {
        let mut leaves = vec![
            RespValue::Null,
            RespValue::NullArray,
            RespValue::simple_string(""),
            RespValue::simple_string("OK"),
            RespValue::simple_string("héllo wörld"),
            RespValue::error("ERR"),
            RespValue::error("WRONGTYPE Operation against a key holding the wrong kind of value"),
        ];
        for len in [0usize, 1, 2, 3, 127, 4096, READ_CHUNK + 1] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();
            leaves.push(RespValue::bulk_string(payload));
        }
        leaves.push(RespValue::bulk_string(&b"\r\n"[..]));
        leaves.push(RespValue::bulk_string("$-1\r\n*-1\r\n"));
        leaves
    }

    /// Arrays built from the leaves: empty, flat, prefixes, and nested a few levels deep
    fn sample_values() -> Vec<RespValue> {
        let leaves = sample_leaves();
        let mut values = leaves.clone();

        values.push(RespValue::array(vec![]));
        values.push(RespValue::array(vec![RespValue::array(vec![])]));
        for n in 1..=leaves.len() {
            values.push(RespValue::array(leaves[..n].to_vec()));
        }

        let mut nested = RespValue::array(vec![]);
        for depth in 0..6 {
            nested = RespValue::array(vec![
                leaves[depth % leaves.len()].clone(),
                nested,
                RespValue::NullArray,
            ]);
            values.push(nested.clone());
        }

        values.push(RespValue::array(values.clone()));
        values
    }

    #[test]
    fn test_round_trip_generated_values() {
        let values = sample_values();

        for value in &values {
            let encoded = RespEncoder::encode(value);
            let mut buf = BytesMut::from(&encoded[..]);
            assert_eq!(RespParser::parse(&mut buf).unwrap().as_ref(), Some(value));
            assert!(buf.is_empty(), "leftover bytes after {}", value);

            assert_eq!(read_all(&encoded).unwrap(), vec![value.clone()]);
        }

        // Back to back in one stream
        let mut stream = BytesMut::new();
        for value in &values {
            RespEncoder::encode_to(&mut stream, value);
        }
        assert_eq!(read_all(&stream).unwrap(), values);
    }
}
