//! Byte-exact multipart/form-data parsing.
//!
//! Capture uploads are binary; the parser works on byte offsets from
//! boundary discovery to body slicing and never round-trips part content
//! through text.

use crate::error::ServiceError;
use crate::http::find_subsequence;

/// One decoded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// The `name` from Content-Disposition.
    pub name: String,
    /// The original filename, present for file parts.
    pub filename: Option<String>,
    /// Part content, binary-exact.
    pub data: Vec<u8>,
}

/// Parse a multipart/form-data body.
///
/// `content_type` is the request's Content-Type header, which carries the
/// boundary parameter.
pub fn parse(content_type: &str, body: &[u8]) -> Result<Vec<Part>, ServiceError> {
    let boundary = content_type
        .split(';')
        .filter_map(|p| p.trim().strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
        .next()
        .ok_or_else(|| ServiceError::UploadParseFailed("no boundary parameter".to_string()))?;

    let delimiter = format!("--{boundary}").into_bytes();

    let mut parts = Vec::new();
    let mut cursor = find_subsequence(body, &delimiter)
        .ok_or_else(|| ServiceError::UploadParseFailed("boundary not found in body".to_string()))?
        + delimiter.len();

    loop {
        // After each delimiter: "--" closes the body, CRLF opens a part.
        if body[cursor..].starts_with(b"--") {
            break;
        }
        let part_start = match body[cursor..].iter().position(|&b| b != b'\r' && b != b'\n') {
            Some(skip) => cursor + skip,
            None => break,
        };

        let next_delim = find_subsequence(&body[part_start..], &delimiter)
            .map(|p| part_start + p)
            .ok_or_else(|| {
                ServiceError::UploadParseFailed("unterminated multipart part".to_string())
            })?;

        // The part's content ends before the CRLF preceding the delimiter.
        let mut part_end = next_delim;
        if part_end >= 2 && &body[part_end - 2..part_end] == b"\r\n" {
            part_end -= 2;
        }

        if let Some(part) = parse_part(&body[part_start..part_end])? {
            parts.push(part);
        }

        cursor = next_delim + delimiter.len();
    }

    Ok(parts)
}

/// Split one part into headers and content.
fn parse_part(raw: &[u8]) -> Result<Option<Part>, ServiceError> {
    let (header_len, body_start) = match find_subsequence(raw, b"\r\n\r\n") {
        Some(pos) => (pos, pos + 4),
        None => match find_subsequence(raw, b"\n\n") {
            Some(pos) => (pos, pos + 2),
            None => return Ok(None),
        },
    };

    let headers = String::from_utf8_lossy(&raw[..header_len]);
    let mut name = None;
    let mut filename = None;

    for line in headers.lines() {
        if line.to_ascii_lowercase().starts_with("content-disposition:") {
            name = disposition_param(line, "name");
            filename = disposition_param(line, "filename");
        }
    }

    let Some(name) = name else {
        return Ok(None);
    };

    Ok(Some(Part {
        name,
        filename,
        data: raw[body_start..].to_vec(),
    }))
}

/// Extract a quoted `key="value"` parameter from a header line.
fn disposition_param(line: &str, key: &str) -> Option<String> {
    let marker = format!("{key}=\"");
    let start = line.find(&marker)? + marker.len();
    let end = line[start..].find('"')? + start;
    Some(line[start..end].to_string())
}
