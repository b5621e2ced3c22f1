//! Line-oriented reading shared by the tail scanner and the verifier.

use std::io::{self, BufRead, Read};

use warden_contracts::entry::{Header, FORMAT_VERSION, HEADER_KIND};

use crate::chain::{decode_hash, ChainHash};

/// Longest line either reader accepts, excluding the newline.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

pub(crate) enum Line<'a> {
    Content(&'a [u8]),
    /// The line exceeded [`MAX_LINE_BYTES`]; the reader must not be used further.
    Oversized,
}

/// Reads newline-terminated lines with a length cap, tracking line numbers.
pub(crate) struct LineReader<R> {
    inner: R,
    line_no: u64,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            line_no: 0,
            buf: Vec::new(),
        }
    }

    /// 1-based number of the line last returned.
    #[cfg(test)]
    pub(crate) fn line_no(&self) -> u64 {
        self.line_no
    }

    /// The next line number and content without its trailing newline, or
    /// `None` at EOF. A final line lacking a newline is returned as-is.
    pub(crate) fn next_line(&mut self) -> io::Result<Option<(u64, Line<'_>)>> {
        self.buf.clear();
        let limit = MAX_LINE_BYTES as u64 + 1;
        let n = (&mut self.inner).take(limit).read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        } else if self.buf.len() > MAX_LINE_BYTES {
            return Ok(Some((self.line_no, Line::Oversized)));
        }
        Ok(Some((self.line_no, Line::Content(&self.buf))))
    }
}

/// Parse and validate a header line, returning it with its decoded seed.
pub(crate) fn parse_header(line: &[u8]) -> Result<(Header, ChainHash), String> {
    let header: Header =
        serde_json::from_slice(line).map_err(|e| format!("malformed header: {}", e))?;
    if header.kind != HEADER_KIND {
        return Err(format!("unexpected header kind '{}'", header.kind));
    }
    if header.version == 0 || header.version > FORMAT_VERSION {
        return Err(format!("unsupported log format version {}", header.version));
    }
    let seed = decode_hash(&header.seed_hex).ok_or_else(|| "malformed seed".to_string())?;
    if header.has_predecessor() && decode_hash(&header.prev_log_last_hash).is_none() {
        return Err("malformed prev_log_last_hash".to_string());
    }
    Ok((header, seed))
}
