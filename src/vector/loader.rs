//! Embedding File Readers
//!
//! word2vec text (also fastText `.vec` and headerless GloVe) and word2vec
//! binary formats.

use bytes::{Buf, Bytes};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use super::embedding_store::{EmbeddingStore, LoadOptions, SourceKind, StoreBuilder};
use crate::error::LoadError;

/// On-disk format of an embedding source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingFormat {
    /// One `word v1 .. vd` line per entry, optional `<count> <dim>` header
    Text,
    /// word2vec binary: text header, then `word<space>` + `dim` LE f32 per entry
    Binary,
    /// Binary for `.bin` files, text otherwise
    Auto,
}

impl EmbeddingFormat {
    /// Turn `Auto` into a concrete format for the given path
    pub fn resolve(self, path: &Path) -> EmbeddingFormat {
        match self {
            EmbeddingFormat::Auto => {
                let is_bin = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("bin"))
                    .unwrap_or(false);
                if is_bin {
                    EmbeddingFormat::Binary
                } else {
                    EmbeddingFormat::Text
                }
            }
            other => other,
        }
    }
}

impl FromStr for EmbeddingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "vec" | "txt" => Ok(EmbeddingFormat::Text),
            "binary" | "bin" => Ok(EmbeddingFormat::Binary),
            "auto" => Ok(EmbeddingFormat::Auto),
            other => Err(format!("unknown embedding format '{}'", other)),
        }
    }
}

/// `<count> <dim>` header shared by both word2vec formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    count: usize,
    dimension: usize,
}

impl Header {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let count = parts.next()?.parse().ok()?;
        let dimension = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Header { count, dimension })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> LoadError {
    LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn warn_count_mismatch(header: Option<Header>, records: usize, limited: bool) {
    if let Some(header) = header {
        if header.count != records && !limited {
            warn!(
                expected = header.count,
                found = records,
                "Header word count does not match number of entries"
            );
        }
    }
}

/// Read a word2vec text file
pub(crate) fn load_text(path: &Path, options: &LoadOptions) -> Result<EmbeddingStore, LoadError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    parse_text(BufReader::new(file), options).map_err(|e| match e {
        LoadError::Io { source, .. } => io_error(path, source),
        other => other,
    })
}

/// Parse text-format embeddings from any buffered reader
pub(crate) fn parse_text<R: BufRead>(
    reader: R,
    options: &LoadOptions,
) -> Result<EmbeddingStore, LoadError> {
    let mut builder = StoreBuilder::new(options.case_sensitive);
    let mut header = None;
    let mut records = 0usize;
    let mut seen_content = false;
    let mut components = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| io_error(Path::new("<reader>"), e))?;
        if line.trim().is_empty() {
            continue;
        }

        if !seen_content {
            seen_content = true;
            if let Some(h) = Header::parse(&line) {
                debug!(count = h.count, dimension = h.dimension, "Found word2vec header");
                if h.dimension == 0 {
                    return Err(LoadError::malformed(line_no, "header declares zero dimensions"));
                }
                builder = builder.with_dimension(h.dimension);
                header = Some(h);
                continue;
            }
        }

        if options.max_words.is_some_and(|max| records >= max) {
            break;
        }

        // Fields are separated by ASCII spaces only; words may contain other
        // whitespace such as U+00A0
        let record = line.trim_end_matches(|c: char| c.is_ascii_whitespace());
        let mut parts = record.split(' ').filter(|part| !part.is_empty());
        let word = match parts.next() {
            Some(word) => word,
            None => continue,
        };

        components.clear();
        for part in parts {
            let value: f32 = part.parse().map_err(|_| {
                LoadError::malformed(line_no, format!("'{}' is not a number (word '{}')", part, word))
            })?;
            components.push(value);
        }
        if components.is_empty() {
            return Err(LoadError::malformed(
                line_no,
                format!("'{}' has no vector components", word),
            ));
        }

        builder.push(word, &components, line_no)?;
        records += 1;
    }

    warn_count_mismatch(header, records, options.max_words.is_some());
    builder.finish(SourceKind::Text)
}

/// Read a word2vec binary file
pub(crate) fn load_binary(path: &Path, options: &LoadOptions) -> Result<EmbeddingStore, LoadError> {
    let raw = std::fs::read(path).map_err(|e| io_error(path, e))?;
    parse_binary(Bytes::from(raw), options)
}

/// Parse binary-format embeddings from an in-memory buffer.
///
/// Error positions are reported as record numbers, counting the header as 1.
pub(crate) fn parse_binary(mut buf: Bytes, options: &LoadOptions) -> Result<EmbeddingStore, LoadError> {
    let header_end = buf
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| LoadError::malformed(1, "missing binary header line"))?;
    let header_line = buf.split_to(header_end + 1);
    let header_text = String::from_utf8_lossy(&header_line[..header_end]);
    let header = Header::parse(&header_text)
        .ok_or_else(|| LoadError::malformed(1, format!("invalid binary header '{}'", header_text.trim())))?;

    if header.count == 0 {
        return Err(LoadError::EmptyVocabulary);
    }
    if header.dimension == 0 {
        return Err(LoadError::malformed(1, "header declares zero dimensions"));
    }

    let record_bytes = header
        .dimension
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or_else(|| LoadError::malformed(1, format!("dimension {} too large", header.dimension)))?;
    let limit = options.max_words.map_or(header.count, |max| max.min(header.count));
    let mut builder = StoreBuilder::new(options.case_sensitive).with_dimension(header.dimension);
    // The header is untrusted; size buffers by what the file can hold
    let mut components = Vec::with_capacity(header.dimension.min(buf.remaining() / 4));
    let mut records = 0usize;

    while records < limit {
        let record_no = records + 2;

        // Some writers end every vector with a newline
        while buf.has_remaining() && (buf[0] == b'\n' || buf[0] == b'\r') {
            buf.advance(1);
        }
        if !buf.has_remaining() {
            break;
        }

        let word_end = buf
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| LoadError::malformed(record_no, "truncated record: no word terminator"))?;
        let word_bytes = buf.split_to(word_end);
        buf.advance(1);
        let word = String::from_utf8_lossy(&word_bytes);

        if buf.remaining() < record_bytes {
            return Err(LoadError::malformed(
                record_no,
                format!(
                    "truncated vector for '{}': need {} bytes, {} left",
                    word,
                    record_bytes,
                    buf.remaining()
                ),
            ));
        }

        components.clear();
        for _ in 0..header.dimension {
            components.push(buf.get_f32_le());
        }

        builder.push(&word, &components, record_no)?;
        records += 1;
    }

    warn_count_mismatch(Some(header), records, options.max_words.is_some());
    debug!(records, words = builder.len(), "Finished binary embedding parse");
    builder.finish(SourceKind::Binary)
}
