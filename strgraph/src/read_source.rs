//! Read sources (§6): supplies oriented-agnostic read pairs to a
//! [`crate::locus::LocusDriver`]. [`FastaReadSource`] parses a FASTA file
//! character by character in the style of a streaming tokenizer rather than
//! buffering the whole file as a string; [`VecReadSource`] is an in-memory
//! source for tests and the demonstration CLI's paired-file mode.

use std::{
    fs::File,
    io::{BufReader, Read as _},
    path::Path,
};

use log::debug;
use utf8_chars::BufReadCharsExt;

use crate::error::{Error, Result};

/// One read and its stable fragment id, read off a FASTA record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub fragment_id: String,
    pub sequence: Vec<u8>,
}

/// One fragment: a single read, or a mate pair sharing a fragment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    pub fragment_id: String,
    pub mate1: Vec<u8>,
    pub mate2: Option<Vec<u8>>,
}

/// Supplies read pairs (or single reads) in sequence; the locus driver has
/// no notion of the underlying storage.
pub trait ReadSource {
    fn next_pair(&mut self) -> Result<Option<ReadPair>>;
}

/// An in-memory source over pre-parsed reads, used by tests and by the CLI's
/// two-file paired mode once both mates have been parsed and zipped.
#[derive(Debug, Clone)]
pub struct VecReadSource {
    pairs: std::vec::IntoIter<ReadPair>,
}

impl VecReadSource {
    pub fn new(pairs: Vec<ReadPair>) -> Self {
        Self { pairs: pairs.into_iter() }
    }
}

impl ReadSource for VecReadSource {
    fn next_pair(&mut self) -> Result<Option<ReadPair>> {
        Ok(self.pairs.next())
    }
}

/// Reads single-ended records from one interleaved FASTA file, pairing
/// consecutive records whose ids share a `/1`, `/2` mate suffix and treating
/// everything else as unpaired.
pub struct FastaReadSource {
    records: std::vec::IntoIter<Read>,
}

impl FastaReadSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let records = parse_fasta(path.as_ref())?;
        Ok(Self { records: records.into_iter() })
    }
}

impl ReadSource for FastaReadSource {
    fn next_pair(&mut self) -> Result<Option<ReadPair>> {
        let Some(first) = self.records.next() else {
            return Ok(None);
        };
        let (fragment_id, _) = split_mate_suffix(&first.fragment_id);

        match self.records.as_slice().first() {
            Some(second) if split_mate_suffix(&second.fragment_id).0 == fragment_id => {
                let second = self.records.next().unwrap();
                Ok(Some(ReadPair {
                    fragment_id: fragment_id.to_string(),
                    mate1: first.sequence,
                    mate2: Some(second.sequence),
                }))
            }
            _ => Ok(Some(ReadPair {
                fragment_id: fragment_id.to_string(),
                mate1: first.sequence,
                mate2: None,
            })),
        }
    }
}

/// Strips a trailing `/1` or `/2` mate suffix, returning the bare fragment id.
fn split_mate_suffix(id: &str) -> (&str, Option<u8>) {
    if let Some(stripped) = id.strip_suffix("/1") {
        (stripped, Some(1))
    } else if let Some(stripped) = id.strip_suffix("/2") {
        (stripped, Some(2))
    } else {
        (id, None)
    }
}

enum Line {
    Header(String),
    Sequence(String),
}

fn parse_fasta(path: &Path) -> Result<Vec<Read>> {
    debug!("parsing fasta file {path:?}");
    let mut reader = BufReader::new(File::open(path)?);

    let mut lines = Vec::new();
    let mut current = String::new();
    loop {
        match reader.read_char()? {
            Some('\n') => {
                lines.push(take_line(&mut current));
            }
            Some(c) => current.push(c),
            None => {
                if !current.is_empty() {
                    lines.push(take_line(&mut current));
                }
                break;
            }
        }
    }

    let mut records = Vec::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = String::new();
    for line in lines {
        match line {
            Line::Header(id) => {
                if let Some(id) = current_id.take() {
                    records.push(Read { fragment_id: id, sequence: std::mem::take(&mut current_seq).into_bytes() });
                }
                current_id = Some(id);
            }
            Line::Sequence(seq) => current_seq.push_str(&seq),
        }
    }
    if let Some(id) = current_id {
        records.push(Read { fragment_id: id, sequence: current_seq.into_bytes() });
    }

    if records.is_empty() {
        return Err(Error::InvalidInput(format!("{path:?} contains no fasta record")));
    }
    Ok(records)
}

fn take_line(buffer: &mut String) -> Line {
    let trimmed = buffer.trim_end_matches('\r').to_string();
    buffer.clear();
    if let Some(rest) = trimmed.strip_prefix('>') {
        Line::Header(rest.split_whitespace().next().unwrap_or("").to_string())
    } else {
        Line::Sequence(trimmed.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fasta(contents: &str) -> tempfile_path::TempFastaFile {
        tempfile_path::TempFastaFile::new(contents)
    }

    mod tempfile_path {
        use std::io::Write;

        pub struct TempFastaFile {
            path: std::path::PathBuf,
        }

        impl TempFastaFile {
            pub fn new(contents: &str) -> Self {
                let path = std::env::temp_dir().join(format!("strgraph-test-{}.fasta", std::process::id()));
                let mut file = std::fs::File::create(&path).unwrap();
                file.write_all(contents.as_bytes()).unwrap();
                Self { path }
            }

            pub fn path(&self) -> &std::path::Path {
                &self.path
            }
        }

        impl Drop for TempFastaFile {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }

    #[test]
    fn pairs_mates_sharing_a_fragment_id() {
        let file = write_fasta(">frag/1\nACGT\n>frag/2\nTTTT\n");
        let mut source = FastaReadSource::open(file.path()).unwrap();
        let pair = source.next_pair().unwrap().unwrap();
        assert_eq!(pair.fragment_id, "frag");
        assert_eq!(pair.mate1, b"ACGT");
        assert_eq!(pair.mate2, Some(b"TTTT".to_vec()));
        assert!(source.next_pair().unwrap().is_none());
    }

    #[test]
    fn treats_an_unmatched_record_as_unpaired() {
        let file = write_fasta(">solo\nACGTACGT\n");
        let mut source = FastaReadSource::open(file.path()).unwrap();
        let pair = source.next_pair().unwrap().unwrap();
        assert_eq!(pair.fragment_id, "solo");
        assert_eq!(pair.mate2, None);
    }

    #[test]
    fn wraps_sequences_spanning_multiple_lines() {
        let file = write_fasta(">frag\nACGT\nACGT\n");
        let mut source = FastaReadSource::open(file.path()).unwrap();
        let pair = source.next_pair().unwrap().unwrap();
        assert_eq!(pair.mate1, b"ACGTACGT");
    }
}
