//! `LinearAlignment` (C3): a CIGAR-style operation list pinned to a reference
//! start, with the reverse and split laws the gapped aligner relies on when
//! stitching prefix/seed/suffix pieces together.

use nom::{
    IResult, Parser,
    character::complete::{digit1, one_of},
    multi::many1,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Match,
    Mismatch,
    Insertion,
    Deletion,
    Softclip,
    MissingBases,
}

impl OperationKind {
    fn to_char(self) -> char {
        match self {
            OperationKind::Match => 'M',
            OperationKind::Mismatch => 'X',
            OperationKind::Insertion => 'I',
            OperationKind::Deletion => 'D',
            OperationKind::Softclip => 'S',
            OperationKind::MissingBases => 'N',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'M' | '=' => Some(OperationKind::Match),
            'X' => Some(OperationKind::Mismatch),
            'I' => Some(OperationKind::Insertion),
            'D' => Some(OperationKind::Deletion),
            'S' => Some(OperationKind::Softclip),
            'N' => Some(OperationKind::MissingBases),
            _ => None,
        }
    }

    /// Whether this operation consumes a reference base.
    fn consumes_reference(self) -> bool {
        matches!(
            self,
            OperationKind::Match | OperationKind::Mismatch | OperationKind::Deletion | OperationKind::MissingBases
        )
    }

    /// Whether this operation consumes a query base.
    fn consumes_query(self) -> bool {
        matches!(
            self,
            OperationKind::Match | OperationKind::Mismatch | OperationKind::Insertion | OperationKind::Softclip
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub length: usize,
}

/// Cached aggregate counters over an alignment's operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub matched: usize,
    pub mismatched: usize,
    pub clipped: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearAlignment {
    reference_start: usize,
    operations: Vec<Operation>,
    counters: Counters,
}

impl LinearAlignment {
    pub fn new(reference_start: usize, operations: Vec<Operation>) -> Result<Self> {
        for (i, op) in operations.iter().enumerate() {
            if op.length == 0 {
                return Err(Error::InvalidCigar("operation length must be positive".into()));
            }
            if op.kind == OperationKind::Softclip && i != 0 && i != operations.len() - 1 {
                return Err(Error::InvalidCigar(
                    "softclip may only appear at the very start or end".into(),
                ));
            }
        }

        let counters = count(&operations);
        Ok(Self {
            reference_start,
            operations,
            counters,
        })
    }

    pub fn reference_start(&self) -> usize {
        self.reference_start
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn reference_length(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.length)
            .sum()
    }

    pub fn query_length(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.kind.consumes_query())
            .map(|op| op.length)
            .sum()
    }

    /// Parses a CIGAR string of the form `<digits><M|X|I|D|S|N>...`.
    pub fn parse(reference_start: usize, cigar: &str) -> Result<Self> {
        let (remainder, operations) =
            parse_operations(cigar).map_err(|e| Error::from_nom(cigar, e))?;
        if !remainder.is_empty() {
            return Err(Error::InvalidCigar(cigar.to_string()));
        }
        Self::new(reference_start, operations)
    }

    /// Emits a canonical CIGAR string, e.g. `3M1I2D`.
    pub fn generate_cigar(&self) -> String {
        let mut s = String::new();
        for op in &self.operations {
            s.push_str(&op.length.to_string());
            s.push(op.kind.to_char());
        }
        s
    }

    /// Reverses operation order and transforms `referenceStart` so the alignment
    /// reads the same when both reference and query are reversed.
    pub fn reverse(&self, reference_len: usize) -> Result<Self> {
        let mut operations = self.operations.clone();
        operations.reverse();
        let new_start = reference_len
            .checked_sub(self.reference_start)
            .and_then(|x| x.checked_sub(self.reference_length()))
            .ok_or_else(|| {
                Error::AlignmentInconsistent(format!(
                    "reference_len {reference_len} is shorter than this alignment's span"
                ))
            })?;
        Self::new(new_start, operations)
    }

    /// Splits this alignment at reference position `p` (relative to
    /// `reference_start`), returning `(prefix, suffix)` covering the same bases
    /// jointly. If `p` falls inside an operation that consumes the reference,
    /// that operation is itself split by reference length (with any query
    /// consumption split proportionally, base by base, for match/mismatch runs).
    pub fn split_at_reference_position(&self, p: usize) -> Result<(Self, Self)> {
        if p > self.reference_length() {
            return Err(Error::AlignmentInconsistent(format!(
                "split position {p} exceeds reference length {}",
                self.reference_length()
            )));
        }

        let mut prefix_ops = Vec::new();
        let mut suffix_ops = Vec::new();
        let mut consumed = 0usize;
        let mut splitting = false;

        for op in &self.operations {
            if splitting {
                suffix_ops.push(*op);
                continue;
            }

            let ref_len = if op.kind.consumes_reference() { op.length } else { 0 };
            if consumed + ref_len <= p {
                prefix_ops.push(*op);
                consumed += ref_len;
                continue;
            }

            splitting = true;
            if !op.kind.consumes_reference() {
                // Non-reference-consuming op (e.g. a leading insertion) belongs
                // entirely to the prefix, as it precedes the split point.
                prefix_ops.push(*op);
                continue;
            }

            let left_len = p - consumed;
            let right_len = op.length - left_len;
            if left_len > 0 {
                prefix_ops.push(Operation {
                    kind: op.kind,
                    length: left_len,
                });
            }
            if right_len > 0 {
                suffix_ops.push(Operation {
                    kind: op.kind,
                    length: right_len,
                });
            }
        }

        let prefix = Self::new(self.reference_start, prefix_ops)?;
        let suffix_start = self.reference_start + p;
        let suffix = Self::new(suffix_start, suffix_ops)?;
        Ok((prefix, suffix))
    }

    /// Concatenates `self` then `other`, which must pick up exactly where `self`
    /// leaves off on the reference axis. Adjacent runs of the same operation kind
    /// are merged.
    pub fn append(&self, other: &Self) -> Result<Self> {
        let expected_start = self.reference_start + self.reference_length();
        if other.reference_start != expected_start {
            return Err(Error::AlignmentInconsistent(format!(
                "cannot append alignment starting at {} onto one ending at {expected_start}",
                other.reference_start
            )));
        }

        let mut operations = self.operations.clone();
        for op in &other.operations {
            if let Some(last) = operations.last_mut() {
                if last.kind == op.kind {
                    last.length += op.length;
                    continue;
                }
            }
            operations.push(*op);
        }
        Self::new(self.reference_start, operations)
    }
}

fn count(operations: &[Operation]) -> Counters {
    let mut counters = Counters::default();
    for op in operations {
        match op.kind {
            OperationKind::Match => counters.matched += op.length,
            OperationKind::Mismatch => counters.mismatched += op.length,
            OperationKind::Softclip => counters.clipped += op.length,
            OperationKind::Insertion => counters.inserted += op.length,
            OperationKind::Deletion => counters.deleted += op.length,
            OperationKind::MissingBases => counters.missing += op.length,
        }
    }
    counters
}

fn parse_operation(input: &str) -> IResult<&str, Operation> {
    let (input, length) = digit1(input)?;
    let (input, kind_char) = one_of("MXIDSN=")(input)?;
    let length: usize = length.parse().unwrap_or(0);
    let kind = OperationKind::from_char(kind_char).expect("one_of restricts to known kinds");
    Ok((input, Operation { kind, length }))
}

fn parse_operations(input: &str) -> IResult<&str, Vec<Operation>> {
    many1(parse_operation).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(cigar: &str) -> LinearAlignment {
        LinearAlignment::parse(0, cigar).unwrap()
    }

    #[test]
    fn round_trips_through_parse_and_generate() {
        let a = alignment("3M1I2D4M");
        assert_eq!(a.generate_cigar(), "3M1I2D4M");
    }

    #[test]
    fn rejects_interior_softclip() {
        let ops = vec![
            Operation { kind: OperationKind::Match, length: 3 },
            Operation { kind: OperationKind::Softclip, length: 2 },
            Operation { kind: OperationKind::Match, length: 1 },
        ];
        assert!(LinearAlignment::new(0, ops).is_err());
    }

    #[test]
    fn reverse_is_involutive() {
        let a = alignment("3M1I2D4M");
        let reference_len = a.reference_start() + a.reference_length() + 5;
        let reversed_twice = a.reverse(reference_len).unwrap().reverse(reference_len).unwrap();
        assert_eq!(a, reversed_twice);
    }

    #[test]
    fn split_and_append_round_trips() {
        let a = alignment("3M2D4M");
        let (prefix, suffix) = a.split_at_reference_position(4).unwrap();
        let rejoined = prefix.append(&suffix).unwrap();
        assert_eq!(rejoined, a);
    }

    #[test]
    fn split_inside_a_match_run() {
        let a = alignment("5M");
        let (prefix, suffix) = a.split_at_reference_position(2).unwrap();
        assert_eq!(prefix.generate_cigar(), "2M");
        assert_eq!(suffix.generate_cigar(), "3M");
    }
}
