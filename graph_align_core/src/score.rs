use std::ops::{Add, AddAssign};

/// A signed alignment score. Unlike a minimizing edit-distance cost, higher is
/// better: matches earn points, mismatches and gaps spend them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Score(i64);

impl Score {
    pub const ZERO: Score = Score(0);
    pub const MIN: Score = Score(i64::MIN / 2);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for Score {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        Score(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        *self = *self + rhs;
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Linear-alignment scoring parameters shared by the pinned linear and DAG
/// aligners; the `gapOpenScore` is charged once per gap, `gapExtendScore` once
/// per gap base (including the first), matching the affine-gap convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreParameters {
    pub match_score: i64,
    pub mismatch_score: i64,
    pub gap_open_score: i64,
    pub gap_extend_score: i64,
}

impl ScoreParameters {
    pub fn match_or_mismatch(&self, query_base: u8, target_base: u8) -> Score {
        Score::new(if bases_match(query_base, target_base) {
            self.match_score
        } else {
            self.mismatch_score
        })
    }

    pub fn gap_open(&self) -> Score {
        Score::new(self.gap_open_score)
    }

    pub fn gap_extend(&self) -> Score {
        Score::new(self.gap_extend_score)
    }
}

/// `N` policy for affine DAG alignment: which side(s) of a base pair are allowed
/// to treat `N` as an automatic match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NMatchPolicy {
    #[default]
    Neither,
    Query,
    Target,
    Both,
}

impl NMatchPolicy {
    pub fn bases_match(self, query_base: u8, target_base: u8) -> bool {
        let plain = bases_match(query_base, target_base);
        if plain {
            return true;
        }
        match self {
            NMatchPolicy::Neither => false,
            NMatchPolicy::Query => query_base.to_ascii_uppercase() == b'N',
            NMatchPolicy::Target => target_base.to_ascii_uppercase() == b'N',
            NMatchPolicy::Both => {
                query_base.to_ascii_uppercase() == b'N' || target_base.to_ascii_uppercase() == b'N'
            }
        }
    }
}

/// `N` acts as a wildcard in both directions, matching anything.
pub fn bases_match(a: u8, b: u8) -> bool {
    let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
    a == b || a == b'N' || b == b'N'
}
