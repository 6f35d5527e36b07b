//! Coverage/read-length statistics collector (A5): a running accumulator fed
//! by the locus driver as reads are classified, snapshotted into a
//! [`LocusStats`] the external genotyper consumes.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum AlleleCount {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: u64,
    sum: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LocusStats {
    pub allele_count: AlleleCount,
    pub mean_read_length: f64,
    pub median_fragment_length: f64,
    pub depth: f64,
}

/// Accumulates read lengths, fragment lengths, and on-target base coverage
/// for one locus as its reads are processed, then [`Self::estimate`]s a
/// snapshot for the external genotyper.
#[derive(Debug, Clone)]
pub struct LocusStatsCalculator {
    allele_count: AlleleCount,
    target_region_length: u64,
    read_lengths: Accumulator,
    fragment_lengths: Vec<f64>,
    on_target_bases: u64,
}

impl LocusStatsCalculator {
    pub fn new(allele_count: AlleleCount, target_region_length: u64) -> Self {
        Self {
            allele_count,
            target_region_length,
            read_lengths: Accumulator::default(),
            fragment_lengths: Vec::new(),
            on_target_bases: 0,
        }
    }

    /// Records a read whose mate did not align, or whose pairing is unknown.
    pub fn record_single_mate_length(&mut self, length: usize) {
        self.read_lengths.add(length as f64);
    }

    /// Records a fully classified pair: both read lengths and the fragment
    /// length spanned between their outer aligned bounds.
    pub fn record_pair(&mut self, mate1_length: usize, mate2_length: usize, fragment_length: usize) {
        self.read_lengths.add(mate1_length as f64);
        self.read_lengths.add(mate2_length as f64);
        self.fragment_lengths.push(fragment_length as f64);
    }

    pub fn record_on_target_bases(&mut self, bases: u64) {
        self.on_target_bases += bases;
    }

    pub fn estimate(&self) -> LocusStats {
        let depth = if self.target_region_length == 0 {
            0.0
        } else {
            self.on_target_bases as f64 / self.target_region_length as f64
        };

        LocusStats {
            allele_count: self.allele_count,
            mean_read_length: self.read_lengths.mean(),
            median_fragment_length: median(&self.fragment_lengths),
            depth,
        }
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_read_length_averages_across_singles_and_pairs() {
        let mut calculator = LocusStatsCalculator::new(AlleleCount::Two, 100);
        calculator.record_single_mate_length(50);
        calculator.record_pair(100, 100, 300);
        let stats = calculator.estimate();
        assert!((stats.mean_read_length - 83.333_333_333_333_33).abs() < 1e-9);
        assert_eq!(stats.median_fragment_length, 300.0);
    }

    #[test]
    fn depth_divides_on_target_bases_by_region_length() {
        let mut calculator = LocusStatsCalculator::new(AlleleCount::One, 50);
        calculator.record_on_target_bases(150);
        assert_eq!(calculator.estimate().depth, 3.0);
    }

    #[test]
    fn median_fragment_length_is_zero_with_no_pairs() {
        let calculator = LocusStatsCalculator::new(AlleleCount::Two, 100);
        assert_eq!(calculator.estimate().median_fragment_length, 0.0);
    }
}
