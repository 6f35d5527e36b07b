//! Locus driver (C11): orients each read, delegates to the gapped graph
//! aligner, classifies or falls back to the IRR pair check, and feeds the
//! coverage/read-length stats collector.

use std::collections::BTreeMap;

use gapped_graph_aligner::{GappedAligner, HeuristicParameters, Orientation, predict_orientation, reverse_complement};
use graph_align_core::GraphAlignment;
use graph_align_display::{Mate as DisplayMate, write_alignment};
use graph_model::{Graph, NodeId};
use kmer_index::KmerIndex;
use log::{debug, info};
use serde::Deserialize;

use crate::{
    classifier::AlignmentClassifier,
    error::{Error, Result},
    irr::IrrFinder,
    stats::{AlleleCount, LocusStats, LocusStatsCalculator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mate {
    First,
    Second,
}

impl From<Mate> for DisplayMate {
    fn from(mate: Mate) -> Self {
        match mate {
            Mate::First => DisplayMate::First,
            Mate::Second => DisplayMate::Second,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetRegion {
    pub start: u64,
    pub end: u64,
}

impl TargetRegion {
    fn length(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Repeat,
    SmallVariant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantSpecification {
    pub id: String,
    pub classification: VariantKind,
    #[serde(default)]
    pub subtype: String,
    pub node_ids: Vec<NodeId>,
    #[serde(default)]
    pub reference_node: Option<NodeId>,
    #[serde(default)]
    pub repeat_motif: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocusSpecification {
    pub locus_id: String,
    pub allele_count: AlleleCount,
    pub target_regions: Vec<TargetRegion>,
    #[serde(default)]
    pub off_target_regions: Vec<TargetRegion>,
    pub variants: Vec<VariantSpecification>,
    #[serde(default)]
    pub irr_target_motif: Option<String>,
    #[serde(default = "default_irr_min_coverage_fraction")]
    pub irr_min_coverage_fraction: f64,
    /// Opaque parameters for the external genotyper; this crate never reads
    /// through it.
    #[serde(default)]
    pub genotyper_parameters: serde_json::Value,
}

fn default_irr_min_coverage_fraction() -> f64 {
    crate::irr::DEFAULT_MIN_COVERAGE_FRACTION
}

impl LocusSpecification {
    pub fn from_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    fn target_region_length(&self) -> u64 {
        self.target_regions.iter().map(TargetRegion::length).sum()
    }
}

/// Per-variant findings after a locus has finished processing its reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantFindings {
    Repeat {
        id: String,
        upstream_counts: BTreeMap<NodeId, u64>,
        downstream_counts: BTreeMap<NodeId, u64>,
        spanning_counts: BTreeMap<NodeId, u64>,
        bypass_count: u64,
        irr_pair_count: u64,
    },
    SmallVariant {
        id: String,
        upstream_counts: BTreeMap<NodeId, u64>,
        downstream_counts: BTreeMap<NodeId, u64>,
        spanning_counts: BTreeMap<NodeId, u64>,
        bypass_count: u64,
    },
}

#[derive(Debug)]
struct RepeatAnalyzer {
    id: String,
    classifier: AlignmentClassifier,
    motif: Option<String>,
    irr_pair_count: u64,
}

#[derive(Debug)]
struct SmallVariantAnalyzer {
    id: String,
    classifier: AlignmentClassifier,
}

/// Dispatches per-mate processing to whichever concrete analyzer a variant
/// needs, without an inheritance hierarchy.
#[derive(Debug)]
enum VariantAnalyzer {
    Repeat(RepeatAnalyzer),
    SmallVariant(SmallVariantAnalyzer),
}

impl VariantAnalyzer {
    fn new(spec: &VariantSpecification) -> Result<Self> {
        let classifier = AlignmentClassifier::new(&spec.node_ids)?;
        Ok(match spec.classification {
            VariantKind::Repeat => VariantAnalyzer::Repeat(RepeatAnalyzer {
                id: spec.id.clone(),
                classifier,
                motif: spec.repeat_motif.clone(),
                irr_pair_count: 0,
            }),
            VariantKind::SmallVariant => VariantAnalyzer::SmallVariant(SmallVariantAnalyzer {
                id: spec.id.clone(),
                classifier,
            }),
        })
    }

    fn process_mates(&mut self, _mate: Mate, alignment: &GraphAlignment<'_>) {
        match self {
            VariantAnalyzer::Repeat(a) => {
                a.classifier.classify(alignment);
            }
            VariantAnalyzer::SmallVariant(a) => {
                a.classifier.classify(alignment);
            }
        }
    }

    fn record_irr_pair(&mut self) {
        if let VariantAnalyzer::Repeat(a) = self {
            a.irr_pair_count += 1;
        }
    }

    fn motif(&self) -> Option<&str> {
        match self {
            VariantAnalyzer::Repeat(a) => a.motif.as_deref(),
            VariantAnalyzer::SmallVariant(_) => None,
        }
    }

    fn findings(&self) -> VariantFindings {
        match self {
            VariantAnalyzer::Repeat(a) => VariantFindings::Repeat {
                id: a.id.clone(),
                upstream_counts: a.classifier.upstream_counts().clone(),
                downstream_counts: a.classifier.downstream_counts().clone(),
                spanning_counts: a.classifier.spanning_counts().clone(),
                bypass_count: a.classifier.bypass_count(),
                irr_pair_count: a.irr_pair_count,
            },
            VariantAnalyzer::SmallVariant(a) => VariantFindings::SmallVariant {
                id: a.id.clone(),
                upstream_counts: a.classifier.upstream_counts().clone(),
                downstream_counts: a.classifier.downstream_counts().clone(),
                spanning_counts: a.classifier.spanning_counts().clone(),
                bypass_count: a.classifier.bypass_count(),
            },
        }
    }
}

/// The per-locus result set: one [`VariantFindings`] per configured variant
/// plus the accumulated [`LocusStats`] snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusResult {
    pub locus_id: String,
    pub variants: Vec<VariantFindings>,
    pub stats: LocusStats,
}

/// Orients, aligns, and classifies reads against one locus's graph. Owns
/// per-thread-local mutable DP state (the aligner) and per-locus exclusively
/// owned result state (analyzers, stats); the graph and k-mer index are
/// shared, read-only borrows.
pub struct LocusDriver<'g> {
    locus_id: String,
    graph: &'g Graph,
    index: KmerIndex<'g>,
    aligner: GappedAligner,
    params: HeuristicParameters,
    orientation_k: usize,
    min_kmer_matches_to_pass: usize,
    analyzers: Vec<VariantAnalyzer>,
    irr: Option<(IrrFinder, usize)>,
    stats: LocusStatsCalculator,
}

impl<'g> LocusDriver<'g> {
    pub fn new(
        graph: &'g Graph,
        spec: &LocusSpecification,
        params: HeuristicParameters,
        orientation_k: usize,
        min_kmer_matches_to_pass: usize,
    ) -> Result<Self> {
        info!("processing locus {}", spec.locus_id);

        let index = KmerIndex::build(graph, params.kmer_len)?;

        let analyzers = spec
            .variants
            .iter()
            .map(VariantAnalyzer::new)
            .collect::<Result<Vec<_>>>()?;

        let irr = match &spec.irr_target_motif {
            None => None,
            Some(motif) => {
                let bound: Vec<usize> = analyzers
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.motif() == Some(motif.as_str()))
                    .map(|(i, _)| i)
                    .collect();
                match bound.len() {
                    1 => Some((
                        IrrFinder::new(motif.clone(), spec.irr_min_coverage_fraction),
                        bound[0],
                    )),
                    n => {
                        return Err(Error::IrrBinding(format!(
                            "locus {} must bind exactly one repeat analyzer to IRR motif {motif:?}, found {n}",
                            spec.locus_id
                        )));
                    }
                }
            }
        };

        Ok(Self {
            locus_id: spec.locus_id.clone(),
            graph,
            index,
            aligner: GappedAligner::new(),
            params,
            orientation_k,
            min_kmer_matches_to_pass,
            analyzers,
            irr,
            stats: LocusStatsCalculator::new(spec.allele_count, spec.target_region_length()),
        })
    }

    /// Processes one read pair: orients both mates, aligns each, classifies
    /// or falls back to the IRR check, and updates stats. `writer`, if
    /// given, receives a plain-text dump of every successfully aligned mate.
    pub fn process_pair(
        &mut self,
        read_id: &str,
        mate1: &[u8],
        mate2: &[u8],
        mut writer: Option<&mut dyn std::io::Write>,
    ) -> Result<()> {
        let oriented1 = self.orient(mate1);
        let oriented2 = self.orient(mate2);

        let align1 = self.try_align(&oriented1.sequence)?;
        let align2 = self.try_align(&oriented2.sequence)?;

        match (align1, align2) {
            (Some(a1), Some(a2)) => {
                debug!("read {read_id}: both mates aligned");
                if let Some(writer) = writer.as_deref_mut() {
                    write_alignment(&mut *writer, read_id, Mate::First.into(), &oriented1.sequence, &a1)?;
                    write_alignment(&mut *writer, read_id, Mate::Second.into(), &oriented2.sequence, &a2)?;
                }
                self.stats.record_pair(
                    mate1.len(),
                    mate2.len(),
                    a1.reference_length() + a2.reference_length(),
                );
                self.stats
                    .record_on_target_bases((a1.reference_length() + a2.reference_length()) as u64);
                for analyzer in &mut self.analyzers {
                    analyzer.process_mates(Mate::First, &a1);
                    analyzer.process_mates(Mate::Second, &a2);
                }
            }
            (None, None) => {
                debug!("read {read_id}: neither mate aligned, trying IRR");
                if let Some((finder, index)) = &self.irr {
                    if finder.is_in_repeat_pair(&oriented1.sequence, &oriented2.sequence) {
                        self.analyzers[*index].record_irr_pair();
                    }
                }
            }
            (Some(_), None) => self.stats.record_single_mate_length(mate1.len()),
            (None, Some(_)) => self.stats.record_single_mate_length(mate2.len()),
        }

        Ok(())
    }

    fn try_align(&mut self, sequence: &[u8]) -> Result<Option<GraphAlignment<'g>>> {
        if sequence.is_empty() {
            return Ok(None);
        }
        let results = self.aligner.align(self.graph, &self.index, sequence, self.params)?;
        Ok(results.into_iter().next())
    }

    fn orient(&self, read: &[u8]) -> OrientedRead {
        let orientation = predict_orientation(&self.index, read, self.orientation_k, self.min_kmer_matches_to_pass);
        match orientation {
            Orientation::ReverseComplement => OrientedRead {
                sequence: reverse_complement(read),
                is_reversed: true,
            },
            _ => OrientedRead {
                sequence: read.to_vec(),
                is_reversed: false,
            },
        }
    }

    pub fn finish(self) -> LocusResult {
        LocusResult {
            locus_id: self.locus_id,
            variants: self.analyzers.iter().map(VariantAnalyzer::findings).collect(),
            stats: self.stats.estimate(),
        }
    }
}

struct OrientedRead {
    sequence: Vec<u8>,
    #[allow(dead_code)]
    is_reversed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_model::Graph;

    fn str_graph() -> Graph {
        let mut graph = Graph::new(0);
        graph.add_node("left", "GATTACAGATTACA").unwrap();
        graph.add_node("repeat", "CAG").unwrap();
        graph.add_node("right", "TTTTACGGGCATTA").unwrap();
        graph.add_edge(0, 1).unwrap();
        graph.mark_repeat_node(1).unwrap();
        graph.add_edge(1, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph
    }

    fn spec() -> LocusSpecification {
        LocusSpecification {
            locus_id: "TEST".into(),
            allele_count: AlleleCount::Two,
            target_regions: vec![TargetRegion { start: 0, end: 31 }],
            off_target_regions: Vec::new(),
            variants: vec![VariantSpecification {
                id: "repeat".into(),
                classification: VariantKind::Repeat,
                subtype: "STR".into(),
                node_ids: vec![1],
                reference_node: None,
                repeat_motif: Some("CAG".into()),
            }],
            irr_target_motif: Some("CAG".into()),
            irr_min_coverage_fraction: crate::irr::DEFAULT_MIN_COVERAGE_FRACTION,
            genotyper_parameters: serde_json::Value::Null,
        }
    }

    fn params() -> HeuristicParameters {
        HeuristicParameters {
            kmer_len: 6,
            seed_affix_trim_length: 1,
            scores: gapped_graph_aligner::AffineScores {
                match_score: 2,
                mismatch_score: -3,
                gap_open_score: -2,
                gap_extend_score: -1,
            },
            n_match_policy: graph_align_core::score::NMatchPolicy::Neither,
            max_repeats: gapped_graph_aligner::DEFAULT_MAX_REPEATS,
        }
    }

    #[test]
    fn rejects_an_irr_motif_bound_to_zero_analyzers() {
        let graph = str_graph();
        let mut bad_spec = spec();
        bad_spec.irr_target_motif = Some("TTT".into());
        let result = LocusDriver::new(&graph, &bad_spec, params(), 6, 3);
        assert!(result.is_err());
    }

    #[test]
    fn a_pair_that_both_align_updates_stats_and_classifier() {
        let graph = str_graph();
        let spec = spec();
        let mut driver = LocusDriver::new(&graph, &spec, params(), 6, 3).unwrap();
        let read = b"GATTACAGATTACACAGCAGCAGTTTTACGGGC";
        driver.process_pair("r1", read, read, None).unwrap();
        let result = driver.finish();
        assert_eq!(result.locus_id, "TEST");
        assert_eq!(result.variants.len(), 1);
    }

    #[test]
    fn an_unaligned_pair_with_repeat_content_increments_the_irr_count() {
        let graph = str_graph();
        let spec = spec();
        let mut driver = LocusDriver::new(&graph, &spec, params(), 6, 3).unwrap();
        let repeat_only = b"CAGCAGCAGCAGCAGCAGCAGCAGCAGCAGCAG";
        driver.process_pair("r2", repeat_only, repeat_only, None).unwrap();
        let result = driver.finish();
        let VariantFindings::Repeat { irr_pair_count, .. } = &result.variants[0] else {
            panic!("expected a repeat variant");
        };
        assert_eq!(*irr_pair_count, 1);
    }
}
