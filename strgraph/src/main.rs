#![deny(clippy::mod_module_files)]

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use strgraph::{
    locus::{LocusDriver, LocusSpecification},
    read_source::{FastaReadSource, ReadSource},
};

/// Aligns reads from a FASTA file against one locus graph and reports
/// per-variant classification counts and coverage statistics.
#[derive(Parser)]
struct Cli {
    #[clap(long, short = 'l', default_value = "info")]
    log_level: LevelFilter,

    /// Graph topology and node sequences, in the JSON schema produced by a
    /// locus definition pipeline.
    #[clap(long, short = 'g')]
    graph: PathBuf,

    /// The variant bundles, allele count, and target regions for this locus.
    #[clap(long, short = 's')]
    locus_spec: PathBuf,

    /// Reads to align, one interleaved FASTA file; `/1`/`/2` suffixed ids
    /// are paired automatically.
    #[clap(long, short = 'r')]
    reads: PathBuf,

    /// Where to write the plain-text rendering of every aligned mate; omit
    /// to skip alignment rendering and only report the summary.
    #[clap(long, short = 'o')]
    alignments_out: Option<PathBuf>,

    #[clap(long, default_value_t = 21)]
    kmer_len: usize,

    #[clap(long, default_value_t = 2)]
    seed_affix_trim_length: usize,

    #[clap(long, default_value_t = 5)]
    orientation_min_kmer_matches: usize,

    /// Cap on co-optimal DAG-aligner tracebacks enumerated per extension;
    /// exceeding it truncates the search and collapses duplicate paths.
    #[clap(long, default_value_t = gapped_graph_aligner::DEFAULT_MAX_REPEATS)]
    max_repeats: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    TermLogger::init(cli.log_level, Default::default(), TerminalMode::Mixed, ColorChoice::Auto).unwrap();

    let graph_json = fs::read_to_string(&cli.graph).with_context(|| format!("reading {:?}", cli.graph))?;
    let loaded = graph_model::json::from_str(&graph_json)?;
    let graph = loaded.graph;

    let spec_json =
        fs::read_to_string(&cli.locus_spec).with_context(|| format!("reading {:?}", cli.locus_spec))?;
    let spec = LocusSpecification::from_str(&spec_json)?;

    let params = gapped_graph_aligner::HeuristicParameters {
        kmer_len: cli.kmer_len,
        seed_affix_trim_length: cli.seed_affix_trim_length,
        scores: gapped_graph_aligner::AffineScores {
            match_score: 2,
            mismatch_score: -4,
            gap_open_score: -4,
            gap_extend_score: -1,
        },
        n_match_policy: graph_align_core::score::NMatchPolicy::Neither,
        max_repeats: cli.max_repeats,
    };

    let mut driver = LocusDriver::new(&graph, &spec, params, cli.kmer_len, cli.orientation_min_kmer_matches)?;

    let mut out = cli
        .alignments_out
        .as_ref()
        .map(|path| fs::File::create(path).with_context(|| format!("creating {path:?}")))
        .transpose()?;

    let mut source = FastaReadSource::open(&cli.reads)?;
    let mut processed = 0usize;
    while let Some(pair) = source.next_pair()? {
        let Some(mate2) = pair.mate2.as_ref() else {
            info!("skipping unpaired fragment {}: this locus requires paired reads", pair.fragment_id);
            continue;
        };
        driver.process_pair(
            &pair.fragment_id,
            &pair.mate1,
            mate2,
            out.as_mut().map(|f| f as &mut dyn std::io::Write),
        )?;
        processed += 1;
    }
    info!("processed {processed} read pairs");

    let result = driver.finish();
    println!("{}", serde_json::to_string_pretty(&DisplayResult::from(result))?);

    Ok(())
}

#[derive(serde::Serialize)]
struct DisplayResult {
    locus_id: String,
    stats: strgraph::stats::LocusStats,
}

impl From<strgraph::locus::LocusResult> for DisplayResult {
    fn from(result: strgraph::locus::LocusResult) -> Self {
        Self {
            locus_id: result.locus_id,
            stats: result.stats,
        }
    }
}
