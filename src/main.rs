use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use ovlrefine::fusion::FusionConfig;
use ovlrefine::matcher::MatcherConfig;
use ovlrefine::overlapper::TriggerConfig;
use ovlrefine::paf::write_paf;
use ovlrefine::pipeline::{find_overlaps, PipelineConfig};
use ovlrefine::rescue::RescueConfig;
use ovlrefine::sequence::ReadSet;

/// Parse a base count such as `800`, `5k` or `1.5M` (k = 1e3, m = 1e6, g = 1e9)
fn parse_metric_number(s: &str) -> Result<u32, String> {
    let text = s.trim();
    let (digits, scale) = match text.as_bytes().last() {
        None => return Err("expected a number, got an empty string".to_string()),
        Some(b'k' | b'K') => (&text[..text.len() - 1], 1e3),
        Some(b'm' | b'M') => (&text[..text.len() - 1], 1e6),
        Some(b'g' | b'G') => (&text[..text.len() - 1], 1e9),
        Some(c) if c.is_ascii_alphabetic() => {
            return Err(format!("'{text}': unknown suffix '{}', expected k, m or g", *c as char))
        }
        Some(_) => (text, 1.0),
    };

    let value = digits
        .parse::<f64>()
        .map_err(|e| format!("'{text}': {e}"))?
        * scale;

    // Rejects NaN as well as negative and oversized values
    if !(0.0..=u32::MAX as f64).contains(&value) {
        return Err(format!("'{text}' is not a base count between 0 and {}", u32::MAX));
    }

    Ok(value.round() as u32)
}

/// ovlrefine - minimizer-anchor overlap detection for long reads
///
/// Finds overlaps between reads from shared minimizers, fuses neighbouring
/// overlaps of the same read pair, rescues their ends and writes PAF.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// FASTA files: either one (all-vs-all) or two (query then target)
    #[clap(value_name = "FASTA", num_args = 1..=2, required = true)]
    fasta_files: Vec<String>,

    /// Output PAF file (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Minimizer length
    #[clap(short = 'k', long = "kmer-size", default_value = "15")]
    kmer_size: usize,

    /// Number of consecutive k-mers per minimizer window
    #[clap(short = 'w', long = "window-size", default_value = "10")]
    window_size: usize,

    /// Ignore minimizers occurring more often than this in the target set (0 = no limit)
    #[clap(long = "max-occurrences", default_value = "1000")]
    max_occurrences: usize,

    /// Anchors needed in a run before it triggers an overlap
    #[clap(long = "min-run-length", default_value = "3")]
    min_run_length: usize,

    /// Anchors scoring below this close the current run
    #[clap(long = "min-anchor-score", default_value = "0.5")]
    min_anchor_score: f32,

    /// Aggregate run score needed to trigger an overlap
    #[clap(long = "min-run-score", default_value = "2.0")]
    min_run_score: f32,

    /// Largest spacing between consecutive anchors of a run
    #[clap(long = "max-anchor-gap", default_value = "5k", value_parser = parse_metric_number)]
    max_anchor_gap: u32,

    /// Disable overlap fusion
    #[clap(long = "no-fuse")]
    no_fuse: bool,

    /// Keep overlaps that were fused next to the fused overlap
    #[clap(long = "keep-fused-inputs")]
    keep_fused_inputs: bool,

    /// Bases examined past each overlap end in the first rescue round
    #[clap(long = "rescue-extension", default_value = "100", value_parser = parse_metric_number)]
    rescue_extension: u32,

    /// k-mer Jaccard similarity required to extend an overlap end
    #[clap(long = "rescue-similarity", default_value = "0.9")]
    rescue_similarity: f32,

    /// Disable overlap end rescue
    #[clap(long = "no-rescue")]
    no_rescue: bool,

    /// Keep overlaps of a read with itself (excluded by default)
    #[clap(long = "self")]
    keep_self: bool,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value = "8")]
    threads: usize,

    /// Verbosity level (-v info, -vv debug)
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[clap(long = "quiet")]
    quiet: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let trigger = TriggerConfig {
            min_run_length: self.min_run_length,
            min_anchor_score: self.min_anchor_score,
            min_run_score: self.min_run_score,
            max_anchor_gap: self.max_anchor_gap,
            kmer_size: self.kmer_size,
        };
        let matcher = MatcherConfig::default()
            .with_max_occurrences(self.max_occurrences)
            .with_skip_self(!self.keep_self);
        let fusion = (!self.no_fuse).then(FusionConfig::default);
        let rescue = (!self.no_rescue)
            .then(|| RescueConfig::with_first_pass(self.rescue_extension, self.rescue_similarity));

        PipelineConfig::default()
            .with_kmer_size(self.kmer_size)
            .with_window_size(self.window_size)
            .with_matcher(matcher)
            .with_trigger(trigger)
            .with_fusion(fusion)
            .with_keep_fused_inputs(self.keep_fused_inputs)
            .with_rescue(rescue)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match (args.quiet, args.verbose) {
            (true, _) => log::LevelFilter::Error,
            (false, 0) => log::LevelFilter::Warn,
            (false, 1) => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    // Set up rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    let query_reads = ReadSet::from_fasta(&args.fasta_files[0])?;
    info!("Loaded {} query reads from {}", query_reads.len(), args.fasta_files[0]);

    let target_storage;
    let target_reads = match args.fasta_files.get(1) {
        Some(path) => {
            target_storage = ReadSet::from_fasta(path)?;
            info!("Loaded {} target reads from {}", target_storage.len(), path);
            &target_storage
        }
        None => &query_reads,
    };

    let config = args.pipeline_config();
    let overlaps = find_overlaps(&query_reads, target_reads, &config)?;
    info!("Writing {} overlaps", overlaps.len());

    let mut output: Box<dyn Write> = if let Some(ref path) = args.output {
        Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file '{path}'"))?,
        ))
    } else {
        Box::new(BufWriter::new(io::stdout().lock()))
    };

    write_paf(&mut output, &overlaps, &[], config.kmer_size)?;
    output.flush()?;

    Ok(())
}
