//! End-to-end overlap detection: index, anchors, trigger, fusion, rescue and
//! name attachment.

use crate::finalize::update_read_names;
use crate::fusion::{fuse_overlaps_with_config, FusionConfig};
use crate::index::{Index, DEFAULT_KMER_SIZE, DEFAULT_WINDOW_SIZE};
use crate::matcher::{find_anchors, MatcherConfig};
use crate::overlap::Overlap;
use crate::overlapper::{Overlapper, OverlapperTriggered, TriggerConfig};
use crate::rescue::{rescue_overlap_ends_with_config, RescueConfig};
use crate::sequence::{ReadSet, SequenceProvider};
use anyhow::{Context, Result};
use log::info;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub kmer_size: usize,
    pub window_size: usize,
    pub matcher: MatcherConfig,
    pub trigger: TriggerConfig,
    /// None disables fusion
    pub fusion: Option<FusionConfig>,
    /// Keep overlaps that were fused alongside the fused result
    pub keep_fused_inputs: bool,
    /// None disables end rescue
    pub rescue: Option<RescueConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            kmer_size: DEFAULT_KMER_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            matcher: MatcherConfig::default(),
            trigger: TriggerConfig::default(),
            fusion: Some(FusionConfig::default()),
            keep_fused_inputs: false,
            rescue: Some(RescueConfig::default()),
        }
    }
}

impl PipelineConfig {
    pub fn with_kmer_size(mut self, kmer_size: usize) -> Self {
        self.kmer_size = kmer_size;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_fusion(mut self, fusion: Option<FusionConfig>) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn with_keep_fused_inputs(mut self, keep_fused_inputs: bool) -> Self {
        self.keep_fused_inputs = keep_fused_inputs;
        self
    }

    pub fn with_rescue(mut self, rescue: Option<RescueConfig>) -> Self {
        self.rescue = rescue;
        self
    }
}

/// Run every stage on two read sets and return named, refined overlaps
pub fn find_overlaps(
    query_reads: &ReadSet,
    target_reads: &ReadSet,
    config: &PipelineConfig,
) -> Result<Vec<Overlap>> {
    info!(
        "Indexing {} query reads and {} target reads (k={}, w={})",
        query_reads.len(),
        target_reads.len(),
        config.kmer_size,
        config.window_size
    );
    let query_index = Index::build(query_reads, config.kmer_size, config.window_size)
        .context("Failed to index query reads")?;
    let target_index = Index::build(target_reads, config.kmer_size, config.window_size)
        .context("Failed to index target reads")?;
    info!(
        "Collected {} query and {} target minimizers",
        query_index.num_minimizers(),
        target_index.num_minimizers()
    );

    // Ids only name the same read when both sides are one read set
    let all_vs_all = std::ptr::eq(query_reads, target_reads);
    let matcher = config
        .matcher
        .clone()
        .with_skip_self(config.matcher.skip_self && all_vs_all);
    let anchors = find_anchors(&query_index, &target_index, &matcher);
    info!("Found {} anchors", anchors.len());

    let trigger = TriggerConfig {
        kmer_size: config.kmer_size,
        ..config.trigger.clone()
    };
    let overlapper = OverlapperTriggered::new(trigger).with_read_counts(
        query_reads.num_sequences() as u64,
        target_reads.num_sequences() as u64,
    );
    let mut overlaps = overlapper
        .get_overlaps(&anchors)
        .context("Failed to trigger overlaps")?;
    info!("Triggered {} overlaps", overlaps.len());

    if let Some(fusion) = &config.fusion {
        overlaps = fuse_overlaps_with_config(overlaps, !config.keep_fused_inputs, fusion);
        info!("{} overlaps after fusion", overlaps.len());
    }

    if let Some(rescue) = &config.rescue {
        rescue_overlap_ends_with_config(&mut overlaps, query_reads, target_reads, rescue)
            .context("Failed to rescue overlap ends")?;
    }

    update_read_names(&mut overlaps, query_reads, target_reads)
        .context("Failed to attach read names")?;

    Ok(overlaps)
}
