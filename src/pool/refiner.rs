//! Exclusion filtering and bounded pool refill.

use super::{ExclusionFilter, TrackPoolAssembler};
use crate::spotify::Track;
use crate::vibe::ParameterSet;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Below this the refiner asks the assembler for one more full pool.
pub(crate) const MIN_POOL_SIZE: usize = 20;
/// Below this, after the refill, one search-based round is attempted.
pub(crate) const MIN_AFTER_REFILL: usize = 10;

/// Applies exclusions and tops the pool back up, at most two extra rounds.
pub struct ResultRefiner<'a> {
    assembler: &'a TrackPoolAssembler,
}

impl<'a> ResultRefiner<'a> {
    pub fn new(assembler: &'a TrackPoolAssembler) -> Self {
        Self { assembler }
    }

    /// Filter the pool by the exclusion sets, then refill if it fell below
    /// the viable thresholds.
    ///
    /// Accepted tracks are never removed; refinement only adds. A short
    /// final pool is returned as-is once both extra rounds are spent.
    pub async fn refine(
        &self,
        pool: Vec<Track>,
        params: &ParameterSet,
        exclusions: &ExclusionFilter,
    ) -> Vec<Track> {
        let mut result: Vec<Track> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for track in pool {
            if exclusions.allows(&track) && seen.insert(track.id.clone()) {
                result.push(track);
            }
        }

        if result.len() >= MIN_POOL_SIZE {
            return result;
        }
        debug!(size = result.len(), "Pool below minimum; refilling");

        match self.assembler.assemble(params).await {
            Ok(refill) => {
                for track in refill {
                    if exclusions.allows(&track) && seen.insert(track.id.clone()) {
                        result.push(track);
                    }
                }
            }
            Err(e) => warn!(error = %e, "Refill round failed"),
        }

        if result.len() >= MIN_AFTER_REFILL {
            return result;
        }
        debug!(size = result.len(), "Pool still small; search round");

        let searched = self.assembler.search_fallback(params, exclusions).await;
        for track in searched {
            if seen.insert(track.id.clone()) {
                result.push(track);
            }
        }
        result
    }
}
