/*!
 * Fit Policies
 * Pure selection of a free region for a request
 */

use super::traits::Region;
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule for choosing among multiple qualifying free regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// First free region large enough, in address order
    #[default]
    FirstFit,
    /// Smallest qualifying region, earliest on ties
    BestFit,
    /// Largest qualifying region, earliest on ties
    WorstFit,
}

impl FitPolicy {
    /// Select a candidate key from an address-ordered sequence.
    ///
    /// Keys are opaque to the policy: slice indices for static partitions,
    /// arena slots for the dynamic list.
    pub fn select<'a, K, R, I>(self, candidates: I, requested: Size) -> Option<K>
    where
        R: Region + 'a,
        I: IntoIterator<Item = (K, &'a R)>,
    {
        let mut qualifying = candidates
            .into_iter()
            .filter(|(_, region)| region.is_free() && region.size() >= requested);

        match self {
            FitPolicy::FirstFit => qualifying.next().map(|(key, _)| key),
            FitPolicy::BestFit => {
                let mut best: Option<(K, Size)> = None;
                for (key, region) in qualifying {
                    // Strict comparison keeps the earliest region on ties
                    if best.as_ref().map_or(true, |(_, size)| region.size() < *size) {
                        best = Some((key, region.size()));
                    }
                }
                best.map(|(key, _)| key)
            }
            FitPolicy::WorstFit => {
                let mut worst: Option<(K, Size)> = None;
                for (key, region) in qualifying {
                    if worst.as_ref().map_or(true, |(_, size)| region.size() > *size) {
                        worst = Some((key, region.size()));
                    }
                }
                worst.map(|(key, _)| key)
            }
        }
    }
}

impl fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FitPolicy::FirstFit => write!(f, "first-fit"),
            FitPolicy::BestFit => write!(f, "best-fit"),
            FitPolicy::WorstFit => write!(f, "worst-fit"),
        }
    }
}
