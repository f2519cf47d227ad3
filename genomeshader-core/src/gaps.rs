//! Index of insertion gaps.
//!
//! Every insertion variant owns a gap of `ceil(len * expansion_factor)` base
//! pairs. Gaps only take screen space while the insertion is expanded; the
//! expanded set is UI state and is passed in on every query.

use crate::types::{GenomicPos, GenomicWindow, InsertionRecord, Variant, VariantId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Room given to an expanded insertion relative to its length.
pub const DEFAULT_EXPANSION_FACTOR: f64 = 1.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapEntry {
    pub variant_id: VariantId,
    pub position: GenomicPos,
    pub gap_bp: u64,
}

/// Sorted gap entries plus an id lookup over the same entries.
#[derive(Debug, Clone, Default)]
pub struct GapIndex {
    sorted: Vec<GapEntry>,
    by_id: HashMap<VariantId, GapEntry>,
}

impl GapIndex {
    /// Build from arbitrary entries. Entries are sorted by position and the
    /// first entry seen for an id wins, so each id appears exactly once.
    pub fn from_entries<I: IntoIterator<Item = GapEntry>>(entries: I) -> Self {
        let mut by_id = HashMap::new();
        let mut sorted = Vec::new();
        for entry in entries {
            if by_id.contains_key(&entry.variant_id) {
                log::debug!("ignoring duplicate gap entry for variant {}", entry.variant_id);
                continue;
            }
            by_id.insert(entry.variant_id, entry);
            sorted.push(entry);
        }
        sorted.sort_by_key(|e| (e.position, e.variant_id));
        Self { sorted, by_id }
    }

    pub fn from_insertion_table(table: &[InsertionRecord], expansion_factor: f64) -> Self {
        Self::from_entries(table.iter().map(|row| GapEntry {
            variant_id: row.id,
            position: row.position,
            gap_bp: gap_size(row.max_insertion_length, expansion_factor),
        }))
    }

    /// Fallback when the data source did not ship an insertion table.
    pub fn from_variants(variants: &[Variant], expansion_factor: f64) -> Self {
        Self::from_entries(
            variants
                .iter()
                .filter(|v| v.is_insertion())
                .map(|v| GapEntry {
                    variant_id: v.id,
                    position: v.position,
                    gap_bp: gap_size(v.insertion_length(), expansion_factor),
                }),
        )
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn entries(&self) -> &[GapEntry] {
        &self.sorted
    }

    pub fn get(&self, id: VariantId) -> Option<&GapEntry> {
        self.by_id.get(&id)
    }

    /// Total expanded gap bp strictly before `position`, ignoring entries
    /// positioned before `view_start`.
    ///
    /// Binary searches the sorted entries for the range `[view_start, position)`
    /// and then walks whichever is smaller: that range or the expanded set.
    pub fn gap_before(&self, position: f64, view_start: f64, expanded: &HashSet<VariantId>) -> u64 {
        if expanded.is_empty() || self.sorted.is_empty() || position.is_nan() {
            return 0;
        }

        let lo = self.sorted.partition_point(|e| (e.position as f64) < view_start);
        let hi = self.sorted.partition_point(|e| (e.position as f64) < position);
        if lo >= hi {
            return 0;
        }

        if expanded.len() < hi - lo {
            expanded
                .iter()
                .filter_map(|id| self.by_id.get(id))
                .filter(|e| {
                    let p = e.position as f64;
                    p >= view_start && p < position
                })
                .map(|e| e.gap_bp)
                .sum()
        } else {
            self.sorted[lo..hi]
                .iter()
                .filter(|e| expanded.contains(&e.variant_id))
                .map(|e| e.gap_bp)
                .sum()
        }
    }

    /// Linear scan over every entry. Same answer as [`GapIndex::gap_before`].
    pub fn gap_before_linear(&self, position: f64, view_start: f64, expanded: &HashSet<VariantId>) -> u64 {
        if position.is_nan() {
            return 0;
        }
        let mut counted = HashSet::new();
        self.sorted
            .iter()
            .filter(|e| {
                let p = e.position as f64;
                p >= view_start && p < position && expanded.contains(&e.variant_id)
            })
            .filter(|e| counted.insert(e.variant_id))
            .map(|e| e.gap_bp)
            .sum()
    }

    /// Total expanded gap bp inside `[window.start, window.end)`.
    pub fn total_expanded(&self, window: &GenomicWindow, expanded: &HashSet<VariantId>) -> u64 {
        self.gap_before(window.end as f64, window.start as f64, expanded)
    }

    /// Expanded entries inside the window, in position order.
    pub fn expanded_in<'a>(
        &'a self,
        window: &GenomicWindow,
        expanded: &'a HashSet<VariantId>,
    ) -> impl Iterator<Item = &'a GapEntry> + 'a {
        let lo = self.sorted.partition_point(|e| e.position < window.start);
        let hi = self.sorted.partition_point(|e| e.position < window.end);
        self.sorted[lo..hi.max(lo)]
            .iter()
            .filter(move |e| expanded.contains(&e.variant_id))
    }
}

/// Gap bp for an insertion of `insertion_length` bases.
pub fn gap_size(insertion_length: u32, expansion_factor: f64) -> u64 {
    let factor = if expansion_factor.is_finite() && expansion_factor > 0.0 {
        expansion_factor
    } else {
        log::warn!("invalid gap expansion factor {}, using 1.0", expansion_factor);
        1.0
    };
    (insertion_length as f64 * factor).ceil() as u64
}
