//! Haplotype transition counting between adjacent variants, and the bounded
//! cache that memoises it.

use crate::types::{AlleleKey, GenomicWindow, Genotype, Variant, VariantId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

pub const DEFAULT_CACHE_CAPACITY: usize = 2048;
pub const DEFAULT_RETENTION_PADDING: f64 = 0.30;

/// Sparse `src -> dst -> count` table with marginal totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionMatrix {
    counts: BTreeMap<AlleleKey, BTreeMap<AlleleKey, u32>>,
    src_totals: BTreeMap<AlleleKey, u32>,
    dst_totals: BTreeMap<AlleleKey, u32>,
    total: u32,
}

impl TransitionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, src: AlleleKey, dst: AlleleKey) {
        *self.counts.entry(src).or_default().entry(dst).or_insert(0) += 1;
        *self.src_totals.entry(src).or_insert(0) += 1;
        *self.dst_totals.entry(dst).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count(&self, src: AlleleKey, dst: AlleleKey) -> u32 {
        self.counts
            .get(&src)
            .and_then(|row| row.get(&dst))
            .copied()
            .unwrap_or(0)
    }

    pub fn src_total(&self, src: AlleleKey) -> u32 {
        self.src_totals.get(&src).copied().unwrap_or(0)
    }

    pub fn dst_total(&self, dst: AlleleKey) -> u32 {
        self.dst_totals.get(&dst).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Non-zero entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (AlleleKey, AlleleKey, u32)> + '_ {
        self.counts
            .iter()
            .flat_map(|(src, row)| row.iter().map(move |(dst, n)| (*src, *dst, *n)))
    }

    pub fn src_keys(&self) -> impl Iterator<Item = AlleleKey> + '_ {
        self.src_totals.keys().copied()
    }

    pub fn dst_keys(&self) -> impl Iterator<Item = AlleleKey> + '_ {
        self.dst_totals.keys().copied()
    }

    pub fn transposed(&self) -> TransitionMatrix {
        let mut counts: BTreeMap<AlleleKey, BTreeMap<AlleleKey, u32>> = BTreeMap::new();
        for (src, dst, n) in self.iter() {
            counts.entry(dst).or_default().insert(src, n);
        }
        TransitionMatrix {
            counts,
            src_totals: self.dst_totals.clone(),
            dst_totals: self.src_totals.clone(),
            total: self.total,
        }
    }
}

/// Both matrices for an ordered pair of variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairTransitions {
    pub src: VariantId,
    pub dst: VariantId,
    /// Every haplotype slot, phased or not.
    pub observed: TransitionMatrix,
    /// Only samples phased at both variants; this is what ribbons draw.
    pub phased: TransitionMatrix,
}

impl PairTransitions {
    pub fn transposed(&self) -> PairTransitions {
        PairTransitions {
            src: self.dst,
            dst: self.src,
            observed: self.observed.transposed(),
            phased: self.phased.transposed(),
        }
    }
}

/// Count allele transitions from `src` to `dst` over every sample.
///
/// A sample missing from one side counts as an unphased no-call with the
/// other side's ploidy, so it shows up in `observed` but never in `phased`.
pub fn compute_transitions(src: &Variant, dst: &Variant) -> PairTransitions {
    let mut observed = TransitionMatrix::new();
    let mut phased = TransitionMatrix::new();

    let samples: BTreeSet<&str> = src
        .sample_genotypes
        .keys()
        .chain(dst.sample_genotypes.keys())
        .map(String::as_str)
        .collect();

    let (src_alts, dst_alts) = (src.alt_count(), dst.alt_count());

    for sample in samples {
        let (a, b) = match (src.genotype(sample), dst.genotype(sample)) {
            (Some(a), Some(b)) => (a, b),
            (Some(a), None) => {
                let missing = Genotype::missing(a.ploidy());
                (a, missing)
            }
            (None, Some(b)) => (Genotype::missing(b.ploidy()), b),
            (None, None) => continue,
        };
        let both_phased = a.phased && b.phased;

        for (ca, cb) in a.calls.iter().zip(b.calls.iter()) {
            let from = AlleleKey::from_genotype_index(*ca, src_alts);
            let to = AlleleKey::from_genotype_index(*cb, dst_alts);
            observed.record(from, to);
            if both_phased {
                phased.record(from, to);
            }
        }
    }

    PairTransitions {
        src: src.id,
        dst: dst.id,
        observed,
        phased,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Number of times transitions were actually computed.
    pub computes: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

/// Unordered pair key: the smaller id always comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey(VariantId, VariantId);

impl PairKey {
    fn new(a: VariantId, b: VariantId) -> (Self, bool) {
        if a <= b {
            (PairKey(a, b), false)
        } else {
            (PairKey(b, a), true)
        }
    }
}

/// Bounded memo of [`PairTransitions`] keyed by unordered id pair.
///
/// Evicts in insertion order once full. The whole cache is dropped when the
/// visible window leaves the padded retention window.
#[derive(Debug)]
pub struct TransitionCache {
    entries: HashMap<PairKey, Arc<PairTransitions>>,
    order: VecDeque<PairKey>,
    capacity: usize,
    retention_padding: f64,
    retention: Option<GenomicWindow>,
    stats: CacheStats,
}

impl Default for TransitionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_RETENTION_PADDING)
    }
}

impl TransitionCache {
    pub fn new(capacity: usize, retention_padding: f64) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            retention_padding,
            retention: None,
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn retention_window(&self) -> Option<GenomicWindow> {
        self.retention
    }

    pub fn contains(&self, a: VariantId, b: VariantId) -> bool {
        self.entries.contains_key(&PairKey::new(a, b).0)
    }

    /// Cached transitions oriented `src -> dst`, without computing.
    pub fn get(&self, src: VariantId, dst: VariantId) -> Option<Arc<PairTransitions>> {
        let (key, reversed) = PairKey::new(src, dst);
        self.entries.get(&key).map(|stored| {
            if reversed {
                Arc::new(stored.transposed())
            } else {
                Arc::clone(stored)
            }
        })
    }

    /// Cached or freshly computed transitions oriented `src -> dst`.
    pub fn transitions(&mut self, src: &Variant, dst: &Variant) -> Arc<PairTransitions> {
        if let Some(found) = self.get(src.id, dst.id) {
            self.stats.hits += 1;
            return found;
        }

        let (key, reversed) = PairKey::new(src.id, dst.id);
        let canonical = if reversed {
            compute_transitions(dst, src)
        } else {
            compute_transitions(src, dst)
        };
        self.stats.computes += 1;

        let stored = Arc::new(canonical);
        self.insert(key, Arc::clone(&stored));

        if reversed {
            Arc::new(stored.transposed())
        } else {
            stored
        }
    }

    fn insert(&mut self, key: PairKey, value: Arc<PairTransitions>) {
        if self.entries.insert(key, value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
    }

    /// Keep entries while `window` stays inside the retention window;
    /// otherwise drop everything and re-centre the retention window.
    /// Returns true when the cache was invalidated.
    pub fn retain_window(&mut self, window: GenomicWindow) -> bool {
        if let Some(zone) = self.retention {
            if zone.contains_window(&window) {
                return false;
            }
        }

        let invalidated = !self.entries.is_empty();
        if invalidated {
            log::debug!(
                "window {} left retention zone {:?}; dropping {} cached pairs",
                window,
                self.retention,
                self.entries.len()
            );
            self.stats.invalidations += 1;
        }
        self.entries.clear();
        self.order.clear();
        self.retention = Some(window.padded(self.retention_padding));
        invalidated
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.retention = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phased_pair() -> (Variant, Variant) {
        let a = Variant::new(1, 100, "A", &["G"])
            .with_genotype("s1", "0|0")
            .with_genotype("s2", "0|1")
            .with_genotype("s3", "1|0")
            .with_genotype("s4", "1|1");
        let b = Variant::new(2, 200, "C", &["T"])
            .with_genotype("s1", "0|1")
            .with_genotype("s2", "1|1")
            .with_genotype("s3", "0|0")
            .with_genotype("s4", "0|1");
        (a, b)
    }

    #[test]
    fn phased_pair_counts() {
        let (a, b) = phased_pair();
        let t = compute_transitions(&a, &b);
        assert_eq!(t.observed, t.phased);
        assert_eq!(t.phased.total(), 8);
        for (from, to) in [
            (AlleleKey::Reference, AlleleKey::Reference),
            (AlleleKey::Reference, AlleleKey::Alt(0)),
            (AlleleKey::Alt(0), AlleleKey::Reference),
            (AlleleKey::Alt(0), AlleleKey::Alt(0)),
        ] {
            assert_eq!(t.phased.count(from, to), 2, "{} -> {}", from, to);
        }
    }

    #[test]
    fn unphased_samples_only_observed() {
        let a = Variant::new(1, 100, "A", &["G"])
            .with_genotype("s1", "0/1")
            .with_genotype("s2", "1/1");
        let b = Variant::new(2, 200, "C", &["T"])
            .with_genotype("s1", "0|1")
            .with_genotype("s2", "1|1");
        let t = compute_transitions(&a, &b);
        assert_eq!(t.observed.total(), 4);
        assert!(t.phased.is_empty());
    }

    #[test]
    fn missing_sample_and_bad_indices_are_no_calls() {
        let a = Variant::new(1, 100, "A", &["G"])
            .with_genotype("s1", "0|5")
            .with_genotype("only_a", "1|1");
        let b = Variant::new(2, 200, "C", &["T"]).with_genotype("s1", "x|1");
        let t = compute_transitions(&a, &b);

        assert_eq!(t.observed.count(AlleleKey::Reference, AlleleKey::NoCall), 1);
        assert_eq!(t.observed.count(AlleleKey::NoCall, AlleleKey::Alt(0)), 1);
        assert_eq!(t.observed.count(AlleleKey::Alt(0), AlleleKey::NoCall), 2);
        assert_eq!(t.phased.total(), 2);
        assert_eq!(t.phased.count(AlleleKey::Alt(0), AlleleKey::NoCall), 0);
    }

    #[test]
    fn mismatched_ploidy_uses_shared_slots() {
        let a = Variant::new(1, 100, "A", &["G"]).with_genotype("x", "1");
        let b = Variant::new(2, 200, "C", &["T"]).with_genotype("x", "0|1");
        let t = compute_transitions(&a, &b);
        assert_eq!(t.observed.total(), 1);
        assert_eq!(t.phased.count(AlleleKey::Alt(0), AlleleKey::Reference), 1);
    }

    #[test]
    fn marginals_agree() {
        let (a, b) = phased_pair();
        let t = compute_transitions(&a, &b).observed;
        let by_src: u32 = t.src_keys().map(|k| t.src_total(k)).sum();
        let by_dst: u32 = t.dst_keys().map(|k| t.dst_total(k)).sum();
        let cells: u32 = t.iter().map(|(_, _, n)| n).sum();
        assert_eq!(by_src, t.total());
        assert_eq!(by_dst, t.total());
        assert_eq!(cells, t.total());
    }

    #[test]
    fn reversed_lookup_is_transposed() {
        let (a, b) = phased_pair();
        let mut cache = TransitionCache::default();
        let forward = cache.transitions(&a, &b);
        let backward = cache.transitions(&b, &a);
        assert_eq!(cache.stats().computes, 1);
        assert_eq!(backward.src, b.id);
        assert_eq!(*backward, forward.transposed());
        assert_eq!(
            backward.phased.count(AlleleKey::Alt(0), AlleleKey::Reference),
            forward.phased.count(AlleleKey::Reference, AlleleKey::Alt(0))
        );
    }

    #[test]
    fn eviction_drops_oldest_insertion() {
        let variants: Vec<Variant> = (0..5)
            .map(|i| Variant::new(i, i * 10, "A", &["G"]).with_genotype("s", "0|1"))
            .collect();
        let mut cache = TransitionCache::new(3, DEFAULT_RETENTION_PADDING);
        for pair in variants.windows(2) {
            cache.transitions(&pair[0], &pair[1]);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 1);
        assert!(!cache.contains(VariantId(0), VariantId(1)));

        let computes = cache.stats().computes;
        cache.transitions(&variants[3], &variants[4]);
        cache.transitions(&variants[2], &variants[1]);
        assert_eq!(cache.stats().computes, computes);
    }

    #[test]
    fn retention_window_invalidates_on_exit() {
        let (a, b) = phased_pair();
        let mut cache = TransitionCache::default();
        assert!(!cache.retain_window(GenomicWindow::new(1000, 2000)));
        cache.transitions(&a, &b);

        assert!(!cache.retain_window(GenomicWindow::new(1200, 2250)));
        assert_eq!(cache.len(), 1);

        assert!(cache.retain_window(GenomicWindow::new(2000, 3000)));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
        assert_eq!(cache.retention_window(), Some(GenomicWindow::new(1700, 3300)));
    }
}
