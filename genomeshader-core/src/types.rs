use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type GenomicPos = u64;

/// Canonical variant identifier, unique within a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub u64);

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VariantId {
    fn from(id: u64) -> Self {
        VariantId(id)
    }
}

/// Half-open genomic interval `[start, end)` on one chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicWindow {
    pub start: GenomicPos,
    pub end: GenomicPos,
}

impl GenomicWindow {
    pub fn new(start: GenomicPos, end: GenomicPos) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn span(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.span() == 0
    }

    pub fn center(&self) -> f64 {
        (self.start as f64 + self.end as f64) * 0.5
    }

    pub fn contains(&self, position: GenomicPos) -> bool {
        position >= self.start && position < self.end
    }

    pub fn contains_window(&self, other: &GenomicWindow) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Grow by `fraction` of the span on each side, saturating at zero.
    pub fn padded(&self, fraction: f64) -> GenomicWindow {
        let pad = if fraction.is_finite() && fraction > 0.0 {
            (self.span() as f64 * fraction).ceil() as u64
        } else {
            0
        };
        GenomicWindow {
            start: self.start.saturating_sub(pad),
            end: self.end.saturating_add(pad),
        }
    }

    /// Window of `span` bp centred on `center`, never starting below zero.
    pub fn centered(center: f64, span: f64) -> GenomicWindow {
        let span = if span.is_finite() { span.max(1.0) } else { 1.0 };
        let center = if center.is_finite() { center.max(span / 2.0) } else { span / 2.0 };
        let start = (center - span / 2.0).round().max(0.0) as u64;
        GenomicWindow {
            start,
            end: start + span.round().max(1.0) as u64,
        }
    }
}

impl fmt::Display for GenomicWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One possible allele at a variant.
///
/// `Alt(i)` holds the zero-based index into the variant's alternate allele
/// list; the text form is one-based (`alt1` is `Alt(0)`) so that it lines up
/// with the integers used in genotype strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlleleKey {
    NoCall,
    Reference,
    Alt(u16),
}

impl AlleleKey {
    /// Map a genotype allele index onto a key.
    ///
    /// `0` is the reference and `k >= 1` is `alt_alleles[k - 1]`. Indices past
    /// the end of the alt list cannot be drawn and are treated as no-calls.
    pub fn from_genotype_index(index: Option<u32>, alt_count: usize) -> Self {
        match index {
            None => AlleleKey::NoCall,
            Some(0) => AlleleKey::Reference,
            Some(k) if (k as usize) <= alt_count && k <= u16::MAX as u32 => AlleleKey::Alt((k - 1) as u16),
            Some(_) => AlleleKey::NoCall,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, AlleleKey::Reference)
    }

    pub fn is_no_call(&self) -> bool {
        matches!(self, AlleleKey::NoCall)
    }

    /// Position in the default display order: reference, alts, then no-call.
    pub fn default_rank(&self) -> u32 {
        match self {
            AlleleKey::Reference => 0,
            AlleleKey::Alt(i) => 1 + *i as u32,
            AlleleKey::NoCall => u32::MAX,
        }
    }
}

impl fmt::Display for AlleleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlleleKey::NoCall => write!(f, "nocall"),
            AlleleKey::Reference => write!(f, "ref"),
            AlleleKey::Alt(i) => write!(f, "alt{}", *i as u32 + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAlleleKeyError(String);

impl fmt::Display for ParseAlleleKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid allele key '{}' (expected ref, nocall or altN)", self.0)
    }
}

impl std::error::Error for ParseAlleleKeyError {}

impl FromStr for AlleleKey {
    type Err = ParseAlleleKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "ref" | "reference" => Ok(AlleleKey::Reference),
            "nocall" | "no-call" | "." => Ok(AlleleKey::NoCall),
            other => other
                .strip_prefix("alt")
                .and_then(|n| n.parse::<u16>().ok())
                .filter(|n| *n >= 1)
                .map(|n| AlleleKey::Alt(n - 1))
                .ok_or_else(|| ParseAlleleKeyError(s.to_string())),
        }
    }
}

impl TryFrom<String> for AlleleKey {
    type Error = ParseAlleleKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlleleKey> for String {
    fn from(key: AlleleKey) -> Self {
        key.to_string()
    }
}

/// A user-addressable allele node: one allele at one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlleleRef {
    pub variant: VariantId,
    pub allele: AlleleKey,
}

impl AlleleRef {
    pub fn new(variant: VariantId, allele: AlleleKey) -> Self {
        Self { variant, allele }
    }
}

/// A parsed genotype call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genotype {
    /// Allele index per haplotype slot; `None` is a no-call.
    pub calls: Vec<Option<u32>>,
    /// Haplotype order is known: every separator is `|`, or the call is haploid.
    pub phased: bool,
}

impl Genotype {
    /// Parse `"a/b"`, `"a|b"` or a haploid `"a"`. Unparseable alleles become
    /// no-calls but still occupy their slot.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::missing(1);
        }

        let calls: Vec<Option<u32>> = text
            .split(|c| c == '/' || c == '|')
            .map(|allele| {
                let allele = allele.trim();
                if allele == "." {
                    None
                } else {
                    allele.parse::<u32>().ok()
                }
            })
            .collect();

        let phased = calls.len() == 1 || (text.contains('|') && !text.contains('/'));

        Self { calls, phased }
    }

    /// An unphased all-missing genotype of the given ploidy.
    pub fn missing(ploidy: usize) -> Self {
        Self {
            calls: vec![None; ploidy.max(1)],
            phased: false,
        }
    }

    pub fn ploidy(&self) -> usize {
        self.calls.len()
    }
}

/// Precomputed insertion lookup row, sorted by position by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertionRecord {
    pub id: VariantId,
    pub position: GenomicPos,
    pub max_insertion_length: u32,
}

/// A variant record as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome: Option<String>,
    pub position: GenomicPos,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcf_id: Option<String>,
    pub ref_allele: String,
    #[serde(default)]
    pub alt_alleles: Vec<String>,
    #[serde(default)]
    pub sample_genotypes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allele_frequencies: Option<BTreeMap<AlleleKey, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_insertion: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_insertion_length: Option<u32>,
}

impl Variant {
    pub fn new(id: u64, position: GenomicPos, ref_allele: &str, alt_alleles: &[&str]) -> Self {
        Self {
            id: VariantId(id),
            chromosome: None,
            position,
            vcf_id: None,
            ref_allele: ref_allele.to_string(),
            alt_alleles: alt_alleles.iter().map(|a| a.to_string()).collect(),
            sample_genotypes: BTreeMap::new(),
            allele_frequencies: None,
            is_insertion: None,
            max_insertion_length: None,
        }
    }

    /// Builder-style helper for attaching one sample's genotype.
    pub fn with_genotype(mut self, sample: &str, genotype: &str) -> Self {
        self.sample_genotypes.insert(sample.to_string(), genotype.to_string());
        self
    }

    pub fn alt_count(&self) -> usize {
        self.alt_alleles.len()
    }

    pub fn genotype(&self, sample: &str) -> Option<Genotype> {
        self.sample_genotypes.get(sample).map(|gt| Genotype::parse(gt))
    }

    pub fn is_insertion(&self) -> bool {
        self.is_insertion.unwrap_or_else(|| {
            self.alt_alleles
                .iter()
                .any(|alt| alt.len() > self.ref_allele.len())
        })
    }

    /// Longest number of inserted bases over all alt alleles.
    pub fn insertion_length(&self) -> u32 {
        self.max_insertion_length.unwrap_or_else(|| {
            self.alt_alleles
                .iter()
                .map(|alt| alt.len().saturating_sub(self.ref_allele.len()) as u32)
                .max()
                .unwrap_or(0)
        })
    }

    /// True if any called slot resolves to no-call (missing, unparseable or
    /// pointing past the alt list).
    pub fn has_no_calls(&self) -> bool {
        let alt_count = self.alt_count();
        self.sample_genotypes.values().any(|gt| {
            Genotype::parse(gt)
                .calls
                .iter()
                .any(|call| AlleleKey::from_genotype_index(*call, alt_count).is_no_call())
        })
    }

    /// Alleles this variant can display, in default order.
    pub fn allele_keys(&self) -> Vec<AlleleKey> {
        let mut keys = Vec::with_capacity(self.alt_count() + 2);
        keys.push(AlleleKey::Reference);
        keys.extend((0..self.alt_count().min(u16::MAX as usize)).map(|i| AlleleKey::Alt(i as u16)));

        let listed_no_call = self
            .allele_frequencies
            .as_ref()
            .map(|freqs| freqs.get(&AlleleKey::NoCall).copied().unwrap_or(0.0) > 0.0)
            .unwrap_or(false);
        if listed_no_call || self.has_no_calls() {
            keys.push(AlleleKey::NoCall);
        }
        keys
    }

    /// Normalised allele frequencies over `allele_keys()`.
    ///
    /// Uses the precomputed map when it carries any mass, otherwise counts
    /// genotype calls, otherwise falls back to a uniform distribution.
    pub fn allele_frequencies(&self) -> BTreeMap<AlleleKey, f64> {
        let keys = self.allele_keys();
        let mut freqs: BTreeMap<AlleleKey, f64> = keys.iter().map(|k| (*k, 0.0)).collect();

        if let Some(given) = &self.allele_frequencies {
            for (key, value) in given {
                if let Some(slot) = freqs.get_mut(key) {
                    if value.is_finite() && *value > 0.0 {
                        *slot = *value;
                    }
                }
            }
        }

        if freqs.values().sum::<f64>() <= 0.0 {
            let alt_count = self.alt_count();
            for gt in self.sample_genotypes.values() {
                for call in Genotype::parse(gt).calls {
                    let key = AlleleKey::from_genotype_index(call, alt_count);
                    *freqs.entry(key).or_insert(0.0) += 1.0;
                }
            }
        }

        let total: f64 = freqs.values().sum();
        if total <= 0.0 {
            let uniform = 1.0 / freqs.len().max(1) as f64;
            freqs.values_mut().for_each(|v| *v = uniform);
        } else {
            freqs.values_mut().for_each(|v| *v /= total);
        }
        freqs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_padding_and_containment() {
        let w = GenomicWindow::new(1000, 2000);
        let padded = w.padded(0.30);
        assert_eq!(padded, GenomicWindow::new(700, 2300));
        assert!(padded.contains_window(&w));
        assert!(!w.contains_window(&padded));
        assert_eq!(GenomicWindow::new(10, 100).padded(1.0).start, 0);
        assert_eq!(GenomicWindow::new(50, 10).start, 10);
    }

    #[test]
    fn centered_window_clamps_at_zero() {
        let w = GenomicWindow::centered(100.0, 1000.0);
        assert_eq!(w, GenomicWindow::new(0, 1000));
        let w = GenomicWindow::centered(5000.0, 1000.0);
        assert_eq!(w, GenomicWindow::new(4500, 5500));
    }

    #[test]
    fn allele_key_text_round_trip() {
        for key in [AlleleKey::NoCall, AlleleKey::Reference, AlleleKey::Alt(0), AlleleKey::Alt(4)] {
            let text = key.to_string();
            assert_eq!(text.parse::<AlleleKey>().unwrap(), key);
        }
        assert_eq!("alt1".parse::<AlleleKey>().unwrap(), AlleleKey::Alt(0));
        assert!("alt0".parse::<AlleleKey>().is_err());
        assert!("banana".parse::<AlleleKey>().is_err());
    }

    #[test]
    fn genotype_index_is_one_based_for_alts() {
        assert_eq!(AlleleKey::from_genotype_index(Some(0), 2), AlleleKey::Reference);
        assert_eq!(AlleleKey::from_genotype_index(Some(1), 2), AlleleKey::Alt(0));
        assert_eq!(AlleleKey::from_genotype_index(Some(2), 2), AlleleKey::Alt(1));
        assert_eq!(AlleleKey::from_genotype_index(Some(3), 2), AlleleKey::NoCall);
        assert_eq!(AlleleKey::from_genotype_index(None, 2), AlleleKey::NoCall);
    }

    #[test]
    fn genotype_parsing() {
        let gt = Genotype::parse("0|1");
        assert_eq!(gt.calls, vec![Some(0), Some(1)]);
        assert!(gt.phased);

        let gt = Genotype::parse("1/1");
        assert!(!gt.phased);

        let gt = Genotype::parse("./x");
        assert_eq!(gt.calls, vec![None, None]);
        assert_eq!(gt.ploidy(), 2);

        let gt = Genotype::parse("2");
        assert_eq!(gt.calls, vec![Some(2)]);
        assert!(gt.phased);

        let gt = Genotype::parse("0|1/2");
        assert_eq!(gt.ploidy(), 3);
        assert!(!gt.phased);

        assert_eq!(Genotype::parse(""), Genotype::missing(1));
    }

    #[test]
    fn insertion_facts_are_derived_when_absent() {
        let v = Variant::new(1, 100, "A", &["ATTT", "AT"]);
        assert!(v.is_insertion());
        assert_eq!(v.insertion_length(), 3);

        let mut snv = Variant::new(2, 100, "A", &["G"]);
        assert!(!snv.is_insertion());
        snv.is_insertion = Some(true);
        snv.max_insertion_length = Some(12);
        assert!(snv.is_insertion());
        assert_eq!(snv.insertion_length(), 12);
    }

    #[test]
    fn frequencies_from_genotypes() {
        let v = Variant::new(1, 10, "A", &["G"])
            .with_genotype("s1", "0|1")
            .with_genotype("s2", "1|1")
            .with_genotype("s3", "./0");
        let keys = v.allele_keys();
        assert_eq!(keys, vec![AlleleKey::Reference, AlleleKey::Alt(0), AlleleKey::NoCall]);

        let freqs = v.allele_frequencies();
        assert!((freqs[&AlleleKey::Reference] - 2.0 / 6.0).abs() < 1e-12);
        assert!((freqs[&AlleleKey::Alt(0)] - 3.0 / 6.0).abs() < 1e-12);
        assert!((freqs[&AlleleKey::NoCall] - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn frequencies_fall_back_to_uniform() {
        let v = Variant::new(1, 10, "A", &["G", "T"]);
        let freqs = v.allele_frequencies();
        assert_eq!(freqs.len(), 3);
        for f in freqs.values() {
            assert!((f - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn precomputed_frequencies_are_normalised() {
        let mut v = Variant::new(1, 10, "A", &["G"]);
        let mut given = BTreeMap::new();
        given.insert(AlleleKey::Reference, 3.0);
        given.insert(AlleleKey::Alt(0), 1.0);
        given.insert(AlleleKey::Alt(7), 5.0);
        v.allele_frequencies = Some(given);

        let freqs = v.allele_frequencies();
        assert_eq!(freqs.len(), 2);
        assert!((freqs[&AlleleKey::Reference] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn variant_json_uses_camel_case_and_text_keys() {
        let json = r#"{
            "id": 7,
            "position": 1200,
            "refAllele": "A",
            "altAlleles": ["AT"],
            "sampleGenotypes": {"NA12878": "0|1"},
            "alleleFrequencies": {"ref": 0.5, "alt1": 0.5},
            "isInsertion": true,
            "maxInsertionLength": 1
        }"#;
        let v: Variant = serde_json::from_str(json).unwrap();
        assert_eq!(v.id, VariantId(7));
        assert_eq!(v.allele_frequencies.as_ref().unwrap()[&AlleleKey::Alt(0)], 0.5);

        let back = serde_json::to_string(&v).unwrap();
        assert!(back.contains("\"alt1\":0.5"));
        assert!(back.contains("refAllele"));
    }
}
