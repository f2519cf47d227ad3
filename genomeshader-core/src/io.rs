//! Variant payload loading and locus parsing.
//!
//! Payloads are JSON (optionally gzip-compressed): either a bare array of
//! variants or a document with `variants` and an optional sorted
//! `insertions` table.

use crate::error::{GenomeShaderError, Result};
use crate::types::{GenomicWindow, InsertionRecord, Variant};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Bases added on each side when a locus names a single position.
pub const SINGLE_POSITION_FLANK: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariantDocument {
    pub variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertions: Option<Vec<InsertionRecord>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Bare(Vec<Variant>),
    Document(VariantDocument),
}

/// Parse a JSON payload. `source_name` is only used in error messages.
pub fn parse_variants(json: &str, source_name: &str) -> Result<VariantDocument> {
    let payload: Payload = serde_json::from_str(json)?;
    let doc = match payload {
        Payload::Bare(variants) => VariantDocument {
            variants,
            insertions: None,
        },
        Payload::Document(doc) => doc,
    };
    validate(&doc, source_name)?;
    Ok(doc)
}

fn validate(doc: &VariantDocument, source_name: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(doc.variants.len());
    for v in &doc.variants {
        if !seen.insert(v.id) {
            return Err(GenomeShaderError::invalid_data(
                source_name,
                format!("duplicate variant id {}", v.id),
            ));
        }
        if v.ref_allele.is_empty() {
            return Err(GenomeShaderError::invalid_data(
                source_name,
                format!("variant {} has an empty reference allele", v.id),
            ));
        }
    }
    if let Some(table) = &doc.insertions {
        if table.windows(2).any(|w| w[0].position > w[1].position) {
            return Err(GenomeShaderError::invalid_data(
                source_name,
                "insertion table is not sorted by position",
            ));
        }
    }
    Ok(())
}

/// Load `.json` or `.json.gz` from disk.
pub fn load_variants<P: AsRef<Path>>(path: P) -> Result<VariantDocument> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut text = String::new();
    if path.extension().map(|ext| ext == "gz").unwrap_or(false) {
        BufReader::new(GzDecoder::new(file)).read_to_string(&mut text)?;
    } else {
        BufReader::new(file).read_to_string(&mut text)?;
    }

    let doc = parse_variants(&text, &path.display().to_string())?;
    log::info!(
        "read {} variants from {}{}",
        doc.variants.len(),
        path.display(),
        if doc.insertions.is_some() { " (with insertion table)" } else { "" }
    );
    Ok(doc)
}

/// A parsed `chr:start-end` locus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locus {
    pub chromosome: String,
    pub window: GenomicWindow,
}

impl std::fmt::Display for Locus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.window.start, self.window.end)
    }
}

impl std::str::FromStr for Locus {
    type Err = GenomeShaderError;

    fn from_str(s: &str) -> Result<Self> {
        parse_locus(s)
    }
}

/// Parse `chr:start-end` or `chr:pos`. Commas in numbers are ignored and a
/// single position expands by [`SINGLE_POSITION_FLANK`] on each side.
pub fn parse_locus(locus: &str) -> Result<Locus> {
    let cleaned: String = locus.trim().chars().filter(|c| *c != ',').collect();
    let (chromosome, range) = cleaned
        .rsplit_once(':')
        .ok_or_else(|| GenomeShaderError::invalid_locus(locus, "expected chr:start-end or chr:pos"))?;
    if chromosome.is_empty() {
        return Err(GenomeShaderError::invalid_locus(locus, "missing chromosome name"));
    }

    let number = |text: &str, what: &str| {
        text.trim()
            .parse::<u64>()
            .map_err(|_| GenomeShaderError::invalid_locus(locus, format!("{} '{}' is not a number", what, text)))
    };

    let window = match range.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (number(start, "start")?, number(end, "end")?);
            if end <= start {
                return Err(GenomeShaderError::invalid_locus(locus, "end must be greater than start"));
            }
            GenomicWindow::new(start, end)
        }
        None => {
            let pos = number(range, "position")?;
            GenomicWindow::new(pos.saturating_sub(SINGLE_POSITION_FLANK), pos + SINGLE_POSITION_FLANK)
        }
    };

    Ok(Locus {
        chromosome: chromosome.to_string(),
        window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariantId;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::Builder;

    const PAYLOAD: &str = r#"{
        "variants": [
            {"id": 1, "position": 100, "refAllele": "A", "altAlleles": ["AT"],
             "sampleGenotypes": {"s1": "0|1"}},
            {"id": 2, "position": 150, "refAllele": "C", "altAlleles": ["G"]}
        ],
        "insertions": [{"id": 1, "position": 100, "maxInsertionLength": 1}]
    }"#;

    #[test]
    fn parses_document_and_bare_array() {
        let doc = parse_variants(PAYLOAD, "inline").unwrap();
        assert_eq!(doc.variants.len(), 2);
        assert_eq!(doc.insertions.as_ref().map(Vec::len), Some(1));

        let bare = r#"[{"id": 5, "position": 1, "refAllele": "A"}]"#;
        let doc = parse_variants(bare, "inline").unwrap();
        assert_eq!(doc.variants[0].id, VariantId(5));
        assert!(doc.insertions.is_none());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let dup = r#"[{"id": 5, "position": 1, "refAllele": "A"}, {"id": 5, "position": 2, "refAllele": "C"}]"#;
        let err = parse_variants(dup, "dup.json").unwrap_err();
        assert!(matches!(err, GenomeShaderError::InvalidData { .. }));
        assert!(err.to_string().contains("duplicate variant id 5"));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(parse_variants("{not json", "x"), Err(GenomeShaderError::Json(_))));
    }

    #[test]
    fn loads_plain_and_gzipped_files() {
        let mut plain = Builder::new().suffix(".json").tempfile().unwrap();
        plain.write_all(PAYLOAD.as_bytes()).unwrap();
        let doc = load_variants(plain.path()).unwrap();
        assert_eq!(doc.variants.len(), 2);

        let gz = Builder::new().suffix(".json.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(gz.reopen().unwrap(), Compression::default());
        encoder.write_all(PAYLOAD.as_bytes()).unwrap();
        encoder.finish().unwrap();
        let zipped = load_variants(gz.path()).unwrap();
        assert_eq!(zipped, doc);
    }

    #[test]
    fn locus_forms() {
        let locus = parse_locus("chr6:31,972,046-32,055,647").unwrap();
        assert_eq!(locus.chromosome, "chr6");
        assert_eq!(locus.window, GenomicWindow::new(31_972_046, 32_055_647));
        assert_eq!(locus.to_string(), "chr6:31972046-32055647");

        let locus: Locus = "chrX:5000".parse().unwrap();
        assert_eq!(locus.window, GenomicWindow::new(4000, 6000));

        let locus = parse_locus("chr1:300").unwrap();
        assert_eq!(locus.window, GenomicWindow::new(0, 1300));
    }

    #[test]
    fn bad_loci_are_rejected() {
        for bad in ["chr1", ":100-200", "chr1:abc-200", "chr1:500-100", "chr1:10-x"] {
            assert!(
                matches!(parse_locus(bad), Err(GenomeShaderError::InvalidLocus { .. })),
                "{} should fail",
                bad
            );
        }
    }
}
