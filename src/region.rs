//! Region naming
//!
//! An extracted region is identified by `"{chrom}_{start}_{end}"`, where
//! `start`/`end` are the 0-based half-open window bounds on the original
//! chromosome. The name is the only piece of a region that survives past
//! extraction (it becomes the chromosome field of downstream VCFs), so
//! encoding and decoding must round-trip exactly.
//!
//! Decoding splits from the right, so chromosome names that themselves
//! contain `_` (e.g. `chr17_KI270857v1_alt`) are handled without any
//! delimiter restriction: the last two fields are always the offsets.

use std::num::ParseIntError;

#[derive(Debug)]
pub enum RegionNameError {
    MissingFields(String),
    InvalidOffset(String, ParseIntError),
}

impl std::fmt::Display for RegionNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionNameError::MissingFields(name) => {
                write!(f, "'{name}' does not have the form chrom_start_end")
            }
            RegionNameError::InvalidOffset(name, e) => {
                write!(f, "'{name}' has a non-numeric offset field: {e}")
            }
        }
    }
}

impl std::error::Error for RegionNameError {}

/// Build a region name from a chromosome and its window bounds.
pub fn encode_region_name(chrom: &str, start: usize, end: usize) -> String {
    format!("{chrom}_{start}_{end}")
}

/// Parse a region name back into `(chromosome, start, end)`.
pub fn decode_region_name(name: &str) -> Result<(String, usize, usize), RegionNameError> {
    let mut fields = name.rsplitn(3, '_');
    let end_str = fields.next().unwrap_or("");
    let start_str = fields.next();
    let chrom = fields.next();

    let (chrom, start_str) = match (chrom, start_str) {
        (Some(chrom), Some(start_str)) if !chrom.is_empty() => (chrom, start_str),
        _ => return Err(RegionNameError::MissingFields(name.to_string())),
    };

    let start = start_str
        .parse::<usize>()
        .map_err(|e| RegionNameError::InvalidOffset(name.to_string(), e))?;
    let end = end_str
        .parse::<usize>()
        .map_err(|e| RegionNameError::InvalidOffset(name.to_string(), e))?;

    Ok((chrom.to_string(), start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for (chrom, start, end) in [
            ("chr1", 0, 10000),
            ("2", 123456, 133456),
            ("chrM", 0, 0),
        ] {
            let name = encode_region_name(chrom, start, end);
            assert_eq!(
                decode_region_name(&name).unwrap(),
                (chrom.to_string(), start, end)
            );
        }
    }

    #[test]
    fn test_round_trip_chrom_with_underscores() {
        let name = encode_region_name("chr17_KI270857v1_alt", 500, 10500);
        assert_eq!(name, "chr17_KI270857v1_alt_500_10500");
        assert_eq!(
            decode_region_name(&name).unwrap(),
            ("chr17_KI270857v1_alt".to_string(), 500, 10500)
        );
    }

    #[test]
    fn test_decode_rejects_plain_chromosome() {
        // A record from a non-region VCF fed in by mistake
        assert!(decode_region_name("chr1").is_err());
        assert!(decode_region_name("1_2").is_err());
    }

    #[test]
    fn test_decode_rejects_non_numeric_offsets() {
        assert!(decode_region_name("chr1_abc_500").is_err());
        assert!(decode_region_name("chr1_500_abc").is_err());
        // Both offsets numeric but chromosome empty
        assert!(decode_region_name("_5_7").is_err());
    }

    #[test]
    fn test_recalibration_reproduces_original_position() {
        // A variant at p with flank f maps to window [p - f, p + f) and
        // window-relative position p - start; adding the decoded start
        // must land back on p.
        let (p, flank, chrom_len) = (70200usize, 5000usize, 1_000_000usize);
        let start = p.saturating_sub(flank);
        let end = (p + flank).min(chrom_len);
        let name = encode_region_name("chr2", start, end);

        let (chrom, decoded_start, _) = decode_region_name(&name).unwrap();
        let local = p - start;
        assert_eq!(chrom, "chr2");
        assert_eq!(decoded_start + local, p);
    }
}
