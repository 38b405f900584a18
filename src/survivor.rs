//! SURVIVOR simulation VCF normalization.
//!
//! SURVIVOR's simulated VCFs are not parseable by htslib as written: the
//! header lacks a sample column and two declarations, and every data line
//! carries a malformed per-sample FORMAT substring. The repair pass here
//! is deliberately a blind line-level substitution rather than a
//! structured parse: it exists for compatibility with that one writer's
//! quirks, and validating would mean special-casing every malformed token
//! the format produces.
//!
//! The second pass materializes REF/ALT sequences for the INS/DEL
//! placeholder records from the reference and the SURVIVOR insertions
//! FASTA, shifting every position into the padded coordinate frame.

use crate::faidx::FastaIndex;
use log::{debug, info, warn};
use noodles::bgzf;
use regex::Regex;
use rust_htslib::bcf::{self, Read};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use tempfile::NamedTempFile;

const LOWQUAL_FILTER_HEADER: &str = r#"##FILTER=<ID=LowQual,Description="Default. Manual">"#;
const PRECISE_INFO_HEADER: &str =
    r#"##INFO=<ID=PRECISE,Number=1,Type=Flag,Description="Some type of flag">"#;
const MALFORMED_FORMAT: &str = ":GL:GQ:FT:RC:DR:DV:RR:RV";

fn open_text_reader(path: &str) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)
        .map_err(|e| io::Error::other(format!("Failed to open VCF '{path}': {e}")))?;
    if [".gz", ".bgz"].iter().any(|ext| path.ends_with(ext)) {
        Ok(Box::new(BufReader::new(bgzf::io::Reader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Line-level repair pass. Returns the number of data lines seen.
///
/// Running this on already-repaired output is a no-op: the injected header
/// lines are only added when absent, and the sample column only when the
/// column header does not end with one.
fn repair_lines<R: BufRead, W: Write>(reader: R, mut writer: W) -> io::Result<usize> {
    let format_re = Regex::new(MALFORMED_FORMAT)
        .map_err(|e| io::Error::other(format!("Bad FORMAT pattern: {e}")))?;
    let lowqual_re = Regex::new("LowQual")
        .map_err(|e| io::Error::other(format!("Bad filter pattern: {e}")))?;

    let mut have_lowqual_filter = false;
    let mut have_precise_info = false;
    let mut n_entries = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with("##") {
            if line.starts_with("##FILTER=<ID=LowQual") {
                have_lowqual_filter = true;
            }
            if line.starts_with("##INFO=<ID=PRECISE") {
                have_precise_info = true;
            }
            writeln!(writer, "{line}")?;
            continue;
        }
        if line.starts_with("#CHROM") {
            if !have_lowqual_filter {
                writeln!(writer, "{LOWQUAL_FILTER_HEADER}")?;
            }
            if !have_precise_info {
                writeln!(writer, "{PRECISE_INFO_HEADER}")?;
            }
            let line = line.trim_end();
            if line.split('\t').next_back() == Some("SAMPLE") {
                writeln!(writer, "{line}")?;
            } else {
                writeln!(writer, "{line}\tSAMPLE")?;
            }
            continue;
        }
        n_entries += 1;
        let line = format_re.replace_all(&line, "");
        let line = lowqual_re.replace_all(&line, ".");
        writeln!(writer, "{line}")?;
    }

    Ok(n_entries)
}

/// Repair SURVIVOR VCF mistakes so the file is parseable by htslib.
/// Returns the temporary repaired file; it is removed on drop.
pub fn correct_survivor_vcf(in_vcf: &str) -> io::Result<NamedTempFile> {
    debug!("Correcting {in_vcf}");
    let reader = open_text_reader(in_vcf)?;
    let mut temp = tempfile::Builder::new()
        .prefix("svteaser.")
        .suffix(".vcf")
        .tempfile()?;

    let n_entries = {
        let mut writer = BufWriter::new(temp.as_file_mut());
        let n_entries = repair_lines(reader, &mut writer)?;
        writer.flush()?;
        n_entries
    };
    debug!("Corrected {n_entries} entries");

    Ok(temp)
}

fn insertion_alleles(anchor_base: &[u8], insertion: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut alt = Vec::with_capacity(anchor_base.len() + insertion.len());
    alt.extend_from_slice(anchor_base);
    alt.extend_from_slice(insertion);
    (anchor_base.to_vec(), alt)
}

fn deletion_alleles(deleted_slice: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (deleted_slice.to_vec(), deleted_slice[..1].to_vec())
}

fn read_svlen(record: &bcf::Record, id: &str) -> io::Result<usize> {
    let svlen = record
        .info(b"SVLEN")
        .integer()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to read SVLEN from record '{id}': {e}"),
            )
        })?
        .and_then(|values| values.first().copied())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("DEL record '{id}' is missing SVLEN"),
            )
        })?;

    if svlen <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("DEL record '{id}' has non-positive SVLEN {svlen}"),
        ));
    }
    Ok(svlen as usize)
}

/// Update a SURVIVOR VCF to carry real REF and ALT sequences.
///
/// A placeholder entry like
///
/// `chr1  10  INS001  N  <INS>  .  LowQual  SVLEN=10`
///
/// becomes a fully materialized record with the anchor base from `ref_fa`,
/// the inserted sequence from the SURVIVOR insertions FASTA (keyed by
/// `"{chrom}_{pos}"` with the original 1-based position), and the position
/// shifted by `pos_padding`. Records that are neither INS nor DEL (e.g.
/// inversions) are dropped and counted.
pub fn update_vcf(
    ref_fa: &str,
    insertions_fa: &str,
    survivor_vcf: &str,
    out_vcf: &str,
    pos_padding: usize,
) -> io::Result<()> {
    let repaired = correct_survivor_vcf(survivor_vcf)?;
    let reference = FastaIndex::open(ref_fa)?;
    // Sometimes there are no insertions; that only matters if an INS
    // record actually shows up
    let insertions = match FastaIndex::open(insertions_fa) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!("Insertions FASTA unavailable ({e}); INS records will be rejected");
            None
        }
    };

    let mut reader = bcf::Reader::from_path(repaired.path()).map_err(|e| {
        io::Error::other(format!(
            "Failed to open repaired VCF for '{survivor_vcf}': {e}"
        ))
    })?;
    let header = bcf::Header::from_template(reader.header());
    let mut writer = bcf::Writer::from_path(out_vcf, &header, true, bcf::Format::Vcf)
        .map_err(|e| io::Error::other(format!("Failed to create VCF '{out_vcf}': {e}")))?;

    let mut n_updated = 0usize;
    let mut n_dropped = 0usize;

    for result in reader.records() {
        let mut record = result
            .map_err(|e| io::Error::other(format!("Failed to read '{survivor_vcf}': {e}")))?;

        let rid = record.rid().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Record in '{survivor_vcf}' has no chromosome"),
            )
        })?;
        let chrom = String::from_utf8_lossy(
            record
                .header()
                .rid2name(rid)
                .map_err(|e| io::Error::other(format!("Unknown chromosome id {rid}: {e}")))?,
        )
        .into_owned();

        // VCF position is without padding; the reference position is the
        // VCF position shifted by the padding
        let vcf_pos = record.pos() as usize;
        let ref_pos = vcf_pos + pos_padding;
        let id = String::from_utf8_lossy(&record.id()).into_owned();

        let (ref_allele, alt_allele) = if id.starts_with("INS") {
            // Anchor base sits one past the padded position, matching the
            // coordinates SURVIVOR's insertions FASTA was built against
            let anchor_base = reference.fetch_sequence(&chrom, ref_pos + 1, ref_pos + 2)?;
            let insertions = insertions.as_ref().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "No insertions FASTA available ('{insertions_fa}') \
                         while processing INS record '{id}'"
                    ),
                )
            })?;
            let key = format!("{chrom}_{}", vcf_pos + 1);
            let insertion = insertions.fetch_full(&key)?;
            insertion_alleles(&anchor_base, &insertion)
        } else if id.starts_with("DEL") {
            let svlen = read_svlen(&record, &id)?;
            let deleted_slice = reference.fetch_sequence(&chrom, ref_pos, ref_pos + svlen + 1)?;
            if deleted_slice.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("DEL record '{id}' at {chrom}:{} is outside the reference", vcf_pos + 1),
                ));
            }
            deletion_alleles(&deleted_slice)
        } else {
            // Just in case inversions or something get through
            n_dropped += 1;
            continue;
        };

        writer.translate(&mut record);
        record
            .set_alleles(&[ref_allele.as_slice(), alt_allele.as_slice()])
            .map_err(|e| {
                io::Error::other(format!("Failed to set alleles on record '{id}': {e}"))
            })?;
        record.set_pos(ref_pos as i64);
        writer
            .write(&record)
            .map_err(|e| io::Error::other(format!("Failed to write VCF '{out_vcf}': {e}")))?;
        n_updated += 1;
    }

    info!("Updated {n_updated} entries, dropped {n_dropped} unsupported records");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURVIVOR_INPUT: &str = "\
##fileformat=VCFv4.2\n\
##INFO=<ID=SVLEN,Number=1,Type=Integer,Description=\"Length of the SV\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\n\
chr1\t10\tINS001\tN\t<INS>\t.\tLowQual\tSVLEN=10\tGT:GL:GQ:FT:RC:DR:DV:RR:RV\t./.\n\
chr1\t50\tDEL002\tN\t<DEL>\t.\tLowQual\tSVLEN=3\tGT:GL:GQ:FT:RC:DR:DV:RR:RV\t./.\n";

    fn repair_to_string(input: &str) -> (String, usize) {
        let mut out = Vec::new();
        let n = repair_lines(input.as_bytes(), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), n)
    }

    #[test]
    fn test_repair_removes_malformed_format_and_lowqual() {
        let (repaired, n_entries) = repair_to_string(SURVIVOR_INPUT);
        assert_eq!(n_entries, 2);
        assert!(!repaired.contains(MALFORMED_FORMAT));
        // Data-line LowQual becomes missing; the injected FILTER header
        // still declares it
        assert!(repaired.contains("chr1\t10\tINS001\tN\t<INS>\t.\t.\tSVLEN=10\tGT\t./.\n"));
        assert!(repaired.contains(LOWQUAL_FILTER_HEADER));
        assert!(repaired.contains(PRECISE_INFO_HEADER));
    }

    #[test]
    fn test_repair_appends_sample_column() {
        let (repaired, _) = repair_to_string(SURVIVOR_INPUT);
        let chrom_line = repaired
            .lines()
            .find(|line| line.starts_with("#CHROM"))
            .unwrap();
        assert!(chrom_line.ends_with("\tFORMAT\tSAMPLE"));
    }

    #[test]
    fn test_repair_injects_headers_before_column_line() {
        let (repaired, _) = repair_to_string(SURVIVOR_INPUT);
        let lines: Vec<&str> = repaired.lines().collect();
        let chrom_idx = lines.iter().position(|l| l.starts_with("#CHROM")).unwrap();
        assert!(lines[..chrom_idx].contains(&LOWQUAL_FILTER_HEADER));
        assert!(lines[..chrom_idx].contains(&PRECISE_INFO_HEADER));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let (once, n_once) = repair_to_string(SURVIVOR_INPUT);
        let (twice, n_twice) = repair_to_string(&once);
        assert_eq!(once, twice);
        assert_eq!(n_once, n_twice);
        // No duplicated injections
        assert_eq!(twice.matches(LOWQUAL_FILTER_HEADER).count(), 1);
        assert_eq!(twice.matches(PRECISE_INFO_HEADER).count(), 1);
        assert_eq!(twice.matches("\tSAMPLE").count(), 1);
    }

    #[test]
    fn test_insertion_alleles() {
        let (ref_allele, alt_allele) = insertion_alleles(b"A", b"TTTT");
        assert_eq!(ref_allele, b"A");
        assert_eq!(alt_allele, b"ATTTT");
    }

    #[test]
    fn test_deletion_alleles() {
        // svlen = 3 yields a 4-base slice; ALT keeps the leading base
        let (ref_allele, alt_allele) = deletion_alleles(b"GATC");
        assert_eq!(ref_allele, b"GATC");
        assert_eq!(alt_allele, b"G");
    }
}
