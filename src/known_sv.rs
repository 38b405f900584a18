//! Region extraction for known-SV simulation.
//!
//! Walks a sorted VCF of known SVs against an indexed reference and, for
//! every variant within the size limit, carves a fixed-size window of
//! reference around it: the unaltered window goes to `svteaser.ref.fa`,
//! the window with the variant spliced in goes to `svteaser.altered.fa`,
//! and the retained records (still in original genome coordinates) go to
//! `svteaser.sim.vcf.gz`. The window name encodes `(chrom, start, end)`
//! so downstream region-relative VCFs can be recalibrated back (see
//! `region` and `recalibrate`).

use crate::external::vcf_compress;
use crate::faidx::FastaIndex;
use crate::region::encode_region_name;
use log::{debug, info};
use rust_htslib::bcf::{self, Read};
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const REF_FASTA_NAME: &str = "svteaser.ref.fa";
pub const ALTERED_FASTA_NAME: &str = "svteaser.altered.fa";
pub const SIM_VCF_NAME: &str = "svteaser.sim.vcf";

/// Reference sequence for the chromosome currently being processed.
/// Replaced wholesale on every chromosome transition; the input stream
/// must be sorted by chromosome for this to be valid, which the caller
/// checks with a seen-set.
struct ChromCursor {
    name: String,
    seq: Vec<u8>,
}

impl ChromCursor {
    fn load(reference: &FastaIndex, name: &str) -> io::Result<Self> {
        debug!("Load new chrom {name}");
        Ok(ChromCursor {
            name: name.to_string(),
            seq: reference.fetch_full(name)?,
        })
    }
}

/// Check that the region length leaves room for the largest variant plus
/// the required padding on each side, returning the flank size.
/// The error states the minimal corrective change in either direction.
pub fn validate_region_config(
    region_size: usize,
    max_sv_size: usize,
    padding: usize,
) -> io::Result<usize> {
    let flank_size = region_size / 2;
    if (flank_size as i64) - (max_sv_size as i64) < padding as i64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Max SV size and required padding are not compatible. \
                 Increase region size by {} or decrease max SV size to {}.",
                2 * (padding as i64 + max_sv_size as i64 - flank_size as i64),
                flank_size as i64 - padding as i64
            ),
        ));
    }
    Ok(flank_size)
}

/// A variant qualifies for spiking when the length difference between its
/// alleles fits the configured maximum.
fn within_sv_size_limit(ref_len: usize, alt_len: usize, max_sv_size: usize) -> bool {
    alt_len.abs_diff(ref_len) <= max_sv_size
}

/// Window bounds for a variant at `pos`, clamped to the chromosome.
fn window_bounds(pos: usize, flank_size: usize, chrom_len: usize) -> (usize, usize) {
    let start = pos.saturating_sub(flank_size);
    let end = (pos + flank_size).min(chrom_len);
    (start, end)
}

/// Splice an alternate allele into a reference window at `relative_pos`.
/// A REF allele running past the window edge contributes nothing beyond it.
fn splice(window: &[u8], relative_pos: usize, ref_len: usize, alt: &[u8]) -> Vec<u8> {
    let tail_start = (relative_pos + ref_len).min(window.len());
    let mut altered = Vec::with_capacity(window.len() - (tail_start - relative_pos) + alt.len());
    altered.extend_from_slice(&window[..relative_pos]);
    altered.extend_from_slice(alt);
    altered.extend_from_slice(&window[tail_start..]);
    altered
}

fn write_fasta_entry<W: Write>(writer: &mut W, name: &str, seq: &[u8]) -> io::Result<()> {
    writeln!(writer, ">{name}")?;
    writer.write_all(seq)?;
    writeln!(writer)?;
    Ok(())
}

/// Spike known SVs into per-variant reference windows.
///
/// Validates the region/SV-size/padding configuration before creating the
/// output directory, then makes a single pass over the (chromosome-sorted)
/// VCF and writes the three output artifacts into `outdir`.
pub fn generate_altered_regions(
    ref_file: &str,
    sv_vcf: &str,
    outdir: &Path,
    region_size: usize,
    max_sv_size: usize,
    padding: usize,
) -> io::Result<()> {
    info!("Region size = {region_size}, Max SV Size = {max_sv_size}, Padding = {padding}");

    // Number of bases to flank on either side of a variant; checked before
    // any output exists
    let flank_size = validate_region_config(region_size, max_sv_size, padding)?;

    let reference = FastaIndex::open(ref_file)?;

    let mut sv = bcf::Reader::from_path(sv_vcf)
        .map_err(|e| io::Error::other(format!("Failed to open VCF '{sv_vcf}': {e}")))?;

    debug!("Making outdir {}", outdir.display());
    std::fs::create_dir(outdir).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Output directory {} already exists", outdir.display()),
            )
        } else {
            e
        }
    })?;

    let mut out_ref = BufWriter::new(File::create(outdir.join(REF_FASTA_NAME))?);
    let mut out_altered = BufWriter::new(File::create(outdir.join(ALTERED_FASTA_NAME))?);

    let mut cursor: Option<ChromCursor> = None;
    let mut finished_chroms: FxHashSet<String> = FxHashSet::default();
    let mut named_regions: FxHashSet<String> = FxHashSet::default();
    let mut contig_lines: Vec<String> = Vec::new();
    let mut records: Vec<bcf::Record> = Vec::new();
    let mut n_seen = 0usize;

    for result in sv.records() {
        let record =
            result.map_err(|e| io::Error::other(format!("Failed to read '{sv_vcf}': {e}")))?;
        n_seen += 1;

        let rid = record.rid().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Record {n_seen} in '{sv_vcf}' has no chromosome"),
            )
        })?;
        let chrom = String::from_utf8_lossy(
            record
                .header()
                .rid2name(rid)
                .map_err(|e| io::Error::other(format!("Unknown chromosome id {rid}: {e}")))?,
        )
        .into_owned();

        if cursor.as_ref().map(|c| c.name.as_str()) != Some(chrom.as_str()) {
            if let Some(previous) = cursor.take() {
                finished_chroms.insert(previous.name);
            }
            if finished_chroms.contains(&chrom) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "'{sv_vcf}' is not sorted by chromosome: \
                         '{chrom}' reappears after records for another chromosome"
                    ),
                ));
            }
            cursor = Some(ChromCursor::load(&reference, &chrom)?);
        }
        let chrom_seq = &cursor.as_ref().unwrap().seq;

        let pos = record.pos() as usize;
        let (ref_len, alt) = {
            let alleles = record.alleles();
            if alleles.len() != 2 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Cannot process multi-allelic entry at {chrom}:{} in '{sv_vcf}' \
                         (expected exactly one ALT allele, found {})",
                        pos + 1,
                        alleles.len().saturating_sub(1)
                    ),
                ));
            }
            (alleles[0].len(), alleles[1].to_vec())
        };

        if !within_sv_size_limit(ref_len, alt.len(), max_sv_size) {
            debug!("Skip variations longer than {max_sv_size}");
            continue;
        }

        if pos >= chrom_seq.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Variant position {} is beyond the end of {chrom} (length {})",
                    pos + 1,
                    chrom_seq.len()
                ),
            ));
        }

        let (start, end) = window_bounds(pos, flank_size, chrom_seq.len());
        let window = &chrom_seq[start..end];
        let relative_pos = pos - start;
        let altered = splice(window, relative_pos, ref_len, &alt);

        let region_name = encode_region_name(&chrom, start, end);
        if named_regions.insert(region_name.clone()) {
            contig_lines.push(format!(
                "##contig=<ID={region_name},length={}>",
                window.len()
            ));
        }

        write_fasta_entry(&mut out_ref, &region_name, window)?;
        write_fasta_entry(&mut out_altered, &region_name, &altered)?;

        // The record is kept in the original coordinate frame, not the
        // region's; recalibration only applies to region-relative VCFs.
        records.push(record);
    }

    out_ref.flush()?;
    out_altered.flush()?;

    info!("Retained {} of {} records", records.len(), n_seen);

    let mut header = bcf::Header::from_template(sv.header());
    for line in &contig_lines {
        header.push_record(line.as_bytes());
    }

    let out_vcf_path = outdir.join(SIM_VCF_NAME);
    {
        let mut writer = bcf::Writer::from_path(&out_vcf_path, &header, true, bcf::Format::Vcf)
            .map_err(|e| {
                io::Error::other(format!(
                    "Failed to create VCF '{}': {e}",
                    out_vcf_path.display()
                ))
            })?;
        for mut record in records {
            writer.translate(&mut record);
            writer.write(&record).map_err(|e| {
                io::Error::other(format!(
                    "Failed to write VCF '{}': {e}",
                    out_vcf_path.display()
                ))
            })?;
        }
    }

    vcf_compress(&out_vcf_path)
}
