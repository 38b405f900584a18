//! Coordinate recalibration.
//!
//! VCFs produced against extracted regions carry region names in their
//! chromosome field and positions local to the region. Recalibration
//! rewrites each record back into original genome coordinates: the region
//! name decodes to `(chrom, start, end)` and the global position is
//! `start + local_position`. This is the exact left inverse of the
//! encoding done during extraction.

use crate::faidx::FastaIndex;
use crate::region::decode_region_name;
use log::info;
use rust_htslib::bcf::{self, Read};
use std::io;

/// Rewrite region-relative records into original reference coordinates.
/// The reference is only used to declare contig lengths in the output
/// header; sequence data is never touched.
pub fn recalibrate_vcf(reference: &FastaIndex, orig_vcf: &str, out_vcf: &str) -> io::Result<()> {
    let mut reader = bcf::Reader::from_path(orig_vcf)
        .map_err(|e| io::Error::other(format!("Failed to open VCF '{orig_vcf}': {e}")))?;

    let mut header = bcf::Header::from_template(reader.header());
    for (chrom, length) in reference.sequences() {
        header.push_record(format!("##contig=<ID={chrom},length={length}>").as_bytes());
    }

    let mut writer = bcf::Writer::from_path(out_vcf, &header, true, bcf::Format::Vcf)
        .map_err(|e| io::Error::other(format!("Failed to create VCF '{out_vcf}': {e}")))?;

    let mut n_records = 0usize;
    for result in reader.records() {
        let mut record =
            result.map_err(|e| io::Error::other(format!("Failed to read '{orig_vcf}': {e}")))?;

        let rid = record.rid().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Record in '{orig_vcf}' has no chromosome"),
            )
        })?;
        let region = String::from_utf8_lossy(
            record
                .header()
                .rid2name(rid)
                .map_err(|e| io::Error::other(format!("Unknown chromosome id {rid}: {e}")))?,
        )
        .into_owned();

        // A chromosome field that is not a region name means a non-region
        // VCF was fed in by mistake; surface it rather than pass it through
        let (chrom, start, _end) = decode_region_name(&region).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Chromosome field in '{orig_vcf}' is not a region name: {e}"),
            )
        })?;

        let global_pos = start as i64 + record.pos();

        writer.translate(&mut record);
        let new_rid = writer.header().name2rid(chrom.as_bytes()).map_err(|e| {
            io::Error::other(format!(
                "Region '{region}' names chromosome '{chrom}' which is not in the output header: {e}"
            ))
        })?;
        record.set_rid(Some(new_rid));
        record.set_pos(global_pos);

        writer
            .write(&record)
            .map_err(|e| io::Error::other(format!("Failed to write VCF '{out_vcf}': {e}")))?;
        n_records += 1;
    }

    info!("Recalibrated {n_records} records");
    Ok(())
}
