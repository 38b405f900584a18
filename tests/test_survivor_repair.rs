//! Integration test for the SURVIVOR repair pass: file in, temp file out,
//! and a second pass over the repaired output must change nothing.

use std::fs;
use std::io::Write;
use svteaser::survivor::correct_survivor_vcf;
use tempfile::TempDir;

const SURVIVOR_VCF: &str = "\
##fileformat=VCFv4.2\n\
##source=SURVIVOR\n\
##INFO=<ID=SVLEN,Number=1,Type=Integer,Description=\"Length of the SV\">\n\
##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type of the SV\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\n\
chr1\t1000\tINS001\tN\t<INS>\t.\tLowQual\tSVTYPE=INS;SVLEN=10\tGT:GL:GQ:FT:RC:DR:DV:RR:RV\t./.\n\
chr1\t5000\tDEL002\tN\t<DEL>\t.\tLowQual\tSVTYPE=DEL;SVLEN=25\tGT:GL:GQ:FT:RC:DR:DV:RR:RV\t./.\n\
chr2\t300\tINV003\tN\t<INV>\t.\tLowQual\tSVTYPE=INV;SVLEN=40\tGT:GL:GQ:FT:RC:DR:DV:RR:RV\t./.\n";

#[test]
fn test_repair_produces_parseable_layout() -> std::io::Result<()> {
    let dir = TempDir::new()?;
    let in_path = dir.path().join("survivor.vcf");
    let mut fh = fs::File::create(&in_path)?;
    fh.write_all(SURVIVOR_VCF.as_bytes())?;
    drop(fh);

    let repaired = correct_survivor_vcf(in_path.to_str().unwrap())?;
    let contents = fs::read_to_string(repaired.path())?;

    // Malformed per-sample FORMAT substring is gone from every data line
    assert!(!contents.contains(":GL:GQ:FT:RC:DR:DV:RR:RV"));
    // LowQual survives only in the injected FILTER declaration
    let data_lines: Vec<&str> = contents
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect();
    assert_eq!(data_lines.len(), 3);
    for line in &data_lines {
        assert!(!line.contains("LowQual"), "{line}");
        assert!(line.contains("\t.\tSVTYPE="), "{line}");
    }

    // The column header gained exactly one sample column, and the two
    // injected declarations come before it
    let lines: Vec<&str> = contents.lines().collect();
    let chrom_idx = lines
        .iter()
        .position(|line| line.starts_with("#CHROM"))
        .unwrap();
    assert!(lines[chrom_idx].ends_with("\tFORMAT\tSAMPLE"));
    assert!(lines[..chrom_idx]
        .iter()
        .any(|line| line.starts_with("##FILTER=<ID=LowQual")));
    assert!(lines[..chrom_idx]
        .iter()
        .any(|line| line.starts_with("##INFO=<ID=PRECISE")));

    Ok(())
}

#[test]
fn test_repair_twice_is_identity() -> std::io::Result<()> {
    let dir = TempDir::new()?;
    let in_path = dir.path().join("survivor.vcf");
    fs::write(&in_path, SURVIVOR_VCF)?;

    let once = correct_survivor_vcf(in_path.to_str().unwrap())?;
    let once_contents = fs::read_to_string(once.path())?;

    let twice = correct_survivor_vcf(once.path().to_str().unwrap())?;
    let twice_contents = fs::read_to_string(twice.path())?;

    assert_eq!(once_contents, twice_contents);
    Ok(())
}

#[test]
fn test_repaired_temp_file_is_cleaned_up() -> std::io::Result<()> {
    let dir = TempDir::new()?;
    let in_path = dir.path().join("survivor.vcf");
    fs::write(&in_path, SURVIVOR_VCF)?;

    let repaired = correct_survivor_vcf(in_path.to_str().unwrap())?;
    let temp_path = repaired.path().to_path_buf();
    assert!(temp_path.exists());
    drop(repaired);
    assert!(!temp_path.exists());
    Ok(())
}
