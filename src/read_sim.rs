//! art_illumina read simulation over an altered reference.
//!
//! Thin wrapper: the simulator is an external tool and a non-zero exit is
//! fatal with its output surfaced. FASTQ compression and SAM-to-BAM
//! conversion afterwards are best-effort.

use crate::external::{check_gzip, check_samtools, cmd_exe, cmd_exe_in};
use crate::known_sv::ALTERED_FASTA_NAME;
use log::{error, info};
use std::io;
use std::path::Path;

pub struct ArtParams {
    pub coverage: u32,
    pub read_len: u32,
    pub mean_frag: u32,
    pub insert_sd: u32,
    pub instrument: String,
}

/// Run art_illumina against `svteaser.altered.fa` in a simulation working
/// directory, writing into a parameter-stamped subdirectory.
pub fn sim_reads_art(workdir: &Path, params: &ArtParams) -> io::Result<()> {
    let ret = cmd_exe("which art_illumina")?;
    if !ret.success() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Cannot find art_illumina executable in the environment",
        ));
    }

    // Parameter-stamped, so reruns on the same altered reference with
    // different settings land side by side
    let outdir_name = format!(
        "sim_reads_{}_{}_{}_{}_{}",
        params.coverage, params.read_len, params.mean_frag, params.insert_sd, params.instrument
    );
    std::fs::create_dir(workdir.join(&outdir_name)).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "Output directory {} already exists",
                    workdir.join(&outdir_name).display()
                ),
            )
        } else {
            e
        }
    })?;

    let out_path = format!("{outdir_name}/art_illumina.simReads");
    let ret = cmd_exe_in(
        workdir,
        &format!(
            "art_illumina -ss {} -sam -na -i {ALTERED_FASTA_NAME} -p \
             -l {} -m {} -s {} -f {} -o {out_path}",
            params.instrument, params.read_len, params.mean_frag, params.insert_sd, params.coverage
        ),
    )?;
    if !ret.success() {
        error!("Problem running art_illumina");
        error!("{}", ret.stderr);
        error!("{}", ret.stdout);
        return Err(io::Error::other(format!(
            "art_illumina failed with exit status {}",
            ret.ret_code
        )));
    }

    // Optionally compress the FASTQs
    if check_gzip() {
        for mate in ["1", "2"] {
            let ret = cmd_exe_in(workdir, &format!("gzip {out_path}{mate}.fq"))?;
            if !ret.success() {
                info!("Could not compress {out_path}{mate}.fq");
            }
        }
    }

    if check_samtools() {
        let ret = cmd_exe_in(
            workdir,
            &format!("samtools view -S -b {out_path}.sam > {out_path}.bam"),
        )?;
        if ret.success() {
            std::fs::remove_file(workdir.join(format!("{out_path}.sam")))?;
        } else {
            info!("Could not convert {out_path}.sam to BAM");
        }
    }

    Ok(())
}
