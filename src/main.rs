use clap::Parser;
use log::info;
use std::io;
use std::path::PathBuf;
use svteaser::faidx::FastaIndex;
use svteaser::known_sv::generate_altered_regions;
use svteaser::read_sim::{sim_reads_art, ArtParams};
use svteaser::recalibrate::recalibrate_vcf;
use svteaser::survivor::update_vcf;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// SV read simulation for rapid benchmarking
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Create genome regions from a VCF of known SVs
    KnownSv {
        #[clap(flatten)]
        common: CommonOpts,

        /// Reference file over which to simulate SVs
        #[clap(value_name = "REF")]
        reference: String,

        /// VCF with known SVs to simulate. MUST BE SORTED by chromosome.
        #[clap(value_name = "SV_VCF")]
        sv_vcf: String,

        /// Output basename; results land in `<OUT>.svt/`
        #[clap(value_name = "OUT")]
        output: String,

        /// The length of regions to create
        #[clap(long, value_parser, default_value_t = 10000)]
        len_sv_region: usize,

        /// Max length of variations to spike
        #[clap(long, value_parser, default_value_t = 4000)]
        max_sv_size: usize,

        /// Padded region around each end of a region where variations are spiked
        #[clap(long, value_parser, default_value_t = 800)]
        ref_seq_padding: usize,
    },
    /// Re-calibrate a region-relative VCF back into reference coordinates
    Recalibrate {
        #[clap(flatten)]
        common: CommonOpts,

        /// Reference fasta file (for output contig lengths)
        #[clap(short = 'r', long, value_parser)]
        reference_fasta: String,

        /// VCF whose chromosome fields are region names
        #[clap(short = 'i', long, value_parser)]
        input_vcf: String,

        /// Output path of the recalibrated VCF
        #[clap(short = 'o', long, value_parser)]
        output_vcf: String,
    },
    /// Add REF and ALT sequences to a SURVIVOR simulation VCF
    SurvVcfFmt {
        #[clap(flatten)]
        common: CommonOpts,

        /// Reference fasta file
        #[clap(short = 'r', long, value_parser)]
        reference_fasta: String,

        /// Insertions fasta file from SURVIVOR
        #[clap(short = 'i', long, value_parser)]
        survivor_insertions_fasta: String,

        /// VCF file from SURVIVOR
        #[clap(short = 's', long, value_parser)]
        survivor_vcf_file: String,

        /// Output path of edited VCF
        #[clap(short = 'o', long, value_parser)]
        output_vcf: String,

        /// Padding applied to each record's start position
        #[clap(long, value_parser, default_value_t = 0)]
        pos_padding: usize,
    },
    /// Run read simulators
    SimReads {
        #[clap(flatten)]
        common: CommonOpts,

        /// SVTeaser working directory (an `<OUT>.svt` from known-sv)
        #[clap(value_name = "DIR")]
        workdir: PathBuf,

        /// Depth of coverage to simulate
        #[clap(long, value_parser, default_value_t = 30)]
        coverage: u32,

        /// Simulated read length
        #[clap(long, value_parser, default_value_t = 150)]
        read_len: u32,

        /// Mean insert fragment length
        #[clap(long, value_parser, default_value_t = 400)]
        mean_frag: u32,

        /// Insert fragment length standard deviation
        #[clap(long, value_parser, default_value_t = 50)]
        insert_sd: u32,

        /// Sequencing instrument
        #[clap(long, value_parser, default_value = "HS25")]
        seq_inst: String,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::KnownSv {
            common,
            reference,
            sv_vcf,
            output,
            len_sv_region,
            max_sv_size,
            ref_seq_padding,
        } => {
            init_logging(&common);
            let outdir = PathBuf::from(format!("{output}.svt"));
            generate_altered_regions(
                &reference,
                &sv_vcf,
                &outdir,
                len_sv_region,
                max_sv_size,
                ref_seq_padding,
            )?;
            info!("Finished");
        }
        Args::Recalibrate {
            common,
            reference_fasta,
            input_vcf,
            output_vcf,
        } => {
            init_logging(&common);
            let reference = FastaIndex::open(&reference_fasta)?;
            recalibrate_vcf(&reference, &input_vcf, &output_vcf)?;
            info!("Finished");
        }
        Args::SurvVcfFmt {
            common,
            reference_fasta,
            survivor_insertions_fasta,
            survivor_vcf_file,
            output_vcf,
            pos_padding,
        } => {
            init_logging(&common);
            update_vcf(
                &reference_fasta,
                &survivor_insertions_fasta,
                &survivor_vcf_file,
                &output_vcf,
                pos_padding,
            )?;
            info!("Finished");
        }
        Args::SimReads {
            common,
            workdir,
            coverage,
            read_len,
            mean_frag,
            insert_sd,
            seq_inst,
        } => {
            init_logging(&common);
            sim_reads_art(
                &workdir,
                &ArtParams {
                    coverage,
                    read_len,
                    mean_frag,
                    insert_sd,
                    instrument: seq_inst,
                },
            )?;
            info!("Finished");
        }
    }

    Ok(())
}

/// Initialize logger based on verbosity
fn init_logging(common: &CommonOpts) {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();
}
