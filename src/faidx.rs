//! Random access to an indexed FASTA file.
//!
//! Wraps rust-htslib's faidx reader and keeps the `.fai` catalogue
//! (sequence names in declared order, plus lengths) in memory so callers
//! can enumerate contigs and size windows without touching the file.

use rust_htslib::faidx;
use rustc_hash::FxHashMap;
use std::io;

pub struct FastaIndex {
    path: String,
    reader: faidx::Reader,
    // names in .fai order; lengths keyed by name
    names: Vec<String>,
    lengths: FxHashMap<String, usize>,
}

impl FastaIndex {
    /// Open an indexed FASTA file. The `.fai` index is created on first use
    /// if it does not exist yet.
    pub fn open(path: &str) -> io::Result<Self> {
        let reader = faidx::Reader::from_path(path)
            .map_err(|e| io::Error::other(format!("Failed to open FASTA file '{path}': {e}")))?;

        // Opening the reader guarantees the .fai exists; parse it for the
        // ordered catalogue of sequence names and lengths.
        let fai_path = format!("{path}.fai");
        let fai_content = std::fs::read_to_string(&fai_path).map_err(|e| {
            io::Error::other(format!("Failed to read FASTA index '{fai_path}': {e}"))
        })?;

        let mut names = Vec::new();
        let mut lengths = FxHashMap::default();
        for line in fai_content.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 || fields[0].is_empty() {
                continue;
            }
            let length = fields[1].parse::<usize>().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Invalid length for sequence '{}' in '{fai_path}': {e}",
                        fields[0]
                    ),
                )
            })?;
            names.push(fields[0].to_string());
            lengths.insert(fields[0].to_string(), length);
        }

        Ok(FastaIndex {
            path: path.to_string(),
            reader,
            names,
            lengths,
        })
    }

    /// Sequence names and lengths in the order they appear in the `.fai`.
    pub fn sequences(&self) -> impl Iterator<Item = (&str, usize)> {
        self.names
            .iter()
            .map(|name| (name.as_str(), self.lengths[name]))
    }

    pub fn sequence_length(&self, seq_name: &str) -> io::Result<usize> {
        self.lengths.get(seq_name).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("Sequence '{}' not found in '{}'", seq_name, self.path),
            )
        })
    }

    /// Fetch `[start, end)` (0-based half-open) of a named sequence,
    /// uppercased. An empty range yields an empty vector.
    pub fn fetch_sequence(&self, seq_name: &str, start: usize, end: usize) -> io::Result<Vec<u8>> {
        // Ensure the name is known before asking htslib, so "unknown
        // sequence" and "bad range" surface as distinct errors.
        self.sequence_length(seq_name)?;

        if end <= start {
            return Ok(Vec::new());
        }

        // rust-htslib's fetch_seq expects a 0-based inclusive end coordinate
        let seq_vec = match self.reader.fetch_seq(seq_name, start, end - 1) {
            Ok(seq) => {
                let mut seq_vec = seq.to_vec();
                unsafe { libc::free(seq.as_ptr() as *mut std::ffi::c_void) }; // Free up memory to avoid memory leak (bug https://github.com/rust-bio/rust-htslib/issues/401#issuecomment-1704290171)
                seq_vec
                    .iter_mut()
                    .for_each(|byte| *byte = byte.to_ascii_uppercase());
                seq_vec
            }
            Err(e) => {
                return Err(io::Error::other(format!(
                    "Failed to fetch {seq_name}:{start}-{end} from '{}': {e}",
                    self.path
                )))
            }
        };

        Ok(seq_vec)
    }

    /// Fetch the full sequence for a name.
    pub fn fetch_full(&self, seq_name: &str) -> io::Result<Vec<u8>> {
        let length = self.sequence_length(seq_name)?;
        self.fetch_sequence(seq_name, 0, length)
    }
}

impl std::fmt::Debug for FastaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastaIndex")
            .field("path", &self.path)
            .field("sequences", &self.names.len())
            .finish()
    }
}
