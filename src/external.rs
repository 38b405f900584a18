//! External tool invocation.
//!
//! Every third-party tool (vcf-sort, bgzip, tabix, art_illumina, gzip,
//! samtools) is run as an opaque synchronous subprocess. A non-zero exit
//! status is fatal to the invoking command; the captured stdout/stderr are
//! surfaced to the operator. There is no retry policy.

use log::debug;
use std::io;
use std::path::Path;
use std::process::Command;

pub struct CmdResult {
    pub ret_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdResult {
    pub fn success(&self) -> bool {
        self.ret_code == 0
    }
}

/// Run a shell command line and capture its exit status and output streams.
pub fn cmd_exe(cmd: &str) -> io::Result<CmdResult> {
    cmd_exe_impl(cmd, None)
}

/// Like [`cmd_exe`], but with the working directory set for the child.
pub fn cmd_exe_in(dir: &Path, cmd: &str) -> io::Result<CmdResult> {
    cmd_exe_impl(cmd, Some(dir))
}

fn cmd_exe_impl(cmd: &str, dir: Option<&Path>) -> io::Result<CmdResult> {
    debug!("Running: {cmd}");
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    let output = command
        .output()
        .map_err(|e| io::Error::other(format!("Failed to spawn '{cmd}': {e}")))?;

    Ok(CmdResult {
        // Killed-by-signal has no code; report it as failure
        ret_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Sort, bgzip-compress, and tabix-index a VCF file in place, producing
/// `{path}.gz` and `{path}.gz.tbi` next to it.
pub fn vcf_compress(path: &Path) -> io::Result<()> {
    let path = path.to_string_lossy();
    let ret = cmd_exe(&format!(
        "vcf-sort {path} | bgzip > {path}.gz && tabix {path}.gz"
    ))?;
    if !ret.success() {
        return Err(io::Error::other(format!(
            "Failed to sort/compress/index '{path}' (exit status {}): {}{}",
            ret.ret_code, ret.stdout, ret.stderr
        )));
    }
    Ok(())
}

/// Check for presence of gzip.
pub fn check_gzip() -> bool {
    cmd_exe("gzip --help").map_or(false, |ret| ret.success())
}

/// Check for presence of samtools.
pub fn check_samtools() -> bool {
    cmd_exe("samtools --help").map_or(false, |ret| ret.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_exe_captures_stdout() {
        let ret = cmd_exe("echo hello").unwrap();
        assert_eq!(ret.ret_code, 0);
        assert!(ret.success());
        assert_eq!(ret.stdout, "hello\n");
        assert_eq!(ret.stderr, "");
    }

    #[test]
    fn test_cmd_exe_captures_exit_status_and_stderr() {
        let ret = cmd_exe("echo oops >&2; exit 3").unwrap();
        assert_eq!(ret.ret_code, 3);
        assert!(!ret.success());
        assert_eq!(ret.stderr, "oops\n");
    }

    #[test]
    fn test_cmd_exe_in_runs_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), b"").unwrap();
        let ret = cmd_exe_in(dir.path(), "ls").unwrap();
        assert!(ret.success());
        assert!(ret.stdout.contains("marker"));
    }
}
