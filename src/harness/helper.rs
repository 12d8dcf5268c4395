//! The asserting helper program
//!
//! The C source ships inside the binary so a run never depends on the
//! current directory. It is compiled into a fresh temporary directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command as TokioCommand;

use crate::common::config::HelperConfig;
use crate::common::{Error, Result};

/// Source of the helper program
pub const HELPER_SOURCE: &str = include_str!("../../helper/main.c");

/// Comment that marks the assertion call in [`HELPER_SOURCE`]
pub const ASSERT_MARKER: &str = "// Assert here.";

pub const SOURCE_NAME: &str = "main.c";
pub const EXECUTABLE_NAME: &str = "a.out";

/// Compilers tried in order when none is configured
const COMPILER_CANDIDATES: &[&str] = &["cc", "clang", "gcc"];

enum HelperDir {
    Temp(TempDir),
    Kept(PathBuf),
}

/// A built helper: executable, source and the assertion line
pub struct HelperProgram {
    dir: HelperDir,
    executable: PathBuf,
    source: PathBuf,
    assert_line: u32,
    /// Compiler family ("clang", "gcc"); unknown for prebuilt helpers
    compiler: Option<String>,
}

impl HelperProgram {
    /// Write the helper source to a temporary directory and compile it
    ///
    /// With `keep`, the directory survives the run and its path is logged.
    pub async fn build(config: &HelperConfig, keep: bool) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("inferior-assert-")
            .tempdir()?;
        let source = temp.path().join(SOURCE_NAME);
        let executable = temp.path().join(EXECUTABLE_NAME);
        std::fs::write(&source, HELPER_SOURCE)?;

        let compiler = match &config.compiler {
            Some(path) => path.clone(),
            None => find_compiler()?,
        };

        tracing::info!(
            compiler = %compiler.display(),
            cflags = ?config.cflags,
            dir = %temp.path().display(),
            "Building helper program"
        );
        let output = TokioCommand::new(&compiler)
            .args(&config.cflags)
            .arg("-o")
            .arg(&executable)
            .arg(&source)
            .current_dir(temp.path())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::HelperBuild(format!("failed to run {}: {}", compiler.display(), e))
            })?;

        if !output.status.success() {
            return Err(Error::HelperBuild(format!(
                "{} exited with {}:\n{}",
                compiler.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let assert_line = line_number(&source, ASSERT_MARKER)?;
        let dir = if keep {
            let path = temp.keep();
            tracing::info!(dir = %path.display(), "Keeping helper build directory");
            HelperDir::Kept(path)
        } else {
            HelperDir::Temp(temp)
        };

        Ok(Self {
            dir,
            executable,
            source,
            assert_line,
            compiler: Some(compiler_family(&compiler)),
        })
    }

    /// Use a helper that was built elsewhere
    ///
    /// `dir` must contain `a.out` and the `main.c` it was built from.
    pub fn prebuilt(dir: &Path) -> Result<Self> {
        let executable = dir.join(EXECUTABLE_NAME);
        let source = dir.join(SOURCE_NAME);
        if !executable.is_file() {
            return Err(Error::HelperBuild(format!(
                "no {} in {}",
                EXECUTABLE_NAME,
                dir.display()
            )));
        }
        let assert_line = line_number(&source, ASSERT_MARKER)?;

        Ok(Self {
            dir: HelperDir::Kept(dir.to_path_buf()),
            executable,
            source,
            assert_line,
            compiler: None,
        })
    }

    /// Directory holding the executable; the helper runs with it as cwd
    pub fn dir(&self) -> &Path {
        match &self.dir {
            HelperDir::Temp(temp) => temp.path(),
            HelperDir::Kept(path) => path,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// 1-based line of the assertion call
    pub fn assert_line(&self) -> u32 {
        self.assert_line
    }

    /// Family of the compiler that built the helper, when known
    pub fn compiler(&self) -> Option<&str> {
        self.compiler.as_deref()
    }

    /// `main.c:<line>` as backtraces print it
    pub fn assert_location(&self) -> String {
        let file = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| SOURCE_NAME.to_string());
        format!("{}:{}", file, self.assert_line)
    }

    /// Run the helper outside the debugger and check that it dies of SIGABRT
    #[cfg(unix)]
    pub async fn verify_aborts(&self) -> Result<()> {
        use std::os::unix::process::ExitStatusExt;

        let status = TokioCommand::new(&self.executable)
            .current_dir(self.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if status.signal() == Some(libc::SIGABRT) {
            tracing::debug!("Helper aborts natively");
            Ok(())
        } else {
            Err(Error::HelperBuild(format!(
                "helper should die of SIGABRT, but ended with {}",
                status
            )))
        }
    }
}

fn find_compiler() -> Result<PathBuf> {
    COMPILER_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            Error::HelperBuild(format!(
                "no C compiler found (tried {})",
                COMPILER_CANDIDATES.join(", ")
            ))
        })
}

/// Family name of a compiler executable
///
/// Symlinks are followed, so `cc` reports what it really is.
pub fn compiler_family(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.contains("clang") {
        "clang".to_string()
    } else if name.contains("gcc") {
        "gcc".to_string()
    } else {
        name
    }
}

/// 1-based number of the first line containing `marker`
pub fn find_marker_line(content: &str, marker: &str) -> Option<u32> {
    content
        .lines()
        .position(|line| line.contains(marker))
        .map(|index| index as u32 + 1)
}

/// [`find_marker_line`] on a file
pub fn line_number(path: &Path, marker: &str) -> Result<u32> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    find_marker_line(&content, marker).ok_or_else(|| Error::MarkerNotFound {
        marker: marker.to_string(),
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_source_has_marker_and_names() {
        let line = find_marker_line(HELPER_SOURCE, ASSERT_MARKER).unwrap();
        let text = HELPER_SOURCE.lines().nth(line as usize - 1).unwrap();
        assert!(text.contains("assert(null_ptr)"));

        for name in ["argc", "argv", "hello_world", "null_ptr", "Hello"] {
            assert!(HELPER_SOURCE.contains(name), "helper source lacks {}", name);
        }
    }

    #[test]
    fn test_marker_line_is_one_based() {
        assert_eq!(find_marker_line("a\nb // here\nc", "// here"), Some(2));
        assert_eq!(find_marker_line("a\nb", "// here"), None);
    }

    #[test]
    fn test_prebuilt_reports_missing_marker() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(EXECUTABLE_NAME), b"").unwrap();
        std::fs::write(dir.path().join(SOURCE_NAME), "int main() {}\n").unwrap();

        assert!(matches!(
            HelperProgram::prebuilt(dir.path()),
            Err(Error::MarkerNotFound { .. })
        ));
    }

    #[test]
    fn test_prebuilt_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(EXECUTABLE_NAME), b"").unwrap();
        std::fs::write(dir.path().join(SOURCE_NAME), HELPER_SOURCE).unwrap();

        let helper = HelperProgram::prebuilt(dir.path()).unwrap();
        assert_eq!(helper.assert_line(), 10);
        assert_eq!(helper.assert_location(), "main.c:10");
        assert_eq!(helper.dir(), dir.path());
        assert_eq!(helper.compiler(), None);
    }

    #[test]
    fn test_compiler_family() {
        assert_eq!(compiler_family(Path::new("/no/such/dir/x86_64-linux-gnu-gcc-13")), "gcc");
        assert_eq!(compiler_family(Path::new("/no/such/dir/clang-17")), "clang");
        assert_eq!(compiler_family(Path::new("/no/such/dir/tcc")), "tcc");
    }

    #[cfg(unix)]
    #[test]
    fn test_compiler_family_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("gcc-12");
        std::fs::write(&real, b"").unwrap();
        let cc = dir.path().join("cc");
        std::os::unix::fs::symlink(&real, &cc).unwrap();

        assert_eq!(compiler_family(&cc), "gcc");
    }
}
