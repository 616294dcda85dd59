//! Assembler configuration.

use std::path::{Path, PathBuf};

/// Extension of ABCO source files. Import targets get it appended.
pub const EXTENSION: &str = "abcout";

/// Where imports resolve from and how the root source is named in
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory that the root file's `@import` targets resolve against.
    pub import_dir: PathBuf,
    /// Namespace of the root source in diagnostics.
    pub file_name: String,
}

impl Config {
    /// Configuration for assembling the file at `path`.
    pub fn for_file(path: &Path) -> Self {
        let import_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            import_dir,
            file_name,
        }
    }

    /// Path of the root source, used for import cycle detection.
    pub(crate) fn root_path(&self) -> PathBuf {
        self.import_dir.join(&self.file_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            import_dir: PathBuf::from("."),
            file_name: "[code]".to_string(),
        }
    }
}
