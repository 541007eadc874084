//! Source-tree discovery.
//!
//! Walks the configured source root for `.rs` files and derives each file's
//! module path from its location, following the standard layout: a file named
//! `billing.rs` contributes a `billing` segment, while `lib.rs`, `main.rs`,
//! and `mod.rs` speak for their containing directory. Hidden directories,
//! `target`, configured excludes, and the output root (when nested under the
//! source root) are skipped.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::WeaveConfig;
use crate::error::{WeaveError, WeaveResult};

/// One `.rs` file discovered under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceFile {
    /// Full path of the source file.
    pub path: PathBuf,
    /// Path relative to the source root; generated mirrors reuse it under
    /// the output root.
    pub relative: PathBuf,
    /// Module segments from the crate root to the file's own module.
    pub module_path: Vec<String>,
}

/// Discovers every weavable source file under the configured root.
///
/// Unreadable subdirectories are logged and skipped; only a missing or
/// unreadable root aborts the scan.
pub(crate) fn scan_sources(config: &WeaveConfig) -> WeaveResult<Vec<SourceFile>> {
    let root = &config.source_root;
    if !root.is_dir() {
        return Err(WeaveError::scan(root, "source root is not a directory"));
    }

    let output_root = absolute_or_self(&config.output_root);
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_type().is_dir() {
                !is_skipped_dir(entry.path(), config, &output_root)
            } else {
                true
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                let path = error.path().map(Path::to_path_buf).unwrap_or_default();
                tracing::warn!(path = %path.display(), error = %error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|_| WeaveError::scan(path, "file escapes the source root"))?
            .to_path_buf();
        let module_path = module_path_of(&relative);
        files.push(SourceFile {
            path: path.to_path_buf(),
            relative,
            module_path,
        });
    }

    Ok(files)
}

fn is_skipped_dir(path: &Path, config: &WeaveConfig, output_root: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    if name.starts_with('.') || name == "target" {
        return true;
    }
    if config.exclude.iter().any(|excluded| excluded == name) {
        return true;
    }
    // Never rescan our own output when it nests under the source root.
    absolute_or_self(path) == *output_root
}

fn absolute_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Derives the module segments a file contributes to its crate.
pub(crate) fn module_path_of(relative: &Path) -> Vec<String> {
    let mut segments: Vec<String> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    if let Some(stem) = relative.file_stem().and_then(|s| s.to_str()) {
        if !matches!(stem, "lib" | "main" | "mod") {
            segments.push(stem.to_string());
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "// empty\n").unwrap();
    }

    #[test]
    fn test_module_path_of_plain_file() {
        assert_eq!(
            module_path_of(Path::new("billing.rs")),
            vec!["billing".to_string()]
        );
    }

    #[test]
    fn test_module_path_of_nested_file() {
        assert_eq!(
            module_path_of(Path::new("api/billing.rs")),
            vec!["api".to_string(), "billing".to_string()]
        );
    }

    #[test]
    fn test_module_path_of_root_files() {
        assert!(module_path_of(Path::new("lib.rs")).is_empty());
        assert!(module_path_of(Path::new("main.rs")).is_empty());
        assert_eq!(
            module_path_of(Path::new("api/mod.rs")),
            vec!["api".to_string()]
        );
    }

    #[test]
    fn test_scan_finds_rs_files_and_derives_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        touch(&root.join("lib.rs"));
        touch(&root.join("billing.rs"));
        touch(&root.join("api/users.rs"));
        touch(&root.join("notes.txt"));

        let config = WeaveConfig::default()
            .with_source_root(&root)
            .with_output_root(dir.path().join("generated"));
        let files = scan_sources(&config).unwrap();

        let relatives: Vec<&Path> = files.iter().map(|f| f.relative.as_path()).collect();
        assert_eq!(files.len(), 3);
        assert!(relatives.contains(&Path::new("lib.rs")));
        assert!(relatives.contains(&Path::new("billing.rs")));
        assert!(relatives.contains(&Path::new("api/users.rs")));

        let users = files
            .iter()
            .find(|f| f.relative == Path::new("api/users.rs"))
            .unwrap();
        assert_eq!(users.module_path, vec!["api".to_string(), "users".to_string()]);
    }

    #[test]
    fn test_scan_skips_hidden_target_and_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        touch(&root.join("kept.rs"));
        touch(&root.join(".hidden/skipped.rs"));
        touch(&root.join("target/skipped.rs"));
        touch(&root.join("fixtures/skipped.rs"));

        let config = WeaveConfig::default()
            .with_source_root(&root)
            .with_output_root(dir.path().join("generated"))
            .with_exclude("fixtures");
        let files = scan_sources(&config).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, Path::new("kept.rs"));
    }

    #[test]
    fn test_scan_skips_nested_output_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        let output = root.join("generated");
        touch(&root.join("kept.rs"));
        touch(&output.join("mirror.rs"));

        let config = WeaveConfig::default()
            .with_source_root(&root)
            .with_output_root(&output);
        let files = scan_sources(&config).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, Path::new("kept.rs"));
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = WeaveConfig::default()
            .with_source_root(dir.path().join("absent"))
            .with_output_root(dir.path().join("generated"));
        let err = scan_sources(&config).unwrap_err();
        assert!(matches!(err, WeaveError::Scan { .. }));
    }
}
