//! # Arachne Weave
//!
//! Build-time weaver for the Arachne method-interception engine.
//!
//! A weave pass scans a source tree for methods carrying
//! `#[intercept(...)]` or `#[transactional]` bindings and rewrites each one
//! into an outer dispatch stub plus a renamed inner copy of the original
//! body. The pass writes one generated mirror file per rewritten unit under
//! the output root, plus a single aggregated registry module holding every
//! chain descriptor and the generated invoker thunks.
//!
//! The pass is best-effort per file: a source file that fails to parse, or a
//! method that cannot be woven, is recorded on the [`WeaveReport`] and the
//! rest of the tree still weaves. Previously generated output for a failed
//! file is left untouched; output for a unit that no longer has qualifying
//! methods is deleted.
//!
//! # Example
//!
//! ```no_run
//! use arachne_weave::{WeaveConfig, Weaver};
//!
//! # fn main() -> Result<(), arachne_weave::WeaveError> {
//! let config = WeaveConfig::default()
//!     .with_source_root("src")
//!     .with_output_root("generated");
//! let report = Weaver::new(config)?.run()?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/arachne-weave/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod emit;
mod error;
mod model;
mod parse;
mod rewrite;
mod scan;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

pub use config::{WeaveConfig, DEFAULT_CONFIG_FILE};
pub use emit::GENERATED_HEADER;
pub use error::{WeaveError, WeaveResult};
pub use model::{UnitFailure, WeaveReport, WovenUnit};

use model::UnitPlan;
use scan::SourceFile;

/// A configured weave pass.
#[derive(Debug, Clone)]
pub struct Weaver {
    config: WeaveConfig,
}

impl Weaver {
    /// Creates a weaver after validating its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::InvalidConfig`] for unusable configuration.
    pub fn new(config: WeaveConfig) -> WeaveResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration this weaver runs with.
    #[must_use]
    pub const fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Runs one full weave pass over the source root.
    ///
    /// # Errors
    ///
    /// Returns a hard error only when the pass as a whole cannot proceed: an
    /// unreadable source root or an unwritable output tree. Per-file and
    /// per-method problems are recorded on the report instead.
    pub fn run(&self) -> WeaveResult<WeaveReport> {
        let sources = scan::scan_sources(&self.config)?;
        tracing::debug!(
            source_root = %self.config.source_root.display(),
            files = sources.len(),
            "starting weave pass"
        );

        let mut report = WeaveReport::new();
        let mut plans: Vec<UnitPlan> = Vec::new();
        // Freshly written output plus the previous output of failed files;
        // everything else under the output root is stale.
        let mut keep: HashSet<PathBuf> = HashSet::new();

        for source in &sources {
            match self.weave_file(source, &mut report, &mut plans) {
                Ok(Some(output)) => {
                    keep.insert(output);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        path = %source.path.display(),
                        error = %error,
                        "skipping file, weave failed"
                    );
                    report.failures.push(UnitFailure::file(
                        &source.path,
                        error.to_string(),
                    ));
                    // Leave the file's previous output in place rather than
                    // tearing down a woven unit over a transient failure.
                    keep.insert(self.output_path(source));
                }
            }
        }

        let registry_path = self.config.registry_path();
        let registry = emit::registry_module(&plans)?;
        emit::write_generated(&registry_path, &registry)?;
        keep.insert(registry_path);

        report.deleted = emit::delete_stale(&self.config.output_root, &keep)?;

        tracing::info!(
            methods = report.method_count(),
            units = report.woven.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            deleted = report.deleted.len(),
            "weave pass finished"
        );
        Ok(report)
    }

    /// Weaves one source file, returning its output path when a mirror file
    /// was written.
    fn weave_file(
        &self,
        source: &SourceFile,
        report: &mut WeaveReport,
        plans: &mut Vec<UnitPlan>,
    ) -> WeaveResult<Option<PathBuf>> {
        let content =
            fs::read_to_string(&source.path).map_err(|e| WeaveError::read(&source.path, e))?;
        let file = syn::parse_file(&content)
            .map_err(|e| WeaveError::parse(&source.path, e.to_string()))?;

        let outcome = rewrite::rewrite_file(file, &source.module_path, &self.config);
        let had_issues = !outcome.issues.is_empty();
        for issue in outcome.issues {
            tracing::warn!(
                unit = %issue.unit,
                method = issue.method.as_deref().unwrap_or("-"),
                message = %issue.message,
                "method left unwoven"
            );
            report.failures.push(match issue.method {
                Some(method) => {
                    UnitFailure::method(&source.path, issue.unit, method, issue.message)
                }
                None => UnitFailure::unit(&source.path, issue.unit, issue.message),
            });
        }

        if outcome.units.is_empty() {
            if had_issues {
                // Every qualifying method failed; keep whatever output an
                // earlier pass produced rather than tearing the unit down.
                return Ok(Some(self.output_path(source)));
            }
            report.skipped += 1;
            return Ok(None);
        }

        let output = self.output_path(source);
        emit::write_generated(&output, &outcome.file)?;
        for unit in &outcome.units {
            tracing::debug!(
                unit = %unit.unit,
                methods = unit.methods.len(),
                output = %output.display(),
                "wove unit"
            );
            report.woven.push(WovenUnit {
                unit: unit.unit.clone(),
                source: source.path.clone(),
                output: output.clone(),
                methods: unit.methods.iter().map(|m| m.name.clone()).collect(),
            });
        }
        plans.extend(outcome.units);
        Ok(Some(output))
    }

    fn output_path(&self, source: &SourceFile) -> PathBuf {
        self.config.output_root.join(&source.relative)
    }
}

/// Runs one weave pass with the given configuration.
///
/// Convenience for build scripts; equivalent to
/// `Weaver::new(config)?.run()`.
///
/// # Errors
///
/// See [`Weaver::run`].
pub fn weave(config: WeaveConfig) -> WeaveResult<WeaveReport> {
    Weaver::new(config)?.run()
}
