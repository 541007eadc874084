//! Data model for a weave pass.
//!
//! The serde-derived report types are the machine-readable outcome of a pass
//! (`--json` on the CLI prints them). The plan types are the in-memory record
//! of what was woven, carried from the rewrite step to the registry emitter.

use std::path::PathBuf;

use arachne_core::BindingArg;
use serde::{Deserialize, Serialize};

/// Outcome of a full weave pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeaveReport {
    /// Units rewritten this pass, one entry per `impl` block with at least
    /// one woven method.
    pub woven: Vec<WovenUnit>,

    /// Source files scanned but containing no qualifying methods.
    pub skipped: usize,

    /// Files and methods that could not be woven. The pass continues past
    /// each of these.
    pub failures: Vec<UnitFailure>,

    /// Previously generated files deleted because their unit no longer has
    /// qualifying methods or their source vanished.
    pub deleted: Vec<PathBuf>,
}

impl WeaveReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if any file or method failed to weave.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Total number of methods rewritten this pass.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.woven.iter().map(|unit| unit.methods.len()).sum()
    }

    /// One-line human summary for the CLI.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "wove {} method(s) across {} unit(s); {} file(s) skipped, {} failure(s), {} stale file(s) deleted",
            self.method_count(),
            self.woven.len(),
            self.skipped,
            self.failures.len(),
            self.deleted.len(),
        )
    }
}

/// A unit successfully rewritten this pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WovenUnit {
    /// Full unit path, `module::Type`.
    pub unit: String,

    /// Source file the unit was read from.
    pub source: PathBuf,

    /// Generated mirror file.
    pub output: PathBuf,

    /// Names of the methods rewritten into dispatch stubs.
    pub methods: Vec<String>,
}

/// A file or method the pass could not weave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitFailure {
    /// Source file the failure occurred in.
    pub source: PathBuf,

    /// Declaring unit, when the failure is scoped to one.
    pub unit: Option<String>,

    /// Method name, when the failure is scoped to one method.
    pub method: Option<String>,

    /// What went wrong.
    pub message: String,
}

impl UnitFailure {
    /// A failure covering a whole source file.
    #[must_use]
    pub fn file(source: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            unit: None,
            method: None,
            message: message.into(),
        }
    }

    /// A failure scoped to one unit within a file.
    #[must_use]
    pub fn unit(
        source: impl Into<PathBuf>,
        unit: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            unit: Some(unit.into()),
            method: None,
            message: message.into(),
        }
    }

    /// A failure scoped to one method; the rest of the unit still weaves.
    #[must_use]
    pub fn method(
        source: impl Into<PathBuf>,
        unit: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            unit: Some(unit.into()),
            method: Some(method.into()),
            message: message.into(),
        }
    }
}

/// Everything the registry emitter needs to know about one woven unit.
#[derive(Debug, Clone)]
pub(crate) struct UnitPlan {
    /// Full unit path, `module::Type`.
    pub unit: String,

    /// Bare type name, used in generated thunk identifiers.
    pub type_name: String,

    /// Module segments from the crate root to the unit's containing module,
    /// combining the file's location under the source root with any inline
    /// modules.
    pub module_path: Vec<String>,

    /// Whether the type visibly implements `Default`, enabling the
    /// default-constructor thunk.
    pub has_default: bool,

    /// Methods rewritten in this unit.
    pub methods: Vec<MethodPlan>,
}

/// Descriptor-shaping facts for one woven method.
#[derive(Debug, Clone)]
pub(crate) struct MethodPlan {
    pub name: String,
    pub is_static: bool,
    pub returns_value: bool,
    pub arity: usize,
    pub bindings: Vec<BindingPlan>,
    pub transactional: Option<TransactionalPlan>,
}

/// One `#[intercept(...)]` binding as parsed from source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BindingPlan {
    pub name: String,
    pub priority: i32,
    pub args: Vec<BindingArg>,
}

/// One `#[transactional]` marker as parsed from source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransactionalPlan {
    /// Explicit priority override; `None` keeps the reserved default.
    pub priority: Option<i32>,
}
