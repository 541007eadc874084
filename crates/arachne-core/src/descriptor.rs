//! Chain descriptors: the weave-time model of one intercepted method.
//!
//! A [`ChainDescriptor`] is produced once by the weaver for every qualifying
//! method and compiled into the generated chain registry. It is read-only for
//! the lifetime of the process; dispatch never mutates it.

use serde::{Deserialize, Serialize};

/// Reserved interceptor type identifier for the transactional wrapper.
pub const TRANSACTIONAL_INTERCEPTOR: &str = "Transactional";

/// Default priority of the transactional wrapper.
///
/// The maximum priority places the wrapper outermost in the pipeline unless a
/// method explicitly deprioritizes it.
pub const TRANSACTIONAL_PRIORITY: i32 = i32::MAX;

/// A literal construction argument recorded on a binding at weave time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingArg {
    /// String literal.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// Boolean literal.
    Bool(bool),
}

impl BindingArg {
    /// Returns the string value, if this argument is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this argument is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value, if this argument is a float.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this argument is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// One declared interceptor binding on a method.
///
/// Immutable once woven: the type identifier names the interceptor to
/// construct, `args` are the literal construction arguments fixed at weave
/// time, and `priority` orders the binding within its chain (higher runs
/// first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptorBinding {
    /// Interceptor type identifier, resolved through the interceptor
    /// registry at dispatch time.
    pub interceptor: String,
    /// Literal construction arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<BindingArg>,
    /// Binding priority; higher runs first in the before phase and sits
    /// outermost in the pipeline.
    #[serde(default)]
    pub priority: i32,
}

impl InterceptorBinding {
    /// Creates a binding with no construction arguments.
    #[must_use]
    pub fn new(interceptor: impl Into<String>, priority: i32) -> Self {
        Self {
            interceptor: interceptor.into(),
            args: Vec::new(),
            priority,
        }
    }

    /// Adds construction arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<BindingArg>) -> Self {
        self.args = args;
        self
    }

    /// The transactional wrapper binding at its default priority.
    #[must_use]
    pub fn transactional() -> Self {
        Self::new(TRANSACTIONAL_INTERCEPTOR, TRANSACTIONAL_PRIORITY)
    }
}

/// Stable key correlating a woven stub to its descriptor in the registry.
///
/// Formatted as `unit::method`, where the unit is the declaring type's full
/// module path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainKey(String);

impl ChainKey {
    /// Builds the key for a declaring unit and method name.
    #[must_use]
    pub fn new(unit: &str, method: &str) -> Self {
        Self(format!("{unit}::{method}"))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ChainKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Sorts bindings by descending priority, stable on declaration order.
pub fn sort_bindings(bindings: &mut [InterceptorBinding]) {
    bindings.sort_by_key(|binding| std::cmp::Reverse(binding.priority));
}

/// The weave-time description of one intercepted method.
///
/// Holds the fully ordered binding list (descending priority, declaration
/// order on ties) and the optional transactional wrapper, which is recorded
/// separately from ordinary bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Declaring unit: the full module path of the type that declares the
    /// method. A unit reused from multiple owners still weaves once, under
    /// its own path.
    pub unit: String,
    /// The woven method's name.
    pub method: String,
    /// `true` for static (unit-level) methods, `false` for instance methods.
    #[serde(default)]
    pub is_static: bool,
    /// `false` when the method's declared return type is void-equivalent.
    #[serde(default = "default_true")]
    pub returns_value: bool,
    /// Number of arguments the method declares, excluding the receiver.
    #[serde(default)]
    pub arity: usize,
    /// Ordered interceptor bindings, highest priority first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<InterceptorBinding>,
    /// The transactional wrapper, when the method is so marked. At most one
    /// per method, enforced at weave time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactional: Option<InterceptorBinding>,
}

const fn default_true() -> bool {
    true
}

impl ChainDescriptor {
    /// Creates a descriptor with no bindings.
    #[must_use]
    pub fn new(unit: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            method: method.into(),
            is_static: false,
            returns_value: true,
            arity: 0,
            bindings: Vec::new(),
            transactional: None,
        }
    }

    /// Marks the method static or instance-level.
    #[must_use]
    pub const fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Records whether the method's declared return type carries a value.
    #[must_use]
    pub const fn with_returns_value(mut self, returns_value: bool) -> Self {
        self.returns_value = returns_value;
        self
    }

    /// Records the method's declared arity.
    #[must_use]
    pub const fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    /// Inserts a binding, maintaining descending priority order with stable
    /// ties: among equal priorities, earlier declarations stay first.
    #[must_use]
    pub fn with_binding(mut self, binding: InterceptorBinding) -> Self {
        let at = self
            .bindings
            .iter()
            .position(|existing| existing.priority < binding.priority)
            .unwrap_or(self.bindings.len());
        self.bindings.insert(at, binding);
        self
    }

    /// Records the transactional wrapper.
    #[must_use]
    pub fn with_transactional(mut self, binding: InterceptorBinding) -> Self {
        self.transactional = Some(binding);
        self
    }

    /// The registry key for this descriptor.
    #[must_use]
    pub fn chain_key(&self) -> ChainKey {
        ChainKey::new(&self.unit, &self.method)
    }

    /// The complete binding order used by dispatch.
    ///
    /// Merges the transactional wrapper (when present) into the ordered
    /// binding list. On equal priority the wrapper runs first, so at its
    /// default priority it is always outermost.
    #[must_use]
    pub fn dispatch_order(&self) -> Vec<&InterceptorBinding> {
        let mut ordered: Vec<&InterceptorBinding> = Vec::with_capacity(
            self.bindings.len() + usize::from(self.transactional.is_some()),
        );
        match &self.transactional {
            Some(txn) => {
                let at = self
                    .bindings
                    .iter()
                    .position(|binding| binding.priority <= txn.priority)
                    .unwrap_or(self.bindings.len());
                ordered.extend(self.bindings[..at].iter());
                ordered.push(txn);
                ordered.extend(self.bindings[at..].iter());
            }
            None => ordered.extend(self.bindings.iter()),
        }
        ordered
    }
}
