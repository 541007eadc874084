//! Type-erased value interchange between woven stubs and the dispatcher.
//!
//! Woven outer stubs are strongly typed; the dispatch engine is not. Values
//! cross that seam as cheaply clonable [`CallValue`] handles, and the
//! generated invoker thunks downcast them back to the concrete types of the
//! inner method. Every type flowing through a woven call must therefore be
//! `Clone + Send + Sync + 'static`.

use std::any::Any;
use std::sync::Arc;

use crate::error::{AspectError, AspectResult};

/// A single type-erased argument or return value.
pub type CallValue = Arc<dyn Any + Send + Sync>;

/// The ordered argument list of one dispatched call.
pub type CallArgs = Vec<CallValue>;

/// The receiver of a dispatched call.
#[derive(Clone)]
pub enum CallTarget {
    /// An instance-level call: the erased instance handle.
    Instance(CallValue),
    /// A static (unit-level) call: the declaring unit's identifier.
    Unit(&'static str),
}

impl CallTarget {
    /// Returns the unit identifier for static targets.
    #[must_use]
    pub const fn unit_name(&self) -> Option<&'static str> {
        match self {
            Self::Unit(unit) => Some(unit),
            Self::Instance(_) => None,
        }
    }

    /// Returns `true` for instance-level targets.
    #[must_use]
    pub const fn is_instance(&self) -> bool {
        matches!(self, Self::Instance(_))
    }
}

impl std::fmt::Debug for CallTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("CallTarget::Instance(..)"),
            Self::Unit(unit) => write!(f, "CallTarget::Unit({unit})"),
        }
    }
}

/// Erases a concrete value into a [`CallValue`].
#[must_use]
pub fn value<T>(v: T) -> CallValue
where
    T: Send + Sync + 'static,
{
    Arc::new(v)
}

/// The [`CallValue`] used for void-returning calls.
#[must_use]
pub fn unit_value() -> CallValue {
    Arc::new(())
}

/// Recovers a concrete value from a [`CallValue`] by downcast and clone.
///
/// # Errors
///
/// Returns [`AspectError::TypeMismatch`] when the value does not hold a `T`.
/// A mismatch means a stub, thunk, or interceptor disagrees with the chain
/// registry about this value's type, which is a programmer error.
pub fn take<T>(v: &CallValue) -> AspectResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    v.downcast_ref::<T>()
        .cloned()
        .ok_or_else(AspectError::type_mismatch::<T>)
}

/// Recovers the `index`-th argument from an argument list.
///
/// # Errors
///
/// Returns [`AspectError::TypeMismatch`] when the slot is absent or holds a
/// different type.
pub fn arg<T>(args: &CallArgs, index: usize) -> AspectResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    args.get(index)
        .ok_or_else(AspectError::type_mismatch::<T>)
        .and_then(take::<T>)
}

/// Builds a [`CallArgs`] list from concrete values.
///
/// ```
/// use arachne_core::call_args;
///
/// let args = call_args![42_u64, String::from("alice")];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! call_args {
    () => {
        $crate::CallArgs::new()
    };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::value($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_round_trip() {
        let v = value(42_u64);
        assert_eq!(take::<u64>(&v).expect("same type"), 42);
    }

    #[test]
    fn test_take_rejects_wrong_type() {
        let v = value(42_u64);
        let err = take::<String>(&v).expect_err("wrong type");
        assert!(matches!(err, AspectError::TypeMismatch { .. }));
    }

    #[test]
    fn test_arg_indexes_and_downcasts() {
        let args = call_args![1_i64, String::from("x")];
        assert_eq!(arg::<i64>(&args, 0).expect("first"), 1);
        assert_eq!(arg::<String>(&args, 1).expect("second"), "x");
        assert!(arg::<i64>(&args, 2).is_err());
    }

    #[test]
    fn test_empty_call_args() {
        let args = call_args![];
        assert!(args.is_empty());
    }

    #[test]
    fn test_unit_value_holds_unit() {
        let v = unit_value();
        take::<()>(&v).expect("unit");
    }

    #[test]
    fn test_call_target_accessors() {
        let unit = CallTarget::Unit("svc::User");
        assert_eq!(unit.unit_name(), Some("svc::User"));
        assert!(!unit.is_instance());

        let instance = CallTarget::Instance(value(7_u8));
        assert!(instance.is_instance());
        assert_eq!(instance.unit_name(), None);
    }

    #[test]
    fn test_clone_shares_underlying_value() {
        let v = value(String::from("shared"));
        let w = Arc::clone(&v);
        assert_eq!(take::<String>(&w).expect("clone"), "shared");
    }
}
