//! Shape rules: which values are list-like and which are missing.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::types::Value;

/// The set of runtime shapes treated as list-like.
///
/// [`Value::List`] is always list-like. [`Value::Float64Array`] is list-like only in the extended
/// set. Strings and dictionaries are never list-like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListKinds {
    /// Recognize dense numeric arrays as lists.
    pub numeric_arrays: bool,
}

static DETECTED: OnceLock<ListKinds> = OnceLock::new();

impl ListKinds {
    /// Base set: `Value::List` only.
    pub const fn base() -> Self {
        Self {
            numeric_arrays: false,
        }
    }

    /// Base set plus numeric arrays.
    pub const fn extended() -> Self {
        Self {
            numeric_arrays: true,
        }
    }

    /// The process-wide set, resolved on first use.
    ///
    /// Numeric arrays are recognized when the crate is built with the `numeric-arrays` feature;
    /// otherwise this silently falls back to [`ListKinds::base`].
    pub fn detected() -> Self {
        *DETECTED.get_or_init(probe)
    }

    /// Returns `true` if `value` has a list-like shape under this set.
    pub fn is_list(&self, value: &Value) -> bool {
        match value {
            Value::List(_) => true,
            Value::Float64Array(_) => self.numeric_arrays,
            _ => false,
        }
    }
}

impl Default for ListKinds {
    fn default() -> Self {
        Self::detected()
    }
}

fn probe() -> ListKinds {
    if cfg!(feature = "numeric-arrays") {
        ListKinds::extended()
    } else {
        ListKinds::base()
    }
}

/// Decides whether a value is a missing/NaN sentinel.
///
/// Implementations only need to answer for scalars: [`ShapeRules`] never asks about
/// [`Value::Null`] or containers.
pub trait MissingPredicate: Send + Sync {
    /// Returns `true` iff `value` should be treated as missing.
    fn is_missing(&self, value: &Value) -> bool;
}

/// Default predicate: a `Float64` NaN is missing, nothing else is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NanIsMissing;

impl MissingPredicate for NanIsMissing {
    fn is_missing(&self, value: &Value) -> bool {
        matches!(value, Value::Float64(f) if f.is_nan())
    }
}

impl<F> MissingPredicate for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn is_missing(&self, value: &Value) -> bool {
        self(value)
    }
}

/// List-kind set plus missing-value predicate, shared by every normalization stage.
#[derive(Clone)]
pub struct ShapeRules {
    list_kinds: ListKinds,
    missing: Arc<dyn MissingPredicate>,
}

impl ShapeRules {
    /// Create rules from a list-kind set and a missing-value predicate.
    pub fn new(list_kinds: ListKinds, missing: Arc<dyn MissingPredicate>) -> Self {
        Self {
            list_kinds,
            missing,
        }
    }

    /// The list-kind set in use.
    pub fn list_kinds(&self) -> ListKinds {
        self.list_kinds
    }

    /// List-like: a sequence of elements, never a string or dictionary.
    pub fn is_list(&self, value: &Value) -> bool {
        self.list_kinds.is_list(value)
    }

    /// A missing sentinel that is not structural `Null`.
    ///
    /// Containers can never be missing, whatever the predicate would say.
    pub fn is_nan(&self, value: &Value) -> bool {
        if value.is_null() || value.is_container() {
            return false;
        }
        self.missing.is_missing(value)
    }

    /// Null-equivalent: `Null` or a missing sentinel.
    pub fn is_null(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        if self.is_list(value) {
            return false;
        }
        self.is_nan(value)
    }
}

impl Default for ShapeRules {
    fn default() -> Self {
        Self::new(ListKinds::detected(), Arc::new(NanIsMissing))
    }
}

impl fmt::Debug for ShapeRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeRules")
            .field("list_kinds", &self.list_kinds)
            .finish_non_exhaustive()
    }
}
