//! Evaluation contexts
//!
//! A context maps reference ids to values. The host owns it; evaluation only
//! reads from it.

use crate::value::Value;
use ahash::AHashMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Default cell map used by hosts that have no storage of their own
pub type CellMap = AHashMap<String, Value>;

/// Read-only lookup from reference id to value
pub trait Context {
    /// Value stored under `id`, if any
    fn lookup(&self, id: &str) -> Option<&Value>;
}

impl<S: BuildHasher> Context for HashMap<String, Value, S> {
    fn lookup(&self, id: &str) -> Option<&Value> {
        self.get(id)
    }
}

impl Context for AHashMap<String, Value> {
    fn lookup(&self, id: &str) -> Option<&Value> {
        self.get(id)
    }
}

impl Context for BTreeMap<String, Value> {
    fn lookup(&self, id: &str) -> Option<&Value> {
        self.get(id)
    }
}

impl<C: Context + ?Sized> Context for &C {
    fn lookup(&self, id: &str) -> Option<&Value> {
        (**self).lookup(id)
    }
}
