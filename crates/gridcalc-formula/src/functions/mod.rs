//! Built-in functions
//!
//! Functions are looked up by exact name in a [`FunctionRegistry`]. The
//! registry is an ordinary value: the evaluator is handed one, so callers can
//! run formulas against a different set of functions without touching shared
//! state.

pub mod aggregate;

use crate::value::Value;
use ahash::AHashMap;

/// Names of the built-in functions, also the lexer's default function names
pub const BUILTIN_FUNCTIONS: [&str; 4] = ["SUM", "AVERAGE", "MAX", "MIN"];

/// Function implementation signature
///
/// Arguments arrive already evaluated, left to right.
pub type FunctionImpl = fn(&[Value]) -> Value;

/// Function definition
pub struct FunctionDef {
    /// Function name (matched exactly)
    pub name: &'static str,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_aggregate_functions();
        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Register a function, replacing any previous one of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn register_aggregate_functions(&mut self) {
        self.register(FunctionDef {
            name: "SUM",
            implementation: aggregate::fn_sum,
        });

        self.register(FunctionDef {
            name: "AVERAGE",
            implementation: aggregate::fn_average,
        });

        self.register(FunctionDef {
            name: "MAX",
            implementation: aggregate::fn_max,
        });

        self.register(FunctionDef {
            name: "MIN",
            implementation: aggregate::fn_min,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
