use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An interned identifier.
///
/// Two symbols are equal exactly when they were interned from the same
/// text, so comparisons and hashing never look at the string itself.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

/// Names the analyzer refers to directly. The order here fixes the handle
/// of each constant in [`sym`].
const PREDEFINED: [&str; 27] = [
    "Object",
    "IO",
    "Int",
    "Bool",
    "String",
    "SELF_TYPE",
    "_no_class",
    "_no_type",
    "_prim_slot",
    "self",
    "Main",
    "main",
    "abort",
    "type_name",
    "copy",
    "out_string",
    "out_int",
    "in_string",
    "in_int",
    "length",
    "concat",
    "substr",
    "arg",
    "arg2",
    "_val",
    "_str_field",
    "<basic class>",
];

/// Pre-interned symbols.
pub mod sym {
    use super::Symbol;

    pub const OBJECT: Symbol = Symbol(0);
    pub const IO: Symbol = Symbol(1);
    pub const INT: Symbol = Symbol(2);
    pub const BOOL: Symbol = Symbol(3);
    pub const STRING: Symbol = Symbol(4);
    pub const SELF_TYPE: Symbol = Symbol(5);
    /// Parent of the root class; can never name a user class.
    pub const NO_CLASS: Symbol = Symbol(6);
    /// Type of expressions with no value (absent initializers).
    pub const NO_TYPE: Symbol = Symbol(7);
    /// Declared type of the raw value slot in the primitive classes.
    pub const PRIM_SLOT: Symbol = Symbol(8);
    pub const SELF: Symbol = Symbol(9);
    pub const MAIN: Symbol = Symbol(10);
    pub const MAIN_METHOD: Symbol = Symbol(11);
    pub const ABORT: Symbol = Symbol(12);
    pub const TYPE_NAME: Symbol = Symbol(13);
    pub const COPY: Symbol = Symbol(14);
    pub const OUT_STRING: Symbol = Symbol(15);
    pub const OUT_INT: Symbol = Symbol(16);
    pub const IN_STRING: Symbol = Symbol(17);
    pub const IN_INT: Symbol = Symbol(18);
    pub const LENGTH: Symbol = Symbol(19);
    pub const CONCAT: Symbol = Symbol(20);
    pub const SUBSTR: Symbol = Symbol(21);
    pub const ARG: Symbol = Symbol(22);
    pub const ARG2: Symbol = Symbol(23);
    pub const VAL: Symbol = Symbol(24);
    pub const STR_FIELD: Symbol = Symbol(25);
    pub const BASIC_CLASS_FILE: Symbol = Symbol(26);
}

/// Append-only string table. Interned strings are leaked so that
/// [`Symbol::as_str`] can hand out `&'static str`.
struct Interner {
    map: HashMap<&'static str, Symbol>,
    strings: Vec<&'static str>,
}

impl Interner {
    fn prefilled() -> Self {
        let mut interner = Self {
            map: HashMap::new(),
            strings: Vec::with_capacity(PREDEFINED.len()),
        };
        for name in PREDEFINED {
            interner.intern(name);
        }
        interner
    }

    fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&sym) = self.map.get(name) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        self.strings.push(name);
        self.map.insert(name, sym);
        sym
    }

    fn resolve(&self, sym: Symbol) -> &'static str {
        self.strings[sym.0 as usize]
    }
}

fn interner() -> &'static Mutex<Interner> {
    static INTERNER: OnceLock<Mutex<Interner>> = OnceLock::new();
    INTERNER.get_or_init(|| Mutex::new(Interner::prefilled()))
}

impl Symbol {
    pub fn intern(name: &str) -> Self {
        interner()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .intern(name)
    }

    pub fn as_str(self) -> &'static str {
        interner()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(self)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Symbol::intern(&name))
    }
}
