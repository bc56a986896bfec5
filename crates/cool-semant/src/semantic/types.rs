use cool_common::{sym, Symbol};

use super::hierarchy::InheritanceGraph;

/// Internal type representation for semantic analysis.
///
/// Separate from the raw declared-type symbols in the AST so the checker
/// can tell the self-type placeholder and the no-type sentinel apart from
/// ordinary class names without comparing against magic symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// A named class, whether or not the graph knows it.
    Class(Symbol),
    /// `SELF_TYPE`: the exact runtime class of `self`.
    SelfType,
    /// Type of expressions with no value; compatible with everything.
    NoType,
}

impl Type {
    pub const OBJECT: Type = Type::Class(sym::OBJECT);
    pub const INT: Type = Type::Class(sym::INT);
    pub const BOOL: Type = Type::Class(sym::BOOL);
    pub const STRING: Type = Type::Class(sym::STRING);

    /// Map a declared type name to the corresponding `Type`.
    pub fn from_name(name: Symbol) -> Self {
        match name {
            sym::SELF_TYPE => Type::SelfType,
            sym::NO_TYPE => Type::NoType,
            other => Type::Class(other),
        }
    }

    /// The symbol written into an expression's type slot.
    pub fn name(self) -> Symbol {
        match self {
            Type::Class(name) => name,
            Type::SelfType => sym::SELF_TYPE,
            Type::NoType => sym::NO_TYPE,
        }
    }

    /// Replace `SELF_TYPE` by the class it stands for.
    pub fn resolve(self, current_class: Symbol) -> Self {
        match self {
            Type::SelfType => Type::Class(current_class),
            other => other,
        }
    }

    pub fn is_self_type(self) -> bool {
        self == Type::SelfType
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Subtyping queries relative to the class whose body is being checked.
#[derive(Debug, Clone, Copy)]
pub struct TypeEnv<'g> {
    graph: &'g InheritanceGraph,
    current_class: Symbol,
}

impl<'g> TypeEnv<'g> {
    pub fn new(graph: &'g InheritanceGraph, current_class: Symbol) -> Self {
        Self {
            graph,
            current_class,
        }
    }

    /// Least common ancestor of `a` and `b`.
    ///
    /// `SELF_TYPE` is resolved to the current class first. The no-type
    /// sentinel is absorbed by the other operand.
    pub fn join(&self, a: Type, b: Type) -> Type {
        let a = a.resolve(self.current_class);
        let b = b.resolve(self.current_class);
        if a == b {
            return a;
        }
        let (a, b) = match (a, b) {
            (Type::NoType, other) | (other, Type::NoType) => return other,
            (Type::Class(a), Type::Class(b)) => (a, b),
            // Both operands were resolved above.
            _ => return Type::OBJECT,
        };

        let chain_a = self.graph.ancestors(a);
        let chain_b = self.graph.ancestors(b);
        let common = chain_a
            .iter()
            .zip(chain_b.iter())
            .take_while(|(x, y)| x == y)
            .last()
            .map(|(x, _)| *x)
            .unwrap_or(sym::OBJECT);
        Type::Class(common)
    }

    /// Whether a value of type `sub` may be used where `parent` is expected.
    pub fn compatible(&self, sub: Type, parent: Type) -> bool {
        if sub == Type::NoType || parent == Type::NoType || sub == parent {
            return true;
        }
        // Only SELF_TYPE itself conforms to SELF_TYPE.
        if parent.is_self_type() {
            return false;
        }
        self.join(sub, parent) == parent
    }
}
