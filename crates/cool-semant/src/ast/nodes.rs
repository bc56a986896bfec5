use std::cell::Cell;

use cool_common::{sym, Symbol};
use serde::{Deserialize, Serialize};

// ============================================================================
// Program (top-level)
// ============================================================================

/// A complete Cool program as handed over by the parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub classes: Vec<Class>,
}

// ============================================================================
// Classes and features
// ============================================================================

/// A class declaration: `class Name inherits Parent { features }`.
///
/// The root class carries `_no_class` as its parent; the parser gives every
/// other class without an `inherits` clause `Object` as parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub name: Symbol,
    pub parent: Symbol,
    pub features: Vec<Feature>,
    pub filename: Symbol,
    pub line: u32,
}

impl Class {
    pub fn new(
        name: impl Into<Symbol>,
        parent: impl Into<Symbol>,
        features: Vec<Feature>,
        filename: impl Into<Symbol>,
        line: u32,
    ) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            features,
            filename: filename.into(),
            line,
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.features.iter().filter_map(|f| match f {
            Feature::Method(m) => Some(m),
            Feature::Attribute(_) => None,
        })
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.features.iter().filter_map(|f| match f {
            Feature::Attribute(a) => Some(a),
            Feature::Method(_) => None,
        })
    }

    /// The method declared by this class itself (not inherited).
    pub fn find_method(&self, name: Symbol) -> Option<&Method> {
        self.methods().find(|m| m.name == name)
    }

    /// The attribute declared by this class itself (not inherited).
    pub fn find_attribute(&self, name: Symbol) -> Option<&Attribute> {
        self.attributes().find(|a| a.name == name)
    }
}

/// A class member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
pub enum Feature {
    Method(Method),
    Attribute(Attribute),
}

/// `name(formals) : ReturnType { body }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub name: Symbol,
    pub formals: Vec<Formal>,
    pub return_type: Symbol,
    pub body: Expr,
    pub line: u32,
}

impl Method {
    pub fn new(
        name: impl Into<Symbol>,
        formals: Vec<Formal>,
        return_type: impl Into<Symbol>,
        body: Expr,
        line: u32,
    ) -> Self {
        Self {
            name: name.into(),
            formals,
            return_type: return_type.into(),
            body,
            line,
        }
    }

    /// Declared formal types, in order.
    pub fn formal_types(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.formals.iter().map(|f| f.type_decl)
    }
}

/// `name : Type [<- init]`. An absent initializer is a `NoExpr` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: Symbol,
    pub type_decl: Symbol,
    pub init: Expr,
    pub line: u32,
}

impl Attribute {
    pub fn new(name: impl Into<Symbol>, type_decl: impl Into<Symbol>, init: Expr, line: u32) -> Self {
        Self {
            name: name.into(),
            type_decl: type_decl.into(),
            init,
            line,
        }
    }
}

/// A method parameter: `name : Type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formal {
    pub name: Symbol,
    pub type_decl: Symbol,
    pub line: u32,
}

impl Formal {
    pub fn new(name: impl Into<Symbol>, type_decl: impl Into<Symbol>, line: u32) -> Self {
        Self {
            name: name.into(),
            type_decl: type_decl.into(),
            line,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression node.
///
/// `ty` is the static type slot. The parser leaves it empty; the type
/// checker writes it once per node and code generation reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
    #[serde(default)]
    pub ty: Cell<Option<Symbol>>,
}

/// One arm of a `case` expression: `name : Type => body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: Symbol,
    pub type_decl: Symbol,
    pub body: Expr,
    pub line: u32,
}

impl Branch {
    pub fn new(name: impl Into<Symbol>, type_decl: impl Into<Symbol>, body: Expr, line: u32) -> Self {
        Self {
            name: name.into(),
            type_decl: type_decl.into(),
            body,
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// `name <- value`
    Assign { name: Symbol, value: Box<Expr> },
    /// `receiver@Type.method(args)`
    StaticDispatch {
        receiver: Box<Expr>,
        type_name: Symbol,
        method: Symbol,
        args: Vec<Expr>,
    },
    /// `receiver.method(args)`; a bare `method(args)` has `self` as receiver.
    Dispatch {
        receiver: Box<Expr>,
        method: Symbol,
        args: Vec<Expr>,
    },
    /// `if pred then then_branch else else_branch fi`
    Cond {
        pred: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// `while pred loop body pool`
    Loop { pred: Box<Expr>, body: Box<Expr> },
    /// `{ e1; e2; ... }`
    Block(Vec<Expr>),
    /// `let name : Type [<- init] in body`; multi-binding lets nest.
    Let {
        name: Symbol,
        type_decl: Symbol,
        init: Box<Expr>,
        body: Box<Expr>,
    },
    /// `case subject of branches esac`
    Case {
        subject: Box<Expr>,
        branches: Vec<Branch>,
    },
    /// `new Type`
    New(Symbol),
    /// `isvoid e`
    IsVoid(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Int(i32),
    Str(String),
    Bool(bool),
    /// Identifier reference, including `self`.
    Object(Symbol),
    /// The empty expression standing in for an omitted initializer.
    NoExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Eq,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Integer complement: `~e`
    Neg,
    /// Boolean negation: `not e`
    Not,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self {
            kind,
            line,
            ty: Cell::new(None),
        }
    }

    /// The static type written by the type checker, if it has run.
    pub fn static_type(&self) -> Option<Symbol> {
        self.ty.get()
    }

    pub(crate) fn set_static_type(&self, ty: Symbol) {
        self.ty.set(Some(ty));
    }

    pub fn no_expr() -> Self {
        Self::new(ExprKind::NoExpr, 0)
    }

    pub fn is_no_expr(&self) -> bool {
        matches!(self.kind, ExprKind::NoExpr)
    }

    pub fn int(value: i32, line: u32) -> Self {
        Self::new(ExprKind::Int(value), line)
    }

    pub fn string(value: impl Into<String>, line: u32) -> Self {
        Self::new(ExprKind::Str(value.into()), line)
    }

    pub fn boolean(value: bool, line: u32) -> Self {
        Self::new(ExprKind::Bool(value), line)
    }

    pub fn object(name: impl Into<Symbol>, line: u32) -> Self {
        Self::new(ExprKind::Object(name.into()), line)
    }

    pub fn self_ref(line: u32) -> Self {
        Self::object(sym::SELF, line)
    }

    pub fn new_object(type_name: impl Into<Symbol>, line: u32) -> Self {
        Self::new(ExprKind::New(type_name.into()), line)
    }

    pub fn assign(name: impl Into<Symbol>, value: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Assign {
                name: name.into(),
                value: Box::new(value),
            },
            line,
        )
    }

    pub fn dispatch(receiver: Expr, method: impl Into<Symbol>, args: Vec<Expr>, line: u32) -> Self {
        Self::new(
            ExprKind::Dispatch {
                receiver: Box::new(receiver),
                method: method.into(),
                args,
            },
            line,
        )
    }

    pub fn static_dispatch(
        receiver: Expr,
        type_name: impl Into<Symbol>,
        method: impl Into<Symbol>,
        args: Vec<Expr>,
        line: u32,
    ) -> Self {
        Self::new(
            ExprKind::StaticDispatch {
                receiver: Box::new(receiver),
                type_name: type_name.into(),
                method: method.into(),
                args,
            },
            line,
        )
    }

    pub fn cond(pred: Expr, then_branch: Expr, else_branch: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Cond {
                pred: Box::new(pred),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            line,
        )
    }

    pub fn while_loop(pred: Expr, body: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Loop {
                pred: Box::new(pred),
                body: Box::new(body),
            },
            line,
        )
    }

    pub fn block(body: Vec<Expr>, line: u32) -> Self {
        Self::new(ExprKind::Block(body), line)
    }

    pub fn let_in(
        name: impl Into<Symbol>,
        type_decl: impl Into<Symbol>,
        init: Expr,
        body: Expr,
        line: u32,
    ) -> Self {
        Self::new(
            ExprKind::Let {
                name: name.into(),
                type_decl: type_decl.into(),
                init: Box::new(init),
                body: Box::new(body),
            },
            line,
        )
    }

    pub fn case(subject: Expr, branches: Vec<Branch>, line: u32) -> Self {
        Self::new(
            ExprKind::Case {
                subject: Box::new(subject),
                branches,
            },
            line,
        )
    }

    pub fn is_void(operand: Expr, line: u32) -> Self {
        Self::new(ExprKind::IsVoid(Box::new(operand)), line)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            line,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr, line: u32) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_slot_starts_empty() {
        let e = Expr::int(1, 3);
        assert_eq!(e.static_type(), None);
        e.set_static_type(sym::INT);
        assert_eq!(e.static_type(), Some(sym::INT));
    }

    #[test]
    fn class_feature_lookup_is_local() {
        let class = Class::new(
            "A",
            "Object",
            vec![
                Feature::Attribute(Attribute::new("x", "Int", Expr::no_expr(), 2)),
                Feature::Method(Method::new("f", vec![], "Int", Expr::object("x", 3), 3)),
            ],
            "a.cl",
            1,
        );
        assert!(class.find_method(Symbol::intern("f")).is_some());
        assert!(class.find_method(Symbol::intern("x")).is_none());
        assert!(class.find_attribute(Symbol::intern("x")).is_some());
        assert_eq!(class.features[1].name(), Symbol::intern("f"));
    }

    #[test]
    fn json_shape() {
        let json = r#"{
            "classes": [{
                "name": "Main",
                "parent": "Object",
                "filename": "main.cl",
                "line": 1,
                "features": [{
                    "feature": "method",
                    "name": "main",
                    "formals": [],
                    "return_type": "Int",
                    "line": 2,
                    "body": { "kind": { "int": 42 }, "line": 2 }
                }]
            }]
        }"#;
        let program: Program = serde_json::from_str(json).unwrap();
        let class = &program.classes[0];
        assert_eq!(class.name, sym::MAIN);
        let main = class.find_method(sym::MAIN_METHOD).unwrap();
        assert_eq!(main.body.kind, ExprKind::Int(42));
        assert_eq!(main.body.static_type(), None);
    }
}
