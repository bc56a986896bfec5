use cool_common::{sym, Symbol};

use crate::ast::nodes::{Attribute, Class, Expr, Feature, Formal, Method};

/// The primitive classes user code may not inherit from.
pub const SEALED_CLASSES: [Symbol; 3] = [sym::INT, sym::BOOL, sym::STRING];

/// Whether `name` is one of the five classes synthesized by [`basic_classes`].
pub fn is_basic_class(name: Symbol) -> bool {
    matches!(
        name,
        sym::OBJECT | sym::IO | sym::INT | sym::BOOL | sym::STRING
    )
}

fn method(name: Symbol, formals: Vec<Formal>, return_type: Symbol) -> Feature {
    Feature::Method(Method::new(name, formals, return_type, Expr::no_expr(), 0))
}

fn attr(name: Symbol, type_decl: Symbol) -> Feature {
    Feature::Attribute(Attribute::new(name, type_decl, Expr::no_expr(), 0))
}

fn formal(name: Symbol, type_decl: Symbol) -> Formal {
    Formal::new(name, type_decl, 0)
}

fn class(name: Symbol, parent: Symbol, features: Vec<Feature>) -> Class {
    Class::new(name, parent, features, sym::BASIC_CLASS_FILE, 0)
}

/// The built-in classes, in installation order.
///
/// Method bodies are empty: the runtime supplies the behavior, the analyzer
/// only needs the signatures.
pub fn basic_classes() -> Vec<Class> {
    // abort() : Object, type_name() : String, copy() : SELF_TYPE
    let object = class(
        sym::OBJECT,
        sym::NO_CLASS,
        vec![
            method(sym::ABORT, vec![], sym::OBJECT),
            method(sym::TYPE_NAME, vec![], sym::STRING),
            method(sym::COPY, vec![], sym::SELF_TYPE),
        ],
    );

    let boolean = class(sym::BOOL, sym::OBJECT, vec![attr(sym::VAL, sym::PRIM_SLOT)]);

    let int = class(sym::INT, sym::OBJECT, vec![attr(sym::VAL, sym::PRIM_SLOT)]);

    // _val holds the length, _str_field the raw characters.
    let string = class(
        sym::STRING,
        sym::OBJECT,
        vec![
            attr(sym::VAL, sym::INT),
            attr(sym::STR_FIELD, sym::PRIM_SLOT),
            method(sym::LENGTH, vec![], sym::INT),
            method(sym::CONCAT, vec![formal(sym::ARG, sym::STRING)], sym::STRING),
            method(
                sym::SUBSTR,
                vec![formal(sym::ARG, sym::INT), formal(sym::ARG2, sym::INT)],
                sym::STRING,
            ),
        ],
    );

    let io = class(
        sym::IO,
        sym::OBJECT,
        vec![
            method(sym::OUT_STRING, vec![formal(sym::ARG, sym::STRING)], sym::SELF_TYPE),
            method(sym::OUT_INT, vec![formal(sym::ARG, sym::INT)], sym::SELF_TYPE),
            method(sym::IN_STRING, vec![], sym::STRING),
            method(sym::IN_INT, vec![], sym::INT),
        ],
    );

    vec![object, boolean, int, string, io]
}
