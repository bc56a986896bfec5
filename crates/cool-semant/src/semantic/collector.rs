use cool_common::{DiagnosticBag, Span, Symbol};
use log::{debug, trace};

use crate::ast::nodes::{Attribute, Class, Feature, Method};

use super::hierarchy::{ClassId, InheritanceGraph};
use super::scope::SymbolTable;

/// Definition-collection pass.
///
/// Walks the validated class tree from `Object` down, registering every
/// feature of a class in a scope frame that stays open while the class's
/// subclasses are visited. A feature whose name is already bound is a
/// redeclaration: always illegal for attributes, legal for methods only
/// when the signature is unchanged.
pub struct DefinitionCollector<'g> {
    graph: &'g InheritanceGraph,
    /// Attribute name -> declared type.
    identifiers: SymbolTable<Symbol>,
    /// Method name -> declared return type.
    methods: SymbolTable<Symbol>,
    current_class: Option<&'g Class>,
    diagnostics: DiagnosticBag,
}

impl<'g> DefinitionCollector<'g> {
    pub fn new(graph: &'g InheritanceGraph) -> Self {
        Self {
            graph,
            identifiers: SymbolTable::new(),
            methods: SymbolTable::new(),
            current_class: None,
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Run the pass over the whole tree and return accumulated diagnostics.
    pub fn collect(mut self) -> DiagnosticBag {
        debug!("definition pass: start");
        if let Some(root) = self.graph.root() {
            self.collect_class(root);
        }
        debug_assert_eq!(self.identifiers.depth(), 0);
        debug_assert_eq!(self.methods.depth(), 0);
        debug!(
            "definition pass: {} errors",
            self.diagnostics.error_count()
        );
        self.diagnostics
    }

    fn collect_class(&mut self, id: ClassId) {
        let graph = self.graph;
        let node = graph.node(id);
        trace!("definition pass: enter class {}", node.name());

        self.identifiers.enter_scope();
        self.methods.enter_scope();
        self.current_class = Some(node.class());

        for feature in &node.class().features {
            match feature {
                Feature::Method(m) => self.define_method(m),
                Feature::Attribute(a) => self.define_attribute(a),
            }
        }

        for &child in node.children() {
            self.collect_class(child);
        }

        self.methods.exit_scope();
        self.identifiers.exit_scope();
        trace!("definition pass: leave class {}", node.name());
    }

    fn define_method(&mut self, method: &Method) {
        if self.methods.probe_top(method.name).is_some() {
            let class = self.class_name();
            self.error(
                method.line,
                format!(
                    "Method {} is multiply defined in class {}.",
                    method.name, class
                ),
            );
        } else if let Some(original) = self.inherited_method(method.name) {
            self.check_override(method, original);
        }
        self.methods.bind(method.name, method.return_type);
    }

    /// Nearest declaration of `name` strictly above the current class.
    fn inherited_method(&self, name: Symbol) -> Option<&'g Method> {
        let parent = self.current_class?.parent;
        self.graph.find_method(parent, name)
    }

    fn check_override(&mut self, method: &Method, original: &Method) {
        if method.return_type != original.return_type {
            self.error(
                method.line,
                format!(
                    "In redefined method {}, return type {} is different from original return type {}.",
                    method.name, method.return_type, original.return_type
                ),
            );
            return;
        }
        if method.formals.len() != original.formals.len() {
            self.error(
                method.line,
                format!(
                    "Incompatible number of formal parameters in redefined method {}.",
                    method.name
                ),
            );
            return;
        }
        let mismatch = method
            .formals
            .iter()
            .zip(&original.formals)
            .find(|(mine, theirs)| mine.type_decl != theirs.type_decl);
        if let Some((mine, theirs)) = mismatch {
            self.error(
                method.line,
                format!(
                    "In redefined method {}, parameter type {} is different from original type {}.",
                    method.name, mine.type_decl, theirs.type_decl
                ),
            );
        }
    }

    fn define_attribute(&mut self, attr: &Attribute) {
        if self.identifiers.probe_below_top(attr.name).is_some() {
            self.error(
                attr.line,
                format!("Attribute {} is an attribute of an inherited class.", attr.name),
            );
        } else if self.identifiers.probe_top(attr.name).is_some() {
            let class = self.class_name();
            self.error(
                attr.line,
                format!("Attribute {} is multiply defined in class {}.", attr.name, class),
            );
        }
        self.identifiers.bind(attr.name, attr.type_decl);
    }

    fn class_name(&self) -> Symbol {
        self.current_class
            .map(|c| c.name)
            .unwrap_or(cool_common::sym::NO_CLASS)
    }

    fn error(&mut self, line: u32, message: String) {
        let file = self
            .current_class
            .map(|c| c.filename.as_str())
            .unwrap_or_default();
        self.diagnostics.error(message, Span::new(file, line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::{Expr, Formal};

    fn errors(classes: Vec<Class>) -> Vec<String> {
        let graph = InheritanceGraph::build(classes);
        graph.validate().expect("hierarchy should be valid");
        DefinitionCollector::new(&graph)
            .collect()
            .into_diagnostics()
            .into_iter()
            .map(|d| d.to_string())
            .collect()
    }

    fn method(name: &str, formals: Vec<Formal>, ret: &str, line: u32) -> Feature {
        Feature::Method(Method::new(name, formals, ret, Expr::no_expr(), line))
    }

    fn attr(name: &str, ty: &str, line: u32) -> Feature {
        Feature::Attribute(Attribute::new(name, ty, Expr::no_expr(), line))
    }

    #[test]
    fn clean_hierarchy_has_no_errors() {
        let errs = errors(vec![
            Class::new("A", "Object", vec![attr("x", "Int", 2), method("f", vec![], "Int", 3)], "t.cl", 1),
            Class::new("B", "A", vec![attr("y", "Int", 6), method("f", vec![], "Int", 7)], "t.cl", 5),
        ]);
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    }

    #[test]
    fn duplicate_method_in_class() {
        let errs = errors(vec![Class::new(
            "A",
            "Object",
            vec![method("f", vec![], "Int", 2), method("f", vec![], "Int", 3)],
            "t.cl",
            1,
        )]);
        assert_eq!(errs, vec!["t.cl:3: Method f is multiply defined in class A."]);
    }

    #[test]
    fn duplicate_attribute_in_class() {
        let errs = errors(vec![Class::new(
            "A",
            "Object",
            vec![attr("x", "Int", 2), attr("x", "String", 3)],
            "t.cl",
            1,
        )]);
        assert_eq!(errs, vec!["t.cl:3: Attribute x is multiply defined in class A."]);
    }

    #[test]
    fn inherited_attribute_redeclared() {
        let errs = errors(vec![
            Class::new("A", "Object", vec![attr("x", "Int", 2)], "t.cl", 1),
            Class::new("B", "A", vec![], "t.cl", 4),
            Class::new("C", "B", vec![attr("x", "Int", 7)], "t.cl", 6),
        ]);
        assert_eq!(errs, vec!["t.cl:7: Attribute x is an attribute of an inherited class."]);
    }

    #[test]
    fn sibling_attributes_do_not_clash() {
        let errs = errors(vec![
            Class::new("A", "Object", vec![attr("x", "Int", 2)], "t.cl", 1),
            Class::new("B", "Object", vec![attr("x", "Bool", 4)], "t.cl", 3),
        ]);
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    }

    #[test]
    fn override_with_different_return_type() {
        let errs = errors(vec![
            Class::new("A", "Object", vec![method("f", vec![], "Int", 2)], "t.cl", 1),
            Class::new("B", "A", vec![method("f", vec![], "String", 5)], "t.cl", 4),
        ]);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("return type String is different from original return type Int"));
    }

    #[test]
    fn override_with_different_arity() {
        let errs = errors(vec![
            Class::new("A", "Object", vec![method("f", vec![], "Int", 2)], "t.cl", 1),
            Class::new(
                "B",
                "A",
                vec![method("f", vec![Formal::new("a", "Int", 5)], "Int", 5)],
                "t.cl",
                4,
            ),
        ]);
        assert_eq!(
            errs,
            vec!["t.cl:5: Incompatible number of formal parameters in redefined method f."]
        );
    }

    #[test]
    fn override_with_different_formal_type() {
        let errs = errors(vec![
            Class::new(
                "A",
                "Object",
                vec![method("f", vec![Formal::new("a", "Int", 2)], "Int", 2)],
                "t.cl",
                1,
            ),
            Class::new(
                "B",
                "A",
                vec![method("f", vec![Formal::new("a", "Bool", 5)], "Int", 5)],
                "t.cl",
                4,
            ),
        ]);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("parameter type Bool is different from original type Int"));
    }

    #[test]
    fn overriding_builtin_with_wrong_signature() {
        let errs = errors(vec![Class::new(
            "A",
            "Object",
            vec![method("copy", vec![], "A", 2)],
            "t.cl",
            1,
        )]);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("redefined method copy"));
    }
}
