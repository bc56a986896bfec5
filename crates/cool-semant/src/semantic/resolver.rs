use cool_common::{sym, DiagnosticBag, Span, Symbol};
use log::{debug, trace};

use crate::ast::nodes::{Attribute, Branch, Class, Expr, ExprKind, Feature, Formal, Method};

use super::hierarchy::{ClassId, InheritanceGraph};
use super::scope::SymbolTable;
use super::type_checker::{binary_result, check_binary_op, check_unary_op, unary_result};
use super::types::{Type, TypeEnv};

/// What the type pass knows about a name in scope.
#[derive(Debug, Clone, Copy)]
struct Binding {
    ty: Type,
    used: bool,
}

impl Binding {
    fn new(ty: Type) -> Self {
        Self { ty, used: false }
    }

    /// A binding never reported as unused.
    fn exempt(ty: Type) -> Self {
        Self { ty, used: true }
    }
}

/// Type-checking pass.
///
/// Visits classes in the same top-down order as the definition pass, so a
/// class's attribute frame sits on top of its ancestors' frames. Every
/// expression node gets exactly one static type written into its slot,
/// including nodes inside erroneous constructs.
pub struct Resolver<'g> {
    graph: &'g InheritanceGraph,
    /// Identifier name -> declared type.
    identifiers: SymbolTable<Binding>,
    current_class: Option<&'g Class>,
    diagnostics: DiagnosticBag,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g InheritanceGraph) -> Self {
        Self {
            graph,
            identifiers: SymbolTable::new(),
            current_class: None,
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Run the pass over the whole tree and return accumulated diagnostics.
    pub fn resolve(mut self) -> DiagnosticBag {
        debug!("type pass: start");
        if let Some(root) = self.graph.root() {
            self.check_class(root);
        }
        debug_assert_eq!(self.identifiers.depth(), 0);
        debug!("type pass: {} errors", self.diagnostics.error_count());
        self.diagnostics
    }

    // ========================================================================
    // Classes and features
    // ========================================================================

    fn check_class(&mut self, id: ClassId) {
        let graph = self.graph;
        let node = graph.node(id);
        let class = node.class();
        trace!("type pass: enter class {}", class.name);

        self.identifiers.enter_scope();
        self.current_class = Some(class);

        self.identifiers.bind(sym::SELF, Binding::exempt(Type::SelfType));
        for attr in class.attributes() {
            if attr.name != sym::SELF {
                let ty = self.declared_type(attr.type_decl).unwrap_or(Type::OBJECT);
                self.identifiers.bind(attr.name, Binding::exempt(ty));
            }
        }

        for feature in &class.features {
            match feature {
                Feature::Attribute(a) => self.check_attribute(a),
                Feature::Method(m) => self.check_method(m),
            }
        }

        for &child in node.children() {
            self.check_class(child);
            self.current_class = Some(class);
        }

        self.identifiers.exit_scope();
        trace!("type pass: leave class {}", class.name);
    }

    fn check_attribute(&mut self, attr: &Attribute) {
        let init = self.check_expr(&attr.init);

        if attr.name == sym::SELF {
            self.error(attr.line, "'self' cannot be the name of an attribute.".to_string());
        }
        if attr.type_decl == sym::PRIM_SLOT {
            return;
        }
        let Some(declared) = self.declared_type(attr.type_decl) else {
            self.error(
                attr.line,
                format!(
                    "Class {} of attribute {} is undefined.",
                    attr.type_decl, attr.name
                ),
            );
            return;
        };
        if !self.env().compatible(init, declared) {
            self.error(
                attr.line,
                format!(
                    "Inferred type {} of initialization of attribute {} does not conform to declared type {}.",
                    init, attr.name, declared
                ),
            );
        }
    }

    fn check_method(&mut self, method: &Method) {
        self.identifiers.enter_scope();
        for formal in &method.formals {
            self.bind_formal(formal);
        }

        let body = self.check_expr(&method.body);
        match self.declared_type(method.return_type) {
            None => self.error(
                method.line,
                format!(
                    "Undefined return type {} in method {}.",
                    method.return_type, method.name
                ),
            ),
            Some(declared) => {
                if !self.env().compatible(body, declared) {
                    self.error(
                        method.line,
                        format!(
                            "Inferred return type {} of method {} does not conform to declared return type {}.",
                            body, method.name, method.return_type
                        ),
                    );
                }
            }
        }
        self.identifiers.exit_scope();
    }

    fn bind_formal(&mut self, formal: &Formal) {
        if formal.name == sym::SELF {
            self.error(
                formal.line,
                "'self' cannot be the name of a formal parameter.".to_string(),
            );
            return;
        }
        if self.identifiers.probe_top(formal.name).is_some() {
            self.error(
                formal.line,
                format!("Formal parameter {} is multiply defined.", formal.name),
            );
            return;
        }
        let ty = if formal.type_decl == sym::SELF_TYPE {
            self.error(
                formal.line,
                format!("Formal parameter {} cannot have type SELF_TYPE.", formal.name),
            );
            Type::OBJECT
        } else if self.graph.contains(formal.type_decl) {
            Type::Class(formal.type_decl)
        } else {
            self.error(
                formal.line,
                format!(
                    "Class {} of formal parameter {} is undefined.",
                    formal.type_decl, formal.name
                ),
            );
            Type::OBJECT
        };
        self.identifiers.bind(formal.name, Binding::exempt(ty));
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Infer the type of `expr`, record it in the node, and return it.
    fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.infer(expr);
        trace!("line {}: {}", expr.line, ty);
        expr.set_static_type(ty.name());
        ty
    }

    fn infer(&mut self, expr: &Expr) -> Type {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Int(_) => Type::INT,
            ExprKind::Str(_) => Type::STRING,
            ExprKind::Bool(_) => Type::BOOL,
            ExprKind::NoExpr => Type::NoType,

            ExprKind::Object(name) => self.check_identifier(*name, line),

            ExprKind::Assign { name, value } => {
                let value = self.check_expr(value);
                self.check_assign(*name, value, line);
                value
            }

            ExprKind::Dispatch {
                receiver,
                method,
                args,
            } => {
                let receiver = self.check_expr(receiver);
                let args = self.check_args(args);
                let class = match receiver.resolve(self.class_name()) {
                    Type::Class(name) => name,
                    _ => sym::OBJECT,
                };
                self.check_call(class, *method, &args, receiver, line)
            }

            ExprKind::StaticDispatch {
                receiver,
                type_name,
                method,
                args,
            } => {
                let receiver = self.check_expr(receiver);
                let args = self.check_args(args);
                self.check_static_dispatch(receiver, *type_name, *method, &args, line)
            }

            ExprKind::Cond {
                pred,
                then_branch,
                else_branch,
            } => {
                let pred = self.check_expr(pred);
                let then_ty = self.check_expr(then_branch);
                let else_ty = self.check_expr(else_branch);
                if pred != Type::BOOL {
                    self.error(line, "Predicate of 'if' does not have type Bool.".to_string());
                }
                self.env().join(then_ty, else_ty)
            }

            ExprKind::Loop { pred, body } => {
                let pred = self.check_expr(pred);
                self.check_expr(body);
                if pred != Type::BOOL {
                    self.error(line, "Loop condition does not have type Bool.".to_string());
                }
                Type::OBJECT
            }

            ExprKind::Block(body) => {
                let mut last = None;
                for e in body {
                    last = Some(self.check_expr(e));
                }
                last.unwrap_or_else(|| {
                    self.error(line, "Empty block.".to_string());
                    Type::OBJECT
                })
            }

            ExprKind::Let {
                name,
                type_decl,
                init,
                body,
            } => self.check_let(*name, *type_decl, init, body, line),

            ExprKind::Case { subject, branches } => {
                self.check_expr(subject);
                self.check_case(branches, line)
            }

            ExprKind::New(type_name) => {
                if *type_name == sym::SELF_TYPE {
                    Type::Class(self.class_name())
                } else if self.graph.contains(*type_name) {
                    Type::Class(*type_name)
                } else {
                    self.error(line, format!("'new' used with undefined class {}.", type_name));
                    Type::OBJECT
                }
            }

            ExprKind::IsVoid(operand) => {
                self.check_expr(operand);
                Type::BOOL
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_expr(lhs);
                let rhs = self.check_expr(rhs);
                match check_binary_op(lhs, *op, rhs) {
                    Ok(ty) => ty,
                    Err(message) => {
                        self.error(line, message);
                        binary_result(*op)
                    }
                }
            }

            ExprKind::Unary { op, operand } => {
                let operand = self.check_expr(operand);
                match check_unary_op(*op, operand) {
                    Ok(ty) => ty,
                    Err(message) => {
                        self.error(line, message);
                        unary_result(*op)
                    }
                }
            }
        }
    }

    fn check_identifier(&mut self, name: Symbol, line: u32) -> Type {
        if name == sym::SELF {
            return Type::SelfType;
        }
        match self.identifiers.lookup_mut(name) {
            Some(binding) => {
                binding.used = true;
                binding.ty
            }
            None => {
                self.error(line, format!("Undeclared identifier {}.", name));
                Type::OBJECT
            }
        }
    }

    fn check_assign(&mut self, name: Symbol, value: Type, line: u32) {
        if name == sym::SELF {
            self.error(line, "Cannot assign to 'self'.".to_string());
            return;
        }
        let declared = self.identifiers.lookup_mut(name).map(|binding| {
            binding.used = true;
            binding.ty
        });
        match declared {
            None => self.error(line, format!("Assignment to undeclared variable {}.", name)),
            Some(declared) if !self.env().compatible(value, declared) => self.error(
                line,
                format!(
                    "Type {} of assigned expression does not conform to declared type {} of identifier {}.",
                    value, declared, name
                ),
            ),
            Some(_) => {}
        }
    }

    fn check_args(&mut self, args: &[Expr]) -> Vec<Type> {
        let mut types = Vec::with_capacity(args.len());
        for arg in args {
            types.push(self.check_expr(arg));
        }
        types
    }

    fn check_static_dispatch(
        &mut self,
        receiver: Type,
        type_name: Symbol,
        method: Symbol,
        args: &[Type],
        line: u32,
    ) -> Type {
        if type_name == sym::SELF_TYPE {
            self.error(line, "Static dispatch to SELF_TYPE.".to_string());
            return Type::OBJECT;
        }
        if !self.graph.contains(type_name) {
            self.error(line, format!("Static dispatch to undefined class {}.", type_name));
            return Type::OBJECT;
        }
        if !self.env().compatible(receiver, Type::Class(type_name)) {
            self.error(
                line,
                format!(
                    "Expression type {} does not conform to declared static dispatch type {}.",
                    receiver, type_name
                ),
            );
            return Type::OBJECT;
        }
        self.check_call(type_name, method, args, receiver, line)
    }

    /// Look `method` up from `class` and match `args` against its formals.
    ///
    /// A `SELF_TYPE` return type becomes the receiver's type. Any failure
    /// types the call as `Object`.
    fn check_call(
        &mut self,
        class: Symbol,
        method: Symbol,
        args: &[Type],
        receiver: Type,
        line: u32,
    ) -> Type {
        let graph = self.graph;
        let Some(target) = graph.find_method(class, method) else {
            self.error(line, format!("Dispatch to undefined method {}.", method));
            return Type::OBJECT;
        };
        if target.formals.len() != args.len() {
            self.error(
                line,
                format!("Method {} called with wrong number of arguments.", method),
            );
            return Type::OBJECT;
        }

        let mut conforms = true;
        for (formal, &actual) in target.formals.iter().zip(args) {
            // Undefined formal types were reported with the declaring method.
            if !graph.contains(formal.type_decl) {
                continue;
            }
            let expected = Type::Class(formal.type_decl);
            if !self.env().compatible(actual, expected) {
                self.error(
                    line,
                    format!(
                        "In call of method {}, type {} of parameter {} does not conform to declared type {}.",
                        method, actual, formal.name, expected
                    ),
                );
                conforms = false;
            }
        }
        if !conforms {
            return Type::OBJECT;
        }

        match Type::from_name(target.return_type) {
            Type::SelfType => receiver,
            other => other,
        }
    }

    fn check_let(
        &mut self,
        name: Symbol,
        type_decl: Symbol,
        init: &Expr,
        body: &Expr,
        line: u32,
    ) -> Type {
        let errors_before = self.diagnostics.error_count();
        let init = self.check_expr(init);
        // An initializer that already failed is not compared again.
        let init_failed = self.diagnostics.error_count() > errors_before;

        let declared = match self.declared_type(type_decl) {
            Some(declared) => {
                if !init_failed && !self.env().compatible(init, declared) {
                    self.error(
                        line,
                        format!(
                            "Inferred type {} of initialization of {} does not conform to identifier's declared type {}.",
                            init, name, type_decl
                        ),
                    );
                }
                declared
            }
            None => {
                self.error(
                    line,
                    format!(
                        "Class {} of let-bound identifier {} is undefined.",
                        type_decl, name
                    ),
                );
                Type::OBJECT
            }
        };

        self.identifiers.enter_scope();
        if name == sym::SELF {
            self.error(line, "'self' cannot be bound in a 'let' expression.".to_string());
        } else {
            self.identifiers.bind(name, Binding::new(declared));
        }
        let body = self.check_expr(body);
        let unused = self
            .identifiers
            .probe_top(name)
            .is_some_and(|binding| !binding.used);
        if unused && !name.as_str().starts_with('_') {
            self.warning(line, format!("Let-bound identifier {} is never used.", name));
        }
        self.identifiers.exit_scope();
        body
    }

    /// Branches are checked in order. A branch whose declared type repeats an
    /// earlier one is reported and left out of the join.
    fn check_case(&mut self, branches: &[Branch], line: u32) -> Type {
        let mut seen: Vec<Symbol> = Vec::with_capacity(branches.len());
        let mut result: Option<Type> = None;

        for branch in branches {
            let declared = match self.declared_type(branch.type_decl) {
                Some(ty) => ty,
                None => {
                    self.error(
                        branch.line,
                        format!(
                            "Class {} of case branch is undefined.",
                            branch.type_decl
                        ),
                    );
                    Type::OBJECT
                }
            };

            self.identifiers.enter_scope();
            if branch.name == sym::SELF {
                self.error(branch.line, "'self' bound in 'case'.".to_string());
            } else {
                self.identifiers.bind(branch.name, Binding::exempt(declared));
            }
            let body = self.check_expr(&branch.body);
            self.identifiers.exit_scope();

            let key = if branch.type_decl == sym::SELF_TYPE {
                self.class_name()
            } else {
                branch.type_decl
            };
            if seen.contains(&key) {
                self.error(
                    branch.line,
                    format!("Duplicate branch {} in case statement.", branch.type_decl),
                );
                continue;
            }
            seen.push(key);
            result = Some(match result {
                None => body,
                Some(acc) => self.env().join(acc, body),
            });
        }

        result.unwrap_or_else(|| {
            self.error(line, "Case expression has no branches.".to_string());
            Type::OBJECT
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Type named by a declaration, with `SELF_TYPE` standing for the
    /// enclosing class. `None` if the name is not a known class.
    fn declared_type(&self, name: Symbol) -> Option<Type> {
        if name == sym::SELF_TYPE {
            Some(Type::Class(self.class_name()))
        } else if self.graph.contains(name) {
            Some(Type::Class(name))
        } else {
            None
        }
    }

    fn env(&self) -> TypeEnv<'g> {
        TypeEnv::new(self.graph, self.class_name())
    }

    fn class_name(&self) -> Symbol {
        self.current_class.map(|c| c.name).unwrap_or(sym::OBJECT)
    }

    fn span(&self, line: u32) -> Span {
        let file = self
            .current_class
            .map(|c| c.filename.as_str())
            .unwrap_or_default();
        Span::new(file, line)
    }

    fn error(&mut self, line: u32, message: String) {
        let span = self.span(line);
        self.diagnostics.error(message, span);
    }

    fn warning(&mut self, line: u32, message: String) {
        let span = self.span(line);
        self.diagnostics.warning(message, span);
    }
}
