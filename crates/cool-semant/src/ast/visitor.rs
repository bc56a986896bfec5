use super::nodes::*;

/// Visitor trait for walking the AST.
///
/// Default implementations walk children; override specific methods
/// to add behavior at particular node types.
pub trait Visitor {
    fn visit_program(&mut self, program: &Program) {
        for class in &program.classes {
            self.visit_class(class);
        }
    }

    fn visit_class(&mut self, class: &Class) {
        for feature in &class.features {
            match feature {
                Feature::Method(m) => self.visit_method(m),
                Feature::Attribute(a) => self.visit_attribute(a),
            }
        }
    }

    fn visit_method(&mut self, method: &Method) {
        self.visit_expr(&method.body);
    }

    fn visit_attribute(&mut self, attr: &Attribute) {
        self.visit_expr(&attr.init);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Visit every direct sub-expression of `expr`.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Assign { value, .. } => visitor.visit_expr(value),
        ExprKind::StaticDispatch { receiver, args, .. } | ExprKind::Dispatch { receiver, args, .. } => {
            visitor.visit_expr(receiver);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Cond {
            pred,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(pred);
            visitor.visit_expr(then_branch);
            visitor.visit_expr(else_branch);
        }
        ExprKind::Loop { pred, body } => {
            visitor.visit_expr(pred);
            visitor.visit_expr(body);
        }
        ExprKind::Block(body) => {
            for e in body {
                visitor.visit_expr(e);
            }
        }
        ExprKind::Let { init, body, .. } => {
            visitor.visit_expr(init);
            visitor.visit_expr(body);
        }
        ExprKind::Case { subject, branches } => {
            visitor.visit_expr(subject);
            for branch in branches {
                visitor.visit_expr(&branch.body);
            }
        }
        ExprKind::IsVoid(operand) | ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        ExprKind::New(_)
        | ExprKind::Int(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::Object(_)
        | ExprKind::NoExpr => {}
    }
}

/// Collects the line of every expression whose type slot is still empty.
#[derive(Debug, Default)]
pub struct UntypedExprs {
    pub lines: Vec<u32>,
}

impl Visitor for UntypedExprs {
    fn visit_expr(&mut self, expr: &Expr) {
        if expr.static_type().is_none() {
            self.lines.push(expr.line);
        }
        walk_expr(self, expr);
    }
}
