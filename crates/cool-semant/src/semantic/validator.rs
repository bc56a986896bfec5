use cool_common::{sym, Diagnostic, DiagnosticBag};

use super::hierarchy::InheritanceGraph;

/// Entry-point validation.
///
/// A program needs a class `Main` that itself declares a `main` method
/// taking no arguments. Problems are reported but never halt on their own.
pub struct Validator {
    diagnostics: DiagnosticBag,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self {
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Run validation on the graph and return diagnostics.
    pub fn validate(mut self, graph: &InheritanceGraph) -> DiagnosticBag {
        self.check_main(graph);
        self.diagnostics
    }

    fn check_main(&mut self, graph: &InheritanceGraph) {
        let Some(main) = graph.main_class() else {
            self.diagnostics
                .report(Diagnostic::error("Class Main is not defined."));
            return;
        };

        match main.class().find_method(sym::MAIN_METHOD) {
            None => self
                .diagnostics
                .error("No 'main' method in class Main.", main.span()),
            Some(method) if !method.formals.is_empty() => self.diagnostics.error(
                "'main' method in class Main should have no arguments.",
                main.span(),
            ),
            Some(_) => {}
        }
    }
}
