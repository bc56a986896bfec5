pub mod builtins;
pub mod collector;
pub mod hierarchy;
pub mod resolver;
pub mod scope;
pub mod type_checker;
pub mod types;
pub mod validator;

use cool_common::{Diagnostic, DiagnosticBag};
use log::debug;
use thiserror::Error;

use crate::ast::nodes::{Class, Program};

pub use hierarchy::{ClassTag, ClassTags, HierarchyError, InheritanceGraph};
pub use types::{Type, TypeEnv};

/// Which phase stopped the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltStage {
    /// The class hierarchy is malformed; no feature or expression was checked.
    Hierarchy,
    /// Feature or expression checking found errors.
    Semantic,
}

/// Analysis stopped because of static semantic errors.
#[derive(Debug, Error)]
#[error("Compilation halted due to static semantic errors.")]
pub struct Halt {
    pub stage: HaltStage,
    pub diagnostics: DiagnosticBag,
}

/// A program that passed every check, with all expressions decorated.
#[derive(Debug)]
pub struct Analysis {
    graph: InheritanceGraph,
    tags: ClassTags,
    diagnostics: DiagnosticBag,
}

impl Analysis {
    pub fn graph(&self) -> &InheritanceGraph {
        &self.graph
    }

    pub fn tags(&self) -> &ClassTags {
        &self.tags
    }

    /// Non-fatal diagnostics gathered along the way.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    /// The user classes, in input order, without the built-ins.
    pub fn into_program(self) -> Program {
        Program {
            classes: self.graph.into_user_classes(),
        }
    }

    pub fn into_parts(self) -> (Vec<Class>, ClassTags) {
        (self.graph.into_user_classes(), self.tags)
    }
}

/// Run all semantic analysis passes on the given program.
///
/// The analysis performs:
///  1. Inheritance graph construction and validation (halts on error)
///  2. Entry-point validation (class `Main` with a `main` method)
///  3. Definition collection (redeclarations and override signatures)
///  4. Type checking, which writes the static type of every expression
///
/// Errors from passes 2-4 are accumulated and halt the analysis together.
pub fn analyze(program: Program) -> Result<Analysis, Halt> {
    let graph = InheritanceGraph::build(program.classes);

    // Pass 1: the hierarchy must be a single tree before anything else runs.
    if let Err(errors) = graph.validate() {
        debug!("hierarchy rejected with {} errors", errors.len());
        let mut diagnostics = DiagnosticBag::new();
        for error in &errors {
            diagnostics.report(error.to_diagnostic());
        }
        return Err(Halt {
            stage: HaltStage::Hierarchy,
            diagnostics,
        });
    }

    let mut diagnostics = DiagnosticBag::new();

    // Pass 2
    diagnostics.extend(validator::Validator::new().validate(&graph));

    // Pass 3, with fresh symbol tables.
    diagnostics.extend(collector::DefinitionCollector::new(&graph).collect());

    // Pass 4, with fresh symbol tables again.
    diagnostics.extend(resolver::Resolver::new(&graph).resolve());

    if diagnostics.has_errors() {
        debug!("semantic analysis failed with {} errors", diagnostics.error_count());
        return Err(Halt {
            stage: HaltStage::Semantic,
            diagnostics,
        });
    }

    let tags = graph.assign_tags();
    Ok(Analysis {
        graph,
        tags,
        diagnostics,
    })
}
