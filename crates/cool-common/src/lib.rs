pub mod errors;
pub mod manifest;
pub mod span;
pub mod symbol;

pub use errors::{Diagnostic, DiagnosticBag, Severity};
pub use span::Span;
pub use symbol::{sym, Symbol};
