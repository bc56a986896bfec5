/// A source location: the file a node came from and its 1-based line.
///
/// The parser only tracks lines, so that is all a span carries. Built-in
/// classes use the `<basic class>` pseudo-file and line 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    /// Source file path as recorded on the enclosing class.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl Span {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
