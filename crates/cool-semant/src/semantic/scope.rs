use std::collections::HashMap;

use cool_common::Symbol;

/// Stack of nested scopes for lexical scoping.
///
/// Each frame maps a name to whatever the table tracks for it (a declared
/// type for identifiers, a return type for methods). Frames are only ever
/// pushed and popped at the top, and lookups walk from the innermost frame
/// outward.
#[derive(Debug, Clone)]
pub struct SymbolTable<V> {
    frames: Vec<HashMap<Symbol, V>>,
}

impl<V> Default for SymbolTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SymbolTable<V> {
    /// An empty table with no frames; call [`enter_scope`](Self::enter_scope)
    /// before binding anything.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Push a new, empty frame.
    pub fn enter_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pop the innermost frame and discard its bindings.
    pub fn exit_scope(&mut self) {
        let popped = self.frames.pop();
        debug_assert!(popped.is_some(), "exit_scope without matching enter_scope");
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the innermost frame, replacing any binding there.
    pub fn bind(&mut self, name: Symbol, value: V) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name, value);
            }
            None => debug_assert!(false, "bind({}) with no open scope", name),
        }
    }

    /// Nearest binding of `name`, searching from the innermost frame out.
    pub fn lookup(&self, name: Symbol) -> Option<&V> {
        self.frames.iter().rev().find_map(|frame| frame.get(&name))
    }

    pub fn lookup_mut(&mut self, name: Symbol) -> Option<&mut V> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(&name))
    }

    /// Binding of `name` in the innermost frame only.
    pub fn probe_top(&self, name: Symbol) -> Option<&V> {
        self.frames.last().and_then(|frame| frame.get(&name))
    }

    /// Nearest binding of `name` in every frame except the innermost.
    pub fn probe_below_top(&self, name: Symbol) -> Option<&V> {
        let below = self.frames.len().saturating_sub(1);
        self.frames[..below]
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name))
    }
}
