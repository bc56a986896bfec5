use std::collections::{HashMap, HashSet};

use cool_common::{sym, Diagnostic, Span, Symbol};
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::ast::nodes::{Attribute, Class, Method};

use super::builtins::{basic_classes, is_basic_class, SEALED_CLASSES};

/// Dense index of a class inside an [`InheritanceGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A class declaration placed in the hierarchy.
#[derive(Debug, Clone)]
pub struct ClassNode {
    class: Class,
    parent: Option<ClassId>,
    children: Vec<ClassId>,
}

impl ClassNode {
    pub fn class(&self) -> &Class {
        &self.class
    }

    pub fn name(&self) -> Symbol {
        self.class.name
    }

    /// The parent named in the declaration, whether or not it exists.
    pub fn declared_parent(&self) -> Symbol {
        self.class.parent
    }

    /// The node this class is currently attached under.
    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    /// Attached children, in declaration order.
    pub fn children(&self) -> &[ClassId] {
        &self.children
    }

    pub fn span(&self) -> Span {
        Span::new(self.class.filename.as_str(), self.class.line)
    }
}

/// Structural problems with the class hierarchy. Any of these halts
/// analysis before type checking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("Illegal class name {name}.")]
    IllegalName { name: Symbol, span: Span },

    #[error("Class {name} was previously defined.")]
    Duplicate { name: Symbol, span: Span },

    #[error("Class {name} cannot inherit class SELF_TYPE.")]
    InheritsSelfType { name: Symbol, span: Span },

    #[error("Class {name} cannot inherit from basic class {parent}.")]
    InheritsSealed {
        name: Symbol,
        parent: Symbol,
        span: Span,
    },

    #[error("Class {name} inherits from an undefined class {parent}.")]
    UndefinedParent {
        name: Symbol,
        parent: Symbol,
        span: Span,
    },

    #[error("Class {name}, or an ancestor of {name}, is involved in an inheritance cycle.")]
    Cycle { name: Symbol, span: Span },
}

impl HierarchyError {
    pub fn span(&self) -> &Span {
        match self {
            HierarchyError::IllegalName { span, .. }
            | HierarchyError::Duplicate { span, .. }
            | HierarchyError::InheritsSelfType { span, .. }
            | HierarchyError::InheritsSealed { span, .. }
            | HierarchyError::UndefinedParent { span, .. }
            | HierarchyError::Cycle { span, .. } => span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string()).with_span(self.span().clone())
    }
}

/// Numeric identity of a class, consumed by code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassTag {
    pub name: Symbol,
    pub tag: u32,
}

/// Pre-order tag assignment over the validated tree: `Object` is 0 and
/// siblings follow declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassTags {
    tags: Vec<ClassTag>,
}

impl ClassTags {
    pub fn get(&self, name: Symbol) -> Option<u32> {
        self.tags.iter().find(|t| t.name == name).map(|t| t.tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// The class forest.
///
/// Classes may be inserted in any order: a class whose parent is not yet
/// known starts out as a root and is adopted when the parent arrives.
/// Nodes live in an arena and refer to each other by [`ClassId`], so a
/// cyclic declaration never produces an ownership cycle.
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    nodes: Vec<ClassNode>,
    by_name: HashMap<Symbol, ClassId>,
    roots: Vec<ClassId>,
    main: Option<ClassId>,
    rejected: Vec<HierarchyError>,
}

impl InheritanceGraph {
    /// An empty graph, without the built-in classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding the five built-in classes.
    pub fn with_basic_classes() -> Self {
        let mut graph = Self::new();
        for class in basic_classes() {
            // Built-ins are well-formed and distinct.
            let _ = graph.insert(class);
        }
        graph
    }

    /// Built-ins followed by `classes`, in order. Rejected declarations are
    /// kept and reported by [`validate`](Self::validate).
    pub fn build(classes: impl IntoIterator<Item = Class>) -> Self {
        let mut graph = Self::with_basic_classes();
        for class in classes {
            let _ = graph.insert(class);
        }
        debug!(
            "inheritance graph: {} classes, {} roots",
            graph.nodes.len(),
            graph.roots.len()
        );
        graph
    }

    /// Add one class to the forest.
    ///
    /// A class with an illegal name or a name already in the graph is
    /// dropped; the error is returned and also remembered for `validate`.
    pub fn insert(&mut self, class: Class) -> Result<ClassId, HierarchyError> {
        let name = class.name;
        let span = Span::new(class.filename.as_str(), class.line);

        if matches!(
            name,
            sym::SELF_TYPE | sym::NO_CLASS | sym::NO_TYPE | sym::PRIM_SLOT
        ) {
            return Err(self.reject(HierarchyError::IllegalName { name, span }));
        }
        if self.by_name.contains_key(&name) {
            return Err(self.reject(HierarchyError::Duplicate { name, span }));
        }

        let id = ClassId(self.nodes.len() as u32);
        let parent_name = class.parent;
        self.nodes.push(ClassNode {
            class,
            parent: None,
            children: Vec::new(),
        });
        self.by_name.insert(name, id);
        if name == sym::MAIN {
            self.main = Some(id);
        }

        match self.by_name.get(&parent_name) {
            Some(&parent) if parent_name != sym::SELF_TYPE => self.attach(id, parent),
            _ => self.roots.push(id),
        }

        // Adopt any root that was waiting for this class as its parent.
        let adopted: Vec<ClassId> = self
            .roots
            .iter()
            .copied()
            .filter(|&root| root != id && self.nodes[root.index()].class.parent == name)
            .collect();
        if !adopted.is_empty() {
            self.roots.retain(|root| !adopted.contains(root));
            for child in adopted {
                self.attach(child, id);
            }
        }

        // Adoption may have closed a loop through `id`; keep the loop visible
        // as a root so it is not lost from the forest.
        if !self.roots.contains(&id) && self.loops_back(id) {
            self.roots.push(id);
        }

        debug!("inserted class {} (parent {})", name, parent_name);
        Ok(id)
    }

    fn reject(&mut self, error: HierarchyError) -> HierarchyError {
        debug!("rejected class: {}", error);
        self.rejected.push(error.clone());
        error
    }

    fn attach(&mut self, child: ClassId, parent: ClassId) {
        self.nodes[child.index()].parent = Some(parent);
        let siblings = &mut self.nodes[parent.index()].children;
        let at = siblings.partition_point(|&sibling| sibling < child);
        siblings.insert(at, child);
    }

    /// Whether following attached parents from `start` returns to `start`.
    fn loops_back(&self, start: ClassId) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.nodes[start.index()].parent;
        while let Some(id) = current {
            if id == start {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.nodes[id.index()].parent;
        }
        false
    }

    /// Whether `start` lies on a cycle of declared parent links.
    fn on_declared_cycle(&self, start: ClassId) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.nodes[start.index()].class.parent;
        while let Some(&id) = self.by_name.get(&current) {
            if id == start {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.nodes[id.index()].class.parent;
        }
        false
    }

    /// Check that the graph is a single tree rooted at `Object`.
    ///
    /// Every class is checked and the first applicable problem per class is
    /// reported; errors from dropped declarations come first.
    pub fn validate(&self) -> Result<(), Vec<HierarchyError>> {
        let mut errors = self.rejected.clone();

        for node in &self.nodes {
            let name = node.name();
            let parent = node.declared_parent();
            if name == sym::OBJECT && parent == sym::NO_CLASS {
                continue;
            }
            let span = node.span();
            let id = self.by_name[&name];

            if parent == sym::SELF_TYPE {
                errors.push(HierarchyError::InheritsSelfType { name, span });
            } else if SEALED_CLASSES.contains(&parent) {
                errors.push(HierarchyError::InheritsSealed { name, parent, span });
            } else if !self.by_name.contains_key(&parent) {
                errors.push(HierarchyError::UndefinedParent { name, parent, span });
            } else if self.on_declared_cycle(id) {
                errors.push(HierarchyError::Cycle { name, span });
            }
        }

        if errors.is_empty() && self.roots.len() != 1 {
            for &root in &self.roots {
                let node = &self.nodes[root.index()];
                if node.name() != sym::OBJECT {
                    errors.push(HierarchyError::Cycle {
                        name: node.name(),
                        span: node.span(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn id_of(&self, name: Symbol) -> Option<ClassId> {
        self.by_name.get(&name).copied()
    }

    pub fn node(&self, id: ClassId) -> &ClassNode {
        &self.nodes[id.index()]
    }

    pub fn find(&self, name: Symbol) -> Option<&ClassNode> {
        self.id_of(name).map(|id| self.node(id))
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.by_name.contains_key(&name)
    }

    /// The current forest roots, in insertion order.
    pub fn roots(&self) -> &[ClassId] {
        &self.roots
    }

    /// The root of a validated graph.
    pub fn root(&self) -> Option<ClassId> {
        self.id_of(sym::OBJECT)
    }

    pub fn main_class(&self) -> Option<&ClassNode> {
        self.main.map(|id| self.node(id))
    }

    /// All classes, in insertion order (built-ins first).
    pub fn classes(&self) -> impl Iterator<Item = &ClassNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `class` followed by its ancestors by declared parent, nearest first.
    /// Stops at an unknown parent and never revisits a class.
    fn lineage(&self, class: Symbol) -> Vec<&ClassNode> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = class;
        while let Some(id) = self.id_of(current) {
            if !seen.insert(id) {
                break;
            }
            let node = self.node(id);
            chain.push(node);
            current = node.declared_parent();
        }
        chain
    }

    /// Nearest declaration of `method` in `class` or its ancestors.
    pub fn find_method(&self, class: Symbol, method: Symbol) -> Option<&Method> {
        self.lineage(class)
            .into_iter()
            .find_map(|node| node.class.find_method(method))
    }

    /// Nearest declaration of `attr` in `class` or its ancestors.
    pub fn find_attribute(&self, class: Symbol, attr: Symbol) -> Option<&Attribute> {
        self.lineage(class)
            .into_iter()
            .find_map(|node| node.class.find_attribute(attr))
    }

    /// Ancestor chain of `class` from `Object` down to `class` itself.
    ///
    /// Names the graph does not know are treated as direct children of
    /// `Object`, so queries on erroneous programs stay total.
    pub fn ancestors(&self, class: Symbol) -> Vec<Symbol> {
        let mut chain: Vec<Symbol> = self.lineage(class).iter().map(|n| n.name()).collect();
        if chain.is_empty() {
            chain.push(class);
        }
        if chain.last() != Some(&sym::OBJECT) {
            chain.push(sym::OBJECT);
        }
        chain.reverse();
        chain
    }

    /// Whether `ancestor` appears on the ancestor chain of `class`.
    pub fn inherits_from(&self, class: Symbol, ancestor: Symbol) -> bool {
        self.ancestors(class).contains(&ancestor)
    }

    /// Assign dense tags by pre-order traversal from `Object`.
    pub fn assign_tags(&self) -> ClassTags {
        let mut tags = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<ClassId> = self.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            tags.push(ClassTag {
                name: node.name(),
                tag: tags.len() as u32,
            });
            stack.extend(node.children.iter().rev());
        }
        debug!("assigned {} class tags", tags.len());
        ClassTags { tags }
    }

    /// The user-declared classes, in input order, giving up the graph.
    pub fn into_user_classes(self) -> Vec<Class> {
        self.nodes
            .into_iter()
            .filter(|n| !(is_basic_class(n.class.name) && n.class.filename == sym::BASIC_CLASS_FILE))
            .map(|n| n.class)
            .collect()
    }
}
