//! Lexical scope tracking.
//!
//! Scopes live in an arena owned by one [`ScopeTracker`]; each scope stores
//! the index of its parent, so resolving a name is a walk up a chain of
//! indices. The implicit global scope is never represented: a name is bound
//! only if some scope between the current one and the program scope declares
//! it.

use std::collections::HashMap;
use swc_ecma_ast::{ObjectPatProp, Pat};

/// Index of a scope in its tracker's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The program scope every tracker starts in.
    pub const PROGRAM: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    /// `function` bodies, methods, accessors and static blocks.
    Function,
    Arrow,
    Block,
    Catch,
    Class,
}

impl ScopeKind {
    /// Whether `var` declarations stop here.
    pub fn is_var_boundary(self) -> bool {
        matches!(self, ScopeKind::Program | ScopeKind::Function | ScopeKind::Arrow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Param,
    Var,
    /// `let`, `const` and `using`.
    Lexical,
    Function,
    Class,
    /// A name produced by an object or array pattern.
    Destructured,
    Catch,
    /// `arguments` inside non-arrow functions.
    Implicit,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    bindings: HashMap<String, BindingKind>,
}

/// Tree of scopes for one rewrite.
#[derive(Debug)]
pub struct ScopeTracker {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Program,
                parent: None,
                bindings: HashMap::new(),
            }],
            current: ScopeId::PROGRAM,
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Push a child of the current scope and make it current.
    pub fn enter_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent: Some(self.current),
            bindings: HashMap::new(),
        });
        self.current = id;
        id
    }

    /// Return to the parent of the current scope. Leaving the program scope
    /// is a no-op.
    pub fn leave_scope(&mut self) {
        match self.scope(self.current).parent {
            Some(parent) => self.current = parent,
            None => log::warn!("attempted to leave the program scope"),
        }
    }

    /// Bind `name` in the current scope. Returns `false` if the scope already
    /// had it; the first kind is kept.
    pub fn declare(&mut self, name: &str, kind: BindingKind) -> bool {
        self.declare_in(self.current, name, kind)
    }

    /// Bind `name` in the nearest enclosing function, arrow or program scope,
    /// the way `var` is hoisted.
    pub fn declare_hoisted(&mut self, name: &str, kind: BindingKind) -> bool {
        self.declare_in(self.var_scope(), name, kind)
    }

    /// The scope a `var` declared here belongs to.
    fn var_scope(&self) -> ScopeId {
        let mut id = self.current;
        while !self.scope(id).kind.is_var_boundary() {
            match self.scope(id).parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    fn declare_in(&mut self, id: ScopeId, name: &str, kind: BindingKind) -> bool {
        let scope = &mut self.scopes[id.0 as usize];
        if scope.bindings.contains_key(name) {
            return false;
        }
        scope.bindings.insert(name.to_string(), kind);
        true
    }

    /// Bind every name a declaration pattern introduces. A plain identifier
    /// gets `kind`; names nested in object or array patterns are
    /// [`BindingKind::Destructured`]. Default values and computed keys are
    /// not visited.
    pub fn declare_pat(&mut self, pat: &Pat, kind: BindingKind) {
        self.declare_pat_in(self.current, pat, kind);
    }

    /// [`declare_pat`](Self::declare_pat) into the scope `var` hoists to.
    pub fn declare_pat_hoisted(&mut self, pat: &Pat, kind: BindingKind) {
        self.declare_pat_in(self.var_scope(), pat, kind);
    }

    fn declare_pat_in(&mut self, id: ScopeId, pat: &Pat, kind: BindingKind) {
        match pat {
            Pat::Ident(binding) => {
                self.declare_in(id, &binding.id.sym, kind);
            }
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.declare_pat_in(id, elem, BindingKind::Destructured);
                }
            }
            Pat::Rest(rest) => self.declare_pat_in(id, &rest.arg, kind),
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => {
                            self.declare_pat_in(id, &kv.value, BindingKind::Destructured)
                        }
                        ObjectPatProp::Assign(assign) => {
                            self.declare_in(id, &assign.key.id.sym, BindingKind::Destructured);
                        }
                        ObjectPatProp::Rest(rest) => {
                            self.declare_pat_in(id, &rest.arg, BindingKind::Destructured)
                        }
                    }
                }
            }
            Pat::Assign(assign) => self.declare_pat_in(id, &assign.left, kind),
            // Expression targets only appear in assignments, never in declarations
            Pat::Invalid(_) | Pat::Expr(_) => {}
        }
    }

    /// Resolve `name` from the current scope outward.
    pub fn lookup(&self, name: &str) -> Option<BindingKind> {
        let mut id = Some(self.current);
        while let Some(scope_id) = id {
            let scope = self.scope(scope_id);
            if let Some(&kind) = scope.bindings.get(name) {
                return Some(kind);
            }
            id = scope.parent;
        }
        None
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindpath_diagnostics::SourceCache;
    use bindpath_parser::parse_script_with_cache;
    use swc_ecma_ast::{Decl, Stmt};

    fn first_declarator_pat(source: &str) -> Pat {
        let mut cache = SourceCache::new();
        let parsed = parse_script_with_cache(source, "scope.js", &mut cache).unwrap();
        match parsed.script.body.into_iter().next() {
            Some(Stmt::Decl(Decl::Var(var))) => var.decls.into_iter().next().unwrap().name,
            other => panic!("expected a variable declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_program_scope_is_root() {
        let scopes = ScopeTracker::new();
        assert_eq!(scopes.current(), ScopeId::PROGRAM);
        assert!(!scopes.is_bound("item"));
    }

    #[test]
    fn test_inner_scope_sees_outer_bindings() {
        let mut scopes = ScopeTracker::new();
        scopes.enter_scope(ScopeKind::Function);
        scopes.declare("item", BindingKind::Param);
        scopes.enter_scope(ScopeKind::Arrow);
        scopes.declare("index", BindingKind::Param);

        assert!(scopes.is_bound("item"));
        assert!(scopes.is_bound("index"));

        scopes.leave_scope();
        assert!(scopes.is_bound("item"));
        assert!(!scopes.is_bound("index"));

        scopes.leave_scope();
        assert!(!scopes.is_bound("item"));
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut scopes = ScopeTracker::new();
        scopes.enter_scope(ScopeKind::Function);
        scopes.declare("item", BindingKind::Param);
        scopes.enter_scope(ScopeKind::Catch);
        scopes.declare("item", BindingKind::Catch);

        assert_eq!(scopes.lookup("item"), Some(BindingKind::Catch));
        scopes.leave_scope();
        assert_eq!(scopes.lookup("item"), Some(BindingKind::Param));
    }

    #[test]
    fn test_duplicate_declaration_keeps_first_kind() {
        let mut scopes = ScopeTracker::new();
        assert!(scopes.declare("a", BindingKind::Var));
        assert!(!scopes.declare("a", BindingKind::Function));
        assert_eq!(scopes.lookup("a"), Some(BindingKind::Var));
    }

    #[test]
    fn test_leave_program_scope_is_noop() {
        let mut scopes = ScopeTracker::new();
        scopes.leave_scope();
        assert_eq!(scopes.current(), ScopeId::PROGRAM);
    }

    #[test]
    fn test_sibling_scopes_are_independent() {
        let mut scopes = ScopeTracker::new();
        let first = scopes.enter_scope(ScopeKind::Block);
        scopes.declare("x", BindingKind::Lexical);
        scopes.leave_scope();
        let second = scopes.enter_scope(ScopeKind::Block);

        assert_ne!(first, second);
        assert!(!scopes.is_bound("x"));
    }

    #[test]
    fn test_declare_destructuring_pattern() {
        let pat = first_declarator_pat("var { a, b: [c, , ...d], e = 1, ...f } = src;");
        let mut scopes = ScopeTracker::new();
        scopes.declare_pat(&pat, BindingKind::Var);

        for name in ["a", "c", "d", "e", "f"] {
            assert_eq!(
                scopes.lookup(name),
                Some(BindingKind::Destructured),
                "{name} should be bound"
            );
        }
        // keys and defaults are not bindings
        assert!(!scopes.is_bound("b"));
        assert!(!scopes.is_bound("src"));
    }

    #[test]
    fn test_declare_plain_and_defaulted_identifier() {
        let pat = first_declarator_pat("var item = 1;");
        let mut scopes = ScopeTracker::new();
        scopes.declare_pat(&pat, BindingKind::Var);
        assert_eq!(scopes.lookup("item"), Some(BindingKind::Var));
    }

    #[test]
    fn test_hoisted_declaration_skips_blocks() {
        let mut scopes = ScopeTracker::new();
        let function = scopes.enter_scope(ScopeKind::Function);
        scopes.enter_scope(ScopeKind::Block);
        scopes.enter_scope(ScopeKind::Catch);
        scopes.declare_hoisted("total", BindingKind::Var);

        scopes.leave_scope();
        scopes.leave_scope();
        assert_eq!(scopes.current(), function);
        assert_eq!(scopes.lookup("total"), Some(BindingKind::Var));
    }

    #[test]
    fn test_hoisted_pattern_skips_blocks() {
        let pat = first_declarator_pat("var [first, { id }] = rows;");
        let mut scopes = ScopeTracker::new();
        scopes.enter_scope(ScopeKind::Arrow);
        scopes.enter_scope(ScopeKind::Block);
        scopes.declare_pat_hoisted(&pat, BindingKind::Var);
        assert!(scopes.is_bound("first"));

        scopes.leave_scope();
        assert_eq!(scopes.lookup("first"), Some(BindingKind::Destructured));
        assert_eq!(scopes.lookup("id"), Some(BindingKind::Destructured));

        scopes.leave_scope();
        assert!(!scopes.is_bound("first"));
        assert!(!scopes.is_bound("id"));
    }

    #[test]
    fn test_var_boundaries() {
        assert!(ScopeKind::Program.is_var_boundary());
        assert!(ScopeKind::Function.is_var_boundary());
        assert!(ScopeKind::Arrow.is_var_boundary());
        assert!(!ScopeKind::Block.is_var_boundary());
        assert!(!ScopeKind::Catch.is_var_boundary());
    }
}
