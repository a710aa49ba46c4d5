//! The rewrite pass.
//!
//! One [`Rewriter`] walks a parsed script in source order. Binding sites are
//! declared in its [`ScopeTracker`] before the code that can see them is
//! visited; every identifier in a reading position is then classified as
//! bound, excluded or free, and each free one is replaced together with the
//! longest static chain of accesses hanging off it.

use crate::error::WarningKind;
use crate::options::ResolvedOptions;
use crate::path::{receiver_member, tracking_call, BindingPath, Segment};
use crate::scope::{BindingKind, ScopeKind, ScopeTracker};
use swc_atoms::Atom;
use swc_common::{util::take::Take, EqIgnoreSpan, Span, Spanned, DUMMY_SP};
use swc_ecma_ast::*;

/// A sub-tree that was left as written, with its span in the parsed script.
#[derive(Debug, Clone)]
pub(crate) struct RawWarning {
    pub kind: WarningKind,
    pub message: String,
    pub span: Span,
}

/// Everything a rewrite reports besides the mutated tree.
#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub prop_keys: Vec<String>,
    pub warnings: Vec<RawWarning>,
    /// Number of tracking calls emitted.
    pub units: usize,
}

/// Rewrite `script` in place.
pub(crate) fn rewrite_script(options: &ResolvedOptions, script: &mut Script) -> RewriteOutcome {
    let mut rewriter = Rewriter::new(options);
    rewriter.declare_body(&script.body);
    rewriter.rewrite_stmts(&mut script.body);
    rewriter.outcome
}

struct Rewriter<'a> {
    options: &'a ResolvedOptions,
    scopes: ScopeTracker,
    depth: usize,
    /// Number of collection regions the traversal is inside.
    collecting: usize,
    outcome: RewriteOutcome,
}

impl<'a> Rewriter<'a> {
    fn new(options: &'a ResolvedOptions) -> Self {
        Self {
            options,
            scopes: ScopeTracker::new(),
            depth: 0,
            collecting: 0,
            outcome: RewriteOutcome::default(),
        }
    }

    fn is_free(&self, name: &str) -> bool {
        !self.scopes.is_bound(name) && !self.options.exclusions.contains(name)
    }

    fn warn(&mut self, kind: WarningKind, span: Span, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{:?} at {:?}: {}", kind, span, message);
        self.outcome.warnings.push(RawWarning {
            kind,
            message,
            span,
        });
    }

    fn unsupported(&mut self, span: Span, what: &str) {
        self.warn(
            WarningKind::UnsupportedConstruct,
            span,
            format!("{what} left unmodified"),
        );
    }

    /// Step one level down, or report the sub-tree at `span` if that would
    /// pass `max_depth`.
    fn enter(&mut self, span: Span) -> bool {
        if self.depth >= self.options.max_depth {
            self.warn(
                WarningKind::DepthLimit,
                span,
                format!(
                    "nesting deeper than {} levels left unmodified",
                    self.options.max_depth
                ),
            );
            return false;
        }
        self.depth += 1;
        true
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    fn in_scope<R>(&mut self, kind: ScopeKind, f: impl FnOnce(&mut Self) -> R) -> R {
        let id = self.scopes.enter_scope(kind);
        let result = f(self);
        debug_assert_eq!(self.scopes.current(), id, "unbalanced scopes");
        self.scopes.leave_scope();
        result
    }

    // ---- declarations -------------------------------------------------

    /// Declare everything a function or program body binds up front.
    fn declare_body(&mut self, stmts: &[Stmt]) {
        self.declare_lexical(stmts);
        for stmt in stmts {
            self.hoist_vars(stmt);
        }
    }

    /// `let`, `const`, `using`, classes and functions declared directly in a
    /// statement list.
    fn declare_lexical(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            let Stmt::Decl(decl) = stmt else { continue };
            match decl {
                Decl::Var(var) if var.kind != VarDeclKind::Var => {
                    for declarator in &var.decls {
                        self.scopes.declare_pat(&declarator.name, BindingKind::Lexical);
                    }
                }
                Decl::Using(using) => {
                    for declarator in &using.decls {
                        self.scopes.declare_pat(&declarator.name, BindingKind::Lexical);
                    }
                }
                Decl::Class(class) => {
                    self.scopes.declare(&class.ident.sym, BindingKind::Class);
                }
                Decl::Fn(function) => {
                    self.scopes.declare(&function.ident.sym, BindingKind::Function);
                }
                _ => {}
            }
        }
    }

    /// Declare `var`s and nested function declarations in the enclosing
    /// function or program scope. Does not enter functions.
    fn hoist_vars(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(Decl::Var(var)) => self.hoist_var_decl(var),
            Stmt::Decl(Decl::Fn(function)) => {
                self.scopes
                    .declare_hoisted(&function.ident.sym, BindingKind::Function);
            }
            Stmt::Block(block) => block.stmts.iter().for_each(|s| self.hoist_vars(s)),
            Stmt::If(if_stmt) => {
                self.hoist_vars(&if_stmt.cons);
                if let Some(alt) = &if_stmt.alt {
                    self.hoist_vars(alt);
                }
            }
            Stmt::For(for_stmt) => {
                if let Some(VarDeclOrExpr::VarDecl(var)) = &for_stmt.init {
                    self.hoist_var_decl(var);
                }
                self.hoist_vars(&for_stmt.body);
            }
            Stmt::ForIn(for_in) => {
                if let ForHead::VarDecl(var) = &for_in.left {
                    self.hoist_var_decl(var);
                }
                self.hoist_vars(&for_in.body);
            }
            Stmt::ForOf(for_of) => {
                if let ForHead::VarDecl(var) = &for_of.left {
                    self.hoist_var_decl(var);
                }
                self.hoist_vars(&for_of.body);
            }
            Stmt::While(while_stmt) => self.hoist_vars(&while_stmt.body),
            Stmt::DoWhile(do_while) => self.hoist_vars(&do_while.body),
            Stmt::Labeled(labeled) => self.hoist_vars(&labeled.body),
            Stmt::With(with) => self.hoist_vars(&with.body),
            Stmt::Try(try_stmt) => {
                try_stmt.block.stmts.iter().for_each(|s| self.hoist_vars(s));
                if let Some(handler) = &try_stmt.handler {
                    handler.body.stmts.iter().for_each(|s| self.hoist_vars(s));
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    finalizer.stmts.iter().for_each(|s| self.hoist_vars(s));
                }
            }
            Stmt::Switch(switch) => {
                for case in &switch.cases {
                    case.cons.iter().for_each(|s| self.hoist_vars(s));
                }
            }
            _ => {}
        }
    }

    fn hoist_var_decl(&mut self, var: &VarDecl) {
        if var.kind == VarDeclKind::Var {
            for declarator in &var.decls {
                self.scopes
                    .declare_pat_hoisted(&declarator.name, BindingKind::Var);
            }
        }
    }

    // ---- statements ---------------------------------------------------

    fn rewrite_stmts(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.rewrite_stmt(stmt);
        }
    }

    fn rewrite_stmt(&mut self, stmt: &mut Stmt) {
        if !self.enter(stmt.span()) {
            return;
        }
        match stmt {
            Stmt::Block(block) => self.rewrite_block(block),
            Stmt::Empty(_) | Stmt::Debugger(_) | Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::With(with) => {
                self.rewrite_expr(&mut with.obj);
                // names inside may resolve to properties of the object
                self.unsupported(with.body.span(), "`with` body");
            }
            Stmt::Return(ret) => {
                if let Some(arg) = &mut ret.arg {
                    self.rewrite_expr(arg);
                }
            }
            Stmt::Labeled(labeled) => self.rewrite_stmt(&mut labeled.body),
            Stmt::If(if_stmt) => {
                self.rewrite_expr(&mut if_stmt.test);
                self.rewrite_stmt(&mut if_stmt.cons);
                if let Some(alt) = &mut if_stmt.alt {
                    self.rewrite_stmt(alt);
                }
            }
            Stmt::Switch(switch) => {
                self.rewrite_expr(&mut switch.discriminant);
                self.in_scope(ScopeKind::Block, |this| {
                    for case in &switch.cases {
                        this.declare_lexical(&case.cons);
                    }
                    for case in &mut switch.cases {
                        if let Some(test) = &mut case.test {
                            this.rewrite_expr(test);
                        }
                        this.rewrite_stmts(&mut case.cons);
                    }
                });
            }
            Stmt::Throw(throw) => self.rewrite_expr(&mut throw.arg),
            Stmt::Try(try_stmt) => {
                self.rewrite_block(&mut try_stmt.block);
                if let Some(handler) = &mut try_stmt.handler {
                    self.rewrite_catch(handler);
                }
                if let Some(finalizer) = &mut try_stmt.finalizer {
                    self.rewrite_block(finalizer);
                }
            }
            Stmt::While(while_stmt) => {
                self.rewrite_expr(&mut while_stmt.test);
                self.rewrite_stmt(&mut while_stmt.body);
            }
            Stmt::DoWhile(do_while) => {
                self.rewrite_stmt(&mut do_while.body);
                self.rewrite_expr(&mut do_while.test);
            }
            Stmt::For(for_stmt) => self.in_scope(ScopeKind::Block, |this| {
                match &mut for_stmt.init {
                    Some(VarDeclOrExpr::VarDecl(var)) => {
                        this.declare_loop_var(var);
                        this.rewrite_var_decl(var);
                    }
                    Some(VarDeclOrExpr::Expr(init)) => this.rewrite_expr(init),
                    None => {}
                }
                if let Some(test) = &mut for_stmt.test {
                    this.rewrite_expr(test);
                }
                if let Some(update) = &mut for_stmt.update {
                    this.rewrite_expr(update);
                }
                this.rewrite_stmt(&mut for_stmt.body);
            }),
            Stmt::ForIn(for_in) => self.in_scope(ScopeKind::Block, |this| {
                this.rewrite_for_head(&mut for_in.left);
                this.rewrite_expr(&mut for_in.right);
                this.rewrite_stmt(&mut for_in.body);
            }),
            Stmt::ForOf(for_of) => self.in_scope(ScopeKind::Block, |this| {
                this.rewrite_for_head(&mut for_of.left);
                this.rewrite_expr(&mut for_of.right);
                this.rewrite_stmt(&mut for_of.body);
            }),
            Stmt::Decl(decl) => self.rewrite_decl(decl),
            Stmt::Expr(expr_stmt) => self.rewrite_expr(&mut expr_stmt.expr),
        }
        self.exit();
    }

    fn rewrite_block(&mut self, block: &mut BlockStmt) {
        self.in_scope(ScopeKind::Block, |this| {
            this.declare_lexical(&block.stmts);
            this.rewrite_stmts(&mut block.stmts);
        });
    }

    fn rewrite_catch(&mut self, clause: &mut CatchClause) {
        self.in_scope(ScopeKind::Catch, |this| {
            if let Some(param) = &mut clause.param {
                this.scopes.declare_pat(param, BindingKind::Catch);
                this.rewrite_pat(param);
            }
            this.rewrite_block(&mut clause.body);
        });
    }

    /// `let`/`const` in a loop head belong to the loop's own scope.
    fn declare_loop_var(&mut self, var: &VarDecl) {
        if var.kind != VarDeclKind::Var {
            for declarator in &var.decls {
                self.scopes.declare_pat(&declarator.name, BindingKind::Lexical);
            }
        }
    }

    fn rewrite_for_head(&mut self, head: &mut ForHead) {
        match head {
            ForHead::VarDecl(var) => {
                self.declare_loop_var(var);
                self.rewrite_var_decl(var);
            }
            ForHead::UsingDecl(using) => {
                for declarator in &mut using.decls {
                    self.scopes.declare_pat(&declarator.name, BindingKind::Lexical);
                    self.rewrite_declarator(declarator);
                }
            }
            ForHead::Pat(pat) => self.rewrite_pat(pat),
        }
    }

    fn rewrite_decl(&mut self, decl: &mut Decl) {
        match decl {
            // names were declared when the enclosing body or block was entered
            Decl::Class(class) => self.rewrite_class(&mut class.class, None),
            Decl::Fn(function) => self.rewrite_function(&mut function.function, None),
            Decl::Var(var) => self.rewrite_var_decl(var),
            Decl::Using(using) => {
                for declarator in &mut using.decls {
                    self.rewrite_declarator(declarator);
                }
            }
            Decl::TsInterface(_) | Decl::TsTypeAlias(_) | Decl::TsEnum(_) | Decl::TsModule(_) => {
                self.unsupported(decl.span(), "TypeScript declaration")
            }
        }
    }

    fn rewrite_var_decl(&mut self, var: &mut VarDecl) {
        for declarator in &mut var.decls {
            self.rewrite_declarator(declarator);
        }
    }

    fn rewrite_declarator(&mut self, declarator: &mut VarDeclarator) {
        self.rewrite_pat(&mut declarator.name);
        if let Some(init) = &mut declarator.init {
            self.rewrite_expr(init);
        }
    }

    // ---- functions and classes ----------------------------------------

    /// Rewrite a function whose own name, if it binds one inside, is `name`.
    fn rewrite_function(&mut self, function: &mut Function, name: Option<&Atom>) {
        self.in_scope(ScopeKind::Function, |this| {
            if let Some(name) = name {
                this.scopes.declare(name, BindingKind::Function);
            }
            this.scopes.declare("arguments", BindingKind::Implicit);
            for param in &function.params {
                this.scopes.declare_pat(&param.pat, BindingKind::Param);
            }
            for param in &mut function.params {
                this.rewrite_pat(&mut param.pat);
            }
            if let Some(body) = &mut function.body {
                this.declare_body(&body.stmts);
                this.rewrite_stmts(&mut body.stmts);
            }
        });
    }

    fn rewrite_arrow(&mut self, arrow: &mut ArrowExpr) {
        self.in_scope(ScopeKind::Arrow, |this| {
            for param in &arrow.params {
                this.scopes.declare_pat(param, BindingKind::Param);
            }
            for param in &mut arrow.params {
                this.rewrite_pat(param);
            }
            match &mut *arrow.body {
                BlockStmtOrExpr::BlockStmt(body) => {
                    this.declare_body(&body.stmts);
                    this.rewrite_stmts(&mut body.stmts);
                }
                BlockStmtOrExpr::Expr(body) => this.rewrite_expr(body),
            }
        });
    }

    fn rewrite_class(&mut self, class: &mut Class, name: Option<&Atom>) {
        if let Some(super_class) = &mut class.super_class {
            self.rewrite_expr(super_class);
        }
        self.in_scope(ScopeKind::Class, |this| {
            if let Some(name) = name {
                this.scopes.declare(name, BindingKind::Class);
            }
            for member in &mut class.body {
                this.rewrite_class_member(member);
            }
        });
    }

    fn rewrite_class_member(&mut self, member: &mut ClassMember) {
        match member {
            ClassMember::Constructor(ctor) => {
                self.rewrite_prop_name(&mut ctor.key);
                self.in_scope(ScopeKind::Function, |this| {
                    this.scopes.declare("arguments", BindingKind::Implicit);
                    for param in &ctor.params {
                        if let ParamOrTsParamProp::Param(param) = param {
                            this.scopes.declare_pat(&param.pat, BindingKind::Param);
                        }
                    }
                    for param in &mut ctor.params {
                        match param {
                            ParamOrTsParamProp::Param(param) => this.rewrite_pat(&mut param.pat),
                            ParamOrTsParamProp::TsParamProp(prop) => {
                                this.unsupported(prop.span, "TypeScript parameter property")
                            }
                        }
                    }
                    if let Some(body) = &mut ctor.body {
                        this.declare_body(&body.stmts);
                        this.rewrite_stmts(&mut body.stmts);
                    }
                });
            }
            ClassMember::Method(method) => {
                self.rewrite_prop_name(&mut method.key);
                self.rewrite_function(&mut method.function, None);
            }
            ClassMember::PrivateMethod(method) => {
                self.rewrite_function(&mut method.function, None);
            }
            ClassMember::ClassProp(prop) => {
                self.rewrite_prop_name(&mut prop.key);
                if let Some(value) = &mut prop.value {
                    self.in_scope(ScopeKind::Function, |this| this.rewrite_expr(value));
                }
            }
            ClassMember::PrivateProp(prop) => {
                if let Some(value) = &mut prop.value {
                    self.in_scope(ScopeKind::Function, |this| this.rewrite_expr(value));
                }
            }
            ClassMember::AutoAccessor(accessor) => {
                if let Key::Public(key) = &mut accessor.key {
                    self.rewrite_prop_name(key);
                }
                if let Some(value) = &mut accessor.value {
                    self.in_scope(ScopeKind::Function, |this| this.rewrite_expr(value));
                }
            }
            ClassMember::StaticBlock(block) => self.in_scope(ScopeKind::Function, |this| {
                this.declare_body(&block.body.stmts);
                this.rewrite_stmts(&mut block.body.stmts);
            }),
            ClassMember::TsIndexSignature(signature) => {
                self.unsupported(signature.span, "TypeScript index signature")
            }
            ClassMember::Empty(_) => {}
        }
    }

    // ---- patterns and write targets -----------------------------------

    /// Visit the expressions inside a binding or assignment pattern: defaults,
    /// computed keys and member targets. Names are never wrapped here.
    fn rewrite_pat(&mut self, pat: &mut Pat) {
        if !self.enter(pat.span()) {
            return;
        }
        match pat {
            Pat::Ident(_) | Pat::Invalid(_) => {}
            Pat::Array(array) => {
                for elem in array.elems.iter_mut().flatten() {
                    self.rewrite_pat(elem);
                }
            }
            Pat::Rest(rest) => self.rewrite_pat(&mut rest.arg),
            Pat::Object(object) => self.rewrite_object_pat(object),
            Pat::Assign(assign) => {
                self.rewrite_pat(&mut assign.left);
                self.rewrite_expr(&mut assign.right);
            }
            Pat::Expr(target) => self.rewrite_write_target(target),
        }
        self.exit();
    }

    fn rewrite_object_pat(&mut self, object: &mut ObjectPat) {
        for prop in &mut object.props {
            match prop {
                ObjectPatProp::KeyValue(kv) => {
                    self.rewrite_prop_name(&mut kv.key);
                    self.rewrite_pat(&mut kv.value);
                }
                ObjectPatProp::Assign(assign) => {
                    if let Some(value) = &mut assign.value {
                        self.rewrite_expr(value);
                    }
                }
                ObjectPatProp::Rest(rest) => self.rewrite_pat(&mut rest.arg),
            }
        }
    }

    fn rewrite_assign_target(&mut self, target: &mut AssignTarget) {
        match target {
            AssignTarget::Simple(simple) => match simple {
                SimpleAssignTarget::Ident(_) | SimpleAssignTarget::Invalid(_) => {}
                SimpleAssignTarget::Member(member) => {
                    self.rewrite_member_prop(&mut member.prop);
                    self.rewrite_write_target(&mut member.obj);
                }
                SimpleAssignTarget::SuperProp(super_prop) => self.rewrite_super_prop(super_prop),
                SimpleAssignTarget::Paren(paren) => self.rewrite_write_target(&mut paren.expr),
                SimpleAssignTarget::OptChain(chain) => self.rewrite_opt_chain(chain),
                other => self.unsupported(other.span(), "TypeScript assignment target"),
            },
            AssignTarget::Pat(pat) => match pat {
                AssignTargetPat::Array(array) => {
                    for elem in array.elems.iter_mut().flatten() {
                        self.rewrite_pat(elem);
                    }
                }
                AssignTargetPat::Object(object) => self.rewrite_object_pat(object),
                AssignTargetPat::Invalid(_) => {}
            },
        }
    }

    /// A chain that is written to keeps its names; only computed keys and a
    /// non-identifier root are rewritten.
    fn rewrite_write_target(&mut self, expr: &mut Expr) {
        let mut target = expr;
        loop {
            match target {
                Expr::Member(member) => {
                    self.rewrite_member_prop(&mut member.prop);
                    target = &mut *member.obj;
                }
                Expr::Paren(paren) => target = &mut *paren.expr,
                Expr::Ident(_) => break,
                Expr::SuperProp(super_prop) => {
                    self.rewrite_super_prop(super_prop);
                    break;
                }
                other => {
                    self.rewrite_expr(other);
                    break;
                }
            }
        }
    }

    // ---- expressions --------------------------------------------------

    fn rewrite_expr(&mut self, expr: &mut Expr) {
        if !self.enter(expr.span()) {
            return;
        }
        self.rewrite_expr_kind(expr);
        self.exit();
    }

    fn rewrite_expr_kind(&mut self, expr: &mut Expr) {
        if matches!(&*expr, Expr::Call(call) if self.is_collect_call(call)) {
            self.rewrite_collect_region(expr);
            return;
        }

        match expr {
            Expr::Ident(_) | Expr::Member(_) => self.rewrite_chain(expr, false),
            Expr::This(_) | Expr::Lit(_) | Expr::MetaProp(_) | Expr::PrivateName(_) => {}
            Expr::Array(array) => {
                for elem in array.elems.iter_mut().flatten() {
                    self.rewrite_expr(&mut elem.expr);
                }
            }
            Expr::Object(object) => {
                for prop in &mut object.props {
                    match prop {
                        PropOrSpread::Spread(spread) => self.rewrite_expr(&mut spread.expr),
                        PropOrSpread::Prop(prop) => self.rewrite_prop(prop),
                    }
                }
            }
            Expr::Fn(function) => {
                let name = function.ident.as_ref().map(|ident| ident.sym.clone());
                self.rewrite_function(&mut function.function, name.as_ref());
            }
            Expr::Unary(unary) if unary.op == UnaryOp::Delete => {
                self.rewrite_write_target(&mut unary.arg)
            }
            Expr::Unary(unary) => self.rewrite_expr(&mut unary.arg),
            Expr::Update(update) => self.rewrite_write_target(&mut update.arg),
            Expr::Bin(bin) => {
                self.rewrite_expr(&mut bin.left);
                self.rewrite_expr(&mut bin.right);
            }
            Expr::Assign(assign) => {
                self.rewrite_assign_target(&mut assign.left);
                self.rewrite_expr(&mut assign.right);
            }
            Expr::SuperProp(super_prop) => self.rewrite_super_prop(super_prop),
            Expr::Cond(cond) => {
                self.rewrite_expr(&mut cond.test);
                self.rewrite_expr(&mut cond.cons);
                self.rewrite_expr(&mut cond.alt);
            }
            Expr::Call(call) => {
                if let Callee::Expr(callee) = &mut call.callee {
                    self.rewrite_callee(callee);
                }
                self.rewrite_args(&mut call.args);
            }
            Expr::New(new) => {
                self.rewrite_expr(&mut new.callee);
                // `new f(x)()` would otherwise bind the arguments to `new f`
                if chain_root_is_call(&new.callee) {
                    let callee = new.callee.take();
                    new.callee = Box::new(Expr::Paren(ParenExpr {
                        span: DUMMY_SP,
                        expr: callee,
                    }));
                }
                if let Some(args) = &mut new.args {
                    self.rewrite_args(args);
                }
            }
            Expr::Seq(seq) => {
                for expr in &mut seq.exprs {
                    self.rewrite_expr(expr);
                }
            }
            Expr::Tpl(tpl) => {
                for expr in &mut tpl.exprs {
                    self.rewrite_expr(expr);
                }
            }
            Expr::TaggedTpl(tagged) => {
                self.rewrite_callee(&mut tagged.tag);
                for expr in &mut tagged.tpl.exprs {
                    self.rewrite_expr(expr);
                }
            }
            Expr::Arrow(arrow) => self.rewrite_arrow(arrow),
            Expr::Class(class) => {
                let name = class.ident.as_ref().map(|ident| ident.sym.clone());
                self.rewrite_class(&mut class.class, name.as_ref());
            }
            Expr::Yield(yield_expr) => {
                if let Some(arg) = &mut yield_expr.arg {
                    self.rewrite_expr(arg);
                }
            }
            Expr::Await(await_expr) => self.rewrite_expr(&mut await_expr.arg),
            Expr::Paren(paren) => self.rewrite_expr(&mut paren.expr),
            Expr::OptChain(chain) => self.rewrite_opt_chain(chain),
            Expr::JSXMember(_)
            | Expr::JSXNamespacedName(_)
            | Expr::JSXEmpty(_)
            | Expr::JSXElement(_)
            | Expr::JSXFragment(_) => self.unsupported(expr.span(), "JSX expression"),
            Expr::TsTypeAssertion(_)
            | Expr::TsConstAssertion(_)
            | Expr::TsNonNull(_)
            | Expr::TsAs(_)
            | Expr::TsInstantiation(_)
            | Expr::TsSatisfies(_) => self.unsupported(expr.span(), "TypeScript expression"),
            Expr::Invalid(invalid) => self.unsupported(invalid.span, "invalid expression"),
        }
    }

    fn rewrite_args(&mut self, args: &mut [ExprOrSpread]) {
        for arg in args {
            self.rewrite_expr(&mut arg.expr);
        }
    }

    /// A called expression. The last static link of a member callee stays
    /// outside the tracking call so the method keeps its receiver.
    fn rewrite_callee(&mut self, callee: &mut Expr) {
        match callee {
            Expr::Ident(_) | Expr::Member(_) => self.rewrite_chain(callee, true),
            Expr::Paren(paren) if is_chain(&paren.expr) => self.rewrite_chain(callee, true),
            _ => self.rewrite_expr(callee),
        }
    }

    fn rewrite_member_prop(&mut self, prop: &mut MemberProp) {
        if let MemberProp::Computed(computed) = prop {
            self.rewrite_expr(&mut computed.expr);
        }
    }

    fn rewrite_super_prop(&mut self, super_prop: &mut SuperPropExpr) {
        if let SuperProp::Computed(computed) = &mut super_prop.prop {
            self.rewrite_expr(&mut computed.expr);
        }
    }

    fn rewrite_prop_name(&mut self, name: &mut PropName) {
        if let PropName::Computed(computed) = name {
            self.rewrite_expr(&mut computed.expr);
        }
    }

    /// An optional link ends any path: only the object and key are rewritten.
    fn rewrite_opt_chain(&mut self, chain: &mut OptChainExpr) {
        match &mut *chain.base {
            OptChainBase::Member(member) => {
                self.rewrite_expr(&mut member.obj);
                self.rewrite_member_prop(&mut member.prop);
            }
            OptChainBase::Call(call) => {
                self.rewrite_callee(&mut call.callee);
                self.rewrite_args(&mut call.args);
            }
        }
    }

    fn rewrite_prop(&mut self, prop: &mut Box<Prop>) {
        if let Prop::Shorthand(ident) = &**prop {
            if self.is_free(&ident.sym) {
                let key = PropName::Ident(IdentName::new(ident.sym.clone(), ident.span));
                let mut value = Expr::Ident(ident.clone());
                self.rewrite_chain(&mut value, false);
                **prop = Prop::KeyValue(KeyValueProp {
                    key,
                    value: Box::new(value),
                });
            }
            return;
        }

        match &mut **prop {
            Prop::Shorthand(_) => {}
            Prop::KeyValue(kv) => {
                self.rewrite_prop_name(&mut kv.key);
                self.rewrite_expr(&mut kv.value);
            }
            Prop::Assign(assign) => self.rewrite_expr(&mut assign.value),
            Prop::Getter(getter) => {
                self.rewrite_prop_name(&mut getter.key);
                if let Some(body) = &mut getter.body {
                    self.in_scope(ScopeKind::Function, |this| {
                        this.scopes.declare("arguments", BindingKind::Implicit);
                        this.declare_body(&body.stmts);
                        this.rewrite_stmts(&mut body.stmts);
                    });
                }
            }
            Prop::Setter(setter) => {
                self.rewrite_prop_name(&mut setter.key);
                self.in_scope(ScopeKind::Function, |this| {
                    this.scopes.declare("arguments", BindingKind::Implicit);
                    this.scopes.declare_pat(&setter.param, BindingKind::Param);
                    this.rewrite_pat(&mut setter.param);
                    if let Some(body) = &mut setter.body {
                        this.declare_body(&body.stmts);
                        this.rewrite_stmts(&mut body.stmts);
                    }
                });
            }
            Prop::Method(method) => {
                self.rewrite_prop_name(&mut method.key);
                self.rewrite_function(&mut method.function, None);
            }
        }
    }

    // ---- chains -------------------------------------------------------

    /// Rewrite an identifier or member chain in a reading position.
    fn rewrite_chain(&mut self, expr: &mut Expr, callee: bool) {
        let mut links = Vec::new();
        let mut root = expr.take();
        loop {
            match root {
                Expr::Member(member) => {
                    links.push((member.span, member.prop));
                    root = *member.obj;
                }
                // `(a).b` reads the same path as `a.b`
                Expr::Paren(paren) if is_chain(&paren.expr) => root = *paren.expr,
                _ => break,
            }
        }
        links.reverse();

        let mut base = match root {
            Expr::Ident(ident) if self.is_free(&ident.sym) => {
                let limit = if callee {
                    links.len().saturating_sub(1)
                } else {
                    links.len()
                };
                let path = self.absorb(&ident, &links[..limit]);
                let consumed = path.segments().len();
                self.wrap(ident, path, links.drain(..consumed))
            }
            Expr::Ident(ident) => Expr::Ident(ident),
            mut other => {
                self.rewrite_expr(&mut other);
                other
            }
        };

        for (span, mut prop) in links {
            self.rewrite_member_prop(&mut prop);
            base = Expr::Member(MemberExpr {
                span,
                obj: Box::new(base),
                prop,
            });
        }
        *expr = base;
    }

    /// The path rooted at `root` through the leading mergeable `links`.
    fn absorb(&self, root: &Ident, links: &[(Span, MemberProp)]) -> BindingPath {
        let mut path = BindingPath::new(&*root.sym);
        for (_, prop) in links {
            let segment = match prop {
                MemberProp::Ident(name) if !self.options.terminators.contains(&*name.sym) => {
                    Some(Segment::Name(name.sym.to_string()))
                }
                MemberProp::Computed(computed) => Segment::from_key(&computed.expr),
                _ => None,
            };
            match segment {
                Some(segment) => path.push(segment),
                None => break,
            }
        }
        path
    }

    /// Build the tracking call for `root` and the links its path consumed.
    fn wrap(
        &mut self,
        root: Ident,
        path: BindingPath,
        links: impl Iterator<Item = (Span, MemberProp)>,
    ) -> Expr {
        let options = self.options;
        let mut value = receiver_member(&options.receiver, &root);
        for (span, prop) in links {
            value = Expr::Member(MemberExpr {
                span,
                obj: Box::new(value),
                prop,
            });
        }

        log::trace!("wrapping `{}`", path);
        self.outcome.units += 1;
        if self.collecting > 0 {
            self.outcome.prop_keys.push(path.root().to_string());
        }
        tracking_call(&options.receiver, &options.helper, &path, value)
    }

    // ---- collection regions -------------------------------------------

    fn is_collect_call(&self, call: &CallExpr) -> bool {
        let Some(marker) = &self.options.collect_marker else {
            return false;
        };
        let Callee::Expr(callee) = &call.callee else {
            return false;
        };
        let Expr::Member(member) = &**callee else {
            return false;
        };
        matches!(&member.prop, MemberProp::Ident(name) if name.sym == *marker)
            && (*member.obj).eq_ignore_span(&self.options.receiver)
    }

    /// Rewrite the arguments of a marker call while recording roots, then
    /// replace the call with its first argument.
    fn rewrite_collect_region(&mut self, expr: &mut Expr) {
        let Expr::Call(call) = expr else { return };

        self.collecting += 1;
        self.rewrite_args(&mut call.args);
        self.collecting -= 1;

        let replacement = match call.args.first_mut() {
            Some(first) if first.spread.is_none() => Some(parenthesize(*first.expr.take())),
            // a spread has no single value to stand in for the call
            Some(_) => None,
            None => Some(Expr::Ident(Ident::new_no_ctxt("undefined".into(), call.span))),
        };
        if let Some(replacement) = replacement {
            *expr = replacement;
        }
    }
}

/// Wrap `expr` in parentheses unless it binds at least as tightly as the call
/// it replaces.
fn parenthesize(expr: Expr) -> Expr {
    match expr {
        Expr::Ident(_)
        | Expr::This(_)
        | Expr::Lit(_)
        | Expr::Member(_)
        | Expr::Call(_)
        | Expr::Paren(_)
        | Expr::Array(_)
        | Expr::Tpl(_) => expr,
        other => Expr::Paren(ParenExpr {
            span: DUMMY_SP,
            expr: Box::new(other),
        }),
    }
}

fn chain_root_is_call(expr: &Expr) -> bool {
    let mut current = expr;
    while let Expr::Member(member) = current {
        current = &*member.obj;
    }
    matches!(current, Expr::Call(_))
}

/// Identifier or member chain, possibly parenthesized.
fn is_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) | Expr::Member(_) => true,
        Expr::Paren(paren) => is_chain(&paren.expr),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TransformOptions;
    use bindpath_diagnostics::SourceCache;
    use bindpath_parser::parse_script_with_cache;

    fn run(source: &str, options: TransformOptions) -> (String, RewriteOutcome) {
        let resolved = options.resolve().unwrap();
        let mut cache = SourceCache::new();
        let mut parsed = parse_script_with_cache(source, "rewrite.js", &mut cache).unwrap();
        let outcome = rewrite_script(&resolved, &mut parsed.script);
        let code: String = parsed
            .print()
            .unwrap()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        (code, outcome)
    }

    fn rewrite(source: &str) -> String {
        run(source, TransformOptions::default()).0
    }

    #[test]
    fn test_free_identifier_is_wrapped() {
        assert_eq!(rewrite("a;"), r#"this._c("a",this.a);"#);
    }

    #[test]
    fn test_static_chain_collapses() {
        assert_eq!(rewrite("a.b.c;"), r#"this._c("a.b.c",this.a.b.c);"#);
    }

    #[test]
    fn test_terminator_stays_outside() {
        assert_eq!(rewrite("a.b.size;"), r#"this._c("a.b",this.a.b).size;"#);
    }

    #[test]
    fn test_later_links_hang_off_result() {
        assert_eq!(
            rewrite("a.length.toFixed;"),
            r#"this._c("a",this.a).length.toFixed;"#
        );
    }

    #[test]
    fn test_method_call_keeps_receiver() {
        assert_eq!(
            rewrite("a.b.format(x);"),
            r#"this._c("a.b",this.a.b).format(this._c("x",this.x));"#
        );
        assert_eq!(rewrite("f();"), r#"this._c("f",this.f)();"#);
    }

    #[test]
    fn test_parenthesized_root_joins_path() {
        assert_eq!(rewrite("(a).b;"), r#"this._c("a.b",this.a.b);"#);
        assert_eq!(rewrite("((a.b)).c;"), r#"this._c("a.b.c",this.a.b.c);"#);
        assert_eq!(rewrite("(a.b)();"), r#"this._c("a",this.a).b();"#);
        assert_eq!(
            rewrite("(a + b).c;"),
            r#"(this._c("a",this.a)+this._c("b",this.b)).c;"#
        );
        assert_eq!(
            rewrite("(function (x) { return (x).y; });"),
            "(function(x){returnx.y;});"
        );
    }

    #[test]
    fn test_var_in_nested_block_is_hoisted() {
        assert_eq!(
            rewrite("(() => { if (a) { try {} catch (e) { var { id } = e; } } return id; });"),
            r#"(()=>{if(this._c("a",this.a)){try{}catch(e){var{id}=e;}}returnid;});"#
        );
    }

    #[test]
    fn test_new_callee_is_parenthesized() {
        assert_eq!(rewrite("new A.B();"), r#"new(this._c("A.B",this.A.B))();"#);
    }

    #[test]
    fn test_units_are_counted() {
        let (_, outcome) = run("a[b].c;", TransformOptions::default());
        assert_eq!(outcome.units, 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_write_targets_keep_names() {
        assert_eq!(rewrite("a.b = c;"), r#"a.b=this._c("c",this.c);"#);
        assert_eq!(rewrite("a[k]++;"), r#"a[this._c("k",this.k)]++;"#);
        assert_eq!(rewrite("delete a.b;"), "deletea.b;");
    }

    #[test]
    fn test_destructuring_assignment_targets() {
        assert_eq!(
            rewrite("[a, b.c = d] = e;"),
            r#"[a,b.c=this._c("d",this.d)]=this._c("e",this.e);"#
        );
    }

    #[test]
    fn test_optional_link_ends_path() {
        assert_eq!(rewrite("a?.b;"), r#"this._c("a",this.a)?.b;"#);
    }

    #[test]
    fn test_shorthand_expands_when_free() {
        assert_eq!(
            rewrite("({ a, b: 1 });"),
            r#"({a:this._c("a",this.a),b:1});"#
        );
        assert_eq!(
            rewrite("(function (a) { return { a }; });"),
            "(function(a){return{a};});"
        );
    }

    #[test]
    fn test_collect_region_records_roots() {
        let (code, outcome) = run("this._p(a.b, c);", TransformOptions::default());
        assert_eq!(code, r#"this._c("a.b",this.a.b);"#);
        assert_eq!(outcome.prop_keys, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_collect_region_without_args() {
        let (code, outcome) = run("x = this._p();", TransformOptions::default());
        assert_eq!(code, "x=undefined;");
        assert!(outcome.prop_keys.is_empty());
    }

    #[test]
    fn test_collect_region_parenthesizes_operators() {
        let (code, _) = run("x = 2 * this._p(a + b);", TransformOptions::default());
        assert_eq!(
            code,
            r#"x=2*(this._c("a",this.a)+this._c("b",this.b));"#
        );
    }

    #[test]
    fn test_collect_marker_disabled() {
        let options = TransformOptions::default().with_collect_marker(None::<String>);
        let (code, outcome) = run("this._p(a);", options);
        assert_eq!(code, r#"this._p(this._c("a",this.a));"#);
        assert!(outcome.prop_keys.is_empty());
    }

    #[test]
    fn test_with_body_is_reported() {
        let (code, outcome) = run("with (obj) { a; }", TransformOptions::default());
        assert_eq!(code, r#"with(this._c("obj",this.obj)){a;}"#);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::UnsupportedConstruct);
    }

    #[test]
    fn test_depth_limit_leaves_subtree() {
        let options = TransformOptions::default().with_max_depth(3);
        let (code, outcome) = run("a; [[[b]]];", options);
        assert!(code.starts_with(r#"this._c("a",this.a);"#));
        assert!(code.ends_with("[[[b]]];"));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::DepthLimit);
    }
}
