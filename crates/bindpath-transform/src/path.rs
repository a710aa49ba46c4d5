//! Dependency paths and the tracking call that records them.

use std::fmt;
use swc_atoms::Atom;
use swc_common::{SyntaxContext, DUMMY_SP};
use swc_ecma_ast::{
    CallExpr, Callee, Expr, ExprOrSpread, Ident, IdentName, Lit, MemberExpr, MemberProp, Str,
};

/// One step of a [`BindingPath`] after the root.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Static property access, `.name`.
    Name(String),
    /// String-literal key, `["key"]`.
    Key(String),
    /// Numeric-literal key, `[0]`.
    Index(f64),
}

impl Segment {
    /// Segment for a literal computed key, or `None` if the key is not a
    /// string or numeric literal.
    pub fn from_key(key: &Expr) -> Option<Segment> {
        match key {
            Expr::Lit(Lit::Str(s)) => s.value.as_str().map(|v| Segment::Key(v.to_string())),
            Expr::Lit(Lit::Num(n)) => Some(Segment::Index(n.value)),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => write!(f, ".{name}"),
            Segment::Key(key) if is_identifier_name(key) => write!(f, ".{key}"),
            Segment::Key(key) => {
                let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                write!(f, "[{quoted}]")
            }
            Segment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// A canonical dependency path: a root name followed by segments.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingPath {
    root: String,
    segments: Vec<Segment>,
}

impl BindingPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Whether `name` can follow a `.` in a member access.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => Ident::is_valid_start(first) && chars.all(Ident::is_valid_continue),
        None => false,
    }
}

/// `receiver.root`, the value side of a wrapped root.
pub fn receiver_member(receiver: &Expr, root: &Ident) -> Expr {
    Expr::Member(MemberExpr {
        span: root.span,
        obj: Box::new(receiver.clone()),
        prop: MemberProp::Ident(IdentName::new(root.sym.clone(), root.span)),
    })
}

/// `receiver.helper("path", value)`.
pub fn tracking_call(receiver: &Expr, helper: &Atom, path: &BindingPath, value: Expr) -> Expr {
    let callee = Expr::Member(MemberExpr {
        span: DUMMY_SP,
        obj: Box::new(receiver.clone()),
        prop: MemberProp::Ident(IdentName::new(helper.clone(), DUMMY_SP)),
    });
    let path_lit = Expr::Lit(Lit::Str(Str::from(Atom::from(path.to_string()))));

    Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        callee: Callee::Expr(Box::new(callee)),
        args: vec![
            ExprOrSpread {
                spread: None,
                expr: Box::new(path_lit),
            },
            ExprOrSpread {
                spread: None,
                expr: Box::new(value),
            },
        ],
        type_args: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::ThisExpr;

    fn path(root: &str, segments: Vec<Segment>) -> String {
        let mut path = BindingPath::new(root);
        for segment in segments {
            path.push(segment);
        }
        path.to_string()
    }

    #[test]
    fn test_bare_root() {
        assert_eq!(path("linkUrl", vec![]), "linkUrl");
    }

    #[test]
    fn test_static_and_literal_segments() {
        assert_eq!(
            path(
                "item",
                vec![
                    Segment::Name("list".into()),
                    Segment::Index(0.0),
                    Segment::Key("key".into()),
                ]
            ),
            "item.list[0].key"
        );
    }

    #[test]
    fn test_non_identifier_key_keeps_brackets() {
        assert_eq!(
            path("item", vec![Segment::Key("data-id".into())]),
            r#"item["data-id"]"#
        );
        assert_eq!(
            path("item", vec![Segment::Key("say \"hi\"".into())]),
            r#"item["say \"hi\""]"#
        );
        assert_eq!(path("item", vec![Segment::Key("".into())]), r#"item[""]"#);
    }

    #[test]
    fn test_index_rendering() {
        assert_eq!(path("a", vec![Segment::Index(1.5)]), "a[1.5]");
        assert_eq!(path("a", vec![Segment::Index(10.0)]), "a[10]");
    }

    #[test]
    fn test_identifier_names() {
        assert!(is_identifier_name("key"));
        assert!(is_identifier_name("$el"));
        assert!(is_identifier_name("_x1"));
        assert!(is_identifier_name("class"));
        assert!(!is_identifier_name("1a"));
        assert!(!is_identifier_name("a-b"));
        assert!(!is_identifier_name(""));
    }

    #[test]
    fn test_tracking_call_shape() {
        let receiver = Expr::This(ThisExpr { span: DUMMY_SP });
        let root = Ident::new_no_ctxt("item".into(), DUMMY_SP);
        let value = receiver_member(&receiver, &root);
        let call = tracking_call(&receiver, &"_c".into(), &BindingPath::new("item"), value);

        let Expr::Call(call) = call else {
            panic!("expected a call");
        };
        assert_eq!(call.args.len(), 2);
        assert!(matches!(&*call.args[0].expr, Expr::Lit(Lit::Str(s)) if s.value.as_str() == Some("item")));
        assert!(matches!(&*call.args[1].expr, Expr::Member(_)));
    }
}
