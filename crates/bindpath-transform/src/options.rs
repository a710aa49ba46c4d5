//! Transform configuration.

use crate::error::TransformError;
use crate::path::is_identifier_name;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use swc_atoms::Atom;
use swc_common::DUMMY_SP;
use swc_ecma_ast::{Expr, Ident, IdentName, MemberExpr, MemberProp, ThisExpr};

pub const DEFAULT_HELPER_NAME: &str = "_c";
pub const DEFAULT_RECEIVER: &str = "this";
pub const DEFAULT_COLLECT_MARKER: &str = "_p";
pub const DEFAULT_MAX_DEPTH: usize = 256;
/// Largest accepted `max_depth`.
pub const MAX_DEPTH_CEILING: usize = 1024;

/// Globals that are never treated as bindable state.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "Infinity",
    "undefined",
    "NaN",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "Math",
    "Number",
    "Date",
    "Array",
    "Object",
    "Boolean",
    "String",
    "RegExp",
    "Map",
    "Set",
    "JSON",
    "Intl",
    "require",
    "global",
];

/// Properties that end a dependency path.
pub const DEFAULT_TERMINATORS: &[&str] = &["length", "size"];

/// Options for [`crate::transform`].
///
/// All fields have defaults, so a partial TOML or JSON document
/// deserializes into a usable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformOptions {
    /// Name of the tracking method called on the receiver.
    pub helper_name: String,
    /// Expression the tracking method and the values are read from:
    /// `this`, an identifier, or a static member chain such as `ctx.state`.
    pub receiver: String,
    /// Names never rewritten, in addition to [`DEFAULT_EXCLUSIONS`].
    pub exclusions: Vec<String>,
    /// Use `exclusions` instead of the defaults rather than alongside them.
    pub replace_exclusions: bool,
    /// Properties that end a path, in addition to [`DEFAULT_TERMINATORS`].
    pub terminators: Vec<String>,
    pub replace_terminators: bool,
    /// Method name marking a collection region, `None` to disable.
    pub collect_marker: Option<String>,
    /// Deepest expression or statement nesting that is rewritten, at most
    /// [`MAX_DEPTH_CEILING`].
    pub max_depth: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            helper_name: DEFAULT_HELPER_NAME.to_string(),
            receiver: DEFAULT_RECEIVER.to_string(),
            exclusions: Vec::new(),
            replace_exclusions: false,
            terminators: Vec::new(),
            replace_terminators: false,
            collect_marker: Some(DEFAULT_COLLECT_MARKER.to_string()),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_helper_name(mut self, name: impl Into<String>) -> Self {
        self.helper_name = name.into();
        self
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = receiver.into();
        self
    }

    pub fn with_exclusions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn replacing_exclusions(mut self) -> Self {
        self.replace_exclusions = true;
        self
    }

    pub fn with_terminators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminators.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn replacing_terminators(mut self) -> Self {
        self.replace_terminators = true;
        self
    }

    pub fn with_collect_marker(mut self, marker: Option<impl Into<String>>) -> Self {
        self.collect_marker = marker.map(Into::into);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Effective exclusion set, not counting the receiver's root name.
    pub fn exclusion_set(&self) -> HashSet<String> {
        merge(DEFAULT_EXCLUSIONS, &self.exclusions, self.replace_exclusions)
    }

    /// Effective terminator set.
    pub fn terminator_set(&self) -> HashSet<String> {
        merge(DEFAULT_TERMINATORS, &self.terminators, self.replace_terminators)
    }

    /// Validate and precompute everything a rewrite needs.
    pub(crate) fn resolve(&self) -> Result<ResolvedOptions, TransformError> {
        if !is_identifier_name(&self.helper_name) {
            return Err(TransformError::invalid_option(
                "helper_name",
                format!("`{}` is not a valid identifier", self.helper_name),
            ));
        }

        let collect_marker = match &self.collect_marker {
            Some(marker) if !is_identifier_name(marker) => {
                return Err(TransformError::invalid_option(
                    "collect_marker",
                    format!("`{marker}` is not a valid identifier"),
                ));
            }
            Some(marker) => Some(Atom::from(marker.as_str())),
            None => None,
        };

        if self.max_depth == 0 {
            return Err(TransformError::invalid_option(
                "max_depth",
                "must be at least 1",
            ));
        }
        if self.max_depth > MAX_DEPTH_CEILING {
            return Err(TransformError::invalid_option(
                "max_depth",
                format!("must be at most {MAX_DEPTH_CEILING}"),
            ));
        }

        let parsed = bindpath_parser::parse_expression(&self.receiver).map_err(|e| {
            TransformError::invalid_option("receiver", format!("`{}`: {e}", self.receiver))
        })?;
        let (receiver, receiver_root) = normalize_receiver(&parsed).ok_or_else(|| {
            TransformError::invalid_option(
                "receiver",
                format!(
                    "`{}` must be `this`, an identifier, or a static member chain",
                    self.receiver
                ),
            )
        })?;

        let mut exclusions = self.exclusion_set();
        exclusions.extend(receiver_root);

        Ok(ResolvedOptions {
            helper: Atom::from(self.helper_name.as_str()),
            receiver,
            exclusions,
            terminators: self.terminator_set(),
            collect_marker,
            max_depth: self.max_depth,
        })
    }
}

fn merge(defaults: &[&str], extra: &[String], replace: bool) -> HashSet<String> {
    let defaults = defaults.iter().filter(|_| !replace).map(|s| s.to_string());
    defaults.chain(extra.iter().cloned()).collect()
}

/// Rebuild a receiver expression without source spans, returning it with the
/// name of its root identifier (`None` for `this`).
fn normalize_receiver(expr: &Expr) -> Option<(Expr, Option<String>)> {
    match expr {
        Expr::This(_) => Some((Expr::This(ThisExpr { span: DUMMY_SP }), None)),
        Expr::Ident(ident) => Some((
            Expr::Ident(Ident::new_no_ctxt(ident.sym.clone(), DUMMY_SP)),
            Some(ident.sym.to_string()),
        )),
        Expr::Member(MemberExpr {
            obj,
            prop: MemberProp::Ident(name),
            ..
        }) => {
            let (obj, root) = normalize_receiver(obj)?;
            let member = MemberExpr {
                span: DUMMY_SP,
                obj: Box::new(obj),
                prop: MemberProp::Ident(IdentName::new(name.sym.clone(), DUMMY_SP)),
            };
            Some((Expr::Member(member), root))
        }
        Expr::Paren(paren) => normalize_receiver(&paren.expr),
        _ => None,
    }
}

/// Validated options shared by one rewrite.
#[derive(Debug)]
pub(crate) struct ResolvedOptions {
    pub helper: Atom,
    pub receiver: Expr,
    pub exclusions: HashSet<String>,
    pub terminators: HashSet<String>,
    pub collect_marker: Option<Atom>,
    pub max_depth: usize,
}
