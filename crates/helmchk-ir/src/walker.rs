use std::collections::{BTreeSet, HashSet};

use helmchk_core::{Path, PathSet};
use helmchk_template::{Branch, Command, Expr, Node, Pipe, TemplateSet};

use crate::funcs::{self, Builtin};
use crate::scope::{Scope, Undeclared};
use crate::{Alts, EntryContext, ExtractorOptions, PathExtractor, ResolutionError, Sym};

/// Default extractor: interprets every entry unit symbolically, following
/// variables, loops, narrowing and sub-template invocations.
#[derive(Debug, Clone, Default)]
pub struct ScopedPathExtractor {
    options: ExtractorOptions,
}

impl ScopedPathExtractor {
    #[must_use]
    pub fn new(options: ExtractorOptions) -> Self {
        Self { options }
    }
}

impl PathExtractor for ScopedPathExtractor {
    fn extract(&self, templates: &TemplateSet) -> Result<PathSet, ResolutionError> {
        let mut w = Walker {
            templates,
            options: &self.options,
            paths: PathSet::new(),
            visited: HashSet::new(),
            active: Vec::new(),
            missing: BTreeSet::new(),
        };
        let entry = match self.options.entry_context {
            EntryContext::TopLevel => Sym::TopLevel,
            EntryContext::Values => Sym::Values(Path::root()),
        };
        let entry = entry.alone();
        let mut entries = 0;
        for unit in templates.entries() {
            entries += 1;
            w.invoke(&unit.name, &entry)?;
        }
        tracing::debug!(
            entries,
            paths = w.paths.len(),
            missing = w.missing.len(),
            "extracted template paths"
        );
        Ok(w.paths)
    }
}

// ---------------------------------------------------------------------------

fn opaque() -> Alts {
    Sym::Opaque.alone()
}

/// Decimal, hex, octal or binary integer literal.
fn is_integer(raw: &str) -> bool {
    let digits = raw.trim_start_matches(['+', '-']).replace('_', "");
    let (digits, radix) = match digits.get(..2) {
        Some("0x" | "0X") => (&digits[2..], 16),
        Some("0o" | "0O") => (&digits[2..], 8),
        Some("0b" | "0B") => (&digits[2..], 2),
        _ => (digits.as_str(), 10),
    };
    u64::from_str_radix(digits, radix).is_ok()
}

/// What `range` binds for each element of `collection`.
fn elements(collection: &Alts) -> Alts {
    let mut out = Alts::new();
    for sym in collection {
        match sym {
            Sym::Values(path) => {
                out.insert(Sym::Values(path.wildcard()));
            }
            Sym::Dict(entries) => out.extend(entries.values().flatten().cloned()),
            Sym::TopLevel | Sym::Str(_) | Sym::Int | Sym::Opaque => {
                out.insert(Sym::Opaque);
            }
        }
    }
    if out.is_empty() { opaque() } else { out }
}

struct Walker<'a> {
    templates: &'a TemplateSet,
    options: &'a ExtractorOptions,
    paths: PathSet,
    /// (unit, context) pairs analyzed or in progress.
    visited: HashSet<(String, Sym)>,
    /// Units being analyzed with their context, innermost last.
    active: Vec<(String, Sym)>,
    /// Invoked names without a definition, reported once each.
    missing: BTreeSet<String>,
}

impl Walker<'_> {
    fn record(&mut self, value: &Alts) {
        for path in value.iter().filter_map(Sym::as_values_path) {
            if self.paths.insert(path.clone()) {
                tracing::trace!(%path, "recorded");
            }
        }
    }

    fn current_unit(&self) -> String {
        self.active
            .last()
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    }

    /// Analyze unit `name` once per alternative of `ctx`.
    ///
    /// A unit is not re-entered with a context that extends one it is
    /// already being analyzed with, which bounds recursion over growing
    /// contexts such as `template "tree" .children`.
    fn invoke(&mut self, name: &str, ctx: &Alts) -> Result<(), ResolutionError> {
        let templates = self.templates;
        let Some(unit) = templates.get(name) else {
            if self.missing.insert(name.to_string()) {
                tracing::warn!(
                    template = name,
                    caller = %self.current_unit(),
                    "invoked template is not defined"
                );
            }
            return Ok(());
        };
        for sym in ctx {
            let key = (name.to_string(), sym.clone());
            if self.visited.contains(&key) {
                tracing::debug!(template = name, context = %sym, "already analyzed");
                continue;
            }
            let recursive = self
                .active
                .iter()
                .any(|(active, outer)| active == name && sym.extends(outer));
            if recursive {
                tracing::debug!(template = name, context = %sym, "not re-entering active template");
                continue;
            }
            self.visited.insert(key.clone());
            tracing::debug!(template = name, context = %sym, "analyzing template");
            let dot = sym.clone().alone();
            let mut scope = Scope::new(dot.clone());
            self.active.push(key);
            let walked = self.walk_list(&mut scope, &dot, &unit.body);
            self.active.pop();
            walked?;
        }
        Ok(())
    }

    fn walk_list(&mut self, scope: &mut Scope, dot: &Alts, nodes: &[Node]) -> Result<(), ResolutionError> {
        for node in nodes {
            self.walk(scope, dot, node)?;
        }
        Ok(())
    }

    /// Walk `nodes` in a frame of their own.
    fn walk_nested(&mut self, scope: &mut Scope, dot: &Alts, nodes: &[Node]) -> Result<(), ResolutionError> {
        scope.push();
        self.walk_list(scope, dot, nodes)?;
        scope.pop();
        Ok(())
    }

    fn walk(&mut self, scope: &mut Scope, dot: &Alts, node: &Node) -> Result<(), ResolutionError> {
        match node {
            Node::Text(_) | Node::Comment(_) | Node::Break | Node::Continue => Ok(()),
            Node::Action(pipe) => self.eval_pipe(scope, dot, pipe).map(drop),
            Node::If(branch) => self.walk_conditional(scope, dot, branch, false),
            Node::With(branch) => self.walk_conditional(scope, dot, branch, true),
            Node::Range(branch) => self.walk_range(scope, dot, branch),
            Node::Template { name, pipe, .. } => {
                let ctx = match pipe {
                    Some(pipe) => self.eval_pipe(scope, dot, pipe)?,
                    None => opaque(),
                };
                self.invoke(name, &ctx)
            }
        }
    }

    /// `if` keeps the context, `with` narrows it to the tested value. The
    /// else branch always runs with the outer context.
    fn walk_conditional(
        &mut self,
        scope: &mut Scope,
        dot: &Alts,
        branch: &Branch,
        narrow: bool,
    ) -> Result<(), ResolutionError> {
        scope.push();
        let value = self.eval_pipe(scope, dot, &branch.pipe)?;
        let body_dot = if narrow { value } else { dot.clone() };
        self.walk_nested(scope, &body_dot, &branch.list)?;
        if let Some(else_list) = &branch.else_list {
            self.walk_nested(scope, dot, else_list)?;
        }
        scope.pop();
        Ok(())
    }

    /// The declared variables hold the collection around the loop and are
    /// shadowed by the element inside the body, so the else branch still
    /// sees them.
    fn walk_range(&mut self, scope: &mut Scope, dot: &Alts, branch: &Branch) -> Result<(), ResolutionError> {
        let decl = &branch.pipe.decl;
        scope.push();
        let collection = self.eval_pipe_value(scope, dot, &branch.pipe)?;
        for name in decl {
            self.bind(scope, name, branch.pipe.is_assign, collection.clone())?;
        }
        let element = elements(&collection);
        self.record(&element);

        scope.push();
        for name in decl {
            self.bind(scope, name, branch.pipe.is_assign, element.clone())?;
        }
        self.walk_nested(scope, &element, &branch.list)?;
        scope.pop();

        if let Some(else_list) = &branch.else_list {
            self.walk_nested(scope, dot, else_list)?;
        }
        scope.pop();
        Ok(())
    }

    fn bind(&self, scope: &mut Scope, name: &str, is_assign: bool, value: Alts) -> Result<(), ResolutionError> {
        if !is_assign {
            scope.declare(name, value);
            return Ok(());
        }
        scope
            .assign(name, value)
            .map_err(|Undeclared| ResolutionError::UndeclaredAssignment {
                name: name.to_string(),
                unit: self.current_unit(),
            })
    }

    /// Evaluate `pipe` and bind its declared variables.
    fn eval_pipe(&mut self, scope: &mut Scope, dot: &Alts, pipe: &Pipe) -> Result<Alts, ResolutionError> {
        let value = self.eval_pipe_value(scope, dot, pipe)?;
        for name in &pipe.decl {
            self.bind(scope, name, pipe.is_assign, value.clone())?;
        }
        Ok(value)
    }

    fn eval_pipe_value(&mut self, scope: &mut Scope, dot: &Alts, pipe: &Pipe) -> Result<Alts, ResolutionError> {
        let mut prev = None;
        for cmd in &pipe.cmds {
            prev = Some(self.eval_command(scope, dot, cmd, prev)?);
        }
        let value = prev.unwrap_or_else(opaque);
        self.record(&value);
        Ok(value)
    }

    fn eval_command(
        &mut self,
        scope: &mut Scope,
        dot: &Alts,
        cmd: &Command,
        prev: Option<Alts>,
    ) -> Result<Alts, ResolutionError> {
        let Some((first, rest)) = cmd.args.split_first() else {
            return Ok(opaque());
        };
        if let Expr::Identifier(name) = first {
            let mut args = Vec::with_capacity(rest.len() + 1);
            for arg in rest {
                args.push(self.eval_expr(scope, dot, arg)?);
            }
            args.extend(prev);
            return self.call(name, &args);
        }
        let value = self.eval_expr(scope, dot, first)?;
        for arg in rest {
            self.eval_expr(scope, dot, arg)?;
        }
        Ok(value)
    }

    fn call(&mut self, name: &str, args: &[Alts]) -> Result<Alts, ResolutionError> {
        match Builtin::lookup(name) {
            Some(Builtin::Include) => {
                let (names, ctx) = match args {
                    [names, ctx, ..] => (names, ctx.clone()),
                    [names] => (names, opaque()),
                    [] => return Ok(opaque()),
                };
                for target in names {
                    match target {
                        Sym::Str(target) => self.invoke(target, &ctx)?,
                        other => tracing::debug!(name = %other, "skipping include of a computed name"),
                    }
                }
                Ok(opaque())
            }
            Some(builtin) => Ok(funcs::apply(builtin, args, &self.options.values_field)),
            None => Ok(opaque()),
        }
    }

    fn eval_expr(&mut self, scope: &mut Scope, dot: &Alts, expr: &Expr) -> Result<Alts, ResolutionError> {
        let options = self.options;
        let values_field = options.values_field.as_str();
        let value = match expr {
            Expr::Dot => dot.clone(),
            Expr::Literal(_) => opaque(),
            Expr::Number(raw) if is_integer(raw) => Sym::Int.alone(),
            Expr::Number(_) => opaque(),
            Expr::String(value) => Sym::Str(value.clone()).alone(),
            Expr::Field(names) => funcs::fields(dot.clone(), names, values_field),
            Expr::Variable { name, fields, pos } => {
                let base = scope.lookup(name).cloned().ok_or_else(|| {
                    ResolutionError::UndefinedVariable {
                        name: name.clone(),
                        unit: self.current_unit(),
                        pos: *pos,
                    }
                })?;
                funcs::fields(base, fields, values_field)
            }
            Expr::Chain { base, fields } => {
                let base = self.eval_expr(scope, dot, base)?;
                funcs::fields(base, fields, values_field)
            }
            Expr::Identifier(name) => self.call(name, &[])?,
            Expr::Pipe(pipe) => self.eval_pipe(scope, dot, pipe)?,
        };
        self.record(&value);
        Ok(value)
    }
}
