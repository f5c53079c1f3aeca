//! Models of the template functions that pass values through.
//!
//! Every other function yields an opaque value; its arguments are still
//! evaluated (and thereby recorded) by the walker.

use std::collections::BTreeMap;

use crate::{Alts, Sym};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    /// `default`, `coalesce`: any of the arguments.
    Union,
    /// `ternary a b cond`: either of the first two arguments.
    Ternary,
    /// `required msg value`
    Required,
    /// `index base k1 k2 ...`, `get base k`
    Index,
    /// `dig k1 ... default dict`
    Dig,
    /// `first`, `last`
    Element,
    /// `dict k1 v1 ...`
    Dict,
    /// `include name ctx`, handled by the walker since it invokes a unit.
    Include,
}

impl Builtin {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        let builtin = match name {
            "default" | "coalesce" => Self::Union,
            "ternary" => Self::Ternary,
            "required" => Self::Required,
            "index" | "get" => Self::Index,
            "dig" => Self::Dig,
            "first" | "last" => Self::Element,
            "dict" => Self::Dict,
            "include" => Self::Include,
            _ => return None,
        };
        Some(builtin)
    }
}

fn opaque() -> Alts {
    Sym::Opaque.alone()
}

fn non_empty(alts: Alts) -> Alts {
    if alts.is_empty() { opaque() } else { alts }
}

fn union<'a>(args: impl IntoIterator<Item = &'a Alts>) -> Alts {
    non_empty(args.into_iter().flatten().cloned().collect())
}

/// `sym.name`, where `values_field` is the field of the top-level object that
/// leads into the values document.
pub(crate) fn field(sym: &Sym, name: &str, values_field: &str) -> Alts {
    match sym {
        Sym::TopLevel if name == values_field => Sym::Values(helmchk_core::Path::root()).alone(),
        Sym::Values(path) => Sym::Values(path.child(name)).alone(),
        Sym::Dict(entries) => entries.get(name).cloned().unwrap_or_else(opaque),
        Sym::TopLevel | Sym::Str(_) | Sym::Int | Sym::Opaque => opaque(),
    }
}

/// Follow `fields` from every alternative of `base`.
pub(crate) fn fields(base: Alts, fields: &[String], values_field: &str) -> Alts {
    fields.iter().fold(base, |current, name| {
        non_empty(
            current
                .iter()
                .flat_map(|sym| field(sym, name, values_field))
                .collect(),
        )
    })
}

fn index_key(sym: &Sym, key: &Sym, values_field: &str) -> Alts {
    match (sym, key) {
        (_, Sym::Str(name)) => field(sym, name, values_field),
        (Sym::Values(path), Sym::Int) => Sym::Values(path.wildcard()).alone(),
        _ => opaque(),
    }
}

fn index(base: &Alts, keys: &[Alts], values_field: &str) -> Alts {
    keys.iter().fold(base.clone(), |current, key| {
        let mut next = Alts::new();
        for sym in &current {
            for key in key {
                next.extend(index_key(sym, key, values_field));
            }
        }
        non_empty(next)
    })
}

fn dict(args: &[Alts]) -> Alts {
    let mut entries: BTreeMap<String, Alts> = BTreeMap::new();
    for pair in args.chunks(2) {
        let value = pair.get(1).cloned().unwrap_or_else(opaque);
        for key in &pair[0] {
            if let Sym::Str(key) = key {
                entries.entry(key.clone()).or_default().extend(value.iter().cloned());
            }
        }
    }
    Sym::Dict(entries).alone()
}

/// The result of calling `builtin` with already evaluated `args`. When the
/// call is the second or later stage of a pipeline, the previous result is
/// the last argument.
pub(crate) fn apply(builtin: Builtin, args: &[Alts], values_field: &str) -> Alts {
    match builtin {
        Builtin::Union => union(args),
        Builtin::Ternary => union(args.iter().take(2)),
        Builtin::Required => args.last().cloned().unwrap_or_else(opaque),
        Builtin::Index => match args.split_first() {
            Some((base, keys)) => index(base, keys, values_field),
            None => opaque(),
        },
        Builtin::Dig => match args {
            [keys @ .., default, base] if !keys.is_empty() => {
                let mut found = index(base, keys, values_field);
                found.extend(default.iter().cloned());
                found
            }
            _ => opaque(),
        },
        Builtin::Element => match args.last() {
            Some(base) => non_empty(
                base.iter()
                    .filter_map(Sym::as_values_path)
                    .map(|path| Sym::Values(path.wildcard()))
                    .collect(),
            ),
            None => opaque(),
        },
        Builtin::Dict => dict(args),
        Builtin::Include => opaque(),
    }
}
