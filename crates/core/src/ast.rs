//! Syntax tree for the subset of Go that struct mapping needs.
//!
//! Only the package clause, imports and top-level `type` declarations are
//! kept; everything else in a file is skipped by the parser.

use std::fmt;

// ──────────────────────────────────────────────
// Files and declarations
// ──────────────────────────────────────────────

/// One parsed `.go` file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub types: Vec<TypeDecl>,
}

/// `import name "path"`. `name` is `None` for a plain import and may be
/// `_` or `.` for blank and dot imports.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub name: Option<String>,
    pub path: String,
    pub line: u32,
}

/// `type Name[TypeParams] Type` or `type Name = Type`.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub alias: bool,
    pub ty: TypeExpr,
    pub line: u32,
}

/// A struct member. An empty `names` list marks an embedded member.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub names: Vec<String>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
    pub line: u32,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

// ──────────────────────────────────────────────
// Type expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// Results were written as a parenthesized list.
    pub paren_results: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceElem {
    Method { name: String, sig: Signature },
    /// Embedded interface or type-set union; `bool` marks a `~` term.
    Union(Vec<(bool, TypeExpr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Unqualified identifier: `string`, `User`, `T`
    Named(String),
    /// `pkg.Name`
    Qualified { package: String, name: String },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    /// `[len]T`; the length expression is kept as written
    Array { len: String, elem: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    Func(Signature),
    Struct(Vec<FieldDecl>),
    Interface(Vec<InterfaceElem>),
    /// `Base[Arg, ...]`
    Generic { base: Box<TypeExpr>, args: Vec<TypeExpr> },
    /// `...T` in a parameter list
    Variadic(Box<TypeExpr>),
    Paren(Box<TypeExpr>),
}

impl TypeExpr {
    /// Package qualifiers referenced anywhere in the expression, in order of
    /// first appearance.
    pub fn qualifiers(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_qualifiers(&mut out);
        out
    }

    fn collect_qualifiers(&self, out: &mut Vec<String>) {
        match self {
            TypeExpr::Named(_) => {}
            TypeExpr::Qualified { package, .. } => {
                if !out.contains(package) {
                    out.push(package.clone());
                }
            }
            TypeExpr::Pointer(inner)
            | TypeExpr::Slice(inner)
            | TypeExpr::Variadic(inner)
            | TypeExpr::Paren(inner) => inner.collect_qualifiers(out),
            TypeExpr::Array { elem, .. } | TypeExpr::Chan { elem, .. } => {
                elem.collect_qualifiers(out)
            }
            TypeExpr::Map { key, value } => {
                key.collect_qualifiers(out);
                value.collect_qualifiers(out);
            }
            TypeExpr::Func(sig) => sig.collect_qualifiers(out),
            TypeExpr::Struct(fields) => {
                for f in fields {
                    f.ty.collect_qualifiers(out);
                }
            }
            TypeExpr::Interface(elems) => {
                for e in elems {
                    match e {
                        InterfaceElem::Method { sig, .. } => sig.collect_qualifiers(out),
                        InterfaceElem::Union(terms) => {
                            for (_, t) in terms {
                                t.collect_qualifiers(out);
                            }
                        }
                    }
                }
            }
            TypeExpr::Generic { base, args } => {
                base.collect_qualifiers(out);
                for a in args {
                    a.collect_qualifiers(out);
                }
            }
        }
    }

    /// Print the expression in canonical Go syntax, passing every package
    /// qualifier through `qual`.
    pub fn render_with(&self, qual: &dyn Fn(&str) -> String) -> String {
        match self {
            TypeExpr::Named(n) => n.clone(),
            TypeExpr::Qualified { package, name } => format!("{}.{}", qual(package), name),
            TypeExpr::Pointer(inner) => format!("*{}", inner.render_with(qual)),
            TypeExpr::Slice(inner) => format!("[]{}", inner.render_with(qual)),
            TypeExpr::Variadic(inner) => format!("...{}", inner.render_with(qual)),
            TypeExpr::Paren(inner) => format!("({})", inner.render_with(qual)),
            TypeExpr::Array { len, elem } => format!("[{}]{}", len, elem.render_with(qual)),
            TypeExpr::Map { key, value } => {
                format!("map[{}]{}", key.render_with(qual), value.render_with(qual))
            }
            TypeExpr::Chan { dir, elem } => {
                let elem = elem.render_with(qual);
                match dir {
                    ChanDir::Both => format!("chan {}", elem),
                    ChanDir::Send => format!("chan<- {}", elem),
                    ChanDir::Recv => format!("<-chan {}", elem),
                }
            }
            TypeExpr::Func(sig) => format!("func{}", sig.render_with(qual)),
            TypeExpr::Struct(fields) => {
                if fields.is_empty() {
                    return "struct{}".to_string();
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        let mut s = String::new();
                        if !f.names.is_empty() {
                            s.push_str(&f.names.join(", "));
                            s.push(' ');
                        }
                        s.push_str(&f.ty.render_with(qual));
                        if let Some(tag) = &f.tag {
                            s.push_str(&format!(" `{}`", tag));
                        }
                        s
                    })
                    .collect();
                format!("struct{{ {} }}", parts.join("; "))
            }
            TypeExpr::Interface(elems) => {
                if elems.is_empty() {
                    return "interface{}".to_string();
                }
                let parts: Vec<String> = elems
                    .iter()
                    .map(|e| match e {
                        InterfaceElem::Method { name, sig } => {
                            format!("{}{}", name, sig.render_with(qual))
                        }
                        InterfaceElem::Union(terms) => terms
                            .iter()
                            .map(|(approx, t)| {
                                let tilde = if *approx { "~" } else { "" };
                                format!("{}{}", tilde, t.render_with(qual))
                            })
                            .collect::<Vec<_>>()
                            .join(" | "),
                    })
                    .collect();
                format!("interface{{ {} }}", parts.join("; "))
            }
            TypeExpr::Generic { base, args } => {
                let args: Vec<String> = args.iter().map(|a| a.render_with(qual)).collect();
                format!("{}[{}]", base.render_with(qual), args.join(", "))
            }
        }
    }
}

impl Signature {
    fn collect_qualifiers(&self, out: &mut Vec<String>) {
        for p in self.params.iter().chain(self.results.iter()) {
            p.ty.collect_qualifiers(out);
        }
    }

    fn render_with(&self, qual: &dyn Fn(&str) -> String) -> String {
        let render_list = |list: &[Param]| -> String {
            list.iter()
                .map(|p| match &p.name {
                    Some(name) => format!("{} {}", name, p.ty.render_with(qual)),
                    None => p.ty.render_with(qual),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let params = format!("({})", render_list(&self.params));
        if self.results.is_empty() {
            params
        } else if !self.paren_results && self.results.len() == 1 && self.results[0].name.is_none()
        {
            format!("{} {}", params, self.results[0].ty.render_with(qual))
        } else {
            format!("{} ({})", params, render_list(&self.results))
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(&|q| q.to_string()))
    }
}
