//! Type graph files.
//!
//! A YAML or JSON document describing named types, loaded into a
//! [`TypeGraph`]. Member types are written as type expressions:
//!
//! - builtin scalars in lowercase: `string`, `int32`, `uuid`, `date-time`, ...
//! - declared names: `Widget`, or qualified `app.Widget`
//! - generics: `List<Widget>`, `Dictionary<string, int64>`, `Page<Widget>`
//! - suffixes: `Widget[]` for a native array, `Widget?` for nullable
//!
//! ```yaml
//! types:
//!   - name: Node
//!     namespace: app
//!     kind: object
//!     fields:
//!       - { name: label, type: string, required: true }
//!       - { name: children, type: "List<Node>" }
//!   - name: Status
//!     kind: enum
//!     members: [{ name: Active }, { name: Closed, value: 9 }]
//! ```

use super::{
    Capability, CollectionAbstraction, EnumDescriptor, EnumMember, FieldDescriptor, IntegerRepr,
    ObjectDescriptor, ScalarKind, TypeGraph, TypeHandle, TypeShape,
};
use crate::constraints::Constraint;
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeGraphFile {
    pub types: Vec<TypeEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Object,
    Enum,
    /// Opaque named scalar, mapped only through overrides
    Scalar,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeEntry {
    /// Simple name, or a generic instantiation such as `Page<Widget>`
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub kind: EntryKind,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
    /// Enum representation, `i8`..`u64`
    #[serde(default)]
    pub repr: Option<String>,
    /// Collection expressions this object implements, e.g. `Dictionary<string, int32>`
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberEntry {
    pub name: String,
    /// Defaults to the member's position
    #[serde(default)]
    pub value: Option<i128>,
}

/// Parsed type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named { name: String, args: Vec<TypeExpr> },
    Array(Box<TypeExpr>),
    Nullable(Box<TypeExpr>),
}

#[cfg(test)]
impl TypeExpr {
    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named {
            name: name.to_string(),
            args: Vec::new(),
        }
    }
}

struct ExprParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn skip_ws(&mut self) {
        while let Some(c) = self.src[self.pos..].chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> anyhow::Result<&'a str> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.src[self.pos..].chars().next() {
            if c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '-') {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            bail!("expected a type name at offset {} in '{}'", start, self.src);
        }
        Ok(&self.src[start..self.pos])
    }

    fn expr(&mut self) -> anyhow::Result<TypeExpr> {
        let name = self.ident()?;
        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.expr()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                bail!("expected ',' or '>' at offset {} in '{}'", self.pos, self.src);
            }
        }
        let mut expr = TypeExpr::Named {
            name: name.to_string(),
            args,
        };
        loop {
            if self.eat('?') {
                expr = TypeExpr::Nullable(Box::new(expr));
            } else if self.eat('[') {
                if !self.eat(']') {
                    bail!("expected ']' at offset {} in '{}'", self.pos, self.src);
                }
                expr = TypeExpr::Array(Box::new(expr));
            } else {
                break;
            }
        }
        Ok(expr)
    }
}

/// Parse a type expression such as `Dictionary<string, List<Widget>>?`
pub fn parse_type_expr(src: &str) -> anyhow::Result<TypeExpr> {
    let mut parser = ExprParser { src, pos: 0 };
    let expr = parser.expr()?;
    if parser.peek().is_some() {
        bail!("unexpected trailing input at offset {} in '{}'", parser.pos, src);
    }
    Ok(expr)
}

/// A loaded graph plus the handles of the entries it declared
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub graph: TypeGraph,
    /// Namespace-qualified spelling and handle of each entry, in file order
    pub declared: Vec<(String, TypeHandle)>,
    aliases: HashMap<String, Alias>,
}

impl LoadedGraph {
    /// Handle for a declared entry by qualified name, or by simple name
    /// when only one namespace declares it
    pub fn find(&self, name: &str) -> Option<TypeHandle> {
        self.declared
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, handle)| *handle)
            .or_else(|| match self.aliases.get(name) {
                Some(Alias::Unique(handle)) => Some(*handle),
                _ => None,
            })
            .or_else(|| self.graph.find(name))
    }
}

/// Unqualified spelling of a namespaced entry
#[derive(Debug, Clone, Copy)]
enum Alias {
    Unique(TypeHandle),
    Ambiguous,
}

struct Resolver {
    graph: TypeGraph,
    qualified: HashMap<String, TypeHandle>,
    aliases: HashMap<String, Alias>,
    /// Namespace of the entry being resolved; its own names shadow other namespaces
    namespace: Option<String>,
}

impl Resolver {
    fn lookup(&self, spelling: &str) -> anyhow::Result<Option<TypeHandle>> {
        if let Some(ns) = self.namespace.as_deref() {
            if let Some(handle) = self.qualified.get(&qualify(Some(ns), spelling)) {
                return Ok(Some(*handle));
            }
        }
        if let Some(handle) = self.qualified.get(spelling) {
            return Ok(Some(*handle));
        }
        match self.aliases.get(spelling) {
            Some(Alias::Unique(handle)) => Ok(Some(*handle)),
            Some(Alias::Ambiguous) => {
                bail!("type '{spelling}' is declared in several namespaces; qualify it")
            }
            None => Ok(None),
        }
    }

    fn resolve(&mut self, expr: &TypeExpr) -> anyhow::Result<TypeHandle> {
        match expr {
            TypeExpr::Array(inner) => {
                let element = self.resolve(inner)?;
                Ok(self.graph.array(element))
            }
            TypeExpr::Nullable(inner) => {
                let inner = self.resolve(inner)?;
                Ok(self.graph.nullable(inner))
            }
            TypeExpr::Named { name, args } => {
                if let Some(handle) = self.lookup(&render_expr(expr))? {
                    return Ok(handle);
                }
                if args.is_empty() {
                    return match ScalarKind::from_keyword(name) {
                        Some(kind) => Ok(self.graph.scalar(kind)),
                        None => bail!("unknown type '{name}'"),
                    };
                }
                let resolved = args
                    .iter()
                    .map(|arg| self.resolve(arg))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                match (name.as_str(), resolved.as_slice()) {
                    ("Nullable", [inner]) => Ok(self.graph.nullable(*inner)),
                    ("KeyValuePair", [key, value]) => Ok(self.graph.key_value_pair(*key, *value)),
                    _ => Ok(self
                        .graph
                        .collection(CollectionAbstraction::from_name(name), resolved)),
                }
            }
        }
    }
}

/// Canonical spelling used as a lookup key: no whitespace
fn render_expr(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Named { name, args } if args.is_empty() => name.clone(),
        TypeExpr::Named { name, args } => {
            let inner: Vec<String> = args.iter().map(render_expr).collect();
            format!("{name}<{}>", inner.join(","))
        }
        TypeExpr::Array(inner) => format!("{}[]", render_expr(inner)),
        TypeExpr::Nullable(inner) => format!("{}?", render_expr(inner)),
    }
}

fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}.{name}"),
        _ => name.to_string(),
    }
}

impl TypeGraphFile {
    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(contents).context("invalid type graph document")
    }

    pub fn from_json_str(contents: &str) -> anyhow::Result<Self> {
        serde_json::from_str(contents).context("invalid type graph document")
    }

    /// Build the graph. Entries are declared first so they may reference
    /// each other (and themselves) in any order.
    pub fn build(&self) -> anyhow::Result<LoadedGraph> {
        let mut resolver = Resolver {
            graph: TypeGraph::new(),
            qualified: HashMap::new(),
            aliases: HashMap::new(),
            namespace: None,
        };

        // Non-generic entries first, so generic entries can use them as arguments
        let mut order: Vec<usize> = (0..self.types.len()).collect();
        order.sort_by_key(|&i| self.types[i].name.contains('<'));

        let mut slots: Vec<Option<(String, TypeHandle)>> = vec![None; self.types.len()];
        for i in order {
            let entry = &self.types[i];
            resolver.namespace = entry.namespace.clone();
            let expr = parse_type_expr(&entry.name)
                .with_context(|| format!("invalid type name '{}'", entry.name))?;
            let handle = match &expr {
                TypeExpr::Named { name, args } if args.is_empty() => {
                    resolver.graph.declare(&qualify(entry.namespace.as_deref(), name))
                }
                TypeExpr::Named { name, args } => {
                    let args = args
                        .iter()
                        .map(|arg| resolver.resolve(arg))
                        .collect::<anyhow::Result<Vec<_>>>()
                        .with_context(|| format!("in generic arguments of '{}'", entry.name))?;
                    resolver
                        .graph
                        .declare_generic(&qualify(entry.namespace.as_deref(), name), args)
                }
                _ => bail!("type name '{}' must be a plain or generic name", entry.name),
            };

            let spelling = render_expr(&expr);
            let qualified = qualify(entry.namespace.as_deref(), &spelling);
            if resolver.qualified.insert(qualified.clone(), handle).is_some() {
                bail!("type '{qualified}' is declared twice");
            }
            if qualified != spelling {
                resolver
                    .aliases
                    .entry(spelling)
                    .and_modify(|alias| *alias = Alias::Ambiguous)
                    .or_insert(Alias::Unique(handle));
            }
            slots[i] = Some((qualified, handle));
        }

        let mut declared = Vec::with_capacity(self.types.len());
        for (entry, slot) in self.types.iter().zip(slots) {
            let (qualified, handle) =
                slot.ok_or_else(|| anyhow!("type '{}' was not declared", entry.name))?;
            resolver.namespace = entry.namespace.clone();
            let shape = Self::shape_for(&mut resolver, entry)
                .with_context(|| format!("in type '{qualified}'"))?;
            resolver.graph.define(handle, shape);
            resolver.graph.set_constraints(handle, entry.constraints.clone());
            if let Some(example) = &entry.example {
                resolver.graph.set_example(handle, example.clone());
            }
            declared.push((qualified, handle));
        }

        Ok(LoadedGraph {
            graph: resolver.graph,
            declared,
            aliases: resolver.aliases,
        })
    }

    fn shape_for(resolver: &mut Resolver, entry: &TypeEntry) -> anyhow::Result<TypeShape> {
        match entry.kind {
            EntryKind::Scalar => {
                let name = match parse_type_expr(&entry.name)? {
                    TypeExpr::Named { name, .. } => name,
                    _ => entry.name.clone(),
                };
                Ok(TypeShape::Scalar(ScalarKind::Other(name)))
            }
            EntryKind::Enum => {
                let repr = match entry.repr.as_deref() {
                    Some(r) => IntegerRepr::parse(r)
                        .ok_or_else(|| anyhow!("unknown enum representation '{r}'"))?,
                    None => IntegerRepr::default(),
                };
                let members = entry
                    .members
                    .iter()
                    .enumerate()
                    .map(|(i, m)| EnumMember::new(m.name.clone(), m.value.unwrap_or(i as i128)))
                    .collect();
                Ok(TypeShape::Enum(EnumDescriptor { members, repr }))
            }
            EntryKind::Object => {
                let mut object = ObjectDescriptor::new();
                for field in &entry.fields {
                    let expr = parse_type_expr(&field.ty)
                        .with_context(|| format!("in field '{}'", field.name))?;
                    let ty = resolver
                        .resolve(&expr)
                        .with_context(|| format!("in field '{}'", field.name))?;
                    let mut descriptor = FieldDescriptor::new(field.name.clone(), ty);
                    descriptor.required = field.required;
                    descriptor.constraints = field.constraints.clone();
                    descriptor.example = field.example.clone();
                    object = object.field(descriptor);
                }
                for capability in &entry.implements {
                    object = object.capability(Self::capability(resolver, capability)?);
                }
                Ok(TypeShape::Object(object))
            }
        }
    }

    fn capability(resolver: &mut Resolver, src: &str) -> anyhow::Result<Capability> {
        let expr = parse_type_expr(src)?;
        let TypeExpr::Named { name, args } = &expr else {
            bail!("capability '{src}' must be a generic collection");
        };
        let abstraction = CollectionAbstraction::from_name(name);
        let args = args
            .iter()
            .map(|arg| resolver.resolve(arg))
            .collect::<anyhow::Result<Vec<_>>>()?;
        match args.as_slice() {
            [key, value] if abstraction.is_map() => Ok(Capability::Map {
                key: *key,
                value: *value,
            }),
            [element] if abstraction.is_sequence() => Ok(Capability::Sequence(*element)),
            _ => bail!("capability '{src}' is neither a sequence nor a map"),
        }
    }
}

/// Load a type graph file; `.json` is parsed as JSON, anything else as YAML
pub fn load_type_graph(path: &Path) -> anyhow::Result<LoadedGraph> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read type graph: {}", path.display()))?;
    let file = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => TypeGraphFile::from_json_str(&contents),
        _ => TypeGraphFile::from_yaml_str(&contents),
    }
    .with_context(|| format!("Failed to parse type graph: {}", path.display()))?;
    file.build()
        .with_context(|| format!("Failed to build type graph: {}", path.display()))
}
