//! Immutable in-memory program model.
//!
//! A [`Snapshot`] is built once from a [`SnapshotDescription`] and then only
//! read. All cross references (base types, interfaces, call edges) are
//! resolved at load time, and the reverse call graph is indexed so caller
//! lookup is solution-wide and O(1).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::file::{normalize_parameter, MethodPath};
use super::{
    AttributeRef, CancelToken, MethodDescription, ModelError, ProgramModel, ProjectRef,
    SnapshotDescription, SymbolId, SymbolKind, SymbolTree, TypeDescription, TypeKind,
};
use crate::analysis::qualified_name;

/// Errors raised while loading a solution description.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported model format {0:?} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("unknown type {name:?} referenced by {referenced_by}")]
    UnknownType { name: String, referenced_by: String },
    #[error("unknown method {reference:?} called from {referenced_by}")]
    UnknownMethod {
        reference: String,
        referenced_by: String,
    },
    #[error("ambiguous method {reference:?} called from {referenced_by}; add a parameter list")]
    AmbiguousMethod {
        reference: String,
        referenced_by: String,
    },
    #[error("invalid method reference {reference:?} in {referenced_by}")]
    InvalidMethodRef {
        reference: String,
        referenced_by: String,
    },
    #[error("unknown project {name:?} referenced by project {referenced_by:?}")]
    UnknownProject { name: String, referenced_by: String },
    #[error("duplicate declaration {0:?}")]
    DuplicateName(String),
    #[error("invalid type hierarchy for {type_name}: {reason}")]
    InvalidHierarchy { type_name: String, reason: String },
}

#[derive(Debug)]
struct SymbolData {
    kind: SymbolKind,
    name: String,
    display_name: Option<String>,
    container: Option<SymbolId>,
}

#[derive(Debug, Default)]
struct TypeData {
    base: Option<SymbolId>,
    interfaces: Vec<SymbolId>,
    all_interfaces: Vec<SymbolId>,
    methods: Vec<SymbolId>,
}

#[derive(Debug)]
struct MethodData {
    containing_type: SymbolId,
    parameters: Vec<String>,
    attributes: Vec<AttributeRef>,
}

#[derive(Debug)]
struct ProjectData {
    name: String,
    error: Option<String>,
    methods: Vec<SymbolId>,
}

/// A compiled view of one solution.
#[derive(Debug)]
pub struct Snapshot {
    symbols: Vec<SymbolData>,
    types: HashMap<SymbolId, TypeData>,
    methods: HashMap<SymbolId, MethodData>,
    callers: HashMap<SymbolId, Vec<SymbolId>>,
    /// Projects in dependency order.
    projects: Vec<ProjectData>,
    global: SymbolId,
    namespaces: HashMap<String, SymbolId>,
    type_index: HashMap<String, SymbolId>,
}

impl Snapshot {
    /// Load a description from a `.yaml`, `.yml` or `.json` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            _ => Err(SnapshotError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, SnapshotError> {
        let desc: SnapshotDescription = serde_yaml::from_str(content)?;
        Self::from_description(&desc)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SnapshotError> {
        let desc: SnapshotDescription = serde_json::from_str(content)?;
        Self::from_description(&desc)
    }

    /// Build a snapshot, resolving every reference in the description.
    pub fn from_description(desc: &SnapshotDescription) -> Result<Self, SnapshotError> {
        let mut snapshot = Snapshot {
            symbols: Vec::new(),
            types: HashMap::new(),
            methods: HashMap::new(),
            callers: HashMap::new(),
            projects: Vec::new(),
            global: SymbolId(0),
            namespaces: HashMap::new(),
            type_index: HashMap::new(),
        };
        snapshot.global = snapshot.push_symbol(SymbolKind::Namespace { global: true }, "", None, None);

        // Declare every type and method first so references can point forward.
        let mut declared: Vec<(SymbolId, &TypeDescription)> = Vec::new();
        let mut project_methods: Vec<Vec<SymbolId>> = Vec::with_capacity(desc.projects.len());
        for project in &desc.projects {
            let mut methods = Vec::new();
            for ty in &project.types {
                let container = snapshot.namespace(ty.namespace.as_deref().unwrap_or(""))?;
                snapshot.declare_type(ty, container, &mut declared, &mut methods)?;
            }
            project_methods.push(methods);
        }
        for ty in &desc.external_types {
            let container = snapshot.namespace(ty.namespace.as_deref().unwrap_or(""))?;
            snapshot.declare_type(ty, container, &mut declared, &mut Vec::new())?;
        }

        for (id, ty) in &declared {
            snapshot.link_type(*id, ty)?;
        }
        snapshot.flatten_interfaces();

        let order = project_order(desc)?;
        let mut project_methods: Vec<Option<Vec<SymbolId>>> =
            project_methods.into_iter().map(Some).collect();
        for index in order {
            let project = &desc.projects[index];
            snapshot.projects.push(ProjectData {
                name: project.name.clone(),
                error: project.error.clone(),
                methods: project_methods[index].take().unwrap_or_default(),
            });
        }

        Ok(snapshot)
    }

    /// Look up a type by canonical qualified name.
    pub fn find_type(&self, qualified: &str) -> Option<SymbolId> {
        self.type_index.get(qualified).copied()
    }

    /// Look up a method by `<type>::<name>` or `<type>::<name>(<params>)`.
    pub fn find_method(&self, reference: &str) -> Option<SymbolId> {
        let path = MethodPath::parse(reference)?;
        self.resolve_method(&path).ok().flatten()
    }

    /// The global namespace of this snapshot.
    pub fn global_namespace(&self) -> SymbolId {
        self.global
    }

    /// Look up a namespace by dotted name.
    pub fn find_namespace(&self, dotted: &str) -> Option<SymbolId> {
        if dotted.is_empty() {
            return Some(self.global);
        }
        self.namespaces.get(dotted).copied()
    }

    /// Number of methods declared across all projects.
    pub fn method_count(&self) -> usize {
        self.projects.iter().map(|p| p.methods.len()).sum()
    }

    fn push_symbol(
        &mut self,
        kind: SymbolKind,
        name: &str,
        display_name: Option<String>,
        container: Option<SymbolId>,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            kind,
            name: name.to_string(),
            display_name,
            container,
        });
        id
    }

    /// Intern a dotted namespace, creating missing segments.
    ///
    /// A segment path already taken by a type is a duplicate name.
    fn namespace(&mut self, dotted: &str) -> Result<SymbolId, SnapshotError> {
        let mut current = self.global;
        let mut path = String::new();
        for segment in dotted.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);
            current = match self.namespaces.get(&path) {
                Some(id) => *id,
                None => {
                    if self.type_index.contains_key(&path) {
                        return Err(SnapshotError::DuplicateName(path));
                    }
                    let id = self.push_symbol(
                        SymbolKind::Namespace { global: false },
                        segment,
                        None,
                        Some(current),
                    );
                    self.namespaces.insert(path.clone(), id);
                    id
                }
            };
        }
        Ok(current)
    }

    fn declare_type<'a>(
        &mut self,
        ty: &'a TypeDescription,
        container: SymbolId,
        declared: &mut Vec<(SymbolId, &'a TypeDescription)>,
        project_methods: &mut Vec<SymbolId>,
    ) -> Result<(), SnapshotError> {
        let id = self.push_symbol(
            SymbolKind::Type(ty.kind),
            ty.name.trim(),
            ty.display_name.clone(),
            Some(container),
        );
        let qualified = qualified_name(&*self, Some(id));
        if self.namespaces.contains_key(&qualified)
            || self.type_index.insert(qualified.clone(), id).is_some()
        {
            return Err(SnapshotError::DuplicateName(qualified));
        }

        let mut data = TypeData::default();
        for method in &ty.methods {
            let method_id = self.declare_method(method, id, &qualified, &data.methods)?;
            data.methods.push(method_id);
            project_methods.push(method_id);
        }
        self.types.insert(id, data);
        declared.push((id, ty));

        for nested in &ty.nested_types {
            self.declare_type(nested, id, declared, project_methods)?;
        }
        Ok(())
    }

    fn declare_method(
        &mut self,
        method: &MethodDescription,
        owner: SymbolId,
        owner_name: &str,
        siblings: &[SymbolId],
    ) -> Result<SymbolId, SnapshotError> {
        let name = method.name.trim();
        let parameters: Vec<String> = method
            .parameters
            .iter()
            .map(|p| normalize_parameter(p))
            .collect();

        let duplicate = siblings.iter().any(|sibling| {
            self.symbols[sibling.index()].name == name
                && self.methods[sibling].parameters == parameters
        });
        if duplicate {
            return Err(SnapshotError::DuplicateName(format!(
                "{}::{}({})",
                owner_name,
                name,
                parameters.join(",")
            )));
        }

        let id = self.push_symbol(SymbolKind::Method, name, None, Some(owner));
        self.methods.insert(
            id,
            MethodData {
                containing_type: owner,
                parameters,
                attributes: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Resolve base type, interfaces, attributes and call edges of one type.
    fn link_type(&mut self, id: SymbolId, ty: &TypeDescription) -> Result<(), SnapshotError> {
        let type_name = qualified_name(&*self, Some(id));

        let base = match &ty.base {
            Some(base) if !base.trim().is_empty() => {
                if ty.kind == TypeKind::Interface {
                    return Err(SnapshotError::InvalidHierarchy {
                        type_name,
                        reason: "an interface cannot have a base type".to_string(),
                    });
                }
                let base_id = self.require_type(base, &type_name)?;
                if self.type_kind(base_id) == Some(TypeKind::Interface) {
                    return Err(SnapshotError::InvalidHierarchy {
                        reason: format!("base type {} is an interface", base.trim()),
                        type_name,
                    });
                }
                Some(base_id)
            }
            _ => None,
        };
        let mut interfaces = Vec::with_capacity(ty.interfaces.len());
        for iface in &ty.interfaces {
            let iface_id = self.require_type(iface, &type_name)?;
            match self.type_kind(iface_id) {
                Some(TypeKind::Interface) => interfaces.push(iface_id),
                kind => {
                    return Err(SnapshotError::InvalidHierarchy {
                        reason: format!(
                            "{} is listed as an interface but is a {}",
                            iface.trim(),
                            kind.unwrap_or_default()
                        ),
                        type_name,
                    })
                }
            }
        }

        let method_ids = self
            .types
            .get(&id)
            .map(|data| data.methods.clone())
            .unwrap_or_default();

        for (method_id, method) in method_ids.iter().zip(&ty.methods) {
            let attributes: Vec<AttributeRef> = method
                .attributes
                .iter()
                .map(|attr| match self.find_type(attr.trim()) {
                    Some(attr_type) => AttributeRef::Resolved(attr_type),
                    None => AttributeRef::Unresolved(attr.trim().to_string()),
                })
                .collect();
            if let Some(data) = self.methods.get_mut(method_id) {
                data.attributes = attributes;
            }

            let caller_name = format!("{}::{}", type_name, method.name.trim());
            for call in &method.calls {
                let callee = self.require_method(call, &caller_name)?;
                let callers = self.callers.entry(callee).or_default();
                if !callers.contains(method_id) {
                    callers.push(*method_id);
                }
            }
        }

        if let Some(data) = self.types.get_mut(&id) {
            data.base = base;
            data.interfaces = interfaces;
        }
        Ok(())
    }

    fn type_kind(&self, ty: SymbolId) -> Option<TypeKind> {
        match self.symbols.get(ty.index()).map(|s| s.kind) {
            Some(SymbolKind::Type(kind)) => Some(kind),
            _ => None,
        }
    }

    fn require_type(&self, name: &str, referenced_by: &str) -> Result<SymbolId, SnapshotError> {
        self.find_type(name.trim())
            .ok_or_else(|| SnapshotError::UnknownType {
                name: name.trim().to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    fn require_method(&self, reference: &str, referenced_by: &str) -> Result<SymbolId, SnapshotError> {
        let path = MethodPath::parse(reference).ok_or_else(|| SnapshotError::InvalidMethodRef {
            reference: reference.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;
        match self.resolve_method(&path) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(SnapshotError::UnknownMethod {
                reference: reference.to_string(),
                referenced_by: referenced_by.to_string(),
            }),
            Err(()) => Err(SnapshotError::AmbiguousMethod {
                reference: reference.to_string(),
                referenced_by: referenced_by.to_string(),
            }),
        }
    }

    /// `Ok(None)` when nothing matches, `Err(())` when overloads make the
    /// reference ambiguous.
    fn resolve_method(&self, path: &MethodPath) -> Result<Option<SymbolId>, ()> {
        let Some(owner) = self.find_type(&path.type_name) else {
            return Ok(None);
        };
        let Some(data) = self.types.get(&owner) else {
            return Ok(None);
        };

        let mut matches = data.methods.iter().copied().filter(|m| {
            self.symbols[m.index()].name == path.name
                && path
                    .parameters
                    .as_ref()
                    .map_or(true, |params| &self.methods[m].parameters == params)
        });
        let first = matches.next();
        if first.is_some() && matches.next().is_some() {
            return Err(());
        }
        Ok(first)
    }

    /// Precompute each type's interface set over its base chain and
    /// interface inheritance.
    fn flatten_interfaces(&mut self) {
        let ids: Vec<SymbolId> = self.types.keys().copied().collect();
        for id in ids {
            let mut seen_types = HashSet::new();
            let mut pending = Vec::new();

            let mut cursor = Some(id);
            while let Some(current) = cursor {
                if !seen_types.insert(current) {
                    break;
                }
                if let Some(data) = self.types.get(&current) {
                    pending.extend(data.interfaces.iter().rev().copied());
                    cursor = data.base;
                } else {
                    cursor = None;
                }
            }

            let mut seen = HashSet::new();
            let mut all = Vec::new();
            while let Some(iface) = pending.pop() {
                if iface == id || !seen.insert(iface) {
                    continue;
                }
                all.push(iface);
                if let Some(data) = self.types.get(&iface) {
                    pending.extend(data.interfaces.iter().rev().copied());
                }
            }

            if let Some(data) = self.types.get_mut(&id) {
                data.all_interfaces = all;
            }
        }
    }
}

/// Order projects so every project follows its references.
///
/// Ties keep declaration order. Projects caught in a reference cycle are
/// appended in declaration order.
fn project_order(desc: &SnapshotDescription) -> Result<Vec<usize>, SnapshotError> {
    let index: HashMap<&str, usize> = desc
        .projects
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.as_str(), i))
        .collect();

    let mut deps: Vec<Vec<usize>> = Vec::with_capacity(desc.projects.len());
    for project in &desc.projects {
        let mut resolved = Vec::new();
        for reference in &project.references {
            let dep = index
                .get(reference.as_str())
                .copied()
                .ok_or_else(|| SnapshotError::UnknownProject {
                    name: reference.clone(),
                    referenced_by: project.name.clone(),
                })?;
            resolved.push(dep);
        }
        deps.push(resolved);
    }

    let mut emitted = vec![false; desc.projects.len()];
    let mut order = Vec::with_capacity(desc.projects.len());
    while order.len() < desc.projects.len() {
        let ready = (0..desc.projects.len())
            .find(|&i| !emitted[i] && deps[i].iter().all(|&d| emitted[d] || d == i));
        match ready {
            Some(i) => {
                emitted[i] = true;
                order.push(i);
            }
            None => {
                let remaining: Vec<&str> = (0..desc.projects.len())
                    .filter(|&i| !emitted[i])
                    .map(|i| desc.projects[i].name.as_str())
                    .collect();
                tracing::warn!(
                    projects = ?remaining,
                    "project references form a cycle, using declaration order"
                );
                for i in 0..desc.projects.len() {
                    if !emitted[i] {
                        emitted[i] = true;
                        order.push(i);
                    }
                }
            }
        }
    }
    Ok(order)
}

impl SymbolTree for Snapshot {
    fn containing_symbol(&self, symbol: SymbolId) -> Option<SymbolId> {
        self.symbols.get(symbol.index()).and_then(|s| s.container)
    }

    fn simple_name(&self, symbol: SymbolId) -> &str {
        self.symbols
            .get(symbol.index())
            .map(|s| s.name.as_str())
            .unwrap_or("")
    }

    fn display_name(&self, symbol: SymbolId) -> &str {
        match self.symbols.get(symbol.index()) {
            Some(SymbolData {
                display_name: Some(display),
                ..
            }) => display.as_str(),
            Some(s) => s.name.as_str(),
            None => "",
        }
    }

    fn is_global_namespace(&self, symbol: SymbolId) -> bool {
        matches!(
            self.symbols.get(symbol.index()).map(|s| s.kind),
            Some(SymbolKind::Namespace { global: true })
        )
    }

    fn is_type(&self, symbol: SymbolId) -> bool {
        matches!(
            self.symbols.get(symbol.index()).map(|s| s.kind),
            Some(SymbolKind::Type(_))
        )
    }
}

impl ProgramModel for Snapshot {
    fn projects_in_dependency_order(&self) -> Vec<ProjectRef> {
        self.projects
            .iter()
            .enumerate()
            .map(|(index, p)| ProjectRef {
                index,
                name: p.name.clone(),
            })
            .collect()
    }

    fn list_methods(
        &self,
        project: &ProjectRef,
        cancel: &CancelToken,
    ) -> Result<Vec<SymbolId>, ModelError> {
        cancel.check()?;
        let data = self
            .projects
            .get(project.index)
            .ok_or_else(|| ModelError::ProjectUnavailable {
                project: project.name.clone(),
                reason: "not part of this snapshot".to_string(),
            })?;
        if let Some(reason) = &data.error {
            return Err(ModelError::ProjectUnavailable {
                project: data.name.clone(),
                reason: reason.clone(),
            });
        }
        Ok(data.methods.clone())
    }

    fn attributes(&self, method: SymbolId) -> Vec<AttributeRef> {
        self.methods
            .get(&method)
            .map(|m| m.attributes.clone())
            .unwrap_or_default()
    }

    fn base_type(&self, ty: SymbolId) -> Option<SymbolId> {
        self.types.get(&ty).and_then(|t| t.base)
    }

    fn all_interfaces(&self, ty: SymbolId) -> Vec<SymbolId> {
        self.types
            .get(&ty)
            .map(|t| t.all_interfaces.clone())
            .unwrap_or_default()
    }

    fn find_callers(
        &self,
        method: SymbolId,
        cancel: &CancelToken,
    ) -> Result<Vec<SymbolId>, ModelError> {
        cancel.check()?;
        Ok(self.callers.get(&method).cloned().unwrap_or_default())
    }

    fn containing_type(&self, method: SymbolId) -> Option<SymbolId> {
        self.methods.get(&method).map(|m| m.containing_type)
    }

    fn parameters(&self, method: SymbolId) -> &[String] {
        self.methods
            .get(&method)
            .map(|m| m.parameters.as_slice())
            .unwrap_or(&[])
    }
}
