//! Program model: the compiled view of a solution that the analysis reads.
//!
//! The analysis never talks to a compiler directly. It consumes the
//! [`ProgramModel`] trait, which exposes projects, methods, attributes,
//! the type hierarchy and solution-wide caller lookup. [`Snapshot`] is the
//! in-tree implementation, loaded from a YAML or JSON description.

mod cancel;
mod file;
mod snapshot;

pub use cancel::CancelToken;
pub use file::{
    MethodDescription, ProjectDescription, SnapshotDescription, TypeDescription,
};
pub use snapshot::{Snapshot, SnapshotError};

use std::time::Duration;
use thiserror::Error;

/// Handle to a namespace, type or method inside one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Struct,
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKind::Class => write!(f, "class"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Struct => write!(f, "struct"),
        }
    }
}

/// What a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Namespace { global: bool },
    Type(TypeKind),
    Method,
}

/// A project as reported by the model, in dependency order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub index: usize,
    pub name: String,
}

/// An attribute attached to a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeRef {
    /// The attribute's defining type is known to the model.
    Resolved(SymbolId),
    /// The attribute names a type the model has no metadata for.
    Unresolved(String),
}

/// Errors reported by a program model query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("project {project:?} is unavailable: {reason}")]
    ProjectUnavailable { project: String, reason: String },
    #[error("analysis cancelled")]
    Cancelled,
    #[error("analysis timed out after {elapsed:?}")]
    TimedOut { elapsed: Duration },
}

/// The capabilities the name resolver needs from any symbol.
///
/// Namespaces, types and methods are all handled through this one view:
/// who contains me, what is my name, am I the root.
pub trait SymbolTree {
    /// The namespace or type that directly contains `symbol`.
    fn containing_symbol(&self, symbol: SymbolId) -> Option<SymbolId>;

    /// Undecorated metadata name (`List`1`, `Inner`, `Models`).
    fn simple_name(&self, symbol: SymbolId) -> &str;

    /// Minimally qualified display name (`List<T>`). Defaults to the simple name.
    fn display_name(&self, symbol: SymbolId) -> &str {
        self.simple_name(symbol)
    }

    /// True only for the root namespace of the snapshot.
    fn is_global_namespace(&self, symbol: SymbolId) -> bool;

    /// True for classes, interfaces and structs.
    fn is_type(&self, symbol: SymbolId) -> bool;
}

/// Compiled view of a whole solution.
///
/// Implementations must be immutable for the duration of a run; every
/// query is a pure read and may be issued from several threads at once.
pub trait ProgramModel: SymbolTree + Send + Sync {
    /// All projects, dependencies before dependents.
    fn projects_in_dependency_order(&self) -> Vec<ProjectRef>;

    /// Methods declared in `project`.
    fn list_methods(
        &self,
        project: &ProjectRef,
        cancel: &CancelToken,
    ) -> Result<Vec<SymbolId>, ModelError>;

    /// Attributes attached to `method`, in declaration order.
    fn attributes(&self, method: SymbolId) -> Vec<AttributeRef>;

    /// Direct base class of `ty`, absent for roots and interfaces.
    fn base_type(&self, ty: SymbolId) -> Option<SymbolId>;

    /// Every interface `ty` implements, already flattened over interface
    /// inheritance and the base chain.
    fn all_interfaces(&self, ty: SymbolId) -> Vec<SymbolId>;

    /// Methods anywhere in the solution that directly call `method`.
    fn find_callers(
        &self,
        method: SymbolId,
        cancel: &CancelToken,
    ) -> Result<Vec<SymbolId>, ModelError>;

    /// The type declaring `method`.
    fn containing_type(&self, method: SymbolId) -> Option<SymbolId>;

    /// Parameter type names of `method`.
    fn parameters(&self, method: SymbolId) -> &[String];
}
