//! Result types for a classification run.

use serde::{Deserialize, Serialize};

use super::Propagation;

/// One analyzed method, with enough identity to print it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedMethod {
    pub project: String,
    /// Canonical qualified name of the declaring type.
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ClassifiedMethod {
    /// `Name(p1, p2)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameters.join(", "))
    }
}

impl std::fmt::Display for ClassifiedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.type_name, self.name)
    }
}

/// A project the model could not analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedProject {
    pub name: String,
    pub reason: String,
}

/// Partitioned results of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub propagation: Propagation,
    pub tested: Vec<ClassifiedMethod>,
    pub untested: Vec<ClassifiedMethod>,
    /// Projects analyzed successfully.
    pub projects_analyzed: usize,
    #[serde(default)]
    pub skipped_projects: Vec<SkippedProject>,
    /// Attribute types the model had no metadata for.
    #[serde(default)]
    pub unresolved_attributes: Vec<String>,
    /// Types with a cyclic base chain.
    #[serde(default)]
    pub malformed_types: Vec<String>,
}

impl AnalysisResult {
    pub fn new(propagation: Propagation) -> Self {
        Self {
            propagation,
            ..Self::default()
        }
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: AnalysisResult) {
        self.tested.extend(other.tested);
        self.untested.extend(other.untested);
        self.projects_analyzed += other.projects_analyzed;
        self.skipped_projects.extend(other.skipped_projects);
        for name in other.unresolved_attributes {
            if !self.unresolved_attributes.contains(&name) {
                self.unresolved_attributes.push(name);
            }
        }
        for name in other.malformed_types {
            if !self.malformed_types.contains(&name) {
                self.malformed_types.push(name);
            }
        }
    }

    /// Record a method in the partition matching `tested`.
    pub fn add_method(&mut self, method: ClassifiedMethod, tested: bool) {
        if tested {
            self.tested.push(method);
        } else {
            self.untested.push(method);
        }
    }

    pub fn skip_project(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.skipped_projects.push(SkippedProject {
            name: name.into(),
            reason: reason.into(),
        });
    }

    /// Number of classified methods.
    pub fn total(&self) -> usize {
        self.tested.len() + self.untested.len()
    }

    /// Whether anything was skipped or could not be evaluated.
    pub fn has_diagnostics(&self) -> bool {
        !self.skipped_projects.is_empty()
            || !self.unresolved_attributes.is_empty()
            || !self.malformed_types.is_empty()
    }
}
