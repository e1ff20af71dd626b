//! Assignability closure of a type.

use std::collections::BTreeSet;

use thiserror::Error;

use super::names::qualified_name;
use crate::model::{ProgramModel, SymbolId};

/// Errors raised by the analysis itself (as opposed to the model).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("type {type_name:?} has a cyclic base type chain")]
    MalformedHierarchy { type_name: String },
}

/// Every type `ty` can be treated as: itself, each class ancestor, and
/// every interface it implements.
///
/// The base chain is walked with an explicit cursor. A chain that revisits
/// a type is reported as [`AnalysisError::MalformedHierarchy`].
pub fn assignability_closure<M: ProgramModel + ?Sized>(
    model: &M,
    ty: SymbolId,
) -> Result<BTreeSet<SymbolId>, AnalysisError> {
    let mut closure = BTreeSet::new();
    closure.insert(ty);

    let mut current = ty;
    while let Some(base) = model.base_type(current) {
        if !closure.insert(base) {
            return Err(AnalysisError::MalformedHierarchy {
                type_name: qualified_name(model, Some(ty)),
            });
        }
        current = base;
    }

    closure.extend(model.all_interfaces(ty));
    Ok(closure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snapshot;

    const HIERARCHY: &str = r#"
projects:
  - name: P
    types:
      - name: Root
      - name: Middle
        base: Root
        interfaces: [IMarker]
      - name: Leaf
        base: Middle
        interfaces: [IOther]
      - name: IMarker
        kind: interface
      - name: IOther
        kind: interface
      - name: Loop
        base: Loop
      - name: PingA
        base: PingB
      - name: PingB
        base: PingA
"#;

    fn ids(s: &Snapshot, names: &[&str]) -> BTreeSet<SymbolId> {
        names.iter().map(|n| s.find_type(n).unwrap()).collect()
    }

    #[test]
    fn test_root_type_closure_is_itself() {
        let s = Snapshot::from_yaml_str(HIERARCHY).unwrap();
        let root = s.find_type("Root").unwrap();
        assert_eq!(assignability_closure(&s, root).unwrap(), ids(&s, &["Root"]));
    }

    #[test]
    fn test_closure_walks_whole_base_chain() {
        let s = Snapshot::from_yaml_str(HIERARCHY).unwrap();
        let leaf = s.find_type("Leaf").unwrap();
        let closure = assignability_closure(&s, leaf).unwrap();
        assert_eq!(
            closure,
            ids(&s, &["Leaf", "Middle", "Root", "IMarker", "IOther"])
        );
    }

    #[test]
    fn test_closure_contains_self_once() {
        let s = Snapshot::from_yaml_str(HIERARCHY).unwrap();
        let leaf = s.find_type("Leaf").unwrap();
        let closure: Vec<_> = assignability_closure(&s, leaf).unwrap().into_iter().collect();
        assert_eq!(closure.iter().filter(|id| **id == leaf).count(), 1);
    }

    #[test]
    fn test_self_referential_base_is_malformed() {
        let s = Snapshot::from_yaml_str(HIERARCHY).unwrap();
        let ty = s.find_type("Loop").unwrap();
        assert_eq!(
            assignability_closure(&s, ty),
            Err(AnalysisError::MalformedHierarchy {
                type_name: "Loop".to_string()
            })
        );
    }

    #[test]
    fn test_mutual_base_cycle_is_malformed() {
        let s = Snapshot::from_yaml_str(HIERARCHY).unwrap();
        let ty = s.find_type("PingA").unwrap();
        assert!(matches!(
            assignability_closure(&s, ty),
            Err(AnalysisError::MalformedHierarchy { .. })
        ));
    }
}
