//! Test marker detection.
//!
//! A method is a test when one of its attributes can be treated as a
//! configured marker type. Matching is by canonical qualified name over the
//! attribute type's assignability closure, so subclassed attributes
//! (`TheoryAttribute : FactAttribute`) and marker interfaces both count.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use super::closure::assignability_closure;
use super::names::qualified_name;
use crate::model::{AttributeRef, ProgramModel, SymbolId};

/// Ordered set of canonical marker type names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    names: Vec<String>,
    lookup: HashSet<String>,
}

impl MarkerSet {
    /// Build a marker set, trimming names and dropping blanks and repeats.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && set.lookup.insert(name.to_string()) {
                set.names.push(name.to_string());
            }
        }
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains(name)
    }

    /// Names in configuration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Decides whether methods are self-marked tests.
///
/// Verdicts are memoized per attribute type and per method for the
/// lifetime of the detector. Symbols that could not be evaluated are
/// collected for the run summary.
pub struct MarkerDetector<'a, M: ProgramModel + ?Sized> {
    model: &'a M,
    markers: MarkerSet,
    type_verdicts: RwLock<HashMap<SymbolId, bool>>,
    method_verdicts: RwLock<HashMap<SymbolId, bool>>,
    unresolved: Mutex<BTreeSet<String>>,
    malformed: Mutex<BTreeSet<String>>,
}

impl<'a, M: ProgramModel + ?Sized> MarkerDetector<'a, M> {
    pub fn new(model: &'a M, markers: MarkerSet) -> Self {
        Self {
            model,
            markers,
            type_verdicts: RwLock::new(HashMap::new()),
            method_verdicts: RwLock::new(HashMap::new()),
            unresolved: Mutex::new(BTreeSet::new()),
            malformed: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn model(&self) -> &'a M {
        self.model
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// True when `method` carries an attribute assignable to a marker type.
    pub fn is_marker(&self, method: SymbolId) -> bool {
        if let Ok(cache) = self.method_verdicts.read() {
            if let Some(verdict) = cache.get(&method) {
                return *verdict;
            }
        }

        let verdict = self.model.attributes(method).iter().any(|attr| match attr {
            AttributeRef::Resolved(ty) => self.type_is_marker(*ty),
            AttributeRef::Unresolved(name) => {
                self.note_unresolved(name);
                false
            }
        });

        if let Ok(mut cache) = self.method_verdicts.write() {
            cache.insert(method, verdict);
        }
        verdict
    }

    /// True when some member of `ty`'s assignability closure is a marker.
    pub fn type_is_marker(&self, ty: SymbolId) -> bool {
        if let Ok(cache) = self.type_verdicts.read() {
            if let Some(verdict) = cache.get(&ty) {
                return *verdict;
            }
        }

        let verdict = match assignability_closure(self.model, ty) {
            Ok(closure) => closure
                .into_iter()
                .any(|member| self.markers.contains(&qualified_name(self.model, Some(member)))),
            Err(e) => {
                tracing::warn!("{}; ignoring it for marker matching", e);
                if let Ok(mut malformed) = self.malformed.lock() {
                    malformed.insert(qualified_name(self.model, Some(ty)));
                }
                false
            }
        };

        if let Ok(mut cache) = self.type_verdicts.write() {
            cache.insert(ty, verdict);
        }
        verdict
    }

    /// Record an unresolved attribute type, logging it the first time only.
    fn note_unresolved(&self, name: &str) {
        let Ok(mut unresolved) = self.unresolved.lock() else {
            return;
        };
        if !unresolved.contains(name) {
            tracing::debug!(attribute = %name, "attribute type could not be resolved");
            unresolved.insert(name.to_string());
        }
    }

    /// Attribute type names that could not be resolved so far.
    pub fn unresolved_attributes(&self) -> Vec<String> {
        self.unresolved
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Types whose base chain turned out to be cyclic.
    pub fn malformed_types(&self) -> Vec<String> {
        self.malformed
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snapshot;

    const SOLUTION: &str = r#"
projects:
  - name: Tests
    types:
      - name: Suite
        namespace: App.Tests
        methods:
          - name: Plain
          - name: Direct
            attributes: [NUnit.Framework.TestAttribute]
          - name: Derived
            attributes: [App.Tests.RetryTestAttribute]
          - name: ViaInterface
            attributes: [App.Tests.ScenarioAttribute]
          - name: Unknown
            attributes: [Vendor.Missing.Attribute]
          - name: AlsoUnknown
            attributes: [Vendor.Missing.Attribute]
          - name: Broken
            attributes: [App.Tests.LoopAttribute]
          - name: Mixed
            attributes: [System.ObsoleteAttribute, NUnit.Framework.TestAttribute]
      - name: RetryTestAttribute
        namespace: App.Tests
        base: NUnit.Framework.TestAttribute
      - name: ScenarioAttribute
        namespace: App.Tests
        base: System.Attribute
        interfaces: [App.Tests.IMarker]
      - name: IMarker
        namespace: App.Tests
        kind: interface
      - name: LoopAttribute
        namespace: App.Tests
        base: App.Tests.LoopAttribute
external_types:
  - name: Attribute
    namespace: System
  - name: ObsoleteAttribute
    namespace: System
    base: System.Attribute
  - name: TestAttribute
    namespace: NUnit.Framework
    base: System.Attribute
"#;

    fn method(s: &Snapshot, name: &str) -> SymbolId {
        s.find_method(&format!("App.Tests.Suite::{}", name)).unwrap()
    }

    #[test]
    fn test_marker_set_dedupes_and_keeps_order() {
        let set = MarkerSet::new(["B", " A ", "B", ""]);
        assert_eq!(set.names(), &["B".to_string(), "A".to_string()]);
        assert!(set.contains("A"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_direct_marker() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::new(["NUnit.Framework.TestAttribute"]));
        assert!(detector.is_marker(method(&s, "Direct")));
        assert!(detector.is_marker(method(&s, "Mixed")));
        assert!(!detector.is_marker(method(&s, "Plain")));
    }

    #[test]
    fn test_subclassed_attribute_matches_base_marker() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::new(["NUnit.Framework.TestAttribute"]));
        assert!(detector.is_marker(method(&s, "Derived")));
    }

    #[test]
    fn test_interface_marker() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::new(["App.Tests.IMarker"]));
        assert!(detector.is_marker(method(&s, "ViaInterface")));
        assert!(!detector.is_marker(method(&s, "Direct")));
    }

    #[test]
    fn test_unresolved_attribute_is_no_match() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::new(["Vendor.Missing.Attribute"]));
        assert!(!detector.is_marker(method(&s, "Unknown")));
        assert_eq!(
            detector.unresolved_attributes(),
            vec!["Vendor.Missing.Attribute".to_string()]
        );
    }

    #[test]
    fn test_unresolved_attribute_reported_once_per_type() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::new(["NUnit.Framework.TestAttribute"]));
        assert!(!detector.is_marker(method(&s, "Unknown")));
        assert!(!detector.is_marker(method(&s, "AlsoUnknown")));
        assert_eq!(
            detector.unresolved_attributes(),
            vec!["Vendor.Missing.Attribute".to_string()]
        );
    }

    #[test]
    fn test_malformed_hierarchy_is_no_match() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::new(["App.Tests.LoopAttribute"]));
        assert!(!detector.is_marker(method(&s, "Broken")));
        assert_eq!(
            detector.malformed_types(),
            vec!["App.Tests.LoopAttribute".to_string()]
        );
    }

    #[test]
    fn test_empty_marker_set_matches_nothing() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::default());
        assert!(!detector.is_marker(method(&s, "Direct")));
    }
}
