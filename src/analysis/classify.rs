//! Tested-method classification over the reverse call graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::markers::MarkerDetector;
use crate::model::{CancelToken, ModelError, ProgramModel, SymbolId};

/// How "tested" status travels from test methods to the code they call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// A method is tested when any chain of callers reaches a test.
    #[default]
    Transitive,
    /// Legacy mode: only a test's direct callees count as tested.
    /// Under-reports coverage for anything reached through a helper.
    OneHop,
}

impl Propagation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Propagation::Transitive => "transitive",
            Propagation::OneHop => "one_hop",
        }
    }
}

impl std::fmt::Display for Propagation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "transitive" => Ok(Propagation::Transitive),
            "one_hop" | "onehop" => Ok(Propagation::OneHop),
            _ => Err(format!(
                "unknown propagation mode: {} (expected 'transitive' or 'one_hop')",
                s
            )),
        }
    }
}

/// Classifies methods as tested or untested.
///
/// In transitive mode every finished search is memoized: a method proven
/// untested has no test anywhere among its callers, so later searches stop
/// at it instead of walking the same subgraph again.
pub struct Classifier<'d, 'm, M: ProgramModel + ?Sized> {
    detector: &'d MarkerDetector<'m, M>,
    propagation: Propagation,
    verdicts: RwLock<HashMap<SymbolId, bool>>,
}

impl<'d, 'm, M: ProgramModel + ?Sized> Classifier<'d, 'm, M> {
    pub fn new(detector: &'d MarkerDetector<'m, M>, propagation: Propagation) -> Self {
        Self {
            detector,
            propagation,
            verdicts: RwLock::new(HashMap::new()),
        }
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// Whether `method` is a test or is reached from one.
    pub fn classify(&self, method: SymbolId, cancel: &CancelToken) -> Result<bool, ModelError> {
        if self.detector.is_marker(method) {
            return Ok(true);
        }
        match self.propagation {
            Propagation::OneHop => self.classify_one_hop(method, cancel),
            Propagation::Transitive => self.classify_transitive(method, cancel),
        }
    }

    fn classify_one_hop(&self, method: SymbolId, cancel: &CancelToken) -> Result<bool, ModelError> {
        let callers = self.detector.model().find_callers(method, cancel)?;
        Ok(callers.into_iter().any(|caller| self.detector.is_marker(caller)))
    }

    /// Breadth-first search up the caller graph from `method`.
    fn classify_transitive(
        &self,
        method: SymbolId,
        cancel: &CancelToken,
    ) -> Result<bool, ModelError> {
        if let Some(verdict) = self.cached(method) {
            return Ok(verdict);
        }

        let model = self.detector.model();
        let mut visited = HashSet::from([method]);
        let mut queue = VecDeque::from([method]);
        let mut tested = false;

        while let Some(current) = queue.pop_front() {
            if current != method {
                match self.cached(current) {
                    Some(true) => {
                        tested = true;
                        break;
                    }
                    Some(false) => continue,
                    None => {}
                }
                if self.detector.is_marker(current) {
                    tested = true;
                    break;
                }
            }

            for caller in model.find_callers(current, cancel)? {
                if visited.insert(caller) {
                    queue.push_back(caller);
                }
            }
        }

        if let Ok(mut cache) = self.verdicts.write() {
            if tested {
                cache.insert(method, true);
            } else {
                for id in visited {
                    cache.insert(id, false);
                }
            }
        }
        Ok(tested)
    }

    fn cached(&self, method: SymbolId) -> Option<bool> {
        self.verdicts
            .read()
            .ok()
            .and_then(|cache| cache.get(&method).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MarkerSet;
    use crate::model::Snapshot;

    const SOLUTION: &str = r#"
projects:
  - name: App
    types:
      - name: Code
        namespace: App
        methods:
          - name: TestA
            attributes: [Test]
            calls: ["App.Code::Helper"]
          - name: Helper
            calls: ["App.Code::Target"]
          - name: Target
          - name: Direct
          - name: TestB
            attributes: [Test]
            calls: ["App.Code::Direct"]
          - name: X
            calls: ["App.Code::Y"]
          - name: Y
            calls: ["App.Code::X"]
          - name: Recursive
            calls: ["App.Code::Recursive"]
          - name: Lonely
          - name: LoopEntry
            attributes: [Test]
            calls: ["App.Code::P"]
          - name: P
            calls: ["App.Code::Q"]
          - name: Q
            calls: ["App.Code::P"]
external_types:
  - name: Test
"#;

    fn id(s: &Snapshot, name: &str) -> SymbolId {
        s.find_method(&format!("App.Code::{}", name)).unwrap()
    }

    fn classify_all(s: &Snapshot, propagation: Propagation, names: &[&str]) -> Vec<bool> {
        let detector = MarkerDetector::new(s, MarkerSet::new(["Test"]));
        let classifier = Classifier::new(&detector, propagation);
        let token = CancelToken::new();
        names
            .iter()
            .map(|n| classifier.classify(id(s, n), &token).unwrap())
            .collect()
    }

    #[test]
    fn test_default_propagation_is_transitive() {
        assert_eq!(Propagation::default(), Propagation::Transitive);
    }

    #[test]
    fn test_parse_propagation() {
        assert_eq!("transitive".parse::<Propagation>(), Ok(Propagation::Transitive));
        assert_eq!("one-hop".parse::<Propagation>(), Ok(Propagation::OneHop));
        assert_eq!("ONE_HOP".parse::<Propagation>(), Ok(Propagation::OneHop));
        assert!("deep".parse::<Propagation>().is_err());
    }

    #[test]
    fn test_marker_is_tested_without_callers() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        assert_eq!(classify_all(&s, Propagation::Transitive, &["TestA"]), vec![true]);
        assert_eq!(classify_all(&s, Propagation::OneHop, &["TestA"]), vec![true]);
    }

    #[test]
    fn test_transitive_reaches_through_helper() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        assert_eq!(
            classify_all(&s, Propagation::Transitive, &["Helper", "Target"]),
            vec![true, true]
        );
    }

    #[test]
    fn test_one_hop_stops_at_helper() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        assert_eq!(
            classify_all(&s, Propagation::OneHop, &["Helper", "Target", "Direct"]),
            vec![true, false, true]
        );
    }

    #[test]
    fn test_mutual_recursion_terminates_untested() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        assert_eq!(
            classify_all(&s, Propagation::Transitive, &["X", "Y", "Recursive", "Lonely"]),
            vec![false, false, false, false]
        );
        assert_eq!(
            classify_all(&s, Propagation::OneHop, &["X", "Y"]),
            vec![false, false]
        );
    }

    #[test]
    fn test_cycle_reached_from_test_is_tested() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        assert_eq!(
            classify_all(&s, Propagation::Transitive, &["Q", "P"]),
            vec![true, true]
        );
    }

    #[test]
    fn test_memoized_results_match_fresh_results() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let names = ["X", "Y", "Target", "Helper", "Lonely", "Q", "X", "Target"];
        let batch = classify_all(&s, Propagation::Transitive, &names);
        let fresh: Vec<bool> = names
            .iter()
            .map(|n| classify_all(&s, Propagation::Transitive, &[*n])[0])
            .collect();
        assert_eq!(batch, fresh);
    }

    #[test]
    fn test_cancelled_token_fails_classification() {
        let s = Snapshot::from_yaml_str(SOLUTION).unwrap();
        let detector = MarkerDetector::new(&s, MarkerSet::new(["Test"]));
        let classifier = Classifier::new(&detector, Propagation::Transitive);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            classifier.classify(id(&s, "Target"), &token),
            Err(ModelError::Cancelled)
        );
        // Markers need no model query.
        assert_eq!(classifier.classify(id(&s, "TestA"), &token), Ok(true));
    }
}
