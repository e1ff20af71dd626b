//! Classification runner that drives the analysis across projects.

use std::collections::HashSet;
use std::time::Duration;

use rayon::prelude::*;

use super::{
    qualified_name, AnalysisResult, ClassifiedMethod, Classifier, MarkerDetector, MarkerSet,
    Propagation,
};
use crate::model::{CancelToken, ModelError, ProgramModel, ProjectRef, SymbolId};

/// Classifies every method of every project in a program model.
pub struct Runner<'a, M: ProgramModel + ?Sized> {
    model: &'a M,
    markers: MarkerSet,
    propagation: Propagation,
    project_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl<'a, M: ProgramModel + ?Sized> Runner<'a, M> {
    /// Create a runner over `model` matching the given marker types.
    pub fn new(model: &'a M, markers: MarkerSet) -> Self {
        Self {
            model,
            markers,
            propagation: Propagation::default(),
            project_timeout: None,
            cancel: CancelToken::new(),
        }
    }

    /// Set how tested status propagates through callers.
    pub fn propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Give up on a project whose analysis takes longer than `timeout`.
    pub fn project_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.project_timeout = timeout;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Classify all methods, project by project in dependency order.
    ///
    /// A project that cannot be listed or that times out is recorded as
    /// skipped and the run moves on.
    pub fn run(&self) -> AnalysisResult {
        let detector = MarkerDetector::new(self.model, self.markers.clone());
        let classifier = Classifier::new(&detector, self.propagation);
        let mut result = AnalysisResult::new(self.propagation);
        let mut seen: HashSet<SymbolId> = HashSet::new();

        for project in self.model.projects_in_dependency_order() {
            let token = match self.project_timeout {
                Some(timeout) => self.cancel.with_timeout(timeout),
                None => self.cancel.clone(),
            };

            match self.run_project(&project, &classifier, &token, &mut seen) {
                Ok(project_result) => result.merge(project_result),
                Err(e) => {
                    tracing::warn!(project = %project.name, "skipping project: {}", e);
                    result.skip_project(&project.name, e.to_string());
                }
            }
        }

        result.unresolved_attributes = detector.unresolved_attributes();
        result.malformed_types = detector.malformed_types();
        result
    }

    fn run_project(
        &self,
        project: &ProjectRef,
        classifier: &Classifier<'_, 'a, M>,
        token: &CancelToken,
        seen: &mut HashSet<SymbolId>,
    ) -> Result<AnalysisResult, ModelError> {
        let methods = self.model.list_methods(project, token)?;

        let mut fresh = HashSet::new();
        let methods: Vec<SymbolId> = methods
            .into_iter()
            .filter(|id| !seen.contains(id) && fresh.insert(*id))
            .collect();
        tracing::info!(project = %project.name, methods = methods.len(), "classifying project");

        let verdicts: Vec<bool> = methods
            .par_iter()
            .map(|id| classifier.classify(*id, token))
            .collect::<Result<_, _>>()?;

        // Only a finished project claims its methods.
        let mut result = AnalysisResult::new(self.propagation);
        for (id, tested) in methods.into_iter().zip(verdicts) {
            seen.insert(id);
            result.add_method(self.describe(project, id), tested);
        }
        result.projects_analyzed = 1;
        Ok(result)
    }

    fn describe(&self, project: &ProjectRef, method: SymbolId) -> ClassifiedMethod {
        ClassifiedMethod {
            project: project.name.clone(),
            type_name: qualified_name(self.model, self.model.containing_type(method)),
            name: self.model.simple_name(method).to_string(),
            parameters: self.model.parameters(method).to_vec(),
        }
    }
}
