//! Multi-strategy extraction orchestration.
//!
//! The orchestrator drives a priority-ordered backend list per extraction
//! kind and commits to the first backend whose result the acceptance policy
//! accepts — first-success, not best-of-N. No cross-backend merging ever
//! happens: comparing results from multiple backends would buy marginal
//! quality for duplicate-reconciliation complexity and the latency of
//! running every backend. A backend error is recorded and the loop moves
//! on; only total exhaustion or an unknown requested method surface as
//! failure, and both arrive as structured reports, never bare errors.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::backend::{BackendRegistry, ExtractRequest, FigureBackend, TableBackend};
use crate::error::{Error, Result};
use crate::model::{ExtractionAttempt, ExtractionTrail, FigureCandidate, TableCandidate};
use crate::score::ConfidenceScorer;

/// When the orchestrator commits to a backend's result.
///
/// The confidence score is always computed and attached; this only decides
/// whether it gates the fallback loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AcceptPolicy {
    /// Commit to any non-empty candidate list, score regardless.
    #[default]
    FirstNonEmpty,

    /// Discard candidates scoring below the threshold before the non-empty
    /// check; a backend whose survivors are empty counts as empty and the
    /// loop continues.
    MinConfidence(f32),
}

/// Result of one orchestrated table extraction.
#[derive(Debug, Clone, Serialize)]
pub struct TableExtraction {
    /// Whether any backend produced an accepted result
    pub success: bool,

    /// The committed candidates (empty on failure)
    pub tables: Vec<TableCandidate>,

    /// Name of the backend that produced the result
    pub method_used: Option<String>,

    /// Backends invoked, in order
    pub methods_tried: Vec<String>,

    /// Errors accumulated along the way
    pub errors: Vec<String>,

    /// Full attempt trail for observability
    pub attempts: ExtractionTrail,
}

impl TableExtraction {
    fn empty() -> Self {
        Self {
            success: false,
            tables: Vec::new(),
            method_used: None,
            methods_tried: Vec::new(),
            errors: Vec::new(),
            attempts: Vec::new(),
        }
    }
}

/// Result of one orchestrated figure extraction.
#[derive(Debug, Clone, Serialize)]
pub struct FigureExtraction {
    /// Whether any backend produced a non-empty result
    pub success: bool,

    /// The committed candidates (empty on failure)
    pub figures: Vec<FigureCandidate>,

    /// Name of the backend that produced the result
    pub method_used: Option<String>,

    /// Backends invoked, in order
    pub methods_tried: Vec<String>,

    /// Errors accumulated along the way
    pub errors: Vec<String>,

    /// Full attempt trail for observability
    pub attempts: ExtractionTrail,
}

impl FigureExtraction {
    fn empty() -> Self {
        Self {
            success: false,
            figures: Vec::new(),
            method_used: None,
            methods_tried: Vec::new(),
            errors: Vec::new(),
            attempts: Vec::new(),
        }
    }
}

/// Drives backend lists with first-success fallback.
pub struct Orchestrator {
    registry: BackendRegistry,
    scorer: ConfidenceScorer,
    policy: AcceptPolicy,
    backend_timeout: Option<Duration>,
}

impl Orchestrator {
    /// Create an orchestrator over a registry.
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            scorer: ConfidenceScorer::new(),
            policy: AcceptPolicy::default(),
            backend_timeout: None,
        }
    }

    /// Set the acceptance policy.
    pub fn with_policy(mut self, policy: AcceptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound each backend invocation; an overrun counts as that backend's
    /// error and the loop moves on.
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = Some(timeout);
        self
    }

    /// The backend registry.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Extract tables with fallback across the registered backends.
    ///
    /// `preferred_method` restricts the run to that single backend; an
    /// unregistered name yields a failed report with an unknown-method
    /// error. Invocation is strictly sequential — first-success semantics
    /// depend on the ordering.
    pub async fn extract_tables(
        &self,
        request: &ExtractRequest,
        preferred_method: Option<&str>,
    ) -> TableExtraction {
        let mut report = TableExtraction::empty();

        let backends: Vec<_> = match preferred_method {
            Some(name) => match self.registry.table(name) {
                Some(backend) => vec![backend],
                None => {
                    report
                        .errors
                        .push(Error::UnknownMethod(name.to_string()).to_string());
                    return report;
                }
            },
            None => self.registry.tables().to_vec(),
        };

        for backend in backends {
            let name = backend.name();
            log::info!("trying table extraction with {name}");
            report.methods_tried.push(name.to_string());

            let started = Instant::now();
            let outcome = self.invoke_table(backend.as_ref(), request).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(mut candidates) => {
                    for candidate in &mut candidates {
                        self.scorer.annotate(candidate);
                    }
                    let accepted = self.apply_policy(candidates);

                    if accepted.is_empty() {
                        log::info!("no tables found with {name}");
                        report.attempts.push(ExtractionAttempt::empty(name, elapsed));
                    } else {
                        log::info!(
                            "extracted {} table(s) using {name}",
                            accepted.len()
                        );
                        report.attempts.push(ExtractionAttempt::success(name, elapsed));
                        report.success = true;
                        report.tables = accepted;
                        report.method_used = Some(name.to_string());
                        return report;
                    }
                }
                Err(e) => {
                    log::error!("{name} failed: {e}");
                    report.errors.push(format!("{name} failed: {e}"));
                    report
                        .attempts
                        .push(ExtractionAttempt::error(name, elapsed, e.to_string()));
                }
            }
        }

        report
            .errors
            .push("All extraction methods failed or found no tables".to_string());
        report
    }

    /// Extract figures with fallback across the registered backends.
    pub async fn extract_figures(
        &self,
        request: &ExtractRequest,
        preferred_method: Option<&str>,
    ) -> FigureExtraction {
        let mut report = FigureExtraction::empty();

        let backends: Vec<_> = match preferred_method {
            Some(name) => match self.registry.figure(name) {
                Some(backend) => vec![backend],
                None => {
                    report
                        .errors
                        .push(Error::UnknownMethod(name.to_string()).to_string());
                    return report;
                }
            },
            None => self.registry.figures().to_vec(),
        };

        for backend in backends {
            let name = backend.name();
            log::info!("trying figure extraction with {name}");
            report.methods_tried.push(name.to_string());

            let started = Instant::now();
            let outcome = self.invoke_figure(backend.as_ref(), request).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(figures) => {
                    if figures.is_empty() {
                        log::info!("no figures found with {name}");
                        report.attempts.push(ExtractionAttempt::empty(name, elapsed));
                    } else {
                        log::info!("extracted {} figure(s) using {name}", figures.len());
                        report.attempts.push(ExtractionAttempt::success(name, elapsed));
                        report.success = true;
                        report.figures = figures;
                        report.method_used = Some(name.to_string());
                        return report;
                    }
                }
                Err(e) => {
                    log::error!("{name} failed: {e}");
                    report.errors.push(format!("{name} failed: {e}"));
                    report
                        .attempts
                        .push(ExtractionAttempt::error(name, elapsed, e.to_string()));
                }
            }
        }

        report
            .errors
            .push("All extraction methods failed or found no figures".to_string());
        report
    }

    async fn invoke_table(
        &self,
        backend: &dyn TableBackend,
        request: &ExtractRequest,
    ) -> Result<Vec<TableCandidate>> {
        match self.backend_timeout {
            Some(limit) => tokio::time::timeout(limit, backend.extract(request))
                .await
                .map_err(|_| {
                    Error::BackendTimeout(format!(
                        "{} exceeded the {:?} budget",
                        backend.name(),
                        limit
                    ))
                })?,
            None => backend.extract(request).await,
        }
    }

    async fn invoke_figure(
        &self,
        backend: &dyn FigureBackend,
        request: &ExtractRequest,
    ) -> Result<Vec<FigureCandidate>> {
        match self.backend_timeout {
            Some(limit) => tokio::time::timeout(limit, backend.extract(request))
                .await
                .map_err(|_| {
                    Error::BackendTimeout(format!(
                        "{} exceeded the {:?} budget",
                        backend.name(),
                        limit
                    ))
                })?,
            None => backend.extract(request).await,
        }
    }

    /// Filter candidates per the acceptance policy.
    fn apply_policy(&self, candidates: Vec<TableCandidate>) -> Vec<TableCandidate> {
        match self.policy {
            AcceptPolicy::FirstNonEmpty => candidates,
            AcceptPolicy::MinConfidence(threshold) => candidates
                .into_iter()
                .filter(|c| c.confidence.unwrap_or(0.0) >= threshold)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::model::{Document, Page, PageSelection};
    use crate::normalize::grid::candidate_from_grid;

    fn request() -> ExtractRequest {
        let mut doc = Document::new();
        doc.add_page(Page::new(0, 612.0, 792.0));
        ExtractRequest::new(Arc::new(doc), PageSelection::All)
    }

    fn candidate() -> TableCandidate {
        candidate_from_grid(
            0,
            0,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), "d".to_string()],
            ],
            "fake",
        )
        .unwrap()
    }

    /// Scripted backend: returns a fixed reply and counts invocations.
    struct Scripted {
        name: &'static str,
        reply: fn() -> Result<Vec<TableCandidate>>,
        calls: Arc<AtomicU32>,
    }

    impl Scripted {
        fn new(name: &'static str, reply: fn() -> Result<Vec<TableCandidate>>) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    name,
                    reply,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl TableBackend for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn extract(&self, _request: &ExtractRequest) -> Result<Vec<TableCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn orchestrator_with(backends: Vec<Scripted>) -> Orchestrator {
        let mut registry = BackendRegistry::new();
        for backend in backends {
            registry.register_table(Arc::new(backend));
        }
        Orchestrator::new(registry)
    }

    #[tokio::test]
    async fn test_fallback_to_second_backend() {
        let (a, _) = Scripted::new("a", || Ok(vec![]));
        let (b, _) = Scripted::new("b", || Ok(vec![candidate()]));
        let orchestrator = orchestrator_with(vec![a, b]);

        let report = orchestrator.extract_tables(&request(), None).await;
        assert!(report.success);
        assert_eq!(report.method_used.as_deref(), Some("b"));
        assert_eq!(report.methods_tried, vec!["a", "b"]);
        assert_eq!(report.tables.len(), 1);
    }

    #[tokio::test]
    async fn test_short_circuit_on_first_success() {
        let (a, _) = Scripted::new("a", || Ok(vec![candidate()]));
        let (b, b_calls) = Scripted::new("b", || Ok(vec![candidate()]));
        let orchestrator = orchestrator_with(vec![a, b]);

        let report = orchestrator.extract_tables(&request(), None).await;
        assert!(report.success);
        assert_eq!(report.methods_tried, vec!["a"]);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_recorded_and_loop_continues() {
        let (a, _) = Scripted::new("a", || Err(Error::Backend("broken".to_string())));
        let (b, _) = Scripted::new("b", || Ok(vec![candidate()]));
        let orchestrator = orchestrator_with(vec![a, b]);

        let report = orchestrator.extract_tables(&request(), None).await;
        assert!(report.success);
        assert_eq!(report.method_used.as_deref(), Some("b"));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("a failed"));
    }

    #[tokio::test]
    async fn test_total_exhaustion() {
        let (a, _) = Scripted::new("a", || Ok(vec![]));
        let (b, _) = Scripted::new("b", || Err(Error::Backend("down".to_string())));
        let orchestrator = orchestrator_with(vec![a, b]);

        let report = orchestrator.extract_tables(&request(), None).await;
        assert!(!report.success);
        assert_eq!(report.methods_tried, vec!["a", "b"]);
        assert!(report
            .errors
            .last()
            .unwrap()
            .contains("All extraction methods failed"));
        assert_eq!(report.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_preferred_method() {
        let (a, a_calls) = Scripted::new("a", || Ok(vec![candidate()]));
        let orchestrator = orchestrator_with(vec![a]);

        let report = orchestrator.extract_tables(&request(), Some("nope")).await;
        assert!(!report.success);
        assert!(report.errors[0].contains("Unknown extraction method"));
        assert!(report.methods_tried.is_empty());
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preferred_method_restricts_list() {
        let (a, a_calls) = Scripted::new("a", || Ok(vec![candidate()]));
        let (b, _) = Scripted::new("b", || Ok(vec![candidate()]));
        let orchestrator = orchestrator_with(vec![a, b]);

        let report = orchestrator.extract_tables(&request(), Some("b")).await;
        assert!(report.success);
        assert_eq!(report.method_used.as_deref(), Some("b"));
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_min_confidence_gate_falls_through() {
        // Backend "a" answers, but with a score under the gate: no bbox,
        // sparse cells. Backend "b" must win.
        let (a, _) = Scripted::new("a", || {
            Ok(vec![candidate_from_grid(
                0,
                0,
                vec![vec!["x".to_string(), String::new(), String::new()]],
                "a",
            )
            .unwrap()])
        });
        let (b, _) = Scripted::new("b", || {
            let mut c = candidate();
            c.bbox = Some(crate::model::Rect::new(0.0, 0.0, 10.0, 10.0));
            Ok(vec![c])
        });

        let orchestrator =
            orchestrator_with(vec![a, b]).with_policy(AcceptPolicy::MinConfidence(0.9));

        let report = orchestrator.extract_tables(&request(), None).await;
        assert!(report.success);
        assert_eq!(report.method_used.as_deref(), Some("b"));
        assert_eq!(report.methods_tried, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_candidates_are_annotated() {
        let (a, _) = Scripted::new("a", || Ok(vec![candidate()]));
        let orchestrator = orchestrator_with(vec![a]);

        let report = orchestrator.extract_tables(&request(), None).await;
        let table = &report.tables[0];
        assert!(table.confidence.is_some());
        assert!(table.has_header);
    }
}
