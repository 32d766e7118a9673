//! Validation workflow integration tests: scripted authority runs under
//! paused time, and an end-to-end run against a wiremock HTTP authority.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use certsync::{
    AnalysisReport, CertStatus, Certificate, CertificateRegistry, Error, HttpAuthority,
    MemoryStore, NewCertificate, RemoteStore, Result, RetryPolicy, Serial, ValidationAuthority,
    ValidationOutcome, ValidationWorkflow,
};

/// Authority stub replaying a fixed sequence of reports.
struct ScriptedAuthority {
    reports: Mutex<VecDeque<AnalysisReport>>,
    requests: AtomicUsize,
    fetches: AtomicUsize,
    fetch_delay: Duration,
}

impl ScriptedAuthority {
    fn new(reports: Vec<AnalysisReport>) -> Self {
        Self {
            reports: Mutex::new(reports.into()),
            requests: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            fetch_delay: Duration::ZERO,
        }
    }

    fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }
}

#[async_trait]
impl ValidationAuthority for ScriptedAuthority {
    async fn request_analysis(&self, _domain: &str) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_analysis(&self, _domain: &str) -> Result<AnalysisReport> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        let mut reports = self.reports.lock().unwrap();
        reports.pop_front().ok_or_else(|| Error::transport("no scripted report left"))
    }
}

fn report(value: serde_json::Value) -> AnalysisReport {
    serde_json::from_value(value).unwrap()
}

fn ready_report() -> AnalysisReport {
    report(json!({
        "status": "READY",
        "endpoints": [{"details": {
            "notBefore": "2024-01-01T00:00:00Z",
            "notAfter": "2025-01-01T00:00:00Z",
            "issuerLabel": "TestCA"
        }}]
    }))
}

fn in_progress_report() -> AnalysisReport {
    report(json!({"status": "IN_PROGRESS", "endpoints": []}))
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy { initial_delay: Duration::from_millis(10), multiplier: 1.0, max_attempts }
}

async fn persisted_cert(
    registry: &CertificateRegistry,
) -> Certificate {
    registry.subscribe("alice").await.unwrap();
    registry
        .create(
            "alice",
            NewCertificate {
                common_name: "example.com".into(),
                issuer: "Old CA".into(),
                link: "https://example.com/path".into(),
            },
        )
        .await
        .unwrap()
}

fn workflow_over(
    authority: Arc<dyn ValidationAuthority>,
    policy: RetryPolicy,
) -> (Arc<MemoryStore>, Arc<CertificateRegistry>, ValidationWorkflow) {
    let store = Arc::new(MemoryStore::new());
    let registry =
        Arc::new(CertificateRegistry::new(Arc::clone(&store) as Arc<dyn RemoteStore>));
    let workflow = ValidationWorkflow::new(authority, Arc::clone(&registry), policy);
    (store, registry, workflow)
}

#[tokio::test(start_paused = true)]
async fn ready_report_is_applied_through_the_registry() {
    let authority = Arc::new(ScriptedAuthority::new(vec![ready_report()]));
    let (_store, registry, workflow) =
        workflow_over(Arc::clone(&authority) as Arc<dyn ValidationAuthority>, RetryPolicy::default());
    let cert = persisted_cert(&registry).await;

    let outcome = workflow.run(&cert).await.unwrap();
    match outcome {
        ValidationOutcome::Applied { valid_from, valid_to, issuer } => {
            assert_eq!(valid_from.to_string(), "2024-01-01");
            assert_eq!(valid_to.to_string(), "2025-01-01");
            assert_eq!(issuer, "TestCA");
        }
        other => panic!("expected Applied, got {:?}", other),
    }

    let synced = registry.snapshot().remove(0);
    assert_eq!(synced.valid_from.unwrap().to_string(), "2024-01-01");
    assert_eq!(synced.valid_to.unwrap().to_string(), "2025-01-01");
    assert_eq!(synced.issuer, "TestCA");
    assert_eq!(synced.status, CertStatus::Active);

    assert_eq!(authority.requests.load(Ordering::SeqCst), 1);
    assert_eq!(authority.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn not_ready_reports_exhaust_the_budget_without_writing() {
    let authority = Arc::new(ScriptedAuthority::new(vec![
        in_progress_report(),
        in_progress_report(),
        in_progress_report(),
    ]));
    let (store, registry, workflow) =
        workflow_over(Arc::clone(&authority) as Arc<dyn ValidationAuthority>, RetryPolicy::default());
    let cert = persisted_cert(&registry).await;
    let baseline = store.mutation_count();

    let started = tokio::time::Instant::now();
    let outcome = workflow.run(&cert).await.unwrap();
    assert_eq!(outcome, ValidationOutcome::NotReady);

    // Three attempts at 20 s, 40 s, 80 s under the default policy.
    assert_eq!(started.elapsed(), Duration::from_secs(140));
    assert_eq!(authority.fetches.load(Ordering::SeqCst), 3);
    assert_eq!(store.mutation_count(), baseline);

    // validFrom/validTo never appeared.
    let synced = registry.snapshot().remove(0);
    assert_eq!(synced.valid_from, None);
    assert_eq!(synced.valid_to, None);
}

#[tokio::test(start_paused = true)]
async fn ready_after_not_ready_applies_on_a_later_attempt() {
    let authority = Arc::new(ScriptedAuthority::new(vec![in_progress_report(), ready_report()]));
    let (_store, registry, workflow) =
        workflow_over(Arc::clone(&authority) as Arc<dyn ValidationAuthority>, RetryPolicy::default());
    let cert = persisted_cert(&registry).await;

    let outcome = workflow.run(&cert).await.unwrap();
    assert!(matches!(outcome, ValidationOutcome::Applied { .. }));
    assert_eq!(authority.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_issuer_label_falls_back_to_existing_issuer() {
    let authority = Arc::new(ScriptedAuthority::new(vec![report(json!({
        "status": "READY",
        "endpoints": [{"details": {
            "notBefore": 1704067200000i64,
            "notAfter": 1735689600000i64
        }}]
    }))]));
    let (_store, registry, workflow) =
        workflow_over(authority, RetryPolicy::default());
    let cert = persisted_cert(&registry).await;

    let outcome = workflow.run(&cert).await.unwrap();
    match outcome {
        ValidationOutcome::Applied { issuer, .. } => assert_eq!(issuer, "Old CA"),
        other => panic!("expected Applied, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn ready_without_details_is_a_malformed_failure() {
    let authority = Arc::new(ScriptedAuthority::new(vec![report(json!({
        "status": "READY",
        "endpoints": []
    }))]));
    let (store, registry, workflow) = workflow_over(authority, RetryPolicy::default());
    let cert = persisted_cert(&registry).await;
    let baseline = store.mutation_count();

    let err = workflow.run(&cert).await.unwrap_err();
    assert!(matches!(err, Error::MalformedAnalysis(_)));
    assert_eq!(store.mutation_count(), baseline);
}

#[tokio::test(start_paused = true)]
async fn unpersisted_certificate_reaches_ready_without_a_write() {
    let authority = Arc::new(ScriptedAuthority::new(vec![ready_report()]));
    let (store, _registry, workflow) = workflow_over(authority, RetryPolicy::default());

    let cert = Certificate {
        id: None,
        serial: Serial::from("SN-1"),
        common_name: "example.com".into(),
        issuer: "Old CA".into(),
        link: "https://example.com".into(),
        status: CertStatus::Active,
        valid_from: None,
        valid_to: None,
    };

    let outcome = workflow.run(&cert).await.unwrap();
    assert!(matches!(outcome, ValidationOutcome::Ready { .. }));
    assert_eq!(store.mutation_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_link_fails_before_touching_the_authority() {
    let authority = Arc::new(ScriptedAuthority::new(vec![ready_report()]));
    let (_store, _registry, workflow) =
        workflow_over(Arc::clone(&authority) as Arc<dyn ValidationAuthority>, RetryPolicy::default());

    let cert = Certificate {
        id: None,
        serial: Serial::from("SN-2"),
        common_name: "example.com".into(),
        issuer: "CA".into(),
        link: "https://".into(),
        status: CertStatus::Active,
        valid_from: None,
        valid_to: None,
    };

    let err = workflow.run(&cert).await.unwrap_err();
    assert!(matches!(err, Error::MalformedLink(_)));
    assert_eq!(authority.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_run_for_the_same_certificate_is_rejected() {
    let authority = Arc::new(
        ScriptedAuthority::new(vec![ready_report()])
            .with_fetch_delay(Duration::from_millis(200)),
    );
    let (_store, registry, workflow) = workflow_over(
        Arc::clone(&authority) as Arc<dyn ValidationAuthority>,
        fast_policy(1),
    );
    let workflow = Arc::new(workflow);
    let cert = persisted_cert(&registry).await;

    let first = {
        let workflow = Arc::clone(&workflow);
        let cert = cert.clone();
        tokio::spawn(async move { workflow.run(&cert).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = workflow.run(&cert).await.unwrap_err();
    assert!(matches!(err, Error::ValidationInFlight(_)));
    // The rejected run never reached the authority.
    assert_eq!(authority.requests.load(Ordering::SeqCst), 1);

    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, ValidationOutcome::Applied { .. }));

    // Once settled, the slot is free again.
    let err = workflow.run(&cert).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "script exhausted, guard released");
}

#[tokio::test]
async fn end_to_end_against_http_authority() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .and(query_param("host", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "READY",
            "endpoints": [{"details": {
                "notBefore": "2024-01-01T00:00:00Z",
                "notAfter": "2025-01-01T00:00:00Z",
                "issuerLabel": "TestCA"
            }}]
        })))
        .mount(&server)
        .await;

    let authority = Arc::new(HttpAuthority::new(format!("{}/api/v3", server.uri())));
    let (_store, registry, workflow) = workflow_over(authority, fast_policy(2));
    let cert = persisted_cert(&registry).await;

    let outcome = workflow.run(&cert).await.unwrap();
    assert!(matches!(outcome, ValidationOutcome::Applied { .. }));

    let synced = registry.snapshot().remove(0);
    assert_eq!(synced.valid_from.unwrap().to_string(), "2024-01-01");
    assert_eq!(synced.valid_to.unwrap().to_string(), "2025-01-01");
    assert_eq!(synced.issuer, "TestCA");
    assert_eq!(synced.status, CertStatus::Active);
}

#[tokio::test]
async fn http_authority_surfaces_not_ready_reports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "IN_PROGRESS"
        })))
        .mount(&server)
        .await;

    let authority = Arc::new(HttpAuthority::new(format!("{}/api/v3", server.uri())));
    let (store, registry, workflow) = workflow_over(authority, fast_policy(2));
    let cert = persisted_cert(&registry).await;
    let baseline = store.mutation_count();

    let outcome = workflow.run(&cert).await.unwrap();
    assert_eq!(outcome, ValidationOutcome::NotReady);
    assert_eq!(store.mutation_count(), baseline);
}
