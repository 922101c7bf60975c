//! End-to-end tests against a scripted compiler

#![cfg(unix)]

use cuescope_core::prelude::*;
use cuescope_core::{CompilerConfig, IMPORTS_NOT_ALLOWED};
use cuescope_graph::DOCUMENT_NODE_ID;
use cuescope_test_utils::{
    clean_value, Behavior, FakeCompiler, BROKEN_DOC, BROKEN_STDERR, CLEAN_DOC, INCOMPLETE_DOC,
    INCOMPLETE_STDERR,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};

fn service_for(fake: &FakeCompiler) -> ValidationService<cuescope_core::CueCli> {
    let mut compiler = CompilerConfig::new(fake.program());
    compiler.export_args = fake.export_args();
    compiler.eval_args = fake.eval_args();
    ValidationService::from_config(
        ServiceConfig::new()
            .with_compiler(compiler)
            .with_default_timeout_ms(2_000),
    )
}

#[tokio::test]
async fn clean_document_validates() {
    let fake = FakeCompiler::builder()
        .export(Behavior::json(&clean_value()))
        .build()
        .unwrap();
    let service = service_for(&fake);

    let result = service
        .handle("c1", ValidateRequest::new("req-1", CLEAN_DOC))
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.value, Some(clean_value()));
    let ids: Vec<_> = result.graph.unwrap().into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec!["name", "replicas", "server"]);
    assert_eq!(fake.calls(), vec!["export"]);
}

#[tokio::test]
async fn imports_never_reach_the_compiler() {
    let fake = FakeCompiler::builder().build().unwrap();
    let service = service_for(&fake);

    let result = service
        .handle("c1", ValidateRequest::new("req-2", "import \"list\"\nx: 1"))
        .await
        .unwrap();

    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message(), IMPORTS_NOT_ALLOWED);
    assert!(result.value.is_none() && result.graph.is_none());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn hung_compiler_is_killed_at_deadline() {
    let fake = FakeCompiler::builder().export(Behavior::Hang).build().unwrap();
    let service = service_for(&fake);

    let started = Instant::now();
    let result = service
        .handle("c1", ValidateRequest::new("req-3", CLEAN_DOC).with_timeout_ms(200))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.request_id, "req-3");
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].message().contains("timed out after 200ms"));
    assert!(result.graph.is_none());

    let pid = fake.pid("export").expect("hanging compiler recorded its pid");
    assert!(!FakeCompiler::is_alive(&pid), "compiler {pid} outlived the deadline");
}

#[tokio::test]
async fn permissive_evaluation_recovers_graph() {
    let fake = FakeCompiler::builder()
        .export(Behavior::fail(INCOMPLETE_STDERR))
        .eval(Behavior::json(&json!({"name": "web", "replicas": "int"})))
        .build()
        .unwrap();
    let service = service_for(&fake);

    let result = service
        .handle("c1", ValidateRequest::new("req-4", INCOMPLETE_DOC))
        .await
        .unwrap();

    assert!(result.value.is_none());
    assert_eq!(result.diagnostics.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!((diag.file(), diag.line(), diag.column()), (Some("doc.cue"), Some(2), Some(11)));
    assert_eq!(diag.severity(), Severity::Warning);

    let graph = result.graph.unwrap();
    assert_eq!(graph.len(), 2);
    assert!(graph[1].has_violations());
    assert_eq!(fake.calls(), vec!["export", "eval"]);
}

#[tokio::test]
async fn unparseable_document_falls_back_to_text() {
    let fake = FakeCompiler::builder()
        .export(Behavior::fail(BROKEN_STDERR))
        .eval(Behavior::fail(BROKEN_STDERR))
        .build()
        .unwrap();
    let service = service_for(&fake);

    let result = service
        .handle("c1", ValidateRequest::new("req-5", BROKEN_DOC))
        .await
        .unwrap();

    let graph = result.graph.unwrap();
    let ids: Vec<_> = graph.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["name", "server", "port"]);
    assert_eq!(graph[1].kind, NodeKind::Object);
    assert_eq!(result.diagnostics[0].severity(), Severity::Error);
}

#[tokio::test]
async fn fieldless_document_gets_document_node() {
    let fake = FakeCompiler::builder()
        .export(Behavior::fail("expected operand, found '}'"))
        .eval(Behavior::Hang)
        .build()
        .unwrap();
    let service = service_for(&fake);

    let result = service
        .handle("c1", ValidateRequest::new("req-6", "}}}").with_timeout_ms(300))
        .await
        .unwrap();

    let graph = result.graph.unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(graph[0].id, DOCUMENT_NODE_ID);
}

#[tokio::test]
async fn admission_errors_come_before_the_compiler() {
    let fake = FakeCompiler::builder().build().unwrap();
    let mut compiler = CompilerConfig::new(fake.program());
    compiler.export_args = fake.export_args();
    compiler.eval_args = fake.eval_args();
    let service = ValidationService::from_config(
        ServiceConfig::new()
            .with_compiler(compiler)
            .with_rate_limit(1)
            .with_max_text_bytes(16),
    );

    let err = service
        .handle("c1", ValidateRequest::new("big", "x".repeat(17)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "payload_too_large");

    service
        .handle("c1", ValidateRequest::new("ok", "a: 1"))
        .await
        .unwrap();
    let err = service
        .handle("c1", ValidateRequest::new("limited", "a: 1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "rate_limited");

    assert_eq!(fake.calls(), vec!["export"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_all_complete() {
    let fake = FakeCompiler::builder()
        .export(Behavior::json(&clean_value()))
        .build()
        .unwrap();
    let service = std::sync::Arc::new(service_for(&fake));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = std::sync::Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .handle(&format!("client-{i}"), ValidateRequest::new(format!("r{i}"), CLEAN_DOC))
                    .await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.request_id, format!("r{i}"));
        assert!(result.is_success());
    }
    let stats = service.stats();
    assert_eq!((stats.running, stats.pending, stats.completed), (0, 0, 8));
}
