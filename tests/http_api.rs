mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::*;
use veracity::http::router;
use veracity::models::EvidenceItem;
use veracity::{Config, StageOrchestrator};

fn app(results: Vec<EvidenceItem>) -> axum::Router {
    let orchestrator =
        StageOrchestrator::new(Arc::new(Config::default()), collaborators(FakeCollector::with_results(results)));
    router(Arc::new(orchestrator))
}

async fn post_json(app: axum::Router, body: Body) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/fact-check")
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_healthy() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app(Vec::new()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn missing_or_blank_claim_is_a_bad_request() {
    for body in [
        json!({}),
        json!({ "claim": "" }),
        json!({ "claim": "   " }),
        json!({ "claim": 42 }),
        json!({ "source": "https://a.org" }),
    ] {
        let (status, v) = post_json(app(Vec::new()), Body::from(body.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(v, json!({ "error": "Claim is required" }));
    }
}

#[tokio::test]
async fn unparseable_body_is_a_bad_request() {
    let (status, v) = post_json(app(Vec::new()), Body::from("claim=the earth is flat")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Claim is required");
}

#[tokio::test]
async fn fact_check_returns_verdict_and_rated_sources() {
    let mut results = confirmed_by("reuters.com", 3);
    results.push(EvidenceItem::new(
        "https://blog.example.net/post",
        "Blog",
        "Some say it is true.",
    ));
    let body = json!({ "claim": "The bridge reopened in May" }).to_string();
    let (status, v) = post_json(app(results), Body::from(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["verdict"], "True");
    assert!(v["confidence"].as_f64().unwrap() >= 0.7);
    assert!(
        v["summary"]
            .as_str()
            .unwrap()
            .contains("the claim 'The bridge reopened in May'")
    );
    assert_eq!(v["key_findings"].as_array().unwrap().len(), 4);

    let sources = v["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 4);
    assert_eq!(sources[0]["trust_score"], 0.9);
    assert_eq!(sources[0]["reliability"], "High");
    let blog = sources
        .iter()
        .find(|s| s["url"] == "https://blog.example.net/post")
        .unwrap();
    assert_eq!(blog["trust_score"], 0.5);
    assert_eq!(blog["reliability"], "Medium");
}

#[tokio::test]
async fn no_evidence_is_still_a_successful_response() {
    let body = json!({ "claim": "The earth is flat", "source": null }).to_string();
    let (status, v) = post_json(app(Vec::new()), Body::from(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["verdict"], "Insufficient Evidence");
    assert_eq!(v["confidence"], 0.3);
    assert_eq!(v["sources"], json!([]));
}
