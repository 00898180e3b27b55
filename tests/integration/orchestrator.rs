//! Integration tests for the Generation Orchestrator
//!
//! Tests cover:
//! - Session cache hits
//! - Coalescing concurrent identical requests
//! - Edits bypassing cache and coalescing
//! - Failures leaving no cache, history or in-flight state
//! - Superseded guarded requests

use super::test_utils::{orchestrator_with, settle, wait_until, FakeService};
use atelier::cache::request_key;
use atelier::error::GenerationError;
use atelier::style::REFERENCE_PLACEHOLDER_SUBJECT;
use atelier::types::{ArtStyle, AspectRatio, GenerationRequest, ImagePayload};

fn sailor() -> GenerationRequest {
    GenerationRequest::new("An old sailor", ArtStyle::Oil, AspectRatio::Square)
}

#[tokio::test]
async fn test_second_identical_request_is_a_cache_hit() {
    let service = FakeService::new();
    let (orchestrator, _) = orchestrator_with(service.clone());

    let first = orchestrator.generate(sailor()).await.unwrap();
    assert!(!first.cache_hit);

    // Whitespace and case differences hit the same entry
    let again = GenerationRequest::new("  an OLD sailor ", ArtStyle::Oil, AspectRatio::Square);
    let second = orchestrator.generate(again).await.unwrap();
    assert!(second.cache_hit);
    assert_eq!(first.result, second.result);

    assert_eq!(service.image_calls(), 1);
    assert_eq!(service.commentary_calls(), 1);
    assert_eq!(orchestrator.history().len(), 1);
}

#[tokio::test]
async fn test_different_style_is_a_different_request() {
    let service = FakeService::new();
    let (orchestrator, _) = orchestrator_with(service.clone());

    orchestrator.generate(sailor()).await.unwrap();
    let other = GenerationRequest::new("An old sailor", ArtStyle::Charcoal, AspectRatio::Square);
    let generated = orchestrator.generate(other).await.unwrap();

    assert!(!generated.cache_hit);
    assert_eq!(service.image_calls(), 2);
    assert_eq!(orchestrator.history().len(), 2);
}

#[tokio::test]
async fn test_concurrent_identical_requests_share_one_pipeline() {
    let service = FakeService::new();
    service.hold_images();
    let (orchestrator, _) = orchestrator_with(service.clone());

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.generate(sailor()).await })
    };
    wait_until(|| service.image_calls() == 1).await;

    let key = request_key(&sailor()).unwrap();
    assert!(orchestrator.inflight().contains(&key));

    let second = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.generate(sailor()).await })
    };
    settle().await;

    service.release_images(1);
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first.result, second.result);
    assert!(!second.cache_hit);
    assert_eq!(service.image_calls(), 1);
    assert_eq!(service.commentary_calls(), 1);
    assert!(orchestrator.inflight().is_empty());
    assert_eq!(orchestrator.history().len(), 1);
}

#[tokio::test]
async fn test_edits_are_never_cached_or_coalesced() {
    let service = FakeService::new();
    let (orchestrator, _) = orchestrator_with(service.clone());
    let reference = ImagePayload::new(vec![7, 7, 7], "image/png");
    let edit = GenerationRequest::new("", ArtStyle::Pencil, AspectRatio::Portrait)
        .with_reference(reference);

    let (a, b) = tokio::join!(
        orchestrator.generate(edit.clone()),
        orchestrator.generate(edit.clone())
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(service.edit_calls(), 2);
    assert_eq!(service.image_calls(), 0);
    assert!(!a.cache_hit && !b.cache_hit);
    assert!(orchestrator.cache().is_empty());
    assert_eq!(a.result.subject, REFERENCE_PLACEHOLDER_SUBJECT);
    assert_eq!(a.result.artifact.mime_type, "image/jpeg");

    // Same artifact identity, so the gallery keeps one entry
    assert_eq!(orchestrator.history().len(), 1);
    assert!(orchestrator.history().get(0).unwrap().had_reference);
}

#[tokio::test]
async fn test_permanent_failure_leaves_no_state() {
    let service = FakeService::new();
    service.fail_images([GenerationError::ClientError {
        status: 400,
        message: "bad prompt".to_string(),
    }]);
    let (orchestrator, backend) = orchestrator_with(service.clone());

    let err = orchestrator.generate(sailor()).await.unwrap_err();
    assert!(matches!(err, GenerationError::ClientError { status: 400, .. }));
    assert_eq!(service.image_calls(), 1);
    assert_eq!(service.commentary_calls(), 0);
    assert!(orchestrator.cache().is_empty());
    assert!(orchestrator.history().is_empty());
    assert!(orchestrator.inflight().is_empty());
    assert_eq!(backend.save_count(), 0);

    // The next attempt starts fresh and succeeds
    let generated = orchestrator.generate(sailor()).await.unwrap();
    assert!(!generated.cache_hit);
    assert_eq!(service.image_calls(), 2);
    assert_eq!(orchestrator.history().len(), 1);
}

#[tokio::test]
async fn test_commentary_failure_discards_the_image() {
    let service = FakeService::new();
    service.fail_commentary([GenerationError::ModeratedContent("SAFETY".to_string())]);
    let (orchestrator, _) = orchestrator_with(service.clone());

    let err = orchestrator.generate(sailor()).await.unwrap_err();
    assert!(matches!(err, GenerationError::ModeratedContent(_)));
    assert_eq!(service.image_calls(), 1);
    assert_eq!(service.commentary_calls(), 1);
    assert!(orchestrator.cache().is_empty());
    assert!(orchestrator.history().is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let service = FakeService::new();
    service.fail_images([
        GenerationError::Remote("503 unavailable".to_string()),
        GenerationError::Remote("503 unavailable".to_string()),
    ]);
    let (orchestrator, _) = orchestrator_with(service.clone());

    let generated = orchestrator.generate(sailor()).await.unwrap();
    assert_eq!(service.image_calls(), 3);
    assert_eq!(generated.result.inspiration.palette.len(), 3);
}

#[tokio::test]
async fn test_malformed_commentary_exhausts_as_malformed() {
    let service = FakeService::new();
    service.return_malformed_commentary();
    let (orchestrator, _) = orchestrator_with(service.clone());

    let err = orchestrator.generate(sailor()).await.unwrap_err();
    assert!(matches!(err, GenerationError::MalformedResult(_)));
    assert_eq!(service.commentary_calls(), 4);
    assert!(orchestrator.history().is_empty());
}

#[tokio::test]
async fn test_superseded_request_is_dropped() {
    let service = FakeService::new();
    service.hold_images();
    let (orchestrator, _) = orchestrator_with(service.clone());

    let token_a = orchestrator.guard().begin_request();
    let a = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.generate_guarded(sailor(), token_a, None).await })
    };
    wait_until(|| service.image_calls() == 1).await;

    let lighthouse = GenerationRequest::new("A lighthouse", ArtStyle::Oil, AspectRatio::Square);
    let token_b = orchestrator.guard().begin_request();
    let b = {
        let orchestrator = orchestrator.clone();
        let lighthouse = lighthouse.clone();
        tokio::spawn(async move { orchestrator.generate_guarded(lighthouse, token_b, None).await })
    };
    wait_until(|| service.image_calls() == 2).await;

    service.release_images(2);
    assert_eq!(a.await.unwrap(), Err(GenerationError::Superseded));
    let b = b.await.unwrap().unwrap();

    assert_eq!(b.result.subject, "A lighthouse");
    // A never reached its second stage and left nothing behind
    assert_eq!(service.commentary_calls(), 1);
    assert!(!orchestrator.cache().contains(&request_key(&sailor()).unwrap()));
    assert!(orchestrator.cache().contains(&request_key(&lighthouse).unwrap()));
    let history = orchestrator.history().entries();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result.subject, "A lighthouse");
}

#[tokio::test]
async fn test_newer_request_joining_a_flight_keeps_it_alive() {
    let service = FakeService::new();
    service.hold_images();
    let (orchestrator, _) = orchestrator_with(service.clone());

    let token_a = orchestrator.guard().begin_request();
    let a = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.generate_guarded(sailor(), token_a, None).await })
    };
    wait_until(|| service.image_calls() == 1).await;

    let token_b = orchestrator.guard().begin_request();
    let b = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.generate_guarded(sailor(), token_b, None).await })
    };
    settle().await;

    service.release_images(1);
    assert_eq!(a.await.unwrap(), Err(GenerationError::Superseded));
    let b = b.await.unwrap().unwrap();

    assert!(!b.cache_hit);
    assert_eq!(service.image_calls(), 1);
    assert_eq!(service.commentary_calls(), 1);
    assert_eq!(orchestrator.history().len(), 1);
}

#[tokio::test]
async fn test_unguarded_generate_ignores_newer_tokens() {
    let service = FakeService::new();
    let (orchestrator, _) = orchestrator_with(service.clone());

    orchestrator.guard().begin_request();
    let generated = orchestrator.generate(sailor()).await.unwrap();
    orchestrator.guard().begin_request();

    assert_eq!(orchestrator.history().len(), 1);
    assert_eq!(
        orchestrator.cache().get(&request_key(&sailor()).unwrap()),
        Some(generated.result)
    );
}

#[tokio::test]
async fn test_superseded_during_commentary_is_dropped() {
    let service = FakeService::new();
    service.hold_commentary();
    let (orchestrator, _) = orchestrator_with(service.clone());

    let token_a = orchestrator.guard().begin_request();
    let a = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.generate_guarded(sailor(), token_a, None).await })
    };
    // A finished its image and is waiting on its notes
    wait_until(|| service.commentary_calls() == 1).await;
    assert_eq!(service.image_calls(), 1);

    let lighthouse = GenerationRequest::new("A lighthouse", ArtStyle::Oil, AspectRatio::Square);
    let token_b = orchestrator.guard().begin_request();
    let b = {
        let orchestrator = orchestrator.clone();
        let lighthouse = lighthouse.clone();
        tokio::spawn(async move { orchestrator.generate_guarded(lighthouse, token_b, None).await })
    };
    wait_until(|| service.commentary_calls() == 2).await;

    service.release_commentary(2);
    assert_eq!(a.await.unwrap(), Err(GenerationError::Superseded));
    let b = b.await.unwrap().unwrap();
    assert_eq!(b.result.subject, "A lighthouse");

    assert!(!orchestrator.cache().contains(&request_key(&sailor()).unwrap()));
    assert!(orchestrator.cache().contains(&request_key(&lighthouse).unwrap()));
    let history = orchestrator.history().entries();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result.subject, "A lighthouse");
    assert!(orchestrator.inflight().is_empty());
}

#[tokio::test]
async fn test_current_caller_restarts_abandoned_flight() {
    let service = FakeService::new();
    let (orchestrator, _) = orchestrator_with(service.clone());
    let key = request_key(&sailor()).unwrap();

    // A flight that already gave up on its superseded caller but has not yet
    // left the registry
    let stale = orchestrator.guard().begin_request();
    let _abandoned = orchestrator
        .inflight()
        .get_or_create(&key, Some(stale), |_| async { Err(GenerationError::Superseded) });
    assert!(orchestrator.inflight().contains(&key));

    let token = orchestrator.guard().begin_request();
    let generated = orchestrator
        .generate_guarded(sailor(), token, None)
        .await
        .unwrap();

    assert!(!generated.cache_hit);
    assert_eq!(generated.result.subject, "An old sailor");
    assert_eq!(service.image_calls(), 1);
    assert_eq!(service.commentary_calls(), 1);
    assert_eq!(orchestrator.history().len(), 1);
    assert!(orchestrator.cache().contains(&key));
    assert!(orchestrator.inflight().is_empty());
}
