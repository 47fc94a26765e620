//! Index manager transitions observed through the service.

use super::support::*;
use crate::cache::IndexPhase;
use crate::chunker::Chunker;
use crate::embeddings::providers::mock::MockProvider;
use crate::embeddings::EmbeddingProvider;
use crate::service::OperationResponse;
use crate::types::Document;
use crate::vector_index::VectorIndex;
use ragent_core::ErrorKind;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_self_retrieval_with_exact_embeddings() {
    let document = Document::text(
        "notes.txt",
        "Rust guarantees memory safety without a garbage collector. \
         Ownership rules are checked at compile time. \
         Borrowing lets code use a value without taking ownership of it. \
         Lifetimes describe how long references stay valid.",
    );
    let chunks = Chunker::new(60, 10).unwrap().split(&document);
    assert!(chunks.len() > 2);

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let embedder = ExactMatchEmbedder::new(&texts);
    let all: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    let embeddings = embedder.embed_batch(&all).await.unwrap();
    let index = VectorIndex::build(embedder.model_name(), chunks.clone(), embeddings).unwrap();

    for chunk in &chunks {
        let query = embedder.embed(&chunk.text).await.unwrap();
        let top = index.search(&query, 1).unwrap();
        assert_eq!(top[0].0.id, chunk.id);
    }
}

#[tokio::test]
async fn test_queued_mutations_both_take_effect() {
    let temp = TempDir::new().unwrap();
    write_document(&temp, "sky.txt", "The sky is blue.");

    let embedder = Arc::new(ScriptedEmbedder::new("slow").with_delay(Duration::from_millis(100)));
    let service = service_with(test_config(temp.path()), embedder.clone(), Arc::new(EchoClient));
    service.initialize().await.unwrap();

    let (first, second) = tokio::join!(
        service.add_document("Mercury is the closest planet to the sun.", Some("mercury")),
        service.add_document("Neptune is the farthest planet from the sun.", Some("neptune")),
    );
    assert!(first.is_success());
    assert!(second.is_success());

    let index = service.manager().snapshot().unwrap();
    let documents: Vec<&str> = index
        .entries()
        .iter()
        .map(|e| e.chunk.document.as_str())
        .collect();
    assert_eq!(documents, vec!["mercury.txt", "neptune.txt", "sky.txt"]);
    // Initial build plus one rebuild per mutation
    assert_eq!(embedder.batches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_build_is_reported_and_retried() {
    let temp = TempDir::new().unwrap();
    write_document(&temp, "sky.txt", "The sky is blue.");

    let embedder = ScriptedEmbedder::new("flaky").failing(1);
    let service = service_with(test_config(temp.path()), Arc::new(embedder), Arc::new(EchoClient));

    let err = service.initialize().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert_eq!(service.manager().phase(), IndexPhase::Failed);
    assert!(!service.manager().index_file().exists());

    let status = service.status().await;
    assert_eq!(status.phase, IndexPhase::Failed);
    assert_eq!(status.failure.unwrap().kind, ErrorKind::ProviderUnavailable);

    let response = service.submit_query("What color is the sky?").await;
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["kind"], "pipeline_not_ready");

    service.initialize().await.unwrap();
    assert_eq!(service.manager().phase(), IndexPhase::Ready);
    assert!(service.manager().failure().is_none());
}

#[tokio::test]
async fn test_incompatible_model_triggers_rebuild() {
    let temp = TempDir::new().unwrap();
    write_document(&temp, "sky.txt", "The sky is blue.");

    // Both names sanitize to the same index directory
    let first = service_with(
        test_config(temp.path()),
        Arc::new(ScriptedEmbedder::new("embed:v1")),
        Arc::new(EchoClient),
    );
    first.initialize().await.unwrap();

    let second_embedder = Arc::new(ScriptedEmbedder::new("embed_v1"));
    let second = service_with(
        test_config(temp.path()),
        second_embedder.clone(),
        Arc::new(EchoClient),
    );
    assert_eq!(first.manager().index_file(), second.manager().index_file());

    second.initialize().await.unwrap();
    assert_eq!(second.manager().snapshot().unwrap().model(), "embed_v1");
    assert_eq!(second_embedder.batches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dimension_change_triggers_rebuild() {
    let temp = TempDir::new().unwrap();
    write_document(&temp, "sky.txt", "The sky is blue.");

    let wide = service_with(
        test_config(temp.path()),
        Arc::new(MockProvider::new(64)),
        Arc::new(EchoClient),
    );
    wide.initialize().await.unwrap();
    assert_eq!(wide.manager().snapshot().unwrap().metadata().dimensions, 64);

    // Same model identity, different vector length
    let narrow = service_with(
        test_config(temp.path()),
        Arc::new(MockProvider::new(32)),
        Arc::new(EchoClient),
    );
    assert_eq!(wide.manager().index_file(), narrow.manager().index_file());

    narrow.initialize().await.unwrap();
    assert_eq!(narrow.manager().snapshot().unwrap().metadata().dimensions, 32);
    assert!(narrow.submit_query("What color is the sky?").await.is_answer());
}

#[tokio::test]
async fn test_compatible_index_is_loaded_without_embedding() {
    let temp = TempDir::new().unwrap();
    write_document(&temp, "sky.txt", "The sky is blue.");

    let builder = service_with(
        test_config(temp.path()),
        Arc::new(ScriptedEmbedder::new("stable")),
        Arc::new(EchoClient),
    );
    builder.initialize().await.unwrap();

    let embedder = Arc::new(ScriptedEmbedder::new("stable"));
    let service = service_with(test_config(temp.path()), embedder.clone(), Arc::new(EchoClient));
    service.initialize().await.unwrap();

    assert_eq!(embedder.batches.load(Ordering::SeqCst), 0);
    assert_eq!(service.status().await.chunk_count, Some(1));
}

#[tokio::test]
async fn test_rebuild_index_picks_up_new_files() {
    let temp = TempDir::new().unwrap();
    write_document(&temp, "sky.txt", "The sky is blue.");

    let service = mock_service(&temp, Arc::new(EchoClient));
    service.initialize().await.unwrap();
    write_document(&temp, "grass.md", "# Grass\n\nGrass is green.");

    let status = service.status().await;
    assert_eq!(status.stale, Some(true));
    assert_eq!(status.document_count, Some(1));

    let response = service.rebuild_index().await;
    assert!(response.is_success());

    let status = service.status().await;
    assert_eq!(status.stale, Some(false));
    assert_eq!(status.document_count, Some(2));
}

#[tokio::test]
async fn test_add_document_rejects_unsafe_names() {
    let temp = TempDir::new().unwrap();
    let service = mock_service(&temp, Arc::new(EchoClient));
    service.initialize().await.unwrap();

    for name in ["../outside.txt", "nested/inner.txt", ".hidden"] {
        let response = service.add_document("content", Some(name)).await;
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "invalid_request", "name {:?}", name);
    }
    assert!(!temp.path().join("outside.txt").exists());
    assert_eq!(service.manager().phase(), IndexPhase::Ready);
}

#[tokio::test]
async fn test_add_document_with_default_name() {
    let temp = TempDir::new().unwrap();
    let service = mock_service(&temp, Arc::new(EchoClient));

    let response = service.add_document("Unnamed facts.", None).await;
    assert!(response.is_success());

    let documents = service.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert!(documents[0].name.starts_with("document_"));
    assert!(documents[0].name.ends_with(".txt"));
}

#[tokio::test]
async fn test_back_to_back_unnamed_adds_keep_both_documents() {
    let temp = TempDir::new().unwrap();
    let service = mock_service(&temp, Arc::new(EchoClient));

    let first = service.add_document("Alpha facts: the moon is rock.", None).await;
    let second = service.add_document("Beta facts: the sun is gas.", None).await;
    assert!(first.is_success());
    assert!(second.is_success());

    let documents = service.list_documents().await.unwrap();
    let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(documents.len(), 2);
    assert!(contents.contains(&"Alpha facts: the moon is rock."));
    assert!(contents.contains(&"Beta facts: the sun is gas."));

    let index = service.manager().snapshot().unwrap();
    assert_eq!(index.metadata().document_count, 2);
}

#[tokio::test]
async fn test_add_document_rejects_existing_name() {
    let temp = TempDir::new().unwrap();
    let service = mock_service(&temp, Arc::new(EchoClient));

    assert!(service.add_document("Original.", Some("notes")).await.is_success());

    match service.add_document("Replacement.", Some("notes")).await {
        OperationResponse::Failure(error) => assert_eq!(error.kind, ErrorKind::InvalidRequest),
        other => panic!("expected failure, got {:?}", other),
    }

    let documents = service.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].content, "Original.");
}

#[tokio::test]
async fn test_sample_document_seeded_when_enabled() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.seed_sample_document = true;

    let service = service_with(
        config,
        Arc::new(MockProvider::new(64)),
        Arc::new(EchoClient),
    );
    service.initialize().await.unwrap();

    let documents = service.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].name, crate::documents::SAMPLE_DOCUMENT_NAME);
    assert!(service.status().await.chunk_count.unwrap() > 1);
}
