use super::{Fixture, COOKING, DIMENSIONS, PHOTOSYNTHESIS};
use crate::embeddings::providers::MockProvider;
use crate::{IndexManifest, Retriever};
use flashcards_core::AppError;
use std::fs;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread")]
async fn test_indexed_text_is_its_own_top_result() {
    let fixture = Fixture::new(&[("biologi.txt", PHOTOSYNTHESIS), ("masak.txt", COOKING)]);
    fixture.build().await.unwrap();

    let retriever = Retriever::open(fixture.embedder.clone(), fixture.retrieval_options(0.7))
        .await
        .unwrap();
    let result = retriever.retrieve(COOKING).await.unwrap();

    assert!(!result.is_empty());
    assert_eq!(result.chunks[0].chunk.text, COOKING);
    assert!((result.chunks[0].score - 1.0).abs() < 1e-4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scores_respect_threshold_and_order() {
    let fixture = Fixture::new(&[("biologi.txt", PHOTOSYNTHESIS), ("masak.txt", COOKING)]);
    fixture.build().await.unwrap();

    let retriever = Retriever::open(fixture.embedder.clone(), fixture.retrieval_options(-1.0))
        .await
        .unwrap();
    let result = retriever.retrieve("kloroplas klorofil").await.unwrap();

    assert_eq!(result.len(), 2);
    assert!(result.chunks.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(result.chunks[0].chunk.source_name(), "biologi.txt");
    assert_eq!(result.chunks[0].chunk.display_page(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_index_is_index_not_found() {
    let fixture = Fixture::new(&[]);

    let result = Retriever::open(fixture.embedder.clone(), fixture.retrieval_options(0.7)).await;
    assert!(matches!(result, Err(AppError::IndexNotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_different_embedder_is_index_mismatch() {
    let fixture = Fixture::new(&[("biologi.txt", PHOTOSYNTHESIS)]);
    fixture.build().await.unwrap();

    let other = Arc::new(MockProvider::new(DIMENSIONS / 2));
    let result = Retriever::open(other, fixture.retrieval_options(0.7)).await;
    assert!(matches!(result, Err(AppError::IndexMismatch(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_rebuild_keeps_previous_index() {
    let fixture = Fixture::new(&[("biologi.txt", PHOTOSYNTHESIS)]);
    let first = fixture.build().await.unwrap();
    let before = IndexManifest::load(&fixture.index_dir()).unwrap();

    fs::remove_file(fixture.documents_dir().join("biologi.txt")).unwrap();
    let result = fixture.build().await;
    assert!(matches!(result, Err(AppError::NoDocumentsFound(_))));

    let after = IndexManifest::load(&fixture.index_dir()).unwrap();
    assert_eq!(before, after);

    let retriever = Retriever::open(fixture.embedder.clone(), fixture.retrieval_options(0.7))
        .await
        .unwrap();
    assert_eq!(retriever.manifest().map(|m| m.chunks), Some(first.chunks));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rebuild_is_deterministic() {
    let fixture = Fixture::new(&[("biologi.txt", PHOTOSYNTHESIS), ("masak.txt", COOKING)]);
    let first = fixture.build().await.unwrap();
    let second = fixture.build().await.unwrap();

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first.pages, 2);
}
