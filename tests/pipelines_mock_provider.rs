//! End-to-end pipeline tests against the in-memory store with a mock
//! embedding provider, suitable for CI and deterministic runs.

use std::sync::Arc;

use docvault::{
    DocumentSegmenter, EmbeddingProvider, IngestionPipeline, MockEmbeddingProvider,
    PlainTextSegmenter, QueryPipeline, Segment, VaultError, VectorStore,
};
use docvault::stores::MemoryVectorStore;

fn pipelines() -> (
    Arc<MockEmbeddingProvider>,
    Arc<MemoryVectorStore>,
    IngestionPipeline,
    QueryPipeline,
) {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new());
    let ingestion = IngestionPipeline::new(provider.clone(), store.clone());
    let query = QueryPipeline::new(provider.clone(), store.clone());
    (provider, store, ingestion, query)
}

fn sample_segments() -> Vec<Segment> {
    vec![
        Segment::new("The mitochondria is the powerhouse of the cell.", "bio.pdf", 1, 3),
        Segment::new("Photosynthesis converts light into chemical energy.", "bio.pdf", 2, 3),
        Segment::new("Osmosis moves water across membranes.", "bio.pdf", 3, 3),
    ]
}

#[tokio::test]
async fn ingest_then_query_round_trips_exact_content() {
    let (_, _, ingestion, query) = pipelines();

    ingestion
        .ingest(sample_segments(), "tenant-a", "docs")
        .await
        .unwrap();

    // The mock provider is deterministic, so querying with a stored
    // segment's exact text embeds to the identical vector: cosine 1.0.
    let matches = query
        .query(
            "Photosynthesis converts light into chemical energy.",
            "tenant-a",
            Some(1),
            "docs",
        )
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(
        matches[0].content,
        "Photosynthesis converts light into chemical energy."
    );
    assert!((matches[0].score - 1.0).abs() < 1e-5);
    assert_eq!(matches[0].metadata.page, 2);
}

#[tokio::test]
async fn ingestion_injects_tenant_and_doc_metadata() {
    let (_, store, ingestion, _) = pipelines();

    let ids = ingestion
        .ingest(sample_segments(), "tenant-a", "docs")
        .await
        .unwrap();
    assert_eq!(ids.len(), 3);

    let probe = MockEmbeddingProvider::new();
    let vector = probe
        .embed("The mitochondria is the powerhouse of the cell.")
        .await
        .unwrap();
    let hits = store.search("docs", &vector, "tenant-a", 1).await.unwrap();

    let metadata = &hits[0].record.metadata;
    assert_eq!(metadata.tenant_id, "tenant-a");
    assert_eq!(metadata.doc_id, hits[0].record.id);
    assert_eq!(metadata.doc_id, ids[0], "ids returned in segment order");
    assert_eq!(metadata.source, "bio.pdf");
    assert_eq!(metadata.total_pages, 3);
}

#[tokio::test]
async fn segment_supplied_doc_id_is_preserved() {
    let (_, _, ingestion, _) = pipelines();
    let mut segment = Segment::new("text", "a.pdf", 1, 1);
    segment.doc_id = Some("caller-chosen".to_string());

    let ids = ingestion
        .ingest(vec![segment], "tenant-a", "docs")
        .await
        .unwrap();
    assert_eq!(ids, vec!["caller-chosen".to_string()]);
}

#[tokio::test]
async fn empty_segment_list_is_rejected_without_embedding() {
    let (provider, store, ingestion, _) = pipelines();

    let err = ingestion.ingest(vec![], "tenant-a", "docs").await.unwrap_err();
    assert!(matches!(err, VaultError::EmptyInput));
    assert_eq!(provider.texts_embedded(), 0);
    assert_eq!(store.count("docs").await.unwrap(), 0);
}

#[tokio::test]
async fn provider_failure_mid_document_inserts_nothing() {
    let provider = Arc::new(MockEmbeddingProvider::new().failing_after(2));
    let store = Arc::new(MemoryVectorStore::new());
    let ingestion = IngestionPipeline::new(provider.clone(), store.clone());

    let err = ingestion
        .ingest(sample_segments(), "tenant-a", "docs")
        .await
        .unwrap_err();
    match err {
        VaultError::Embedding(embed) => assert!(embed.is_retryable()),
        other => panic!("expected embedding error, got {other:?}"),
    }
    assert_eq!(store.count("docs").await.unwrap(), 0, "atomic: zero records");
}

#[tokio::test]
async fn model_dimension_change_surfaces_as_dimension_mismatch() {
    let store = Arc::new(MemoryVectorStore::new());

    let old_model = Arc::new(MockEmbeddingProvider::with_dimensions(16));
    IngestionPipeline::new(old_model, store.clone())
        .ingest(sample_segments(), "tenant-a", "docs")
        .await
        .unwrap();

    // Reconfigured provider with a different output width: a configuration
    // fault that must propagate verbatim, not be swallowed.
    let new_model = Arc::new(MockEmbeddingProvider::with_dimensions(32));
    let err = IngestionPipeline::new(new_model.clone(), store.clone())
        .ingest(vec![Segment::new("more", "b.pdf", 1, 1)], "tenant-a", "docs")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::DimensionMismatch { .. }));

    let query = QueryPipeline::new(new_model, store);
    let err = query.query("anything", "tenant-a", None, "docs").await.unwrap_err();
    assert!(matches!(err, VaultError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn queries_are_isolated_per_tenant_end_to_end() {
    let (_, _, ingestion, query) = pipelines();

    ingestion
        .ingest(
            vec![Segment::new("tenant a secret report", "a.pdf", 1, 1)],
            "tenant-a",
            "docs",
        )
        .await
        .unwrap();
    ingestion
        .ingest(
            vec![Segment::new("tenant a secret report", "b.pdf", 1, 1)],
            "tenant-b",
            "docs",
        )
        .await
        .unwrap();

    // Identical content, so vectors are identical; only the tenant filter
    // separates them.
    let matches = query
        .query("tenant a secret report", "tenant-a", Some(10), "docs")
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].metadata.source, "a.pdf");

    let matches = query
        .query("tenant a secret report", "tenant-c", Some(10), "docs")
        .await
        .unwrap();
    assert!(matches.is_empty(), "unknown tenant sees nothing");
}

#[tokio::test]
async fn segmenter_feeds_pipeline_with_page_numbers() {
    let (_, _, ingestion, query) = pipelines();

    let raw = "introduction text\u{0c}methods text\u{0c}conclusion text";
    let segments = PlainTextSegmenter::new()
        .segment(raw.as_bytes(), "paper.txt")
        .unwrap();
    ingestion.ingest(segments, "tenant-a", "docs").await.unwrap();

    let matches = query
        .query("methods text", "tenant-a", Some(1), "docs")
        .await
        .unwrap();
    assert_eq!(matches[0].metadata.page, 2);
    assert_eq!(matches[0].metadata.source, "paper.txt");
}

#[tokio::test]
async fn concurrent_ingest_and_search_see_whole_batches_only() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new());
    let ingestion = Arc::new(IngestionPipeline::new(provider.clone(), store.clone()));

    let batch: Vec<Segment> = (0u32..20)
        .map(|i| Segment::new(format!("segment number {i}"), "big.pdf", i + 1, 20))
        .collect();

    let writer = {
        let ingestion = ingestion.clone();
        tokio::spawn(async move { ingestion.ingest(batch, "tenant-a", "docs").await })
    };

    let probe = provider.embed("segment number 0").await.unwrap();
    // Concurrent searches must observe either the empty pre-state or the
    // complete 20-record post-state, never a partial batch.
    for _ in 0..50 {
        let hits = store.search("docs", &probe, "tenant-a", 50).await.unwrap();
        assert!(
            hits.is_empty() || hits.len() == 20,
            "observed partial batch of {} records",
            hits.len()
        );
        tokio::task::yield_now().await;
    }

    writer.await.unwrap().unwrap();
    let hits = store.search("docs", &probe, "tenant-a", 50).await.unwrap();
    assert_eq!(hits.len(), 20);
}
