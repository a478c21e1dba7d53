use std::collections::HashSet;
use std::sync::Arc;

use catalog_store::{Bm25Params, LexicalRetriever, RetrievalError, Retriever, TextTokenizer};
use product_model::{serialize_fields, CatalogDocument};

fn product(row: usize, name: &str, id: &str, description: &str) -> CatalogDocument {
    let content = serialize_fields([("name", name), ("price", "1000"), ("id", id), ("description", description)]);
    CatalogDocument::with_source(row, content, "products.csv")
}

fn catalog() -> Arc<[CatalogDocument]> {
    vec![
        product(0, "ワイヤレスイヤホン X1", "1", "高音質 ワイヤレス イヤホン 長時間 再生"),
        product(1, "LED デスクライト", "2", "机 の ライト 調光"),
        product(2, "卓上 加湿器", "3", "USB 充電 加湿器 静音"),
        product(3, "モバイル バッテリー", "4", "USB 充電 大容量"),
    ]
    .into()
}

fn retriever(top_k: usize) -> LexicalRetriever {
    LexicalRetriever::new(catalog(), Arc::new(TextTokenizer::regex_only()), top_k, Bm25Params::default())
        .expect("catalog is not empty")
}

fn rows(hits: &[catalog_store::SearchHit]) -> Vec<usize> {
    hits.iter().map(|h| h.document.row).collect()
}

#[test]
fn matching_document_ranks_first() {
    let hits = retriever(3).retrieve("加湿器").expect("retrieve");
    assert_eq!(rows(&hits), vec![2, 0, 1]);
    assert!(hits[0].score > 0.0);
    assert_eq!(hits[1].score, 0.0);
}

#[test]
fn scores_accumulate_over_query_terms() {
    let r = retriever(5);
    let scores = r.scores("机 調光");
    assert!(scores[1] > 0.0);
    assert!(scores[1] > r.scores("机")[1]);
    assert_eq!(scores[0], 0.0);
}

#[test]
fn result_length_is_bounded_by_k_and_catalog() {
    assert_eq!(retriever(2).retrieve("充電").expect("retrieve").len(), 2);
    assert_eq!(retriever(10).retrieve("充電").expect("retrieve").len(), 4);
}

#[test]
fn results_contain_no_duplicates() {
    let hits = retriever(4).retrieve("USB 充電 加湿器").expect("retrieve");
    let unique: HashSet<usize> = rows(&hits).into_iter().collect();
    assert_eq!(unique.len(), hits.len());
}

#[test]
fn unmatched_query_returns_catalog_order() {
    let hits = retriever(3).retrieve("").expect("retrieve");
    assert_eq!(rows(&hits), vec![0, 1, 2]);
    assert!(hits.iter().all(|h| h.score == 0.0));
}

#[test]
fn equal_scores_keep_catalog_order() {
    let docs: Arc<[CatalogDocument]> = vec![
        product(0, "モバイル バッテリー", "1", "大容量"),
        product(1, "卓上 加湿器", "2", "静音"),
        product(2, "LED デスクライト", "3", "調光"),
        product(3, "卓上 加湿器", "2", "静音"),
        product(4, "ワイヤレスイヤホン", "5", "高音質"),
    ]
    .into();
    let r = LexicalRetriever::new(docs, Arc::new(TextTokenizer::regex_only()), 2, Bm25Params::default()).expect("build");
    let hits = r.retrieve("加湿器").expect("retrieve");
    assert_eq!(rows(&hits), vec![1, 3]);
    assert_eq!(hits[0].score, hits[1].score);
}

#[test]
fn empty_catalog_is_rejected() {
    let empty: Arc<[CatalogDocument]> = Vec::new().into();
    let err = LexicalRetriever::new(empty, Arc::new(TextTokenizer::regex_only()), 5, Bm25Params::default())
        .err()
        .expect("empty catalog must fail");
    assert!(matches!(err, RetrievalError::EmptyCatalog));
}

#[test]
fn common_terms_never_score_negative() {
    // "name" appears in every document
    let scores = retriever(4).scores("name");
    assert!(scores.iter().all(|s| *s > 0.0), "{scores:?}");
}

#[test]
fn matches_outrank_non_matches_when_mean_idf_is_negative() {
    // header key in every row plus a query term in two of three rows
    let docs: Arc<[CatalogDocument]> = vec![
        CatalogDocument::new(0, "name: ライト"),
        CatalogDocument::new(1, "name: 加湿器 白"),
        CatalogDocument::new(2, "name: 加湿器 黒"),
    ]
    .into();
    let r = LexicalRetriever::new(docs, Arc::new(TextTokenizer::regex_only()), 3, Bm25Params::default()).expect("build");

    let scores = r.scores("加湿器");
    assert_eq!(scores[0], 0.0);
    assert!(scores[1] > 0.0 && scores[2] > 0.0, "{scores:?}");

    let hits = r.retrieve("加湿器").expect("retrieve");
    assert_eq!(rows(&hits), vec![1, 2, 0]);
}

#[test]
fn term_in_half_the_catalog_still_counts() {
    // df = N / 2 gives a raw idf of exactly zero
    let docs: Arc<[CatalogDocument]> = vec![
        CatalogDocument::new(0, "name: ライト"),
        CatalogDocument::new(1, "name: 加湿器"),
        CatalogDocument::new(2, "name: イヤホン"),
        CatalogDocument::new(3, "name: 加湿器 大型"),
    ]
    .into();
    let r = LexicalRetriever::new(docs, Arc::new(TextTokenizer::regex_only()), 2, Bm25Params::default()).expect("build");
    assert_eq!(rows(&r.retrieve("加湿器").expect("retrieve")), vec![1, 3]);
}
