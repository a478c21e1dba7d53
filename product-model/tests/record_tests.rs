use product_model::{serialize_fields, CatalogDocument, ProductRecord, RetrievalResult, StockStatus};

#[test]
fn serialized_fields_parse_back_exactly() {
    let content = serialize_fields([("name", "テスト商品"), ("price", "1000円"), ("id", "P001")]);
    assert_eq!(content, "name: テスト商品\nprice: 1000円\nid: P001");

    let record = ProductRecord::parse_validated(&content).expect("all required fields present");
    assert_eq!(record.len(), 3);
    assert_eq!(record.name(), Some("テスト商品"));
    assert_eq!(record.price(), Some("1000円"));
    assert_eq!(record.id(), Some("P001"));
}

#[test]
fn multiline_values_are_folded_so_they_survive_parsing() {
    let content = serialize_fields([
        ("name", "加湿器"),
        ("description", "USBで充電できます。\n静音設計です。"),
        ("price", "3980円"),
        ("id", "P010"),
    ]);
    let record = ProductRecord::parse(&content);
    assert_eq!(record.description(), Some("USBで充電できます。 静音設計です。"));
    assert_eq!(record.len(), 4);
}

#[test]
fn missing_id_is_reported_by_name() {
    let err = ProductRecord::parse_validated("name: テスト商品\nprice: 1000円").expect_err("id is missing");
    assert_eq!(err.missing, vec!["id".to_string()]);
    assert_eq!(err.available, vec!["name".to_string(), "price".to_string()]);
    assert_eq!(err.raw, "name: テスト商品\nprice: 1000円");
    assert!(err.to_string().contains("id"));
}

#[test]
fn duplicate_keys_keep_the_last_value() {
    let record = ProductRecord::parse("name: A\nname: B\nid: 1\nprice: 1");
    assert_eq!(record.name(), Some("B"));
    assert!(record.missing_required().is_empty());
}

#[test]
fn value_may_contain_the_separator_after_the_first_split() {
    let record = ProductRecord::parse("description: 使い方: 水を入れるだけ");
    assert_eq!(record.description(), Some("使い方: 水を入れるだけ"));
}

#[test]
fn blank_and_malformed_lines_are_skipped() {
    let record = ProductRecord::parse("name: A\n\n   \nnot a field line\r\nprice: 10\r\nid: X");
    assert_eq!(record.len(), 3);
    assert_eq!(record.price(), Some("10"));
    assert_eq!(record.id(), Some("X"));
}

#[test]
fn stock_status_recognizes_only_known_labels() {
    let low = ProductRecord::parse("stock_status: 残りわずか");
    assert_eq!(low.stock_status(), Some(StockStatus::LowStock));

    let unknown = ProductRecord::parse("stock_status: 存在しない値");
    assert_eq!(unknown.stock_status(), None);

    let absent = ProductRecord::parse("name: A");
    assert_eq!(absent.stock_status(), None);

    for status in [StockStatus::InStock, StockStatus::LowStock, StockStatus::OutOfStock] {
        assert_eq!(StockStatus::from_label(status.label()), Some(status));
    }
}

#[test]
fn optional_fields_fall_back_to_defaults() {
    let record = ProductRecord::parse("name: A\nprice: 1\nid: 2");
    assert_eq!(record.category(), "未設定");
    assert_eq!(record.maker(), "未設定");
    assert_eq!(record.score(), "未評価");
    assert_eq!(record.review_number(), "0");
    assert_eq!(record.file_name(), None);
    assert_eq!(record.recommended_people(), None);
}

#[test]
fn retrieval_result_top_normalizes_shapes() {
    let a = CatalogDocument::new(0, "name: A");
    let b = CatalogDocument::new(1, "name: B");

    assert_eq!(RetrievalResult::Empty.top(), None);
    assert_eq!(RetrievalResult::Single(b.clone()).top(), Some(&b));
    assert_eq!(RetrievalResult::Many(vec![a.clone(), b.clone()]).top(), Some(&a));
    assert_eq!(RetrievalResult::from_ranked(Vec::new()), RetrievalResult::Empty);
    assert_eq!(RetrievalResult::Many(vec![a, b]).shape(), "many(2)");
}

#[test]
fn catalog_document_carries_loader_metadata() {
    let doc = CatalogDocument::with_source(3, "name: A", "data/products.csv");
    assert_eq!(doc.metadata.get("source").map(String::as_str), Some("data/products.csv"));
    assert_eq!(doc.metadata.get("row").map(String::as_str), Some("3"));

    let json = serde_json::to_value(RetrievalResult::Single(doc)).expect("serializable");
    assert_eq!(json["kind"], "single");
    assert_eq!(json["documents"]["row"], 3);
}
