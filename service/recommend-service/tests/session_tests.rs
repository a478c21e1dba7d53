use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use catalog_store::UnavailableCause;
use product_model::RetrievalResult;
use recommend_service::{DenseStatus, EmbedderChoice, Role, ServiceConfig, ServiceError, Session, SessionId, TurnContent};
use tempfile::{tempdir, TempDir};

const CATALOG: &str = "name,price,id,stock_status,category,description\n\
ワイヤレスイヤホン X1,12800,E001,あり,オーディオ,高音質 ワイヤレス イヤホン 長時間 再生\n\
LED デスクライト,4980,L001,残りわずか,照明,机 の ライト 調光\n\
卓上 加湿器,3980,H001,なし,家電,USB 充電 加湿器 静音\n\
モバイル バッテリー,2980,B001,あり,周辺機器,USB 充電 大容量\n";

fn config_in(dir: &Path, csv: &str, embedder: EmbedderChoice) -> ServiceConfig {
    let path = dir.join("products.csv");
    fs::write(&path, csv).expect("write catalog");
    let mut cfg = ServiceConfig { catalog_path: path, image_dir: dir.join("images"), embedder, ..ServiceConfig::default() };
    cfg.log.dir = dir.join("logs");
    cfg.hashing.dimension = 64;
    cfg
}

fn fixture(embedder: EmbedderChoice) -> (TempDir, ServiceConfig) {
    let dir = tempdir().expect("tempdir");
    let cfg = config_in(dir.path(), CATALOG, embedder);
    (dir, cfg)
}

fn top_id(result: &RetrievalResult) -> Option<String> {
    result.top().and_then(|d| d.product().id().map(str::to_string))
}

#[test]
fn session_ids_are_unique_hex_tokens() {
    let a = SessionId::new();
    let b = SessionId::new();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 32);
    assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn retriever_is_built_once() {
    let (_dir, cfg) = fixture(EmbedderChoice::Hashing);
    let mut session = Session::new(cfg);
    assert!(!session.is_ready());
    let first = session.ensure_retriever().expect("init") as *const _;
    let second = session.ensure_retriever().expect("init again") as *const _;
    assert_eq!(first, second);
    assert_eq!(session.dense_status(), Some(&DenseStatus::Ready { backend: "hnsw" }));
}

#[test]
fn lexical_only_session_ranks_matching_product_first() {
    let (_dir, cfg) = fixture(EmbedderChoice::None);
    let mut session = Session::new(cfg);
    let result = session.ask("加湿器").expect("ask");
    assert_eq!(top_id(&result).as_deref(), Some("H001"));
    assert_eq!(session.dense_status(), Some(&DenseStatus::Disabled));

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, TurnContent::Text("加湿器".into()));
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, TurnContent::Products(result));
}

#[test]
fn hybrid_session_returns_bounded_unique_results() {
    let (_dir, mut cfg) = fixture(EmbedderChoice::Hashing);
    cfg.top_k = 3;
    let mut session = Session::new(cfg);
    let result = session.ask("USBで充電できる加湿器").expect("ask");
    let RetrievalResult::Many(docs) = &result else { panic!("expected ranked documents, got {result:?}") };
    assert_eq!(docs.len(), 3);
    let mut rows: Vec<usize> = docs.iter().map(|d| d.row).collect();
    rows.sort_unstable();
    rows.dedup();
    assert_eq!(rows.len(), 3);
}

#[test]
fn missing_model_files_degrade_to_lexical() {
    let (dir, mut cfg) = fixture(EmbedderChoice::Onnx);
    cfg.onnx.model_path = dir.path().join("models/model.onnx");
    cfg.onnx.tokenizer_path = dir.path().join("models/tokenizer.json");
    let mut session = Session::new(cfg);
    let result = session.ask("加湿器").expect("lexical retrieval still answers");
    assert_eq!(top_id(&result).as_deref(), Some("H001"));
    match session.dense_status() {
        Some(DenseStatus::Unavailable(u)) => assert_eq!(u.cause, UnavailableCause::Configuration),
        other => panic!("expected unavailable dense retrieval, got {other:?}"),
    }
}

#[test]
fn empty_catalog_is_fatal_with_remediation() {
    let dir = tempdir().expect("tempdir");
    let cfg = config_in(dir.path(), "name,price,id\n", EmbedderChoice::None);
    let mut session = Session::new(cfg);
    let err = session.ask("机のライト").err().expect("no documents");
    assert!(matches!(err, ServiceError::EmptyCatalog { .. }));
    let message = err.user_message();
    assert!(message.contains("data/products.csv"));
    assert!(message.ends_with(recommend_service::COMMON_ERROR_MESSAGE));
    assert!(!session.is_ready());
    assert!(session.messages().is_empty());
}

#[test]
fn replay_renders_the_conversation() {
    let (_dir, cfg) = fixture(EmbedderChoice::None);
    let mut session = Session::new(cfg);
    session.ask("机 ライト").expect("ask");
    let mut out = Vec::new();
    session.replay(&mut out).expect("replay");
    let text = String::from_utf8(out).expect("utf-8");
    assert!(text.starts_with("> 机 ライト\n"));
    assert!(text.contains("商品名：LED デスクライト（商品ID: L001）"));
    assert!(text.contains("価格：4980 ⚠️ 残りわずか"));
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("log buffer").clone()).expect("utf-8 logs")
    }
}

#[test]
fn rendering_logs_carry_the_session_id() {
    let (_dir, cfg) = fixture(EmbedderChoice::None);
    let logs = Captured::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt().with_writer(move || writer.clone()).with_ansi(false).finish();

    let id = tracing::subscriber::with_default(subscriber, || {
        let mut session = Session::new(cfg);
        let result = session.ask("USB").expect("ask");
        let mut out = Vec::new();
        session.display(&mut out, &result).expect("display");
        assert!(!out.is_empty());
        session.id().clone()
    });

    let text = logs.text();
    let rendering: Vec<&str> = text.lines().filter(|l| l.contains("presenting product") || l.contains("image unavailable")).collect();
    assert!(!rendering.is_empty(), "no rendering logs in:\n{text}");
    let tag = format!("session_id={id}");
    for line in rendering {
        assert!(line.contains(&tag), "untagged log line: {line}");
    }
}

#[test]
fn failed_turns_leave_no_dangling_query() {
    let dir = tempdir().expect("tempdir");
    let cfg = config_in(dir.path(), "name,price,id\n", EmbedderChoice::None);
    let mut session = Session::new(cfg);
    assert!(session.ask("加湿器").is_err());
    assert!(session.ask("ライト").is_err());
    assert!(session.messages().is_empty());

    let mut out = Vec::new();
    session.replay(&mut out).expect("replay");
    assert!(out.is_empty());
}
