use std::collections::BTreeSet;

use catalog_store::tokenizer::{Analyzer, TextTokenizer, TokenizeError};

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

struct BrokenAnalyzer;

impl Analyzer for BrokenAnalyzer {
    fn name(&self) -> &'static str { "broken" }
    fn analyze(&self, _text: &str) -> Result<Vec<String>, TokenizeError> {
        Err(TokenizeError::Failed("dictionary missing".into()))
    }
}

struct CharAnalyzer;

impl Analyzer for CharAnalyzer {
    fn name(&self) -> &'static str { "chars" }
    fn analyze(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        Ok(text.chars().filter(|c| !c.is_whitespace()).map(String::from).collect())
    }
}

#[test]
fn regex_split_keeps_japanese_runs_together() {
    let tokenizer = TextTokenizer::regex_only();
    assert_eq!(tokenizer.strategy(), "regex");
    assert_eq!(tokenizer.tokenize("USBで充電できる加湿器"), set(&["USBで充電できる加湿器"]));
    assert_eq!(
        tokenizer.tokenize("長時間使える、高音質なワイヤレスイヤホン"),
        set(&["長時間使える", "高音質なワイヤレスイヤホン"])
    );
}

#[test]
fn regex_split_deduplicates_tokens() {
    let tokenizer = TextTokenizer::regex_only();
    assert_eq!(tokenizer.tokenize("机 ライト 机 ライト"), set(&["机", "ライト"]));
}

#[test]
fn input_without_word_characters_is_its_own_token() {
    let tokenizer = TextTokenizer::regex_only();
    assert_eq!(tokenizer.tokenize(""), set(&[""]));
    assert_eq!(tokenizer.tokenize("！？"), set(&["！？"]));
}

#[test]
fn failing_primary_falls_back_to_regex() {
    let tokenizer = TextTokenizer::with_primary(Box::new(BrokenAnalyzer));
    assert_eq!(tokenizer.strategy(), "broken");
    assert_eq!(tokenizer.tokenize("机のライト 調光"), TextTokenizer::regex_only().tokenize("机のライト 調光"));
}

#[test]
fn working_primary_is_used() {
    let tokenizer = TextTokenizer::with_primary(Box::new(CharAnalyzer));
    assert_eq!(tokenizer.tokenize("机の机"), set(&["机", "の"]));
}

#[test]
fn detect_without_morphology_uses_regex() {
    let tokenizer = TextTokenizer::detect();
    if cfg!(feature = "lindera") {
        assert!(matches!(tokenizer.strategy(), "lindera" | "regex"));
    } else {
        assert_eq!(tokenizer.strategy(), "regex");
    }
    assert!(!tokenizer.tokenize("加湿器").is_empty());
}

#[cfg(feature = "lindera")]
#[test]
fn morphological_analyzer_splits_compound_sentences() {
    let analyzer = catalog_store::tokenizer::LinderaAnalyzer::new().expect("bundled dictionary");
    let tokenizer = TextTokenizer::with_primary(Box::new(analyzer));
    assert_eq!(tokenizer.strategy(), "lindera");

    let tokens = tokenizer.tokenize("USBで充電できる加湿器");
    assert!(tokens.len() > 1, "{tokens:?}");
    assert!(tokens.contains("充電"), "{tokens:?}");
    assert!(!tokens.contains("USBで充電できる加湿器"), "{tokens:?}");
}
