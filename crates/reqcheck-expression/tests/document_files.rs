//! Loading expression documents from disk

use reqcheck_core::Error;
use reqcheck_expression::ExpressionDocument;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_document_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
name: thermal
expressions:
  - name: hot
    relational: "temperature < 85 C"
  - name: cold
    relational: "temperature > -40 C"
  - name: range
    and: [hot, cold]
  - name: not-range
    not: range
"#
    )
    .unwrap();

    let named = ExpressionDocument::from_file(file.path()).unwrap().build().unwrap();
    let c = named.collection();

    assert_eq!(c.len(), 4);
    assert_eq!(c.top_level(), vec![named.require("not-range").unwrap()]);
    assert_eq!(
        c.render(named.require("not-range").unwrap()).unwrap(),
        " NOT ((temperature < 85 C) AND (temperature > -40 C))"
    );
}

#[test]
fn test_missing_file_is_document_error() {
    let err = ExpressionDocument::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, Error::Document(_)));
}

#[test]
fn test_invalid_yaml_is_yaml_error() {
    let err = ExpressionDocument::from_yaml("name: [unterminated").unwrap_err();
    assert!(matches!(err, Error::Yaml(_)));
}
