use super::*;

#[test]
fn predicate_quotes_plain_values() {
    assert_eq!(
        equality_predicate("category", "features/materials"),
        "category = 'features/materials'"
    );
}

#[test]
fn predicate_escapes_single_quotes() {
    assert_eq!(
        equality_predicate("id", "documentation_it's_fine"),
        "id = 'documentation_it''s_fine'"
    );
    assert_eq!(equality_predicate("url", "'"), "url = ''''");
}

#[test]
fn embedding_record_keeps_record_and_vector() {
    let record = EmbeddingRecord::new("payload", vec![0.5, 0.25]);
    assert_eq!(record.record, "payload");
    assert_eq!(record.vector, vec![0.5, 0.25]);
}
