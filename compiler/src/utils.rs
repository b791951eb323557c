/// Wraps `text` in double quotes, escaping it the way JSON does.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

#[test]
fn quotes_and_escapes() {
    assert_eq!(quote("Point"), "\"Point\"");
    assert_eq!(quote("a\"b"), "\"a\\\"b\"");
}
