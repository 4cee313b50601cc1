// ── JSON recovery ──
//
// Locates well-formed JSON objects embedded in arbitrary text. The raw TCP
// dialect answers with pseudo-HTTP framing (`METHOD /path`, a
// `Content-Length` line, ...) in front of the JSON body, and the framing is
// not reliable enough to parse as HTTP.

use serde_json::Deserializer;

use crate::Payload;

/// Lazy iterator over the JSON objects found in a string.
///
/// Yields `(object, end)` where `end` is the byte offset just past the
/// object. Scanning resumes from `end`, so consecutive objects are found in
/// order. A `{` that does not start a valid object is skipped one byte at a
/// time; the iterator never errors and always terminates.
#[derive(Debug, Clone)]
pub struct JsonObjects<'a> {
    text: &'a str,
    pos: usize,
}

/// Scan `text` for JSON objects, starting at byte offset `from`.
pub fn extract_json_objects(text: &str, from: usize) -> JsonObjects<'_> {
    let mut pos = from.min(text.len());
    while !text.is_char_boundary(pos) {
        pos += 1;
    }
    JsonObjects { text, pos }
}

/// The first JSON object embedded in `text`, if any.
pub fn first_json_object(text: &str) -> Option<Payload> {
    extract_json_objects(text, 0).next().map(|(obj, _)| obj)
}

impl Iterator for JsonObjects<'_> {
    type Item = (Payload, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let rest = self.text.get(self.pos..)?;
            let start = self.pos + rest.find('{')?;
            let candidate = self.text.get(start..)?;

            // Objects are self-delimiting, so trailing garbage after the
            // closing brace does not fail the parse.
            let mut stream = Deserializer::from_str(candidate).into_iter::<Payload>();
            match stream.next() {
                Some(Ok(object)) => {
                    let end = start + stream.byte_offset();
                    self.pos = end;
                    return Some((object, end));
                }
                _ => {
                    // `{` is a single byte, so `start + 1` stays on a char boundary.
                    self.pos = start + 1;
                }
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn obj(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn finds_object_behind_tcp_framing() {
        let body = r#"{"Header":{"MacAdress":"AA:BB"},"Info":{"Warnings":3}}"#;
        let raw = format!("POST /Complete\nContent-Length: {}\n{body}", body.len());

        let (found, end) = extract_json_objects(&raw, 0).next().unwrap();

        assert_eq!(
            found,
            obj(json!({"Header": {"MacAdress": "AA:BB"}, "Info": {"Warnings": 3}}))
        );
        assert_eq!(end, raw.len());
    }

    #[test]
    fn resumes_after_first_object() {
        let raw = r#"garbage {"a":1} more garbage {"b":{"c":[1,2,{"d":null}]}} tail"#;
        let found: Vec<_> = extract_json_objects(raw, 0).collect();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, obj(json!({"a": 1})));
        assert_eq!(found[1].0, obj(json!({"b": {"c": [1, 2, {"d": null}]}})));
        assert_eq!(&raw[found[0].1..found[0].1 + 6], " more ");

        let second_only: Vec<_> = extract_json_objects(raw, found[0].1).collect();
        assert_eq!(second_only.len(), 1);
        assert_eq!(second_only[0].0, found[1].0);
    }

    #[test]
    fn skips_invalid_candidates() {
        let raw = r#"{not json} {"ok":true}"#;
        let found: Vec<_> = extract_json_objects(raw, 0).map(|(o, _)| o).collect();
        assert_eq!(found, vec![obj(json!({"ok": true}))]);
    }

    #[test]
    fn stray_brace_in_framing_before_body() {
        let raw = "GET /{Complete\nContent-Length: 11\n{\"x\":\"{}\"}";
        assert_eq!(first_json_object(raw).unwrap(), obj(json!({"x": "{}"})));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_depth() {
        let raw = r#"xx{"msg":"a } b { c \" }","n":2}yy"#;
        let (found, end) = extract_json_objects(raw, 0).next().unwrap();
        assert_eq!(found, obj(json!({"msg": "a } b { c \" }", "n": 2})));
        assert_eq!(&raw[end..], "yy");
    }

    #[test]
    fn truncated_object_yields_nothing() {
        assert!(first_json_object(r#"POST /Action\n{"Header":{"Mac"#).is_none());
    }

    #[test]
    fn empty_and_brace_free_text_yield_nothing() {
        assert!(first_json_object("").is_none());
        assert!(first_json_object("HTTP/1.1 200 OK").is_none());
    }

    #[test]
    fn start_offset_past_end_is_empty() {
        assert_eq!(extract_json_objects(r#"{"a":1}"#, 100).count(), 0);
    }

    #[test]
    fn start_offset_inside_multibyte_char_is_tolerated() {
        let raw = r#"é{"a":1}"#;
        let found: Vec<_> = extract_json_objects(raw, 1).collect();
        assert_eq!(found.len(), 1);
    }
}
