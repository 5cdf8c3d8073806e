use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

const COMMENT_PREFIX: &str = "/*# sourceMappingURL=data:application/json;charset=utf-8;base64,";
const COMMENT_SUFFIX: &str = " */";
const VLQ_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Position in the original file. `line` is 1-based, `column` 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

/// Source Map v3 payload with exactly one mapping.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapPayload<'a> {
    version: u8,
    sources: [&'a str; 1],
    names: [&'a str; 0],
    mappings: String,
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources_content: Option<[&'a str; 1]>,
}

/// Forward slashes, no `file://` scheme.
fn normalize_filename(filename: &str) -> String {
    let s = filename.replace('\\', "/");
    match s.strip_prefix("file://") {
        Some(path) => path.to_string(),
        None => s,
    }
}

fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(VLQ_ALPHABET[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Single segment mapping generated line 1, column 0 to `original`.
fn single_mapping(original: SourcePosition) -> String {
    let mut mappings = String::new();
    encode_vlq(0, &mut mappings);
    encode_vlq(0, &mut mappings);
    encode_vlq(original.line.saturating_sub(1) as i64, &mut mappings);
    encode_vlq(original.column as i64, &mut mappings);
    mappings
}

/// Build the inline `sourceMappingURL` comment pointing the start of a css
/// template back to `position` in `source_name`.
///
/// Returns an empty string when there is no source name to point at.
pub fn inline_source_map_comment(
    source_name: &str,
    source_content: Option<&str>,
    position: SourcePosition,
) -> String {
    if source_name.is_empty() {
        return String::new();
    }

    let source_name = normalize_filename(source_name);
    let payload = SourceMapPayload {
        version: 3,
        sources: [source_name.as_str()],
        names: [],
        mappings: single_mapping(position),
        file: &source_name,
        sources_content: source_content.map(|c| [c]),
    };

    match serde_json::to_vec(&payload) {
        Ok(json) => format!("{COMMENT_PREFIX}{}{COMMENT_SUFFIX}", STANDARD.encode(json)),
        Err(err) => {
            tracing::warn!("could not serialize source map for {source_name}: {err}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(comment: &str) -> serde_json::Value {
        let b64 = comment
            .strip_prefix(COMMENT_PREFIX)
            .and_then(|s| s.strip_suffix(COMMENT_SUFFIX))
            .expect("inline source map comment");
        let json = STANDARD.decode(b64).expect("valid base64");
        serde_json::from_slice(&json).expect("valid json")
    }

    #[test]
    fn embeds_single_mapping() {
        let comment = inline_source_map_comment(
            "src/button.js",
            Some("const a = 1;"),
            SourcePosition { line: 3, column: 2 },
        );
        let map = decode(&comment);
        assert_eq!(map["version"], 3);
        assert_eq!(map["sources"][0], "src/button.js");
        assert_eq!(map["file"], "src/button.js");
        assert_eq!(map["mappings"], "AAEE");
        assert_eq!(map["sourcesContent"][0], "const a = 1;");
        assert!(map["names"].as_array().unwrap().is_empty());
    }

    #[test]
    fn large_values_use_continuation_digits() {
        let mut out = String::new();
        encode_vlq(16, &mut out);
        assert_eq!(out, "gB");
        out.clear();
        encode_vlq(-1, &mut out);
        assert_eq!(out, "D");
    }

    #[test]
    fn no_source_name_means_no_map() {
        assert_eq!(
            inline_source_map_comment("", None, SourcePosition { line: 1, column: 0 }),
            ""
        );
    }

    #[test]
    fn normalizes_paths_and_file_urls() {
        assert_eq!(normalize_filename("C:\\src\\a.js"), "C:/src/a.js");
        assert_eq!(normalize_filename("file:///home/a.js"), "/home/a.js");
    }
}
