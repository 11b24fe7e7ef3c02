//! Source text helpers shared by the compiler and the bundle driver.

/// Strips a leading UTF-8 byte order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

/// Wraps JSON text in an ES module whose default export is the parsed value.
pub fn transform_json_source(source: &str) -> String {
    format!("export default JSON.parse(\"{}\");", escape_js_string(source))
}

/// Converts backslashes to forward slashes so ids compare equal across
/// platforms.
pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

fn escape_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            c if c < '\x20' => result.push_str(&format!("\\u{:04x}", c as u32)),
            c => result.push(c),
        }
    }
    result
}
