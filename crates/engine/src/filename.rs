//! Filename derivation for resolved downloads
//!
//! A name is taken from the `Content-Disposition` header when the server sends
//! one, otherwise from the final URL: its last path segment, then a `filename`
//! query parameter, then a fixed placeholder.

use std::borrow::Cow;

use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use url::Url;

/// Placeholder used when neither the headers nor the URL yield a name
pub const DEFAULT_FILENAME: &str = "download";

/// Picks a filename for a response received from `final_url`
pub fn from_response(headers: &HeaderMap, final_url: &Url, fallback: &str) -> String {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .and_then(parse_content_disposition)
        .unwrap_or_else(|| from_url(final_url, fallback))
}

/// Extracts the filename parameter of a `Content-Disposition` header value
///
/// Handles:
/// - `attachment; filename="example.apk"`
/// - `attachment; filename=example.apk`
/// - `attachment; filename*=UTF-8''%E4%BE%8B.apk` (RFC 5987)
///
/// Parameters are split on `;` outside quoted strings, so quoted values may
/// contain `;`. The extended form wins when both are present. Only the last path
/// component of the value is returned.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header) {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "filename*" if extended.is_none() => extended = Some(decode_extended(value.trim())),
            "filename" if plain.is_none() => plain = Some(value.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    extended
        .into_iter()
        .chain(plain)
        .find_map(|name| last_component(&name))
}

/// Derives a filename from the URL alone
pub fn from_url(url: &Url, fallback: &str) -> String {
    let from_path = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .and_then(|segment| last_component(&percent_decode(segment)));

    from_path
        .or_else(|| {
            url.query_pairs()
                .filter(|(key, _)| key == "filename")
                .find_map(|(_, value)| last_component(&value))
        })
        .unwrap_or_else(|| fallback.to_string())
}

// splits on `;` outside of quoted strings
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (idx, ch) in header.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(header[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    params.push(header[start..].trim());
    params
}

// charset'language'value; charset and language are ignored
fn decode_extended(value: &str) -> String {
    let value = value.trim_matches('"');
    let encoded = value
        .find("''")
        .map_or(value, |idx| &value[idx + 2..]);
    percent_decode(encoded).into_owned()
}

fn percent_decode(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

fn last_component(name: &str) -> Option<String> {
    let name = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
        .trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_plain_quoted_filename() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="game.apk""#),
            Some("game.apk".to_string())
        );
    }

    #[test]
    fn test_plain_unquoted_filename() {
        assert_eq!(
            parse_content_disposition("attachment; filename=game.apk; size=42"),
            Some("game.apk".to_string())
        );
    }

    #[test]
    fn test_extended_filename_is_percent_decoded() {
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''%E5%8E%9F%E7%A5%9E%20cn.apk"),
            Some("原神 cn.apk".to_string())
        );
    }

    #[test]
    fn test_extended_filename_wins_over_plain() {
        let header = r#"attachment; filename="fallback.apk"; filename*=UTF-8''real%2Dname.apk"#;
        assert_eq!(
            parse_content_disposition(header),
            Some("real-name.apk".to_string())
        );
    }

    #[test]
    fn test_extended_with_invalid_utf8_keeps_raw_value() {
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''bad%FF.bin"),
            Some("bad%FF.bin".to_string())
        );
    }

    #[test]
    fn test_semicolon_inside_quotes_is_kept() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="a;b.apk"; size=3"#),
            Some("a;b.apk".to_string())
        );
    }

    #[test]
    fn test_plus_in_extended_value_is_literal() {
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''a+b.apk"),
            Some("a+b.apk".to_string())
        );
    }

    #[test]
    fn test_parameter_name_is_case_insensitive() {
        assert_eq!(
            parse_content_disposition("Attachment; FileName=\"x.zip\""),
            Some("x.zip".to_string())
        );
    }

    #[test]
    fn test_empty_or_missing_filename_is_none() {
        assert_eq!(parse_content_disposition("attachment"), None);
        assert_eq!(parse_content_disposition(r#"attachment; filename="""#), None);
        assert_eq!(parse_content_disposition("inline; name=field"), None);
    }

    #[test]
    fn test_directory_components_are_stripped() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="../../etc/passwd""#),
            Some("passwd".to_string())
        );
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="C:\\tmp\\evil.exe""#),
            Some("evil.exe".to_string())
        );
        assert_eq!(parse_content_disposition(r#"attachment; filename="..""#), None);
    }

    #[test]
    fn test_from_url_uses_last_segment() {
        assert_eq!(
            from_url(&url("https://cdn.example.com/pkg/v5.0/game_5.0.apk?sig=abc"), DEFAULT_FILENAME),
            "game_5.0.apk"
        );
    }

    #[test]
    fn test_from_url_decodes_segment() {
        assert_eq!(
            from_url(&url("https://example.com/files/my%20file.zip"), DEFAULT_FILENAME),
            "my file.zip"
        );
    }

    #[test]
    fn test_from_url_ignores_trailing_slash() {
        assert_eq!(
            from_url(&url("https://example.com/releases/latest/"), DEFAULT_FILENAME),
            "latest"
        );
    }

    #[test]
    fn test_from_url_falls_back_to_query_parameter() {
        assert_eq!(
            from_url(&url("https://example.com/?id=7&filename=report.pdf"), DEFAULT_FILENAME),
            "report.pdf"
        );
    }

    #[test]
    fn test_from_url_skips_empty_query_parameter() {
        assert_eq!(
            from_url(&url("https://example.com/?filename=&filename=b.txt"), DEFAULT_FILENAME),
            "b.txt"
        );
    }

    #[test]
    fn test_from_url_default_placeholder() {
        assert_eq!(from_url(&url("https://example.com/"), DEFAULT_FILENAME), "download");
        assert_eq!(from_url(&url("https://example.com"), "custom"), "custom");
    }

    #[test]
    fn test_from_response_prefers_content_disposition() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="from-header.apk""#),
        );
        let final_url = url("https://example.com/from-path.apk");
        assert_eq!(
            from_response(&headers, &final_url, DEFAULT_FILENAME),
            "from-header.apk"
        );
    }

    #[test]
    fn test_from_response_without_usable_header_uses_url() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
        let final_url = url("https://example.com/from-path.apk");
        assert_eq!(
            from_response(&headers, &final_url, DEFAULT_FILENAME),
            "from-path.apk"
        );
        assert_eq!(
            from_response(&HeaderMap::new(), &final_url, DEFAULT_FILENAME),
            "from-path.apk"
        );
    }
}
