//! Destination filename resolution.
//!
//! Tries the `Content-Disposition` response header first, then the URL
//! path, then falls back to a fixed name. Never fails.

use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use url::Url;

/// Name used when neither the headers nor the URL yield one.
pub const FALLBACK_FILENAME: &str = "downloaded_file";

/// Resolve the destination filename for a response.
#[must_use]
pub fn resolve(headers: &HeaderMap, url: &str) -> String {
    let name = filename_from_headers(headers).unwrap_or_else(|| filename_from_url(url));
    sanitize(&name)
}

/// Extract a `filename=` token from a `Content-Disposition` header value.
///
/// Handles both `filename="x"` and `filename=x`; surrounding quotes are
/// stripped. Returns `None` when the header or the token is absent.
#[must_use]
pub fn filename_from_headers(headers: &HeaderMap) -> Option<String> {
    let cd = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    if !cd.contains("filename=") {
        return None;
    }

    let raw = cd.rsplit("filename=").next().unwrap_or("");
    let name = raw.trim().trim_matches('"').trim_matches('\'');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Best-effort filename extraction from a URL.
///
/// Takes the last path segment, percent-decoded and trimmed; query and
/// fragment are ignored.
#[must_use]
pub fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .map(|segment| {
            percent_decode_str(&segment)
                .decode_utf8_lossy()
                .trim()
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

// Header-supplied names may carry path separators; keep the final
// component only so the file cannot escape its staging directory.
fn sanitize(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with_disposition(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_filename_from_headers_quoted() {
        let headers = headers_with_disposition("attachment; filename=\"report.pdf\"");
        assert_eq!(
            filename_from_headers(&headers),
            Some("report.pdf".to_string())
        );
    }

    #[test]
    fn test_filename_from_headers_unquoted() {
        let headers = headers_with_disposition("attachment; filename=data.csv");
        assert_eq!(filename_from_headers(&headers), Some("data.csv".to_string()));
    }

    #[test]
    fn test_filename_from_headers_absent() {
        assert_eq!(filename_from_headers(&HeaderMap::new()), None);

        let headers = headers_with_disposition("attachment");
        assert_eq!(filename_from_headers(&headers), None);
    }

    #[test]
    fn test_filename_from_url_percent_decoded() {
        assert_eq!(
            filename_from_url("https://host/path/file%20name.zip?x=1"),
            "file name.zip"
        );
    }

    #[test]
    fn test_filename_from_url_empty_path_falls_back() {
        assert_eq!(filename_from_url("https://example.com"), FALLBACK_FILENAME);
        assert_eq!(filename_from_url("https://example.com/dir/"), FALLBACK_FILENAME);
        assert_eq!(filename_from_url("not a url"), FALLBACK_FILENAME);
    }

    #[test]
    fn test_resolve_prefers_headers() {
        let headers = headers_with_disposition("attachment; filename=\"from-header.bin\"");
        assert_eq!(
            resolve(&headers, "https://host/from-url.bin"),
            "from-header.bin"
        );
        assert_eq!(resolve(&HeaderMap::new(), "https://host/from-url.bin"), "from-url.bin");
    }

    #[test]
    fn test_resolve_strips_path_components() {
        let headers = headers_with_disposition("attachment; filename=\"../../etc/passwd\"");
        assert_eq!(resolve(&headers, "https://host/x"), "passwd");

        let headers = headers_with_disposition("attachment; filename=\"..\"");
        assert_eq!(resolve(&headers, "https://host/"), FALLBACK_FILENAME);
    }
}
