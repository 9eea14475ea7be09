//! The two DART Open API endpoints this proxy fronts.
//!
//! Each endpoint knows its path under the API base URL. Upstream URLs are
//! assembled here, credential last, so that the caller's query string is
//! carried through untouched.

use crate::config::Credential;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_BASE_URL: &str = "https://opendart.fss.or.kr/api";

/// Query parameter DART expects the API key in.
pub const CREDENTIAL_PARAM: &str = "crtfc_key";

static STATUS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<status>(\d+)</status>").expect("valid status regex"));
static MESSAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<message>(.*?)</message>").expect("valid message regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DartEndpoint {
    /// ZIP archive of every corporation's unique code.
    CorpCode,
    /// Full single-company financial statements, JSON.
    SingleCompanyAccounts,
}

impl DartEndpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::CorpCode => "corpCode.xml",
            Self::SingleCompanyAccounts => "fnlttSinglAcntAll.json",
        }
    }

    /// `<base>/<path>?[<query>&]crtfc_key=<key>`
    ///
    /// `query` is appended verbatim. It is expected to already be a valid,
    /// percent-encoded query string as received from the caller.
    #[must_use]
    pub fn url(self, base_url: &str, query: Option<&str>, key: &Credential) -> String {
        let base = base_url.trim_end_matches('/');
        match query.filter(|q| !q.is_empty()) {
            Some(q) => format!(
                "{}/{}?{}&{}={}",
                base,
                self.path(),
                q,
                CREDENTIAL_PARAM,
                key.expose()
            ),
            None => format!(
                "{}/{}?{}={}",
                base,
                self.path(),
                CREDENTIAL_PARAM,
                key.expose()
            ),
        }
    }
}

/// Pull `<status>` and `<message>` out of a DART XML error document.
///
/// Returns `None` unless both tags are present.
#[must_use]
pub fn extract_xml_error(body: &str) -> Option<(String, String)> {
    let status = STATUS_TAG.captures(body)?.get(1)?.as_str();
    let message = MESSAGE_TAG.captures(body)?.get(1)?.as_str();
    Some((status.to_string(), message.to_string()))
}

/// Whether a declared `Content-Type` denotes a ZIP archive.
#[must_use]
pub fn is_zip_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/zip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corp_code_url() {
        let key = Credential::new("KEY");
        assert_eq!(
            DartEndpoint::CorpCode.url(DEFAULT_BASE_URL, None, &key),
            "https://opendart.fss.or.kr/api/corpCode.xml?crtfc_key=KEY"
        );
    }

    #[test]
    fn test_accounts_url_keeps_query_verbatim() {
        let key = Credential::new("KEY");
        let query = "corp_code=00126380&bsns_year=2023&reprt_code=11011&fs_div=CFS&q=%ED%95%9C+a%2Bb";
        assert_eq!(
            DartEndpoint::SingleCompanyAccounts.url("http://localhost:1/api/", Some(query), &key),
            format!("http://localhost:1/api/fnlttSinglAcntAll.json?{query}&crtfc_key=KEY")
        );
    }

    #[test]
    fn test_empty_query_is_ignored() {
        let key = Credential::new("K");
        assert_eq!(
            DartEndpoint::SingleCompanyAccounts.url("http://h", Some(""), &key),
            "http://h/fnlttSinglAcntAll.json?crtfc_key=K"
        );
    }

    #[test]
    fn test_extract_xml_error() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<result>
<status>010</status>
<message>등록되지 않은 키입니다.</message>
</result>"#;
        assert_eq!(
            extract_xml_error(body),
            Some(("010".to_string(), "등록되지 않은 키입니다.".to_string()))
        );
    }

    #[test]
    fn test_extract_xml_error_needs_both_tags() {
        assert_eq!(extract_xml_error("<result><status>013</status></result>"), None);
        assert_eq!(extract_xml_error("<message>No data</message>"), None);
        assert_eq!(extract_xml_error("<status>abc</status><message>x</message>"), None);
        assert_eq!(extract_xml_error("not xml at all"), None);
    }

    #[test]
    fn test_zip_content_type() {
        assert!(is_zip_content_type(Some("application/zip")));
        assert!(is_zip_content_type(Some("Application/ZIP; charset=binary")));
        assert!(!is_zip_content_type(Some("text/xml;charset=UTF-8")));
        assert!(!is_zip_content_type(None));
    }
}
