//! The request surface consumed by the gate.

use url::Url;

/// Query parameter carrying a sealed grant token.
pub const GRANT_PARAM: &str = "grant";

/// Creator-only: mint a grant link for this tag instead of serving the file.
pub const GRANT_TAG_PARAM: &str = "grant_tag";

/// Creator-only: grant validity in (fractional) hours.
pub const EXPIRES_PARAM: &str = "expires";

/// Creator-only: override the access tag recorded for this download.
pub const ID_PARAM: &str = "id";

/// One request for an exclusive file, already parsed by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusiveRequest {
    /// Request path, e.g. `/exclusive/book.pdf`. Grants bind to this exactly.
    pub path: String,

    /// Decoded query parameters in request order.
    pub query: Vec<(String, String)>,

    /// Network origin of the request.
    pub client_ip: String,

    /// Opaque session identifier, if the client presented one.
    pub session_id: Option<String>,
}

impl ExclusiveRequest {
    pub fn new(path: impl Into<String>, client_ip: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            client_ip: client_ip.into(),
            session_id: None,
        }
    }

    /// Build from a full request URL.
    pub fn from_url(url: &Url, client_ip: impl Into<String>) -> Self {
        Self {
            path: url.path().to_string(),
            query: url.query_pairs().into_owned().collect(),
            client_ip: client_ip.into(),
            session_id: None,
        }
    }

    /// Add a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attach a session identifier.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// First value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_decodes_query() {
        let url = Url::parse("https://dl.example.com/exclusive/book.pdf?grant=a%2Bb%3D&id=x").unwrap();
        let req = ExclusiveRequest::from_url(&url, "198.51.100.4");

        assert_eq!(req.path, "/exclusive/book.pdf");
        assert_eq!(req.param(GRANT_PARAM), Some("a+b="));
        assert_eq!(req.param(ID_PARAM), Some("x"));
        assert_eq!(req.param(GRANT_TAG_PARAM), None);
    }

    #[test]
    fn test_first_value_wins() {
        let req = ExclusiveRequest::new("/exclusive/a", "::1")
            .with_param("id", "first")
            .with_param("id", "second");

        assert_eq!(req.param("id"), Some("first"));
    }
}
