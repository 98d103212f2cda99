use http::Method;

use crate::mock::RecordedRequest;

/// Fluent assertions over a single recorded request.
///
/// ```ignore
/// assert_request(&handle.recorded()[0])
///     .method(Method::GET)
///     .path("/releases/1")
///     .query_param("page", "1")
///     .header("authorization", "Discogs token=tk");
/// ```
pub struct RequestAssert<'a> {
    req: &'a RecordedRequest,
}

pub fn assert_request(req: &RecordedRequest) -> RequestAssert<'_> {
    RequestAssert { req }
}

impl<'a> RequestAssert<'a> {
    pub fn method(self, expected: Method) -> Self {
        assert_eq!(
            self.req.method, expected,
            "method mismatch for {}",
            self.req.url
        );
        self
    }

    pub fn path(self, expected: &str) -> Self {
        assert_eq!(
            self.req.url.path(),
            expected,
            "path mismatch for {}",
            self.req.url
        );
        self
    }

    pub fn url(self, expected: &str) -> Self {
        assert_eq!(self.req.url.as_str(), expected, "full URL mismatch");
        self
    }

    /// Asserts the query string contains `name=value`, in any position.
    pub fn query_param(self, name: &str, value: &str) -> Self {
        let found = self
            .req
            .url
            .query_pairs()
            .any(|(k, v)| k == name && v == value);
        assert!(
            found,
            "query param {name}={value} not found in {:?}",
            self.req.url.query()
        );
        self
    }

    pub fn no_query_param(self, name: &str) -> Self {
        let found = self.req.url.query_pairs().any(|(k, _)| k == name);
        assert!(
            !found,
            "query param {name} unexpectedly present in {:?}",
            self.req.url.query()
        );
        self
    }

    pub fn header(self, name: &str, expected: &str) -> Self {
        let got = self
            .req
            .headers
            .get(name)
            .unwrap_or_else(|| panic!("header {name} missing; have {:?}", header_names(self.req)))
            .to_str()
            .unwrap_or_else(|_| panic!("header {name} is not valid UTF-8"));
        assert_eq!(got, expected, "header {name} mismatch");
        self
    }

    /// Asserts a header is present and its value starts with `prefix`.
    pub fn header_starts_with(self, name: &str, prefix: &str) -> Self {
        let got = self
            .req
            .headers
            .get(name)
            .unwrap_or_else(|| panic!("header {name} missing; have {:?}", header_names(self.req)))
            .to_str()
            .unwrap_or_else(|_| panic!("header {name} is not valid UTF-8"));
        assert!(
            got.starts_with(prefix),
            "header {name} = {got:?} does not start with {prefix:?}"
        );
        self
    }

    pub fn no_header(self, name: &str) -> Self {
        assert!(
            self.req.headers.get(name).is_none(),
            "header {name} unexpectedly present: {:?}",
            self.req.headers.get(name)
        );
        self
    }

    pub fn no_body(self) -> Self {
        assert!(
            self.req.body.is_none(),
            "unexpected body: {} bytes",
            self.req.body.as_ref().map(|b| b.len()).unwrap_or(0)
        );
        self
    }

    pub fn json_body(self, expected: serde_json::Value) -> Self {
        let body = self.req.body.as_ref().expect("request has no body");
        let got: serde_json::Value =
            serde_json::from_slice(body).expect("request body is not JSON");
        assert_eq!(got, expected, "JSON body mismatch");
        self
    }

    pub fn body_contains(self, needle: &str) -> Self {
        let body = self.req.body.as_ref().expect("request has no body");
        let text = std::str::from_utf8(body).expect("request body is not UTF-8");
        assert!(
            text.contains(needle),
            "body does not contain {needle:?}:\n{text}"
        );
        self
    }

    pub fn inner(self) -> &'a RecordedRequest {
        self.req
    }
}

fn header_names(req: &RecordedRequest) -> Vec<String> {
    req.headers.keys().map(|k| k.as_str().to_owned()).collect()
}
