//! Request configuration and preparation.
//!
//! A [`Request`] is what the caller configures: method, parameters, POST
//! format, an optional explicit body and file attachments. Preparing it
//! against an [`Endpoint`] resolves parameters, encodes the body and builds the
//! final URL, producing the [`PreparedRequest`] handed to a
//! [`Transport`](crate::Transport).
//!
//! # Example
//!
//! ```
//! use courier_core::{BodyEncoder, Endpoint, FilePart, RawDecoder, Request};
//!
//! struct Upload;
//!
//! impl Endpoint for Upload {
//!     type Decoder = RawDecoder;
//!
//!     fn url(&self) -> String {
//!         "https://api.example.com/upload".to_string()
//!     }
//! }
//!
//! let prepared = Request::post()
//!     .param("name", "bob")
//!     .file(FilePart::new("file", "a.txt", "text/plain", "hi"))
//!     .prepare_for(&Upload, &BodyEncoder::with_boundary("XyZ"))
//!     .expect("prepare");
//!
//! assert_eq!(
//!     prepared.header("Content-Type"),
//!     Some("multipart/form-data; boundary=XyZ")
//! );
//! ```

use std::collections::HashMap;

use bytes::Bytes;

use crate::{
    Body, BodyEncoder, Endpoint, Error, FilePart, Method, ParamValue, Params, PostFormat,
    ProgressReporter, ResolvedParams, Result, resolve,
};

// ============================================================================
// Caller Configuration
// ============================================================================

/// A request as configured by the caller.
///
/// Built by value; once handed to an executor it can no longer change.
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    post_format: Option<PostFormat>,
    params: Params,
    body: Option<Body>,
    files: Vec<FilePart>,
    headers: HashMap<String, String>,
}

impl Request {
    /// Create a request for the given method.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Create a `GET` request.
    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    /// Create a `POST` request.
    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::Post)
    }

    /// Set a parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Add parameters; later values win on collision.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params.merge(params);
        self
    }

    /// Choose how `POST` parameters are serialized.
    ///
    /// Without an explicit choice, the format follows the content: file parts
    /// select form-data, an explicit body selects raw, anything else is
    /// URL-encoded.
    #[must_use]
    pub const fn post_format(mut self, format: PostFormat) -> Self {
        self.post_format = Some(format);
        self
    }

    /// Set an explicit body sent verbatim with the raw format.
    #[must_use]
    pub fn post_body(mut self, data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(Body::new(data, content_type));
        self
    }

    /// Set an explicit [`Body`].
    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a file, sent as a multipart part.
    #[must_use]
    pub fn file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    /// Attach file data under a field name.
    #[must_use]
    pub fn file_data(
        self,
        data: impl Into<Bytes>,
        key: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        self.file(FilePart::new(key, filename, content_type, data))
    }

    /// Set a request header.
    ///
    /// Names compare case-insensitively; a later value replaces an earlier
    /// one. `Content-Type` is always replaced by the encoded body's type.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Caller parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Params {
        &self.params
    }

    /// Explicit body, if set.
    #[must_use]
    pub const fn explicit_body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Attached files, in insertion order.
    #[must_use]
    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    /// Caller headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The format actually used for a `POST` body.
    #[must_use]
    pub fn effective_post_format(&self) -> PostFormat {
        match self.post_format {
            Some(format) => format,
            None if !self.files.is_empty() => PostFormat::FormData,
            None if self.body.is_some() => PostFormat::Raw,
            None => PostFormat::UrlEncoded,
        }
    }

    /// Resolve parameters against `endpoint` and prepare the request.
    ///
    /// # Errors
    ///
    /// See [`Request::prepare`].
    pub fn prepare_for<E>(self, endpoint: &E, encoder: &BodyEncoder) -> Result<PreparedRequest>
    where
        E: Endpoint + ?Sized,
    {
        let url = endpoint.url();
        let resolved = resolve(
            self.params.clone(),
            endpoint.extra_parameters(),
            endpoint.extra_query_parameters(),
        );
        self.prepare(&url, resolved, encoder)
    }

    /// Build the final URL, headers and body.
    ///
    /// `GET` puts body and query parameters in the query string; `POST` puts
    /// only the query parameters there and encodes the body parameters.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] for an empty URL or a body/format conflict
    /// - [`Error::InvalidUrl`] if `url` does not parse
    /// - [`Error::Encoding`] if a parameter cannot be stringified
    pub fn prepare(
        self,
        url: &str,
        resolved: ResolvedParams,
        encoder: &BodyEncoder,
    ) -> Result<PreparedRequest> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::configuration("endpoint URL is empty"));
        }
        let url = url::Url::parse(url)?;

        let format = self.effective_post_format();
        let body = encoder.encode(
            self.method,
            format,
            &resolved.body,
            self.body.as_ref(),
            &self.files,
        )?;

        let mut query = Vec::new();
        if self.method == Method::Get {
            query.extend(resolved.body.to_pairs()?);
        }
        query.extend(resolved.query.to_pairs()?);

        let mut builder = PreparedRequest::builder(self.method, url)
            .headers(self.headers)
            .query_pairs(query);
        if let Some(body) = body {
            let (content_type, data) = body.into_parts();
            builder = builder.header("Content-Type", content_type).body(data);
        }

        Ok(builder.build())
    }
}

// ============================================================================
// Prepared Request
// ============================================================================

/// A fully built HTTP request, ready for a transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    progress: ProgressReporter,
}

impl PreparedRequest {
    /// Creates a new [`PreparedRequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> PreparedRequestBuilder {
        PreparedRequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL, including the query string.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Request body, absent for `GET`.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Progress reporter the transport should feed.
    #[must_use]
    pub const fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Replace the progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Consume into (method, url, headers, body, progress).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Method,
        url::Url,
        HashMap<String, String>,
        Option<Bytes>,
        ProgressReporter,
    ) {
        (
            self.method,
            self.url,
            self.headers,
            self.body,
            self.progress,
        )
    }
}

/// Builder for constructing [`PreparedRequest`] instances.
#[derive(Debug, Clone)]
pub struct PreparedRequestBuilder {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
}

impl PreparedRequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any with the same name in any case.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            set_header(&mut self.headers, name, value);
        }
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends multiple query parameters to the URL.
    ///
    /// An empty iterator leaves the URL untouched.
    #[must_use]
    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_some() {
            let mut query = self.url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(&name, &value);
            }
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the [`PreparedRequest`] with a no-op progress reporter.
    #[must_use]
    pub fn build(self) -> PreparedRequest {
        PreparedRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            progress: ProgressReporter::noop(),
        }
    }
}

/// Header names are case-insensitive; at most one entry per name is kept.
fn set_header(headers: &mut HashMap<String, String>, name: String, value: String) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::RawDecoder;

    struct Search;

    impl Endpoint for Search {
        type Decoder = RawDecoder;

        fn url(&self) -> String {
            "https://api.example.com/search?lang=en".to_string()
        }

        fn extra_parameters(&self) -> Params {
            Params::new().with("format", "json")
        }

        fn extra_query_parameters(&self) -> Params {
            Params::new().with("api_key", "k 1")
        }
    }

    struct Blank;

    impl Endpoint for Blank {
        type Decoder = RawDecoder;

        fn url(&self) -> String {
            "   ".to_string()
        }
    }

    struct Plain(&'static str);

    impl Endpoint for Plain {
        type Decoder = RawDecoder;

        fn url(&self) -> String {
            self.0.to_string()
        }
    }

    fn encoder() -> BodyEncoder {
        BodyEncoder::with_boundary("XyZ")
    }

    #[test]
    fn effective_post_format() {
        assert_eq!(Request::post().effective_post_format(), PostFormat::UrlEncoded);
        assert_eq!(
            Request::post().post_body("x", "text/plain").effective_post_format(),
            PostFormat::Raw
        );
        assert_eq!(
            Request::post()
                .file_data("hi", "file", "a.txt", "text/plain")
                .effective_post_format(),
            PostFormat::FormData
        );
        assert_eq!(
            Request::post()
                .post_format(PostFormat::UrlEncoded)
                .file_data("hi", "file", "a.txt", "text/plain")
                .effective_post_format(),
            PostFormat::UrlEncoded
        );
    }

    #[test]
    fn get_puts_everything_in_the_query() {
        let prepared = Request::get()
            .param("q", "rust http")
            .param("page", 2)
            .prepare_for(&Search, &encoder())
            .expect("prepare");

        assert_eq!(prepared.method(), Method::Get);
        assert!(prepared.body().is_none());
        assert!(prepared.header("Content-Type").is_none());
        assert_eq!(
            prepared.url().as_str(),
            "https://api.example.com/search?lang=en&format=json&page=2&q=rust+http&api_key=k+1"
        );
    }

    #[test]
    fn post_puts_only_extra_query_in_the_url() {
        let prepared = Request::post()
            .param("name", "bob")
            .prepare_for(&Search, &encoder())
            .expect("prepare");

        assert_eq!(
            prepared.url().as_str(),
            "https://api.example.com/search?lang=en&api_key=k+1"
        );
        assert_eq!(
            prepared.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            prepared.body().map(Bytes::as_ref),
            Some(b"format=json&name=bob".as_slice())
        );
    }

    #[test]
    fn url_without_parameters_is_untouched() {
        let prepared = Request::get()
            .prepare_for(&Plain("https://api.example.com/ping"), &encoder())
            .expect("prepare");

        assert_eq!(prepared.url().as_str(), "https://api.example.com/ping");
    }

    #[test]
    fn extra_parameters_override_caller() {
        let prepared = Request::post()
            .param("format", "xml")
            .prepare_for(&Search, &encoder())
            .expect("prepare");

        assert_eq!(
            prepared.body().map(Bytes::as_ref),
            Some(b"format=json".as_slice())
        );
    }

    #[test]
    fn empty_url_is_a_configuration_error() {
        let_assert!(Err(err) = Request::get().prepare_for(&Blank, &encoder()));
        check!(err.is_configuration());
    }

    #[test]
    fn unparsable_url_is_a_configuration_error() {
        let_assert!(Err(err) = Request::get().prepare_for(&Plain("not a url"), &encoder()));
        check!(err.is_configuration());
        check!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn raw_post_body() {
        let prepared = Request::post()
            .post_body(r#"{"id":1}"#, "application/json")
            .header("Content-Type", "text/plain")
            .header("Accept", "application/json")
            .prepare_for(&Plain("https://api.example.com/items"), &encoder())
            .expect("prepare");

        assert_eq!(prepared.header("Content-Type"), Some("application/json"));
        assert_eq!(prepared.header("Accept"), Some("application/json"));
        assert_eq!(
            prepared.body().map(Bytes::as_ref),
            Some(br#"{"id":1}"#.as_slice())
        );
    }

    #[test]
    fn caller_content_type_in_any_case_is_replaced() {
        let prepared = Request::post()
            .post_body("{}", "application/json")
            .header("content-type", "text/plain")
            .header("X-Trace", "1")
            .header("x-trace", "2")
            .prepare_for(&Plain("https://api.example.com/items"), &encoder())
            .expect("prepare");

        let content_types: Vec<_> = prepared
            .headers()
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .collect();
        check!(content_types.len() == 1);
        check!(prepared.header("content-type") == Some("application/json"));
        check!(prepared.header("X-TRACE") == Some("2"));
        check!(prepared.headers().len() == 2);
    }

    #[test]
    fn raw_without_body_fails() {
        let_assert!(
            Err(err) = Request::post()
                .post_format(PostFormat::Raw)
                .prepare_for(&Plain("https://api.example.com/items"), &encoder())
        );
        check!(err.is_configuration());
    }

    #[test]
    fn file_with_explicit_url_encoded_format_fails() {
        let_assert!(
            Err(err) = Request::post()
                .post_format(PostFormat::UrlEncoded)
                .file(FilePart::new("file", "a.txt", "text/plain", "hi"))
                .prepare_for(&Plain("https://api.example.com/upload"), &encoder())
        );
        check!(err.is_configuration());
    }

    #[test]
    fn bad_query_value_is_an_encoding_error() {
        let_assert!(
            Err(err) = Request::get()
                .param("ratio", f64::NAN)
                .prepare_for(&Plain("https://api.example.com/items"), &encoder())
        );
        check!(err.is_encoding());
    }

    #[test]
    fn prepared_builder_with_query() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let request = PreparedRequest::builder(Method::Get, url)
            .query("page", "1")
            .query("limit", "10")
            .build();

        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/users?page=1&limit=10"
        );
        assert!(!request.progress().is_enabled());
    }
}
