//! Body encoding.
//!
//! [`BodyEncoder`] turns a method, a [`PostFormat`], the resolved body
//! parameters, an optional explicit [`Body`] and the file parts into the bytes
//! and `Content-Type` that go on the wire.
//!
//! | Method | Format | Body |
//! |--------|--------|------|
//! | `GET` | ignored | none, parameters go to the query string |
//! | `POST` | [`PostFormat::Raw`] | the explicit body, verbatim |
//! | `POST` | [`PostFormat::UrlEncoded`] | `key=value&...` |
//! | `POST` | [`PostFormat::FormData`] | `multipart/form-data` with text and file parts |

use bytes::Bytes;
use derive_more::Display;

use crate::{Error, FilePart, Form, Method, Params, Result};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain; charset=utf-8`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How `POST` body parameters are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PostFormat {
    /// Send an explicit body verbatim.
    #[display("raw")]
    Raw,
    /// `application/x-www-form-urlencoded`.
    #[display("url-encoded")]
    UrlEncoded,
    /// `multipart/form-data`, required for file uploads.
    #[display("form-data")]
    FormData,
}

/// A request body together with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    content_type: String,
    data: Bytes,
}

impl Body {
    /// Create a body with an explicit content type.
    #[must_use]
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Create a `text/plain` body.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into(), ContentType::PlainText.as_str())
    }

    /// Create an `application/octet-stream` body.
    #[must_use]
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::new(data, ContentType::OctetStream.as_str())
    }

    /// Create an `application/json` body from a serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if serialization fails.
    ///
    /// # Example
    ///
    /// ```
    /// use courier_core::Body;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct User { name: String }
    ///
    /// let body = Body::json(&User { name: "Alice".to_string() }).expect("serialize");
    /// assert_eq!(body.content_type(), "application/json");
    /// assert_eq!(body.data().as_ref(), br#"{"name":"Alice"}"#);
    /// ```
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        let data = serde_json::to_vec(value).map_err(|e| Error::encoding(e.to_string()))?;
        Ok(Self::new(data, ContentType::Json.as_str()))
    }

    /// The `Content-Type` header value.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The body bytes.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume into (content type, bytes).
    #[must_use]
    pub fn into_parts(self) -> (String, Bytes) {
        (self.content_type, self.data)
    }
}

/// Serialize parameters as a form URL-encoded body.
///
/// Keys are emitted in order; list values repeat their key.
///
/// # Errors
///
/// Returns [`Error::Encoding`] if a value cannot be stringified.
///
/// # Example
///
/// ```
/// use courier_core::{Params, to_form};
///
/// let params = Params::new().with("username", "alice").with("password", "s3cr&t");
/// let bytes = to_form(&params).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"password=s3cr%26t&username=alice");
/// ```
pub fn to_form(params: &Params) -> Result<Bytes> {
    to_query_string(params).map(|s| Bytes::from(s.into_bytes()))
}

/// Serialize parameters as a query string (without the leading `?`).
///
/// # Errors
///
/// Returns [`Error::Encoding`] if a value cannot be stringified.
pub fn to_query_string(params: &Params) -> Result<String> {
    let pairs = params.to_pairs()?;
    serde_html_form::to_string(&pairs).map_err(|e| Error::encoding(e.to_string()))
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns [`Error::JsonDeserialization`] with the path to the field that
/// failed (e.g. `user.address.city`).
///
/// # Example
///
/// ```
/// use courier_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_json(br#"{"name":"Alice"}"#).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

// ============================================================================
// Body Encoder
// ============================================================================

/// Produces the request body for a method and format.
///
/// The multipart boundary is random by default; fix it with
/// [`BodyEncoder::with_boundary`] for reproducible output.
#[derive(Debug, Clone, Default)]
pub struct BodyEncoder {
    boundary: Option<String>,
}

impl BodyEncoder {
    /// Create an encoder with random multipart boundaries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder that always uses the given multipart boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: Some(boundary.into()),
        }
    }

    /// Encode the body.
    ///
    /// Returns `None` for `GET`, which never has a body.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] when the inputs contradict the format:
    ///   raw without an explicit body, an explicit body with a non-raw format,
    ///   file parts with a format other than form-data, a body or files on `GET`,
    ///   a file content type containing control characters.
    /// - [`Error::Encoding`] when a parameter value cannot be stringified.
    pub fn encode(
        &self,
        method: Method,
        format: PostFormat,
        params: &Params,
        explicit: Option<&Body>,
        files: &[FilePart],
    ) -> Result<Option<Body>> {
        if method == Method::Get {
            if explicit.is_some() {
                return Err(Error::configuration("GET requests cannot carry a body"));
            }
            if !files.is_empty() {
                return Err(Error::configuration("GET requests cannot carry file parts"));
            }
            return Ok(None);
        }

        if !files.is_empty() && format != PostFormat::FormData {
            return Err(Error::configuration(format!(
                "file parts require the form-data format, not {format}"
            )));
        }
        if explicit.is_some() && format != PostFormat::Raw {
            return Err(Error::configuration(format!(
                "an explicit body requires the raw format, not {format}"
            )));
        }

        let body = match format {
            PostFormat::Raw => explicit
                .cloned()
                .ok_or_else(|| Error::configuration("raw format requires an explicit body"))?,
            PostFormat::UrlEncoded => Body::new(to_form(params)?, ContentType::FormUrlEncoded.as_str()),
            PostFormat::FormData => {
                let mut form = self
                    .boundary
                    .as_ref()
                    .map_or_else(Form::new, Form::with_boundary);
                for (key, value) in params {
                    for text in value
                        .to_param_strings()
                        .map_err(|e| Error::encoding(format!("parameter `{key}`: {e}")))?
                    {
                        form = form.text(key.clone(), text);
                    }
                }
                for file in files {
                    if file.content_type().chars().any(char::is_control) {
                        return Err(Error::configuration(format!(
                            "file `{}` has a content type with control characters",
                            file.filename()
                        )));
                    }
                    form = form.part(file.clone().into());
                }
                let (content_type, data) = form.into_body();
                Body::new(data, content_type)
            }
        };

        Ok(Some(body))
    }
}

/// Encode a body with a random multipart boundary.
///
/// See [`BodyEncoder::encode`].
///
/// # Errors
///
/// See [`BodyEncoder::encode`].
pub fn encode_body(
    method: Method,
    format: PostFormat,
    params: &Params,
    explicit: Option<&Body>,
    files: &[FilePart],
) -> Result<Option<Body>> {
    BodyEncoder::new().encode(method, format, params, explicit, files)
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn text_of(body: &Body) -> String {
        String::from_utf8_lossy(body.data()).into_owned()
    }

    #[test]
    fn content_type_as_str() {
        assert_eq!(ContentType::Json.as_str(), "application/json");
        assert_eq!(
            ContentType::FormUrlEncoded.as_str(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(ContentType::PlainText.as_str(), "text/plain; charset=utf-8");
        assert_eq!(
            ContentType::OctetStream.as_str(),
            "application/octet-stream"
        );
    }

    #[test]
    fn post_format_display() {
        assert_eq!(PostFormat::Raw.to_string(), "raw");
        assert_eq!(PostFormat::UrlEncoded.to_string(), "url-encoded");
        assert_eq!(PostFormat::FormData.to_string(), "form-data");
    }

    #[test]
    fn to_form_percent_encodes() {
        let params = Params::new()
            .with("q", "rust & http")
            .with("emoji", "é/ü")
            .with("n", 1);

        let bytes = to_form(&params).expect("serialize");
        assert_eq!(
            bytes.as_ref(),
            b"emoji=%C3%A9%2F%C3%BC&n=1&q=rust+%26+http".as_slice()
        );
    }

    #[test]
    fn to_form_round_trip() {
        let params = Params::new()
            .with("name", "Bob O'Brien")
            .with("note", "a=b&c=d")
            .with("ratio", 0.25)
            .with("active", true)
            .with("tags", vec!["x y", "z+"]);

        let bytes = to_form(&params).expect("serialize");
        let decoded: Vec<(String, String)> = url::form_urlencoded::parse(&bytes)
            .into_owned()
            .collect();

        assert_eq!(decoded, params.to_pairs().expect("pairs"));
    }

    #[test]
    fn to_query_string_empty() {
        assert_eq!(to_query_string(&Params::new()).expect("serialize"), "");
    }

    #[test]
    fn get_never_has_a_body() {
        let params = Params::new().with("q", "rust");
        for format in [PostFormat::Raw, PostFormat::UrlEncoded, PostFormat::FormData] {
            let body = encode_body(Method::Get, format, &params, None, &[]).expect("encode");
            assert!(body.is_none(), "GET produced a body with {format}");
        }
    }

    #[test]
    fn get_rejects_body_and_files() {
        let body = Body::text("hello");
        let_assert!(
            Err(err) = encode_body(Method::Get, PostFormat::Raw, &Params::new(), Some(&body), &[])
        );
        check!(err.is_configuration());

        let file = FilePart::new("file", "a.txt", "text/plain", "hi");
        let_assert!(
            Err(err) = encode_body(Method::Get, PostFormat::FormData, &Params::new(), None, &[file])
        );
        check!(err.is_configuration());
    }

    #[test]
    fn raw_returns_explicit_body_verbatim() {
        let explicit = Body::new(vec![0_u8, 159, 146, 150], "application/x-custom");
        let body = encode_body(
            Method::Post,
            PostFormat::Raw,
            &Params::new().with("ignored", 1),
            Some(&explicit),
            &[],
        )
        .expect("encode")
        .expect("body");

        assert_eq!(body, explicit);
    }

    #[test]
    fn raw_without_body_is_a_configuration_error() {
        let_assert!(
            Err(err) = encode_body(Method::Post, PostFormat::Raw, &Params::new(), None, &[])
        );
        check!(err.is_configuration());
        check!(err.to_string().contains("explicit body"));
    }

    #[test]
    fn explicit_body_with_other_format_is_a_configuration_error() {
        let explicit = Body::text("hello");
        let_assert!(
            Err(err) = encode_body(
                Method::Post,
                PostFormat::UrlEncoded,
                &Params::new(),
                Some(&explicit),
                &[]
            )
        );
        check!(err.is_configuration());
    }

    #[test]
    fn files_with_url_encoded_format_is_a_configuration_error() {
        let file = FilePart::new("file", "a.txt", "text/plain", "hi");
        let_assert!(
            Err(err) = encode_body(
                Method::Post,
                PostFormat::UrlEncoded,
                &Params::new(),
                None,
                &[file]
            )
        );
        check!(err.is_configuration());
        check!(err.to_string().contains("form-data"));
    }

    #[test]
    fn file_content_type_with_line_break_is_rejected() {
        let file = FilePart::new("file", "a.txt", "text/plain\r\n\r\n--XyZ--", "hi");
        let_assert!(
            Err(err) = BodyEncoder::with_boundary("XyZ").encode(
                Method::Post,
                PostFormat::FormData,
                &Params::new(),
                None,
                &[file]
            )
        );
        check!(err.is_configuration());
        check!(err.to_string().contains("a.txt"));
    }

    #[test]
    fn url_encoded_body() {
        let params = Params::new().with("name", "bob").with("age", 42);
        let body = encode_body(Method::Post, PostFormat::UrlEncoded, &params, None, &[])
            .expect("encode")
            .expect("body");

        assert_eq!(body.content_type(), "application/x-www-form-urlencoded");
        assert_eq!(text_of(&body), "age=42&name=bob");
    }

    #[test]
    fn url_encoded_body_reports_bad_values() {
        let params = Params::new().with("ratio", f64::NAN);
        let_assert!(
            Err(err) = encode_body(Method::Post, PostFormat::UrlEncoded, &params, None, &[])
        );
        check!(err.is_encoding());
    }

    #[test]
    fn form_data_with_text_and_file() {
        let params = Params::new().with("name", "bob");
        let file = FilePart::new("file", "a.txt", "text/plain", "hi");

        let body = BodyEncoder::with_boundary("XyZ")
            .encode(Method::Post, PostFormat::FormData, &params, None, &[file])
            .expect("encode")
            .expect("body");

        assert_eq!(body.content_type(), "multipart/form-data; boundary=XyZ");
        assert_eq!(
            text_of(&body),
            "--XyZ\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\
             \r\n\
             bob\r\n\
             --XyZ\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             hi\r\n\
             --XyZ--\r\n"
        );
    }

    #[test]
    fn form_data_random_boundary_is_declared() {
        let params = Params::new().with("name", "bob");
        let body = encode_body(Method::Post, PostFormat::FormData, &params, None, &[])
            .expect("encode")
            .expect("body");

        let boundary = body
            .content_type()
            .strip_prefix("multipart/form-data; boundary=")
            .expect("multipart content type");
        let text = text_of(&body);
        assert!(text.starts_with(&format!("--{boundary}\r\n")));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn form_data_empty_is_just_the_closing_boundary() {
        let body = BodyEncoder::with_boundary("empty")
            .encode(Method::Post, PostFormat::FormData, &Params::new(), None, &[])
            .expect("encode")
            .expect("body");

        assert_eq!(text_of(&body), "--empty--\r\n");
    }

    #[test]
    fn form_data_list_values_become_repeated_parts() {
        let params = Params::new().with("tag", vec!["a", "b"]);
        let body = BodyEncoder::with_boundary("b")
            .encode(Method::Post, PostFormat::FormData, &params, None, &[])
            .expect("encode")
            .expect("body");

        assert_eq!(
            text_of(&body).matches("name=\"tag\"").count(),
            2,
            "expected one part per list item"
        );
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let result: Result<User> = from_json(br#"{"address":{}}"#);

        let_assert!(Err(err) = result);
        check!(err.is_decode());
        let msg = err.to_string();
        assert!(msg.contains("address"), "Expected path 'address' in error: {msg}");
        assert!(msg.contains("city"), "Expected field 'city' mentioned in error: {msg}");
    }
}
