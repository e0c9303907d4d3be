//! Multipart form data support for file uploads.
//!
//! [`Form`] assembles text fields and [`FilePart`] attachments into a
//! `multipart/form-data` body.
//!
//! # Example
//!
//! ```
//! use courier_core::{FilePart, Form};
//!
//! let form = Form::with_boundary("XyZ")
//!     .text("name", "bob")
//!     .part(FilePart::new("file", "a.txt", "text/plain", "hi").into());
//!
//! let (content_type, body) = form.into_body();
//! assert_eq!(content_type, "multipart/form-data; boundary=XyZ");
//! assert!(body.ends_with(b"--XyZ--\r\n"));
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// A file attachment: field name, filename, content type and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    key: String,
    filename: String,
    content_type: String,
    data: Bytes,
}

impl FilePart {
    /// Create a file part with a declared content type.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Create a file part, guessing the content type from the filename.
    ///
    /// Unknown extensions fall back to `application/octet-stream`.
    #[must_use]
    pub fn guessed(
        key: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self::new(key, filename, content_type, data)
    }

    /// The form field name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The filename sent to the server.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The declared content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The file payload.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }
}

impl From<FilePart> for Part {
    fn from(file: FilePart) -> Self {
        Self::new(file.key, file.data)
            .with_filename(file.filename)
            .with_content_type(file.content_type)
    }
}

/// A single part in a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a new part with the given name and data.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Create a text field part.
    ///
    /// Text fields carry no `Content-Type` line; receivers treat them as
    /// plain text.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value.into())
    }

    /// Set the filename for this part.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Get the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get the part data.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Guess the content type from a filename extension.
fn guess_content_type(filename: &str) -> String {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// A multipart form containing multiple parts, in insertion order.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a random boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a new form with a custom boundary.
    ///
    /// The boundary should be a unique string that doesn't appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part to the form.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a text field to the form.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Add a file to the form.
    #[must_use]
    pub fn file(self, file: FilePart) -> Self {
        self.part(file.into())
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the parts in this form.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get the Content-Type header value for this form.
    ///
    /// Returns `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Convert the form into a body.
    ///
    /// Returns a tuple of (content-type header value, body bytes).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let content_type = self.content_type();
        let body = self.encode();
        (content_type, body)
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            put_quoted(&mut buf, &part.name);
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                put_quoted(&mut buf, filename);
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                put_header_value(&mut buf, content_type);
                buf.put_slice(b"\r\n");
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

/// Write a quoted-string value, escaping `"`, CR and LF (RFC 7578 §4.2).
fn put_quoted(buf: &mut BytesMut, value: &str) {
    for byte in value.bytes() {
        match byte {
            b'"' => buf.put_slice(b"%22"),
            b'\r' => buf.put_slice(b"%0D"),
            b'\n' => buf.put_slice(b"%0A"),
            other => buf.put_u8(other),
        }
    }
}

/// Write a header value with ASCII control bytes removed.
fn put_header_value(buf: &mut BytesMut, value: &str) {
    for byte in value.bytes().filter(|byte| !byte.is_ascii_control()) {
        buf.put_u8(byte);
    }
}

fn generate_boundary() -> String {
    format!("----CourierBoundary{}", uuid::Uuid::new_v4().simple())
}
