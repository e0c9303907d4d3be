//! HTTP method types.

use derive_more::Display;

/// HTTP request method.
///
/// Only the two methods with distinct parameter placement are supported:
/// `GET` carries every parameter in the query string, `POST` carries body
/// parameters in an encoded body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method - parameters travel in the URL.
    #[default]
    #[display("GET")]
    Get,
    /// POST method - parameters travel in the body.
    #[display("POST")]
    Post,
}

impl Method {
    /// Returns `true` if requests with this method carry a body.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        matches!(self, Self::Post)
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
        }
    }
}

impl TryFrom<http::Method> for Method {
    type Error = crate::Error;

    fn try_from(method: http::Method) -> Result<Self, Self::Error> {
        match method {
            http::Method::GET => Ok(Self::Get),
            http::Method::POST => Ok(Self::Post),
            other => Err(crate::Error::configuration(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}
