use std::collections::BTreeMap;
use std::fmt;

use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

pub const BODY_PRINT_LIMIT: usize = 10_000;

/// Specifies limitations on printing request bodies when logging requests. For some test
/// suites the bodies may be too large to reasonably print and it may be desirable to limit them.
#[derive(Debug, Copy, Clone)]
pub enum BodyPrintLimit {
    /// Maximum length of a body to print in bytes.
    Limited(usize),
    /// There is no limit to the size of a body that may be printed.
    Unlimited,
}

/// The resource a fetch call targets: the first argument of `fetch`.
#[derive(Debug, Clone)]
pub enum RequestInfo {
    /// A parsed URL. Its serialized absolute form is used for matching.
    Url(Url),
    /// A request object. Only the URI it carries is used for matching; method, headers
    /// and body are taken from the accompanying [`RequestInit`].
    Request(http::Request<Vec<u8>>),
    /// A plain string, used verbatim - e.g. `/alpha` or `https://example.com/alpha`.
    Str(String),
}

impl From<&str> for RequestInfo {
    fn from(url: &str) -> Self {
        RequestInfo::Str(url.to_owned())
    }
}

impl From<String> for RequestInfo {
    fn from(url: String) -> Self {
        RequestInfo::Str(url)
    }
}

impl From<&String> for RequestInfo {
    fn from(url: &String) -> Self {
        RequestInfo::Str(url.clone())
    }
}

impl From<Url> for RequestInfo {
    fn from(url: Url) -> Self {
        RequestInfo::Url(url)
    }
}

impl From<http::Request<Vec<u8>>> for RequestInfo {
    fn from(request: http::Request<Vec<u8>>) -> Self {
        RequestInfo::Request(request)
    }
}

/// The headers of a fetch call, in any of the shapes fetch accepts.
#[derive(Debug, Clone)]
pub enum HeadersInit {
    Map(HeaderMap),
    Pairs(Vec<(String, String)>),
    Record(BTreeMap<String, String>),
}

impl From<HeaderMap> for HeadersInit {
    fn from(headers: HeaderMap) -> Self {
        HeadersInit::Map(headers)
    }
}

impl From<Vec<(String, String)>> for HeadersInit {
    fn from(headers: Vec<(String, String)>) -> Self {
        HeadersInit::Pairs(headers)
    }
}

impl From<BTreeMap<String, String>> for HeadersInit {
    fn from(headers: BTreeMap<String, String>) -> Self {
        HeadersInit::Record(headers)
    }
}

/// The raw body of a fetch call.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl From<&str> for RequestBody {
    fn from(body: &str) -> Self {
        RequestBody::Text(body.to_owned())
    }
}

impl From<String> for RequestBody {
    fn from(body: String) -> Self {
        RequestBody::Text(body)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(body: Vec<u8>) -> Self {
        RequestBody::Bytes(body)
    }
}

impl From<Value> for RequestBody {
    fn from(body: Value) -> Self {
        RequestBody::Json(body)
    }
}

/// The options bag of a fetch call: the second argument of `fetch`.
///
/// ```rust
/// use fetchmock::RequestInit;
///
/// let init = RequestInit::new()
///     .method("POST")
///     .header("Content-Type", "application/json")
///     .body(r#"{"bravo":"charlie"}"#);
/// assert_eq!(init.method.as_deref(), Some("POST"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub method: Option<String>,
    pub headers: Option<HeadersInit>,
    pub body: Option<RequestBody>,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<T: Into<String>>(mut self, method: T) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Append a header to the list of headers of this call.
    ///
    /// If headers were previously set with [`RequestInit::headers`] they are converted to
    /// name-value pairs first.
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        let mut pairs = match self.headers.take() {
            None => vec![],
            Some(HeadersInit::Pairs(pairs)) => pairs,
            Some(HeadersInit::Record(record)) => record.into_iter().collect(),
            Some(HeadersInit::Map(map)) => map
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_owned(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
        };
        pairs.push((key.into(), value.into()));
        self.headers = Some(HeadersInit::Pairs(pairs));
        self
    }

    pub fn headers<H: Into<HeadersInit>>(mut self, headers: H) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn body<B: Into<RequestBody>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// The body of a [`Request`], after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A structured body, or a string body that parsed as JSON.
    Json(Value),
    /// A string body that is not valid JSON.
    Text(String),
    /// A binary payload, passed through untouched.
    Bytes(Vec<u8>),
}

/// A fetch call in canonical form, as seen by matchers.
///
/// ### Implementation notes:
/// fetch accepts its arguments in many shapes (a URL, a request object or a string, plus an
/// optional options bag whose headers and body come in several flavours).
/// Matchers should not have to care: we perform the normalization once, when the call is
/// dispatched, and pass an immutable reference to the result to every structured matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    /// Always lowercase.
    pub method: String,
    /// Header names are always lowercase.
    pub headers: BTreeMap<String, String>,
    pub body: Option<Body>,
}

impl Request {
    pub fn normalize(input: &RequestInfo, init: Option<&RequestInit>) -> Request {
        Self {
            url: normalize_url(input),
            method: normalize_method(init),
            headers: normalize_headers(init.and_then(|init| init.headers.as_ref())),
            body: init
                .and_then(|init| init.body.as_ref())
                .map(normalize_body),
        }
    }

    /// Deserialize the body of the request, if it is structured.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            Some(Body::Json(value)) => T::deserialize(value),
            Some(Body::Text(text)) => serde_json::from_str(text),
            Some(Body::Bytes(bytes)) => serde_json::from_slice(bytes),
            None => T::deserialize(&Value::Null),
        }
    }

    pub(crate) fn print_with_limit(
        &self,
        mut buffer: impl fmt::Write,
        body_print_limit: BodyPrintLimit,
    ) -> fmt::Result {
        writeln!(buffer, "{} {}", self.method.to_ascii_uppercase(), self.url)?;
        for (name, value) in &self.headers {
            writeln!(buffer, "{}: {}", name, value)?;
        }

        let body = match &self.body {
            None => return Ok(()),
            Some(Body::Json(value)) => value.to_string().into_bytes(),
            Some(Body::Text(text)) => text.clone().into_bytes(),
            Some(Body::Bytes(bytes)) => bytes.clone(),
        };

        match body_print_limit {
            BodyPrintLimit::Limited(limit) if body.len() > limit => {
                // Walk forward from the limit until we land on a char boundary.
                for end_byte in limit..=(limit + 3).min(body.len()) {
                    if let Ok(truncated) = std::str::from_utf8(&body[..end_byte]) {
                        writeln!(buffer, "{}", truncated)?;
                        return writeln!(
                            buffer,
                            "We truncated the body because it was too large: {} bytes (limit: {} bytes)\n\
                             Increase this limit by setting `FETCHMOCK_BODY_PRINT_LIMIT`, or calling `FetchMockBuilder::body_print_limit`",
                            body.len(),
                            limit
                        );
                    }
                }
                writeln!(
                    buffer,
                    "Body is likely binary (invalid utf-8) size is {} bytes",
                    body.len()
                )
            }
            _ => {
                if let Ok(body) = std::str::from_utf8(&body) {
                    writeln!(buffer, "{}", body)
                } else {
                    writeln!(
                        buffer,
                        "Body is likely binary (invalid utf-8) size is {} bytes",
                        body.len()
                    )
                }
            }
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_with_limit(f, BodyPrintLimit::Limited(BODY_PRINT_LIMIT))
    }
}

fn normalize_url(input: &RequestInfo) -> String {
    match input {
        RequestInfo::Url(url) => url.as_str().to_owned(),
        RequestInfo::Request(request) => request.uri().to_string(),
        RequestInfo::Str(url) => url.clone(),
    }
}

fn normalize_method(init: Option<&RequestInit>) -> String {
    init.and_then(|init| init.method.as_deref())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "get".to_owned())
}

fn normalize_headers(headers: Option<&HeadersInit>) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    match headers {
        None => {}
        Some(HeadersInit::Map(map)) => {
            for (name, value) in map {
                normalized.insert(
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                );
            }
        }
        Some(HeadersInit::Pairs(pairs)) => {
            for (name, value) in pairs {
                normalized.insert(name.to_lowercase(), value.clone());
            }
        }
        Some(HeadersInit::Record(record)) => {
            for (name, value) in record {
                normalized.insert(name.to_lowercase(), value.clone());
            }
        }
    }
    normalized
}

/// String bodies are parsed as JSON when possible; plain-text bodies are a perfectly valid
/// case and are kept as they are.
fn normalize_body(body: &RequestBody) -> Body {
    match body {
        RequestBody::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => Body::Json(value),
            Err(_) => Body::Text(text.clone()),
        },
        RequestBody::Json(value) => Body::Json(value.clone()),
        RequestBody::Bytes(bytes) => Body::Bytes(bytes.clone()),
    }
}
