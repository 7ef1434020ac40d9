use crate::response::{Blob, FetchResponse, FormData, ResponseBody, ResponseType};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::convert::TryInto;

/// The blueprint for the response returned by a mocked fetch when a [`Mock`] matches a call.
///
/// The shorthands mirror what a test usually cares about: a bare number is a status,
/// a bare string (or JSON value) is a body.
///
/// ```rust
/// use fetchmock::ResponseTemplate;
///
/// let not_found: ResponseTemplate = 404.into();
/// let greeting: ResponseTemplate = "Hello world!".into();
/// let unauthorized = ResponseTemplate::new(401)
///     .set_status_text("Unauthorized")
///     .insert_header("x-test", "alpha")
///     .set_body("Oops!");
/// # let _ = (not_found, greeting, unauthorized);
/// ```
///
/// [`Mock`]: crate::Mock
#[derive(Clone, Debug)]
pub struct ResponseTemplate {
    status_code: StatusCode,
    status_text: Option<String>,
    headers: HeaderMap,
    body: Option<Value>,
}

// `fetchmock` is a crate meant for testing - failures are most likely not handled/temporary mistakes.
// Hence we prefer to panic and provide an easier API than to use `Result`s thus pushing
// the burden of "correctness" (and conversions) on the user.
impl ResponseTemplate {
    /// Start building a `ResponseTemplate` specifying the status code of the response.
    pub fn new<S>(s: S) -> Self
    where
        S: TryInto<StatusCode>,
        <S as TryInto<StatusCode>>::Error: std::fmt::Debug,
    {
        let status_code = s.try_into().expect("Failed to convert into status code.");
        Self {
            status_code,
            status_text: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// If left unset, the status text is `OK` for a 200 and empty for every other status.
    pub fn set_status_text<T: Into<String>>(mut self, status_text: T) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    /// Append a header `value` to list of headers with `key` as header name.
    pub fn append_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: std::fmt::Debug,
    {
        let key = key.try_into().expect("Failed to convert into header name.");
        let value = value
            .try_into()
            .expect("Failed to convert into header value.");
        self.headers.append(key, value);
        self
    }

    /// Insert a header `value` with `key` as header name, dropping previous values.
    ///
    /// Headers set on the template win over the computed `content-type` and `content-length`.
    pub fn insert_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: std::fmt::Debug,
    {
        let key = key.try_into().expect("Failed to convert into header name.");
        let value = value
            .try_into()
            .expect("Failed to convert into header value.");
        self.headers.insert(key, value);
        self
    }

    /// Set the response body. How it is encoded depends on the response type of the mock.
    pub fn set_body<B: Into<Value>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the response body from a serializable value.
    pub fn set_body_json<B: Serialize>(mut self, body: B) -> Self {
        let body = serde_json::to_value(&body).expect("Failed to convert into body.");
        self.body = Some(body);
        self
    }

    pub(crate) fn status_text(&self) -> &str {
        match &self.status_text {
            Some(text) => text,
            None if self.status_code == StatusCode::OK => "OK",
            None => "",
        }
    }

    /// Generate a response from the template, encoding the body as `response_type`.
    pub(crate) fn generate_response(&self, response_type: ResponseType) -> FetchResponse {
        let body = match self.body.as_ref().filter(|body| !body.is_null()) {
            Some(body) => encode_body(body, response_type),
            None => ResponseBody::Empty,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static(response_type.content_type()),
        );
        if body != ResponseBody::Empty {
            headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        // Explicit headers win over computed ones.
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }

        FetchResponse {
            status: self.status_code,
            status_text: self.status_text().to_owned(),
            headers,
            body,
        }
    }
}

impl Default for ResponseTemplate {
    fn default() -> Self {
        Self::new(200)
    }
}

impl From<u16> for ResponseTemplate {
    fn from(status: u16) -> Self {
        Self::new(status)
    }
}

impl From<StatusCode> for ResponseTemplate {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

impl From<&str> for ResponseTemplate {
    fn from(body: &str) -> Self {
        Self::default().set_body(body)
    }
}

impl From<String> for ResponseTemplate {
    fn from(body: String) -> Self {
        Self::default().set_body(body)
    }
}

impl From<Value> for ResponseTemplate {
    fn from(body: Value) -> Self {
        Self::default().set_body(body)
    }
}

fn encode_body(body: &Value, response_type: ResponseType) -> ResponseBody {
    match response_type {
        ResponseType::ArrayBuffer | ResponseType::Json => {
            ResponseBody::Bytes(stringify(body).into_bytes())
        }
        ResponseType::Blob => ResponseBody::Blob(Blob::new(stringify(body))),
        ResponseType::FormData => ResponseBody::Form(form_data(body)),
        ResponseType::Text => match body {
            Value::String(text) => ResponseBody::Bytes(text.clone().into_bytes()),
            other => ResponseBody::Bytes(stringify(other).into_bytes()),
        },
    }
}

fn stringify(body: &Value) -> String {
    serde_json::to_string(body).unwrap_or_else(|_| body.to_string())
}

/// `[["key", "value"], ...]` pairs and flat objects of strings become form entries, in order.
/// Anything else yields an empty form.
fn form_data(body: &Value) -> FormData {
    if let Some(entries) = body.as_array() {
        let pairs: Option<Vec<(&str, &str)>> = entries
            .iter()
            .map(|entry| match entry.as_array().map(Vec::as_slice) {
                Some([Value::String(key), Value::String(value)]) => {
                    Some((key.as_str(), value.as_str()))
                }
                _ => None,
            })
            .collect();
        return pairs.map(FormData::from_iter).unwrap_or_default();
    }
    if let Some(fields) = body.as_object() {
        let pairs: Option<Vec<(&str, &str)>> = fields
            .iter()
            .map(|(key, value)| value.as_str().map(|value| (key.as_str(), value)))
            .collect();
        return pairs.map(FormData::from_iter).unwrap_or_default();
    }
    FormData::default()
}
