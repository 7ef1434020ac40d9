use crate::Error;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;

/// How the body of a synthesized response is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    ArrayBuffer,
    Blob,
    FormData,
    #[default]
    Json,
    Text,
}

impl ResponseType {
    pub(crate) fn content_type(&self) -> &'static str {
        match self {
            ResponseType::ArrayBuffer | ResponseType::Blob => "application/octet-stream",
            ResponseType::FormData => "application/x-www-form-urlencoded",
            ResponseType::Json => "application/json",
            ResponseType::Text => "text/plain",
        }
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arraybuffer" => Ok(ResponseType::ArrayBuffer),
            "blob" => Ok(ResponseType::Blob),
            "formdata" => Ok(ResponseType::FormData),
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            other => Err(format!(
                "`{}` is not a response type - expected one of arraybuffer, blob, formdata, json, text",
                other
            )),
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseType::ArrayBuffer => "arraybuffer",
            ResponseType::Blob => "blob",
            ResponseType::FormData => "formdata",
            ResponseType::Json => "json",
            ResponseType::Text => "text",
        })
    }
}

/// Raw binary data with a content type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    bytes: Vec<u8>,
    content_type: String,
}

impl Blob {
    pub fn new<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: String::new(),
        }
    }

    pub fn with_content_type<T: Into<String>>(mut self, content_type: T) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Empty if the blob was built without a content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn text(&self) -> Result<String, Error> {
        Ok(String::from_utf8(self.bytes.clone())?)
    }
}

/// An ordered list of form entries. Keys may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.push((key.into(), value.into()));
    }

    /// The first value associated with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }

    pub(crate) fn from_urlencoded(bytes: &[u8]) -> Self {
        Self(
            url::form_urlencoded::parse(bytes)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResponseBody {
    Empty,
    Bytes(Vec<u8>),
    Blob(Blob),
    Form(FormData),
}

impl ResponseBody {
    pub(crate) fn len(&self) -> usize {
        match self {
            ResponseBody::Empty => 0,
            ResponseBody::Bytes(bytes) => bytes.len(),
            ResponseBody::Blob(blob) => blob.size(),
            ResponseBody::Form(form) => form.to_urlencoded().len(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            ResponseBody::Empty => vec![],
            ResponseBody::Bytes(bytes) => bytes.clone(),
            ResponseBody::Blob(blob) => blob.bytes().to_vec(),
            ResponseBody::Form(form) => form.to_urlencoded().into_bytes(),
        }
    }
}

/// The response handed back to the caller of a mocked fetch.
///
/// Like the response of fetch, the body can be read in whichever form is convenient -
/// as text, JSON, raw bytes, a [`Blob`] or [`FormData`] - regardless of how it was encoded.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub(crate) status: StatusCode,
    pub(crate) status_text: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: ResponseBody,
}

impl FetchResponse {
    /// Build a response by hand, e.g. in a [`Fetch`] implementation standing in for the network.
    ///
    /// [`Fetch`]: crate::Fetch
    pub fn new(status: StatusCode, headers: HeaderMap, body: Option<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body: body.map_or(ResponseBody::Empty, ResponseBody::Bytes),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// `true` for statuses in the 200-299 range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn text(&self) -> Result<String, Error> {
        Ok(String::from_utf8(self.body.to_bytes())?)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body.to_bytes())?)
    }

    pub fn array_buffer(&self) -> Vec<u8> {
        self.body.to_bytes()
    }

    pub fn blob(&self) -> Blob {
        match &self.body {
            ResponseBody::Blob(blob) => blob.clone(),
            body => {
                let content_type = self
                    .headers
                    .get(http::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                Blob::new(body.to_bytes()).with_content_type(content_type)
            }
        }
    }

    /// Form bodies, and url-encoded bodies declared as such by their content type, can be read
    /// as [`FormData`].
    pub fn form_data(&self) -> Result<FormData, Error> {
        if let ResponseBody::Form(form) = &self.body {
            return Ok(form.clone());
        }
        let is_urlencoded = self
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.starts_with("application/x-www-form-urlencoded"));
        if is_urlencoded {
            Ok(FormData::from_urlencoded(&self.body.to_bytes()))
        } else {
            Err(Error::FormData)
        }
    }
}
