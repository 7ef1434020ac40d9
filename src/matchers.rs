//! The building blocks to describe which fetch calls a mock applies to.
//!
//! A [`Matcher`] is either a [`RequestMatcher`] - a declarative description of the url, method,
//! headers and body of a call - or a plain function over the raw fetch arguments.
//!
//! The leaves of a [`RequestMatcher`] are [`Pattern`]s:
//! - a string is compared for equality, unless it is a wildcard (`*`, `*suffix`, `prefix*`)
//!   or has the shape of a regular expression literal (`/alpha$/i`);
//! - a [`Regex`] must accept the value;
//! - numbers and booleans are compared for equality;
//! - a [`predicate`] is called with the value;
//! - arrays and objects are matched structurally, objects being matched as a subset.
//!
//! ```rust
//! use fetchmock::matchers::{body, predicate, url, Pattern};
//! use regex::Regex;
//! use serde_json::json;
//!
//! let matcher = url("*/orders")
//!     .method("POST")
//!     .header("Authorization", Regex::new("^Bearer ").unwrap())
//!     .and_body(Pattern::object([
//!         ("customer", Pattern::from(json!({ "id": 7 }))),
//!         ("total", predicate(|total| total.as_f64().map_or(false, |t| t > 10.0))),
//!     ]));
//! # let _ = (matcher, body(json!({})));
//! ```
use crate::request::{RequestInfo, RequestInit};
use regex::Regex;
use serde_json::Value;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

pub(crate) type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub(crate) type MatchFn = Arc<dyn Fn(&RequestInfo, Option<&RequestInit>) -> bool + Send + Sync>;

/// A matcher leaf: what a single value of the canonical request should look like.
#[derive(Clone)]
pub enum Pattern {
    Value(Value),
    Regex(Regex),
    Predicate(PredicateFn),
    Array(Vec<Pattern>),
    Object(Vec<(String, Pattern)>),
}

impl Pattern {
    /// Build an array pattern out of patterns of any kind.
    pub fn array<I, P>(items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Pattern>,
    {
        Pattern::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build an object pattern out of `(key, pattern)` pairs.
    ///
    /// Objects are matched as a subset: the value must contain every key listed here, any
    /// other key it has is ignored.
    pub fn object<I, K, P>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<Pattern>,
    {
        Pattern::Object(
            fields
                .into_iter()
                .map(|(key, pattern)| (key.into(), pattern.into()))
                .collect(),
        )
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Value(value) => write!(f, "{}", value),
            Pattern::Regex(regex) => write!(f, "/{}/", regex.as_str()),
            Pattern::Predicate(_) => f.write_str("<predicate>"),
            Pattern::Array(items) => f.debug_list().entries(items).finish(),
            Pattern::Object(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k, v)))
                .finish(),
        }
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Pattern::Value(value)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Pattern::Regex(regex)
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Pattern::Value(Value::String(value.to_owned()))
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Pattern::Value(Value::String(value))
    }
}

macro_rules! impl_from_for_pattern {
    ($($type_name:ty),*) => {
        $(
            impl From<$type_name> for Pattern {
                fn from(value: $type_name) -> Self {
                    Pattern::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_from_for_pattern!(bool, i32, i64, u32, u64, f64);

fn lowercase_string_leaf(pattern: Pattern) -> Pattern {
    match pattern {
        Pattern::Value(Value::String(s)) => Pattern::Value(Value::String(s.to_ascii_lowercase())),
        other => other,
    }
}

/// A pattern that accepts a value if `f` returns `true` for it.
///
/// A field missing from the request is handed to `f` as [`Value::Null`].
///
/// `f` runs outside of the registry lock of the session: it may inspect the
/// [`FetchMock`](crate::FetchMock) (e.g. `active_mocks`), and a panic in `f` only fails the call
/// being matched.
pub fn predicate<F>(f: F) -> Pattern
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Pattern::Predicate(Arc::new(f))
}

/// Describe the url, method, headers and body of the fetch calls a mock should intercept.
///
/// Every part is optional: parts left unspecified accept any request.
#[derive(Clone, Debug, Default)]
pub struct RequestMatcher {
    pub(crate) url: Option<Pattern>,
    pub(crate) method: Option<Pattern>,
    pub(crate) headers: Vec<(String, Pattern)>,
    pub(crate) body: Option<Pattern>,
}

impl RequestMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url<P: Into<Pattern>>(mut self, url: P) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The method is matched like any other leaf, so wildcards and regular expressions work
    /// too (`"*"`, `"p*"`, `"/^p(ut|atch)$/"`).
    ///
    /// String leaves are lowercased, as is the method of the request: `"POST"` and `"post"`
    /// are the same matcher. A [`Regex`] or a [`predicate`] sees the lowercased method.
    pub fn method<P: Into<Pattern>>(mut self, method: P) -> Self {
        self.method = Some(lowercase_string_leaf(method.into()));
        self
    }

    /// Only the headers named in the matcher are checked: any other header in the request is
    /// ignored. Header names are case-insensitive.
    pub fn header<K: AsRef<str>, P: Into<Pattern>>(mut self, name: K, value: P) -> Self {
        self.headers
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn and_body<P: Into<Pattern>>(mut self, body: P) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Start a [`RequestMatcher`] on the url of the request.
pub fn url<P: Into<Pattern>>(url: P) -> RequestMatcher {
    RequestMatcher::new().url(url)
}

/// Start a [`RequestMatcher`] on the method of the request.
pub fn method<P: Into<Pattern>>(method: P) -> RequestMatcher {
    RequestMatcher::new().method(method)
}

/// Start a [`RequestMatcher`] on a header of the request.
pub fn header<K: AsRef<str>, P: Into<Pattern>>(name: K, value: P) -> RequestMatcher {
    RequestMatcher::new().header(name, value)
}

/// Start a [`RequestMatcher`] on the body of the request.
pub fn body<P: Into<Pattern>>(body: P) -> RequestMatcher {
    RequestMatcher::new().and_body(body)
}

/// A [`Matcher`] that hands the raw fetch arguments to `f`.
///
/// `f` sees the call exactly as it was made - nothing is normalized.
///
/// As for [`predicate`], `f` runs outside of the registry lock: it may call back into the
/// [`FetchMock`](crate::FetchMock).
///
/// ```rust
/// use fetchmock::matchers::function;
/// use fetchmock::RequestInfo;
///
/// let matcher = function(|input, _init| matches!(input, RequestInfo::Url(_)));
/// # let _ = matcher;
/// ```
pub fn function<F>(f: F) -> Matcher
where
    F: Fn(&RequestInfo, Option<&RequestInit>) -> bool + Send + Sync + 'static,
{
    Matcher::Function(Arc::new(f))
}

/// Which fetch calls a mock applies to.
///
/// Strings and regular expressions are shorthands for a [`RequestMatcher`] on the url.
#[derive(Clone)]
pub enum Matcher {
    Request(RequestMatcher),
    Function(MatchFn),
}

impl Matcher {
    /// Pin the method of a structured matcher, overriding the one it might already have.
    /// Function matchers are returned unchanged.
    pub(crate) fn with_method(self, method: &str) -> Self {
        match self {
            Matcher::Request(matcher) => Matcher::Request(matcher.method(method)),
            Matcher::Function(f) => Matcher::Function(f),
        }
    }
}

impl Debug for Matcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Request(matcher) => matcher.fmt(f),
            Matcher::Function(_) => f.write_str("Matcher::Function(<fn>)"),
        }
    }
}

impl From<RequestMatcher> for Matcher {
    fn from(matcher: RequestMatcher) -> Self {
        Matcher::Request(matcher)
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::Request(url(value))
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::Request(url(value))
    }
}

impl From<Regex> for Matcher {
    fn from(value: Regex) -> Self {
        Matcher::Request(url(value))
    }
}
