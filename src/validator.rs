//! Compilation of declarative matchers into validators over canonical requests.
//!
//! Matchers are compiled once, when a mock is registered, into a tree of [`Validator`]s: matching
//! a request then boils down to walking the tree, without probing the shape of the matcher again.
use crate::matchers::{MatchFn, Matcher, Pattern, PredicateFn, RequestMatcher};
use crate::request::{Body, Request, RequestInfo, RequestInit};
use log::warn;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::fmt::{self, Debug, Formatter};

/// `/source/flags`, the shape of a regular expression literal.
static REGEX_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(.+)/([dgimsuvy]*)$").expect("Invalid regex literal pattern"));

/// How arrays in a matcher whose entries are all of the same kind are compared with the
/// arrays of a request.
///
/// Arrays mixing entries of different kinds are always compared position by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayMatching {
    /// The request array must have the same length as the matcher array and each element
    /// must match the entry at the same position.
    #[default]
    Elementwise,
    /// The matcher array describes the type of the elements: every element of the request
    /// array, whatever its length, must match the first entry of the matcher array.
    Uniform,
}

#[derive(Debug, Clone)]
pub(crate) enum Wildcard {
    Any,
    Prefix(String),
    Suffix(String),
}

impl Wildcard {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Wildcard::Any => true,
            Wildcard::Prefix(prefix) => value.starts_with(prefix.as_str()),
            Wildcard::Suffix(suffix) => value.ends_with(suffix.as_str()),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Validator {
    /// Accepts everything, missing values included.
    Any,
    Literal(Value),
    Wildcard(Wildcard),
    Regex(Regex),
    Predicate(PredicateFn),
    /// Every element must match the same validator.
    Sequence(Box<Validator>),
    /// Same length, and every element matches the validator at its position.
    Tuple(Vec<Validator>),
    /// Every listed field is present and matches; other fields are ignored.
    Object(Vec<(String, Validator)>),
}

impl Debug for Validator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Any => f.write_str("Any"),
            Validator::Literal(value) => write!(f, "Literal({})", value),
            Validator::Wildcard(wildcard) => write!(f, "Wildcard({:?})", wildcard),
            Validator::Regex(regex) => write!(f, "Regex(/{}/)", regex.as_str()),
            Validator::Predicate(_) => f.write_str("Predicate"),
            Validator::Sequence(item) => f.debug_tuple("Sequence").field(item).finish(),
            Validator::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            Validator::Object(fields) => f.debug_tuple("Object").field(fields).finish(),
        }
    }
}

impl Validator {
    pub(crate) fn compile(pattern: &Pattern, policy: ArrayMatching) -> Self {
        match pattern {
            Pattern::Value(value) => compile_value(value, policy),
            Pattern::Regex(regex) => Validator::Regex(regex.clone()),
            Pattern::Predicate(f) => Validator::Predicate(f.clone()),
            Pattern::Array(items) => {
                let kinds: Vec<Kind> = items.iter().map(Kind::of_pattern).collect();
                compile_array(items, &kinds, policy, Validator::compile)
            }
            Pattern::Object(fields) => Validator::Object(
                fields
                    .iter()
                    .map(|(key, pattern)| (key.clone(), Validator::compile(pattern, policy)))
                    .collect(),
            ),
        }
    }

    /// Validate a value that might be missing from the request.
    ///
    /// Only `Any` accepts a missing value on its own; predicates are asked with `null`.
    pub(crate) fn validate_opt(&self, value: Option<&Value>) -> bool {
        match (value, self) {
            (Some(value), _) => self.validate(value),
            (None, Validator::Any) => true,
            (None, Validator::Predicate(f)) => f(&Value::Null),
            (None, _) => false,
        }
    }

    pub(crate) fn validate(&self, value: &Value) -> bool {
        match self {
            Validator::Any => true,
            Validator::Literal(expected) => literal_eq(expected, value),
            Validator::Wildcard(wildcard) => value.as_str().map_or(false, |v| wildcard.accepts(v)),
            Validator::Regex(regex) => value.as_str().map_or(false, |v| regex.is_match(v)),
            Validator::Predicate(f) => f(value),
            Validator::Sequence(item) => value
                .as_array()
                .map_or(false, |values| values.iter().all(|v| item.validate(v))),
            Validator::Tuple(items) => value.as_array().map_or(false, |values| {
                values.len() == items.len()
                    && items.iter().zip(values).all(|(item, v)| item.validate(v))
            }),
            Validator::Object(fields) => value.as_object().map_or(false, |object| {
                fields
                    .iter()
                    .all(|(key, field)| field.validate_opt(object.get(key)))
            }),
        }
    }

    /// Same as `validate`, without wrapping the string in a [`Value`] unless a predicate
    /// needs it.
    pub(crate) fn validate_str(&self, value: &str) -> bool {
        match self {
            Validator::Any => true,
            Validator::Literal(Value::String(expected)) => expected == value,
            Validator::Literal(_) => false,
            Validator::Wildcard(wildcard) => wildcard.accepts(value),
            Validator::Regex(regex) => regex.is_match(value),
            Validator::Predicate(f) => f(&Value::String(value.to_owned())),
            Validator::Sequence(_) | Validator::Tuple(_) | Validator::Object(_) => false,
        }
    }
}

fn compile_value(value: &Value, policy: ArrayMatching) -> Validator {
    match value {
        Value::String(s) => compile_string(s),
        Value::Number(_) | Value::Bool(_) => Validator::Literal(value.clone()),
        Value::Array(items) => {
            let kinds: Vec<Kind> = items.iter().map(Kind::of_value).collect();
            compile_array(items, &kinds, policy, compile_value)
        }
        Value::Object(fields) => Validator::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), compile_value(value, policy)))
                .collect(),
        ),
        // We don't know what to make of it: let everything through.
        Value::Null => Validator::Any,
    }
}

fn compile_string(s: &str) -> Validator {
    if s == "*" {
        return Validator::Wildcard(Wildcard::Any);
    }
    if let Some(suffix) = s.strip_prefix('*') {
        return Validator::Wildcard(Wildcard::Suffix(suffix.to_owned()));
    }
    if let Some(prefix) = s.strip_suffix('*') {
        return Validator::Wildcard(Wildcard::Prefix(prefix.to_owned()));
    }
    if let Some(captures) = REGEX_LITERAL.captures(s) {
        let source = &captures[1];
        let flags = &captures[2];
        match RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
        {
            Ok(regex) => return Validator::Regex(regex),
            Err(e) => warn!(
                "`{}` looks like a regular expression but it does not compile ({}), it will be compared literally.",
                s, e
            ),
        }
    }
    Validator::Literal(Value::String(s.to_owned()))
}

fn compile_array<T>(
    items: &[T],
    kinds: &[Kind],
    policy: ArrayMatching,
    compile: fn(&T, ArrayMatching) -> Validator,
) -> Validator {
    let homogeneous = kinds
        .split_first()
        .map_or(false, |(first, rest)| rest.iter().all(|kind| kind == first));
    match (homogeneous, policy) {
        (true, ArrayMatching::Uniform) => Validator::Sequence(Box::new(compile(&items[0], policy))),
        _ => Validator::Tuple(items.iter().map(|item| compile(item, policy)).collect()),
    }
}

/// Numbers compare by value: `1` and `1.0` are the same literal.
fn literal_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => expected == actual,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Kind {
    Null,
    Bool,
    Number,
    String,
    Regex,
    Predicate,
    Array,
    Object,
}

impl Kind {
    fn of_value(value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    fn of_pattern(pattern: &Pattern) -> Kind {
        match pattern {
            Pattern::Value(value) => Kind::of_value(value),
            Pattern::Regex(_) => Kind::Regex,
            Pattern::Predicate(_) => Kind::Predicate,
            Pattern::Array(_) => Kind::Array,
            Pattern::Object(_) => Kind::Object,
        }
    }
}

/// A [`RequestMatcher`] after compilation.
#[derive(Debug, Clone)]
pub(crate) struct RequestValidator {
    url: Option<Validator>,
    method: Option<Validator>,
    headers: Vec<(String, Validator)>,
    body: Option<Validator>,
}

impl RequestValidator {
    pub(crate) fn compile(matcher: &RequestMatcher, policy: ArrayMatching) -> Self {
        Self {
            url: matcher
                .url
                .as_ref()
                .map(|url| Validator::compile(url, policy)),
            method: matcher
                .method
                .as_ref()
                .map(|method| Validator::compile(method, policy)),
            headers: matcher
                .headers
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), Validator::compile(value, policy)))
                .collect(),
            body: matcher
                .body
                .as_ref()
                .map(|body| Validator::compile(body, policy)),
        }
    }

    pub(crate) fn matches(&self, request: &Request) -> bool {
        self.url
            .as_ref()
            .map_or(true, |url| url.validate_str(&request.url))
            && self
                .method
                .as_ref()
                .map_or(true, |method| method.validate_str(&request.method))
            && self.headers.iter().all(|(name, value)| match request.headers.get(name) {
                Some(actual) => value.validate_str(actual),
                None => value.validate_opt(None),
            })
            && self.body.as_ref().map_or(true, |body| match &request.body {
                None => body.validate_opt(None),
                Some(Body::Json(value)) => body.validate(value),
                Some(Body::Text(text)) => body.validate_str(text),
                Some(Body::Bytes(_)) => matches!(body, Validator::Any),
            })
    }
}

/// A [`Matcher`] after compilation.
#[derive(Clone)]
pub(crate) enum CompiledMatcher {
    Request(RequestValidator),
    Function(MatchFn),
}

impl Debug for CompiledMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CompiledMatcher::Request(validator) => validator.fmt(f),
            CompiledMatcher::Function(_) => f.write_str("CompiledMatcher::Function(<fn>)"),
        }
    }
}

impl CompiledMatcher {
    pub(crate) fn compile(matcher: &Matcher, policy: ArrayMatching) -> Self {
        match matcher {
            Matcher::Request(matcher) => {
                CompiledMatcher::Request(RequestValidator::compile(matcher, policy))
            }
            Matcher::Function(f) => CompiledMatcher::Function(f.clone()),
        }
    }

    /// Function matchers look at the raw arguments, structured ones at the canonical request.
    /// `canonical` is only invoked if a structured matcher needs it.
    pub(crate) fn matches<'a>(
        &self,
        input: &RequestInfo,
        init: Option<&RequestInit>,
        canonical: impl FnOnce() -> &'a Request,
    ) -> bool {
        match self {
            CompiledMatcher::Function(f) => f(input, init),
            CompiledMatcher::Request(validator) => validator.matches(canonical()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::{predicate, url};
    use serde_json::json;

    fn compile(value: Value) -> Validator {
        Validator::compile(&Pattern::Value(value), ArrayMatching::default())
    }

    #[test]
    fn strings_compile_by_shape() {
        assert!(matches!(compile(json!("*")), Validator::Wildcard(Wildcard::Any)));
        assert!(matches!(compile(json!("*test")), Validator::Wildcard(Wildcard::Suffix(ref s)) if s == "test"));
        assert!(matches!(compile(json!("/test/*")), Validator::Wildcard(Wildcard::Prefix(ref s)) if s == "/test/"));
        assert!(matches!(compile(json!("/alpha$/")), Validator::Regex(_)));
        assert!(matches!(compile(json!("/alpha")), Validator::Literal(_)));
    }

    #[test]
    fn wildcards() {
        assert!(compile(json!("*")).validate_str("/anything"));
        assert!(compile(json!("*test")).validate_str("/alpha/test"));
        assert!(!compile(json!("*test")).validate_str("/test/alpha"));
        assert!(compile(json!("/test/*")).validate_str("/test/alpha"));
        assert!(!compile(json!("/test/*")).validate_str("/no-match/alpha"));
    }

    #[test]
    fn wildcards_only_accept_strings() {
        assert!(!compile(json!("*")).validate(&json!(1)));
    }

    #[test]
    fn regex_literal_flags_are_honoured() {
        let validator = compile(json!("/ALPHA$/i"));
        assert!(validator.validate_str("/test/alpha"));
        assert!(!compile(json!("/ALPHA$/")).validate_str("/test/alpha"));
    }

    #[test]
    fn invalid_regex_literal_degrades_to_a_literal() {
        let validator = compile(json!("/(unclosed/"));
        assert!(validator.validate_str("/(unclosed/"));
        assert!(!validator.validate_str("/unclosed"));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(compile(json!(1)).validate(&json!(1.0)));
        assert!(!compile(json!(1)).validate(&json!("1")));
    }

    #[test]
    fn null_leaves_accept_everything() {
        let validator = compile(json!({ "alpha": null }));
        assert!(validator.validate(&json!({})));
        assert!(validator.validate(&json!({ "alpha": [1, 2] })));
    }

    #[test]
    fn predicates_see_missing_values_as_null() {
        let pattern = Pattern::object([("a", predicate(|v| v.is_null()))]);
        let validator = Validator::compile(&pattern, ArrayMatching::default());
        assert!(validator.validate(&json!({ "b": 1 })));
        assert!(validator.validate(&json!({ "a": null })));
        assert!(!validator.validate(&json!({ "a": 1 })));
    }

    #[test]
    fn methods_compile_like_any_other_leaf() {
        let request = |method: &str| Request {
            url: "/alpha".into(),
            method: method.into(),
            headers: Default::default(),
            body: None,
        };
        let any = RequestValidator::compile(&url("/alpha").method("*"), ArrayMatching::default());
        assert!(any.matches(&request("post")));
        assert!(any.matches(&request("delete")));

        let regex = RequestValidator::compile(&url("/alpha").method("/^P(UT|ATCH)$/"), ArrayMatching::default());
        assert!(regex.matches(&request("put")));
        assert!(regex.matches(&request("patch")));
        assert!(!regex.matches(&request("post")));
    }

    #[test]
    fn objects_are_matched_as_a_subset() {
        let validator = compile(json!({ "a": 1 }));
        assert!(validator.validate(&json!({ "a": 1, "b": 2 })));
        assert!(!compile(json!({ "a": 1, "c": 3 })).validate(&json!({ "a": 1, "b": 2 })));
    }

    #[test]
    fn nested_objects_recurse() {
        let validator = compile(json!({ "a": { "b": "*c" } }));
        assert!(validator.validate(&json!({ "a": { "b": "abc", "d": 1 } })));
        assert!(!validator.validate(&json!({ "a": { "b": "abd" } })));
        assert!(!validator.validate(&json!({ "a": "b" })));
    }

    #[test]
    fn homogeneous_arrays_are_matched_elementwise_by_default() {
        let validator = compile(json!(["alpha", "bravo*"]));
        assert!(matches!(validator, Validator::Tuple(_)));
        assert!(validator.validate(&json!(["alpha", "bravo-1"])));
        assert!(!validator.validate(&json!(["alpha"])));
        assert!(!validator.validate(&json!(["bravo-1", "alpha"])));
    }

    #[test]
    fn homogeneous_arrays_are_matched_uniformly_when_asked() {
        let validator = Validator::compile(&json!(["*a"]).into(), ArrayMatching::Uniform);
        assert!(matches!(validator, Validator::Sequence(_)));
        assert!(validator.validate(&json!(["a", "ba", "cba"])));
        assert!(validator.validate(&json!([])));
        assert!(!validator.validate(&json!(["a", "b"])));
    }

    #[test]
    fn heterogeneous_arrays_are_tuples_under_every_policy() {
        for policy in [ArrayMatching::Elementwise, ArrayMatching::Uniform] {
            let validator = Validator::compile(&json!(["alpha", 1, true]).into(), policy);
            assert!(matches!(validator, Validator::Tuple(_)));
            assert!(validator.validate(&json!(["alpha", 1, true])));
            assert!(!validator.validate(&json!(["alpha", 1])));
            assert!(!validator.validate(&json!([1, "alpha", true])));
        }
    }

    #[test]
    fn mixed_patterns_compile_leaf_by_leaf() {
        let pattern = Pattern::object([
            ("id", Pattern::from(Regex::new("^[0-9]+$").unwrap())),
            ("tags", Pattern::array([predicate(|v| v.is_string()), Pattern::from(2_i64)])),
        ]);
        let validator = Validator::compile(&pattern, ArrayMatching::default());
        assert!(validator.validate(&json!({ "id": "42", "tags": ["x", 2] })));
        assert!(!validator.validate(&json!({ "id": 42, "tags": ["x", 2] })));
    }

    #[test]
    fn request_validator_checks_every_present_part() {
        let matcher = url("/alpha")
            .method("POST")
            .header("X-Custom", "bravo")
            .and_body(json!({ "charlie": "delta" }));
        let validator = RequestValidator::compile(&matcher, ArrayMatching::default());
        let request = Request {
            url: "/alpha".into(),
            method: "post".into(),
            headers: [("x-custom".to_owned(), "bravo".to_owned()), ("x-other".to_owned(), "1".to_owned())]
                .into_iter()
                .collect(),
            body: Some(Body::Json(json!({ "charlie": "delta", "echo": 1 }))),
        };
        assert!(validator.matches(&request));

        let mut wrong_method = request.clone();
        wrong_method.method = "put".into();
        assert!(!validator.matches(&wrong_method));

        let mut missing_header = request.clone();
        missing_header.headers.remove("x-custom");
        assert!(!validator.matches(&missing_header));

        let mut text_body = request;
        text_body.body = Some(Body::Text("charlie".into()));
        assert!(!validator.matches(&text_body));
    }

    #[test]
    fn empty_request_matcher_accepts_everything() {
        let validator = RequestValidator::compile(&RequestMatcher::new(), ArrayMatching::default());
        let request = Request {
            url: "/".into(),
            method: "delete".into(),
            headers: Default::default(),
            body: Some(Body::Bytes(vec![1, 2, 3])),
        };
        assert!(validator.matches(&request));
    }
}
