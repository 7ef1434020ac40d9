use fetchmock::matchers::{function, header, method, predicate, url, Pattern};
use fetchmock::{ArrayMatching, FetchBinding, FetchMock, MockFn, RequestInfo, RequestInit};
use regex::Regex;
use futures::FutureExt;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

fn start() -> (Arc<FetchBinding>, FetchMock) {
    let binding = Arc::new(FetchBinding::default());
    let fetch_mock = FetchMock::start(&binding, Arc::new(MockFn::new()));
    (binding, fetch_mock)
}

fn post(body: Value) -> Option<RequestInit> {
    Some(RequestInit::new().method("POST").body(body))
}

#[async_std::test]
async fn literal_urls_must_be_equal() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request("/alpha", 200, None);

    // Act
    let exact = binding.fetch("/alpha", None).await;
    let longer = binding.fetch("/alpha/bravo", None).await;
    let shorter = binding.fetch("/alph", None).await;

    // Assert
    assert!(exact.is_ok());
    assert!(longer.is_err());
    assert!(shorter.is_err());
}

#[async_std::test]
async fn a_lone_star_matches_every_url() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request("*", 200, None);

    // Act & Assert
    for input in ["/alpha", "https://example.com/bravo?charlie=1", ""] {
        assert!(binding.fetch(input, None).await.is_ok(), "{}", input);
    }
}

#[async_std::test]
async fn a_leading_star_matches_url_suffixes() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request("*/bravo", 200, None);

    // Act & Assert
    assert!(binding.fetch("/alpha/bravo", None).await.is_ok());
    assert!(binding.fetch("https://example.com/bravo", None).await.is_ok());
    assert!(binding.fetch("/alpha/bravo/charlie", None).await.is_err());
}

#[async_std::test]
async fn a_trailing_star_matches_url_prefixes() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request("/alpha/*", 200, None);

    // Act & Assert
    assert!(binding.fetch("/alpha/bravo", None).await.is_ok());
    assert!(binding.fetch("/alpha/", None).await.is_ok());
    assert!(binding.fetch("/charlie/alpha/bravo", None).await.is_err());
}

#[async_std::test]
async fn regex_literals_are_compiled() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request(r"/^/users/\d+$/", 200, None);
    fetch_mock.mock_request("/ALPHA$/i", 201, None);

    // Act & Assert
    assert_eq!(binding.fetch("/users/42", None).await.unwrap().status(), 200);
    assert!(binding.fetch("/users/bob", None).await.is_err());
    assert_eq!(binding.fetch("/bravo/alpha", None).await.unwrap().status(), 201);
}

#[async_std::test]
async fn regexes_can_be_used_directly() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_get(Regex::new(r"^/orders/\d+$").unwrap(), 200, None);

    // Act & Assert
    assert!(binding.fetch("/orders/1", None).await.is_ok());
    assert!(binding.fetch("/orders/", None).await.is_err());
}

#[async_std::test]
async fn absolute_urls_are_matched_in_their_serialized_form() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request("https://example.com/alpha", 200, None);

    // Act
    let parsed = url::Url::parse("https://example.com/alpha").unwrap();
    let outcome = binding.fetch(parsed, None).await;

    // Assert
    assert!(outcome.is_ok());
}

#[async_std::test]
async fn request_objects_contribute_their_uri() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request("https://example.com/alpha", 200, None);

    // Act
    let request = http::Request::builder()
        .uri("https://example.com/alpha")
        .body(Vec::<u8>::new())
        .unwrap();
    let outcome = binding.fetch(request, None).await;

    // Assert
    assert!(outcome.is_ok());
}

#[async_std::test]
async fn methods_are_compared_case_insensitively() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request(url("/alpha").method("PATCH"), 200, None);

    // Act & Assert
    let patch = Some(RequestInit::new().method("patch"));
    assert!(binding.fetch("/alpha", patch).await.is_ok());
    assert!(binding.fetch("/alpha", None).await.is_err());
}

#[async_std::test]
async fn calls_without_a_method_are_gets() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request(method("get"), 200, None);

    // Act & Assert
    assert!(binding.fetch("/alpha", None).await.is_ok());
    assert!(binding
        .fetch("/alpha", Some(RequestInit::new().method("DELETE")))
        .await
        .is_err());
}

#[async_std::test]
async fn method_wildcards_accept_every_method() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request(url("/alpha").method("*"), 200, None);

    // Act
    let post = binding
        .fetch("/alpha", Some(RequestInit::new().method("POST")))
        .await;
    let get = binding.fetch("/alpha", None).await;

    // Assert
    assert!(post.is_ok());
    assert!(get.is_ok());
}

#[async_std::test]
async fn methods_can_be_matched_with_regular_expressions() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock
        .mock_request(url("/bravo").method("/^P(UT|ATCH)$/"), 200, None)
        .mock_request(url("/charlie").method(Regex::new("^de").unwrap()), 204, None);

    // Act
    let put = binding
        .fetch("/bravo", Some(RequestInit::new().method("PUT")))
        .await;
    let post = binding
        .fetch("/bravo", Some(RequestInit::new().method("POST")))
        .await;
    let delete = binding
        .fetch("/charlie", Some(RequestInit::new().method("DELETE")))
        .await;

    // Assert
    assert!(put.is_ok());
    assert!(post.is_err());
    assert_eq!(delete.unwrap().status(), 204);
}

#[async_std::test]
async fn predicates_are_asked_about_missing_fields() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(
        url("/alpha").and_body(Pattern::object([("a", predicate(|v| v.is_null()))])),
        200,
        None,
    );

    // Act
    let missing = binding.fetch("/alpha", post(json!({ "b": 1 }))).await;
    let present = binding.fetch("/alpha", post(json!({ "a": 1 }))).await;

    // Assert
    assert!(missing.is_ok());
    assert!(present.is_err());
}

#[async_std::test]
async fn verb_shorthands_override_the_method_of_the_matcher() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_delete(url("/alpha").method("GET"), 204, None);

    // Act
    let get = binding.fetch("/alpha", None).await;
    let delete = binding
        .fetch("/alpha", Some(RequestInit::new().method("DELETE")))
        .await;

    // Assert
    assert!(get.is_err());
    assert_eq!(delete.unwrap().status(), 204);
}

#[async_std::test]
async fn header_names_are_case_insensitive() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request(header("X-Api-Key", "secret"), 200, None);

    // Act
    let init = RequestInit::new().header("x-api-key", "secret");
    let matching = binding.fetch("/alpha", Some(init)).await;
    let init = RequestInit::new().header("X-API-KEY", "guess");
    let mismatching = binding.fetch("/alpha", Some(init)).await;
    let missing = binding.fetch("/alpha", None).await;

    // Assert
    assert!(matching.is_ok());
    assert!(mismatching.is_err());
    assert!(missing.is_err());
}

#[async_std::test]
async fn header_values_accept_patterns() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_request(
        url("*")
            .header("authorization", "Bearer *")
            .header("accept", Regex::new("json").unwrap())
            .header("x-request-id", predicate(|v| v.as_str().map_or(false, |s| s.len() == 4))),
        200,
        None,
    );

    // Act
    let init = RequestInit::new()
        .header("Authorization", "Bearer abc")
        .header("Accept", "application/json")
        .header("X-Request-Id", "abcd");
    let outcome = binding.fetch("/alpha", Some(init)).await;

    // Assert
    assert!(outcome.is_ok());
}

#[async_std::test]
async fn bodies_are_matched_as_a_subset() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(
        url("/alpha").and_body(json!({ "bravo": "charlie", "delta": { "echo": 1 } })),
        201,
        None,
    );

    // Act
    let superset = post(json!({ "bravo": "charlie", "delta": { "echo": 1.0, "foxtrot": true }, "golf": [] }));
    let superset = binding.fetch("/alpha", superset).await;
    let missing_nested = binding
        .fetch("/alpha", post(json!({ "bravo": "charlie", "delta": {} })))
        .await;
    let wrong_value = binding
        .fetch("/alpha", post(json!({ "bravo": "india", "delta": { "echo": 1 } })))
        .await;

    // Assert
    assert!(superset.is_ok());
    assert!(missing_nested.is_err());
    assert!(wrong_value.is_err());
}

#[async_std::test]
async fn json_text_bodies_are_parsed_before_matching() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(url("/alpha").and_body(json!({ "bravo": "charlie" })), 200, None);

    // Act
    let init = RequestInit::new()
        .method("POST")
        .body(r#"{"bravo":"charlie","delta":2}"#);
    let outcome = binding.fetch("/alpha", Some(init)).await;

    // Assert
    assert!(outcome.is_ok());
}

#[async_std::test]
async fn plain_text_bodies_are_matched_as_strings() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(url("/alpha").and_body("hello *"), 200, None);

    // Act
    let init = RequestInit::new().method("POST").body("hello world");
    let outcome = binding.fetch("/alpha", Some(init)).await;

    // Assert
    assert!(outcome.is_ok());
}

#[async_std::test]
async fn body_leaves_accept_wildcards_regexes_and_predicates() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(
        url("/alpha").and_body(Pattern::object([
            ("email", Pattern::from("*@example.com")),
            ("id", Pattern::from(Regex::new(r"^[a-f0-9]{8}$").unwrap())),
            ("age", predicate(|v| v.as_u64().map_or(false, |age| age >= 18))),
        ])),
        200,
        None,
    );

    // Act
    let adult = binding
        .fetch(
            "/alpha",
            post(json!({ "email": "bob@example.com", "id": "deadbeef", "age": 42 })),
        )
        .await;
    let minor = binding
        .fetch(
            "/alpha",
            post(json!({ "email": "tim@example.com", "id": "deadbeef", "age": 12 })),
        )
        .await;

    // Assert
    assert!(adult.is_ok());
    assert!(minor.is_err());
}

#[async_std::test]
async fn arrays_are_matched_position_by_position_by_default() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(url("/alpha").and_body(json!({ "tags": ["a", "b"] })), 200, None);

    // Act & Assert
    assert!(binding
        .fetch("/alpha", post(json!({ "tags": ["a", "b"] })))
        .await
        .is_ok());
    assert!(binding
        .fetch("/alpha", post(json!({ "tags": ["a", "b", "c"] })))
        .await
        .is_err());
    assert!(binding
        .fetch("/alpha", post(json!({ "tags": ["b", "a"] })))
        .await
        .is_err());
}

#[async_std::test]
async fn uniform_arrays_describe_the_type_of_their_elements() {
    // Arrange
    let binding = Arc::new(FetchBinding::default());
    let fetch_mock = FetchMock::builder()
        .array_matching(ArrayMatching::Uniform)
        .start(&binding, Arc::new(MockFn::new()));
    fetch_mock.mock_post(
        url("/alpha").and_body(Pattern::object([(
            "ids",
            Pattern::array([Regex::new(r"^\d+$").unwrap()]),
        )])),
        200,
        None,
    );

    // Act & Assert
    assert!(binding
        .fetch("/alpha", post(json!({ "ids": ["1", "22", "333"] })))
        .await
        .is_ok());
    assert!(binding
        .fetch("/alpha", post(json!({ "ids": [] })))
        .await
        .is_ok());
    assert!(binding
        .fetch("/alpha", post(json!({ "ids": ["1", "two"] })))
        .await
        .is_err());
}

#[async_std::test]
async fn mixed_arrays_are_always_matched_position_by_position() {
    // Arrange
    let binding = Arc::new(FetchBinding::default());
    let fetch_mock = FetchMock::builder()
        .array_matching(ArrayMatching::Uniform)
        .start(&binding, Arc::new(MockFn::new()));
    fetch_mock.mock_post(url("/alpha").and_body(json!({ "pair": ["a", 1] })), 200, None);

    // Act & Assert
    assert!(binding
        .fetch("/alpha", post(json!({ "pair": ["a", 1] })))
        .await
        .is_ok());
    assert!(binding
        .fetch("/alpha", post(json!({ "pair": ["a", 1, 2] })))
        .await
        .is_err());
}

#[async_std::test]
async fn binary_bodies_only_satisfy_matchers_without_body_constraints() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(url("/upload").and_body("*"), 400, None);
    fetch_mock.mock_post("/upload", 201, None);

    // Act
    let init = RequestInit::new().method("POST").body(vec![0xde, 0xad, 0xbe, 0xef]);
    let response = binding.fetch("/upload", Some(init)).await.unwrap();

    // Assert
    assert_eq!(response.status(), 201);
}

#[async_std::test]
async fn function_matchers_see_the_raw_call() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock.mock_post(
        function(|input, init| {
            matches!(input, RequestInfo::Str(target) if target == "/Alpha") && init.is_none()
        }),
        200,
        None,
    );

    // Act
    // The method override does not apply to function matchers: a GET goes through.
    let raw = binding.fetch("/Alpha", None).await;
    let with_init = binding.fetch("/Alpha", Some(RequestInit::new())).await;

    // Assert
    assert!(raw.is_ok());
    assert!(with_init.is_err());
}

#[async_std::test]
async fn function_matchers_can_inspect_the_session() {
    // Arrange
    let (binding, fetch_mock) = start();
    let fetch_mock = Arc::new(fetch_mock);
    let session = Arc::downgrade(&fetch_mock);
    fetch_mock.mock_get(
        function(move |_, _| {
            session
                .upgrade()
                .map_or(false, |session| session.active_mocks().len() == 1)
        }),
        200,
        None,
    );

    // Act
    let response = binding.fetch("/alpha", None).await;

    // Assert
    assert_eq!(response.unwrap().status(), 200);
}

#[async_std::test]
async fn a_panicking_predicate_only_fails_its_own_call() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock
        .mock_get(
            url(predicate(|target| {
                if target == "/alpha" {
                    panic!("Unexpected call to /alpha");
                }
                false
            })),
            500,
            None,
        )
        .mock_get("/bravo", 200, None);

    // Act
    let alpha = AssertUnwindSafe(binding.fetch("/alpha", None))
        .catch_unwind()
        .await;
    let bravo = binding.fetch("/bravo", None).await;

    // Assert
    assert!(alpha.is_err());
    assert_eq!(bravo.unwrap().status(), 200);
    assert_eq!(fetch_mock.active_mocks().len(), 2);
}

#[async_std::test]
async fn the_first_registered_match_wins() {
    // Arrange
    let (binding, fetch_mock) = start();
    fetch_mock
        .mock_get("*", 200, None)
        .mock_get("/alpha", 201, None);

    // Act
    let response = binding.fetch("/alpha", None).await.unwrap();

    // Assert
    assert_eq!(response.status(), 200);
}
