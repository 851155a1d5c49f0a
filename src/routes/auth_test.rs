use axum::extract::FromRequestParts;
use axum::http::{HeaderValue, Request};

use super::*;
use crate::state::test_helpers::{self, seed_user};

fn headers(value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(AUTHORIZATION, HeaderValue::from_str(value).expect("header value"));
    map
}

#[test]
fn bearer_token_accepts_any_scheme_case() {
    assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
    assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc"));
}

#[test]
fn bearer_token_rejects_other_shapes() {
    assert_eq!(bearer_token(&HeaderMap::new()), None);
    assert_eq!(bearer_token(&headers("Basic abc")), None);
    assert_eq!(bearer_token(&headers("Bearer")), None);
    assert_eq!(bearer_token(&headers("Bearer    ")), None);
}

#[tokio::test]
async fn extractor_resolves_known_token() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let alice = seed_user(&store, "alice").await;

    let (mut parts, ()) = Request::builder()
        .header(AUTHORIZATION, "Bearer tok-alice")
        .body(())
        .expect("request")
        .into_parts();
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.expect("authenticated");
    assert_eq!(auth.user, alice);
}

#[tokio::test]
async fn extractor_rejects_unknown_or_missing_token() {
    let state = test_helpers::test_app_state();

    let (mut parts, ()) = Request::builder()
        .header(AUTHORIZATION, "Bearer nope")
        .body(())
        .expect("request")
        .into_parts();
    let err = AuthUser::from_request_parts(&mut parts, &state).await.err().expect("rejected");
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    assert_eq!(err.code, "E_UNAUTHORIZED");

    let (mut parts, ()) = Request::builder().body(()).expect("request").into_parts();
    let err = AuthUser::from_request_parts(&mut parts, &state).await.err().expect("rejected");
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
}
