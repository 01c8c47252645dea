//! Community engagement integration tests.
//!
//! Covers: per-user like uniqueness, the counter staying in step with the
//! like rows, view counting, and what the public feed does and does not
//! show.

use std::sync::Arc;

use snipstash::context::AppContext;
use snipstash::routes::community::{handle_list_feed, handle_record_view, handle_toggle_like};
use snipstash::routes::snippets::{handle_create_snippet, CreateSnippetRequest};
use snipstash::routes::visibility::{handle_set_visibility, SetVisibilityRequest};
use snipstash::store::{ConcreteStore, Store};
use snipstash_billing::config::BillingOptions;
use snipstash_core::db::adapter::{Adapter, WhereClause};
use snipstash_core::options::AppOptions;
use snipstash_memory::MemoryAdapter;

// ─── Test Setup ───────────────────────────────────────────────────

fn test_ctx() -> (Arc<AppContext>, Arc<MemoryAdapter>) {
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = AppContext::new(
        AppOptions::new(),
        BillingOptions::new("sk_test", "whsec_test", "price_pro"),
        Arc::new(ConcreteStore::new(adapter.clone())),
    );
    (ctx, adapter)
}

async fn publish_snippet(ctx: &Arc<AppContext>, author: &str, title: &str) -> String {
    let snippet = handle_create_snippet(
        ctx,
        author,
        CreateSnippetRequest {
            title: title.into(),
            code: "let shared = true;".into(),
            language: Some("rust".into()),
            tags: vec![],
            project_id: None,
        },
    )
    .await
    .expect("create snippet");
    handle_set_visibility(
        ctx,
        author,
        &snippet.id,
        SetVisibilityRequest { is_public: true },
    )
    .await
    .expect("publish")
    .post
    .expect("post created")
    .id
}

// ─── Like Uniqueness ──────────────────────────────────────────────

#[tokio::test]
async fn alternating_toggles_flip_the_like() {
    let (ctx, _adapter) = test_ctx();
    let post_id = publish_snippet(&ctx, "usr_author", "Shared").await;

    for round in 0..4 {
        let response = handle_toggle_like(&ctx, "usr_fan", &post_id)
            .await
            .expect("toggle");
        let expect_liked = round % 2 == 0;
        assert_eq!(response.liked, expect_liked, "round {}", round);
        assert_eq!(response.likes_count, if expect_liked { 1 } else { 0 });
    }
}

#[tokio::test]
async fn each_user_contributes_at_most_one_like() {
    let (ctx, adapter) = test_ctx();
    let post_id = publish_snippet(&ctx, "usr_author", "Popular").await;

    for fan in ["usr_a", "usr_b", "usr_c"] {
        handle_toggle_like(&ctx, fan, &post_id).await.expect("like");
    }
    let post = ctx.store.find_post(&post_id).await.unwrap().unwrap();
    assert_eq!(post.likes_count, 3);

    // One fan backs out; the others are untouched
    handle_toggle_like(&ctx, "usr_b", &post_id).await.expect("unlike");
    let post = ctx.store.find_post(&post_id).await.unwrap().unwrap();
    assert_eq!(post.likes_count, 2);

    // The counter always matches the number of like rows
    let rows = adapter
        .count(
            "community_likes",
            &[WhereClause::eq("communityId", post_id.as_str())],
        )
        .await
        .unwrap();
    assert_eq!(rows, post.likes_count);
}

#[tokio::test]
async fn likes_are_scoped_to_their_post() {
    let (ctx, _adapter) = test_ctx();
    let first = publish_snippet(&ctx, "usr_author", "First").await;
    let second = publish_snippet(&ctx, "usr_author", "Second").await;

    handle_toggle_like(&ctx, "usr_fan", &first).await.expect("like");

    // The same fan can still like the other post; its counter is its own
    let response = handle_toggle_like(&ctx, "usr_fan", &second)
        .await
        .expect("like");
    assert!(response.liked);
    assert_eq!(response.likes_count, 1);

    let first_post = ctx.store.find_post(&first).await.unwrap().unwrap();
    assert_eq!(first_post.likes_count, 1);
}

// ─── Views ────────────────────────────────────────────────────────

#[tokio::test]
async fn views_accumulate_without_a_caller() {
    let (ctx, _adapter) = test_ctx();
    let post_id = publish_snippet(&ctx, "usr_author", "Viewed").await;

    for expected in 1..=5 {
        let response = handle_record_view(&ctx, &post_id).await.expect("view");
        assert_eq!(response.views_count, expected);
    }
}

// ─── The Feed ─────────────────────────────────────────────────────

#[tokio::test]
async fn feed_only_shows_published_snippets() {
    let (ctx, _adapter) = test_ctx();
    publish_snippet(&ctx, "usr_author", "Public one").await;
    handle_create_snippet(
        &ctx,
        "usr_author",
        CreateSnippetRequest {
            title: "Private one".into(),
            code: "let secret = 1;".into(),
            language: Some("rust".into()),
            tags: vec![],
            project_id: None,
        },
    )
    .await
    .expect("create snippet");

    let feed = handle_list_feed(&ctx, None, None).await.expect("feed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].title, "Public one");
}

#[tokio::test]
async fn feed_mixes_authors() {
    let (ctx, _adapter) = test_ctx();
    publish_snippet(&ctx, "usr_one", "From one").await;
    publish_snippet(&ctx, "usr_two", "From two").await;

    let feed = handle_list_feed(&ctx, None, None).await.expect("feed");
    assert_eq!(feed.len(), 2);
    let mut authors: Vec<&str> = feed.iter().map(|p| p.user_id.as_str()).collect();
    authors.sort();
    assert_eq!(authors, ["usr_one", "usr_two"]);
}

#[tokio::test]
async fn feed_limit_is_clamped() {
    let (ctx, _adapter) = test_ctx();
    for i in 0..3 {
        publish_snippet(&ctx, "usr_author", &format!("Snippet {}", i)).await;
    }

    // A hostile limit of 0 still returns at least one post
    let feed = handle_list_feed(&ctx, Some(0), None).await.expect("feed");
    assert_eq!(feed.len(), 1);

    let feed = handle_list_feed(&ctx, Some(2), None).await.expect("feed");
    assert_eq!(feed.len(), 2);
}
