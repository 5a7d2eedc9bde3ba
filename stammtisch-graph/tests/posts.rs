mod support;

use stammtisch_common::model::{Id, ModelValidationError, post::InvalidPostContentError};
use stammtisch_graph::{
    engagement::EngagementStore, error::StoreError, identity::IdentityStore, posts::PostStore,
};
use support::{MemoryRepo, new_user};

#[tokio::test]
async fn create_and_get_post() {
    let repo = MemoryRepo::new();
    let identity = IdentityStore::new(repo.clone());
    let posts = PostStore::new(repo.clone());

    let alice = identity.create_user(new_user("alice")).await.unwrap();
    let created = posts
        .create_post(alice, "hello world".to_owned())
        .await
        .unwrap();

    let fetched = posts.get_post(created.id).await.unwrap();
    assert_eq!(fetched.author.id, alice);
    assert_eq!(fetched.author.handle.get(), "alice");
    assert_eq!(fetched.content.get(), "hello world");
}

#[tokio::test]
async fn get_missing_post() {
    let posts = PostStore::new(MemoryRepo::new());

    assert!(matches!(
        posts.get_post(Id::from(1_u64)).await,
        Err(StoreError::PostNotFound(_))
    ));
}

#[tokio::test]
async fn listing_is_newest_first() {
    let repo = MemoryRepo::new();
    let identity = IdentityStore::new(repo.clone());
    let posts = PostStore::new(repo.clone());

    let alice = identity.create_user(new_user("alice")).await.unwrap();
    for content in ["first", "second", "third"] {
        posts.create_post(alice, content.to_owned()).await.unwrap();
    }

    let listed = posts.list_posts_by_user(alice).await.unwrap();
    let contents: Vec<_> = listed.iter().map(|post| post.content.get()).collect();
    assert_eq!(contents, ["third", "second", "first"]);
    assert!(listed.windows(2).all(|pair| pair[0].id > pair[1].id));
}

#[tokio::test]
async fn content_boundaries() {
    let repo = MemoryRepo::new();
    let identity = IdentityStore::new(repo.clone());
    let posts = PostStore::new(repo.clone());

    let alice = identity.create_user(new_user("alice")).await.unwrap();

    assert!(posts.create_post(alice, "a".repeat(500)).await.is_ok());

    assert!(matches!(
        posts.create_post(alice, "a".repeat(501)).await,
        Err(StoreError::Validation(ModelValidationError::PostContent(
            InvalidPostContentError::TooLong(_)
        )))
    ));
    assert!(matches!(
        posts.create_post(alice, String::new()).await,
        Err(StoreError::Validation(ModelValidationError::PostContent(
            InvalidPostContentError::Empty
        )))
    ));
}

#[tokio::test]
async fn create_post_requires_author() {
    let posts = PostStore::new(MemoryRepo::new());

    assert!(matches!(
        posts.create_post(Id::from(1_u64), "hello".to_owned()).await,
        Err(StoreError::UserNotFound(_))
    ));
}

#[tokio::test]
async fn only_the_owner_may_delete() {
    let repo = MemoryRepo::new();
    let identity = IdentityStore::new(repo.clone());
    let posts = PostStore::new(repo.clone());

    let alice = identity.create_user(new_user("alice")).await.unwrap();
    let bob = identity.create_user(new_user("bob")).await.unwrap();
    let post = posts.create_post(alice, "mine".to_owned()).await.unwrap();

    assert!(matches!(
        posts.delete_post(post.id, bob).await,
        Err(StoreError::Forbidden { .. })
    ));
    assert!(posts.get_post(post.id).await.is_ok());

    posts.delete_post(post.id, alice).await.unwrap();
    assert!(matches!(
        posts.get_post(post.id).await,
        Err(StoreError::PostNotFound(_))
    ));
}

#[tokio::test]
async fn delete_post_cascades_to_likes() {
    let repo = MemoryRepo::new();
    let identity = IdentityStore::new(repo.clone());
    let posts = PostStore::new(repo.clone());
    let engagement = EngagementStore::new(repo.clone());

    let alice = identity.create_user(new_user("alice")).await.unwrap();
    let bob = identity.create_user(new_user("bob")).await.unwrap();
    let post = posts.create_post(alice, "short-lived".to_owned()).await.unwrap();

    engagement.like(bob, post.id).await.unwrap();
    posts.delete_post(post.id, alice).await.unwrap();

    assert_eq!(engagement.count_likes(post.id).await.unwrap(), 0);
    assert!(!engagement.has_liked(bob, post.id).await.unwrap());
}
