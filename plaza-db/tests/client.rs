use plaza_common::model::{
    auth::{AuthToken, Authentication, TokenKind},
    credential::PasswordDigest,
    post::{ImageUrl, NewPost, PostBody, PostChanges, PostTitle},
    user::{EmailAddress, NewUser, UserChanges, UserName},
};
use plaza_db::client::{CreateFollowError, CreateUserError, DbClient, UpdateUserError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use time::UtcDateTime;

async fn client() -> DbClient {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    let client = DbClient::new(pool);
    client.run_migrations().await.unwrap();
    client
}

fn new_user(name: &str, email: &str) -> NewUser {
    NewUser {
        name: UserName::new(name.to_owned()).unwrap(),
        email: EmailAddress::new(email.to_owned()).unwrap(),
        digest: PasswordDigest::from_stored("stored-digest".to_owned()),
    }
}

fn new_post(title: &str, content: &str) -> NewPost {
    NewPost {
        title: PostTitle::new(title.to_owned()).unwrap(),
        content: PostBody::new(content.to_owned()).unwrap(),
        image_url: None,
    }
}

#[tokio::test]
async fn user_round_trip() {
    let db = client().await;

    let user_id = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let user = db.fetch_user(user_id).await.unwrap().unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(user.name.get(), "Ana");
    assert_eq!(user.email.get(), "ana@x.com");
    assert_eq!(user.deleted_at, None);

    assert!(db.fetch_user(9999.into()).await.unwrap().is_none());
}

#[tokio::test]
async fn email_stays_taken_after_soft_deletion() {
    let db = client().await;

    let user_id = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    db.soft_delete_user(user_id).await.unwrap();

    let result = db.create_user(&new_user("Other", "ana@x.com")).await;
    assert!(matches!(result, Err(CreateUserError::EmailTaken)));
}

#[tokio::test]
async fn soft_deleted_user_is_hidden_from_standard_reads() {
    let db = client().await;

    let user_id = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    db.soft_delete_user(user_id).await.unwrap();

    assert!(db.fetch_user(user_id).await.unwrap().is_none());

    let unfiltered = db.fetch_user_unfiltered(user_id).await.unwrap().unwrap();
    assert!(unfiltered.deleted_at.is_some());
}

#[tokio::test]
async fn update_user_applies_only_the_provided_fields() {
    let db = client().await;

    let user_id = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();

    let changes = UserChanges {
        name: Some(UserName::new("Ana Clara".to_owned()).unwrap()),
        ..UserChanges::default()
    };
    let user = db.update_user(user_id, &changes).await.unwrap().unwrap();

    assert_eq!(user.name.get(), "Ana Clara");
    assert_eq!(user.email.get(), "ana@x.com");
}

#[tokio::test]
async fn update_user_rejects_a_taken_email() {
    let db = client().await;

    db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let other_id = db.create_user(&new_user("Bruno", "bruno@x.com")).await.unwrap();

    let changes = UserChanges {
        email: Some(EmailAddress::new("ana@x.com".to_owned()).unwrap()),
        ..UserChanges::default()
    };
    let result = db.update_user(other_id, &changes).await;

    assert!(matches!(result, Err(UpdateUserError::EmailTaken)));
}

#[tokio::test]
async fn update_user_misses_absent_and_deleted_rows() {
    let db = client().await;

    let changes = UserChanges::default();
    assert!(db.update_user(9999.into(), &changes).await.unwrap().is_none());

    let user_id = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    db.soft_delete_user(user_id).await.unwrap();
    assert!(db.update_user(user_id, &changes).await.unwrap().is_none());
}

#[tokio::test]
async fn credentials_resolve_regardless_of_deletion_state() {
    let db = client().await;

    let email = EmailAddress::new("ana@x.com".to_owned()).unwrap();
    let user_id = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    db.soft_delete_user(user_id).await.unwrap();

    let (found_id, digest) = db.fetch_credentials(&email).await.unwrap().unwrap();
    assert_eq!(found_id, user_id);
    assert_eq!(digest.as_str(), "stored-digest");
}

#[tokio::test]
async fn post_round_trip() {
    let db = client().await;

    let author = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let partial = db
        .create_post(author, &new_post("Hi", "Hello"))
        .await
        .unwrap();

    assert_eq!(partial.user, author);
    assert_eq!(partial.title.get(), "Hi");

    let post = db.fetch_post(partial.id).await.unwrap().unwrap();
    assert_eq!(post.user.id, author);
    assert_eq!(post.user.name.get(), "Ana");
    assert_eq!(post.content.get(), "Hello");
}

#[tokio::test]
async fn update_post_applies_only_the_provided_fields() {
    let db = client().await;

    let author = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let partial = db
        .create_post(
            author,
            &NewPost {
                image_url: Some(ImageUrl::new("http://x.com/a.jpg".to_owned()).unwrap()),
                ..new_post("Hi", "Hello")
            },
        )
        .await
        .unwrap();

    let changes = PostChanges {
        title: Some(PostTitle::new("Updated".to_owned()).unwrap()),
        ..PostChanges::default()
    };
    let post = db.update_post(partial.id, &changes).await.unwrap().unwrap();

    assert_eq!(post.title.get(), "Updated");
    assert_eq!(post.content.get(), "Hello");
    assert!(post.image_url.is_some());

    let cleared = db
        .update_post(
            partial.id,
            &PostChanges {
                image_url: Some(None),
                ..PostChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.image_url, None);
    assert_eq!(cleared.title.get(), "Updated");
}

#[tokio::test]
async fn soft_deleted_post_is_hidden_everywhere() {
    let db = client().await;

    let author = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let kept = db.create_post(author, &new_post("Kept", "a")).await.unwrap();
    let dropped = db.create_post(author, &new_post("Dropped", "b")).await.unwrap();

    db.soft_delete_post(dropped.id).await.unwrap();

    assert!(db.fetch_post(dropped.id).await.unwrap().is_none());
    assert!(db.update_post(dropped.id, &PostChanges::default()).await.unwrap().is_none());

    let posts = db.fetch_user_posts(author).await.unwrap().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, kept.id);
}

#[tokio::test]
async fn user_posts_are_listed_newest_first() {
    let db = client().await;

    let author = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    for title in ["First", "Second", "Third"] {
        db.create_post(author, &new_post(title, "content")).await.unwrap();
    }

    let posts = db.fetch_user_posts(author).await.unwrap().unwrap();
    let titles: Vec<_> = posts.iter().map(|post| post.title.get()).collect();
    assert_eq!(titles, ["Third", "Second", "First"]);
}

#[tokio::test]
async fn user_posts_require_the_owner_to_exist_but_not_to_be_visible() {
    let db = client().await;

    assert!(db.fetch_user_posts(9999.into()).await.unwrap().is_none());

    let author = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    db.create_post(author, &new_post("Hi", "Hello")).await.unwrap();
    db.soft_delete_user(author).await.unwrap();

    let posts = db.fetch_user_posts(author).await.unwrap().unwrap();
    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn follow_edges_are_unique_per_pair() {
    let db = client().await;

    let ana = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let bruno = db.create_user(&new_user("Bruno", "bruno@x.com")).await.unwrap();

    let follow = db.create_follow(ana, bruno).await.unwrap();
    assert_eq!(follow.follower, ana);
    assert_eq!(follow.following, bruno);

    let result = db.create_follow(ana, bruno).await;
    assert!(matches!(result, Err(CreateFollowError::AlreadyFollowing)));

    // The reverse direction is a different edge.
    assert!(db.create_follow(bruno, ana).await.is_ok());
}

#[tokio::test]
async fn unfollow_reports_whether_an_edge_existed() {
    let db = client().await;

    let ana = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let bruno = db.create_user(&new_user("Bruno", "bruno@x.com")).await.unwrap();

    db.create_follow(ana, bruno).await.unwrap();

    assert!(db.delete_follow(ana, bruno).await.unwrap());
    assert!(!db.delete_follow(ana, bruno).await.unwrap());
}

#[tokio::test]
async fn authentication_round_trip() {
    let db = client().await;

    let user_id = db.create_user(&new_user("Ana", "ana@x.com")).await.unwrap();
    let token = AuthToken::generate_random(user_id);
    let token_hash = token.hash().unwrap();

    let authentication = Authentication {
        user: user_id,
        kind: TokenKind::Access,
        token_hash: token_hash.clone(),
        created_at: UtcDateTime::now(),
        expires_after: Some(TokenKind::Access.ttl()),
    };
    db.create_authentication(&authentication).await.unwrap();

    let fetched = db.fetch_authentication(&token_hash).await.unwrap().unwrap();
    assert_eq!(fetched.user, user_id);
    assert_eq!(fetched.kind, TokenKind::Access);
    assert_eq!(fetched.expires_after, Some(TokenKind::Access.ttl()));

    let other_hash = AuthToken::generate_random(user_id).hash().unwrap();
    assert!(db.fetch_authentication(&other_hash).await.unwrap().is_none());
}
