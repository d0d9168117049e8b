use crate::record::{
    AuthenticationRecord, CredentialRecord, FollowRecord, FullPostRecord, PartialPostRecord,
    UserRecord,
};
use plaza_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication},
        credential::PasswordDigest,
        follow::Follow,
        lifecycle::SoftDeletable,
        post::{ImageUrl, NewPost, PartialPost, Post, PostBody, PostChanges, PostMarker, PostTitle},
        user::{EmailAddress, NewUser, User, UserChanges, UserMarker, UserName},
    },
    util::as_primitive,
};
use sqlx::{
    SqlitePool, query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;
use time::UtcDateTime;

static SCHEMA: &str = include_str!("schema.sql");

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("The email address is already in use")]
    EmailTaken,
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Debug, Error)]
pub enum UpdateUserError {
    #[error("The email address is already in use")]
    EmailTaken,
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Debug, Error)]
pub enum CreateFollowError {
    #[error("The follow edge already exists")]
    AlreadyFollowing,
    #[error(transparent)]
    Db(#[from] DbError),
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(DbError::from)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(DbError::from)?;

        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_user_record(&self, user_id: Id<UserMarker>) -> Result<Option<UserRecord>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT user_id, name, email, created_at, updated_at, deleted_at
            FROM users
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Standard read: a soft-deleted user resolves to `None`.
    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let user = self
            .fetch_user_record(user_id)
            .await?
            .filter(SoftDeletable::is_visible)
            .map(User::try_from)
            .transpose()?;

        Ok(user)
    }

    /// Existence lookup that ignores deletion state, for the paths that
    /// resolve a user as a reference rather than as content.
    pub async fn fetch_user_unfiltered(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let user = self
            .fetch_user_record(user_id)
            .await?
            .map(User::try_from)
            .transpose()?;

        Ok(user)
    }

    pub async fn fetch_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<(Id<UserMarker>, PasswordDigest)>> {
        let record = query_as::<_, CredentialRecord>(
            "
            SELECT user_id, password_digest
            FROM users
            WHERE email = ?1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|record| (record.user_id.into(), record.into())))
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<Id<UserMarker>, CreateUserError> {
        let now = as_primitive(UtcDateTime::now());

        let user_id: i64 = query_scalar(
            "
            INSERT INTO users (name, email, password_digest, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            RETURNING user_id
            ",
        )
        .bind(user.name.get())
        .bind(user.email.get())
        .bind(user.digest.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateUserError::EmailTaken
            } else {
                CreateUserError::Db(err.into())
            }
        })?;

        Ok(user_id.into())
    }

    /// Applies the provided field subset to a visible user; `None` fields
    /// keep their stored values. Returns the updated profile, or `None` if
    /// no visible user matched.
    pub async fn update_user(
        &self,
        user_id: Id<UserMarker>,
        changes: &UserChanges,
    ) -> Result<Option<User>, UpdateUserError> {
        let now = as_primitive(UtcDateTime::now());

        let record = query_as::<_, UserRecord>(
            "
            UPDATE users SET
                name = COALESCE(?2, name),
                email = COALESCE(?3, email),
                password_digest = COALESCE(?4, password_digest),
                updated_at = ?5
            WHERE user_id = ?1 AND deleted_at IS NULL
            RETURNING user_id, name, email, created_at, updated_at, deleted_at
            ",
        )
        .bind(user_id.get())
        .bind(changes.name.as_ref().map(UserName::get))
        .bind(changes.email.as_ref().map(EmailAddress::get))
        .bind(changes.digest.as_ref().map(PasswordDigest::as_str))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                UpdateUserError::EmailTaken
            } else {
                UpdateUserError::Db(err.into())
            }
        })?;

        let user = record
            .map(User::try_from)
            .transpose()
            .map_err(DbError::from)?;
        Ok(user)
    }

    pub async fn soft_delete_user(&self, user_id: Id<UserMarker>) -> Result<()> {
        let now = as_primitive(UtcDateTime::now());

        query(
            "
            UPDATE users SET deleted_at = ?2, updated_at = ?2
            WHERE user_id = ?1 AND deleted_at IS NULL
            ",
        )
        .bind(user_id.get())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_post(
        &self,
        author: Id<UserMarker>,
        post: &NewPost,
    ) -> Result<PartialPost> {
        let now = as_primitive(UtcDateTime::now());

        let record = query_as::<_, PartialPostRecord>(
            "
            INSERT INTO posts (user_id, title, content, image_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING post_id, title, content, image_url, user_id, created_at, updated_at
            ",
        )
        .bind(author.get())
        .bind(post.title.get())
        .bind(post.content.get())
        .bind(post.image_url.as_ref().map(ImageUrl::get))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    /// Standard read: a soft-deleted post resolves to `None`.
    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_id, posts.title, posts.content, posts.image_url,
                posts.user_id, users.name AS author_name,
                posts.created_at, posts.updated_at, posts.deleted_at
            FROM posts JOIN users ON users.user_id = posts.user_id
            WHERE posts.post_id = ?1
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record
            .filter(SoftDeletable::is_visible)
            .map(Post::try_from)
            .transpose()?;

        Ok(post)
    }

    /// All visible posts of the given owner, newest first. Resolves to
    /// `None` when the owner does not exist at all; the owner's own deletion
    /// state is not part of the lookup.
    pub async fn fetch_user_posts(
        &self,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Vec<Post>>> {
        if self.fetch_user_record(user_id).await?.is_none() {
            return Ok(None);
        }

        let records = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_id, posts.title, posts.content, posts.image_url,
                posts.user_id, users.name AS author_name,
                posts.created_at, posts.updated_at, posts.deleted_at
            FROM posts JOIN users ON users.user_id = posts.user_id
            WHERE posts.user_id = ?1 AND posts.deleted_at IS NULL
            ORDER BY posts.created_at DESC, posts.post_id DESC
            ",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;

        Ok(Some(posts))
    }

    /// Applies the provided field subset to a visible post. Returns the
    /// updated post with its author resolved, or `None` if no visible post
    /// matched.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        changes: &PostChanges,
    ) -> Result<Option<Post>> {
        let now = as_primitive(UtcDateTime::now());
        let image_url_provided = changes.image_url.is_some();
        let image_url = changes
            .image_url
            .as_ref()
            .and_then(|provided| provided.as_ref().map(ImageUrl::get));

        let result = query(
            "
            UPDATE posts SET
                title = COALESCE(?2, title),
                content = COALESCE(?3, content),
                image_url = CASE WHEN ?4 THEN ?5 ELSE image_url END,
                updated_at = ?6
            WHERE post_id = ?1 AND deleted_at IS NULL
            ",
        )
        .bind(post_id.get())
        .bind(changes.title.as_ref().map(PostTitle::get))
        .bind(changes.content.as_ref().map(PostBody::get))
        .bind(image_url_provided)
        .bind(image_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_post(post_id).await
    }

    pub async fn soft_delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        let now = as_primitive(UtcDateTime::now());

        query(
            "
            UPDATE posts SET deleted_at = ?2, updated_at = ?2
            WHERE post_id = ?1 AND deleted_at IS NULL
            ",
        )
        .bind(post_id.get())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts the edge, relying on the unique-pair constraint to resolve
    /// concurrent attempts: exactly one of two racing inserts succeeds.
    pub async fn create_follow(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<Follow, CreateFollowError> {
        let now = as_primitive(UtcDateTime::now());

        let record = query_as::<_, FollowRecord>(
            "
            INSERT INTO follows (follower_id, following_id, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING follow_id, follower_id, following_id, created_at
            ",
        )
        .bind(follower.get())
        .bind(following.get())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateFollowError::AlreadyFollowing
            } else {
                CreateFollowError::Db(err.into())
            }
        })?;

        Ok(record.into())
    }

    /// Hard-deletes the edge. Returns whether an edge existed; an absent
    /// edge is a valid terminal state the caller reports, not reconstructs.
    pub async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<bool> {
        let result = query(
            "
            DELETE FROM follows
            WHERE follower_id = ?1 AND following_id = ?2
            ",
        )
        .bind(follower.get())
        .bind(following.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO authentications
                (token_hash, user_id, kind, created_at, expires_after_seconds)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(authentication.token_hash.0.as_slice())
        .bind(authentication.user.get())
        .bind(authentication.kind.as_str())
        .bind(as_primitive(authentication.created_at))
        .bind(authentication.expires_after.map(|ttl| ttl.get().whole_seconds()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT user_id, kind, token_hash, created_at, expires_after_seconds
            FROM authentications
            WHERE token_hash = ?1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Authentication::try_from).transpose()?)
    }
}
