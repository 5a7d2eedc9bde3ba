use crate::{
    config::DbConfig,
    record::{FullPostRecord, LikeRecord, PartialPostRecord, UserRecord},
};
use async_trait::async_trait;
use sqlx::PgPool;
use stammtisch_common::{
    model::{
        Id, ModelValidationError, StammtischSnowflake, StammtischSnowflakeGenerator,
        like::Like,
        post::{CreatePost, PartialPost, Post, PostMarker},
        user::{CreateUser, User, UserHandle, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
};
use stammtisch_graph::{
    error::StorageError,
    repo::{LikeRepo, PostRepo, UserRepo},
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        StorageError::new(value)
    }
}

#[derive(Clone)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Arc<Mutex<StammtischSnowflakeGenerator>>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Arc::new(Mutex::new(StammtischSnowflakeGenerator::new(
            worker_id, process_id,
        )));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn connect(config: &DbConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(&config.database_url).await?;
        Ok(Self::new(pool, config.worker_id, config.process_id))
    }

    fn generate_snowflake(&self) -> StammtischSnowflake {
        self.snowflake_generator
            .lock()
            .expect("Snowflake generator lock poisoned")
            .generate()
    }
}

fn to_db(snowflake: StammtischSnowflake) -> i64 {
    snowflake.get().cast_signed()
}

fn limit_to_db(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl UserRepo for DbClient {
    async fn insert_user(&self, user: &CreateUser) -> Result<Option<Id<UserMarker>>, StorageError> {
        let user_snowflake = self.generate_snowflake();

        let returned = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO users.users (user_snowflake, handle, credential)
            VALUES ($1, $2, $3)
            ON CONFLICT (handle) DO NOTHING
            RETURNING user_snowflake
            ",
        )
        .bind(to_db(user_snowflake))
        .bind(user.handle.get())
        .bind(user.credential.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(returned.map(|snowflake| snowflake.cast_unsigned().into()))
    }

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>, StorageError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT users.user_snowflake, users.handle
            FROM users.users
            WHERE users.user_snowflake = $1
            ",
        )
        .bind(to_db(id.snowflake()))
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        let user = record.map(User::try_from).transpose().map_err(DbError::Data)?;
        Ok(user)
    }

    async fn fetch_user_by_handle(
        &self,
        handle: &UserHandle,
    ) -> Result<Option<User>, StorageError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT users.user_snowflake, users.handle
            FROM users.users
            WHERE users.handle = $1
            ",
        )
        .bind(handle.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        let user = record.map(User::try_from).transpose().map_err(DbError::Data)?;
        Ok(user)
    }

    async fn user_exists(&self, id: Id<UserMarker>) -> Result<bool, StorageError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users.users WHERE user_snowflake = $1)",
        )
        .bind(to_db(id.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(exists)
    }

    async fn insert_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "
            INSERT INTO users.follows (follower_snowflake, followee_snowflake)
            VALUES ($1, $2)
            ON CONFLICT (follower_snowflake, followee_snowflake) DO NOTHING
            ",
        )
        .bind(to_db(follower.snowflake()))
        .bind(to_db(followee.snowflake()))
        .execute(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "
            DELETE FROM users.follows
            WHERE follower_snowflake = $1 AND followee_snowflake = $2
            ",
        )
        .bind(to_db(follower.snowflake()))
        .bind(to_db(followee.snowflake()))
        .execute(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_following(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<Id<UserMarker>>, StorageError> {
        let snowflakes = sqlx::query_scalar::<_, i64>(
            "
            SELECT followee_snowflake
            FROM users.follows
            WHERE follower_snowflake = $1
            ORDER BY followee_snowflake
            ",
        )
        .bind(to_db(user.snowflake()))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(snowflakes
            .into_iter()
            .map(|snowflake| snowflake.cast_unsigned().into())
            .collect())
    }

    async fn list_followers(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<Id<UserMarker>>, StorageError> {
        let snowflakes = sqlx::query_scalar::<_, i64>(
            "
            SELECT follower_snowflake
            FROM users.follows
            WHERE followee_snowflake = $1
            ORDER BY follower_snowflake
            ",
        )
        .bind(to_db(user.snowflake()))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(snowflakes
            .into_iter()
            .map(|snowflake| snowflake.cast_unsigned().into())
            .collect())
    }

    async fn count_following(&self, user: Id<UserMarker>) -> Result<u64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users.follows WHERE follower_snowflake = $1",
        )
        .bind(to_db(user.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(count.cast_unsigned())
    }

    async fn count_followers(&self, user: Id<UserMarker>) -> Result<u64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users.follows WHERE followee_snowflake = $1",
        )
        .bind(to_db(user.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(count.cast_unsigned())
    }

    async fn delete_user_cascade(&self, id: Id<UserMarker>) -> Result<bool, StorageError> {
        let user_snowflake = to_db(id.snowflake());
        let mut tx = self.pool.begin().await.map_err(DbError::Sqlx)?;

        sqlx::query(
            "
            DELETE FROM likes.likes
            WHERE user_snowflake = $1
               OR post_snowflake IN (
                   SELECT post_snowflake FROM posts.posts WHERE user_snowflake = $1
               )
            ",
        )
        .bind(user_snowflake)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Sqlx)?;

        sqlx::query("DELETE FROM posts.posts WHERE user_snowflake = $1")
            .bind(user_snowflake)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Sqlx)?;

        sqlx::query(
            "
            DELETE FROM users.follows
            WHERE follower_snowflake = $1 OR followee_snowflake = $1
            ",
        )
        .bind(user_snowflake)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Sqlx)?;

        let result = sqlx::query("DELETE FROM users.users WHERE user_snowflake = $1")
            .bind(user_snowflake)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Sqlx)?;

        tx.commit().await.map_err(DbError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostRepo for DbClient {
    async fn insert_post(&self, post: &CreatePost) -> Result<PartialPost, StorageError> {
        let post_snowflake = self.generate_snowflake();

        let record = sqlx::query_as::<_, PartialPostRecord>(
            "
            INSERT INTO posts.posts (post_snowflake, user_snowflake, content)
            VALUES ($1, $2, $3)
            RETURNING post_snowflake, user_snowflake, content
            ",
        )
        .bind(to_db(post_snowflake))
        .bind(to_db(post.author.snowflake()))
        .bind(post.content.get())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(PartialPost::try_from(record).map_err(DbError::Data)?)
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>, StorageError> {
        let record = sqlx::query_as::<_, FullPostRecord>(
            "
            SELECT posts.post_snowflake, posts.content, users.user_snowflake, users.handle
            FROM posts.posts
            JOIN users.users USING (user_snowflake)
            WHERE posts.post_snowflake = $1
            ",
        )
        .bind(to_db(id.snowflake()))
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        let post = record.map(Post::try_from).transpose().map_err(DbError::Data)?;
        Ok(post)
    }

    async fn post_exists(&self, id: Id<PostMarker>) -> Result<bool, StorageError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM posts.posts WHERE post_snowflake = $1)",
        )
        .bind(to_db(id.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(exists)
    }

    async fn list_posts_by_user(
        &self,
        user: Id<UserMarker>,
    ) -> Result<Vec<PartialPost>, StorageError> {
        let records = sqlx::query_as::<_, PartialPostRecord>(
            "
            SELECT post_snowflake, user_snowflake, content
            FROM posts.posts
            WHERE user_snowflake = $1
            ORDER BY post_snowflake DESC
            ",
        )
        .bind(to_db(user.snowflake()))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        let posts = records
            .into_iter()
            .map(PartialPost::try_from)
            .collect::<Result<_, _>>()
            .map_err(DbError::Data)?;
        Ok(posts)
    }

    async fn count_posts_by_user(&self, user: Id<UserMarker>) -> Result<u64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts.posts WHERE user_snowflake = $1",
        )
        .bind(to_db(user.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(count.cast_unsigned())
    }

    async fn delete_post_cascade(&self, id: Id<PostMarker>) -> Result<bool, StorageError> {
        let post_snowflake = to_db(id.snowflake());
        let mut tx = self.pool.begin().await.map_err(DbError::Sqlx)?;

        sqlx::query("DELETE FROM likes.likes WHERE post_snowflake = $1")
            .bind(post_snowflake)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Sqlx)?;

        let result = sqlx::query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_snowflake)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Sqlx)?;

        tx.commit().await.map_err(DbError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_timeline_page(
        &self,
        authors: &[Id<UserMarker>],
        limit: usize,
        before: Option<Id<PostMarker>>,
    ) -> Result<Vec<Post>, StorageError> {
        let author_snowflakes: Vec<i64> = authors
            .iter()
            .map(|author| to_db(author.snowflake()))
            .collect();

        let records = sqlx::query_as::<_, FullPostRecord>(
            "
            SELECT posts.post_snowflake, posts.content, users.user_snowflake, users.handle
            FROM posts.posts
            JOIN users.users USING (user_snowflake)
            WHERE posts.user_snowflake = ANY($1)
              AND ($2::BIGINT IS NULL OR posts.post_snowflake < $2)
            ORDER BY posts.post_snowflake DESC
            LIMIT $3
            ",
        )
        .bind(&author_snowflakes)
        .bind(before.map(|id| to_db(id.snowflake())))
        .bind(limit_to_db(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()
            .map_err(DbError::Data)?;
        Ok(posts)
    }
}

#[async_trait]
impl LikeRepo for DbClient {
    async fn insert_like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Like, StorageError> {
        let like_snowflake = self.generate_snowflake();

        // On conflict the stored row keeps its original like_snowflake, so
        // repeated likes return the existing record.
        let record = sqlx::query_as::<_, LikeRecord>(
            "
            INSERT INTO likes.likes (like_snowflake, user_snowflake, post_snowflake)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_snowflake, post_snowflake) DO UPDATE
            SET user_snowflake = EXCLUDED.user_snowflake
            RETURNING like_snowflake, user_snowflake, post_snowflake
            ",
        )
        .bind(to_db(like_snowflake))
        .bind(to_db(user.snowflake()))
        .bind(to_db(post.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(record.into())
    }

    async fn delete_like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "
            DELETE FROM likes.likes
            WHERE user_snowflake = $1 AND post_snowflake = $2
            ",
        )
        .bind(to_db(user.snowflake()))
        .bind(to_db(post.snowflake()))
        .execute(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_liked(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<bool, StorageError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "
            SELECT EXISTS(
                SELECT 1 FROM likes.likes
                WHERE user_snowflake = $1 AND post_snowflake = $2
            )
            ",
        )
        .bind(to_db(user.snowflake()))
        .bind(to_db(post.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(exists)
    }

    async fn count_likes(&self, post: Id<PostMarker>) -> Result<u64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM likes.likes WHERE post_snowflake = $1",
        )
        .bind(to_db(post.snowflake()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Sqlx)?;

        Ok(count.cast_unsigned())
    }
}
