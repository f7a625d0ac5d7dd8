//! Diesel-based user repository.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{NewUser, UserRecord};
use super::parse_datetime;
use super::pool::{DbError, SqlitePool};
use crate::models::User;
use crate::schema::users;

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            username: record.username,
            password_hash: record.password_hash,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct DieselUserRepository {
    pool: SqlitePool,
}

impl DieselUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user. The username must already be normalised.
    ///
    /// Fails with a `UniqueViolation` database error when the name is taken.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User, DbError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let id: i64 = diesel::insert_into(users::table)
            .values(&NewUser {
                username,
                password_hash,
                created_at: &now,
                updated_at: &now,
            })
            .returning(users::id)
            .get_result(&mut conn)
            .await?;

        users::table
            .find(id)
            .first::<UserRecord>(&mut conn)
            .await
            .map(User::from)
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.get().await?;

        users::table
            .find(id)
            .first::<UserRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.get().await?;

        users::table
            .filter(users::username.eq(username))
            .first::<UserRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::util::is_unique_violation;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.migrate().await.unwrap();
        let repo = ctx.users();

        let user = repo.create("alice", "hash").await.unwrap();
        assert_eq!(repo.get(user.id).await.unwrap().unwrap().username, "alice");
        assert!(repo.get_by_username("alice").await.unwrap().is_some());
        assert!(repo.get_by_username("bob").await.unwrap().is_none());

        let err = repo.create("alice", "other").await.unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
