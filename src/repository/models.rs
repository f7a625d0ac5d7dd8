//! Diesel ORM records for database tables.

use diesel::prelude::*;

use crate::schema;

/// Artifact record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::artifacts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ArtifactRecord {
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub file_path: String,
    pub content_hash: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// New artifact for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::artifacts)]
pub struct NewArtifact<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub file_path: &'a str,
    pub content_hash: &'a str,
    pub content_type: &'a str,
    pub file_size: i64,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// User record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// New user for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}
