use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::session::UserIdentity;

/// Row of `users`. Not `Serialize`: the password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub password: String,
}

impl From<DbUser> for UserIdentity {
    fn from(u: DbUser) -> Self {
        UserIdentity {
            id: u.id,
            username: u.username,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbSound {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbQuestion {
    pub id: i64,
    pub name: String,
    pub sound_ids: Vec<i64>,
    pub difficulty: i64,
}

/// A lesson grouping of questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbLesion {
    pub id: i64,
    pub name: String,
    pub question_ids: Vec<i64>,
    pub difficulty: i64,
}
