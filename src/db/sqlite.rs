use crate::db::models::{DbLesion, DbQuestion, DbSound, DbUser};
use crate::db::schema::{APP_CONFIG_ID, SQLITE_INIT};
use crate::error::TrainerError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;

pub type SqlitePool = Pool<Sqlite>;

/// Open a pool on `uri`, creating the database file (and its directory) when missing.
/// Any failure here means the database is unreachable.
pub async fn connect(uri: &str, max_connections: u32) -> Result<SqlitePool, TrainerError> {
    let opts = SqliteConnectOptions::from_str(uri)
        .map_err(TrainerError::Connection)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if let Some(parent) = opts.get_filename().parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| TrainerError::Connection(sqlx::Error::Io(e)))?;
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(opts)
        .await
        .map_err(TrainerError::Connection)
}

#[derive(Clone)]
pub struct TrainerStorage {
    pool: SqlitePool,
}

impl TrainerStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), TrainerError> {
        // sqlx::query runs a single statement, so split the script
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s)
                .execute(&self.pool)
                .await
                .map_err(TrainerError::Schema)?;
        }
        Ok(())
    }

    pub async fn first_user(&self) -> Result<Option<DbUser>, TrainerError> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT id, username, password FROM users ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn count_users(&self) -> Result<i64, TrainerError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(1) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    /// Insert a user with an already hashed password. Returns the row id.
    pub async fn insert_user(&self, username: &str, password_hash: &str) -> Result<i64, TrainerError> {
        let res = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<DbUser>, TrainerError> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT id, username, password FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<DbUser>, TrainerError> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT id, username, password FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Raw secret bytes of the singleton `app_config` row, if present.
    pub async fn load_secret(&self) -> Result<Option<Vec<u8>>, TrainerError> {
        let rec: Option<(Vec<u8>,)> = sqlx::query_as("SELECT secret FROM app_config WHERE id = ?")
            .bind(APP_CONFIG_ID)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec.map(|r| r.0))
    }

    /// Insert the singleton `app_config` row. A second insert fails with a
    /// unique violation on the pinned primary key.
    pub async fn insert_secret(&self, secret: &[u8]) -> Result<(), TrainerError> {
        sqlx::query("INSERT INTO app_config (id, secret) VALUES (?, ?)")
            .bind(APP_CONFIG_ID)
            .bind(secret)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_app_config(&self) -> Result<i64, TrainerError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(1) FROM app_config")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    pub async fn insert_sound(&self, sound: &DbSound) -> Result<(), TrainerError> {
        sqlx::query("INSERT INTO sounds (id, name, path, picture) VALUES (?, ?, ?, ?)")
            .bind(sound.id)
            .bind(&sound.name)
            .bind(&sound.path)
            .bind(&sound.picture)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_sound(&self, id: i64) -> Result<Option<DbSound>, TrainerError> {
        let sound = sqlx::query_as::<_, DbSound>(
            "SELECT id, name, path, picture FROM sounds WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sound)
    }

    pub async fn insert_question(&self, question: &DbQuestion) -> Result<(), TrainerError> {
        let sound_ids = encode_ids(&question.sound_ids)?;
        sqlx::query("INSERT INTO questions (id, name, sound_ids, difficulty) VALUES (?, ?, ?, ?)")
            .bind(question.id)
            .bind(&question.name)
            .bind(sound_ids)
            .bind(question.difficulty)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_question(&self, id: i64) -> Result<Option<DbQuestion>, TrainerError> {
        let row = sqlx::query("SELECT id, name, sound_ids, difficulty FROM questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_question).transpose()
    }

    pub async fn insert_lesion(&self, lesion: &DbLesion) -> Result<(), TrainerError> {
        let question_ids = encode_ids(&lesion.question_ids)?;
        sqlx::query("INSERT INTO lesions (id, name, question_ids, difficulty) VALUES (?, ?, ?, ?)")
            .bind(lesion.id)
            .bind(&lesion.name)
            .bind(question_ids)
            .bind(lesion.difficulty)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_lesion(&self, id: i64) -> Result<Option<DbLesion>, TrainerError> {
        let row = sqlx::query("SELECT id, name, question_ids, difficulty FROM lesions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_lesion).transpose()
    }

    fn row_to_question(row: SqliteRow) -> Result<DbQuestion, TrainerError> {
        let ids_json: String = row.try_get("sound_ids")?;
        Ok(DbQuestion {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            sound_ids: decode_ids(&ids_json)?,
            difficulty: row.try_get("difficulty")?,
        })
    }

    fn row_to_lesion(row: SqliteRow) -> Result<DbLesion, TrainerError> {
        let ids_json: String = row.try_get("question_ids")?;
        Ok(DbLesion {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            question_ids: decode_ids(&ids_json)?,
            difficulty: row.try_get("difficulty")?,
        })
    }
}

fn encode_ids(ids: &[i64]) -> Result<String, TrainerError> {
    serde_json::to_string(ids).map_err(|e| sqlx::Error::Encode(Box::new(e)).into())
}

fn decode_ids(json: &str) -> Result<Vec<i64>, TrainerError> {
    serde_json::from_str(json).map_err(|e| sqlx::Error::Decode(Box::new(e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_storage() -> TrainerStorage {
        let pool = connect("sqlite::memory:", 1).await.expect("open in-memory db");
        let storage = TrainerStorage::new(pool);
        storage.init_schema().await.expect("init schema");
        storage
    }

    #[tokio::test]
    async fn init_schema_is_repeatable() {
        let storage = memory_storage().await;
        storage.init_schema().await.expect("second init is a no-op");
        storage.insert_user("someone", "hash").await.expect("insert user");
        storage.init_schema().await.expect("third init keeps data");
        assert_eq!(storage.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let storage = memory_storage().await;
        storage.insert_user("admin", "hash").await.unwrap();
        let err = storage.insert_user("admin", "other").await.unwrap_err();
        assert!(err.is_unique_violation(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn app_config_holds_a_single_row() {
        let storage = memory_storage().await;
        assert!(storage.load_secret().await.unwrap().is_none());

        storage.insert_secret(&[7u8; 24]).await.unwrap();
        let err = storage.insert_secret(&[9u8; 24]).await.unwrap_err();
        assert!(err.is_unique_violation(), "unexpected error: {err}");

        assert_eq!(storage.count_app_config().await.unwrap(), 1);
        assert_eq!(storage.load_secret().await.unwrap(), Some(vec![7u8; 24]));
    }

    #[tokio::test]
    async fn app_config_rejects_wrong_secret_length() {
        let storage = memory_storage().await;
        let err = storage.insert_secret(&[1u8; 16]).await.unwrap_err();
        assert!(matches!(err, TrainerError::DatabaseError(_)));
        assert!(!err.is_unique_violation());
    }

    #[tokio::test]
    async fn reference_rows_keep_their_id_lists() {
        let storage = memory_storage().await;
        let sound = DbSound {
            id: 3,
            name: "A4".to_string(),
            path: "a4.ogg".to_string(),
            picture: None,
        };
        let question = DbQuestion {
            id: 10,
            name: "interval".to_string(),
            sound_ids: vec![3, 3],
            difficulty: 2,
        };
        let lesion = DbLesion {
            id: 1,
            name: "intro".to_string(),
            question_ids: vec![10],
            difficulty: 1,
        };
        storage.insert_sound(&sound).await.unwrap();
        storage.insert_question(&question).await.unwrap();
        storage.insert_lesion(&lesion).await.unwrap();

        assert_eq!(storage.get_sound(3).await.unwrap(), Some(sound));
        assert_eq!(storage.get_question(10).await.unwrap(), Some(question));
        assert_eq!(storage.get_lesion(1).await.unwrap(), Some(lesion));
        assert_eq!(storage.get_lesion(2).await.unwrap(), None);
    }
}
