//! First-run initialization: schema, the `admin` account and the session secret.
//!
//! Every step checks for existing rows first, so re-running against an
//! initialized database changes nothing. Inserts that lose a race against a
//! concurrent bootstrap hit a unique constraint; that conflict is swallowed
//! and the row written by the winner is read back instead.

use tracing::{debug, info};

use crate::auth::password::hash_password;
use crate::auth::secret::SessionSecret;
use crate::db::sqlite::{TrainerStorage, connect};
use crate::error::TrainerError;

pub const ADMIN_USERNAME: &str = "admin";

/// Connect to `uri`, initialize it, and return the installation secret.
pub async fn ensure_initialized(
    uri: &str,
    initial_admin_password: &str,
) -> Result<SessionSecret, TrainerError> {
    let pool = connect(uri, 1).await?;
    let storage = TrainerStorage::new(pool);
    let secret = initialize(&storage, initial_admin_password).await;
    storage.pool().close().await;
    secret
}

/// Same as [`ensure_initialized`] on an already open storage handle.
pub async fn initialize(
    storage: &TrainerStorage,
    initial_admin_password: &str,
) -> Result<SessionSecret, TrainerError> {
    storage.init_schema().await?;
    ensure_admin(storage, initial_admin_password).await?;
    ensure_secret(storage).await
}

async fn ensure_admin(storage: &TrainerStorage, password: &str) -> Result<(), TrainerError> {
    if storage.first_user().await?.is_some() {
        return Ok(());
    }

    let hash = hash_password(password).await?;
    insert_admin(storage, &hash).await
}

/// Insert `admin`, or settle for the row a concurrent bootstrap already wrote.
async fn insert_admin(storage: &TrainerStorage, hash: &str) -> Result<(), TrainerError> {
    match storage.insert_user(ADMIN_USERNAME, hash).await {
        Ok(id) => {
            info!(user_id = id, "First run, created database with user admin");
            Ok(())
        }
        Err(e) if e.is_unique_violation() => {
            debug!("admin user created concurrently; keeping existing row");
            match storage.first_user().await? {
                Some(_) => Ok(()),
                None => Err(TrainerError::Integrity(
                    "admin insert conflicted but no user row exists".to_string(),
                )),
            }
        }
        Err(e) => Err(e),
    }
}

async fn ensure_secret(storage: &TrainerStorage) -> Result<SessionSecret, TrainerError> {
    if let Some(stored) = storage.load_secret().await? {
        return SessionSecret::try_from(stored);
    }

    store_secret(storage, SessionSecret::generate()).await
}

/// Try to store `candidate`, then return whatever secret storage holds.
async fn store_secret(
    storage: &TrainerStorage,
    candidate: SessionSecret,
) -> Result<SessionSecret, TrainerError> {
    match storage.insert_secret(candidate.as_bytes()).await {
        Ok(()) => info!("First run, created table with secret key for sessions"),
        Err(e) if e.is_unique_violation() => {
            debug!("session secret created concurrently; reading stored row");
        }
        Err(e) => return Err(e),
    }

    // always hand back what storage holds, never the local candidate
    let stored = storage.load_secret().await?.ok_or_else(|| {
        TrainerError::Integrity("session secret missing after insert".to_string())
    })?;
    SessionSecret::try_from(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::auth::secret::SECRET_LENGTH;
    use crate::db::sqlite::SqlitePool;
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};

    async fn fresh_storage() -> TrainerStorage {
        let pool: SqlitePool = connect("sqlite::memory:", 1).await.expect("open in-memory db");
        TrainerStorage::new(pool)
    }

    #[tokio::test]
    async fn first_run_creates_admin_and_secret() {
        let storage = fresh_storage().await;
        let secret = initialize(&storage, "changeme").await.unwrap();

        assert_eq!(secret.as_bytes().len(), SECRET_LENGTH);
        assert_eq!(storage.count_users().await.unwrap(), 1);
        assert_eq!(storage.count_app_config().await.unwrap(), 1);

        let admin = storage
            .find_user_by_username(ADMIN_USERNAME)
            .await
            .unwrap()
            .expect("admin row");
        assert!(verify_password("changeme", &admin.password).await.unwrap());
        assert!(!verify_password("letmein", &admin.password).await.unwrap());
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let storage = fresh_storage().await;
        let first = initialize(&storage, "changeme").await.unwrap();
        let second = initialize(&storage, "something-else").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(storage.count_users().await.unwrap(), 1);
        assert_eq!(storage.count_app_config().await.unwrap(), 1);

        // the later password never replaces the first-run one
        let admin = storage.first_user().await.unwrap().unwrap();
        assert!(verify_password("changeme", &admin.password).await.unwrap());
    }

    #[tokio::test]
    async fn existing_rows_are_left_untouched() {
        let storage = fresh_storage().await;
        storage.init_schema().await.unwrap();
        storage.insert_user("teacher", "not-a-real-hash").await.unwrap();
        storage.insert_secret(&[42u8; SECRET_LENGTH]).await.unwrap();

        let secret = initialize(&storage, "changeme").await.unwrap();

        assert_eq!(secret.as_bytes(), &[42u8; SECRET_LENGTH]);
        assert_eq!(storage.count_users().await.unwrap(), 1);
        assert!(storage.find_user_by_username(ADMIN_USERNAME).await.unwrap().is_none());
        assert_eq!(storage.count_app_config().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn conflicting_secret_insert_returns_the_stored_row() {
        let storage = fresh_storage().await;
        storage.init_schema().await.unwrap();
        let winner = SessionSecret::generate();
        storage.insert_secret(winner.as_bytes()).await.unwrap();

        // a bootstrap that passed the absence check before the winner committed
        let loser = SessionSecret::generate();
        assert_eq!(store_secret(&storage, loser).await.unwrap(), winner);
        assert_eq!(storage.count_app_config().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn conflicting_admin_insert_keeps_the_stored_row() {
        let storage = fresh_storage().await;
        storage.init_schema().await.unwrap();
        let first = hash_password("changeme").await.unwrap();
        storage.insert_user(ADMIN_USERNAME, &first).await.unwrap();

        let second = hash_password("other").await.unwrap();
        insert_admin(&storage, &second).await.unwrap();

        assert_eq!(storage.count_users().await.unwrap(), 1);
        let admin = storage.first_user().await.unwrap().unwrap();
        assert_eq!(admin.password, first);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bootstraps_agree_on_one_secret() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!(
            "ear-trainer-race-{}-{}.sqlite",
            std::process::id(),
            nanos
        ));
        let uri = format!("sqlite://{}", path.display());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let uri = uri.clone();
                tokio::spawn(async move { ensure_initialized(&uri, "changeme").await })
            })
            .collect();
        let mut secrets = Vec::new();
        for task in tasks {
            secrets.push(task.await.expect("task panicked").expect("bootstrap failed"));
        }
        assert!(secrets.windows(2).all(|w| w[0] == w[1]));

        let storage = TrainerStorage::new(connect(&uri, 1).await.unwrap());
        assert_eq!(storage.count_users().await.unwrap(), 1);
        assert_eq!(storage.count_app_config().await.unwrap(), 1);
        storage.pool().close().await;

        remove_db_files(&path);
    }

    #[tokio::test]
    async fn read_only_database_is_a_schema_error() {
        // single connection, so the pragma sticks for the bootstrap below
        let storage = fresh_storage().await;
        sqlx::query("PRAGMA query_only = ON")
            .execute(storage.pool())
            .await
            .expect("set query_only");

        let err = initialize(&storage, "changeme").await.unwrap_err();
        assert!(matches!(err, TrainerError::Schema(_)), "unexpected error: {err}");
    }

    fn remove_db_files(path: &Path) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }

    #[tokio::test]
    async fn independent_databases_get_independent_secrets() {
        let a = ensure_initialized("sqlite::memory:", "changeme").await.unwrap();
        let b = ensure_initialized("sqlite::memory:", "changeme").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn unreachable_database_is_a_connection_error() {
        let err = ensure_initialized("sqlite:///dev/null/nested/trainer.sqlite", "changeme")
            .await
            .unwrap_err();
        assert!(matches!(err, TrainerError::Connection(_)), "unexpected error: {err}");
    }
}
