//! User account operations
//!
//! Registration and login live on [`AuthManager`]. The operations here act on
//! an existing account; writes always target the authenticated caller.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{
    optional_text, parse_id, validate_email, validate_password, MAX_USER_NAME_LENGTH,
    MIN_USER_NAME_LENGTH,
};
use crate::auth::{AuthManager, Identity};
use crate::database::Database;
use crate::error::{AppError, DbError};
use crate::models::{ChangePasswordRequest, UpdateUserRequest, User, UserResponse};

async fn load_user<D: Database>(database: &D, id: Uuid) -> Result<User, AppError> {
    database
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))
}

fn email_taken() -> AppError {
    AppError::Conflict("email already registered".to_string())
}

/// Read any user by id
pub async fn get_user<D: Database>(database: &D, id: &str) -> Result<UserResponse, AppError> {
    let id = parse_id("id", id)?;
    let user = load_user(database, id).await?;
    Ok(UserResponse::from(&user))
}

/// Update the caller's profile
///
/// Absent or blank fields keep their current value. A new password is hashed
/// before it is stored.
pub async fn update_user<D: Database>(
    database: &D,
    auth: &AuthManager<D>,
    identity: &Identity,
    req: &UpdateUserRequest,
) -> Result<UserResponse, AppError> {
    let mut user = load_user(database, identity.user_id).await?;

    if let Some(user_name) = optional_text(
        "user_name",
        req.user_name.as_deref(),
        MIN_USER_NAME_LENGTH,
        MAX_USER_NAME_LENGTH,
    )? {
        user.user_name = user_name;
    }

    if let Some(email) = req.email.as_deref().filter(|e| !e.trim().is_empty()) {
        let email = validate_email(email)?;
        if !email.eq_ignore_ascii_case(&user.email) {
            if let Some(other) = database.get_user_by_email(&email).await? {
                if other.id != user.id {
                    return Err(email_taken());
                }
            }
        }
        user.email = email;
    }

    let new_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            validate_password("password", password)?;
            Some(auth.hash_password(password).await?)
        }
        None => None,
    };

    user.updated_at = Utc::now();
    match database.update_user(&user).await {
        Ok(()) => {}
        Err(DbError::ConstraintViolation(_)) => return Err(email_taken()),
        Err(e) => return Err(e.into()),
    }

    if let Some(hash) = new_hash {
        database.update_user_password(user.id, &hash).await?;
        user.password_hash = hash;
    }

    info!(user_id = %user.id, "User updated");
    Ok(UserResponse::from(&user))
}

/// Change the caller's password after checking the current one
pub async fn change_password<D: Database>(
    database: &D,
    auth: &AuthManager<D>,
    identity: &Identity,
    req: &ChangePasswordRequest,
) -> Result<(), AppError> {
    if req.old_password.is_empty() {
        return Err(AppError::Validation("old_password is required".to_string()));
    }
    validate_password("new_password", &req.new_password)?;

    let user = load_user(database, identity.user_id).await?;
    if !auth
        .verify_password(&user.password_hash, &req.old_password)
        .await?
    {
        return Err(AppError::Validation(
            "old_password is incorrect".to_string(),
        ));
    }

    let hash = auth.hash_password(&req.new_password).await?;
    database.update_user_password(user.id, &hash).await?;

    info!(user_id = %user.id, "Password changed");
    Ok(())
}

/// Delete the caller's account
///
/// The caller's vendor and its products go with it.
pub async fn delete_user<D: Database>(database: &D, identity: &Identity) -> Result<(), AppError> {
    database
        .delete_user(identity.user_id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => AppError::NotFound("user not found".to_string()),
            other => other.into(),
        })?;

    info!(user_id = %identity.user_id, "User deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{hash_password, verify_password};
    use crate::auth::{CredentialVerifier, TokenService};
    use crate::database::{MockDatabase, SqliteDatabase};
    use crate::otel::AuthMetrics;
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup() -> (Arc<SqliteDatabase>, AuthManager<SqliteDatabase>) {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let auth = AuthManager::new(
            Arc::clone(&db),
            Arc::new(
                TokenService::new(
                    "users-test-secret-with-enough-length",
                    chrono::Duration::hours(72),
                )
                .unwrap(),
            ),
            CredentialVerifier::new(Duration::from_secs(30)),
            Arc::new(AuthMetrics::from_global()),
        );
        (db, auth)
    }

    async fn seed_user(db: &SqliteDatabase, name: &str, email: &str) -> User {
        let user = User::new(name, email, hash_password("secret1").unwrap());
        db.create_user(&user).await.unwrap();
        user
    }

    fn identity_of(user: &User) -> Identity {
        Identity::new(user.id, user.role.clone())
    }

    // Test 1: get_user parses the id and hides the hash
    #[tokio::test]
    async fn test_get_user() {
        let (db, _) = setup().await;
        let user = seed_user(&db, "alice", "alice@example.com").await;

        let response = get_user(db.as_ref(), &user.id.to_string()).await.unwrap();
        assert_eq!(response.email, "alice@example.com");

        assert!(matches!(
            get_user(db.as_ref(), "42").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            get_user(db.as_ref(), &Uuid::new_v4().to_string()).await,
            Err(AppError::NotFound(_))
        ));
    }

    // Test 2: blank fields keep current values
    #[tokio::test]
    async fn test_update_user_partial() {
        let (db, auth) = setup().await;
        let user = seed_user(&db, "alice", "alice@example.com").await;

        let response = update_user(
            db.as_ref(),
            &auth,
            &identity_of(&user),
            &UpdateUserRequest {
                user_name: Some("alicia".to_string()),
                email: Some("  ".to_string()),
                password: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.user_name, "alicia");
        assert_eq!(response.email, "alice@example.com");
        let stored = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, user.password_hash);
    }

    // Test 3: email taken by another account conflicts
    #[tokio::test]
    async fn test_update_user_email_conflict() {
        let (db, auth) = setup().await;
        let alice = seed_user(&db, "alice", "alice@example.com").await;
        seed_user(&db, "bob", "bob@example.com").await;

        let err = update_user(
            db.as_ref(),
            &auth,
            &identity_of(&alice),
            &UpdateUserRequest {
                email: Some("BOB@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err, AppError::Conflict("email already registered".to_string()));
    }

    // Test 4: password in profile update is hashed
    #[tokio::test]
    async fn test_update_user_password() {
        let (db, auth) = setup().await;
        let user = seed_user(&db, "alice", "alice@example.com").await;

        update_user(
            db.as_ref(),
            &auth,
            &identity_of(&user),
            &UpdateUserRequest {
                password: Some("newsecret".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stored = db.get_user(user.id).await.unwrap().unwrap();
        assert!(verify_password(&stored.password_hash, "newsecret").unwrap());
    }

    // Test 5: change_password checks the old password
    #[tokio::test]
    async fn test_change_password() {
        let (db, auth) = setup().await;
        let user = seed_user(&db, "alice", "alice@example.com").await;
        let identity = identity_of(&user);

        let wrong = change_password(
            db.as_ref(),
            &auth,
            &identity,
            &ChangePasswordRequest {
                old_password: "nope123".to_string(),
                new_password: "newsecret".to_string(),
            },
        )
        .await;
        assert!(matches!(wrong, Err(AppError::Validation(_))));

        change_password(
            db.as_ref(),
            &auth,
            &identity,
            &ChangePasswordRequest {
                old_password: "secret1".to_string(),
                new_password: "newsecret".to_string(),
            },
        )
        .await
        .unwrap();

        let stored = db.get_user(user.id).await.unwrap().unwrap();
        assert!(verify_password(&stored.password_hash, "newsecret").unwrap());
        assert!(!verify_password(&stored.password_hash, "secret1").unwrap());
    }

    // Test 6: delete removes the caller only once
    #[tokio::test]
    async fn test_delete_user() {
        let (db, _) = setup().await;
        let user = seed_user(&db, "alice", "alice@example.com").await;
        let identity = identity_of(&user);

        delete_user(db.as_ref(), &identity).await.unwrap();
        assert!(db.get_user(user.id).await.unwrap().is_none());
        assert!(matches!(
            delete_user(db.as_ref(), &identity).await,
            Err(AppError::NotFound(_))
        ));
    }

    // Test 7: storage failure is internal
    #[tokio::test]
    async fn test_get_user_storage_failure() {
        let mut mock = MockDatabase::new();
        mock.expect_get_user()
            .returning(|_| Err(DbError::Connection("closed".to_string())));

        assert!(matches!(
            get_user(&mock, &Uuid::new_v4().to_string()).await,
            Err(AppError::Internal(_))
        ));
    }
}
