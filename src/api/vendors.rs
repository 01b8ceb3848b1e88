//! Vendor operations
//!
//! A user owns at most one vendor. Creation is guarded by
//! [`OwnershipGuard::ensure_can_create_vendor`] and the owner is always the
//! caller, whatever the request body says.

use chrono::Utc;
use tracing::{debug, info};

use super::{optional_text, parse_id, required_text, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH};
use crate::auth::{Identity, OwnershipGuard};
use crate::database::Database;
use crate::error::{AppError, DbError};
use crate::models::{
    CreateVendorRequest, Meta, PageQuery, Pagination, UpdateVendorRequest, Vendor, VendorResponse,
};

fn not_found() -> AppError {
    AppError::NotFound("vendor not found".to_string())
}

fn description(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Create the caller's vendor
pub async fn create_vendor<D: Database>(
    database: &D,
    guard: &OwnershipGuard<D>,
    identity: &Identity,
    req: &CreateVendorRequest,
) -> Result<VendorResponse, AppError> {
    let vendor_name = required_text("vendor_name", &req.vendor_name, MAX_NAME_LENGTH)?;
    let description = description(&req.description)?;

    if let Some(claimed) = req.user_id.as_deref() {
        if claimed != identity.user_id.to_string() {
            debug!(claimed, "Ignoring user_id in vendor request");
        }
    }

    guard.ensure_can_create_vendor(identity).await?;

    let mut vendor = Vendor::new(vendor_name, description, identity.user_id);
    database
        .create_vendor(&vendor)
        .await
        .map_err(|e| guard.vendor_insert_error(identity, e))?;

    if let Some(stored) = database.get_vendor(vendor.id).await? {
        vendor = stored;
    }

    info!(vendor_id = %vendor.id, user_id = %identity.user_id, "Vendor created");
    Ok(VendorResponse::from(&vendor))
}

/// Read a vendor by id
pub async fn get_vendor<D: Database>(database: &D, id: &str) -> Result<VendorResponse, AppError> {
    let id = parse_id("id", id)?;
    let vendor = database.get_vendor(id).await?.ok_or_else(not_found)?;
    Ok(VendorResponse::from(&vendor))
}

/// List vendors with pagination
pub async fn list_vendors<D: Database>(
    database: &D,
    query: &PageQuery,
) -> Result<(Vec<VendorResponse>, Meta), AppError> {
    let page = Pagination::from_query(query)?;
    let vendors = database.list_vendors(page.limit, page.offset()).await?;
    let total = database.count_vendors().await?;

    Ok((
        vendors.iter().map(VendorResponse::from).collect(),
        page.meta(total),
    ))
}

/// Update a vendor's name and description
pub async fn update_vendor<D: Database>(
    database: &D,
    id: &str,
    req: &UpdateVendorRequest,
) -> Result<VendorResponse, AppError> {
    let id = parse_id("id", id)?;
    let mut vendor = database.get_vendor(id).await?.ok_or_else(not_found)?;

    if let Some(name) = optional_text("vendor_name", req.vendor_name.as_deref(), 1, MAX_NAME_LENGTH)? {
        vendor.vendor_name = name;
    }
    if let Some(desc) = req.description.as_deref() {
        let desc = description(desc)?;
        if !desc.is_empty() {
            vendor.description = desc;
        }
    }
    vendor.updated_at = Utc::now();

    database.update_vendor(&vendor).await.map_err(|e| match e {
        DbError::NotFound => not_found(),
        other => other.into(),
    })?;

    info!(vendor_id = %vendor.id, "Vendor updated");
    Ok(VendorResponse::from(&vendor))
}

/// Delete a vendor and its products
pub async fn delete_vendor<D: Database>(database: &D, id: &str) -> Result<(), AppError> {
    let id = parse_id("id", id)?;
    database.delete_vendor(id).await.map_err(|e| match e {
        DbError::NotFound => not_found(),
        other => other.into(),
    })?;

    info!(vendor_id = %id, "Vendor deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MockDatabase, SqliteDatabase};
    use crate::models::User;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn setup() -> (Arc<SqliteDatabase>, OwnershipGuard<SqliteDatabase>, User) {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let user = User::new("alice", "alice@example.com", "hash");
        db.create_user(&user).await.unwrap();
        let guard = OwnershipGuard::new(Arc::clone(&db));
        (db, guard, user)
    }

    fn request(name: &str, user_id: Option<&str>) -> CreateVendorRequest {
        CreateVendorRequest {
            vendor_name: name.to_string(),
            description: "Industrial supplies".to_string(),
            user_id: user_id.map(String::from),
        }
    }

    // Test 1: vendor is owned by the caller, not the body's user_id
    #[tokio::test]
    async fn test_create_vendor_owner_is_caller() {
        let (db, guard, user) = setup().await;
        let identity = Identity::new(user.id, user.role.clone());
        let other = Uuid::new_v4().to_string();

        let vendor = create_vendor(db.as_ref(), &guard, &identity, &request("Acme", Some(&other)))
            .await
            .unwrap();

        assert_eq!(vendor.user_id, user.id);
        assert_eq!(vendor.user_name, "alice");
    }

    // Test 2: second vendor for the same user conflicts
    #[tokio::test]
    async fn test_create_vendor_twice_conflicts() {
        let (db, guard, user) = setup().await;
        let identity = Identity::new(user.id, user.role.clone());

        create_vendor(db.as_ref(), &guard, &identity, &request("Acme", None))
            .await
            .unwrap();
        let err = create_vendor(db.as_ref(), &guard, &identity, &request("Acme 2", None))
            .await
            .unwrap_err();

        assert_eq!(err, AppError::Conflict("User already has a vendor".to_string()));
    }

    // Test 3: lost insert race is also a conflict
    #[tokio::test]
    async fn test_create_vendor_insert_race() {
        let identity = Identity::new(Uuid::new_v4(), "user".to_string());
        let mut mock = MockDatabase::new();
        mock.expect_get_user()
            .returning(|_| Ok(Some(User::new("alice", "a@example.com", "h"))));
        mock.expect_get_vendor_by_user().returning(|_| Ok(None));
        mock.expect_create_vendor()
            .returning(|_| Err(DbError::ConstraintViolation("vendors.user_id".to_string())));
        let mock = Arc::new(mock);
        let guard = OwnershipGuard::new(Arc::clone(&mock));

        let err = create_vendor(mock.as_ref(), &guard, &identity, &request("Acme", None))
            .await
            .unwrap_err();

        assert_eq!(err, AppError::Conflict("User already has a vendor".to_string()));
    }

    // Test 4: name is required
    #[tokio::test]
    async fn test_create_vendor_validation() {
        let (db, guard, user) = setup().await;
        let identity = Identity::new(user.id, user.role.clone());

        assert!(matches!(
            create_vendor(db.as_ref(), &guard, &identity, &request("  ", None)).await,
            Err(AppError::Validation(_))
        ));
        assert!(db.get_vendor_by_user(user.id).await.unwrap().is_none());
    }

    // Test 5: list returns pagination metadata
    #[tokio::test]
    async fn test_list_vendors_meta() {
        let (db, _, _) = setup().await;
        for i in 0..3 {
            let owner = User::new(format!("user{}", i), format!("u{}@example.com", i), "h");
            db.create_user(&owner).await.unwrap();
            db.create_vendor(&Vendor::new(format!("Vendor {}", i), "", owner.id))
                .await
                .unwrap();
        }

        let (vendors, meta) = list_vendors(
            db.as_ref(),
            &PageQuery {
                limit: Some("2".to_string()),
                page: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(vendors.len(), 2);
        assert_eq!(meta.per_page, 2);
        assert!(meta.has_more);
    }

    // Test 6: update keeps blank fields, delete then 404
    #[tokio::test]
    async fn test_update_and_delete_vendor() {
        let (db, guard, user) = setup().await;
        let identity = Identity::new(user.id, user.role.clone());
        let created = create_vendor(db.as_ref(), &guard, &identity, &request("Acme", None))
            .await
            .unwrap();
        let id = created.id.to_string();

        let updated = update_vendor(
            db.as_ref(),
            &id,
            &UpdateVendorRequest {
                vendor_name: Some("Acme Corp".to_string()),
                description: Some(String::new()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.vendor_name, "Acme Corp");
        assert_eq!(updated.description, "Industrial supplies");

        delete_vendor(db.as_ref(), &id).await.unwrap();
        assert!(matches!(
            get_vendor(db.as_ref(), &id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_vendor(db.as_ref(), &id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
