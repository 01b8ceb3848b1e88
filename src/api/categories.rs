//! Product category operations

use chrono::Utc;
use tracing::info;

use super::{optional_text, parse_id, required_text, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH};
use crate::database::Database;
use crate::error::{AppError, DbError};
use crate::models::{
    Category, CategoryResponse, CreateCategoryRequest, Meta, PageQuery, Pagination,
    UpdateCategoryRequest,
};

fn not_found() -> AppError {
    AppError::NotFound("category not found".to_string())
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

pub async fn create_category<D: Database>(
    database: &D,
    req: &CreateCategoryRequest,
) -> Result<CategoryResponse, AppError> {
    let name = required_text("name", &req.name, MAX_NAME_LENGTH)?;
    let category = Category::new(name, description(&req.description)?);

    database.create_category(&category).await?;

    info!(category_id = %category.id, "Category created");
    Ok(CategoryResponse::from(&category))
}

pub async fn get_category<D: Database>(
    database: &D,
    id: &str,
) -> Result<CategoryResponse, AppError> {
    let id = parse_id("id", id)?;
    let category = database.get_category(id).await?.ok_or_else(not_found)?;
    Ok(CategoryResponse::from(&category))
}

pub async fn list_categories<D: Database>(
    database: &D,
    query: &PageQuery,
) -> Result<(Vec<CategoryResponse>, Meta), AppError> {
    let page = Pagination::from_query(query)?;
    let categories = database.list_categories(page.limit, page.offset()).await?;
    let total = database.count_categories().await?;

    Ok((
        categories.iter().map(CategoryResponse::from).collect(),
        page.meta(total),
    ))
}

pub async fn update_category<D: Database>(
    database: &D,
    id: &str,
    req: &UpdateCategoryRequest,
) -> Result<CategoryResponse, AppError> {
    let id = parse_id("id", id)?;
    let mut category = database.get_category(id).await?.ok_or_else(not_found)?;

    if let Some(name) = optional_text("name", req.name.as_deref(), 1, MAX_NAME_LENGTH)? {
        category.name = name;
    }
    if let Some(desc) = req.description.as_deref() {
        let desc = description(desc)?;
        if !desc.is_empty() {
            category.description = desc;
        }
    }
    category.updated_at = Utc::now();

    database.update_category(&category).await.map_err(|e| match e {
        DbError::NotFound => not_found(),
        other => other.into(),
    })?;

    info!(category_id = %category.id, "Category updated");
    Ok(CategoryResponse::from(&category))
}

/// Delete a category; refused while any product references it
pub async fn delete_category<D: Database>(database: &D, id: &str) -> Result<(), AppError> {
    let id = parse_id("id", id)?;
    database.delete_category(id).await.map_err(|e| match e {
        DbError::NotFound => not_found(),
        DbError::ConstraintViolation(_) => {
            AppError::Conflict("category is still used by products".to_string())
        }
        other => other.into(),
    })?;

    info!(category_id = %id, "Category deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MockDatabase, SqliteDatabase};
    use crate::models::{Product, User, Vendor};
    use uuid::Uuid;

    // Test 1: create, read, update
    #[tokio::test]
    async fn test_category_lifecycle() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        let created = create_category(
            &db,
            &CreateCategoryRequest {
                name: " Tools ".to_string(),
                description: "Hand tools".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.name, "Tools");

        let id = created.id.to_string();
        let updated = update_category(
            &db,
            &id,
            &UpdateCategoryRequest {
                name: None,
                description: Some("Hand and power tools".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Tools");
        assert_eq!(updated.description, "Hand and power tools");

        assert_eq!(get_category(&db, &id).await.unwrap().description, "Hand and power tools");
    }

    // Test 2: name required
    #[tokio::test]
    async fn test_create_category_requires_name() {
        let mock = MockDatabase::new();
        assert!(matches!(
            create_category(
                &mock,
                &CreateCategoryRequest {
                    name: String::new(),
                    description: String::new(),
                },
            )
            .await,
            Err(AppError::Validation(_))
        ));
    }

    // Test 3: category in use cannot be deleted
    #[tokio::test]
    async fn test_delete_category_in_use() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let user = User::new("alice", "alice@example.com", "hash");
        db.create_user(&user).await.unwrap();
        let vendor = Vendor::new("Acme", "", user.id);
        db.create_vendor(&vendor).await.unwrap();
        let category = Category::new("Tools", "");
        db.create_category(&category).await.unwrap();
        db.create_product(&Product::new("Hammer", 1.0, "", category.id, vendor.id))
            .await
            .unwrap();

        assert!(matches!(
            delete_category(&db, &category.id.to_string()).await,
            Err(AppError::Conflict(_))
        ));
    }

    // Test 4: pagination over the maximum is rejected
    #[tokio::test]
    async fn test_list_categories_limit() {
        let mock = MockDatabase::new();
        let query = PageQuery {
            limit: Some("500".to_string()),
            page: None,
        };
        assert!(matches!(
            list_categories(&mock, &query).await,
            Err(AppError::Validation(_))
        ));
    }

    // Test 5: unknown id is 404
    #[tokio::test]
    async fn test_delete_unknown_category() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        assert!(matches!(
            delete_category(&db, &Uuid::new_v4().to_string()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
