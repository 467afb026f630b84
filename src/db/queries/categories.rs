use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteExecutor, FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
}

pub async fn get_all_categories<'e>(
    executor: impl SqliteExecutor<'e>,
) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, type FROM categories ORDER BY id
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn get_category(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, type FROM categories WHERE categories.id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create_category<'e>(
    executor: impl SqliteExecutor<'e>,
    id: Option<i64>,
    kind: &str,
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO categories (id, type) VALUES (?1, ?2)
        "#,
    )
    .bind(id)
    .bind(kind)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn update_category<'e>(
    executor: impl SqliteExecutor<'e>,
    category: Category,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE categories SET type = ?1 WHERE categories.id = ?2
        "#,
    )
    .bind(category.kind)
    .bind(category.id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_category<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM categories WHERE categories.id = ?1
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Makes the stored categories match `categories` exactly, keeping ids.
/// Nothing changes unless every row is accepted.
pub async fn import_categories(pool: &SqlitePool, categories: Vec<Category>) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    let existing: HashSet<i64> = get_all_categories(&mut *tx)
        .await?
        .iter()
        .map(|c| c.id)
        .collect();
    let incoming: HashSet<i64> = categories.iter().map(|c| c.id).collect();
    for id in existing.difference(&incoming) {
        delete_category(&mut *tx, *id).await?;
    }
    for category in categories {
        if existing.contains(&category.id) {
            update_category(&mut *tx, category).await?;
        } else {
            create_category(&mut *tx, Some(category.id), &category.kind).await?;
        }
    }
    tx.commit().await
}
