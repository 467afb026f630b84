use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories, questions},
        Category, Question,
    },
    server::{deserializers::RowId, error::ApiError},
};

use super::{ApiResponse, IdPath};

#[derive(Serialize)]
struct CategoriesBody {
    success: bool,
    categories: BTreeMap<i64, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryQuestionsBody {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: String,
}

/// `{id: type}` lookup table the front-end renders category names from.
pub(super) fn category_map(categories: Vec<Category>) -> BTreeMap<i64, String> {
    categories.into_iter().map(|c| (c.id, c.kind)).collect()
}

async fn get_categories(State(pool): State<SqlitePool>) -> ApiResponse<CategoriesBody> {
    let categories = categories::get_all_categories(&pool)
        .await
        .map_err(ApiError::unprocessable)?;
    if categories.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(CategoriesBody {
        success: true,
        categories: category_map(categories),
    }))
}

// the whole match list is returned, there is no paging on this route
async fn get_questions_by_category(
    State(pool): State<SqlitePool>,
    IdPath(RowId(category_id)): IdPath<RowId>,
) -> ApiResponse<CategoryQuestionsBody> {
    let category = categories::get_category(&pool, category_id)
        .await
        .map_err(ApiError::not_found)?
        .ok_or(ApiError::NotFound)?;
    let questions = questions::get_questions_for_category(&pool, category_id)
        .await
        .map_err(ApiError::not_found)?;

    Ok(Json(CategoryQuestionsBody {
        success: true,
        total_questions: questions.len(),
        questions,
        current_category: category.kind,
    }))
}

pub fn category_router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route(
            "/categories/{category_id}/questions",
            get(get_questions_by_category),
        )
        .with_state(pool)
}
