use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories, questions},
        NewQuestion, Question,
    },
    server::{
        deserializers::RowId,
        error::ApiError,
        pagination::{paginate, PageParams},
    },
    telemetry::{QUESTIONS_CREATED_CNTR, QUESTIONS_DELETED_CNTR},
};

use super::{categories::category_map, ApiResponse, IdPath, JsonBody, QueryParams};

const ALL_CATEGORIES: &str = "All";

#[derive(Deserialize)]
struct QuestionSubmission {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    difficulty: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    category: Option<i64>,
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(rename = "searchTerm", default)]
    search_term: Option<Value>,
}

impl SearchBody {
    /// The text to look for. Scalars are matched by their printed form; null,
    /// empty and zero-like terms mean no filter at all.
    fn term(self) -> Result<String, ApiError> {
        match self.search_term {
            None | Some(Value::Bool(false)) => Ok(String::new()),
            Some(Value::Bool(true)) => Ok("true".to_owned()),
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(String::new()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ApiError::not_found(format!(
                "search term {other} is not a scalar"
            ))),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionsPage {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<BTreeMap<i64, String>>,
    current_category: &'static str,
}

#[derive(Serialize)]
struct QuestionBody {
    success: bool,
    question: Question,
}

#[derive(Serialize)]
struct Deleted {
    success: bool,
    deleted: i64,
}

#[derive(Serialize)]
struct Created {
    success: bool,
    created: i64,
}

async fn list_questions(
    State(pool): State<SqlitePool>,
    QueryParams(params): QueryParams<PageParams>,
) -> ApiResponse<QuestionsPage> {
    let all = questions::get_all_questions(&pool)
        .await
        .map_err(ApiError::unprocessable)?;
    let current = paginate(&all, params.page());
    let categories = categories::get_all_categories(&pool)
        .await
        .map_err(ApiError::unprocessable)?;

    if current.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(QuestionsPage {
        success: true,
        questions: current,
        total_questions: all.len(),
        categories: Some(category_map(categories)),
        current_category: ALL_CATEGORIES,
    }))
}

async fn get_question(
    State(pool): State<SqlitePool>,
    IdPath(RowId(id)): IdPath<RowId>,
) -> ApiResponse<QuestionBody> {
    let question = questions::get_question(&pool, id)
        .await
        .map_err(ApiError::not_found)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(QuestionBody {
        success: true,
        question,
    }))
}

// a missing id is reported as unprocessable, like any other delete failure
async fn delete_question(
    State(pool): State<SqlitePool>,
    IdPath(RowId(id)): IdPath<RowId>,
) -> ApiResponse<Deleted> {
    questions::delete_question(&pool, id)
        .await
        .map_err(ApiError::unprocessable)?;
    QUESTIONS_DELETED_CNTR.inc();
    tracing::info!(id, "Deleted question");
    Ok(Json(Deleted {
        success: true,
        deleted: id,
    }))
}

async fn create_question(
    State(pool): State<SqlitePool>,
    JsonBody(submission): JsonBody<QuestionSubmission>,
) -> ApiResponse<Created> {
    let id = questions::create_question(
        &pool,
        NewQuestion {
            question: submission.question,
            answer: submission.answer,
            category: submission.category,
            difficulty: submission.difficulty,
        },
    )
    .await
    .map_err(ApiError::unprocessable)?;
    QUESTIONS_CREATED_CNTR.inc();
    tracing::info!(id, "Created question");
    Ok(Json(Created {
        success: true,
        created: id,
    }))
}

// every failure on this route, body decoding included, is reported as not found
async fn search_questions(
    State(pool): State<SqlitePool>,
    QueryParams(params): QueryParams<PageParams>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> ApiResponse<QuestionsPage> {
    let Json(body) = body.map_err(ApiError::not_found)?;
    let term = body.term()?;
    let found = questions::search_questions(&pool, &term)
        .await
        .map_err(ApiError::not_found)?;

    Ok(Json(QuestionsPage {
        success: true,
        questions: paginate(&found, params.page()),
        total_questions: found.len(),
        categories: None,
        current_category: ALL_CATEGORIES,
    }))
}

pub fn questions_router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/questions", get(list_questions).post(create_question))
        .route("/questions/search", post(search_questions))
        .route("/questions/{id}", get(get_question).delete(delete_question))
        .with_state(pool)
}
