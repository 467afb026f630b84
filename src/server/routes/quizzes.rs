use axum::{extract::State, routing::post, Json, Router};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use sqlx::SqlitePool;

use crate::{
    db::{queries::questions, Question},
    server::{deserializers::LenientId, error::ApiError},
    telemetry::QUIZ_QUESTIONS_CNTR,
};

use super::{ApiResponse, JsonBody};

/// Category type that lifts the category filter.
const ALL_CATEGORIES: &str = "all";

// `id` only matters when a specific category is being played
#[derive(Deserialize)]
struct QuizCategory {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    id: Option<i64>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct QuizRequest {
    quiz_category: QuizCategory,
    previous_questions: Vec<LenientId>,
}

#[derive(Serialize)]
struct NextQuestion {
    success: bool,
    question: Option<Question>,
}

async fn next_question(
    State(pool): State<SqlitePool>,
    JsonBody(request): JsonBody<QuizRequest>,
) -> ApiResponse<NextQuestion> {
    let category = request.quiz_category;
    let filter = if category.kind == ALL_CATEGORIES {
        None
    } else {
        Some(category.id.ok_or(ApiError::Unprocessable)?)
    };
    let previous: Vec<i64> = request.previous_questions.iter().map(|id| id.0).collect();

    let candidates = questions::get_quiz_candidates(&pool, filter, &previous)
        .await
        .map_err(ApiError::unprocessable)?;
    let question = candidates.choose(&mut rand::thread_rng()).cloned();

    if question.is_some() {
        QUIZ_QUESTIONS_CNTR
            .with_label_values(&[category.kind.as_str()])
            .inc();
    }
    tracing::debug!(
        candidates = candidates.len(),
        seen = previous.len(),
        "Picked next quiz question"
    );
    Ok(Json(NextQuestion {
        success: true,
        question,
    }))
}

pub fn quizzes_router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/quizzes", post(next_question))
        .with_state(pool)
}
