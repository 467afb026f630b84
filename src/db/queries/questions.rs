use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteExecutor, FromRow, QueryBuilder, Sqlite, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

/// Fields of a question about to be inserted. Nothing is checked up front,
/// the table constraints decide what gets stored.
#[derive(Debug, Clone, Default)]
pub struct NewQuestion {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<i64>,
    pub difficulty: Option<i64>,
}

const SELECT_QUESTIONS: &str = "SELECT id, question, answer, category, difficulty FROM questions";

pub async fn get_all_questions<'e>(
    executor: impl SqliteExecutor<'e>,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!("{SELECT_QUESTIONS} ORDER BY id"))
        .fetch_all(executor)
        .await
}

pub async fn get_question(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Question>> {
    sqlx::query_as::<_, Question>(&format!("{SELECT_QUESTIONS} WHERE questions.id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_questions_for_category(
    pool: &SqlitePool,
    category: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!(
        "{SELECT_QUESTIONS} WHERE questions.category = ?1 ORDER BY id"
    ))
    .bind(category)
    .fetch_all(pool)
    .await
}

/// Questions whose text contains `term`, ignoring case. LIKE wildcards in
/// `term` are matched literally.
pub async fn search_questions(pool: &SqlitePool, term: &str) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!(
        r"{SELECT_QUESTIONS} WHERE questions.question LIKE ?1 ESCAPE '\' ORDER BY id"
    ))
    .bind(format!("%{}%", escape_like(term)))
    .fetch_all(pool)
    .await
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Questions a quiz may still ask: optionally restricted to one category and
/// never one of `previous`.
pub async fn get_quiz_candidates(
    pool: &SqlitePool,
    category: Option<i64>,
    previous: &[i64],
) -> sqlx::Result<Vec<Question>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_QUESTIONS);
    query.push(" WHERE 1 = 1");
    if let Some(category) = category {
        query.push(" AND questions.category = ").push_bind(category);
    }
    if !previous.is_empty() {
        query.push(" AND questions.id NOT IN (");
        let mut ids = query.separated(", ");
        for id in previous {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
    }
    query.push(" ORDER BY id");
    query.build_query_as::<Question>().fetch_all(pool).await
}

pub async fn create_question(pool: &SqlitePool, question: NewQuestion) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO questions (question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(question.question)
    .bind(question.answer)
    .bind(question.category)
    .bind(question.difficulty)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn update_question<'e>(
    executor: impl SqliteExecutor<'e>,
    question: Question,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE questions SET question = ?1, answer = ?2, category = ?3, difficulty = ?4
        WHERE questions.id = ?5
        "#,
    )
    .bind(question.question)
    .bind(question.answer)
    .bind(question.category)
    .bind(question.difficulty)
    .bind(question.id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Fails with [`sqlx::Error::RowNotFound`] when there is nothing to delete.
pub async fn delete_question<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> sqlx::Result<()> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?
    .rows_affected();

    if deleted == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

/// Makes the stored questions match `questions` exactly, keeping ids.
/// Nothing changes unless every row is accepted.
pub async fn import_questions(pool: &SqlitePool, questions: Vec<Question>) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    let existing: HashSet<i64> = get_all_questions(&mut *tx)
        .await?
        .iter()
        .map(|q| q.id)
        .collect();
    let incoming: HashSet<i64> = questions.iter().map(|q| q.id).collect();
    for id in existing.difference(&incoming) {
        delete_question(&mut *tx, *id).await?;
    }
    for question in questions {
        if existing.contains(&question.id) {
            update_question(&mut *tx, question).await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO questions (id, question, answer, category, difficulty)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(question.id)
            .bind(question.question)
            .bind(question.answer)
            .bind(question.category)
            .bind(question.difficulty)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_question(text: &str, category: i64) -> NewQuestion {
        NewQuestion {
            question: Some(text.to_owned()),
            answer: Some("answer".to_owned()),
            category: Some(category),
            difficulty: Some(1),
        }
    }

    #[tokio::test]
    async fn created_question_can_be_read_back() {
        let pool = test_pool().await;
        let id = create_question(&pool, new_question("Who painted the Mona Lisa?", 2))
            .await
            .unwrap();

        let question = get_question(&pool, id).await.unwrap().unwrap();
        assert_eq!(question.question, "Who painted the Mona Lisa?");
        assert_eq!(question.answer, "answer");
        assert_eq!(question.category, 2);
        assert_eq!(question.difficulty, 1);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_by_the_store() {
        let pool = test_pool().await;
        let result = create_question(
            &pool,
            NewQuestion {
                question: Some("No answer".to_owned()),
                ..Default::default()
            },
        )
        .await;
        assert!(result.is_err());
        assert!(get_all_questions(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_row_and_reports_missing() {
        let pool = test_pool().await;
        let id = create_question(&pool, new_question("Gone soon", 1))
            .await
            .unwrap();

        delete_question(&pool, id).await.unwrap();
        assert_eq!(get_question(&pool, id).await.unwrap(), None);
        assert!(matches!(
            delete_question(&pool, id).await,
            Err(sqlx::Error::RowNotFound)
        ));
    }

    #[tokio::test]
    async fn search_ignores_case_and_wildcards() {
        let pool = test_pool().await;
        let title = create_question(&pool, new_question("What is the TITLE of the book?", 1))
            .await
            .unwrap();
        let percent = create_question(&pool, new_question("What is 50% of 10?", 1))
            .await
            .unwrap();
        create_question(&pool, new_question("What is 500 of 10?", 1))
            .await
            .unwrap();

        let found: Vec<i64> = search_questions(&pool, "title")
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(found, vec![title]);

        let found: Vec<i64> = search_questions(&pool, "0%")
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(found, vec![percent]);
    }

    #[tokio::test]
    async fn quiz_candidates_skip_previous_and_other_categories() {
        let pool = test_pool().await;
        let a = create_question(&pool, new_question("a", 1)).await.unwrap();
        let b = create_question(&pool, new_question("b", 1)).await.unwrap();
        let c = create_question(&pool, new_question("c", 2)).await.unwrap();

        fn ids(questions: Vec<Question>) -> Vec<i64> {
            questions.into_iter().map(|q| q.id).collect()
        }

        assert_eq!(
            ids(get_quiz_candidates(&pool, None, &[]).await.unwrap()),
            vec![a, b, c]
        );
        assert_eq!(
            ids(get_quiz_candidates(&pool, None, &[a, c]).await.unwrap()),
            vec![b]
        );
        assert_eq!(
            ids(get_quiz_candidates(&pool, Some(1), &[b]).await.unwrap()),
            vec![a]
        );
        assert!(get_quiz_candidates(&pool, Some(2), &[c])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn questions_for_category_are_ordered() {
        let pool = test_pool().await;
        let first = create_question(&pool, new_question("first", 4)).await.unwrap();
        create_question(&pool, new_question("elsewhere", 5)).await.unwrap();
        let second = create_question(&pool, new_question("second", 4)).await.unwrap();

        let found: Vec<i64> = get_questions_for_category(&pool, 4)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(found, vec![first, second]);
    }

    #[tokio::test]
    async fn import_keeps_given_ids() {
        let pool = test_pool().await;
        create_question(&pool, new_question("stale", 1)).await.unwrap();

        let imported = Question {
            id: 20,
            question: "Imported".to_owned(),
            answer: "Yes".to_owned(),
            category: 3,
            difficulty: 4,
        };
        import_questions(&pool, vec![imported.clone()]).await.unwrap();

        assert_eq!(get_all_questions(&pool).await.unwrap(), vec![imported]);
    }

    #[tokio::test]
    async fn failed_import_rolls_back() {
        let pool = test_pool().await;
        let stale = create_question(&pool, new_question("stale", 1)).await.unwrap();

        let duplicated = Question {
            id: 20,
            question: "Twice".to_owned(),
            answer: "No".to_owned(),
            category: 1,
            difficulty: 1,
        };
        let result = import_questions(&pool, vec![duplicated.clone(), duplicated]).await;
        assert!(result.is_err());

        let ids: Vec<i64> = get_all_questions(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![stale]);
    }
}
