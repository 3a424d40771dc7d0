//! Postgres-backed submission store (sqlx).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use super::{StoreError, SubmissionStore};
use crate::domain::{
    CoAuthor, EditorialDecision, EventTrack, HistoryEntry, Language, PaymentStatus,
    ReviewerDecision, ScoreSet, Status, Submission, SubmissionContent, SubmissionId, UserId,
};

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: Uuid,
    event: String,
    author: Uuid,
    title: String,
    body: String,
    authors_text: String,
    language: String,
    keywords: Json<Vec<String>>,
    coauthors: Json<Vec<CoAuthor>>,
    presenting_coauthor: Option<i16>,
    status: String,
    payment_status: String,
    reviewer: Option<Uuid>,
    scores: Option<Json<ScoreSet>>,
    ranking_score: f64,
    reviewer_decision: Option<String>,
    reviewer_notes: Option<String>,
    editorial_decision: Option<String>,
    editorial_notes: Option<String>,
    history: Json<Vec<HistoryEntry>>,
    poster: Option<String>,
    selected_for_presentation: bool,
    presentation_confirmed: bool,
    confirmation_deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

fn corrupt(id: SubmissionId, detail: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        id,
        detail: detail.into(),
    }
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> Result<Self, StoreError> {
        let id = row.id;
        let event = EventTrack::parse(&row.event)
            .ok_or_else(|| corrupt(id, format!("unknown event {}", row.event)))?;
        let status = Status::parse(&row.status)
            .ok_or_else(|| corrupt(id, format!("unknown status {}", row.status)))?;
        let payment = PaymentStatus::parse(&row.payment_status)
            .ok_or_else(|| corrupt(id, format!("unknown payment status {}", row.payment_status)))?;
        let language = Language::parse(&row.language)
            .ok_or_else(|| corrupt(id, format!("unknown language {}", row.language)))?;
        let reviewer_decision = row
            .reviewer_decision
            .as_deref()
            .map(|raw| {
                ReviewerDecision::parse(raw)
                    .ok_or_else(|| corrupt(id, format!("unknown reviewer decision {}", raw)))
            })
            .transpose()?;
        let editorial_decision = row
            .editorial_decision
            .as_deref()
            .map(|raw| {
                EditorialDecision::parse(raw)
                    .ok_or_else(|| corrupt(id, format!("unknown editorial decision {}", raw)))
            })
            .transpose()?;

        Ok(Submission {
            id,
            event,
            author: row.author,
            content: SubmissionContent {
                title: row.title,
                body: row.body,
                authors_text: row.authors_text,
                language,
                keywords: row.keywords.0,
                coauthors: row.coauthors.0,
                presenting_coauthor: row.presenting_coauthor.map(|i| i as u8),
            },
            status,
            payment,
            reviewer: row.reviewer,
            scores: row.scores.map(|j| j.0),
            ranking_score: row.ranking_score,
            reviewer_decision,
            reviewer_notes: row.reviewer_notes,
            editorial_decision,
            editorial_notes: row.editorial_notes,
            history: row.history.0,
            poster: row.poster,
            selected_for_presentation: row.selected_for_presentation,
            presentation_confirmed: row.presentation_confirmed,
            confirmation_deadline: row.confirmation_deadline,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT * FROM submissions";

fn rows_to_submissions(rows: Vec<SubmissionRow>) -> Result<Vec<Submission>, StoreError> {
    rows.into_iter().map(Submission::try_from).collect()
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn insert(&self, s: &Submission) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO submissions (
                id, event, author, title, body, authors_text, language,
                keywords, coauthors, presenting_coauthor, status, payment_status,
                reviewer, scores, ranking_score, reviewer_decision, reviewer_notes,
                editorial_decision, editorial_notes, history, poster,
                selected_for_presentation, presentation_confirmed,
                confirmation_deadline, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            "#,
        )
        .bind(s.id)
        .bind(s.event.as_str())
        .bind(s.author)
        .bind(&s.content.title)
        .bind(&s.content.body)
        .bind(&s.content.authors_text)
        .bind(s.content.language.as_str())
        .bind(Json(&s.content.keywords))
        .bind(Json(&s.content.coauthors))
        .bind(s.content.presenting_coauthor.map(i16::from))
        .bind(s.status.as_str())
        .bind(s.payment.as_str())
        .bind(s.reviewer)
        .bind(s.scores.as_ref().map(Json))
        .bind(s.ranking_score)
        .bind(s.reviewer_decision.map(|d| d.as_str()))
        .bind(s.reviewer_notes.as_deref())
        .bind(s.editorial_decision.map(|d| d.as_str()))
        .bind(s.editorial_notes.as_deref())
        .bind(Json(&s.history))
        .bind(s.poster.as_deref())
        .bind(s.selected_for_presentation)
        .bind(s.presentation_confirmed)
        .bind(s.confirmation_deadline)
        .bind(s.created_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(Submission::try_from).transpose()
    }

    async fn get_status(&self, id: SubmissionId) -> Result<Option<Status>, StoreError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT status FROM submissions WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
        raw.map(|raw| {
            Status::parse(&raw).ok_or_else(|| corrupt(id, format!("unknown status {}", raw)))
        })
        .transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: SubmissionId,
        expected: Status,
        next: Status,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE submissions SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(expected.as_str())
            .bind(next.as_str())
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_content(
        &self,
        id: SubmissionId,
        content: &SubmissionContent,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET title = $2, body = $3, authors_text = $4, language = $5,
                keywords = $6, coauthors = $7, presenting_coauthor = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&content.title)
        .bind(&content.body)
        .bind(&content.authors_text)
        .bind(content.language.as_str())
        .bind(Json(&content.keywords))
        .bind(Json(&content.coauthors))
        .bind(content.presenting_coauthor.map(i16::from))
        .execute(self.pool.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn set_payment_status(
        &self,
        id: SubmissionId,
        payment: PaymentStatus,
    ) -> Result<(), StoreError> {
        self.set_field(id, "payment_status", payment.as_str()).await
    }

    async fn set_reviewer(&self, id: SubmissionId, reviewer: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE submissions SET reviewer = $2 WHERE id = $1")
            .bind(id)
            .bind(reviewer)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn record_review(
        &self,
        id: SubmissionId,
        scores: &ScoreSet,
        decision: ReviewerDecision,
        notes: &str,
        ranking_score: f64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET scores = $2, reviewer_decision = $3, reviewer_notes = $4, ranking_score = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(scores))
        .bind(decision.as_str())
        .bind(notes)
        .bind(ranking_score)
        .execute(self.pool.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn record_editorial_decision(
        &self,
        id: SubmissionId,
        decision: EditorialDecision,
        notes: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE submissions SET editorial_decision = $2, editorial_notes = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(decision.as_str())
        .bind(notes)
        .execute(self.pool.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn append_history(
        &self,
        id: SubmissionId,
        entry: HistoryEntry,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE submissions SET history = history || $2::jsonb WHERE id = $1",
        )
        .bind(id)
        .bind(Json(vec![entry]))
        .execute(self.pool.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn set_selected(&self, id: SubmissionId, selected: bool) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE submissions SET selected_for_presentation = $2 WHERE id = $1")
                .bind(id)
                .bind(selected)
                .execute(self.pool.as_ref())
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn set_confirmation_deadline(
        &self,
        id: SubmissionId,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE submissions SET confirmation_deadline = $2 WHERE id = $1")
            .bind(id)
            .bind(deadline)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn set_presentation_confirmed(
        &self,
        id: SubmissionId,
        confirmed: bool,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE submissions SET presentation_confirmed = $2 WHERE id = $1")
                .bind(id)
                .bind(confirmed)
                .execute(self.pool.as_ref())
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn set_poster(&self, id: SubmissionId, document: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE submissions SET poster = $2 WHERE id = $1")
            .bind(id)
            .bind(document)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn count_by_author_and_event(
        &self,
        author: UserId,
        event: EventTrack,
    ) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE author = $1 AND event = $2")
                .bind(author)
                .bind(event.as_str())
                .fetch_one(self.pool.as_ref())
                .await?;
        Ok(count as u64)
    }

    async fn list_ranking_candidates(
        &self,
        event: EventTrack,
    ) -> Result<Vec<Submission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            r#"
            {} WHERE event = $1 AND ranking_score > 0
                AND status IN ('approved', 'poster_submitted', 'awaiting_confirmation', 'confirmed')
            "#,
            SELECT_COLUMNS
        ))
        .bind(event.as_str())
        .fetch_all(self.pool.as_ref())
        .await?;
        rows_to_submissions(rows)
    }

    async fn list_awaiting_confirmation(&self) -> Result<Vec<Submission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "{} WHERE status = 'awaiting_confirmation'",
            SELECT_COLUMNS
        ))
        .fetch_all(self.pool.as_ref())
        .await?;
        rows_to_submissions(rows)
    }

    async fn list_by_author(&self, author: UserId) -> Result<Vec<Submission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "{} WHERE author = $1 ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(author)
        .fetch_all(self.pool.as_ref())
        .await?;
        rows_to_submissions(rows)
    }

    async fn list_by_reviewer(&self, reviewer: UserId) -> Result<Vec<Submission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "{} WHERE reviewer = $1 ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(reviewer)
        .fetch_all(self.pool.as_ref())
        .await?;
        rows_to_submissions(rows)
    }
}

impl PgStore {
    async fn set_field(
        &self,
        id: SubmissionId,
        column: &'static str,
        value: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(&format!("UPDATE submissions SET {} = $2 WHERE id = $1", column))
            .bind(id)
            .bind(value)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }
}
