//! # Feedback Repository
//!
//! Database operations for customer feedback. Append-only: feedback is
//! inserted after a settled payment and never updated or deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use bazaar_core::Feedback;

const FEEDBACK_COLUMNS: &str = "id, customer_id, feedback_date, rating, comments, created_at";

/// Repository for feedback database operations.
#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    pool: SqlitePool,
}

impl FeedbackRepository {
    /// Creates a new FeedbackRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FeedbackRepository { pool }
    }

    /// Inserts a feedback entry and returns the stored record.
    pub async fn insert(
        &self,
        customer_id: &str,
        rating: i64,
        comments: &str,
    ) -> DbResult<Feedback> {
        let now = Utc::now();
        let feedback = Feedback {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            feedback_date: now,
            rating,
            comments: comments.to_string(),
            created_at: now,
        };

        debug!(id = %feedback.id, customer_id = %customer_id, rating = %rating, "Inserting feedback");

        sqlx::query(
            "INSERT INTO feedback (id, customer_id, feedback_date, rating, comments, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&feedback.id)
        .bind(&feedback.customer_id)
        .bind(feedback.feedback_date)
        .bind(feedback.rating)
        .bind(&feedback.comments)
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await?;

        Ok(feedback)
    }

    /// Lists a customer's feedback entries, oldest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Feedback>> {
        let entries = sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE customer_id = ? ORDER BY created_at"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .insert("Priya", "priya@example.com", "9876543210", "12 Bazaar St")
            .await
            .unwrap();

        db.feedback()
            .insert(&customer.id, 5, "Quick checkout")
            .await
            .unwrap();
        db.feedback()
            .insert(&customer.id, 3, "Long queue today")
            .await
            .unwrap();

        let entries = db.feedback().list_for_customer(&customer.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rating, 5);
        assert_eq!(entries[1].comments, "Long queue today");
    }
}
