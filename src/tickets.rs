use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::core::errors::BotError;
use crate::db::Database;

/// One support thread and the user who opened it.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportTicket {
    pub id: i64,
    pub thread_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone)]
pub struct TicketStore {
    pool: SqlitePool,
}

impl TicketStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Inserts a ticket. A second ticket for the same thread is a `Conflict`.
    pub async fn create(&self, thread_id: &str, user_id: &str) -> Result<SupportTicket, BotError> {
        let row = sqlx::query(
            "\
            INSERT INTO support_tickets (thread_id, user_id)
            VALUES (?1, ?2)
            RETURNING id, thread_id, user_id, created_at",
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        ticket_from_row(row)
    }

    pub async fn find_by_thread(&self, thread_id: &str) -> Result<Option<SupportTicket>, BotError> {
        let row = sqlx::query(
            "SELECT id, thread_id, user_id, created_at FROM support_tickets WHERE thread_id = ?1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ticket_from_row).transpose()
    }

    pub async fn count(&self) -> Result<i64, BotError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM support_tickets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn ticket_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SupportTicket, BotError> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(BotError::storage)?
        .with_timezone(&Utc);

    Ok(SupportTicket {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        user_id: row.try_get("user_id")?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;

    #[tokio::test]
    async fn create_and_find_ticket() {
        let db = test_database().await;
        let tickets = TicketStore::new(&db);

        let created = tickets.create("thread-1", "user-1").await.unwrap();
        assert_eq!(created.thread_id, "thread-1");
        assert!(created.is_owned_by("user-1"));
        assert!(!created.is_owned_by("user-2"));

        let found = tickets.find_by_thread("thread-1").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(created.created_at <= Utc::now());
    }

    #[tokio::test]
    async fn unknown_thread_has_no_ticket() {
        let db = test_database().await;
        let tickets = TicketStore::new(&db);

        assert!(tickets.find_by_thread("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_thread_id_is_rejected() {
        let db = test_database().await;
        let tickets = TicketStore::new(&db);

        tickets.create("thread-1", "user-1").await.unwrap();
        let err = tickets.create("thread-1", "user-2").await.unwrap_err();

        assert!(matches!(err, BotError::Conflict(_)));
        assert_eq!(tickets.count().await.unwrap(), 1);
        let kept = tickets.find_by_thread("thread-1").await.unwrap().unwrap();
        assert_eq!(kept.user_id, "user-1");
    }
}
