use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use tutorhub_common::{AppError, PaymentStatus};

use super::{no_remaining_classes, unit_closed, Store, UnitOfWork};
use crate::models::{CompletedClass, Course, NewCompletedClass, NewTransaction, Transaction};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_pending_transaction(
    conn: &mut PgConnection,
    entry: &NewTransaction,
) -> Result<Transaction, AppError> {
    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (
            transaction_id, user_id, course_id, order_id, amount,
            classes_purchased, currency, status, gateway
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.course_id)
    .bind(&entry.order_id)
    .bind(entry.amount)
    .bind(entry.classes_purchased)
    .bind(&entry.currency)
    .bind(PaymentStatus::Pending.as_str())
    .bind(&entry.gateway)
    .fetch_one(conn)
    .await?;

    Ok(transaction)
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, AppError> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE course_id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(course)
    }

    async fn insert_transaction(&self, entry: NewTransaction) -> Result<Transaction, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_pending_transaction(&mut conn, &entry).await
    }
}

pub struct PgUnitOfWork {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.tx.as_deref_mut().ok_or_else(unit_closed)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn course_for_update(&mut self, course_id: Uuid) -> Result<Option<Course>, AppError> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE course_id = $1 FOR UPDATE",
        )
        .bind(course_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(course)
    }

    async fn record_class_taught(&mut self, course_id: Uuid) -> Result<Course, AppError> {
        // The guard repeats the caller's check so the counter can never go negative.
        sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET no_of_classes = no_of_classes - 1,
                no_of_class_teacher = no_of_class_teacher + 1,
                updated_at = NOW()
            WHERE course_id = $1 AND no_of_classes > 0
            RETURNING *
            "#,
        )
        .bind(course_id)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(no_remaining_classes)
    }

    async fn insert_completed_class(
        &mut self,
        entry: NewCompletedClass,
    ) -> Result<CompletedClass, AppError> {
        let record = sqlx::query_as::<_, CompletedClass>(
            r#"
            INSERT INTO completed_classes (
                completed_class_id, course_id, teacher_id, student_id,
                topic, duration_minutes, homework_url
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.course_id)
        .bind(entry.teacher_id)
        .bind(entry.student_id)
        .bind(&entry.topic)
        .bind(entry.duration_minutes)
        .bind(&entry.homework_url)
        .fetch_one(self.conn()?)
        .await?;
        Ok(record)
    }

    async fn transaction_for_update(
        &mut self,
        order_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE order_id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(self.conn()?)
        .await?;
        Ok(transaction)
    }

    async fn insert_transaction(&mut self, entry: NewTransaction) -> Result<Transaction, AppError> {
        insert_pending_transaction(self.conn()?, &entry).await
    }

    async fn add_classes(&mut self, course_id: Uuid, classes: i32) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET no_of_classes = no_of_classes + $2,
                payment_status = $3,
                updated_at = NOW()
            WHERE course_id = $1
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(classes)
        .bind(PaymentStatus::Completed.as_str())
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))
    }

    async fn settle_transaction(
        &mut self,
        order_id: &str,
        status: PaymentStatus,
        payment_id: Option<&str>,
    ) -> Result<Transaction, AppError> {
        sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = $2,
                payment_id = COALESCE($3, payment_id),
                updated_at = NOW()
            WHERE order_id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(payment_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
                "Payment {} already recorded",
                payment_id.unwrap_or_default()
            )),
            _ => AppError::Database(e),
        })?
        .ok_or_else(|| AppError::NotFound(format!("Transaction for order {} not found", order_id)))
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        let tx = self.tx.take().ok_or_else(unit_closed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), AppError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
