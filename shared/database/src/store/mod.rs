//! Transactional access used by the class-completion and payment-settlement
//! workflows. Every multi-row change goes through a [`UnitOfWork`], which is
//! either committed as a whole or rolled back (also on drop).

pub mod postgres;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use tutorhub_common::{AppError, PaymentStatus};

use crate::models::{CompletedClass, Course, NewCompletedClass, NewTransaction, Transaction};

pub use postgres::PgStore;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, AppError>;

    /// Inserts a `pending` ledger entry outside of any unit of work.
    async fn insert_transaction(&self, entry: NewTransaction) -> Result<Transaction, AppError>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// Loads the course and holds it locked until the unit ends.
    async fn course_for_update(&mut self, course_id: Uuid) -> Result<Option<Course>, AppError>;

    /// Moves one class from the remaining counter to the taught counter.
    /// Fails with a domain error when no classes remain.
    async fn record_class_taught(&mut self, course_id: Uuid) -> Result<Course, AppError>;

    async fn insert_completed_class(
        &mut self,
        entry: NewCompletedClass,
    ) -> Result<CompletedClass, AppError>;

    /// Loads the ledger entry for a gateway order and holds it locked until the unit ends.
    async fn transaction_for_update(&mut self, order_id: &str)
        -> Result<Option<Transaction>, AppError>;

    async fn insert_transaction(&mut self, entry: NewTransaction) -> Result<Transaction, AppError>;

    /// Credits purchased classes and marks the course paid.
    async fn add_classes(&mut self, course_id: Uuid, classes: i32) -> Result<Course, AppError>;

    async fn settle_transaction(
        &mut self,
        order_id: &str,
        status: PaymentStatus,
        payment_id: Option<&str>,
    ) -> Result<Transaction, AppError>;

    async fn commit(&mut self) -> Result<(), AppError>;

    async fn rollback(&mut self) -> Result<(), AppError>;
}

pub(crate) fn unit_closed() -> AppError {
    AppError::Internal("Unit of work already finished".to_string())
}

pub(crate) fn no_remaining_classes() -> AppError {
    AppError::Domain("No remaining classes for this course".to_string())
}
