use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use tutorhub_common::{AppError, PaymentStatus};

use super::{no_remaining_classes, unit_closed, Store, UnitOfWork};
use crate::models::{CompletedClass, Course, NewCompletedClass, NewTransaction, Transaction};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub courses: Vec<Course>,
    pub completed_classes: Vec<CompletedClass>,
    pub transactions: Vec<Transaction>,
}

impl MemoryState {
    pub fn course(&self, course_id: Uuid) -> Option<&Course> {
        self.courses.iter().find(|c| c.course_id == course_id)
    }

    pub fn transaction(&self, order_id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.order_id == order_id)
    }

    pub fn completed_classes_for(&self, course_id: Uuid) -> Vec<&CompletedClass> {
        self.completed_classes
            .iter()
            .filter(|c| c.course_id == course_id)
            .collect()
    }

    fn course_mut(&mut self, course_id: Uuid) -> Option<&mut Course> {
        self.courses.iter_mut().find(|c| c.course_id == course_id)
    }

    fn push_transaction(&mut self, entry: NewTransaction) -> Result<Transaction, AppError> {
        if self.transaction(&entry.order_id).is_some() {
            return Err(AppError::Conflict(format!(
                "Transaction for order {} already exists",
                entry.order_id
            )));
        }
        let now = Utc::now();
        let transaction = Transaction {
            transaction_id: Uuid::new_v4(),
            user_id: entry.user_id,
            course_id: entry.course_id,
            order_id: entry.order_id,
            payment_id: None,
            amount: entry.amount,
            classes_purchased: entry.classes_purchased,
            currency: entry.currency,
            status: PaymentStatus::Pending.as_str().to_string(),
            gateway: entry.gateway,
            created_at: now,
            updated_at: now,
        };
        self.transactions.push(transaction.clone());
        Ok(transaction)
    }
}

/// Store backed by a mutex-guarded snapshot. A unit of work holds the lock for
/// its whole lifetime and writes its staged copy back only on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_completed_class_inserts: Arc<AtomicBool>,
    fail_transaction_inserts: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_course(&self, course: Course) {
        self.state.lock().await.courses.push(course);
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Makes every subsequent completed-class insert fail with a storage error.
    pub fn fail_completed_class_inserts(&self, fail: bool) {
        self.fail_completed_class_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent ledger insert fail with a storage error.
    pub fn fail_transaction_inserts(&self, fail: bool) {
        self.fail_transaction_inserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard: Some(guard),
            staged,
            fail_completed_class_inserts: self.fail_completed_class_inserts.load(Ordering::SeqCst),
            fail_transaction_inserts: self.fail_transaction_inserts.load(Ordering::SeqCst),
        }))
    }

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, AppError> {
        Ok(self.state.lock().await.course(course_id).cloned())
    }

    async fn insert_transaction(&self, entry: NewTransaction) -> Result<Transaction, AppError> {
        if self.fail_transaction_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal("synthetic transaction insert failure".to_string()));
        }
        self.state.lock().await.push_transaction(entry)
    }
}

pub struct MemoryUnitOfWork {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    staged: MemoryState,
    fail_completed_class_inserts: bool,
    fail_transaction_inserts: bool,
}

impl MemoryUnitOfWork {
    fn ensure_open(&self) -> Result<(), AppError> {
        if self.guard.is_some() {
            Ok(())
        } else {
            Err(unit_closed())
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn course_for_update(&mut self, course_id: Uuid) -> Result<Option<Course>, AppError> {
        self.ensure_open()?;
        Ok(self.staged.course(course_id).cloned())
    }

    async fn record_class_taught(&mut self, course_id: Uuid) -> Result<Course, AppError> {
        self.ensure_open()?;
        let course = self
            .staged
            .course_mut(course_id)
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))?;
        if course.no_of_classes <= 0 {
            return Err(no_remaining_classes());
        }
        course.no_of_classes -= 1;
        course.no_of_class_teacher += 1;
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn insert_completed_class(
        &mut self,
        entry: NewCompletedClass,
    ) -> Result<CompletedClass, AppError> {
        self.ensure_open()?;
        if self.fail_completed_class_inserts {
            return Err(AppError::Internal(
                "synthetic completed class insert failure".to_string(),
            ));
        }
        let record = CompletedClass {
            completed_class_id: Uuid::new_v4(),
            course_id: entry.course_id,
            teacher_id: entry.teacher_id,
            student_id: entry.student_id,
            topic: entry.topic,
            duration_minutes: entry.duration_minutes,
            homework_url: entry.homework_url,
            completed_at: Utc::now(),
        };
        self.staged.completed_classes.push(record.clone());
        Ok(record)
    }

    async fn transaction_for_update(
        &mut self,
        order_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        self.ensure_open()?;
        Ok(self.staged.transaction(order_id).cloned())
    }

    async fn insert_transaction(&mut self, entry: NewTransaction) -> Result<Transaction, AppError> {
        self.ensure_open()?;
        if self.fail_transaction_inserts {
            return Err(AppError::Internal("synthetic transaction insert failure".to_string()));
        }
        self.staged.push_transaction(entry)
    }

    async fn add_classes(&mut self, course_id: Uuid, classes: i32) -> Result<Course, AppError> {
        self.ensure_open()?;
        let course = self
            .staged
            .course_mut(course_id)
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))?;
        course.no_of_classes += classes;
        course.payment_status = PaymentStatus::Completed.as_str().to_string();
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn settle_transaction(
        &mut self,
        order_id: &str,
        status: PaymentStatus,
        payment_id: Option<&str>,
    ) -> Result<Transaction, AppError> {
        self.ensure_open()?;
        if let Some(payment_id) = payment_id {
            let taken = self.staged.transactions.iter().any(|t| {
                t.order_id != order_id && t.payment_id.as_deref() == Some(payment_id)
            });
            if taken {
                return Err(AppError::Conflict(format!(
                    "Payment {} already recorded",
                    payment_id
                )));
            }
        }
        let transaction = self
            .staged
            .transactions
            .iter_mut()
            .find(|t| t.order_id == order_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Transaction for order {} not found", order_id))
            })?;
        transaction.status = status.as_str().to_string();
        if let Some(payment_id) = payment_id {
            transaction.payment_id = Some(payment_id.to_string());
        }
        transaction.updated_at = Utc::now();
        Ok(transaction.clone())
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        let mut guard = self.guard.take().ok_or_else(unit_closed)?;
        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), AppError> {
        self.guard.take();
        Ok(())
    }
}

/// Builds a course with the given counters and prices for tests.
pub fn course_fixture(
    student_id: Uuid,
    teacher_id: Option<Uuid>,
    no_of_classes: i32,
    price_per_class: Decimal,
) -> Course {
    let now = Utc::now();
    Course {
        course_id: Uuid::new_v4(),
        title: "Mathematics Grade 8".to_string(),
        description: Some("Weekly algebra and geometry".to_string()),
        grade: Some("8".to_string()),
        schedule_time: Some("17:00".to_string()),
        schedule_days: vec!["Monday".to_string(), "Thursday".to_string()],
        student_id,
        teacher_id,
        no_of_classes,
        price_per_class,
        no_of_class_teacher: 0,
        teacher_price_per_class: price_per_class / Decimal::from(2),
        join_link: None,
        classroom_link: None,
        payment_status: PaymentStatus::Pending.as_str().to_string(),
        created_at: now,
        updated_at: now,
    }
}
