//! Recording a taught class. The remaining counter, the taught counter and the
//! completion record change together or not at all.

use uuid::Uuid;
use validator::Validate;

use tutorhub_auth::policy;
use tutorhub_common::{AppError, Caller};
use tutorhub_database::{CompletedClass, NewCompletedClass, Store, UnitOfWork};

use crate::models::CompleteClassRequest;

#[tracing::instrument(skip(store, request), fields(teacher_id = %caller.user_id))]
pub async fn complete_class(
    store: &dyn Store,
    caller: &Caller,
    course_id: Uuid,
    request: CompleteClassRequest,
) -> Result<CompletedClass, AppError> {
    request.validate()?;
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(AppError::Validation("Topic must not be empty".to_string()));
    }

    let entry = NewCompletedClass {
        course_id,
        teacher_id: caller.user_id,
        // Filled in from the locked course row.
        student_id: Uuid::nil(),
        topic: topic.to_string(),
        duration_minutes: request.duration_minutes,
        homework_url: request.homework_url,
    };

    let mut unit = store.begin().await?;
    match record(unit.as_mut(), caller, entry).await {
        Ok(completed) => {
            unit.commit().await?;
            tracing::info!(
                "Class completed for course {} ({})",
                course_id,
                completed.completed_class_id
            );
            Ok(completed)
        }
        Err(e) => {
            if let Err(rollback_error) = unit.rollback().await {
                tracing::error!("Rollback failed for course {}: {}", course_id, rollback_error);
            }
            Err(e)
        }
    }
}

async fn record(
    unit: &mut dyn UnitOfWork,
    caller: &Caller,
    mut entry: NewCompletedClass,
) -> Result<CompletedClass, AppError> {
    let course = unit
        .course_for_update(entry.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    policy::can_complete_class(caller, &course)?;

    if course.no_of_classes <= 0 {
        return Err(AppError::Domain(
            "No remaining classes for this course".to_string(),
        ));
    }

    unit.record_class_taught(course.course_id).await?;

    entry.student_id = course.student_id;
    unit.insert_completed_class(entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tutorhub_common::UserRole;
    use tutorhub_database::store::memory::course_fixture;
    use tutorhub_database::MemoryStore;

    fn request(topic: &str) -> CompleteClassRequest {
        CompleteClassRequest {
            topic: topic.to_string(),
            duration_minutes: Some(60),
            homework_url: None,
        }
    }

    async fn setup(no_of_classes: i32) -> (MemoryStore, Caller, Uuid) {
        let store = MemoryStore::new();
        let teacher = Caller::new(Uuid::new_v4(), UserRole::Teacher);
        let course = course_fixture(
            Uuid::new_v4(),
            Some(teacher.user_id),
            no_of_classes,
            Decimal::from(400),
        );
        let course_id = course.course_id;
        store.insert_course(course).await;
        (store, teacher, course_id)
    }

    #[tokio::test]
    async fn test_completion_moves_one_class() {
        let (store, teacher, course_id) = setup(3).await;

        let completed = complete_class(&store, &teacher, course_id, request("Fractions"))
            .await
            .unwrap();
        assert_eq!(completed.topic, "Fractions");
        assert_eq!(completed.teacher_id, teacher.user_id);

        let state = store.snapshot().await;
        let course = state.course(course_id).unwrap();
        assert_eq!(course.no_of_classes, 2);
        assert_eq!(course.no_of_class_teacher, 1);
        assert_eq!(completed.student_id, course.student_id);
        assert_eq!(state.completed_classes_for(course_id).len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_completions_until_exhausted() {
        let (store, teacher, course_id) = setup(4).await;

        for n in 1..=4 {
            complete_class(&store, &teacher, course_id, request(&format!("Lesson {}", n)))
                .await
                .unwrap();
        }

        let err = complete_class(&store, &teacher, course_id, request("One too many"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));

        let state = store.snapshot().await;
        let course = state.course(course_id).unwrap();
        assert_eq!(course.no_of_classes, 0);
        assert_eq!(course.no_of_class_teacher, 4);
        assert_eq!(state.completed_classes_for(course_id).len(), 4);
    }

    #[tokio::test]
    async fn test_unassigned_teacher_changes_nothing() {
        let (store, _, course_id) = setup(3).await;
        let intruder = Caller::new(Uuid::new_v4(), UserRole::Teacher);

        let err = complete_class(&store, &intruder, course_id, request("Fractions"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let state = store.snapshot().await;
        let course = state.course(course_id).unwrap();
        assert_eq!(course.no_of_classes, 3);
        assert_eq!(course.no_of_class_teacher, 0);
        assert!(state.completed_classes_for(course_id).is_empty());
    }

    #[tokio::test]
    async fn test_student_cannot_complete_own_course() {
        let (store, _, course_id) = setup(3).await;
        let student_id = store.snapshot().await.course(course_id).unwrap().student_id;
        let student = Caller::new(student_id, UserRole::Student);

        let err = complete_class(&store, &student, course_id, request("Fractions"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_zero_remaining_classes_is_rejected() {
        let (store, teacher, course_id) = setup(0).await;

        let err = complete_class(&store, &teacher, course_id, request("Fractions"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
        assert_eq!(err.status_code().as_u16(), 422);
        assert!(store.snapshot().await.completed_classes.is_empty());
    }

    #[tokio::test]
    async fn test_missing_course_is_not_found() {
        let (store, teacher, _) = setup(1).await;

        let err = complete_class(&store, &teacher, Uuid::new_v4(), request("Fractions"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_topic_fails_before_any_change() {
        let (store, teacher, course_id) = setup(2).await;

        let err = complete_class(&store, &teacher, course_id, request("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.snapshot().await.course(course_id).unwrap().no_of_classes, 2);
    }

    #[tokio::test]
    async fn test_failed_record_insert_rolls_back_counters() {
        let (store, teacher, course_id) = setup(2).await;
        store.fail_completed_class_inserts(true);

        let err = complete_class(&store, &teacher, course_id, request("Fractions"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_) | AppError::Database(_)));

        let state = store.snapshot().await;
        let course = state.course(course_id).unwrap();
        assert_eq!(course.no_of_classes, 2);
        assert_eq!(course.no_of_class_teacher, 0);
        assert!(state.completed_classes_for(course_id).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_completions_never_oversell() {
        let (store, teacher, course_id) = setup(1).await;
        let store: Arc<dyn Store> = Arc::new(store.clone());

        let attempts = (0..2).map(|n| {
            let store = store.clone();
            tokio::spawn(async move {
                complete_class(store.as_ref(), &teacher, course_id, request(&format!("Race {}", n)))
                    .await
            })
        });

        let mut succeeded = 0;
        let mut rejected = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            match attempt.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::Domain(_)) => rejected += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!((succeeded, rejected), (1, 1));
    }
}
