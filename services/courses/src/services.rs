use std::sync::Arc;

use axum::extract::FromRef;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use tutorhub_auth::{policy, JwtService};
use tutorhub_common::{AppError, Caller, DemoClassStatus, UserRole};
use tutorhub_database::{CompletedClass, Course, CourseMessage, DemoClass, Store, User};
use tutorhub_notifications::{Notification, Notifier};

use crate::config::AppConfig;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub store: Arc<dyn Store>,
    pub jwt_service: JwtService,
    pub notifier: Notifier,
    pub config: AppConfig,
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_service.clone()
    }
}

async fn fetch_course(db_pool: &PgPool, course_id: Uuid) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE course_id = $1")
        .bind(course_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
}

/// Loads a user and checks it holds the role the course slot needs.
async fn fetch_member(db_pool: &PgPool, user_id: Uuid, role: UserRole) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", role, user_id)))?;

    if user.role()? != role {
        return Err(AppError::Validation(format!(
            "User {} is not a {}",
            user_id, role
        )));
    }
    Ok(user)
}

fn ensure_non_negative(label: &str, value: Option<Decimal>) -> Result<(), AppError> {
    match value {
        Some(value) if value.is_sign_negative() => Err(AppError::Validation(format!(
            "{} must not be negative",
            label
        ))),
        _ => Ok(()),
    }
}

pub struct CourseService {
    db_pool: PgPool,
    notifier: Notifier,
}

impl CourseService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            notifier: state.notifier.clone(),
        }
    }

    pub async fn create_course(&self, request: CreateCourseRequest) -> Result<Course, AppError> {
        ensure_non_negative("price_per_class", Some(request.price_per_class))?;
        ensure_non_negative("teacher_price_per_class", Some(request.teacher_price_per_class))?;

        let student = fetch_member(&self.db_pool, request.student_id, UserRole::Student).await?;
        let teacher = match request.teacher_id {
            Some(teacher_id) => {
                Some(fetch_member(&self.db_pool, teacher_id, UserRole::Teacher).await?)
            }
            None => None,
        };

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (
                course_id, title, description, grade, schedule_time, schedule_days,
                student_id, teacher_id, no_of_classes, price_per_class,
                teacher_price_per_class, join_link, classroom_link
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(&request.grade)
        .bind(&request.schedule_time)
        .bind(&request.schedule_days)
        .bind(request.student_id)
        .bind(request.teacher_id)
        .bind(request.no_of_classes)
        .bind(request.price_per_class)
        .bind(request.teacher_price_per_class)
        .bind(&request.join_link)
        .bind(&request.classroom_link)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!("Course {} created for student {}", course.course_id, student.user_id);

        self.announce(&course, &student, UserRole::Student);
        if let Some(teacher) = &teacher {
            self.announce(&course, teacher, UserRole::Teacher);
        }

        Ok(course)
    }

    fn announce(&self, course: &Course, user: &User, role: UserRole) {
        let schedule = match (&course.schedule_time, course.schedule_days.is_empty()) {
            (Some(time), false) => Some(format!("{} at {}", course.schedule_days.join(", "), time)),
            (Some(time), true) => Some(time.clone()),
            (None, false) => Some(course.schedule_days.join(", ")),
            (None, true) => None,
        };

        self.notifier.dispatch(
            user.email.clone(),
            Notification::CourseAssigned {
                name: user.full_name.clone(),
                role: role.to_string(),
                course_title: course.title.clone(),
                schedule,
                join_link: course.join_link.clone(),
            },
        );
    }

    pub async fn update_course(
        &self,
        course_id: Uuid,
        request: UpdateCourseRequest,
    ) -> Result<Course, AppError> {
        ensure_non_negative("price_per_class", request.price_per_class)?;
        ensure_non_negative("teacher_price_per_class", request.teacher_price_per_class)?;

        let new_teacher = match request.teacher_id {
            Some(teacher_id) => {
                Some(fetch_member(&self.db_pool, teacher_id, UserRole::Teacher).await?)
            }
            None => None,
        };
        let previous = fetch_course(&self.db_pool, course_id).await?;

        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                grade = COALESCE($4, grade),
                schedule_time = COALESCE($5, schedule_time),
                schedule_days = COALESCE($6, schedule_days),
                teacher_id = COALESCE($7, teacher_id),
                price_per_class = COALESCE($8, price_per_class),
                teacher_price_per_class = COALESCE($9, teacher_price_per_class),
                join_link = COALESCE($10, join_link),
                classroom_link = COALESCE($11, classroom_link),
                updated_at = NOW()
            WHERE course_id = $1
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(request.title.as_deref().map(str::trim))
        .bind(&request.description)
        .bind(&request.grade)
        .bind(&request.schedule_time)
        .bind(&request.schedule_days)
        .bind(request.teacher_id)
        .bind(request.price_per_class)
        .bind(request.teacher_price_per_class)
        .bind(&request.join_link)
        .bind(&request.classroom_link)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        if let Some(teacher) = new_teacher {
            if previous.teacher_id != Some(teacher.user_id) {
                self.announce(&course, &teacher, UserRole::Teacher);
            }
        }

        Ok(course)
    }

    pub async fn list_courses(&self, caller: &Caller) -> Result<Vec<Course>, AppError> {
        let query = match caller.role {
            UserRole::Admin => sqlx::query_as::<_, Course>(
                "SELECT * FROM courses ORDER BY created_at DESC",
            ),
            UserRole::Teacher => sqlx::query_as::<_, Course>(
                "SELECT * FROM courses WHERE teacher_id = $1 ORDER BY created_at DESC",
            )
            .bind(caller.user_id),
            UserRole::Student => sqlx::query_as::<_, Course>(
                "SELECT * FROM courses WHERE student_id = $1 ORDER BY created_at DESC",
            )
            .bind(caller.user_id),
        };

        Ok(query.fetch_all(&self.db_pool).await?)
    }

    pub async fn get_course(&self, caller: &Caller, course_id: Uuid) -> Result<Course, AppError> {
        let course = fetch_course(&self.db_pool, course_id).await?;
        policy::can_view_course(caller, &course)?;
        Ok(course)
    }

    pub async fn list_completed_classes(
        &self,
        caller: &Caller,
        course_id: Uuid,
    ) -> Result<Vec<CompletedClass>, AppError> {
        self.get_course(caller, course_id).await?;

        let classes = sqlx::query_as::<_, CompletedClass>(
            "SELECT * FROM completed_classes WHERE course_id = $1 ORDER BY completed_at DESC",
        )
        .bind(course_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(classes)
    }

    pub async fn teacher_earnings(&self, caller: &Caller) -> Result<EarningsResponse, AppError> {
        policy::can_view_earnings(caller)?;

        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE teacher_id = $1 ORDER BY title",
        )
        .bind(caller.user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(earnings_for(courses))
    }
}

pub(crate) fn earnings_for(courses: Vec<Course>) -> EarningsResponse {
    let courses: Vec<CourseEarning> = courses
        .into_iter()
        .map(|course| CourseEarning {
            earned: course.teacher_price_per_class * Decimal::from(course.no_of_class_teacher),
            course_id: course.course_id,
            title: course.title,
            classes_taught: course.no_of_class_teacher,
            teacher_price_per_class: course.teacher_price_per_class,
        })
        .collect();
    let total = courses.iter().map(|c| c.earned).sum();

    EarningsResponse { courses, total }
}

pub struct DemoClassService {
    db_pool: PgPool,
}

impl DemoClassService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub async fn book(
        &self,
        caller: &Caller,
        request: CreateDemoClassRequest,
    ) -> Result<DemoClass, AppError> {
        policy::can_book_demo_class(caller)?;
        let student = fetch_member(&self.db_pool, caller.user_id, UserRole::Student).await?;

        let demo_class = sqlx::query_as::<_, DemoClass>(
            r#"
            INSERT INTO demo_classes (
                demo_class_id, student_id, student_name, student_email, student_mobile,
                subject, topic, location, requested_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student.user_id)
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(&student.mobile)
        .bind(request.subject.trim())
        .bind(&request.topic)
        .bind(&request.location)
        .bind(request.requested_at)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!("Demo class {} booked by {}", demo_class.demo_class_id, caller.user_id);
        Ok(demo_class)
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<DemoClass>, AppError> {
        let demo_classes = sqlx::query_as::<_, DemoClass>(
            r#"
            SELECT * FROM demo_classes
            WHERE $1 OR student_id = $2
            ORDER BY requested_at DESC
            "#,
        )
        .bind(caller.is_admin())
        .bind(caller.user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(demo_classes
            .into_iter()
            .filter(|demo_class| policy::can_view_demo_class(caller, demo_class).is_ok())
            .collect())
    }

    pub async fn update_status(
        &self,
        caller: &Caller,
        demo_class_id: Uuid,
        request: UpdateDemoClassStatusRequest,
    ) -> Result<DemoClass, AppError> {
        policy::can_manage_demo_classes(caller)?;

        // The status guard makes attended and cancelled final even under concurrent updates.
        let updated = sqlx::query_as::<_, DemoClass>(
            r#"
            UPDATE demo_classes
            SET status = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE demo_class_id = $1 AND status NOT IN ($4, $5)
            RETURNING *
            "#,
        )
        .bind(demo_class_id)
        .bind(request.status.as_str())
        .bind(&request.notes)
        .bind(DemoClassStatus::Attended.as_str())
        .bind(DemoClassStatus::Cancelled.as_str())
        .fetch_optional(&self.db_pool)
        .await?;

        if let Some(demo_class) = updated {
            return Ok(demo_class);
        }

        let existing = sqlx::query_as::<_, DemoClass>(
            "SELECT * FROM demo_classes WHERE demo_class_id = $1",
        )
        .bind(demo_class_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Demo class not found".to_string()))?;

        Err(AppError::Domain(format!(
            "Demo class is already {}",
            existing.status
        )))
    }
}

pub struct MessageService {
    db_pool: PgPool,
}

impl MessageService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    async fn authorize(&self, caller: &Caller, course_id: Uuid) -> Result<(), AppError> {
        let course = fetch_course(&self.db_pool, course_id).await?;
        policy::can_message_course(caller, &course)
    }

    pub async fn list(&self, caller: &Caller, course_id: Uuid) -> Result<Vec<CourseMessage>, AppError> {
        self.authorize(caller, course_id).await?;

        let messages = sqlx::query_as::<_, CourseMessage>(
            "SELECT * FROM course_messages WHERE course_id = $1 ORDER BY created_at, message_id",
        )
        .bind(course_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(messages)
    }

    pub async fn post(
        &self,
        caller: &Caller,
        course_id: Uuid,
        request: PostMessageRequest,
    ) -> Result<CourseMessage, AppError> {
        let body = request.body.trim();
        if body.is_empty() {
            return Err(AppError::Validation("Message must not be empty".to_string()));
        }
        self.authorize(caller, course_id).await?;

        let message = sqlx::query_as::<_, CourseMessage>(
            r#"
            INSERT INTO course_messages (message_id, course_id, sender_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(caller.user_id)
        .bind(body)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tutorhub_common::{DatabaseConfig, EmailConfig, JwtConfig, ServerConfig};
    use tutorhub_database::store::memory::course_fixture;
    use tutorhub_database::{create_pool, run_migrations, PgStore};

    async fn test_state() -> Option<AppState> {
        // Skip test if no database is available
        if std::env::var("DATABASE_URL").is_err() {
            println!("Skipping database test - DATABASE_URL not set");
            return None;
        }

        let database = DatabaseConfig::from_env();
        let pool = create_pool(&database)
            .await
            .expect("Failed to connect to test database");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let jwt = JwtConfig {
            secret: "service-test-secret".to_string(),
            expiration_hours: 1,
            issuer: "tutorhub".to_string(),
        };
        Some(AppState {
            store: Arc::new(PgStore::new(pool.clone())),
            db_pool: pool,
            jwt_service: JwtService::new(&jwt),
            notifier: Notifier::disabled().expect("Failed to build notifier"),
            config: AppConfig {
                server: ServerConfig::from_env("COURSES_SERVICE_TEST", 0),
                database,
                jwt,
                email: EmailConfig::disabled(),
            },
        })
    }

    async fn insert_student(pool: &PgPool) -> Caller {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (user_id, full_name, email, role) VALUES ($1, $2, $3, $4)")
            .bind(user_id)
            .bind("Demo Student")
            .bind(format!("{}@example.com", user_id))
            .bind(UserRole::Student.as_str())
            .execute(pool)
            .await
            .expect("Failed to insert test user");
        Caller::new(user_id, UserRole::Student)
    }

    fn status_change(status: DemoClassStatus) -> UpdateDemoClassStatusRequest {
        UpdateDemoClassStatusRequest {
            status,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_attended_demo_class_is_final() {
        let Some(state) = test_state().await else { return };
        let student = insert_student(&state.db_pool).await;
        let admin = Caller::new(Uuid::new_v4(), UserRole::Admin);
        let service = DemoClassService::new(&state);

        let demo_class = service
            .book(
                &student,
                CreateDemoClassRequest {
                    subject: "Chemistry".to_string(),
                    topic: None,
                    location: None,
                    requested_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert_eq!(demo_class.status, "pending");

        let confirmed = service
            .update_status(&admin, demo_class.demo_class_id, status_change(DemoClassStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(confirmed.status, "confirmed");

        let attended = service
            .update_status(&admin, demo_class.demo_class_id, status_change(DemoClassStatus::Attended))
            .await
            .unwrap();
        assert_eq!(attended.status, "attended");

        let err = service
            .update_status(&admin, demo_class.demo_class_id, status_change(DemoClassStatus::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(msg) if msg.contains("attended")));

        let listed = service.list(&student).await.unwrap();
        let stored = listed
            .iter()
            .find(|d| d.demo_class_id == demo_class.demo_class_id)
            .unwrap();
        assert_eq!(stored.status, "attended");
    }

    #[tokio::test]
    async fn test_unknown_demo_class_is_not_found() {
        let Some(state) = test_state().await else { return };
        let admin = Caller::new(Uuid::new_v4(), UserRole::Admin);

        let err = DemoClassService::new(&state)
            .update_status(&admin, Uuid::new_v4(), status_change(DemoClassStatus::Confirmed))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_earnings_multiply_taught_classes_by_teacher_rate() {
        let teacher_id = Uuid::new_v4();
        let mut algebra = course_fixture(Uuid::new_v4(), Some(teacher_id), 2, Decimal::from(600));
        algebra.no_of_class_teacher = 3;
        let mut physics = course_fixture(Uuid::new_v4(), Some(teacher_id), 5, Decimal::from(500));
        physics.no_of_class_teacher = 0;

        let earnings = earnings_for(vec![algebra, physics]);

        assert_eq!(earnings.courses[0].earned, Decimal::from(900));
        assert_eq!(earnings.courses[1].earned, Decimal::ZERO);
        assert_eq!(earnings.total, Decimal::from(900));
    }
}
