//! One authorization check per capability. Handlers call these instead of
//! comparing roles and ids themselves.

use uuid::Uuid;

use tutorhub_common::{AppError, Caller, UserRole};
use tutorhub_database::{Course, DemoClass};

fn forbidden(message: &str) -> AppError {
    AppError::Authorization(message.to_string())
}

pub fn require_role(caller: &Caller, role: UserRole) -> Result<(), AppError> {
    if caller.role == role {
        Ok(())
    } else {
        Err(AppError::Authorization(format!("{} access required", role)))
    }
}

fn is_participant(caller: &Caller, course: &Course) -> bool {
    match caller.role {
        UserRole::Admin => true,
        UserRole::Student => course.student_id == caller.user_id,
        UserRole::Teacher => course.teacher_id == Some(caller.user_id),
    }
}

pub fn can_view_course(caller: &Caller, course: &Course) -> Result<(), AppError> {
    if is_participant(caller, course) {
        Ok(())
    } else {
        Err(forbidden("You do not have access to this course"))
    }
}

pub fn can_edit_course(caller: &Caller) -> Result<(), AppError> {
    require_role(caller, UserRole::Admin)
}

pub fn can_complete_class(caller: &Caller, course: &Course) -> Result<(), AppError> {
    if caller.role == UserRole::Teacher && course.teacher_id == Some(caller.user_id) {
        Ok(())
    } else {
        Err(forbidden("Only the assigned teacher can complete classes for this course"))
    }
}

pub fn can_pay_for_course(caller: &Caller, course: &Course) -> Result<(), AppError> {
    if caller.role == UserRole::Student && course.student_id == caller.user_id {
        Ok(())
    } else {
        Err(forbidden("Only the enrolled student can pay for this course"))
    }
}

pub fn can_message_course(caller: &Caller, course: &Course) -> Result<(), AppError> {
    if is_participant(caller, course) {
        Ok(())
    } else {
        Err(forbidden("Only course participants can read or post messages"))
    }
}

pub fn can_view_earnings(caller: &Caller) -> Result<(), AppError> {
    require_role(caller, UserRole::Teacher)
}

pub fn can_manage_users(caller: &Caller) -> Result<(), AppError> {
    require_role(caller, UserRole::Admin)
}

pub fn can_view_user(caller: &Caller, user_id: Uuid) -> Result<(), AppError> {
    if caller.is_admin() || caller.user_id == user_id {
        Ok(())
    } else {
        Err(forbidden("You can only view your own profile"))
    }
}

pub fn can_book_demo_class(caller: &Caller) -> Result<(), AppError> {
    require_role(caller, UserRole::Student)
}

pub fn can_view_demo_class(caller: &Caller, demo_class: &DemoClass) -> Result<(), AppError> {
    if caller.is_admin() || demo_class.student_id == Some(caller.user_id) {
        Ok(())
    } else {
        Err(forbidden("You do not have access to this demo class"))
    }
}

pub fn can_manage_demo_classes(caller: &Caller) -> Result<(), AppError> {
    require_role(caller, UserRole::Admin)
}

pub fn can_view_all_transactions(caller: &Caller) -> bool {
    caller.is_admin()
}
