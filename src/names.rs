pub const SESSION_COOKIE_NAME: &str = "teacher_session";

/// Header the external auth provider signs its login callback with.
pub const AUTH_CALLBACK_SECRET_HEADER: &str = "x-auth-callback-secret";

pub const HEALTH_URL: &str = "/health";
pub const SESSION_URL: &str = "/session";
pub const CLASSES_URL: &str = "/classes";
pub const STUDENTS_URL: &str = "/students";
pub const HOMEWORK_URL: &str = "/homework";
pub const GENERATE_HOMEWORK_URL: &str = "/homework/generate";
pub const HISTORY_URL: &str = "/history";
pub const NOTIFICATIONS_URL: &str = "/notifications/next";

pub fn class_students_url(class_id: i64) -> String {
    format!("/classes/{class_id}/students")
}

pub fn class_homework_url(class_id: i64, homework_id: i64) -> String {
    format!("/classes/{class_id}/homework/{homework_id}")
}

pub fn class_progress_url(class_id: i64, homework_id: i64) -> String {
    format!("/classes/{class_id}/homework/{homework_id}/progress")
}

pub fn complete_assignment_url(active_id: i64) -> String {
    format!("/actives/{active_id}/complete")
}

// Activity feed
pub const HISTORY_FEED_LIMIT: i64 = 100;

// Question generation
pub const MIN_QUESTION_COUNT: usize = 1;
pub const MAX_QUESTION_COUNT: usize = 20;
pub const DEFAULT_QUESTION_COUNT: usize = 5;

// Labels for joins that found nothing
pub const UNKNOWN_HOMEWORK: &str = "Unknown homework";
pub const UNKNOWN_CLASS: &str = "Unknown class";
pub const UNKNOWN_STUDENT: &str = "Unknown student";
