pub mod auth;
pub mod classes;
pub mod levels;
pub mod schools;
pub mod students;
pub mod users;
