pub mod auth;
pub mod quiz;
pub mod results;
pub mod student;
pub mod upload;
