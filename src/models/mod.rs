pub mod attempt;
pub mod id;
pub mod question;
pub mod quiz;
pub mod student;
pub mod teacher;
