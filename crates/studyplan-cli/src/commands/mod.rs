pub mod config;
pub mod note;
pub mod subject;
pub mod task;
pub mod timetable;
