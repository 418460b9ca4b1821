pub mod logs;
pub mod messages;
pub mod publishers;
