pub mod conversation;
pub mod plan;
