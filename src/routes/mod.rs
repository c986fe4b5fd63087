pub mod chat;
pub mod item;
pub mod member;
pub mod notification;
pub mod schedule;
pub mod travel;
pub mod vote;
