mod handler;
mod model;

pub use handler::{
    accept_invitation, get_notifications, get_unread_count, mark_as_read, reject_invitation,
};
pub use model::Notification;
