mod handler;
mod model;

pub use handler::{get_file, get_messages, send_message, upload_file};
pub use model::{ChatMessage, SendMessageRequest, UploadResponse};
