use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::store::RoomStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub travel_id: i64,
    pub sender: String,
    pub message: String,
    /// "TEXT", "IMAGE" or "FILE".
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender: String,
    pub message: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
}

fn default_message_type() -> String {
    "TEXT".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_url: String,
    pub file_name: String,
}

impl ChatMessage {
    /// Room history in arrival order. Timestamps are assigned server-side
    /// under the write lock, so insertion order is timestamp order.
    pub async fn find_by_travel(store: &RoomStore, travel_id: i64) -> Vec<Self> {
        store
            .read()
            .await
            .messages
            .get(&travel_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn create(
        store: &RoomStore,
        travel_id: i64,
        req: SendMessageRequest,
    ) -> Result<Self, AppError> {
        if req.sender.trim().is_empty() {
            return Err(AppError::Validation("보낸 사람이 없습니다.".into()));
        }
        if req.message.trim().is_empty() {
            return Err(AppError::Validation("메시지를 입력해주세요.".into()));
        }

        let mut store = store.write().await;
        if !store.travels.contains_key(&travel_id) {
            return Err(AppError::NotFound("여행을 찾을 수 없습니다.".into()));
        }

        let message = ChatMessage {
            id: store.next_id(),
            travel_id,
            sender: req.sender,
            message: req.message,
            message_type: req.message_type,
            timestamp: Utc::now(),
        };
        store
            .messages
            .entry(travel_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    /// Stores an uploaded blob and returns the URL the sender should put
    /// in a follow-up IMAGE/FILE message.
    pub async fn store_upload(
        store: &RoomStore,
        file_name: &str,
        data: Vec<u8>,
        max_bytes: usize,
    ) -> Result<UploadResponse, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("빈 파일은 업로드할 수 없습니다.".into()));
        }
        if data.len() > max_bytes {
            return Err(AppError::Validation(
                "파일 크기가 업로드 한도를 초과했습니다.".into(),
            ));
        }

        let file_id = Uuid::new_v4().to_string();
        store
            .write()
            .await
            .uploads
            .insert(file_id.clone(), (file_name.to_string(), data));
        Ok(UploadResponse {
            file_url: format!("/api/chat/files/{file_id}"),
            file_name: file_name.to_string(),
        })
    }

    pub async fn fetch_upload(
        store: &RoomStore,
        file_id: &str,
    ) -> Result<(String, Vec<u8>), AppError> {
        store
            .read()
            .await
            .uploads
            .get(file_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("파일을 찾을 수 없습니다.".into()))
    }
}
