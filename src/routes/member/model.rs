use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::routes::notification::Notification;
use crate::store::RoomStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub travel_id: i64,
    pub name: String,
    pub email: String,
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub sender_name: String,
}

impl Member {
    pub async fn find_by_travel(store: &RoomStore, travel_id: i64) -> Vec<Self> {
        let mut members: Vec<Member> = store
            .read()
            .await
            .members
            .values()
            .filter(|m| m.travel_id == travel_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        members
    }

    pub async fn create(
        store: &RoomStore,
        travel_id: i64,
        req: AddMemberRequest,
    ) -> Result<Self, AppError> {
        let mut store = store.write().await;
        if !store.travels.contains_key(&travel_id) {
            return Err(AppError::NotFound("여행을 찾을 수 없습니다.".into()));
        }
        let exists = store
            .members
            .values()
            .any(|m| m.travel_id == travel_id && m.email == req.email);
        if exists {
            return Err(AppError::Validation("이미 등록된 멤버입니다.".into()));
        }

        let id = store.next_id();
        let member = Member {
            id,
            travel_id,
            name: req.name,
            email: req.email,
            online: true,
        };
        store.members.insert(id, member.clone());
        Ok(member)
    }

    pub async fn toggle_online(store: &RoomStore, member_id: i64) -> Result<Self, AppError> {
        let mut store = store.write().await;
        let member = store
            .members
            .get_mut(&member_id)
            .ok_or_else(|| AppError::NotFound("멤버를 찾을 수 없습니다.".into()))?;
        member.online = !member.online;
        Ok(member.clone())
    }

    pub async fn delete(store: &RoomStore, member_id: i64) -> Result<i64, AppError> {
        let mut store = store.write().await;
        let member = store
            .members
            .remove(&member_id)
            .ok_or_else(|| AppError::NotFound("멤버를 찾을 수 없습니다.".into()))?;
        Ok(member.travel_id)
    }

    /// Creates an invitation notification for the recipient. Membership is
    /// only granted when the invitation is accepted.
    pub async fn invite(
        store: &RoomStore,
        travel_id: i64,
        req: InviteRequest,
    ) -> Result<Notification, AppError> {
        let title = {
            let store = store.read().await;
            store
                .travels
                .get(&travel_id)
                .map(|t| t.title.clone())
                .ok_or_else(|| AppError::NotFound("여행을 찾을 수 없습니다.".into()))?
        };
        Notification::create_invitation(store, &req.email, &req.sender_name, travel_id, &title)
            .await
    }
}
