use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::routes::member::Member;
use crate::store::RoomStore;
use crate::utils::generate_invite_code;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Travel {
    pub travel_id: i64,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub invite_code: String,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
}

impl Travel {
    /// Trip length in days, inclusive of both ends. Day numbers in the
    /// itinerary are 1-based and bounded by this.
    pub fn length_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTravelRequest {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub creator_email: String,
    pub creator_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTravelRequest {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Identity of the caller; only the owner may edit room settings.
    pub editor_email: String,
}

impl Travel {
    pub async fn create(store: &RoomStore, req: CreateTravelRequest) -> Result<Self, AppError> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("여행 제목을 입력해주세요.".into()));
        }
        if req.end_date < req.start_date {
            return Err(AppError::Validation(
                "종료일이 시작일보다 빠를 수 없습니다.".into(),
            ));
        }

        let mut store = store.write().await;
        let travel_id = store.next_id();
        let travel = Travel {
            travel_id,
            title: req.title,
            start_date: req.start_date,
            end_date: req.end_date,
            invite_code: generate_invite_code(),
            owner_email: req.creator_email.clone(),
            created_at: Utc::now(),
        };
        store.travels.insert(travel_id, travel.clone());

        // Creator becomes the first member.
        let member_id = store.next_id();
        store.members.insert(
            member_id,
            Member {
                id: member_id,
                travel_id,
                name: req.creator_name,
                email: req.creator_email,
                online: true,
            },
        );

        Ok(travel)
    }

    pub async fn find_by_id(store: &RoomStore, travel_id: i64) -> Result<Self, AppError> {
        store
            .read()
            .await
            .travels
            .get(&travel_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("여행을 찾을 수 없습니다.".into()))
    }

    pub async fn find_by_invite_code(store: &RoomStore, code: &str) -> Result<Self, AppError> {
        store
            .read()
            .await
            .travels
            .values()
            .find(|t| t.invite_code == code)
            .cloned()
            .ok_or_else(|| AppError::NotFound("유효하지 않은 초대코드입니다.".into()))
    }

    pub async fn find_all(store: &RoomStore) -> Vec<Self> {
        let mut travels: Vec<Travel> = store.read().await.travels.values().cloned().collect();
        travels.sort_by_key(|t| t.travel_id);
        travels
    }

    pub async fn find_by_member_email(store: &RoomStore, email: &str) -> Vec<Self> {
        let store = store.read().await;
        let mut travels: Vec<Travel> = store
            .members
            .values()
            .filter(|m| m.email == email)
            .filter_map(|m| store.travels.get(&m.travel_id).cloned())
            .collect();
        travels.sort_by_key(|t| t.travel_id);
        travels.dedup_by_key(|t| t.travel_id);
        travels
    }

    pub async fn join(
        store: &RoomStore,
        travel_id: i64,
        email: &str,
        nickname: &str,
    ) -> Result<Member, AppError> {
        let mut store = store.write().await;
        if !store.travels.contains_key(&travel_id) {
            return Err(AppError::NotFound("여행을 찾을 수 없습니다.".into()));
        }

        let already = store
            .members
            .values()
            .any(|m| m.travel_id == travel_id && m.email == email);
        if already {
            return Err(AppError::Validation("이미 참여한 여행입니다.".into()));
        }

        let member_id = store.next_id();
        let member = Member {
            id: member_id,
            travel_id,
            name: nickname.to_string(),
            email: email.to_string(),
            online: true,
        };
        store.members.insert(member_id, member.clone());
        Ok(member)
    }

    pub async fn update(
        store: &RoomStore,
        travel_id: i64,
        req: UpdateTravelRequest,
    ) -> Result<Self, AppError> {
        let mut store = store.write().await;
        let travel = store
            .travels
            .get_mut(&travel_id)
            .ok_or_else(|| AppError::NotFound("여행을 찾을 수 없습니다.".into()))?;

        if travel.owner_email != req.editor_email {
            return Err(AppError::Forbidden(
                "방장만 여행 정보를 수정할 수 있습니다.".into(),
            ));
        }

        travel.title = req.title;
        travel.start_date = req.start_date;
        travel.end_date = req.end_date;
        Ok(travel.clone())
    }

    /// Owner-only delete; cascades to every dependent entity.
    pub async fn delete(store: &RoomStore, travel_id: i64, email: &str) -> Result<(), AppError> {
        let mut store = store.write().await;
        let travel = store
            .travels
            .get(&travel_id)
            .ok_or_else(|| AppError::NotFound("여행을 찾을 수 없습니다.".into()))?;

        if travel.owner_email != email {
            return Err(AppError::Forbidden(
                "방장만 여행을 삭제할 수 있습니다.".into(),
            ));
        }

        store.remove_travel(travel_id);
        Ok(())
    }
}
