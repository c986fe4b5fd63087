use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::routes::member::{AddMemberRequest, Member};
use crate::store::RoomStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// Only "INVITATION" for now.
    pub notification_type: String,
    pub message: String,
    pub recipient_email: String,
    pub sender_name: String,
    pub travel_id: i64,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub async fn create_invitation(
        store: &RoomStore,
        recipient_email: &str,
        sender_name: &str,
        travel_id: i64,
        travel_title: &str,
    ) -> Result<Self, AppError> {
        if recipient_email.trim().is_empty() {
            return Err(AppError::Validation("초대할 이메일을 입력해주세요.".into()));
        }

        let mut store = store.write().await;
        let already_member = store
            .members
            .values()
            .any(|m| m.travel_id == travel_id && m.email == recipient_email);
        if already_member {
            return Err(AppError::Validation("이미 참여 중인 멤버입니다.".into()));
        }

        let notification = Notification {
            id: store.next_id(),
            notification_type: "INVITATION".to_string(),
            message: format!("{sender_name}님이 '{travel_title}' 여행에 초대했습니다."),
            recipient_email: recipient_email.to_string(),
            sender_name: sender_name.to_string(),
            travel_id,
            read: false,
            created_at: Utc::now(),
        };
        store
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    /// Recipient's notifications, newest first.
    pub async fn find_by_recipient(store: &RoomStore, email: &str) -> Vec<Self> {
        let mut notifications: Vec<Notification> = store
            .read()
            .await
            .notifications
            .values()
            .filter(|n| n.recipient_email == email)
            .cloned()
            .collect();
        notifications.sort_by_key(|n| std::cmp::Reverse(n.id));
        notifications
    }

    pub async fn unread_count(store: &RoomStore, email: &str) -> usize {
        store
            .read()
            .await
            .notifications
            .values()
            .filter(|n| n.recipient_email == email && !n.read)
            .count()
    }

    pub async fn mark_as_read(store: &RoomStore, notification_id: i64) -> Result<Self, AppError> {
        let mut store = store.write().await;
        let notification = store
            .notifications
            .get_mut(&notification_id)
            .ok_or_else(|| AppError::NotFound("알림을 찾을 수 없습니다.".into()))?;
        notification.read = true;
        Ok(notification.clone())
    }

    /// Accepting an invitation joins the recipient to the travel and
    /// consumes the notification.
    pub async fn accept(
        store: &RoomStore,
        notification_id: i64,
        member_name: Option<String>,
    ) -> Result<Member, AppError> {
        let notification = {
            let guard = store.read().await;
            guard
                .notifications
                .get(&notification_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("알림을 찾을 수 없습니다.".into()))?
        };

        let name = member_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                notification
                    .recipient_email
                    .split('@')
                    .next()
                    .unwrap_or(&notification.recipient_email)
                    .to_string()
            });

        // Join first; a failed join (already a member, room deleted)
        // leaves the invitation in place.
        let member = Member::create(
            store,
            notification.travel_id,
            AddMemberRequest {
                name,
                email: notification.recipient_email.clone(),
            },
        )
        .await?;

        store.write().await.notifications.remove(&notification_id);
        Ok(member)
    }

    pub async fn reject(store: &RoomStore, notification_id: i64) -> Result<(), AppError> {
        let mut store = store.write().await;
        store
            .notifications
            .remove(&notification_id)
            .ok_or_else(|| AppError::NotFound("알림을 찾을 수 없습니다.".into()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::travel::{CreateTravelRequest, Travel};
    use chrono::NaiveDate;

    async fn seed(store: &RoomStore) -> Travel {
        Travel::create(
            store,
            CreateTravelRequest {
                title: "제주 한 바퀴".into(),
                start_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
                creator_email: "owner@podo.app".into(),
                creator_name: "지민".into(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn accept_joins_the_room_and_consumes_the_notification() {
        let store = RoomStore::new();
        let travel = seed(&store).await;

        let invite = Notification::create_invitation(
            &store,
            "friend@podo.app",
            "지민",
            travel.travel_id,
            &travel.title,
        )
        .await
        .unwrap();
        assert_eq!(Notification::unread_count(&store, "friend@podo.app").await, 1);

        let member = Notification::accept(&store, invite.id, Some("하늘".into()))
            .await
            .unwrap();
        assert_eq!(member.travel_id, travel.travel_id);
        assert_eq!(member.name, "하늘");
        assert!(
            Notification::find_by_recipient(&store, "friend@podo.app")
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn inviting_an_existing_member_is_rejected() {
        let store = RoomStore::new();
        let travel = seed(&store).await;

        let err = Notification::create_invitation(
            &store,
            "owner@podo.app",
            "지민",
            travel.travel_id,
            &travel.title,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn reject_only_removes_the_notification() {
        let store = RoomStore::new();
        let travel = seed(&store).await;

        let invite = Notification::create_invitation(
            &store,
            "friend@podo.app",
            "지민",
            travel.travel_id,
            &travel.title,
        )
        .await
        .unwrap();
        Notification::reject(&store, invite.id).await.unwrap();

        let members = Member::find_by_travel(&store, travel.travel_id).await;
        assert_eq!(members.len(), 1);
    }
}
