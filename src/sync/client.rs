use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{SessionContext, SyncConfig, SyncError};
use crate::routes::chat::{ChatMessage, SendMessageRequest, UploadResponse};
use crate::routes::item::Item;
use crate::routes::member::{AddMemberRequest, InviteRequest, Member};
use crate::routes::notification::Notification;
use crate::routes::schedule::{Schedule, ScheduleRequest, UpdateScheduleRequest};
use crate::routes::travel::{CreateTravelRequest, Travel, UpdateTravelRequest};
use crate::routes::vote::{CastOutcome, CreateVoteRequest, Vote};
use crate::utils::parse_time;

/// Shape of every error body the server produces.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    code: i32,
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct CastResponse {
    result: CastOutcome,
}

#[derive(Debug, Deserialize)]
struct UnreadCountResponse {
    count: usize,
}

/// All writes (and the reads that feed them) go through here.
///
/// Every mutation is a plain HTTP request; the server either applies it
/// and broadcasts to the room, or rejects it and nothing happened. On
/// rejection the local caches are untouched, so there is never anything
/// to roll back.
pub struct MutationClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionContext,
}

impl MutationClient {
    pub fn new(config: &SyncConfig, session: SessionContext) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Votes and owner-gated mutations are refused locally for guests;
    /// no request is sent.
    fn require_email(&self) -> Result<&str, SyncError> {
        self.session
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| SyncError::Validation("로그인이 필요합니다.".into()))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
        Ok(Self::check(response).await?.json().await?)
    }

    /// Maps the server's rejection statuses onto the sync error variants
    /// the UI switches on, keeping the server's message.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error_message)
            .unwrap_or_else(|_| status.to_string());

        Err(match status.as_u16() {
            400 => SyncError::Validation(message),
            403 => SyncError::Forbidden(message),
            404 => SyncError::NotFound(message),
            409 => SyncError::Conflict(message),
            code => SyncError::Http {
                status: code,
                message,
            },
        })
    }

    // --- travels ---

    pub async fn create_travel(
        &self,
        title: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Travel, SyncError> {
        let email = self.require_email()?.to_string();
        let req = CreateTravelRequest {
            title: title.to_string(),
            start_date,
            end_date,
            creator_email: email,
            creator_name: self.session.username.clone(),
        };
        let response = self.http.post(self.url("/travels")).json(&req).send().await?;
        Self::decode(response).await
    }

    pub async fn my_travels(&self) -> Result<Vec<Travel>, SyncError> {
        let email = self.require_email()?;
        let response = self
            .http
            .get(self.url("/travels/my"))
            .query(&[("email", email)])
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn travel(&self, travel_id: i64) -> Result<Travel, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/travels/{travel_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn travel_by_invite_code(&self, code: &str) -> Result<Travel, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/travels/code/{code}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn join_travel(&self, travel_id: i64) -> Result<Member, SyncError> {
        let email = self.require_email()?;
        let response = self
            .http
            .post(self.url(&format!("/travels/{travel_id}/join")))
            .query(&[("email", email), ("nickname", &self.session.username)])
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn update_travel(
        &self,
        travel_id: i64,
        title: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Travel, SyncError> {
        let email = self.require_email()?.to_string();
        let req = UpdateTravelRequest {
            title: title.to_string(),
            start_date,
            end_date,
            editor_email: email,
        };
        let response = self
            .http
            .put(self.url(&format!("/travels/{travel_id}")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_travel(&self, travel_id: i64) -> Result<(), SyncError> {
        let email = self.require_email()?;
        let response = self
            .http
            .delete(self.url(&format!("/travels/{travel_id}")))
            .query(&[("email", email)])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // --- members ---

    pub async fn members(&self, travel_id: i64) -> Result<Vec<Member>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/members/{travel_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn add_member(
        &self,
        travel_id: i64,
        name: &str,
        email: &str,
    ) -> Result<Member, SyncError> {
        let req = AddMemberRequest {
            name: name.to_string(),
            email: email.to_string(),
        };
        let response = self
            .http
            .post(self.url(&format!("/members/{travel_id}")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn invite_member(
        &self,
        travel_id: i64,
        recipient_email: &str,
    ) -> Result<Notification, SyncError> {
        let req = InviteRequest {
            email: recipient_email.to_string(),
            sender_name: self.session.username.clone(),
        };
        let response = self
            .http
            .post(self.url(&format!("/members/{travel_id}/invite")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn toggle_online(&self, member_id: i64) -> Result<Member, SyncError> {
        let response = self
            .http
            .patch(self.url(&format!("/members/{member_id}/online")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn remove_member(&self, member_id: i64) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(self.url(&format!("/members/{member_id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // --- items ---

    pub async fn items(&self, travel_id: i64) -> Result<Vec<Item>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/items/{travel_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn add_item(
        &self,
        travel_id: i64,
        name: &str,
        category: Option<&str>,
    ) -> Result<Item, SyncError> {
        if name.trim().is_empty() {
            return Err(SyncError::Validation("물건 이름을 입력해주세요.".into()));
        }
        let req = crate::routes::item::AddItemRequest {
            name: name.to_string(),
            category: category.map(str::to_string),
        };
        let response = self
            .http
            .post(self.url(&format!("/items/{travel_id}")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Takes the cached item so the no-assignee case is refused without
    /// a round trip. The server re-checks against fresh state either way.
    pub async fn toggle_check(&self, item: &Item) -> Result<Item, SyncError> {
        if !item.checked && item.assignee.is_none() {
            return Err(SyncError::Validation(
                "담당자를 먼저 지정해야 체크할 수 있습니다.".into(),
            ));
        }
        let req = crate::routes::item::CheckRequest {
            checker: Some(self.session.username.clone()),
        };
        let response = self
            .http
            .patch(self.url(&format!("/items/{}/check", item.id)))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn toggle_assignee(&self, item_id: i64) -> Result<Item, SyncError> {
        let req = crate::routes::item::AssigneeRequest {
            assignee: Some(self.session.username.clone()),
        };
        let response = self
            .http
            .patch(self.url(&format!("/items/{item_id}/assignee")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_item(&self, item_id: i64) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(self.url(&format!("/items/{item_id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // --- schedules ---

    pub async fn schedules(&self, travel_id: i64, day: i64) -> Result<Vec<Schedule>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/schedules/{travel_id}/{day}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn create_schedule(
        &self,
        travel_id: i64,
        req: ScheduleRequest,
    ) -> Result<Schedule, SyncError> {
        Self::validate_schedule(&req.title, &req.time)?;
        let response = self
            .http
            .post(self.url(&format!("/schedules/{travel_id}")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Carries the version the caller last fetched. A 409 here means a
    /// concurrent edit won; refetch and let the user redo their change on
    /// fresh state.
    pub async fn update_schedule(
        &self,
        schedule_id: i64,
        req: UpdateScheduleRequest,
    ) -> Result<Schedule, SyncError> {
        Self::validate_schedule(&req.title, &req.time)?;
        let response = self
            .http
            .put(self.url(&format!("/schedules/{schedule_id}")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_schedule(&self, schedule_id: i64, version: i64) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(self.url(&format!("/schedules/{schedule_id}")))
            .query(&[("version", version)])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn optimize_day(&self, travel_id: i64, day: i64) -> Result<(), SyncError> {
        let response = self
            .http
            .post(self.url(&format!("/schedules/{travel_id}/{day}/optimize")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn validate_schedule(title: &str, time: &str) -> Result<(), SyncError> {
        if title.trim().is_empty() {
            return Err(SyncError::Validation("일정 제목을 입력해주세요.".into()));
        }
        if parse_time(time).is_none() {
            return Err(SyncError::Validation(
                "시간은 HH:MM 형식으로 입력해주세요.".into(),
            ));
        }
        Ok(())
    }

    // --- votes ---

    pub async fn votes(&self, travel_id: i64) -> Result<Vec<Vote>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/votes/{travel_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn create_vote(
        &self,
        travel_id: i64,
        title: &str,
        options: Vec<String>,
    ) -> Result<Vote, SyncError> {
        let req = CreateVoteRequest {
            title: title.to_string(),
            options,
        };
        let response = self
            .http
            .post(self.url(&format!("/votes/{travel_id}")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Casts on one option, then refetches the caller's ballots so the
    /// UI highlights what the server actually recorded rather than what
    /// was clicked.
    pub async fn cast_vote(
        &self,
        travel_id: i64,
        option_id: i64,
    ) -> Result<(CastOutcome, HashMap<i64, i64>), SyncError> {
        let email = self.require_email()?.to_string();
        let response = self
            .http
            .post(self.url(&format!("/votes/cast/{option_id}")))
            .query(&[("user_email", email.as_str())])
            .send()
            .await?;
        let cast: CastResponse = Self::decode(response).await?;
        let mine = self.my_votes(travel_id).await?;
        Ok((cast.result, mine))
    }

    pub async fn my_votes(&self, travel_id: i64) -> Result<HashMap<i64, i64>, SyncError> {
        let email = self.require_email()?;
        let response = self
            .http
            .get(self.url(&format!("/votes/my-votes/{travel_id}")))
            .query(&[("user_email", email)])
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_vote(&self, vote_id: i64) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(self.url(&format!("/votes/{vote_id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // --- chat ---

    pub async fn chat_history(&self, travel_id: i64) -> Result<Vec<ChatMessage>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/chat/{travel_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Returns the saved message. The room broadcast will echo the same
    /// message back; [`super::ChatLog`] drops that copy.
    pub async fn send_message(
        &self,
        travel_id: i64,
        text: &str,
    ) -> Result<ChatMessage, SyncError> {
        let req = SendMessageRequest {
            sender: self.session.username.clone(),
            message: text.to_string(),
            message_type: "TEXT".to_string(),
        };
        let response = self
            .http
            .post(self.url(&format!("/chat/{travel_id}")))
            .json(&req)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn upload_file(
        &self,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse, SyncError> {
        let response = self
            .http
            .post(self.url("/chat/upload"))
            .query(&[("file_name", file_name)])
            .body(data)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, SyncError> {
        let response = self
            .http
            .get(self.url(&format!("/chat/files/{file_id}")))
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }

    // --- notifications ---

    pub async fn notifications(&self) -> Result<Vec<Notification>, SyncError> {
        let email = self.require_email()?;
        let response = self
            .http
            .get(self.url(&format!("/notifications/{email}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn unread_count(&self) -> Result<usize, SyncError> {
        let email = self.require_email()?;
        let response = self
            .http
            .get(self.url(&format!("/notifications/{email}/unread-count")))
            .send()
            .await?;
        let body: UnreadCountResponse = Self::decode(response).await?;
        Ok(body.count)
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: i64,
    ) -> Result<Notification, SyncError> {
        let response = self
            .http
            .patch(self.url(&format!("/notifications/{notification_id}/read")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn accept_invitation(&self, notification_id: i64) -> Result<Member, SyncError> {
        let response = self
            .http
            .post(self.url(&format!("/notifications/{notification_id}/accept")))
            .query(&[("name", self.session.username.as_str())])
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn reject_invitation(&self, notification_id: i64) -> Result<(), SyncError> {
        let response = self
            .http
            .post(self.url(&format!("/notifications/{notification_id}/reject")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
