use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::RoomStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub travel_id: i64,
    pub title: String,
    pub closed: bool,
    pub options: Vec<VoteOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOption {
    pub id: i64,
    pub text: String,
    /// Derived tally, maintained alongside the ballot map.
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVoteRequest {
    pub title: String,
    pub options: Vec<String>,
}

/// What a cast did to the caller's ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastOutcome {
    /// First ballot on this vote.
    Cast,
    /// Ballot moved from another option.
    Changed,
    /// Same option clicked again; ballot withdrawn.
    Cancelled,
}

impl Vote {
    /// Votes for a room, newest first (matching the source ordering).
    pub async fn find_by_travel(store: &RoomStore, travel_id: i64) -> Vec<Self> {
        let mut votes: Vec<Vote> = store
            .read()
            .await
            .votes
            .values()
            .filter(|v| v.travel_id == travel_id)
            .cloned()
            .collect();
        votes.sort_by_key(|v| std::cmp::Reverse(v.id));
        votes
    }

    pub async fn create(
        store: &RoomStore,
        travel_id: i64,
        req: CreateVoteRequest,
    ) -> Result<Self, AppError> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("투표 제목을 입력해주세요.".into()));
        }
        if req.options.iter().filter(|o| !o.trim().is_empty()).count() < 2 {
            return Err(AppError::Validation(
                "선택지는 두 개 이상이어야 합니다.".into(),
            ));
        }

        let mut store = store.write().await;
        if !store.travels.contains_key(&travel_id) {
            return Err(AppError::NotFound("여행을 찾을 수 없습니다.".into()));
        }

        let id = store.next_id();
        let options = req
            .options
            .into_iter()
            .filter(|o| !o.trim().is_empty())
            .map(|text| {
                let option_id = store.next_id();
                VoteOption {
                    id: option_id,
                    text,
                    count: 0,
                }
            })
            .collect();

        let vote = Vote {
            id,
            travel_id,
            title: req.title,
            closed: false,
            options,
        };
        store.votes.insert(id, vote.clone());
        Ok(vote)
    }

    /// Moves, withdraws or places the caller's single ballot. The whole
    /// decision runs under the write lock so tallies and the ballot map
    /// never diverge.
    pub async fn cast(
        store: &RoomStore,
        option_id: i64,
        user_email: &str,
    ) -> Result<(CastOutcome, i64), AppError> {
        if user_email.trim().is_empty() {
            return Err(AppError::Validation("로그인이 필요합니다.".into()));
        }

        let mut store = store.write().await;
        let vote_id = store
            .votes
            .values()
            .find(|v| v.options.iter().any(|o| o.id == option_id))
            .map(|v| v.id)
            .ok_or_else(|| AppError::NotFound("선택지를 찾을 수 없습니다.".into()))?;

        let (travel_id, closed) = {
            let vote = &store.votes[&vote_id];
            (vote.travel_id, vote.closed)
        };
        if closed {
            return Err(AppError::Validation("이미 종료된 투표입니다.".into()));
        }

        let ballot_key = (vote_id, user_email.to_string());
        let previous = store.ballots.get(&ballot_key).copied();

        let outcome = match previous {
            Some(prev) if prev == option_id => {
                store.ballots.remove(&ballot_key);
                CastOutcome::Cancelled
            }
            Some(_) => {
                store.ballots.insert(ballot_key, option_id);
                CastOutcome::Changed
            }
            None => {
                store.ballots.insert(ballot_key, option_id);
                CastOutcome::Cast
            }
        };

        // The vote was looked up under this same lock, so a miss here
        // means the store itself is inconsistent.
        let vote = store
            .votes
            .get_mut(&vote_id)
            .ok_or_else(|| AppError::Internal("투표 상태가 손상되었습니다.".into()))?;
        if let Some(prev) = previous
            && let Some(o) = vote.options.iter_mut().find(|o| o.id == prev)
        {
            o.count -= 1;
        }
        if outcome != CastOutcome::Cancelled
            && let Some(o) = vote.options.iter_mut().find(|o| o.id == option_id)
        {
            o.count += 1;
        }

        Ok((outcome, travel_id))
    }

    /// The caller's current ballots in one room: vote id -> option id.
    pub async fn my_votes(
        store: &RoomStore,
        travel_id: i64,
        user_email: &str,
    ) -> HashMap<i64, i64> {
        let store = store.read().await;
        store
            .ballots
            .iter()
            .filter(|((vote_id, email), _)| {
                email == user_email
                    && store
                        .votes
                        .get(vote_id)
                        .is_some_and(|v| v.travel_id == travel_id)
            })
            .map(|((vote_id, _), option_id)| (*vote_id, *option_id))
            .collect()
    }

    pub async fn delete(store: &RoomStore, vote_id: i64) -> Result<i64, AppError> {
        let mut store = store.write().await;
        let vote = store
            .votes
            .remove(&vote_id)
            .ok_or_else(|| AppError::NotFound("투표를 찾을 수 없습니다.".into()))?;
        store.ballots.retain(|(v, _), _| *v != vote_id);
        Ok(vote.travel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::travel::{CreateTravelRequest, Travel};
    use chrono::NaiveDate;

    async fn seed(store: &RoomStore) -> Vote {
        let travel = Travel::create(
            store,
            CreateTravelRequest {
                title: "회식 같은 여행".into(),
                start_date: NaiveDate::from_ymd_opt(2026, 9, 5).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 9, 6).unwrap(),
                creator_email: "owner@podo.app".into(),
                creator_name: "지민".into(),
            },
        )
        .await
        .unwrap();
        Vote::create(
            store,
            travel.travel_id,
            CreateVoteRequest {
                title: "저녁 메뉴는?".into(),
                options: vec!["짜장면".into(), "짬뽕".into()],
            },
        )
        .await
        .unwrap()
    }

    fn count_of(vote: &Vote, option_id: i64) -> i64 {
        vote.options.iter().find(|o| o.id == option_id).unwrap().count
    }

    #[tokio::test]
    async fn recast_moves_the_single_ballot() {
        let store = RoomStore::new();
        let vote = seed(&store).await;
        let (x, y) = (vote.options[0].id, vote.options[1].id);

        let (outcome, _) = Vote::cast(&store, x, "voter@podo.app").await.unwrap();
        assert_eq!(outcome, CastOutcome::Cast);

        let (outcome, _) = Vote::cast(&store, y, "voter@podo.app").await.unwrap();
        assert_eq!(outcome, CastOutcome::Changed);

        let fresh = &Vote::find_by_travel(&store, vote.travel_id).await[0];
        assert_eq!(count_of(fresh, x), 0);
        assert_eq!(count_of(fresh, y), 1);

        let mine = Vote::my_votes(&store, vote.travel_id, "voter@podo.app").await;
        assert_eq!(mine.get(&vote.id), Some(&y));
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn same_option_again_withdraws_the_ballot() {
        let store = RoomStore::new();
        let vote = seed(&store).await;
        let x = vote.options[0].id;

        Vote::cast(&store, x, "voter@podo.app").await.unwrap();
        let (outcome, _) = Vote::cast(&store, x, "voter@podo.app").await.unwrap();
        assert_eq!(outcome, CastOutcome::Cancelled);

        let fresh = &Vote::find_by_travel(&store, vote.travel_id).await[0];
        assert_eq!(count_of(fresh, x), 0);
        assert!(
            Vote::my_votes(&store, vote.travel_id, "voter@podo.app")
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn cast_on_a_closed_vote_is_rejected() {
        let store = RoomStore::new();
        let vote = seed(&store).await;
        let x = vote.options[0].id;

        Vote::cast(&store, x, "voter@podo.app").await.unwrap();
        store
            .write()
            .await
            .votes
            .get_mut(&vote.id)
            .unwrap()
            .closed = true;

        let err = Vote::cast(&store, x, "voter@podo.app").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // The existing ballot and tally are untouched.
        let fresh = &Vote::find_by_travel(&store, vote.travel_id).await[0];
        assert_eq!(count_of(fresh, x), 1);
        let mine = Vote::my_votes(&store, vote.travel_id, "voter@podo.app").await;
        assert_eq!(mine.get(&vote.id), Some(&x));
    }

    #[tokio::test]
    async fn anonymous_cast_is_rejected() {
        let store = RoomStore::new();
        let vote = seed(&store).await;

        let err = Vote::cast(&store, vote.options[0].id, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn two_voters_tally_independently() {
        let store = RoomStore::new();
        let vote = seed(&store).await;
        let x = vote.options[0].id;

        Vote::cast(&store, x, "a@podo.app").await.unwrap();
        Vote::cast(&store, x, "b@podo.app").await.unwrap();

        let fresh = &Vote::find_by_travel(&store, vote.travel_id).await[0];
        assert_eq!(count_of(fresh, x), 2);
    }
}
