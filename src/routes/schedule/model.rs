use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::RoomStore;
use crate::utils::{calculate_distance, format_time, parse_time};

/// Minutes between consecutive entries after a route optimization pass.
const OPTIMIZE_SLOT_MINUTES: u32 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub travel_id: i64,
    /// 1-based day of the trip, bounded by the trip length.
    pub day: i64,
    pub time: String,
    #[serde(rename = "type")]
    pub schedule_type: String,
    pub title: String,
    pub color: Option<String>,
    pub place_name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub address: Option<String>,
    /// Compare-and-swap token. Every accepted write increments it; a
    /// mutation carrying a stale value is rejected with a conflict.
    pub version: i64,
}

impl Schedule {
    fn has_coords(&self) -> bool {
        matches!((self.x, self.y), (Some(x), Some(y)) if x != 0.0 && y != 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub day: i64,
    pub time: String,
    #[serde(rename = "type")]
    pub schedule_type: String,
    pub title: String,
    pub color: Option<String>,
    pub place_name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub time: String,
    #[serde(rename = "type")]
    pub schedule_type: String,
    pub title: String,
    pub place_name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub address: Option<String>,
    /// The version the client last fetched. The server is the arbiter:
    /// stale version -> 409, nothing applied.
    pub version: i64,
}

fn validate(title: &str, time: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("일정 제목을 입력해주세요.".into()));
    }
    if parse_time(time).is_none() {
        return Err(AppError::Validation(
            "시간은 HH:MM 형식으로 입력해주세요.".into(),
        ));
    }
    Ok(())
}

impl Schedule {
    /// Entries for one day, ordered by time of day.
    pub async fn find_by_day(store: &RoomStore, travel_id: i64, day: i64) -> Vec<Self> {
        let mut schedules: Vec<Schedule> = store
            .read()
            .await
            .schedules
            .values()
            .filter(|s| s.travel_id == travel_id && s.day == day)
            .cloned()
            .collect();
        schedules.sort_by_key(|s| (parse_time(&s.time).unwrap_or(u32::MAX), s.id));
        schedules
    }

    pub async fn create(
        store: &RoomStore,
        travel_id: i64,
        req: ScheduleRequest,
    ) -> Result<Self, AppError> {
        validate(&req.title, &req.time)?;

        let mut store = store.write().await;
        let travel = store
            .travels
            .get(&travel_id)
            .ok_or_else(|| AppError::NotFound("여행을 찾을 수 없습니다.".into()))?;

        if req.day < 1 || req.day > travel.length_days() {
            return Err(AppError::Validation(format!(
                "여행 일차는 1과 {} 사이여야 합니다.",
                travel.length_days()
            )));
        }

        let id = store.next_id();
        let schedule = Schedule {
            id,
            travel_id,
            day: req.day,
            time: req.time,
            schedule_type: req.schedule_type,
            title: req.title,
            color: req.color,
            place_name: req.place_name,
            x: req.x,
            y: req.y,
            address: req.address,
            version: 1,
        };
        store.schedules.insert(id, schedule.clone());
        Ok(schedule)
    }

    /// Compare-and-swap update. The whole check-and-apply runs under the
    /// store's write lock, so of two concurrent writers exactly one wins.
    pub async fn update(
        store: &RoomStore,
        schedule_id: i64,
        req: UpdateScheduleRequest,
    ) -> Result<Self, AppError> {
        validate(&req.title, &req.time)?;

        let mut store = store.write().await;
        let schedule = store
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| AppError::NotFound("일정을 찾을 수 없습니다.".into()))?;

        if schedule.version != req.version {
            return Err(AppError::Conflict(
                "누군가 먼저 수정했습니다. 새로고침 해주세요.".into(),
            ));
        }

        schedule.time = req.time;
        schedule.schedule_type = req.schedule_type;
        schedule.title = req.title;
        schedule.place_name = req.place_name;
        schedule.x = req.x;
        schedule.y = req.y;
        schedule.address = req.address;
        schedule.version += 1;
        Ok(schedule.clone())
    }

    /// Version-checked delete; same loser-is-told-to-reload contract as
    /// update.
    pub async fn delete(
        store: &RoomStore,
        schedule_id: i64,
        version: i64,
    ) -> Result<i64, AppError> {
        let mut store = store.write().await;
        let schedule = store
            .schedules
            .get(&schedule_id)
            .ok_or_else(|| AppError::NotFound("일정을 찾을 수 없습니다.".into()))?;

        if schedule.version != version {
            return Err(AppError::Conflict(
                "누군가 먼저 수정했습니다. 새로고침 해주세요.".into(),
            ));
        }

        let travel_id = schedule.travel_id;
        store.schedules.remove(&schedule_id);
        Ok(travel_id)
    }

    /// Greedy nearest-neighbour reorder of one day's entries, then
    /// sequential re-timing in 90-minute slots from the day's original
    /// start time. Entries without coordinates keep their relative order
    /// at the end of the day. O(n^2), fine at itinerary scale.
    pub async fn optimize_day(store: &RoomStore, travel_id: i64, day: i64) -> Result<usize, AppError> {
        let mut guard = store.write().await;
        if !guard.travels.contains_key(&travel_id) {
            return Err(AppError::NotFound("여행을 찾을 수 없습니다.".into()));
        }

        let mut all: Vec<Schedule> = guard
            .schedules
            .values()
            .filter(|s| s.travel_id == travel_id && s.day == day)
            .cloned()
            .collect();
        all.sort_by_key(|s| (parse_time(&s.time).unwrap_or(u32::MAX), s.id));
        if all.len() <= 1 {
            return Ok(0);
        }

        let (with_coords, without_coords): (Vec<Schedule>, Vec<Schedule>) =
            all.iter().cloned().partition(Schedule::has_coords);
        if with_coords.is_empty() {
            return Ok(0);
        }

        let mut ordered = Vec::with_capacity(all.len());
        let mut remaining = with_coords;
        let mut current = remaining.remove(0);
        ordered.push(current.clone());

        while let Some((nearest_idx, _)) = remaining
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let d = calculate_distance(
                    current.y.unwrap_or_default(),
                    current.x.unwrap_or_default(),
                    s.y.unwrap_or_default(),
                    s.x.unwrap_or_default(),
                );
                (i, d)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
        {
            current = remaining.remove(nearest_idx);
            ordered.push(current.clone());
        }
        ordered.extend(without_coords);

        let start = parse_time(&all[0].time).unwrap_or(9 * 60);
        for (i, entry) in ordered.iter().enumerate() {
            if let Some(s) = guard.schedules.get_mut(&entry.id) {
                s.time = format_time(start + i as u32 * OPTIMIZE_SLOT_MINUTES);
                s.version += 1;
            }
        }

        Ok(ordered.len())
    }
}
