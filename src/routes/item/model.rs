use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::RoomStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub travel_id: i64,
    pub name: String,
    pub category: String,
    pub checked: bool,
    /// Who marked the item done; cleared when unchecked.
    pub checker: Option<String>,
    /// Who will bring the item. Must be set before the item can be checked.
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub checker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssigneeRequest {
    pub assignee: Option<String>,
}

impl Item {
    pub async fn find_by_travel(store: &RoomStore, travel_id: i64) -> Vec<Self> {
        let mut items: Vec<Item> = store
            .read()
            .await
            .items
            .values()
            .filter(|i| i.travel_id == travel_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        items
    }

    pub async fn create(
        store: &RoomStore,
        travel_id: i64,
        req: AddItemRequest,
    ) -> Result<Self, AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("물건 이름을 입력해주세요.".into()));
        }

        let mut store = store.write().await;
        if !store.travels.contains_key(&travel_id) {
            return Err(AppError::NotFound("여행을 찾을 수 없습니다.".into()));
        }

        let id = store.next_id();
        let item = Item {
            id,
            travel_id,
            name: req.name,
            category: req.category.unwrap_or_else(|| "기타".to_string()),
            checked: false,
            checker: None,
            assignee: None,
        };
        store.items.insert(id, item.clone());
        Ok(item)
    }

    /// Toggles the checked flag. Checking requires an assignee first;
    /// unchecking also clears the checker.
    pub async fn toggle_check(
        store: &RoomStore,
        item_id: i64,
        req: CheckRequest,
    ) -> Result<Self, AppError> {
        let mut store = store.write().await;
        let item = store
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound("물건을 찾을 수 없습니다.".into()))?;

        if item.checked {
            item.checked = false;
            item.checker = None;
        } else {
            if item.assignee.is_none() {
                return Err(AppError::Validation(
                    "담당자를 먼저 지정해야 체크할 수 있습니다.".into(),
                ));
            }
            item.checked = true;
            item.checker = req.checker;
        }
        Ok(item.clone())
    }

    /// Claims or releases the assignee slot. Re-sending the current
    /// assignee releases it; anything else is last-writer-wins.
    pub async fn toggle_assignee(
        store: &RoomStore,
        item_id: i64,
        req: AssigneeRequest,
    ) -> Result<Self, AppError> {
        let mut store = store.write().await;
        let item = store
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound("물건을 찾을 수 없습니다.".into()))?;

        if req.assignee.is_some() && req.assignee == item.assignee {
            item.assignee = None;
            // An unassigned item can no longer be in the checked state.
            item.checked = false;
            item.checker = None;
        } else {
            item.assignee = req.assignee;
        }
        Ok(item.clone())
    }

    pub async fn delete(store: &RoomStore, item_id: i64) -> Result<i64, AppError> {
        let mut store = store.write().await;
        let item = store
            .items
            .remove(&item_id)
            .ok_or_else(|| AppError::NotFound("물건을 찾을 수 없습니다.".into()))?;
        Ok(item.travel_id)
    }
}
