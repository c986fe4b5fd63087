mod handler;
mod model;

pub use handler::{add_item, delete_item, get_items, toggle_assignee, toggle_check};
pub use model::{AddItemRequest, AssigneeRequest, CheckRequest, Item};
