mod handler;
mod model;

pub use handler::{
    create_travel, delete_travel, get_all_travels, get_by_invite_code, get_my_travels, get_travel,
    join_travel, update_travel,
};
pub use model::{CreateTravelRequest, Travel, UpdateTravelRequest};
