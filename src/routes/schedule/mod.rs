mod handler;
mod model;

pub use handler::{
    create_schedule, delete_schedule, get_schedules, optimize_schedule, update_schedule,
};
pub use model::{Schedule, ScheduleRequest, UpdateScheduleRequest};
