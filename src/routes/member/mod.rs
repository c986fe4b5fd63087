mod handler;
mod model;

pub use handler::{add_member, delete_member, get_members, invite_member, toggle_online};
pub use model::{AddMemberRequest, InviteRequest, Member};
