mod handler;
mod model;

pub use handler::{cast_vote, create_vote, delete_vote, get_my_votes, get_votes};
pub use model::{CastOutcome, CreateVoteRequest, Vote, VoteOption};
