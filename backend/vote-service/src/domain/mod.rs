pub mod vote_state;

pub use vote_state::{
    score, CounterDelta, Transition, VoteAction, VoteOutcome, VoteState, VoteType, VoteWrite,
};
