//! Per-(user, post) vote state machine.
//!
//! `VoteState::apply` is the single source of truth for what a like, dislike
//! or cancel request does. Stores call it inside their atomic unit and then
//! carry out the returned `VoteWrite` and `CounterDelta`; nothing else in the
//! service decides vote semantics.
//!
//! Repeating the current direction is a no-op, not a toggle. Removing a vote
//! is only possible through `VoteAction::Cancel`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a stored vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Like,
    Dislike,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Like => "like",
            VoteType::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a user currently holds for a post. `NoVote` means no row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NoVote,
    Liked,
    Disliked,
}

impl From<Option<VoteType>> for VoteState {
    fn from(vote: Option<VoteType>) -> Self {
        match vote {
            None => VoteState::NoVote,
            Some(VoteType::Like) => VoteState::Liked,
            Some(VoteType::Dislike) => VoteState::Disliked,
        }
    }
}

impl From<VoteState> for Option<VoteType> {
    fn from(state: VoteState) -> Self {
        match state {
            VoteState::NoVote => None,
            VoteState::Liked => Some(VoteType::Like),
            VoteState::Disliked => Some(VoteType::Dislike),
        }
    }
}

/// Requested action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Like,
    Dislike,
    Cancel,
}

impl VoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteAction::Like => "like",
            VoteAction::Dislike => "dislike",
            VoteAction::Cancel => "cancel",
        }
    }
}

impl From<VoteType> for VoteAction {
    fn from(direction: VoteType) -> Self {
        match direction {
            VoteType::Like => VoteAction::Like,
            VoteType::Dislike => VoteAction::Dislike,
        }
    }
}

/// Change to apply to a post's denormalized counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub likes: i64,
    pub dislikes: i64,
}

impl CounterDelta {
    pub const NONE: CounterDelta = CounterDelta {
        likes: 0,
        dislikes: 0,
    };

    const fn new(likes: i64, dislikes: i64) -> Self {
        Self { likes, dislikes }
    }

    pub fn is_zero(&self) -> bool {
        self.likes == 0 && self.dislikes == 0
    }
}

/// Row mutation a transition needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteWrite {
    None,
    Insert(VoteType),
    Update(VoteType),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Liked,
    Disliked,
    ChangedToLike,
    ChangedToDislike,
    AlreadyLiked,
    AlreadyDisliked,
    Cancelled,
    NothingToCancel,
}

impl VoteOutcome {
    /// Message returned to clients alongside the counters
    pub fn message(&self) -> &'static str {
        match self {
            VoteOutcome::Liked => "liked",
            VoteOutcome::Disliked => "disliked",
            VoteOutcome::ChangedToLike => "changed to like",
            VoteOutcome::ChangedToDislike => "changed to dislike",
            VoteOutcome::AlreadyLiked => "already liked",
            VoteOutcome::AlreadyDisliked => "already disliked",
            VoteOutcome::Cancelled => "vote cancelled",
            VoteOutcome::NothingToCancel => "no vote to cancel",
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            VoteOutcome::Liked => "liked",
            VoteOutcome::Disliked => "disliked",
            VoteOutcome::ChangedToLike => "changed_to_like",
            VoteOutcome::ChangedToDislike => "changed_to_dislike",
            VoteOutcome::AlreadyLiked => "already_liked",
            VoteOutcome::AlreadyDisliked => "already_disliked",
            VoteOutcome::Cancelled => "cancelled",
            VoteOutcome::NothingToCancel => "nothing_to_cancel",
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            VoteOutcome::AlreadyLiked | VoteOutcome::AlreadyDisliked | VoteOutcome::NothingToCancel
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: VoteState,
    pub write: VoteWrite,
    pub delta: CounterDelta,
    pub outcome: VoteOutcome,
}

impl Transition {
    /// `userVote` reported to the caller: the new direction when the request
    /// changed something, `None` for no-ops and cancellations.
    pub fn user_vote(&self) -> Option<VoteType> {
        if self.outcome.is_noop() {
            None
        } else {
            self.next.into()
        }
    }
}

impl VoteState {
    pub fn apply(self, action: VoteAction) -> Transition {
        use VoteAction as A;
        use VoteState as S;

        let (next, write, delta, outcome) = match (self, action) {
            (S::NoVote, A::Like) => (
                S::Liked,
                VoteWrite::Insert(VoteType::Like),
                CounterDelta::new(1, 0),
                VoteOutcome::Liked,
            ),
            (S::NoVote, A::Dislike) => (
                S::Disliked,
                VoteWrite::Insert(VoteType::Dislike),
                CounterDelta::new(0, 1),
                VoteOutcome::Disliked,
            ),
            (S::NoVote, A::Cancel) => (
                S::NoVote,
                VoteWrite::None,
                CounterDelta::NONE,
                VoteOutcome::NothingToCancel,
            ),
            (S::Liked, A::Like) => (
                S::Liked,
                VoteWrite::None,
                CounterDelta::NONE,
                VoteOutcome::AlreadyLiked,
            ),
            (S::Liked, A::Dislike) => (
                S::Disliked,
                VoteWrite::Update(VoteType::Dislike),
                CounterDelta::new(-1, 1),
                VoteOutcome::ChangedToDislike,
            ),
            (S::Liked, A::Cancel) => (
                S::NoVote,
                VoteWrite::Delete,
                CounterDelta::new(-1, 0),
                VoteOutcome::Cancelled,
            ),
            (S::Disliked, A::Dislike) => (
                S::Disliked,
                VoteWrite::None,
                CounterDelta::NONE,
                VoteOutcome::AlreadyDisliked,
            ),
            (S::Disliked, A::Like) => (
                S::Liked,
                VoteWrite::Update(VoteType::Like),
                CounterDelta::new(1, -1),
                VoteOutcome::ChangedToLike,
            ),
            (S::Disliked, A::Cancel) => (
                S::NoVote,
                VoteWrite::Delete,
                CounterDelta::new(0, -1),
                VoteOutcome::Cancelled,
            ),
        };

        Transition {
            next,
            write,
            delta,
            outcome,
        }
    }
}

/// Display score; never stored
pub fn score(likes: i64, dislikes: i64) -> i64 {
    likes - dislikes
}
