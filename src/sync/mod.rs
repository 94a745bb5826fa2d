mod inbox;
mod round;
mod walker;

#[cfg(test)]
mod testing;

pub use inbox::InboxSync;
pub use round::{PhaseResult, RoundCoordinator, RoundOutcome};
pub use walker::{walk_posts, PostsWalk};
