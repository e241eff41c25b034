pub mod classifier;
pub mod moderator;

pub use classifier::{CommentClassifier, ModerationVerdict};
pub use moderator::Moderator;
