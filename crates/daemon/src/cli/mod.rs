pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Daemon, Feed, Health, Init, Msg, NodeCmd, Perm, Sub, Timeline, Version};
