//! Domain layer: the `Event` aggregate, the lottery allocator, and the
//! share payload builder. Pure and synchronous; never touches the store.

pub mod event;
pub mod lottery;
pub mod share;
