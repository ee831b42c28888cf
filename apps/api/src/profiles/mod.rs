// Profile Store and the profile endpoints built on it.
// Documents are keyed by identity; writes are create-or-merge.

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod store;
