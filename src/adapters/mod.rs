// Adapters layer: concrete implementations of the domain ports (http feed,
// file-backed seen store, Discord REST).

pub mod discord;
pub mod feed;
pub mod store;
