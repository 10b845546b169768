pub mod command;
pub mod context;
pub mod cycle;
pub mod render;
pub mod scheduler;
