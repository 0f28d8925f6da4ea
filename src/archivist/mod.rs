pub mod classify;
pub mod config;
pub mod cycle;
pub mod lock;
pub mod naming;
pub mod relocate;
pub mod scan;
pub mod scheduler;
