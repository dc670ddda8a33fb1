// src/lib.rs

pub mod db;
pub mod repositories;
pub mod platforms;
pub mod services;
pub mod tasks;

pub use db::Database;
pub use votebot_common::error::Error;
pub use votebot_common::models;
