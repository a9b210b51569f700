//! Data types, split by where they live.
//!
//! - [`db`] types are stored in the database.
//! - [`api`] types are sent to and received from clients.
//! - [`auth`] holds authentication tokens and the rights they carry.
//! - [`mongodb`] holds database plumbing shared by the other modules.

pub mod api;
pub mod auth;
pub mod db;
pub mod mongodb;
