//! PostgreSQL persistence for OAuth credentials and cached Strava activities.

pub mod db;

pub use db::SyncStore;
