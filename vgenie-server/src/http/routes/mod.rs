//! HTTP route handlers, one module per resource

pub mod admin;
pub mod auth;
pub mod health;
pub mod industries;
pub mod payments;
pub mod reports;
pub mod subscriptions;
pub mod uploads;
pub mod valuations;
pub mod webhooks;
