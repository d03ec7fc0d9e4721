//! REST API boundary: wire models and the typed client.

pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{
    Card, CardPatch, Column, Member, NewCard, Priority, Profile, ProfileUpdate, Role, Team,
    WorkDay,
};
