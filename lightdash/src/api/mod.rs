//! Lightdash REST API client and typed endpoint wrappers

pub mod ai_agents;
pub mod client;
pub mod common;
pub mod content;
pub mod error;
pub mod groups;
pub mod members;
pub mod organization;
pub mod projects;
pub mod roles;
pub mod spaces;
pub mod user;
pub mod warehouse_credentials;

pub use client::{Client, ClientConfig};
pub use error::ApiError;
pub use roles::{OrganizationMemberRole, ProjectMemberRole, SpaceMemberRole};
