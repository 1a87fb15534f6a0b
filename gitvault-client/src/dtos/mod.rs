pub mod auth;
pub mod collaborators;
pub mod repositories;
pub mod tokens;
