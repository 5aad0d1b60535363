pub mod auth;
pub mod global;
pub mod model;
pub mod profile;
pub mod project;
pub mod seed;
