// src/models/mod.rs

pub mod comment;
pub mod page;
pub mod post;
pub mod user;
