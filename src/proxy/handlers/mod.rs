// Handlers module - gateway endpoint handlers

pub mod auth;
pub mod forward;
