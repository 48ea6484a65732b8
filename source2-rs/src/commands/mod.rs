//! Command implementations for each resource kind

pub mod anim;
