// src/services/mod.rs
//
// Pure attempt logic. Nothing here touches the database.

pub mod category;
pub mod collector;
pub mod presenter;
pub mod record;
pub mod scoring;
