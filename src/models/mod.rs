// src/models/mod.rs

pub mod category;
pub mod common;
pub mod course;
pub mod quiz;
pub mod test_record;
pub mod user;
