// src/types/mod.rs

pub mod common;
pub mod date;

pub use common::Pointer;
pub use date::ParseDate;
