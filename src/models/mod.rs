//! Data models for the inventory core

pub mod book;
pub mod booking;
pub mod holder;
