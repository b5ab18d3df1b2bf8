//! Durable browser storage adapters.

pub mod indexed_db;
