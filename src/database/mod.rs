// Storage module
// Relational record store (SQLite) and the vector index client interface

pub mod sqlite;
pub mod vector;
