// Job postings: validation, Postgres repository, and HTTP handlers.

pub mod handlers;
pub mod repository;
pub mod validation;
