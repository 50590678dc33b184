// Job postings: the career page, job creation and job-scoped similarity search.

pub mod handlers;
pub mod repository;
pub mod seed;
