// Applicants: resume upload pipeline, ranked dashboard, detail and similarity search.

pub mod handlers;
pub mod pipeline;
pub mod repository;
pub mod upload;
