pub mod ratings_api;
