pub mod audit;
pub mod fetch;
pub mod indexer;
pub mod rating;
pub mod store;
