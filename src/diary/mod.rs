pub mod audit;
pub mod batch;
pub mod config;
pub mod entry;
pub mod group;
pub mod orchestrate;
pub mod parse;
pub mod paths;
pub mod prompts;
pub mod store;
pub mod summarize;
pub mod tokens;
pub mod util;
