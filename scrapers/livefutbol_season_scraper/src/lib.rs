pub mod config;
pub mod features;
pub mod fetch;
pub mod ledger;
pub mod lineup;
pub mod match_list;
pub mod output;
pub mod pipeline;
pub mod team_stats;
pub mod types;
pub mod utils;
