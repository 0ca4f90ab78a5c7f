pub mod listing;
pub mod run;
