pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod mail;
pub mod notifier;
pub mod process;
pub mod report;
pub mod system;
pub mod table;
pub mod util;
