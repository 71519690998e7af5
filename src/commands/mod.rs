//! CLI subcommands

pub mod clean;
pub mod comment;
pub mod generate;
pub mod init;
pub mod list;
pub mod new;
