//! Interactive subcommands

pub mod init;
