pub mod aws;
pub mod cli;
pub mod commands;
pub mod constants;
pub mod exec;
pub mod prompt;
pub mod resolver;
pub mod shell;
