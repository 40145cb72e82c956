mod commands;
mod parse;

pub(crate) use commands::dispatch;
pub(crate) use parse::parse_command;
