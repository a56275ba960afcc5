use clap::{Command, arg};

pub const ORDER_CMD: &str = "order";

pub fn create_order_cli() -> Command {
    Command::new(ORDER_CMD)
        .about("Print the stacking order of the visible tracks of a config")
        .arg_required_else_help(true)
        .arg(arg!(-c --config <config> "Browser config (TOML)").required(true))
        .arg(arg!(--reversed "Order for the last window of a view"))
        .arg(arg!(--json "Print JSON instead of a table"))
}
