use clap::{Command, arg, value_parser};

pub const QUERY_CMD: &str = "query";

pub fn create_query_cli() -> Command {
    Command::new(QUERY_CMD)
        .about("Ingest a data response for a window and print what a track returns for it")
        .arg_required_else_help(true)
        .arg(arg!(-c --config <config> "Browser config (TOML)").required(true))
        .arg(arg!(-t --track <track> "ID of the track to query").required(true))
        .arg(arg!(-d --data <data> "Response to ingest first (JSON, or 8 column text with --lines)"))
        .arg(arg!(-w --window <window> "Window to query, e.g. chr1:100-2000").required(true))
        .arg(
            arg!(-r --resolution <resolution> "Bases per data point")
                .value_parser(value_parser!(u32))
                .default_value("1"),
        )
        .arg(arg!(--summary "Print one summary over the window instead of entries"))
        .arg(arg!(--lines "The data file holds interaction lines instead of JSON"))
        .arg(
            arg!(--width <width> "Also print the points a signal track draws this many pixels wide")
                .value_parser(value_parser!(u32)),
        )
        .arg(arg!(--links "Also print the links of an interaction track that pass its threshold"))
        .arg(
            arg!(--threshold <threshold> "Threshold for --links instead of the track setting")
                .value_parser(value_parser!(f64)),
        )
}
