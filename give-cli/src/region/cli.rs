use clap::{Command, arg, value_parser};

pub const REGION_CMD: &str = "region";

pub fn create_region_cli() -> Command {
    Command::new(REGION_CMD)
        .about("Normalize a region string, optionally extending it")
        .arg_required_else_help(true)
        .arg(arg!(<region> "Region, e.g. chr1:1,000-2,000(+) or 'chr1 1000 2000'"))
        .arg(
            arg!(-e --extend <amount> "Grow by a ratio of the length (e.g. 0.5) or by bases (e.g. 500bp)")
                .allow_hyphen_values(true),
        )
        .arg(
            arg!(--direction <direction> "Which end to move")
                .value_parser(["both", "left", "right"])
                .default_value("both"),
        )
        .arg(arg!(-c --config <config> "Browser config whose chromosome sizes clip the result"))
        .arg(arg!(--"no-strand" "Leave the strand out of the output"))
        .arg(
            arg!(--shift <bases> "Move the region by this many bases first")
                .value_parser(value_parser!(i64))
                .allow_hyphen_values(true),
        )
}
