mod order;
mod query;
mod region;

use anyhow::Result;
use clap::{Command, arg};

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "give";
    pub const BIN_NAME: &str = "give";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Inspect the track data store of the GIVE genome browser.")
        .subcommand_required(true)
        .arg(arg!(-v --verbose "Log progress (RUST_LOG overrides this)").global(true))
        .subcommand(query::cli::create_query_cli())
        .subcommand(order::cli::create_order_cli())
        .subcommand(region::cli::create_region_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    let level = if matches.get_flag("verbose") { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        //
        // QUERY
        //
        Some((query::cli::QUERY_CMD, matches)) => {
            query::handlers::run_query(matches)?;
        }

        //
        // ORDER
        //
        Some((order::cli::ORDER_CMD, matches)) => {
            order::handlers::run_order(matches)?;
        }

        //
        // REGION
        //
        Some((region::cli::REGION_CMD, matches)) => {
            region::handlers::run_region(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }
}
