use crate::CLAP_STYLING;
use clap::{arg, command};
use liquiscrape_core::config::DEFAULT_SETTINGS_PATH;
use std::path::PathBuf;

fn settings_arg() -> clap::Arg {
    arg!(-s --"settings" <PATH>)
        .required(false)
        .help("Path to the settings JSON file")
        .value_parser(clap::value_parser!(PathBuf))
        .default_value(DEFAULT_SETTINGS_PATH)
}

fn threads_arg() -> clap::Arg {
    arg!(-t --"threads" <NUM_WORKERS>)
        .required(false)
        .help("Number of page workers (overrides thread_num)")
        .value_parser(clap::value_parser!(usize))
}

fn output_arg() -> clap::Arg {
    arg!(-o --"output" <DIR>)
        .required(false)
        .help("Directory export files are written to (overrides output_file_path)")
        .value_parser(clap::value_parser!(PathBuf))
}

fn single_pass_arg() -> clap::Arg {
    arg!(--"single-pass")
        .required(false)
        .help("Validate one batch of candidates instead of waiting for the minimum live proxy count")
        .action(clap::ArgAction::SetTrue)
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("liquiscrape")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("liquiscrape")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Hide progress bars and summaries; only warnings reach the console")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("crawl")
                .about("Discover live proxies, crawl every seeded player profile and export the records")
                .arg(settings_arg())
                .arg(threads_arg())
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(false)
                        .help("Seed file: CSV with a Link column, or one URL per line")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(output_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Export format: csv, json")
                        .value_parser(["csv", "json"]),
                )
                .arg(
                    arg!(--"no-images")
                        .required(false)
                        .help("Skip profile image downloads")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(single_pass_arg()),
        )
        .subcommand(
            command!("active")
                .about("Collect the active squads of the top-ranked organizations into a seed file")
                .arg(settings_arg())
                .arg(threads_arg())
                .arg(output_arg()),
        )
        .subcommand(
            command!("proxies")
                .about("Discover and print live proxies")
                .arg(settings_arg())
                .arg(single_pass_arg()),
        )
}
