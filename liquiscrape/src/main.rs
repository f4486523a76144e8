use colored::Colorize;
use liquiscrape::commands::command_argument_builder;
use liquiscrape::handlers::{handle_active, handle_crawl, handle_proxies, log_fatal, prepare};
use tracing_appender::non_blocking::WorkerGuard;

fn fail(error: anyhow::Error, guard: Option<WorkerGuard>, quiet: bool) -> ! {
    log_fatal(&error, guard, quiet);
    eprintln!("{} {:#}", "✗".red().bold(), error);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let chosen_command = command_argument_builder().get_matches();
    let Some((name, primary_command)) = chosen_command.subcommand() else {
        unreachable!("clap should ensure we don't get here")
    };
    // Global, so the subcommand sees it wherever it was given
    let quiet = primary_command.get_flag("quiet");

    let (settings, guard) = match prepare(primary_command, quiet) {
        Ok(prepared) => prepared,
        Err(e) => fail(e, None, quiet),
    };

    let outcome = match name {
        "crawl" => handle_crawl(primary_command, &settings, quiet).await,
        "active" => handle_active(&settings, quiet).await,
        "proxies" => handle_proxies(primary_command, &settings, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        fail(e, Some(guard), quiet);
    }
}
