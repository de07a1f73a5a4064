use clap::{crate_version, App, Arg};
use std::fmt::Display;
use std::path::Path;
use std::process;
use taxogen::build::refresh_pages;
use taxogen::config::{Config, MalformedPolicy};

fn main() {
    let matches = App::new("taxogen")
        .version(crate_version!())
        .about("Regenerates category and tag pages from post front matter")
        .arg(
            Arg::with_name("directory")
                .help("Directory of the blog to refresh (defaults to the current directory)")
                .index(1),
        )
        .arg(
            Arg::with_name("strict")
                .long("strict")
                .help("Abort on the first malformed post instead of skipping it"),
        )
        .get_matches();

    let directory = Path::new(matches.value_of("directory").unwrap_or("."));
    let mut config = match Config::load(directory) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };
    if matches.is_present("strict") {
        config.on_malformed = MalformedPolicy::Abort;
    }

    if let Err(e) = refresh_pages(&config) {
        exit_with(e);
    }
}

fn exit_with(err: impl Display) -> ! {
    eprintln!("Error: {}", err);
    process::exit(1)
}
