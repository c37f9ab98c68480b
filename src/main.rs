use clap::{App, AppSettings, Arg, SubCommand};
use skald::build::build_site;
use skald::config::Config;
use std::path::Path;
use std::process::exit;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let matches = App::new("skald")
        .version(clap::crate_version!())
        .about("Builds a static blog from Markdown posts")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Renders the site into the output directory")
                .arg(
                    Arg::with_name("source")
                        .short("s")
                        .long("source")
                        .value_name("DIR")
                        .default_value(".")
                        .help("The project directory (or any directory below it)"),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .value_name("DIR")
                        .help("Where to write the site [default: _site in the project]"),
                )
                .arg(
                    Arg::with_name("threads")
                        .short("j")
                        .long("threads")
                        .value_name("N")
                        .help("The number of threads to parse posts on"),
                ),
        )
        .get_matches();

    if let ("build", Some(matches)) = matches.subcommand() {
        let source = Path::new(matches.value_of("source").unwrap_or("."));
        let output = matches.value_of("output").map(Path::new);
        let threads = match matches.value_of("threads").map(str::parse::<usize>) {
            None => None,
            Some(Ok(threads)) => Some(threads),
            Some(Err(err)) => {
                log::error!("invalid --threads: {}", err);
                exit(1);
            }
        };

        let source = match source.canonicalize() {
            Ok(source) => source,
            Err(err) => {
                log::error!("opening `{}`: {}", source.display(), err);
                exit(1);
            }
        };
        let config = match Config::from_directory(&source, output, threads) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{:#}", err);
                exit(1);
            }
        };

        match build_site(&config) {
            Ok(stats) => log::info!(
                "built {} posts in {} categories",
                stats.posts,
                stats.categories
            ),
            Err(err) => {
                log::error!("{}", err);
                exit(1);
            }
        }
    }
}
