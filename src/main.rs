use clap::{crate_version, App, Arg, SubCommand};
use inkpress::build;
use inkpress::config::Config;
use inkpress::cover;
use inkpress::import;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};

fn main() {
    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let matches = App::new("inkpress")
        .version(crate_version!())
        .about("Build and authoring toolkit for my personal blog")
        .subcommand(
            SubCommand::with_name("build")
                .about("Build the static site")
                .arg(
                    Arg::with_name("directory")
                        .help("Project directory (defaults to the working directory)")
                        .index(1),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .help("Output directory (defaults to <project>/public)"),
                )
                .arg(
                    Arg::with_name("dev")
                        .long("dev")
                        .help("Development mode: also emit the social-card render targets"),
                ),
        )
        .subcommand(
            SubCommand::with_name("cover-image")
                .about("Capture the social-card screenshots for a post")
                .arg(
                    Arg::with_name("slug")
                        .help("Slug of the post to capture")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            SubCommand::with_name("import")
                .about("Import an exported .textbundle into the posts tree"),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(matches)) => {
            let directory = match matches.value_of("directory") {
                Some(directory) => PathBuf::from(directory),
                None => std::env::current_dir()?,
            };
            let output = matches.value_of("output").map(Path::new);
            let config = Config::from_directory(&directory, output)?;
            build::build_site(&config, matches.is_present("dev"))?;
            Ok(())
        }
        ("cover-image", Some(matches)) => {
            let config = Config::from_directory(&std::env::current_dir()?, None)?;
            // `slug` is a required argument; clap guarantees presence
            cover::capture_cards(&config, matches.value_of("slug").unwrap())
        }
        ("import", Some(_)) => {
            let config = Config::from_directory(&std::env::current_dir()?, None)?;
            let created = import::import_bundle(&config)?;
            log::info!("imported into {}", created.display());
            Ok(())
        }
        _ => Err(anyhow::anyhow!("missing subcommand; try `inkpress --help`")),
    }
}
