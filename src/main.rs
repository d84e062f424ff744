//! `sort` command-line front end

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use line_sort::{config::SortConfigBuilder, error::SortResult, sort, SortConfig};
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("sort: {e}");
            process::exit(e.exit_code());
        }
    }
}

fn run() -> SortResult<i32> {
    let matches = build_cli().get_matches();
    let config = parse_config_from_matches(&matches)?;
    sort(&config)
}

fn build_cli() -> Command {
    Command::new("sort")
        .version(env!("CARGO_PKG_VERSION"))
        .override_usage("sort [OPTION]... [FILE]")
        .about("Sort lines of text")
        .disable_help_flag(true) // -h is human-numeric
        .disable_version_flag(true)
        .arg(
            Arg::new("file")
                .help("Input file (use '-' or omit for stdin)")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("key")
                .short('k')
                .long("key")
                .help("Sort by field N (1-based); 0 uses the whole line")
                .value_name("N")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("numeric-sort")
                .short('n')
                .long("numeric-sort")
                .help("Compare according to numerical value")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("human-numeric-sort")
                .short('h')
                .long("human-numeric-sort")
                .help("Compare human readable numbers (e.g., 2K 1G)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("month-sort")
                .short('M')
                .long("month-sort")
                .help("Compare by month names")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("reverse")
                .short('r')
                .long("reverse")
                .help("Reverse the result of comparisons")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("unique")
                .short('u')
                .long("unique")
                .help("Output each distinct line only once")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ignore-trailing-blanks")
                .short('b')
                .long("ignore-trailing-blanks")
                .help("Ignore trailing spaces and tabs in keys")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .short('c')
                .long("check")
                .help("Check for sorted input; do not sort")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("field-separator")
                .short('t')
                .long("field-separator")
                .help("Use SEP to split fields (default: tab; empty: whitespace)")
                .value_name("SEP"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write result to FILE instead of standard output")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("temporary-directory")
                .short('T')
                .long("temporary-directory")
                .help("Use DIR for temporaries, not $TMPDIR or /tmp")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .help("Sort at most N chunks concurrently")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .help("Records per chunk when sorting externally")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("external-threshold")
                .long("external-threshold")
                .help("Sort files larger than BYTES externally")
                .value_name("BYTES")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("help")
                .long("help")
                .help("Display this help and exit")
                .action(ArgAction::Help),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Output version information and exit")
                .action(ArgAction::Version),
        )
}

/// Parse configuration from command line matches
fn parse_config_from_matches(matches: &ArgMatches) -> SortResult<SortConfig> {
    let mut builder = SortConfigBuilder::new();

    if let Some(&field) = matches.get_one::<i64>("key") {
        builder = builder.key_field(field);
    }
    if matches.get_flag("numeric-sort") {
        builder = builder.numeric();
    }
    if matches.get_flag("human-numeric-sort") {
        builder = builder.human_numeric();
    }
    if matches.get_flag("month-sort") {
        builder = builder.month();
    }
    if matches.get_flag("reverse") {
        builder = builder.reverse();
    }
    if matches.get_flag("unique") {
        builder = builder.unique();
    }
    if matches.get_flag("ignore-trailing-blanks") {
        builder = builder.ignore_trailing_blanks();
    }
    if matches.get_flag("check") {
        builder = builder.check();
    }

    if let Some(separator) = matches.get_one::<String>("field-separator") {
        builder = builder.field_separator(separator);
    }
    if let Some(output) = matches.get_one::<String>("output") {
        builder = builder.output_file(output.clone());
    }
    if let Some(dir) = matches.get_one::<String>("temporary-directory") {
        builder = builder.temp_dir(dir.clone());
    }
    if let Some(&threads) = matches.get_one::<usize>("parallel") {
        builder = builder.parallel_threads(threads);
    }
    if let Some(&size) = matches.get_one::<usize>("chunk-size") {
        builder = builder.chunk_size(size);
    }
    if let Some(&bytes) = matches.get_one::<u64>("external-threshold") {
        builder = builder.external_threshold(bytes);
    }
    if let Some(file) = matches.get_one::<String>("file") {
        builder = builder.input_file(file.clone());
    }

    builder.build()
}
