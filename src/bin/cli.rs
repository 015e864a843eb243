//! Binary entry point for the wikiroute CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};
use wikiroute::{
    cli::config::CliConfig,
    cli::import_export::{run_export, run_import, CliError, ExportConfig, ImportConfig},
    query::{GraphStats, RoutePath, WikiGraph},
    storage::ReadOptions,
    RouteError, RouteOptions,
};

#[derive(Parser, Debug)]
#[command(
    name = "wikiroute",
    version,
    about = "Shortest link routes between Wikipedia articles",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    #[arg(
        long,
        global = true,
        env = "WIKIROUTE_CONFIG",
        value_name = "FILE",
        help = "CLI config file (defaults to <config dir>/wikiroute/cli.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        short,
        global = true,
        value_name = "FILE",
        help = "Serialized graph, `-` for stdin (overrides the config file's `graph`)"
    )]
    graph: Option<PathBuf>,

    #[arg(long, global = true, value_name = "BYTES", help = "Largest mmap window")]
    window_bytes: Option<usize>,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log filter used when RUST_LOG is unset"
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a CSV/TSV page table into a serialized graph.
    Import {
        #[arg(value_name = "TABLE")]
        input: PathBuf,
        #[arg(value_name = "GRAPH")]
        output: PathBuf,
    },
    /// Write a serialized graph back out as a page table.
    Export {
        #[arg(value_name = "TABLE")]
        output: PathBuf,
    },
    /// Find the shortest link route between two titles.
    Route(RouteCmd),
    /// List titles starting with a prefix.
    Prefix {
        prefix: String,
        #[arg(long, value_name = "N", help = "Maximum matches to list")]
        max: Option<usize>,
    },
    /// List the titles a page links to.
    Links { title: String },
    /// Print random titles.
    Random {
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Find the route between two distinct random pages.
    RandomRoute,
    /// Show page, link and index counts.
    Stats,
}

#[derive(Args, Debug)]
struct RouteCmd {
    start: String,
    end: String,

    #[arg(long, help = "Search from the start only, skipping the reverse index")]
    unidirectional: bool,

    #[arg(long, value_name = "ENTRIES", help = "Frontier size past which a side pauses")]
    frontier_limit: Option<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct TitleList<'a> {
    titles: &'a [String],
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level)?;
    let config = CliConfig::load(cli.global.config.clone()).map_err(CliError::from)?;
    let read = read_options(&cli.global, &config);

    match cli.command {
        Command::Import { input, output } => {
            let summary = run_import(&ImportConfig::new(input, output))?;
            emit(&cli.format, &summary, || {
                println!(
                    "Imported {} pages ({} redirects, {} links), {} bytes written",
                    summary.pages, summary.redirects, summary.links, summary.bytes_written
                )
            })?;
        }
        Command::Export { output } => {
            let graph = graph_path(&cli.global, &config)?;
            if is_stdin(&graph) {
                return Err(CliError::from("export reads a graph file, not stdin").into());
            }
            let mut cfg = ExportConfig::new(graph, output);
            cfg.read = read;
            let summary = run_export(&cfg)?;
            emit(&cli.format, &summary, || {
                println!("Exported {} pages", summary.pages)
            })?;
        }
        Command::Route(cmd) => {
            let mut options = config.route_options();
            if cmd.unidirectional {
                options = options.bidirectional(false);
            }
            if let Some(limit) = cmd.frontier_limit {
                options = options.frontier_limit(limit);
            }
            let graph = open_graph(&cli.global, &config, &read, options)?;
            return report_route(&cli.format, graph.find_route(&cmd.start, &cmd.end));
        }
        Command::Links { title } => {
            let graph = open_graph(&cli.global, &config, &read, config.route_options())?;
            let titles = graph
                .list_links(&title)
                .ok_or_else(|| CliError::Message(format!("page \"{title}\" does not exist")))?;
            emit(&cli.format, &TitleList { titles: &titles }, || {
                print_titles(&titles)
            })?;
        }
        Command::Prefix { prefix, max } => {
            let graph = open_graph(&cli.global, &config, &read, config.route_options())?;
            let titles = graph.find_prefix_matches(&prefix, max.unwrap_or(config.prefix_max()));
            emit(&cli.format, &TitleList { titles: &titles }, || {
                print_titles(&titles)
            })?;
        }
        Command::Random { count } => {
            let graph = open_graph(&cli.global, &config, &read, config.route_options())?;
            let titles: Vec<String> = (0..count).filter_map(|_| graph.random_title()).collect();
            emit(&cli.format, &TitleList { titles: &titles }, || {
                print_titles(&titles)
            })?;
        }
        Command::RandomRoute => {
            let graph = open_graph(&cli.global, &config, &read, config.route_options())?;
            let route = graph
                .random_route()
                .ok_or_else(|| CliError::from("graph has no pages"))?;
            return report_route(&cli.format, route);
        }
        Command::Stats => {
            let graph = open_graph(&cli.global, &config, &read, config.route_options())?;
            let stats = graph.stats();
            emit(&cli.format, &stats, || print_stats_text(&stats))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(level: &str) -> Result<(), Box<dyn Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| CliError::Message(format!("invalid log level: {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|_| CliError::from("logging already initialized"))?;
    Ok(())
}

fn read_options(args: &GlobalArgs, config: &CliConfig) -> ReadOptions {
    match args.window_bytes {
        Some(bytes) => config.read_options().window_bytes(bytes),
        None => config.read_options(),
    }
}

fn graph_path(args: &GlobalArgs, config: &CliConfig) -> Result<PathBuf, CliError> {
    args.graph
        .clone()
        .or_else(|| config.default_graph().map(PathBuf::from))
        .ok_or_else(|| CliError::from("no graph given (pass --graph or set `graph` in the config)"))
}

fn open_graph(
    args: &GlobalArgs,
    config: &CliConfig,
    read: &ReadOptions,
    options: RouteOptions,
) -> Result<WikiGraph, CliError> {
    let path = graph_path(args, config)?;
    if is_stdin(&path) {
        return Ok(WikiGraph::load(io::stdin().lock(), options)?);
    }
    Ok(WikiGraph::open(&path, read, options)?)
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn report_route(
    format: &OutputFormat,
    result: Result<RoutePath, RouteError>,
) -> Result<ExitCode, Box<dyn Error>> {
    match result {
        Ok(route) => emit(format, &route, || print_route_text(&route))?,
        Err(err @ RouteError::NoRouteFound { .. }) => {
            eprintln!("{err}");
            return Ok(ExitCode::from(2));
        }
        Err(err) => return Err(CliError::from(err).into()),
    }
    Ok(ExitCode::SUCCESS)
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_route_text(route: &RoutePath) {
    println!("{route}");
    println!(
        "{} hops in {:.2} ms",
        route.hops(),
        route.elapsed().as_secs_f64() * 1000.0
    );
}

fn print_titles(titles: &[String]) {
    for title in titles {
        println!("{title}");
    }
}

fn print_stats_text(stats: &GraphStats) {
    println!("Pages: {} ({} redirects)", stats.pages, stats.redirects);
    println!("Links: {}", stats.links);
    println!("Forward index: {} blocks", stats.forward_blocks);
    println!(
        "Reverse index: {} blocks, {} entries",
        stats.reverse_blocks, stats.reverse_entries
    );
    match stats.largest_id {
        Some(id) => println!("Largest id: {}", id.0),
        None => println!("Largest id: none"),
    }
    println!("Most links on one page: {}", stats.max_links);
    println!(
        "Titles: {} bytes in total, longest {} bytes",
        stats.title_bytes, stats.longest_title
    );
}
