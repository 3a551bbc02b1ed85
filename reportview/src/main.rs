//! # reportview
//!
//! A CLI for browsing, filtering and exporting financial report data.
//!
//! ## Overview
//!
//! reportview is built on top of reportlib. It fetches report rows from the
//! report API (or loads them from a local JSON file), runs them through the
//! filter/sort/visibility pipeline and prints a table, JSON or CSV. It also
//! covers the developer workflow: saving, approving and linking queries, and
//! building queries from the column catalog.
//!
//! ## Usage
//!
//! ```bash
//! # List report types and companies
//! reportview report-types
//! reportview companies
//!
//! # View a report, filtered and sorted
//! reportview view --report stock_prices --company INFY --start 2024-01-01 \
//!     --filter close_price:greater:100 --sort close_price --desc
//!
//! # Work offline from a saved payload and export the visible columns
//! reportview view --input prices.json --hide volume --csv prices.csv
//!
//! # Build a query, submit it for approval and wait
//! reportview build --report stock_prices --column close_price --column company \
//!     --order-by close_price --desc --submit --wait
//! ```

mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use reportlib::client::{
    latest_variation, ApiClient, ClientConfig, NewQuery, QueryListFilter, QueryStatus,
    QueryUpdate, SearchOptions, DEFAULT_BASE_URL,
};
use reportlib::data::Dataset;
use reportlib::output::{export_to_file, suggested_filename, ReportTable};
use reportlib::query::{
    CompanySelection, DateRange, FilterExpr, OrderDirection, ReportQuerySet, SortState,
    VisibleColumns,
};
use reportlib::{wait_for_approval, PollPolicy, QueryBuilder};
use tokio_util::sync::CancellationToken;

/// Output format for data commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    fn from_matches(matches: &ArgMatches) -> Self {
        match matches.get_one::<String>("output").map(|s| s.as_str()) {
            Some("json") => OutputMode::Json,
            _ => OutputMode::Table,
        }
    }
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("reportview")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Browse, filter and export financial report data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .env("REPORTVIEW_API_URL")
                .default_value(DEFAULT_BASE_URL)
                .help("Base URL of the report API"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .value_parser(["table", "json"])
                .default_value("table")
                .help("Output format"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
        .subcommand(Command::new("companies").about("List companies available for filtering"))
        .subcommand(Command::new("report-types").about("List report types and their columns"))
        .subcommand(view_command())
        .subcommand(query_command())
        .subcommand(build_query_command())
}

fn view_command() -> Command {
    Command::new("view")
        .about("Fetch, filter, sort and display report rows")
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .conflicts_with_all(["input", "saved"])
                .help("Report type to fetch from the API"),
        )
        .arg(
            Arg::new("saved")
                .long("saved")
                .conflicts_with("input")
                .help("Run a saved query by name instead of a report type"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_parser(value_parser!(PathBuf))
                .help("Load rows from a local JSON file instead of the API"),
        )
        .arg(
            Arg::new("company")
                .short('c')
                .long("company")
                .action(ArgAction::Append)
                .help("Keep only rows for this company (can be specified multiple times)"),
        )
        .arg(Arg::new("start").long("start").help("First date to include (YYYY-MM-DD)"))
        .arg(Arg::new("end").long("end").help("Last date to include (YYYY-MM-DD)"))
        .arg(
            Arg::new("search")
                .short('s')
                .long("search")
                .help("Case-insensitive search over every field"),
        )
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .action(ArgAction::Append)
                .help("Column filter KEY:VALUE or KEY:OPERATOR:VALUE (equals, contains, greater, less, between)"),
        )
        .arg(Arg::new("sort").long("sort").help("Column to sort by"))
        .arg(
            Arg::new("desc")
                .long("desc")
                .action(ArgAction::SetTrue)
                .requires("sort")
                .help("Sort descending"),
        )
        .arg(
            Arg::new("columns")
                .long("columns")
                .value_delimiter(',')
                .help("Show only these columns (comma-separated keys)"),
        )
        .arg(
            Arg::new("hide")
                .long("hide")
                .action(ArgAction::Append)
                .help("Hide a column (can be specified multiple times)"),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .value_parser(value_parser!(PathBuf))
                .help("Export the visible rows and columns to a CSV file or directory"),
        )
}

fn query_command() -> Command {
    Command::new("query")
        .about("Manage saved developer queries")
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Run raw SQL and display the result")
                .arg(Arg::new("sql").required(true).help("Query text")),
        )
        .subcommand(
            Command::new("save")
                .about("Save a query (saved queries are approved)")
                .arg(Arg::new("name").short('n').long("name").required(true))
                .arg(Arg::new("variation").long("variation"))
                .arg(Arg::new("sql").required(true).help("Query text")),
        )
        .subcommand(
            Command::new("list")
                .about("List saved queries")
                .arg(Arg::new("name").short('n').long("name"))
                .arg(
                    Arg::new("status")
                        .long("status")
                        .value_parser(["pending", "approved", "rejected"]),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show one saved query")
                .arg(id_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a saved query")
                .arg(id_arg()),
        )
        .subcommand(
            Command::new("approve")
                .about("Approve a pending query, optionally renaming it")
                .arg(id_arg())
                .arg(Arg::new("name").short('n').long("name"))
                .arg(Arg::new("variation").long("variation")),
        )
        .subcommand(
            Command::new("reject")
                .about("Reject a pending query")
                .arg(id_arg()),
        )
        .subcommand(
            Command::new("link")
                .about("Link a saved query to a report type")
                .arg(Arg::new("report").required(true))
                .arg(Arg::new("query").required(true)),
        )
        .subcommand(
            Command::new("for-report")
                .about("List queries linked to a report type")
                .arg(Arg::new("report").required(true))
                .arg(
                    Arg::new("latest")
                        .long("latest")
                        .action(ArgAction::SetTrue)
                        .help("Show only the newest variation"),
                ),
        )
        .subcommand(
            Command::new("report-type")
                .about("Show the report type a query is linked to")
                .arg(Arg::new("query").required(true)),
        )
}

fn id_arg() -> Arg {
    Arg::new("id")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Query id")
}

fn build_query_command() -> Command {
    Command::new("build")
        .about("Build a query from the column catalog")
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .required(true)
                .help("Report id (e.g. stock_prices)"),
        )
        .arg(
            Arg::new("column")
                .short('c')
                .long("column")
                .action(ArgAction::Append)
                .help("Column to select (can be specified multiple times)"),
        )
        .arg(
            Arg::new("group")
                .short('g')
                .long("group")
                .action(ArgAction::Append)
                .help("Select every column of a group"),
        )
        .arg(Arg::new("order-by").long("order-by").help("Column to order by"))
        .arg(
            Arg::new("desc")
                .long("desc")
                .action(ArgAction::SetTrue)
                .requires("order-by")
                .help("Order descending"),
        )
        .arg(
            Arg::new("operation")
                .long("operation")
                .help("Trailing clause appended to the query (e.g. \"LIMIT 10\")"),
        )
        .arg(
            Arg::new("submit")
                .long("submit")
                .action(ArgAction::SetTrue)
                .help("Submit the query for approval"),
        )
        .arg(
            Arg::new("wait")
                .long("wait")
                .action(ArgAction::SetTrue)
                .requires("submit")
                .help("Wait for approval, then run the query"),
        )
        .arg(
            Arg::new("poll-interval")
                .long("poll-interval")
                .value_parser(value_parser!(u64))
                .default_value("5")
                .help("Seconds between approval checks"),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .value_parser(value_parser!(u32))
                .default_value("120")
                .help("Approval checks before giving up"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(u64))
                .default_value("600")
                .help("Seconds to wait for approval before giving up"),
        )
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn api_client(matches: &ArgMatches) -> anyhow::Result<ApiClient> {
    let base_url = matches
        .get_one::<String>("api-url")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_BASE_URL);
    Ok(ApiClient::with_config(
        ClientConfig::new().base_url(base_url),
    )?)
}

/// Extract repeated string args from matches
fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancellation token fired by Ctrl-C
fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });
    cancel
}

/// Handler for companies command
async fn companies_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let companies = api_client(matches)?.companies().await?;
    match OutputMode::from_matches(matches) {
        OutputMode::Json => print_json(&companies),
        OutputMode::Table => {
            for company in companies {
                println!("{}", company);
            }
            Ok(())
        }
    }
}

/// Handler for report-types command
async fn report_types_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let report_types = api_client(matches)?.report_types().await?;
    match OutputMode::from_matches(matches) {
        OutputMode::Json => print_json(&report_types),
        OutputMode::Table => {
            print!("{}", render::render_report_types(&report_types));
            Ok(())
        }
    }
}

/// Handler for view command
async fn view_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let companies = strings(matches, "company");
    let start = matches.get_one::<String>("start").map(|s| s.as_str());
    let end = matches.get_one::<String>("end").map(|s| s.as_str());
    let date_range = DateRange::parse(start, end)?;
    let search = matches.get_one::<String>("search").cloned().unwrap_or_default();

    let (dataset, name) = if let Some(path) = matches.get_one::<PathBuf>("input") {
        let dataset = Dataset::from_path(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());
        (dataset, name)
    } else if let Some(saved) = matches.get_one::<String>("saved") {
        let dataset = api_client(matches)?.run_saved_query_by_name(saved).await?;
        (dataset, saved.clone())
    } else if let Some(report) = matches.get_one::<String>("report") {
        let mut options = SearchOptions::new(report.clone()).companies(companies.clone());
        if let Some(start) = date_range.start() {
            options = options.start_date(start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = date_range.end() {
            options = options.end_date(end.format("%Y-%m-%d").to_string());
        }
        if !search.is_empty() {
            options = options.search_term(search.clone());
        }
        let dataset = api_client(matches)?.search(&options).await?;
        (dataset, report.clone())
    } else {
        bail!("one of --report, --saved or --input is required");
    };

    let mut qs = ReportQuerySet::from_dataset(dataset);
    log::info!("loaded {} rows for '{}'", qs.total_count(), name);

    let filters = strings(matches, "filter")
        .iter()
        .map(|f| f.parse::<FilterExpr>())
        .collect::<Result<Vec<_>, _>>()?;
    for expr in &filters {
        if !qs.columns().iter().any(|c| c.key == expr.key) {
            bail!("unknown column '{}' in filter", expr.key);
        }
    }

    let sort = match matches.get_one::<String>("sort") {
        Some(field) => {
            if !qs.columns().iter().any(|c| &c.key == field) {
                bail!("unknown sort column '{}'", field);
            }
            let sort = SortState::by(field.clone());
            if matches.get_flag("desc") {
                sort.descending()
            } else {
                sort
            }
        }
        None => SortState::none(),
    };

    qs.update(|state| {
        let state = filters.into_iter().fold(state, |state, expr| {
            state.with_column_filter(expr.key, expr.filter)
        });
        state
            .with_companies(CompanySelection::from_names(companies))
            .with_search(search)
            .with_date_range(date_range)
            .with_sort(sort)
    });

    let requested = strings(matches, "columns");
    if !requested.is_empty() {
        let visible = VisibleColumns::only(requested.as_slice(), qs.columns())
            .ok_or_else(|| anyhow!("none of the requested columns exist: {}", requested.join(",")))?;
        qs.update(|state| state.with_visible(visible));
    }
    for key in strings(matches, "hide") {
        let visible = qs.state().visible.contains(&key);
        if !qs.hide_column(&key) && visible {
            log::warn!("cannot hide the last visible column '{}'", key);
        }
    }

    if let Some(target) = matches.get_one::<PathBuf>("csv") {
        let path = csv_path(target, &name);
        export_to_file(&path, qs.items(), &qs.visible_columns())?;
        eprintln!("Exported {} rows to {}", qs.items().len(), path.display());
    }

    let table = ReportTable::from_queryset(&qs).with_title(name);
    match OutputMode::from_matches(matches) {
        OutputMode::Json => print_json(&table),
        OutputMode::Table => {
            print!("{}", render::render_report_table(&table));
            Ok(())
        }
    }
}

/// A directory target gets a dated file name inside it
fn csv_path(target: &Path, report_name: &str) -> PathBuf {
    if target.is_dir() {
        let today = chrono::Local::now().date_naive();
        target.join(suggested_filename(report_name, today))
    } else {
        target.to_path_buf()
    }
}

fn print_dataset(matches: &ArgMatches, dataset: Dataset, title: &str) -> anyhow::Result<()> {
    let qs = ReportQuerySet::from_dataset(dataset);
    let table = ReportTable::from_queryset(&qs).with_title(title);
    match OutputMode::from_matches(matches) {
        OutputMode::Json => print_json(&table),
        OutputMode::Table => {
            print!("{}", render::render_report_table(&table));
            Ok(())
        }
    }
}

/// Handler for query subcommands
async fn query_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let Some((command, sub)) = matches.subcommand() else {
        bail!("missing query command");
    };
    let client = api_client(sub)?;
    let mode = OutputMode::from_matches(sub);

    match command {
        "run" => {
            let sql = sub.get_one::<String>("sql").map(|s| s.as_str()).unwrap_or_default();
            let dataset = client.run_query(sql).await?;
            print_dataset(sub, dataset, "Query result")
        }
        "save" => {
            let name = sub.get_one::<String>("name").cloned().unwrap_or_default();
            let sql = sub.get_one::<String>("sql").cloned().unwrap_or_default();
            let mut new_query = NewQuery::approved(name, sql);
            if let Some(variation) = sub.get_one::<String>("variation") {
                new_query = new_query.with_variation(variation.clone());
            }
            let saved = client.create_query(&new_query).await?;
            println!("Saved query '{}' (id {})", saved.name, saved.id);
            Ok(())
        }
        "list" => {
            let mut filter = QueryListFilter::new();
            if let Some(name) = sub.get_one::<String>("name") {
                filter = filter.name(name.clone());
            }
            if let Some(status) = sub.get_one::<String>("status") {
                filter = filter.status(status.parse::<QueryStatus>()?);
            }
            let queries = client.list_queries(&filter).await?;
            match mode {
                OutputMode::Json => print_json(&queries),
                OutputMode::Table => {
                    print!("{}", render::render_queries(&queries));
                    Ok(())
                }
            }
        }
        "show" => {
            let query = client.get_query(query_id(sub)?).await?;
            match mode {
                OutputMode::Json => print_json(&query),
                OutputMode::Table => {
                    print!("{}", render::render_query_detail(&query));
                    Ok(())
                }
            }
        }
        "delete" => {
            let id = query_id(sub)?;
            client.delete_query(id).await?;
            println!("Deleted query {}", id);
            Ok(())
        }
        "approve" => {
            let update = QueryUpdate {
                name: sub.get_one::<String>("name").cloned(),
                status: Some(QueryStatus::Approved),
                variation_name: sub.get_one::<String>("variation").cloned(),
            };
            let query = client.update_query(query_id(sub)?, &update).await?;
            println!("Approved query '{}' (id {})", query.name, query.id);
            Ok(())
        }
        "reject" => {
            let update = QueryUpdate::status(QueryStatus::Rejected);
            let query = client.update_query(query_id(sub)?, &update).await?;
            println!("Rejected query '{}' (id {})", query.name, query.id);
            Ok(())
        }
        "link" => {
            let report = sub.get_one::<String>("report").cloned().unwrap_or_default();
            let query = sub.get_one::<String>("query").cloned().unwrap_or_default();
            client.link_query_to_report(&report, &query).await?;
            println!("Linked query '{}' to report '{}'", query, report);
            Ok(())
        }
        "for-report" => {
            let report = sub.get_one::<String>("report").cloned().unwrap_or_default();
            let mut queries = client.queries_for_report(&report).await?;
            if sub.get_flag("latest") {
                queries = latest_variation(&queries).cloned().into_iter().collect();
            }
            match mode {
                OutputMode::Json => print_json(&queries),
                OutputMode::Table => {
                    print!("{}", render::render_queries(&queries));
                    Ok(())
                }
            }
        }
        "report-type" => {
            let query = sub.get_one::<String>("query").cloned().unwrap_or_default();
            let report_type = client.report_type_for_query(&query).await?;
            print_json(&report_type)
        }
        other => Err(anyhow!("unknown query command '{}'", other)),
    }
}

fn query_id(matches: &ArgMatches) -> anyhow::Result<i64> {
    matches
        .get_one::<i64>("id")
        .copied()
        .ok_or_else(|| anyhow!("missing query id"))
}

/// Handler for build command
async fn build_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let report = matches.get_one::<String>("report").cloned().unwrap_or_default();
    let mut builder = QueryBuilder::new().report(&report)?;
    for group in strings(matches, "group") {
        builder = builder.select_group(&group)?;
    }
    for column in strings(matches, "column") {
        builder = builder.select(&column)?;
    }
    if let Some(order_by) = matches.get_one::<String>("order-by") {
        let direction = if matches.get_flag("desc") {
            OrderDirection::Descending
        } else {
            OrderDirection::Ascending
        };
        builder = builder.order_by(order_by, direction)?;
    }
    if let Some(operation) = matches.get_one::<String>("operation") {
        builder = builder.operation(operation.clone());
    }

    if !matches.get_flag("submit") {
        println!("{}", builder.build()?);
        return Ok(());
    }

    let client = api_client(matches)?;
    let submitted = client.create_query(&builder.to_pending_query()?).await?;
    println!(
        "Submitted '{}' (id {}) for approval",
        submitted.name, submitted.id
    );
    if !matches.get_flag("wait") {
        return Ok(());
    }

    let policy = PollPolicy::new()
        .interval(Duration::from_secs(
            matches.get_one::<u64>("poll-interval").copied().unwrap_or(5).max(1),
        ))
        .max_attempts(matches.get_one::<u32>("max-attempts").copied().unwrap_or(120))
        .timeout(Duration::from_secs(
            matches.get_one::<u64>("timeout").copied().unwrap_or(600),
        ));
    eprintln!("Waiting for approval (Ctrl-C to stop)...");
    let approved = wait_for_approval(&client, submitted.id, policy, ctrl_c_token()).await?;

    let dataset = client.run_saved_query_by_name(&approved.name).await?;
    print_dataset(matches, dataset, &approved.name)
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("companies", sub)) => companies_handler(sub).await,
        Some(("report-types", sub)) => report_types_handler(sub).await,
        Some(("view", sub)) => view_handler(sub).await,
        Some(("query", sub)) => query_handler(sub).await,
        Some(("build", sub)) => build_handler(sub).await,
        _ => Err(anyhow!("unknown command")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = build_command().get_matches();
    init_logging(matches.get_count("verbose"));

    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
