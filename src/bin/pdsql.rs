//! pdsql: compile and run the census demo queries
//!
//! # Usage
//!
//! ```bash
//! # List the demo queries
//! pdsql list
//!
//! # Show compiled SQL, with the operation tree
//! pdsql show wv-shrinking --explain
//!
//! # Execute against a database
//! pdsql run largest-counties --database-url sqlite://tests/db.sqlite3
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use pdsql::config::{self, Config};
use pdsql::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdsql")]
#[command(version)]
#[command(about = "Compile and run PDSQL query trees", long_about = None)]
#[command(after_help = "EXAMPLES:
    pdsql list
    pdsql show chairmen-states --explain
    pdsql run counties-per-state --format json")]
struct Cli {
    /// Configuration file (defaults to <config dir>/pdsql/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format for query results
    #[arg(short, long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Database connection URL
    #[arg(long, env = "PDSQL_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl From<config::OutputFormat> for OutputFormat {
    fn from(format: config::OutputFormat) -> Self {
        match format {
            config::OutputFormat::Table => OutputFormat::Table,
            config::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the demo queries
    List,
    /// Print the compiled SQL of one or all demo queries
    Show {
        /// Demo query name; all queries if omitted
        name: Option<String>,
        /// Also print the operation tree
        #[arg(long)]
        explain: bool,
    },
    /// Execute a demo query and print its rows
    Run {
        /// Demo query name
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = execute(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = Config::discover(cli.config.as_deref())?;
    init_tracing(&config, cli.verbose)?;

    match &cli.command {
        Commands::List => {
            for demo in DEMOS {
                println!("{:<20} {}", demo.name.cyan(), demo.about);
            }
            Ok(())
        }
        Commands::Show { name, explain } => {
            let demos: Vec<&Demo> = match name {
                Some(name) => vec![find_demo(name)?],
                None => DEMOS.iter().collect(),
            };
            for demo in demos {
                show_demo(demo, *explain)?;
            }
            Ok(())
        }
        Commands::Run { name } => {
            let demo = find_demo(name)?;
            let url = cli
                .database_url
                .clone()
                .or(config.database_url.clone())
                .ok_or_else(|| {
                    anyhow!("No database URL. Use --database-url, PDSQL_DATABASE_URL or the config file")
                })?;
            let format = cli.format.unwrap_or_else(|| config.format.into());

            let driver = Arc::new(SqlxDriver::connect(&url)?);
            let query = (demo.build)()?.with_driver(driver);
            if cli.verbose {
                println!("{} {}", "SQL:".dimmed(), query.compile()?.yellow());
            }

            let rows = query
                .run()
                .with_context(|| format!("running demo '{}'", demo.name))?;
            info!(demo = demo.name, rows = rows.len(), "query finished");
            format_output(&rows, format);
            Ok(())
        }
    }
}

fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("pdsql=debug")
    } else if let Some(directive) = &config.log {
        EnvFilter::try_new(directive)?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdsql=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn show_demo(demo: &Demo, explain: bool) -> Result<()> {
    let query = (demo.build)()?;
    println!("{} {}", "--".dimmed(), demo.about.dimmed());
    println!("{}", query.compile()?.white());
    if explain {
        println!();
        print!("{}", query);
    }
    println!();
    Ok(())
}

fn find_demo(name: &str) -> Result<&'static Demo> {
    DEMOS.iter().find(|d| d.name == name).ok_or_else(|| {
        anyhow!(
            "Unknown demo '{}'. Try: {}",
            name,
            DEMOS.iter().map(|d| d.name).collect::<Vec<_>>().join(", ")
        )
    })
}

fn format_output(results: &[ResultRow], format: OutputFormat) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).unwrap_or_default());
        }
        OutputFormat::Table => {
            let mut columns: Vec<&String> = results[0].keys().collect();
            columns.sort();

            let mut widths: HashMap<&String, usize> =
                columns.iter().map(|c| (*c, c.len())).collect();
            for row in results {
                for (col, val) in row {
                    let len = val_to_string(val).len();
                    if let Some(w) = widths.get_mut(col) {
                        *w = (*w).max(len);
                    }
                }
            }

            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:width$}", c, width = widths[*c]))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = columns.iter().map(|c| "─".repeat(widths[*c])).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in results {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let val = row.get(*c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = widths[*c])
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct Demo {
    name: &'static str,
    about: &'static str,
    build: fn() -> PdsqlResult<Table>,
}

static DEMOS: &[Demo] = &[
    Demo {
        name: "largest-counties",
        about: "Counties above two million people, largest first",
        build: largest_counties,
    },
    Demo {
        name: "counties-per-state",
        about: "Number of counties in each state",
        build: counties_per_state,
    },
    Demo {
        name: "avg-counties",
        about: "Average number of counties per state",
        build: avg_counties,
    },
    Demo {
        name: "above-avg-states",
        about: "Number of states with more counties than average",
        build: above_avg_states,
    },
    Demo {
        name: "pop-mismatch",
        about: "States whose population differs from the sum of their counties",
        build: pop_mismatch,
    },
    Demo {
        name: "wv-shrinking",
        about: "West Virginia counties that lost population since 1950",
        build: wv_shrinking,
    },
    Demo {
        name: "no-chairmen",
        about: "States without a senator chairing a committee",
        build: no_chairmen,
    },
    Demo {
        name: "chairmen-states",
        about: "States with a senator chairing a subcommittee",
        build: chairmen_states,
    },
    Demo {
        name: "subcommittees",
        about: "Subcommittees chaired by the chairman of their parent",
        build: subcommittees,
    },
    Demo {
        name: "elder-chairmen",
        about: "Parent committee chairmen born after their subcommittee chairman",
        build: elder_chairmen,
    },
];

fn states() -> Table {
    Table::new("states")
}

fn counties() -> Table {
    Table::new("counties")
}

fn senators() -> Table {
    Table::new("senators")
}

fn committees() -> Table {
    Table::new("committees")
}

fn largest_counties() -> PdsqlResult<Table> {
    let c = counties();
    Ok(c.where_(c.col("population_2010").gt(2_000_000))?
        .select([c.col("statecode"), c.col("name"), c.col("population_2010")])
        .order(c.col("population_2010"))?
        .reverse())
}

fn counties_per_state() -> PdsqlResult<Table> {
    let c = counties();
    Ok(c.group(c.col("statecode"))?
        .select([c.col("statecode"), c.count()]))
}

fn counties_by_state() -> PdsqlResult<Table> {
    let c = counties();
    Ok(Table::from_query(
        c.group(c.col("statecode"))?
            .select_as("num_counties", c.count()),
    ))
}

fn avg_counties() -> PdsqlResult<Table> {
    let nc = counties_by_state()?;
    Ok(nc.select([nc.col("num_counties").avg()?]))
}

fn above_avg_states() -> PdsqlResult<Table> {
    let c = counties();
    let st = Table::from_query(
        c.group(c.col("statecode"))?
            .having(c.count().gt(avg_counties()?))
            .select_as("num_states", c.col("statecode")),
    );
    Ok(st.select([st.col("num_states").count()?]))
}

fn pop_mismatch() -> PdsqlResult<Table> {
    let (s, c) = (states(), counties());
    let pop_sums = c
        .where_(c.col("statecode").eq(s.col("statecode")))?
        .select([c.col("population_2010").sum()?]);
    Ok(s.where_(s.col("population_2010").ne(pop_sums))?
        .select([s.col("statecode")]))
}

fn wv_shrinking() -> PdsqlResult<Table> {
    let (s, c) = (states(), counties());
    Ok(c
        .join_on(s.clone(), s.col("statecode").eq(c.col("statecode")))?
        .where_(
            s.col("statecode")
                .eq("WV")
                .and(c.col("population_1950").gt(c.col("population_2010"))),
        )?
        .select([
            c.col("name"),
            c.col("population_1950").sub(c.col("population_2010")),
        ]))
}

fn no_chairmen() -> PdsqlResult<Table> {
    let (s, se, co) = (states(), senators(), committees());
    let with_chairmen = se
        .join_on(co.clone(), se.col("name").eq(co.col("chairman")))?
        .select([se.col("statecode")]);
    Ok(s.where_(s.col("statecode").is_in(with_chairmen).not()?)?
        .select([s.col("statecode")]))
}

fn chairmen_states() -> PdsqlResult<Table> {
    let (se, co) = (senators(), committees());
    let chairs_sub = co
        .select([1])
        .where_(co.col("chairman").eq(se.col("name")))?
        .where_(co.col("parent_committee").not_null()?)?;
    Ok(se
        .where_exists(chairs_sub)
        .select([se.col("statecode")])
        .distinct())
}

fn subcommittees() -> PdsqlResult<Table> {
    let pc = Table::aliased("committees", "pc");
    let sc = Table::aliased("committees", "sc");
    Ok(sc
        .join_on(
            pc.clone(),
            pc.col("id")
                .eq(sc.col("parent_committee"))
                .and(pc.col("chairman").eq(sc.col("chairman"))),
        )?
        .select([
            pc.col("id"),
            pc.col("chairman"),
            sc.col("id"),
            sc.col("chairman"),
        ]))
}

fn elder_chairmen() -> PdsqlResult<Table> {
    let pc = Table::aliased("committees", "pc");
    let sc = Table::aliased("committees", "sc");
    let s1 = Table::aliased("senators", "s1");
    let s2 = Table::aliased("senators", "s2");
    Ok(sc
        .join_on(pc.clone(), pc.col("id").eq(sc.col("parent_committee")))?
        .join_on(s1.clone(), s1.col("name").eq(pc.col("chairman")))?
        .join_on(s2.clone(), s2.col("name").eq(sc.col("chairman")))?
        .where_(s1.col("born").gt(s2.col("born")))?
        .select([
            pc.col("id"),
            pc.col("chairman"),
            s1.col("born"),
            sc.col("id"),
            sc.col("chairman"),
            s2.col("born"),
        ]))
}
