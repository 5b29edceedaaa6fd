use clap::{Parser, Subcommand};
use client::{
    Analysis, OarClient, Outcome, Resolution, ResultsService, ServiceConfig, Test, TestQuery,
    BASE_URL_ENV,
};
use enrich::{
    delete_selected, enrich_selected, refresh, render, Notifier, SessionState, TerminalNotifier,
};
use serde_json::Value;
use std::io::{self, Write};
use tracing::error;

#[derive(Parser)]
#[command(name = "enrich")]
#[command(about = "Console for viewing, enriching, and deleting OAR test results")]
struct Cli {
    /// Base URL of the results service (falls back to OAR_SERVICE_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the test table
    Table {
        /// Columns to display, in order
        #[arg(short, long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
        /// Restrict to specific test ids
        #[arg(long, value_delimiter = ',')]
        ids: Option<Vec<u64>>,
        /// Restrict to outcomes (Passed, Failed)
        #[arg(long, value_delimiter = ',')]
        outcomes: Option<Vec<Outcome>>,
        /// Restrict to analyses
        #[arg(long, value_delimiter = ',')]
        analyses: Option<Vec<Analysis>>,
        /// Restrict to resolutions
        #[arg(long, value_delimiter = ',')]
        resolutions: Option<Vec<Resolution>>,
    },
    /// Add a new test result
    Add {
        /// Short description of what the test accomplished
        #[arg(short, long)]
        summary: String,
        /// Passed or Failed
        #[arg(short, long)]
        outcome: Outcome,
        #[arg(long)]
        analysis: Option<Analysis>,
        #[arg(long)]
        resolution: Option<Resolution>,
        /// Doc fields as key=value pairs (values parsed as JSON when possible)
        #[arg(short, long)]
        doc: Vec<String>,
    },
    /// Apply an enrichment patch to tests by id
    Enrich {
        /// Ids of the tests to enrich
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
        /// New summary for the matched tests
        #[arg(short, long)]
        summary: Option<String>,
        #[arg(short, long)]
        outcome: Outcome,
        #[arg(long)]
        analysis: Option<Analysis>,
        #[arg(long)]
        resolution: Option<Resolution>,
        /// Doc fields to merge in, as key=value pairs
        #[arg(short, long)]
        doc: Vec<String>,
    },
    /// Delete tests by id
    Delete {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },
    /// Health check
    Health,
    /// Interactive browsing session
    Browse,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let base_url = cli
        .base_url
        .or_else(|| std::env::var(BASE_URL_ENV).ok())
        .unwrap_or_else(|| ServiceConfig::default().base_url);
    let client = OarClient::new(ServiceConfig::new().with_base_url(base_url))?;
    let notifier = TerminalNotifier::new();

    match cli.command {
        Commands::Table {
            columns,
            ids,
            outcomes,
            analyses,
            resolutions,
        } => {
            let query = TestQuery {
                ids,
                outcomes,
                analyses,
                resolutions,
                ..TestQuery::default()
            };
            show_table(&client, &notifier, query, columns).await;
        }
        Commands::Add {
            summary,
            outcome,
            analysis,
            resolution,
            doc,
        } => {
            add_test(&client, summary, outcome, analysis, resolution, &doc).await?;
        }
        Commands::Enrich {
            ids,
            summary,
            outcome,
            analysis,
            resolution,
            doc,
        } => {
            let mut patch = Test::new(summary.unwrap_or_default(), outcome);
            if let Some(analysis) = analysis {
                patch = patch.with_analysis(analysis);
            }
            if let Some(resolution) = resolution {
                patch = patch.with_resolution(resolution);
            }
            for field in &doc {
                let (key, value) = parse_doc_field(field)?;
                patch = patch.with_doc_field(key, value);
            }

            let mut state = SessionState::new();
            state.set_selection(ids);
            enrich_selected(&client, &notifier, &mut state, &patch).await;
        }
        Commands::Delete { ids } => {
            let mut state = SessionState::new();
            state.set_selection(ids);
            delete_selected(&client, &notifier, &mut state).await;
        }
        Commands::Health => {
            health_check(&client).await;
        }
        Commands::Browse => {
            browse(&client, &notifier).await?;
        }
    }

    Ok(())
}

async fn show_table(
    client: &OarClient,
    notifier: &dyn Notifier,
    query: TestQuery,
    columns: Option<Vec<String>>,
) {
    let mut state = SessionState::new();
    if !query.is_empty() {
        state.set_active_query(Some(query));
    }
    if let Some(columns) = columns {
        state.set_columns(columns);
    }

    let headers = state.columns().to_vec();
    let rows = refresh(client, notifier, &mut state).await;
    if rows.is_empty() {
        println!("No tests found.");
    } else {
        println!("{}", render(&headers, &rows));
    }
}

async fn add_test(
    client: &OarClient,
    summary: String,
    outcome: Outcome,
    analysis: Option<Analysis>,
    resolution: Option<Resolution>,
    doc: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut test = Test::new(summary, outcome);
    if let Some(analysis) = analysis {
        test = test.with_analysis(analysis);
    }
    if let Some(resolution) = resolution {
        test = test.with_resolution(resolution);
    }
    for field in doc {
        let (key, value) = parse_doc_field(field)?;
        test = test.with_doc_field(key, value);
    }

    test.clean();
    test.validate()?;

    match client.add_test(&test).await {
        Ok(test_id) => {
            println!("Added test {}", test_id);
            Ok(())
        }
        Err(e) => {
            error!("failed to add test: {}", e);
            Err(e.into())
        }
    }
}

async fn health_check(client: &OarClient) {
    println!("Checking {} ...", client.base_url());
    if client.health().await {
        println!("✓ Results service is healthy.");
    } else {
        println!("✗ Results service is unreachable or unhealthy.");
    }
}

/// Splits a `key=value` pair, parsing the value as JSON where possible and
/// falling back to a plain string.
fn parse_doc_field(field: &str) -> Result<(String, Value), String> {
    let (key, value) = field
        .split_once('=')
        .ok_or_else(|| format!("doc field '{}' is not a key=value pair", field))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

const BROWSE_HELP: &str = "\
Commands:
  table                       render the test table
  select <id> [<id> ...]      toggle selection of test ids
  columns <name> [<name> ...] set the visible columns
  filter outcome=<o> | analysis=<a> | resolution=<r> | clear
  enrich <field>=<value> ...  patch the selected tests
  delete                      delete the selected tests
  help                        show this help
  quit                        leave the session";

async fn browse(
    client: &OarClient,
    notifier: &dyn Notifier,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Browsing tests on {}", client.base_url());
    println!("Type 'help' for commands, 'quit' to leave.\n");

    let mut state = SessionState::new();

    loop {
        if state.take_refresh() {
            let headers = state.columns().to_vec();
            let rows = refresh(client, notifier, &mut state).await;
            if rows.is_empty() {
                println!("No tests found.");
            } else {
                println!("{}", render(&headers, &rows));
            }
        }

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        let mut words = input.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match command {
            "quit" | "exit" => break,
            "help" => println!("{}", BROWSE_HELP),
            "table" => state.request_refresh(),
            "select" => {
                for arg in &args {
                    match arg.parse::<u64>() {
                        Ok(id) => state.toggle_selected(id),
                        Err(_) => notifier.warning(&format!("'{}' is not a test id", arg)),
                    }
                }
                println!("Selected: {:?}", state.selected_ids());
            }
            "columns" => {
                state.set_columns(args.iter().map(|a| a.to_string()).collect());
            }
            "filter" => match parse_filter(&args) {
                Ok(query) => state.set_active_query(query),
                Err(e) => notifier.warning(&e),
            },
            "enrich" => match parse_patch(&args) {
                Ok(patch) => {
                    enrich_selected(client, notifier, &mut state, &patch).await;
                }
                Err(e) => notifier.warning(&e),
            },
            "delete" => {
                delete_selected(client, notifier, &mut state).await;
            }
            other => notifier.warning(&format!("Unknown command '{}'; try 'help'", other)),
        }
    }

    Ok(())
}

fn parse_filter(args: &[&str]) -> Result<Option<TestQuery>, String> {
    if args == ["clear"] {
        return Ok(None);
    }

    let mut query = TestQuery::new();
    for arg in args {
        let (field, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("filter '{}' is not a field=value pair", arg))?;
        match field {
            "id" => {
                let id = value.parse().map_err(|_| format!("bad id: '{}'", value))?;
                query.ids.get_or_insert_with(Vec::new).push(id);
            }
            "summary" => {
                query
                    .summaries
                    .get_or_insert_with(Vec::new)
                    .push(value.to_string());
            }
            "outcome" => {
                query.outcomes.get_or_insert_with(Vec::new).push(value.parse()?);
            }
            "analysis" => {
                query.analyses.get_or_insert_with(Vec::new).push(value.parse()?);
            }
            "resolution" => {
                query
                    .resolutions
                    .get_or_insert_with(Vec::new)
                    .push(value.parse()?);
            }
            other => return Err(format!("cannot filter on '{}'", other)),
        }
    }
    Ok(Some(query))
}

/// Builds an enrichment patch from `field=value` words. Fixed fields go to
/// their typed slots; anything else becomes a doc field.
fn parse_patch(args: &[&str]) -> Result<Test, String> {
    if args.is_empty() {
        return Err("enrich needs at least one field=value pair".to_string());
    }

    let mut summary = String::new();
    let mut outcome = None;
    let mut analysis = None;
    let mut resolution = None;
    let mut doc_fields = Vec::new();

    for arg in args {
        let (field, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("patch '{}' is not a field=value pair", arg))?;
        match field {
            "summary" => summary = value.to_string(),
            "outcome" => outcome = Some(value.parse::<Outcome>()?),
            "analysis" => analysis = Some(value.parse::<Analysis>()?),
            "resolution" => resolution = Some(value.parse::<Resolution>()?),
            _ => doc_fields.push((field.to_string(), value.to_string())),
        }
    }

    // The wire patch always carries an outcome, so one must be stated even
    // when only other fields change.
    let outcome = outcome.ok_or_else(|| "enrich needs an outcome=<Passed|Failed>".to_string())?;
    let mut patch = Test::new(summary, outcome);
    if let Some(analysis) = analysis {
        patch = patch.with_analysis(analysis);
    }
    if let Some(resolution) = resolution {
        patch = patch.with_resolution(resolution);
    }
    for (key, value) in doc_fields {
        let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
        patch = patch.with_doc_field(key, value);
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_doc_field() {
        assert_eq!(
            parse_doc_field("owner=Sandy Cheeks").unwrap(),
            ("owner".to_string(), json!("Sandy Cheeks"))
        );
        assert_eq!(
            parse_doc_field("maxRPS=300").unwrap(),
            ("maxRPS".to_string(), json!(300))
        );
        assert!(parse_doc_field("no separator").is_err());
    }

    #[test]
    fn test_parse_filter() {
        let query = parse_filter(&["outcome=Failed", "id=14"]).unwrap().unwrap();
        assert_eq!(query.outcomes, Some(vec![Outcome::Failed]));
        assert_eq!(query.ids, Some(vec![14]));

        assert_eq!(parse_filter(&["clear"]).unwrap(), None);
        assert!(parse_filter(&["outcome=failed"]).is_err());
        assert!(parse_filter(&["created=today"]).is_err());
    }

    #[test]
    fn test_parse_patch() {
        let patch = parse_patch(&[
            "outcome=Failed",
            "analysis=TruePositive",
            "owner=Patrick Star",
        ])
        .unwrap();
        assert_eq!(patch.outcome, Outcome::Failed);
        assert_eq!(patch.analysis, Analysis::TruePositive);
        assert_eq!(patch.doc["owner"], json!("Patrick Star"));

        assert!(parse_patch(&[]).is_err());
        // A patch with no outcome is unrepresentable on the wire.
        assert!(parse_patch(&["analysis=TruePositive"]).is_err());
    }
}
