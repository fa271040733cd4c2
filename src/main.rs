use clap::{Parser, Subcommand};
use dotenv::dotenv;
use verdict_rs::config::ServerConfig;
use verdict_rs::error::VerdictError;
use verdict_rs::predicate::{self, EvalResult, EvaluationContext, GRAMMAR_SCHEMA};
use verdict_rs::rules::{CompiledPredicate, RuleBookLoader};
use verdict_rs::server;

use std::fs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a predicate AST against a context
    Eval {
        /// AST as JSON text, or @path to a file
        #[arg(short, long)]
        ast: String,

        /// Context as a JSON object, or @path to a file
        #[arg(short, long)]
        context: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a predicate AST as a readable expression
    Render {
        /// AST as JSON text, or @path to a file
        #[arg(short, long)]
        ast: String,
    },
    /// Check a record against every active rule in a rule book
    Check {
        /// Path to the rule book (YAML or JSON)
        #[arg(short, long)]
        rules: String,

        /// Context as a JSON object, or @path to a file
        #[arg(short, long)]
        context: String,

        /// Print the outcomes as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the rules of a rule book
    Rules {
        /// Path to the rule book (YAML or JSON)
        #[arg(short, long)]
        rules: String,
    },
    /// Validate a reply from the natural-language predicate compiler
    Intake {
        /// Reply text, or @path to a file
        #[arg(long)]
        reply: String,

        /// Rule book whose field catalog whitelists fields
        #[arg(short, long)]
        rules: Option<String>,
    },
    /// Print the JSON Schema of the predicate grammar
    Grammar,
    /// Start the HTTP server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Rule book to serve
        #[arg(short, long)]
        rules: Option<String>,
    },
}

/// Read an argument literally, or from a file when it starts with `@`
fn read_arg(arg: &str) -> Result<String, VerdictError> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok(arg.to_string()),
    }
}

fn read_context(arg: Option<&str>) -> Result<EvaluationContext, VerdictError> {
    match arg {
        Some(arg) => Ok(EvaluationContext::from_json_str(&read_arg(arg)?)?),
        None => Ok(EvaluationContext::new()),
    }
}

fn print_result(result: &EvalResult) {
    let verdict = if result.pass { "PASS" } else { "FAIL" };
    match &result.error {
        Some(err) => println!("{} (error: {})", verdict, err),
        None => println!("{}", verdict),
    }
    print!("{}", result.trace.render_tree());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Eval { ast, context, json } => {
            let ctx = read_context(context.as_deref())?;
            let result = predicate::evaluate_from_str(&read_arg(&ast)?, &ctx);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Commands::Render { ast } => {
            let node = predicate::parse(&read_arg(&ast)?)?;
            println!("{}", node);
        }
        Commands::Check {
            rules,
            context,
            json,
        } => {
            let book = RuleBookLoader::new().load(&rules)?;
            let ctx = read_context(Some(context.as_str()))?;
            let outcomes = book.check(&ctx);
            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                for outcome in &outcomes {
                    let mark = if outcome.triggered { "✗" } else { "✓" };
                    print!("{} {} [{:?}]", mark, outcome.rule_id, outcome.severity);
                    match (&outcome.message, &outcome.result.error) {
                        (Some(message), _) => println!(": {}", message),
                        (None, Some(err)) => println!(" (error: {})", err),
                        (None, None) => println!(),
                    }
                }
                let triggered = outcomes.iter().filter(|o| o.triggered).count();
                println!("{} of {} rules triggered", triggered, outcomes.len());
            }
        }
        Commands::Rules { rules } => {
            let book = RuleBookLoader::new().load(&rules)?;
            for rule in &book.rules {
                let state = if rule.active { "" } else { " (inactive)" };
                println!(
                    "{} [{:?}/{:?}]{}: {}",
                    rule.id,
                    rule.kind,
                    rule.severity,
                    state,
                    predicate::render(&rule.ast)
                );
            }
        }
        Commands::Intake { reply, rules } => {
            let compiled = CompiledPredicate::parse(&read_arg(&reply)?)?;
            if let Some(path) = rules {
                let book = RuleBookLoader::new().load(&path)?;
                compiled.check_fields(&book.fields)?;
            }
            println!("{}", compiled.rendered());
            if !compiled.summary.is_empty() {
                println!("{}", compiled.summary);
            }
            println!("{}", serde_json::to_string_pretty(&compiled.ast)?);
        }
        Commands::Grammar => {
            println!("{}", serde_json::to_string_pretty(&*GRAMMAR_SCHEMA)?);
        }
        Commands::Serve { port, host, rules } => {
            let mut config = ServerConfig::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(rules) = rules {
                config.rules_path = Some(rules.into());
            }
            server::serve(config).await?;
        }
    }

    Ok(())
}
