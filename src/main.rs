use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rolematch_rs::classifier::{Classifier, RuleCache};
use rolematch_rs::config::Settings;
use rolematch_rs::formula;
use rolematch_rs::rules::{FileRuleStore, HttpRuleClient, RuleNode, TreeRuleSource};
use rolematch_rs::server;

use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a formula's syntax
    Validate {
        /// The formula to check
        formula: String,
    },
    /// Evaluate a formula against sample names
    Test {
        /// The formula to evaluate
        #[arg(short, long)]
        formula: String,

        /// Names to test
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the tree form of a formula as JSON
    Tree {
        /// The formula to convert
        formula: String,

        /// Label of the root group
        #[arg(short, long, default_value = "Root")]
        label: String,
    },
    /// Report rules whose patterns overlap
    Conflicts {
        /// YAML rule file (defaults to ROLEMATCH_RULES_FILE)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Check this draft formula against the rule file instead
        #[arg(long)]
        formula: Option<String>,

        /// Rule id to leave out, e.g. the rule being edited
        #[arg(long)]
        exclude: Option<Uuid>,
    },
    /// Classify names with the active rules
    Classify {
        /// YAML rule file (defaults to ROLEMATCH_RULES_FILE)
        #[arg(short, long, conflicts_with = "server")]
        rules: Option<PathBuf>,

        /// Rule server base URL (defaults to ROLEMATCH_SERVER_URL)
        #[arg(short, long)]
        server: Option<String>,

        /// Names to classify
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Serve the admin API for a rule file
    Serve {
        /// YAML rule file (defaults to ROLEMATCH_RULES_FILE)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Port to listen on (defaults to ROLEMATCH_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn rule_file(flag: Option<PathBuf>, settings: &Settings) -> anyhow::Result<FileRuleStore> {
    let path = flag
        .or_else(|| settings.rules_file.clone())
        .context("no rule file: pass --rules or set ROLEMATCH_RULES_FILE")?;
    Ok(FileRuleStore::new(path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let settings = Settings::from_env()?;
    let args = Args::parse();

    match args.command {
        Commands::Validate { formula } => match formula::validate(&formula) {
            Ok(()) => println!("valid"),
            Err(e) => {
                println!("invalid: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Test { formula, names } => {
            let expr = formula::parse(&formula).context("formula is invalid")?;
            for name in names {
                let verdict = if expr.matches(&name) { "match" } else { "no match" };
                println!("{}\t{}", name, verdict);
            }
        }
        Commands::Tree { formula, label } => {
            let expr = formula::parse(&formula).context("formula is invalid")?;
            let tree = RuleNode::from_expression(&expr, &label);
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Commands::Conflicts {
            rules,
            formula: draft,
            exclude,
        } => {
            let store = rule_file(rules, &settings)?;
            let active = store.load().await?;

            match draft {
                Some(draft) => {
                    if let Err(e) = formula::validate(&draft) {
                        bail!("draft formula is invalid: {}", e);
                    }
                    let conflicts = formula::conflicts_with(&draft, &active, exclude);
                    for c in &conflicts {
                        println!(
                            "draft '{}' overlaps {} ({}) on '{}'",
                            c.overlap.left, c.rule.role_name, c.rule.rule_id, c.overlap.right
                        );
                    }
                    println!("{} possible conflicts", conflicts.len());
                }
                None => {
                    let conflicts = formula::detect_conflicts(&active, exclude);
                    for c in &conflicts {
                        println!(
                            "{} ('{}') overlaps {} ('{}')",
                            c.first.role_name, c.overlap.left, c.second.role_name, c.overlap.right
                        );
                    }
                    println!("{} possible conflicts", conflicts.len());
                }
            }
        }
        Commands::Classify {
            rules,
            server,
            names,
        } => {
            let server_url = server.or_else(|| settings.server_url.as_ref().map(|u| u.to_string()));
            let source: Arc<dyn TreeRuleSource> = match (rules, server_url) {
                (Some(path), _) => Arc::new(FileRuleStore::new(path)),
                (None, Some(url)) => Arc::new(HttpRuleClient::new(&url, settings.http_timeout)?),
                (None, None) => Arc::new(rule_file(None, &settings)?),
            };

            let classifier = Classifier::new(RuleCache::with_ttl(source, settings.cache_ttl));
            match classifier.cache().initialize().await {
                Some(snapshot) => log::info!(
                    "Classifying with {} rules captured at {}",
                    snapshot.len(),
                    snapshot.captured_at().to_rfc3339()
                ),
                None => log::warn!("No rules available; every name will be unclassified"),
            }
            for result in classifier.classify_all(names.as_slice()).await {
                println!("{}\t{}", result.name, result.role.as_deref().unwrap_or("-"));
            }
        }
        Commands::Serve { rules, port } => {
            let store = rule_file(rules, &settings)?;
            // Fail fast on a broken rule file rather than on the first request
            let count = store.load().await?.len();
            log::info!("Serving {} rules from {:?}", count, store.path());

            let port = port.unwrap_or(settings.port);
            server::serve(port, Arc::new(store)).await?;
        }
    }

    Ok(())
}
