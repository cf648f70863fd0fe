//! Contract Render CLI
//!
//! Runs a contract fixture (template body, fee structure, field values,
//! global variables) through the full contract service with a local blob
//! store.
//!
//! # Usage
//!
//! ```bash
//! # Render and upload a snapshot under $IME_BLOB_ROOT
//! contract_render render fixtures/sample_contract.yaml
//!
//! # Placeholders, required fee variables, compatibility
//! contract_render check fixtures/sample_contract.yaml -o json
//!
//! # Examiner fee view with overrides applied
//! contract_render fees fixtures/sample_contract.yaml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ime_contracts::types::{
    FeeStructure, FeeVariable, FieldValues, NewContract, Scalar, TemplateVersion,
};
use ime_contracts::{
    ContractService, ContractStores, ContractsConfig, InMemoryContractStore, InMemoryVariableStore,
    LocalBlobStore,
};

#[derive(Parser)]
#[command(name = "contract_render")]
#[command(version = "0.1.0")]
#[command(about = "Render IME contract fixtures through the contract service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the fixture and upload the snapshot
    Render {
        /// YAML or JSON fixture
        fixture: PathBuf,

        /// Blob store root directory
        #[arg(long, env = "IME_BLOB_ROOT")]
        blob_root: Option<PathBuf>,
    },

    /// Report placeholders and fee-structure compatibility
    Check { fixture: PathBuf },

    /// Show the examiner fee summary
    Fees { fixture: PathBuf },
}

#[derive(Debug, Deserialize)]
struct Fixture {
    template: String,
    fee_structure: FixtureFeeStructure,
    #[serde(default)]
    field_values: FieldValues,
    #[serde(default)]
    globals: HashMap<String, String>,
    /// Signs the contract before rendering when present
    #[serde(default)]
    signature: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct FixtureFeeStructure {
    name: String,
    #[serde(default)]
    variables: Vec<FeeVariable>,
}

struct Loaded {
    service: ContractService,
    template_version_id: Uuid,
    fee_structure_id: Uuid,
    field_values: FieldValues,
    signature: Option<Scalar>,
}

impl Loaded {
    async fn create_contract(&self) -> Result<Uuid> {
        let contract = self
            .service
            .create_contract(NewContract {
                template_version_id: self.template_version_id,
                fee_structure_id: self.fee_structure_id,
                field_values: self.field_values.clone(),
            })
            .await?;

        if let Some(signature) = &self.signature {
            self.service
                .sign_contract(contract.id, signature.clone())
                .await?;
        }
        Ok(contract.id)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ime_contracts=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ContractsConfig::from_env();

    match cli.command {
        Commands::Render { fixture, blob_root } => {
            if let Some(root) = blob_root {
                config.blob_root = root;
            }
            cmd_render(&fixture, &config, cli.format).await
        }
        Commands::Check { fixture } => cmd_check(&fixture, &config, cli.format).await,
        Commands::Fees { fixture } => cmd_fees(&fixture, &config, cli.format).await,
    }
}

async fn cmd_render(path: &Path, config: &ContractsConfig, format: OutputFormat) -> Result<()> {
    let loaded = load(path, config).await?;
    let contract_id = loaded.create_contract().await?;
    let outcome = loaded.service.preview_contract(contract_id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Pretty => {
            println!("{}", outcome.rendered_html);
            eprintln!();
            match &outcome.snapshot_key {
                Some(key) => eprintln!("{} snapshot {}", "OK".green(), key),
                None => eprintln!("{} template is blank, nothing stored", "NOTE".yellow()),
            }
            for name in &outcome.missing_placeholders {
                eprintln!("{} unresolved {{{{{}}}}}", "WARN".yellow(), name);
            }
        }
    }
    Ok(())
}

async fn cmd_check(path: &Path, config: &ContractsConfig, format: OutputFormat) -> Result<()> {
    let loaded = load(path, config).await?;
    let check = loaded
        .service
        .check_template(loaded.template_version_id, Some(loaded.fee_structure_id))
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&check)?),
        OutputFormat::Pretty => {
            println!("Placeholders ({}):", check.placeholders.len());
            for name in &check.placeholders {
                println!("  {}", name);
            }
            if !check.unknown_namespaces.is_empty() {
                println!(
                    "{} unknown namespaces: {}",
                    "WARN".yellow(),
                    check.unknown_namespaces.join(", ")
                );
            }
            if let Some(report) = &check.compatibility {
                if report.compatible {
                    println!("{} fee structure supplies all required variables", "OK".green());
                } else {
                    println!(
                        "{} fee structure is missing: {}",
                        "ERROR".red().bold(),
                        report.missing_variables.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn cmd_fees(path: &Path, config: &ContractsConfig, format: OutputFormat) -> Result<()> {
    let loaded = load(path, config).await?;
    let contract_id = loaded.create_contract().await?;
    let summary = loaded.service.examiner_fee_summary(contract_id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Pretty => {
            println!("{}", summary.fee_structure.bold());
            for line in &summary.lines {
                println!("  {:<28} {:>12}  ({})", line.label, line.display, line.role.label());
            }
            if !summary.unclassified.is_empty() {
                println!("{} unclassified: {}", "NOTE".yellow(), summary.unclassified.join(", "));
            }
        }
    }
    Ok(())
}

async fn load(path: &Path, config: &ContractsConfig) -> Result<Loaded> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let fixture: Fixture = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&source).context("Invalid JSON fixture")?
    } else {
        serde_yaml::from_str(&source).context("Invalid YAML fixture")?
    };

    let store = InMemoryContractStore::new();
    let template = TemplateVersion::new(Uuid::now_v7(), 1, fixture.template);
    let fee_structure =
        FeeStructure::new(fixture.fee_structure.name, fixture.fee_structure.variables);
    let template_version_id = template.id;
    let fee_structure_id = fee_structure.id;
    store.insert_template_version(template).await;
    store.insert_fee_structure(fee_structure).await;

    let variables = InMemoryVariableStore::from_maps(fixture.globals, HashMap::new());
    let blob_store = Arc::new(LocalBlobStore::new(config.blob_root.clone()));
    let service = ContractService::new(
        ContractStores::in_memory(store, variables),
        blob_store,
        config,
    );

    Ok(Loaded {
        service,
        template_version_id,
        fee_structure_id,
        field_values: fixture.field_values,
        signature: fixture.signature,
    })
}
