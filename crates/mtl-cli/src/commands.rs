use std::io::Read;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use mtl_crypto::{BatchIdGenerator, CertificateHasher};
use mtl_ledger::{
    Address, BatchDraft, BatchId, BatchSummary, ClientConfig, LedgerClient, RecordInput, Stage,
    TraceabilityRecord, TxReceipt,
};
use mtl_server::{NodeServer, ServerConfig};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(ref args) => cmd_serve(args).await,
        Command::Id(ref args) => cmd_id(args, format),
        Command::Hash(ref args) => cmd_hash(args, format),
        Command::Batch(ref args) => {
            let client = connect(&cli).await?;
            match &args.action {
                BatchAction::Create(create) => cmd_batch_create(&client, create, format).await,
                BatchAction::Show { batch_id } => cmd_batch_show(&client, batch_id, format).await,
                BatchAction::Verify { batch_id, revoke } => {
                    cmd_batch_verify(&client, batch_id, !revoke, format).await
                }
            }
        }
        Command::Record(ref args) => {
            let client = connect(&cli).await?;
            match &args.action {
                RecordAction::Add(add) => cmd_record_add(&client, add, format).await,
            }
        }
        Command::Records(ref args) => {
            let client = connect(&cli).await?;
            cmd_records(&client, &args.batch_id, format).await
        }
        Command::Total => {
            let client = connect(&cli).await?;
            let total = client.queries().total_batches().await?;
            emit(format, &serde_json::json!({ "total": total }), || {
                println!("{} batches", total.to_string().bold());
            })
        }
    }
}

/// Client configuration: file, then `MTL_*` variables, then flags.
fn client_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(contract) = &cli.contract {
        let addr = Address::from_hex(contract)
            .with_context(|| format!("invalid contract address {contract:?}"))?;
        config.contract = Some(addr);
    }
    if let Some(account) = &cli.account {
        config.account = account.parse()?;
    }
    Ok(config)
}

async fn connect(cli: &Cli) -> anyhow::Result<LedgerClient> {
    let config = client_config(cli)?;
    tracing::debug!(endpoint = %config.endpoint, account = %config.account, "connecting");
    LedgerClient::connect(&config)
        .await
        .with_context(|| format!("connecting to {}", config.endpoint))
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_receipt(receipt: &TxReceipt) {
    println!(
        "  Tx: {} (block {}, {})",
        receipt.transaction_hash.short().yellow(),
        receipt.block_number,
        receipt.accepted_at.to_string().dimmed()
    );
}

async fn cmd_serve(args: &ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.node_config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(accounts) = args.accounts {
        config.accounts = accounts;
    }
    if let Some(confirmations) = args.confirmations {
        config.confirmations = confirmations;
    }

    let node = NodeServer::new(config)?;
    let chain = node.chain();
    println!("{} MTL node on {}", "✓".green().bold(), node.config().bind_addr.to_string().bold());
    println!("  Contract: {}", chain.contract_address().to_string().cyan());
    for i in 0..node.config().accounts {
        if let Some(account) = chain.account(i) {
            println!("  Account #{i}: {account}");
        }
    }
    node.serve().await?;
    Ok(())
}

async fn cmd_batch_create(client: &LedgerClient, args: &CreateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let draft = BatchDraft {
        farmer_id: args.farmer_id.clone(),
        millet_type: args.millet_type.clone(),
        variety: args.variety.clone(),
        harvest_date: args.harvest_date.clone(),
        quality_grade: args.quality_grade.clone(),
        organic_certified: args.organic,
    };
    let registry = client.registry();
    let (batch_id, receipt) = match &args.id {
        Some(id) => {
            let batch_id = BatchId::new(id.clone())?;
            let receipt = registry.create(draft.with_id(batch_id.clone())).await?;
            (batch_id, receipt)
        }
        None => registry.mint(draft, &mut BatchIdGenerator::system()).await?,
    };

    emit(
        format,
        &serde_json::json!({ "batchId": batch_id, "receipt": receipt }),
        || {
            println!("{} Batch {} created", "✓".green().bold(), batch_id.to_string().bold());
            println!("  Owner: {}", client.account());
            print_receipt(&receipt);
        },
    )
}

fn print_records(records: &[TraceabilityRecord]) {
    if records.is_empty() {
        println!("  No stage records.");
        return;
    }
    for (i, record) in records.iter().enumerate() {
        let stage = if record.stage.is_known() {
            record.stage.as_str().green()
        } else {
            record.stage.as_str().yellow()
        };
        println!(
            "  {:>3}. {} @ {} by {} ({})",
            i + 1,
            stage,
            record.location,
            record.operator.bold(),
            record.timestamp.to_string().dimmed()
        );
        if !record.notes.is_empty() {
            println!("       Notes: {}", record.notes);
        }
        if !record.certificate_hash.is_empty() {
            println!("       Certificate: {}", record.certificate_hash.cyan());
        }
    }
}

async fn cmd_batch_show(client: &LedgerClient, batch_id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let batch_id = BatchId::new(batch_id)?;
    let summary: BatchSummary = client.queries().batch_summary(&batch_id).await?;
    emit(format, &summary, || {
        let batch = &summary.batch;
        let verified = if batch.verified { "verified".green() } else { "unverified".red() };
        println!("Batch {} [{}]", batch.batch_id.to_string().bold(), verified);
        println!("  Farmer: {}", batch.farmer_id);
        println!("  Millet: {} ({})", batch.millet_type, batch.variety);
        println!("  Harvested: {}", batch.harvest_date);
        println!("  Grade: {}", batch.quality_grade);
        println!("  Organic: {}", if batch.organic_certified { "yes" } else { "no" });
        println!("  Owner: {}", batch.owner);
        if let Some(stage) = summary.current_stage() {
            println!("  Current stage: {}", stage.as_str().cyan());
        }
        print_records(&summary.records);
    })
}

async fn cmd_batch_verify(
    client: &LedgerClient,
    batch_id: &str,
    verified: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let batch_id = BatchId::new(batch_id)?;
    let receipt = client.verification().verify(&batch_id, verified).await?;
    emit(
        format,
        &serde_json::json!({ "batchId": batch_id, "verified": verified, "receipt": receipt }),
        || {
            let action = if verified { "verified" } else { "revoked" };
            println!("{} Batch {} {}", "✓".green().bold(), batch_id.to_string().bold(), action);
            print_receipt(&receipt);
        },
    )
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
}

async fn cmd_record_add(client: &LedgerClient, args: &AddRecordArgs, format: OutputFormat) -> anyhow::Result<()> {
    let batch_id = BatchId::new(args.batch_id.clone())?;
    let certificate_hash = match (&args.certificate, &args.certificate_hash) {
        (Some(path), _) => CertificateHasher::new().hash(&read_json(path)?)?.to_hex(),
        (None, Some(hash)) => hash.clone(),
        (None, None) => String::new(),
    };
    let record = RecordInput::new(Stage::parse(&args.stage), args.location.clone(), args.operator.clone())
        .with_notes(args.notes.clone())
        .with_certificate_hash(certificate_hash);

    let receipt = client.traceability().append(&batch_id, record.clone()).await?;
    emit(
        format,
        &serde_json::json!({ "batchId": batch_id, "record": record, "receipt": receipt }),
        || {
            println!(
                "{} Recorded {} for {}",
                "✓".green().bold(),
                record.stage.as_str().cyan(),
                batch_id.to_string().bold()
            );
            print_receipt(&receipt);
        },
    )
}

async fn cmd_records(client: &LedgerClient, batch_id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let batch_id = BatchId::new(batch_id)?;
    let records = client.traceability().list(&batch_id).await?;
    emit(format, &records, || {
        println!("Batch {}: {} record(s)", batch_id.to_string().bold(), records.len());
        print_records(&records);
    })
}

fn cmd_id(args: &IdArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut generator = BatchIdGenerator::system();
    let ids: Vec<BatchId> = (0..args.count).map(|_| generator.new_batch_id()).collect();
    emit(format, &ids, || {
        for id in &ids {
            println!("{id}");
        }
    })
}

fn cmd_hash(args: &HashArgs, format: OutputFormat) -> anyhow::Result<()> {
    let payload = read_json(&args.path)?;
    let hash = CertificateHasher::new().hash(&payload)?;
    emit(format, &serde_json::json!({ "certificateHash": hash }), || {
        println!("{hash}");
    })
}
