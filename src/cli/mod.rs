use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{ServiceConfig, WalletService};
use crate::domain::{
    BusinessTransaction, CardId, TransactionId, TransactionStatus, VirtualCard, WalletId,
    format_cents, parse_cents, remaining_balance, spending_progress,
};
use crate::io::SeedData;
use crate::storage::Repository;

/// Fiscus - virtual cards and merchant transactions
#[derive(Parser)]
#[command(name = "fiscus")]
#[command(about = "Virtual card limits and merchant refunds for a mobile wallet session")]
#[command(version)]
pub struct Cli {
    /// Settings database file path
    #[arg(short, long, default_value = "fiscus.db")]
    pub database: String,

    /// JSON seed file with cards and transactions (built-in demo data if omitted)
    #[arg(long)]
    pub seed: Option<String>,

    /// Simulated latency per operation, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// One line of a `session` script.
#[derive(Parser)]
#[command(name = "fiscus", no_binary_name = true)]
struct SessionLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the settings database
    Init,

    /// Virtual card commands
    #[command(subcommand)]
    Card(CardCommands),

    /// List business transactions, most recent first
    Transactions {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a business transaction and its refunds
    #[command(name = "show")]
    ShowTransaction {
        /// Transaction ID
        id: TransactionId,
    },

    /// Record an incoming business payment
    Pay {
        /// Amount (e.g., "89.50")
        amount: String,

        /// Customer name
        #[arg(long)]
        customer: String,

        /// Payment method (card, wallet, bank_transfer, ...)
        #[arg(short, long, default_value = "card")]
        method: String,

        /// Record the payment as pending rather than completed
        #[arg(long)]
        pending: bool,
    },

    /// Refund a business transaction
    Refund {
        /// Transaction ID to refund
        id: TransactionId,

        /// Amount to refund (omit for the full amount)
        amount: Option<String>,

        /// Reason attached to the refund
        #[arg(short, long, default_value = "customer request")]
        reason: String,
    },

    /// Show business metrics
    Metrics,

    /// Show card portfolio, business metrics and recent transactions
    Dashboard {
        /// Number of recent transactions to include
        #[arg(short, long, default_value = "5")]
        recent: usize,
    },

    /// Notification and preference settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: cards, transactions, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run commands from a file (or stdin), one per line, against a single session
    Session {
        /// Script file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CardCommands {
    /// List virtual cards
    List {
        /// Only cards drawing on this wallet
        #[arg(long)]
        wallet: Option<WalletId>,
    },

    /// Show a card with its spending progress
    Show {
        /// Card ID
        id: CardId,
    },

    /// Issue a new virtual card
    Issue {
        /// Purpose: online-shopping, subscription, one-time
        #[arg(short, long)]
        purpose: String,

        /// Spending limit (e.g., "100" or "100.00")
        #[arg(short, long)]
        limit: String,

        /// Wallet the card draws on
        #[arg(short, long)]
        wallet: WalletId,
    },

    /// Record a purchase against a card
    Spend {
        /// Card ID
        id: CardId,

        /// Amount (e.g., "40.00")
        amount: String,
    },

    /// Change a card's spending limit
    Limit {
        /// Card ID
        id: CardId,

        /// New limit
        limit: String,
    },

    /// Freeze or unfreeze a card
    Freeze {
        /// Card ID
        id: CardId,
    },

    /// Delete a card permanently
    Delete {
        /// Card ID
        id: CardId,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// List all settings
    List,

    /// Show one setting
    Get {
        /// Setting name
        key: String,
    },

    /// Turn a setting on or off
    Set {
        /// Setting name
        key: String,

        /// on/off, true/false, yes/no
        value: String,
    },

    /// Restore the default settings
    Reset,
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "fiscus=debug" } else { "fiscus=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                Repository::init(&database_url(&self.database)).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Session { ref input } => {
                let service = self.build_service().await?;
                let reader: Box<dyn BufRead> = match input {
                    Some(path) => {
                        let file = std::fs::File::open(path)
                            .with_context(|| format!("Failed to open session file: {}", path))?;
                        Box::new(std::io::BufReader::new(file))
                    }
                    None => Box::new(std::io::stdin().lock()),
                };
                run_session(&service, reader).await?;
            }

            _ => {
                let service = self.build_service().await?;
                run_command(&service, self.command).await?;
            }
        }

        Ok(())
    }

    async fn build_service(&self) -> Result<WalletService> {
        let seed = match &self.seed {
            Some(path) => SeedData::from_path(path)?,
            None => SeedData::builtin()?,
        };
        let config = ServiceConfig::default().with_latency(Duration::from_millis(self.latency_ms));
        let repo = Repository::init(&database_url(&self.database)).await?;
        let service = WalletService::from_seed(seed, config)?.with_repository(repo);
        service.load_settings().await?;
        Ok(service)
    }
}

fn database_url(path: &str) -> String {
    format!("sqlite:{}?mode=rwc", path)
}

/// Execute each line of `reader` as a command. A failing line is reported and
/// the session carries on.
async fn run_session(service: &WalletService, reader: impl BufRead) -> Result<()> {
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read session input")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = split_args(line).and_then(|args| {
            SessionLine::try_parse_from(args).map_err(|e| anyhow::anyhow!(e.to_string()))
        });

        let result = match parsed {
            Ok(SessionLine {
                command: Commands::Init | Commands::Session { .. },
            }) => Err(anyhow::anyhow!("not available inside a session")),
            Ok(SessionLine { command }) => {
                println!("> {}", line);
                run_command(service, command).await
            }
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            eprintln!("line {}: {}", index + 1, err.to_string().trim_end());
        }
    }
    Ok(())
}

/// Split a script line on whitespace, keeping double-quoted text together.
fn split_args(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        anyhow::bail!("unterminated quote");
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

async fn run_command(service: &WalletService, command: Commands) -> Result<()> {
    match command {
        Commands::Init | Commands::Session { .. } => {
            anyhow::bail!("command must be run on its own")
        }

        Commands::Card(card_cmd) => run_card_command(service, card_cmd).await?,

        Commands::Transactions { limit } => {
            let transactions = service.list_transactions(limit).await;
            print_transactions(&transactions);
        }

        Commands::ShowTransaction { id } => {
            let tx = service.get_transaction(id).await?;
            println!("Transaction: {}", tx.id);
            println!("  Type:           {}", tx.transaction_type);
            println!("  Amount:         {}", format_cents(tx.amount));
            println!("  Customer:       {}", tx.customer);
            println!("  Payment method: {}", tx.payment_method);
            println!("  Status:         {}", tx.status);
            println!(
                "  Time:           {}",
                tx.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "  Refundable:     {}",
                if tx.refundable { "yes" } else { "no" }
            );
            if let Some(original) = tx.original_transaction_id {
                println!("  Refund of:      {}", original);
            }
            if let Some(reason) = &tx.reason {
                println!("  Reason:         {}", reason);
            }

            let refunds = service.refunds_for(id).await;
            if !refunds.is_empty() {
                println!();
                println!("  Refunds:");
                for refund in refunds {
                    println!(
                        "    {} {} ({})",
                        refund.id,
                        format_cents(refund.amount),
                        refund.reason.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Pay {
            amount,
            customer,
            method,
            pending,
        } => {
            let amount = parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let status = if pending {
                TransactionStatus::Pending
            } else {
                TransactionStatus::Completed
            };

            let tx = service
                .record_payment(&customer, &method, amount, status)
                .await?;
            println!(
                "Recorded payment {}: {} from {} via {} ({})",
                tx.id,
                format_cents(tx.amount),
                tx.customer,
                tx.payment_method,
                tx.status
            );
        }

        Commands::Refund { id, amount, reason } => {
            let amount = match amount {
                Some(a) => parse_cents(&a).context("Invalid amount format for refund")?,
                None => service.get_transaction(id).await?.amount.abs(),
            };

            let result = service.refund_transaction(id, amount, &reason).await?;
            println!(
                "Refunded {} of transaction {} ({})",
                format_cents(-result.refund.amount),
                result.original.id,
                format_cents(result.original.amount)
            );
            println!(
                "Created refund: {} {} for {}",
                result.refund.id,
                format_cents(result.refund.amount),
                result.refund.customer
            );
        }

        Commands::Metrics => {
            let metrics = service.business_metrics().await;
            println!("Revenue:        {}", format_cents(metrics.total_revenue));
            println!("Refunds:        {}", format_cents(metrics.total_refunds));
            println!("Net revenue:    {}", format_cents(metrics.net_revenue));
            println!(
                "Payments:       {} (avg {})",
                metrics.payment_count,
                format_cents(metrics.average_payment)
            );
            println!(
                "Refund rate:    {:.1}% ({} refunds)",
                metrics.refund_rate, metrics.refund_count
            );
            println!(
                "Pending:        {} ({})",
                metrics.pending_count,
                format_cents(metrics.pending_amount)
            );

            if !metrics.by_payment_method.is_empty() {
                println!();
                println!("{:<16} {:>6} {:>12} {:>8}", "METHOD", "COUNT", "TOTAL", "SHARE");
                println!("{}", "-".repeat(45));
                for method in &metrics.by_payment_method {
                    println!(
                        "{:<16} {:>6} {:>12} {:>7.1}%",
                        method.payment_method,
                        method.count,
                        format_cents(method.total),
                        method.percentage
                    );
                }
            }
        }

        Commands::Dashboard { recent } => {
            let report = service.dashboard(recent).await;
            let portfolio = &report.portfolio;

            println!("Dashboard ({})", report.generated_at.format("%Y-%m-%d %H:%M:%S"));
            println!();
            println!(
                "Cards:          {} ({} active, {} frozen)",
                portfolio.card_count, portfolio.active_count, portfolio.frozen_count
            );
            println!(
                "Card spend:     {} of {} ({:.1}%)",
                format_cents(portfolio.total_spent),
                format_cents(portfolio.total_limit),
                portfolio.utilization
            );
            println!(
                "Net revenue:    {} ({} refunded)",
                format_cents(report.metrics.net_revenue),
                format_cents(report.metrics.total_refunds)
            );
            println!();
            print_transactions(&report.recent_transactions);
        }

        Commands::Settings(settings_cmd) => run_settings_command(service, settings_cmd).await?,

        Commands::Export {
            export_type,
            output,
        } => run_export_command(service, &export_type, output.as_deref()).await?,
    }

    Ok(())
}

async fn run_card_command(service: &WalletService, cmd: CardCommands) -> Result<()> {
    match cmd {
        CardCommands::List { wallet } => {
            let cards = match wallet {
                Some(wallet_id) => service.list_cards_for_wallet(wallet_id).await,
                None => service.list_cards().await,
            };
            print_cards(&cards);
        }

        CardCommands::Show { id } => {
            let details = service.card_details(id).await?;
            let card = &details.card;

            println!("Card: {}", card.id);
            println!("  Number:     {}", card.card_number);
            println!("  Expires:    {}", card.expiry_date);
            println!("  Purpose:    {}", card.purpose);
            println!("  Wallet:     {}", card.wallet_id);
            println!("  Status:     {}", card_status(card));
            println!(
                "  Spent:      {} of {} ({:.1}%)",
                format_cents(card.current_spending),
                format_cents(card.spending_limit),
                details.progress
            );
            println!("  Remaining:  {}", format_cents(details.remaining));
            println!(
                "  Created:    {}",
                card.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(last) = card.last_used {
                println!("  Last used:  {}", last.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        CardCommands::Issue {
            purpose,
            limit,
            wallet,
        } => {
            let limit = parse_cents(&limit).context("Invalid limit format. Use '100.00' or '100'")?;
            let card = service.issue_card(&purpose, limit, wallet).await?;
            println!(
                "Issued card {}: {} ({}, limit {})",
                card.id,
                card.masked_number(),
                card.purpose,
                format_cents(card.spending_limit)
            );
        }

        CardCommands::Spend { id, amount } => {
            let amount = parse_cents(&amount).context("Invalid amount format. Use '40.00' or '40'")?;
            let card = service.record_spend(id, amount).await?;
            println!(
                "Charged {} to card {}: spent {} of {}, {} remaining",
                format_cents(amount),
                card.id,
                format_cents(card.current_spending),
                format_cents(card.spending_limit),
                format_cents(remaining_balance(&card))
            );
        }

        CardCommands::Limit { id, limit } => {
            let limit = parse_cents(&limit).context("Invalid limit format. Use '100.00' or '100'")?;
            let card = service.update_limit(id, limit).await?;
            println!(
                "Card {} limit set to {}",
                card.id,
                format_cents(card.spending_limit)
            );
        }

        CardCommands::Freeze { id } => {
            let card = service.toggle_freeze(id).await?;
            if card.is_frozen {
                println!("Froze card {}", card.id);
            } else {
                println!("Unfroze card {}", card.id);
            }
        }

        CardCommands::Delete { id } => {
            let card = service.delete_card(id).await?;
            println!("Deleted card {} ({})", card.id, card.masked_number());
        }
    }
    Ok(())
}

async fn run_settings_command(service: &WalletService, cmd: SettingsCommands) -> Result<()> {
    match cmd {
        SettingsCommands::List => {
            let settings = service.settings().await;
            println!("{:<24} {:<5}", "SETTING", "VALUE");
            println!("{}", "-".repeat(30));
            for (key, value) in settings.iter() {
                println!("{:<24} {:<5}", key, on_off(value));
            }
        }

        SettingsCommands::Get { key } => match service.settings().await.get(&key) {
            Some(value) => println!("{} = {}", key, on_off(value)),
            None => anyhow::bail!("Unknown setting: {}", key),
        },

        SettingsCommands::Set { key, value } => {
            let value = parse_switch(&value)?;
            service.update_setting(&key, value).await?;
            println!("{} = {}", key, on_off(value));
        }

        SettingsCommands::Reset => {
            service.reset_settings().await?;
            println!("Settings restored to defaults");
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &WalletService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "cards" => {
            let count = exporter.export_cards_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} cards", count);
            }
        }
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported session: {} cards, {} transactions, {} settings",
                    snapshot.virtual_cards.len(),
                    snapshot.business_transactions.len(),
                    snapshot.settings.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown export type '{}'. Valid types: cards, transactions, full",
                export_type
            );
        }
    }

    Ok(())
}

fn print_cards(cards: &[VirtualCard]) {
    if cards.is_empty() {
        println!("No virtual cards found.");
        return;
    }

    println!(
        "{:<5} {:<20} {:<16} {:>10} {:>10} {:>6} {:<8}",
        "ID", "NUMBER", "PURPOSE", "SPENT", "LIMIT", "USED", "STATUS"
    );
    println!("{}", "-".repeat(81));
    for card in cards {
        println!(
            "{:<5} {:<20} {:<16} {:>10} {:>10} {:>5.0}% {:<8}",
            card.id,
            card.masked_number(),
            card.purpose,
            format_cents(card.current_spending),
            format_cents(card.spending_limit),
            spending_progress(card),
            card_status(card)
        );
    }
}

fn print_transactions(transactions: &[BusinessTransaction]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:<6} {:<17} {:>10} {:<20} {:<14} {:<10}",
        "ID", "DATE", "AMOUNT", "CUSTOMER", "METHOD", "STATUS"
    );
    println!("{}", "-".repeat(82));
    for tx in transactions {
        let status = if tx.refunded {
            "refunded"
        } else {
            tx.status.as_str()
        };
        println!(
            "{:<6} {:<17} {:>10} {:<20} {:<14} {:<10}",
            tx.id,
            tx.timestamp.format("%Y-%m-%d %H:%M"),
            format_cents(tx.amount),
            truncate(&tx.customer, 20),
            truncate(&tx.payment_method, 14),
            status
        );
    }
}

fn card_status(card: &VirtualCard) -> &'static str {
    if card.is_frozen {
        "frozen"
    } else if card.is_active {
        "active"
    } else {
        "inactive"
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => anyhow::bail!("Invalid value '{}'. Use on/off", value),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
