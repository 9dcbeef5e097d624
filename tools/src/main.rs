//! amlmon: headless runner and admin surface for the screening core.
//!
//! Usage:
//!   amlmon ingest    --db aml.db [--config data/screening.json] [--file txns.jsonl]
//!   amlmon exemption add --db aml.db --account ACC-1 --type temporary --days 30
//!   amlmon exemption remove --db aml.db --account ACC-1
//!   amlmon watchlist add --db aml.db --account ACC-1 --category sanctions --reason "..."
//!   amlmon watchlist remove --db aml.db --account ACC-1
//!   amlmon limit set --db aml.db --channel cash --period daily \
//!                    --single-cap 10000 --cumulative-cap 50000 --threshold 8000
//!   amlmon case list [--db aml.db] [--status suspicious]
//!   amlmon case status --db aml.db --case SC-20260826-1a2b3c4d --status reviewed
//!   amlmon stats     --db aml.db
//!
//! `ingest` reads one transaction JSON object per line (file or stdin)
//! and writes one outcome JSON object per line; the webhook endpoint
//! in front of this binary does exactly the same calls.

use amlmon_core::{
    config::ScreeningConfig,
    pipeline::Pipeline,
    reference::{Exemption, TransactionLimit, WatchlistEntry},
    store::ScreenStore,
    transaction::Transaction,
    types::{CaseStatus, Channel, ExemptionType, Period, WatchlistCategory},
};
use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        return Ok(());
    };

    let db = arg_value(&args, "--db").unwrap_or_else(|| "aml.db".to_string());
    let store = ScreenStore::open(&db)?;
    store.migrate()?;

    let config = match arg_value(&args, "--config") {
        Some(path) => ScreeningConfig::load(&path)?,
        None => ScreeningConfig::default_test(),
    };
    let pipeline = Pipeline::new(store, config);

    match command {
        "ingest" => cmd_ingest(&pipeline, &args),
        "exemption" => cmd_exemption(&pipeline, &args),
        "watchlist" => cmd_watchlist(&pipeline, &args),
        "limit" => cmd_limit(&pipeline, &args),
        "case" => cmd_case(&pipeline, &args),
        "stats" => cmd_stats(&pipeline),
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }
}

fn cmd_ingest(pipeline: &Pipeline, args: &[String]) -> Result<()> {
    let reader: Box<dyn BufRead> = match arg_value(args, "--file") {
        Some(path) => Box::new(BufReader::new(
            File::open(&path).with_context(|| format!("cannot open {path}"))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let mut stdout = io::stdout();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let tx: Transaction = match serde_json::from_str(&line) {
            Ok(tx) => tx,
            Err(e) => {
                let err = serde_json::json!({ "success": false, "error": e.to_string() });
                writeln!(stdout, "{err}")?;
                continue;
            }
        };
        match pipeline.process(&tx) {
            Ok(outcome) => {
                let mut value = serde_json::to_value(&outcome)?;
                value["success"] = serde_json::Value::Bool(true);
                writeln!(stdout, "{value}")?;
            }
            Err(e) => {
                log::error!("screening failed for txn {}: {e}", tx.transaction_id);
                let err = serde_json::json!({
                    "success": false,
                    "transaction_id": tx.transaction_id,
                    "error": e.to_string(),
                });
                writeln!(stdout, "{err}")?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn cmd_exemption(pipeline: &Pipeline, args: &[String]) -> Result<()> {
    let action = subaction(args)?;
    let account = require_arg(args, "--account")?;
    match action.as_str() {
        "add" => {
            let kind_raw = require_arg(args, "--type")?;
            let kind = ExemptionType::parse(&kind_raw)
                .with_context(|| format!("unknown exemption type: {kind_raw}"))?;
            let days: Option<i64> = arg_value(args, "--days").and_then(|d| d.parse().ok());
            let exemption = Exemption {
                account_number: account.clone(),
                exemption_type: kind,
                start_date: Utc::now(),
                end_date: days.map(|d| Utc::now() + Duration::days(d)),
                conditions: arg_value(args, "--conditions"),
                exempted_by: arg_value(args, "--by"),
                active: true,
            };
            pipeline.with_store(|s| s.insert_exemption(&exemption))?;
            println!("exemption added for {account} ({})", kind.as_str());
        }
        "remove" => {
            let removed = pipeline.with_store(|s| s.deactivate_exemption(&account))?;
            if removed {
                println!("exemption deactivated for {account}");
            } else {
                println!("no active exemption for {account}");
            }
        }
        other => bail!("unknown exemption action: {other}"),
    }
    Ok(())
}

fn cmd_watchlist(pipeline: &Pipeline, args: &[String]) -> Result<()> {
    let action = subaction(args)?;
    let account = require_arg(args, "--account")?;
    match action.as_str() {
        "add" => {
            let category_raw = require_arg(args, "--category")?;
            let category = WatchlistCategory::parse(&category_raw)
                .with_context(|| format!("unknown watchlist category: {category_raw}"))?;
            let entry = WatchlistEntry {
                account_number: account.clone(),
                category,
                reason: require_arg(args, "--reason")?,
                added_by: arg_value(args, "--by"),
                active: true,
                created_at: Utc::now(),
            };
            pipeline.with_store(|s| s.insert_watchlist_entry(&entry))?;
            println!("watchlist entry added for {account} ({})", category.as_str());
        }
        "remove" => {
            let removed = pipeline.with_store(|s| s.deactivate_watchlist_entry(&account))?;
            if removed {
                println!("watchlist entry deactivated for {account}");
            } else {
                println!("no active watchlist entry for {account}");
            }
        }
        other => bail!("unknown watchlist action: {other}"),
    }
    Ok(())
}

fn cmd_limit(pipeline: &Pipeline, args: &[String]) -> Result<()> {
    let action = subaction(args)?;
    if action != "set" {
        bail!("unknown limit action: {action}");
    }
    let channel_raw = require_arg(args, "--channel")?;
    let channel = Channel::parse(&channel_raw)
        .with_context(|| format!("unknown channel: {channel_raw}"))?;
    let period_raw = require_arg(args, "--period")?;
    let period =
        Period::parse(&period_raw).with_context(|| format!("unknown period: {period_raw}"))?;
    let limit = TransactionLimit {
        channel,
        period,
        single_cap: parse_required(args, "--single-cap")?,
        cumulative_cap: parse_required(args, "--cumulative-cap")?,
        alert_threshold: parse_required(args, "--threshold")?,
    };
    pipeline.with_store(|s| s.upsert_limit(&limit))?;
    println!(
        "limit set: {} {} single={:.2} cumulative={:.2} threshold={:.2}",
        channel.as_str(),
        period.as_str(),
        limit.single_cap,
        limit.cumulative_cap,
        limit.alert_threshold
    );
    Ok(())
}

fn cmd_case(pipeline: &Pipeline, args: &[String]) -> Result<()> {
    let action = subaction(args)?;
    match action.as_str() {
        "list" => {
            let status = match arg_value(args, "--status") {
                Some(raw) => Some(
                    CaseStatus::parse(&raw)
                        .with_context(|| format!("unknown case status: {raw}"))?,
                ),
                None => None,
            };
            let cases = pipeline.with_store(|s| s.list_cases(status))?;
            for case in &cases {
                println!(
                    "{} {} txn={} {:.2} {} status={} reason={}",
                    case.case_number,
                    case.account_number,
                    case.transaction_id,
                    case.amount,
                    case.currency,
                    case.status.as_str(),
                    case.primary_reason.as_str(),
                );
            }
            println!("{} case(s)", cases.len());
        }
        "status" => {
            let case_number = require_arg(args, "--case")?;
            let new_status = require_arg(args, "--status")?;
            let updated = pipeline.update_case_status(
                &case_number,
                &new_status,
                arg_value(args, "--reviewer").as_deref(),
                arg_value(args, "--note").as_deref(),
            )?;
            println!("{} -> {}", updated.case_number, updated.status.as_str());
        }
        other => bail!("unknown case action: {other}"),
    }
    Ok(())
}

fn cmd_stats(pipeline: &Pipeline) -> Result<()> {
    let screened = pipeline.with_store(|s| s.screened_count())?;
    let cases = pipeline.with_store(|s| s.case_count())?;
    let by_status = pipeline.with_store(|s| s.case_counts_by_status())?;
    let risk = pipeline.with_store(|s| s.risk_level_distribution())?;

    println!("=== SCREENING STATISTICS ===");
    println!("  transactions screened: {screened}");
    println!("  suspicious cases:      {cases}");
    println!("  by status:");
    for (status, count) in by_status {
        println!("    {:<14} {count}", status.as_str());
    }
    println!("  profiles by risk level:");
    for (level, count) in risk {
        println!("    {:<14} {count}", level.as_str());
    }
    Ok(())
}

// ── Arg helpers ──────────────────────────────────────────────────────

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn require_arg(args: &[String], flag: &str) -> Result<String> {
    arg_value(args, flag).with_context(|| format!("missing required argument {flag}"))
}

fn parse_required<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<T> {
    let raw = require_arg(args, flag)?;
    raw.parse()
        .map_err(|_| anyhow::anyhow!("cannot parse {flag} value: {raw}"))
}

fn subaction(args: &[String]) -> Result<String> {
    args.get(2)
        .filter(|a| !a.starts_with("--"))
        .cloned()
        .context("missing action (add/remove/set/list/status)")
}

fn print_usage() {
    println!("amlmon: transaction screening runner");
    println!();
    println!("commands:");
    println!("  ingest     screen transaction JSON lines (stdin or --file)");
    println!("  exemption  add/remove account exemptions");
    println!("  watchlist  add/remove watchlist entries");
    println!("  limit      set per-channel, per-period limits");
    println!("  case       list cases, apply status transitions");
    println!("  stats      screening statistics summary");
}
