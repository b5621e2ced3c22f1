//! warden: audit trail operator CLI
//!
//! Verifies closed audit logs, inspects the chain head of a file, appends
//! entries from scripts, and generates keys.
//!
//! Usage:
//!   warden verify audit/audit-2026-01-01.log
//!   warden verify-dir audit/
//!   warden status audit/audit-2026-01-02.log
//!   warden append --action ufw.reload --result success --actor root
//!   warden keygen

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use warden_audit::{
    continuity::open_daily, key::DEFAULT_KEY_ENV, load_key_from_env, scan_tail, verify_directory,
    verify_file, AuditConfig, AuditKey,
};
use warden_contracts::{error::AuditResult, record::AuditRecord};
use warden_core::Recorder;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tamper-evident audit trail tooling.
#[derive(Parser)]
#[command(
    name = "warden",
    about = "Write and verify hash-chained, HMAC-signed audit logs",
    long_about = "Operator tooling for the warden audit trail.\n\
                  Verification needs the same base64 key the writer used, read\n\
                  from the environment."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify every entry of one closed log file.
    Verify {
        file: PathBuf,
        /// Environment variable holding the base64 key.
        #[arg(long, default_value = DEFAULT_KEY_ENV)]
        key_env: String,
    },
    /// Verify every dated log in a directory and the links between them.
    VerifyDir {
        dir: PathBuf,
        #[arg(long, default_value = DEFAULT_KEY_ENV)]
        key_env: String,
    },
    /// Show where a file's chain ends, without checking signatures.
    Status { file: PathBuf },
    /// Append one entry to today's log.
    Append {
        #[arg(long)]
        action: String,
        #[arg(long)]
        result: String,
        #[arg(long)]
        command: Option<String>,
        #[arg(long)]
        error: Option<String>,
        /// Defaults to $USER.
        #[arg(long)]
        actor: Option<String>,
        /// Audit configuration file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a fresh base64 key.
    Keygen,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Verify { file, key_env } => run_verify(&file, &key_env),
        Command::VerifyDir { dir, key_env } => run_verify_dir(&dir, &key_env),
        Command::Status { file } => run_status(&file),
        Command::Append {
            action,
            result,
            command,
            error,
            actor,
            config,
        } => {
            let mut record = AuditRecord::new(action, result);
            record.command = command;
            record.error = error;
            let actor = actor
                .or_else(|| std::env::var("USER").ok())
                .unwrap_or_else(|| "unknown".to_string());
            run_append(record, actor, config)
        }
        Command::Keygen => {
            println!("{}", AuditKey::generate().to_base64());
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("warden: {}", e);
            ExitCode::from(2)
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_verify(file: &std::path::Path, key_env: &str) -> AuditResult<bool> {
    let key = load_key_from_env(key_env)?;
    let result = verify_file(file, key.as_bytes())?;
    if result.ok {
        println!(
            "OK  {}  entries={}  last_hash={}",
            file.display(),
            result.last_index,
            result.last_hash_hex
        );
    } else {
        println!(
            "FAIL  {}  line {}: {}",
            file.display(),
            result.failed_line,
            result.reason
        );
    }
    Ok(result.ok)
}

fn run_verify_dir(dir: &std::path::Path, key_env: &str) -> AuditResult<bool> {
    let key = load_key_from_env(key_env)?;
    let report = verify_directory(dir, &key)?;
    for file in &report.files {
        let r = &file.result;
        if r.ok {
            println!("OK    {}  entries={}", file.file_name, r.last_index);
        } else {
            println!("FAIL  {}  line {}: {}", file.file_name, r.failed_line, r.reason);
        }
    }
    if report.files.is_empty() {
        println!("no audit logs found in {}", dir.display());
    }
    Ok(report.ok)
}

fn run_status(file: &std::path::Path) -> AuditResult<bool> {
    let tail = scan_tail(file)?;
    println!("file:        {}", file.display());
    println!("created:     {} on {}", tail.header.created, tail.header.host);
    println!("version:     {}", tail.header.version);
    println!("entries:     {}", tail.entry_count());
    println!("next index:  {}", tail.next_index);
    println!("last hash:   {}", tail.last_hash_hex());
    if tail.header.has_predecessor() {
        println!("predecessor: {}", tail.header.prev_log_last_hash);
    } else {
        println!("predecessor: (none)");
    }
    Ok(true)
}

fn run_append(record: AuditRecord, actor: String, config: Option<PathBuf>) -> AuditResult<bool> {
    let config = match config {
        Some(path) => AuditConfig::from_file(&path)?,
        None => AuditConfig::default(),
    };
    let key = config.load_key()?;
    let log = Arc::new(open_daily(&config, key, Utc::now())?);

    let recorder = Recorder::new(log.clone(), actor, config.failure_policy);
    let appended = match recorder.record(record)? {
        Some(receipt) => {
            println!("appended entry {} ({})", receipt.index, receipt.hash);
            true
        }
        None => {
            println!("append failed; continuing under warn policy");
            false
        }
    };

    drop(recorder);
    if let Ok(log) = Arc::try_unwrap(log) {
        log.close()?;
    }
    Ok(appended)
}
