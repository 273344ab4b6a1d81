//! Reconciliation CLI for the asset mirror
//!
//! Compares a local directory tree against the remote object listing under
//! a key prefix, and writes two plain-text reports: keys missing remotely
//! (consumed by `upload-assets --from-report`) and keys whose remote copy
//! only matches case-insensitively.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use gameportal::reconcile::{
    classify, is_excluded, relative_key, top_level_breakdown, walk_files,
};
use gameportal::remote::{RemoteStore, DEFAULT_BUCKET, DEFAULT_ENDPOINT};

/// Diff a local asset tree against the remote object listing
#[derive(Parser)]
#[command(name = "compare-remote")]
struct Args {
    /// Local directory tree to compare (its files map to keys under --prefix)
    local_root: PathBuf,

    /// Remote key prefix the local tree mirrors
    #[arg(long, default_value = "games/bloodmoney/")]
    prefix: String,

    /// S3-compatible endpoint
    #[arg(long, env = "R2_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Bucket holding the mirrored assets
    #[arg(long, env = "R2_BUCKET", default_value = DEFAULT_BUCKET)]
    bucket: String,

    /// Directory the reports are written to
    #[arg(long, default_value = "reports")]
    report_dir: PathBuf,

    /// Basename for the report files
    #[arg(long, default_value = "assets")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("gameportal=info")
        .init();

    let args = Args::parse();

    if !args.local_root.is_dir() {
        bail!("Local path not found: {}", args.local_root.display());
    }

    // Walk the local tree into prefixed keys, skipping non-mirrored files
    let files = walk_files(&args.local_root)
        .with_context(|| format!("walking {}", args.local_root.display()))?;
    let mut local_keys = Vec::new();
    for file in &files {
        let Some(relative) = relative_key(&args.local_root, file) else {
            continue;
        };
        if is_excluded(&relative) {
            continue;
        }
        local_keys.push(format!("{}{}", args.prefix, relative));
    }
    println!("Local files considered: {}", local_keys.len());

    let store = RemoteStore::new(&args.endpoint, args.bucket.clone())?;
    let remote_keys = store.list_keys(&args.prefix).await?;
    println!("Remote objects under {}: {}", args.prefix, remote_keys.len());

    let report = classify(&local_keys, &remote_keys);

    fs::create_dir_all(&args.report_dir)
        .with_context(|| format!("creating {}", args.report_dir.display()))?;
    let missing_path = args.report_dir.join(format!("{}-missing.txt", args.name));
    let case_path = args
        .report_dir
        .join(format!("{}-case-mismatch.txt", args.name));

    let mut missing_body = report.missing.join("\n");
    if !missing_body.is_empty() {
        missing_body.push('\n');
    }
    fs::write(&missing_path, missing_body)?;

    let mut case_body = report
        .case_mismatches
        .iter()
        .map(|m| format!("{}  ->  {}", m.expected, m.actual))
        .collect::<Vec<_>>()
        .join("\n");
    if !case_body.is_empty() {
        case_body.push('\n');
    }
    fs::write(&case_path, case_body)?;

    println!("Missing remotely: {}", report.missing.len());
    println!("Case mismatches: {}", report.case_mismatches.len());

    let breakdown = top_level_breakdown(&report.missing, &args.prefix);
    if !breakdown.is_empty() {
        println!("Missing breakdown (top-level):");
        for (top, count) in breakdown {
            println!("- {}: {}", top, count);
        }
    }

    println!("Wrote: {}", missing_path.display());
    println!("Wrote: {}", case_path.display());

    Ok(())
}
