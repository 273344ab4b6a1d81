//! Bulk uploader mirroring local game assets to object storage
//!
//! Two input modes: scan a directory for media files (optionally filtered
//! to images or audio), or consume the missing-keys report produced by
//! `compare-remote`. Uploads run on a fixed worker pool; a failed object is
//! reported and skipped so the rest of the batch still completes, and the
//! process exits non-zero when anything failed.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gameportal::media::{cache_control_for, content_type_for, is_audio, is_image};
use gameportal::reconcile::{relative_key, walk_files};
use gameportal::remote::{RemoteStore, DEFAULT_BUCKET, DEFAULT_ENDPOINT};
use gameportal::resolver::DEFAULT_REMOTE_ORIGIN;

/// Which media files a directory scan picks up
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
enum Kind {
    All,
    Image,
    Audio,
}

/// Mirror local assets to the remote object store
#[derive(Parser)]
#[command(name = "upload-assets")]
struct Args {
    /// Local asset root; keys are relative to this directory
    #[arg(long, env = "GAMES_LOCAL_ROOT", default_value = "public")]
    root: PathBuf,

    /// Scan only this subdirectory under the root (e.g. "games/fishjoy")
    #[arg(long)]
    dir: Option<String>,

    /// Filter what a directory scan uploads
    #[arg(long, value_enum, default_value = "all")]
    kind: Kind,

    /// Upload exactly the keys listed in a missing-keys report instead of scanning
    #[arg(long)]
    from_report: Option<PathBuf>,

    /// Prefix placed in front of scanned keys, or stripped from report keys
    /// to find the local file
    #[arg(long)]
    key_prefix: Option<String>,

    /// Compute scanned keys relative to this subdirectory instead of the root
    #[arg(long)]
    strip: Option<String>,

    /// Parallel uploads
    #[arg(short = 'c', long, default_value_t = 8)]
    concurrency: usize,

    /// Cache-Control header override (default derives from the key)
    #[arg(long, env = "R2_CACHE_CONTROL")]
    cache_control: Option<String>,

    /// Max attempts per object
    #[arg(long, env = "R2_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: u32,

    /// S3-compatible endpoint
    #[arg(long, env = "R2_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Bucket receiving the assets
    #[arg(long, env = "R2_BUCKET", default_value = DEFAULT_BUCKET)]
    bucket: String,

    /// Public domain the mirrored assets are served from (for the map file)
    #[arg(long, env = "R2_ASSET_DOMAIN", default_value = DEFAULT_REMOTE_ORIGIN)]
    asset_domain: String,

    /// List what would be uploaded without uploading
    #[arg(long)]
    dry_run: bool,

    /// Write a local -> remote mapping JSON to this path
    #[arg(long)]
    map: Option<PathBuf>,
}

/// One queued upload
struct Job {
    file: PathBuf,
    key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("gameportal=info")
        .init();

    let args = Args::parse();

    if args.concurrency == 0 {
        bail!("--concurrency must be a positive number");
    }
    if args.max_attempts == 0 {
        bail!("--max-attempts must be a positive number");
    }

    let key_prefix = args
        .key_prefix
        .as_deref()
        .map(normalize_key_prefix)
        .filter(|prefix| !prefix.is_empty());

    let jobs = match &args.from_report {
        Some(report) => jobs_from_report(&args, report, key_prefix.as_deref())?,
        None => jobs_from_scan(&args, key_prefix.as_deref())?,
    };

    if jobs.is_empty() {
        println!("Nothing to upload.");
        return Ok(());
    }

    // Credentials are only needed for a real upload run
    let store = if args.dry_run {
        None
    } else {
        Some(RemoteStore::new(&args.endpoint, args.bucket.clone())?)
    };

    println!(
        "{} {} file(s) to {}...",
        if args.dry_run { "Scanning" } else { "Uploading" },
        jobs.len(),
        args.bucket
    );

    let jobs = Arc::new(jobs);
    let next = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let mapping = Arc::new(Mutex::new(Vec::new()));

    // Fixed worker pool pulling from a shared queue index
    let mut workers = Vec::new();
    for _ in 0..args.concurrency {
        let jobs = Arc::clone(&jobs);
        let next = Arc::clone(&next);
        let failed = Arc::clone(&failed);
        let mapping = Arc::clone(&mapping);
        let store = store.clone();
        let asset_domain = args.asset_domain.clone();
        let cache_override = args.cache_control.clone();
        let max_attempts = args.max_attempts;

        workers.push(tokio::spawn(async move {
            loop {
                let current = next.fetch_add(1, Ordering::SeqCst);
                if current >= jobs.len() {
                    break;
                }
                let job = &jobs[current];

                match &store {
                    None => println!("Would upload {}", job.key),
                    Some(store) => {
                        let cache_control = cache_override
                            .as_deref()
                            .unwrap_or_else(|| cache_control_for(&job.key));
                        let result = store
                            .upload_file(
                                &job.file,
                                &job.key,
                                content_type_for(&job.key),
                                cache_control,
                                max_attempts,
                            )
                            .await;
                        match result {
                            Ok(()) => println!("Uploaded {}", job.key),
                            Err(err) => {
                                eprintln!("Failed {}: {}", job.key, err);
                                failed.fetch_add(1, Ordering::SeqCst);
                                continue;
                            }
                        }
                    }
                }

                mapping.lock().unwrap().push(json!({
                    "local": job.file.display().to_string(),
                    "key": job.key,
                    "remote": format!("{}/{}", asset_domain, job.key),
                }));
            }
        }));
    }

    for worker in workers {
        worker.await.context("upload worker panicked")?;
    }

    if let Some(map_path) = &args.map {
        let entries = mapping.lock().unwrap();
        fs::write(map_path, serde_json::to_string_pretty(&*entries)?)
            .with_context(|| format!("writing {}", map_path.display()))?;
        println!("Wrote mapping to {}", map_path.display());
    }

    let failed = failed.load(Ordering::SeqCst);
    let uploaded = jobs.len() - failed;
    println!("Done. Uploaded OK={}, failed={}", uploaded, failed);
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Builds the queue from a compare-remote missing-keys report
fn jobs_from_report(
    args: &Args,
    report: &PathBuf,
    key_prefix: Option<&str>,
) -> Result<Vec<Job>> {
    let raw = fs::read_to_string(report)
        .with_context(|| format!("Report not found: {}", report.display()))?;

    let mut jobs = Vec::new();
    for line in raw.lines() {
        let key = line.trim();
        if key.is_empty() {
            continue;
        }
        // The report lists bucket keys; the local file lives under the root,
        // minus the prefix when one was used to build the keys
        let relative = match key_prefix {
            Some(prefix) => key
                .strip_prefix(prefix)
                .map(|rest| rest.trim_start_matches('/'))
                .unwrap_or(key),
            None => key,
        };
        let file = args.root.join(relative);
        if !file.is_file() {
            bail!("Local file for key {} not found: {}", key, file.display());
        }
        jobs.push(Job {
            file,
            key: key.to_string(),
        });
    }
    Ok(jobs)
}

/// Builds the queue by scanning the local tree for media files
fn jobs_from_scan(args: &Args, key_prefix: Option<&str>) -> Result<Vec<Job>> {
    let scan_root = match &args.dir {
        Some(dir) => {
            if escapes_root(dir) {
                bail!("--dir must be under the root");
            }
            args.root.join(dir)
        }
        None => args.root.clone(),
    };
    if !scan_root.is_dir() {
        bail!("Scan root not found: {}", scan_root.display());
    }

    let strip_root = match &args.strip {
        Some(strip) => {
            if escapes_root(strip) {
                bail!("--strip must be under the root");
            }
            Some(args.root.join(strip))
        }
        None => None,
    };

    let files = walk_files(&scan_root)
        .with_context(|| format!("walking {}", scan_root.display()))?;

    let mut jobs = Vec::new();
    for file in files {
        let name = file.to_string_lossy();
        let wanted = match args.kind {
            Kind::All => is_image(&name) || is_audio(&name),
            Kind::Image => is_image(&name),
            Kind::Audio => is_audio(&name),
        };
        if !wanted {
            continue;
        }

        let base = strip_root.as_deref().unwrap_or(args.root.as_path());
        let Some(relative) = relative_key(base, &file) else {
            bail!("File is outside the key root: {}", file.display());
        };
        let key = match key_prefix {
            Some(prefix) => format!("{}/{}", prefix, relative),
            None => relative,
        };
        jobs.push(Job { file, key });
    }
    Ok(jobs)
}

/// Trims slashes so a prefix composes cleanly into "{prefix}/{rest}"
fn normalize_key_prefix(prefix: &str) -> String {
    prefix.trim().trim_matches('/').to_string()
}

/// True when a user-supplied subdirectory could climb out of the root
fn escapes_root(subdir: &str) -> bool {
    std::path::Path::new(subdir)
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir))
}
