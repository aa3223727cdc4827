//! Command-line interface
//!
//! Subcommands mirror the object lifecycle: `set` and `delete` for single
//! objects, `load` for bulk YAML files, `get` for listing, and
//! `commit`/`status`/`wait` for the commit job lifecycle.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::device::{DeviceApi, JobState, RestDeviceApi};
use crate::models::{Address, AddressGroup, ConfigObject, ObjectKind, ObjectsFile};
use crate::sync::{BatchReport, CommitJob, SyncEngine, WaitOptions};

/// fwsync - concurrent configuration sync for firewall management planes
#[derive(Debug, Parser)]
#[command(name = "fwsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "FWSYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Device group to operate on ("shared" for the global root)
    #[arg(long, short = 'g', default_value = "shared", global = true)]
    device_group: String,

    /// Skip all mutating remote calls, reporting what would have happened
    #[arg(long, global = true)]
    dry_run: bool,

    /// Number of concurrent workers for bulk operations
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or update a single object
    #[command(subcommand)]
    Set(SetCommand),

    /// Delete a single object
    #[command(subcommand)]
    Delete(DeleteCommand),

    /// Bulk-load objects from a YAML file
    Load(LoadArgs),

    /// List objects under a scope
    #[command(subcommand)]
    Get(GetCommand),

    /// Commit pending configuration changes
    Commit(CommitArgs),

    /// Check the status of a commit job
    Status {
        /// Job id to query
        job_id: String,
    },

    /// Wait for a commit job to reach a terminal state
    Wait {
        /// Job id to wait for
        job_id: String,

        /// Seconds between status polls (default: configured poll interval)
        #[arg(long)]
        poll_interval_secs: Option<u64>,

        /// Wall-clock budget in seconds (default: configured job timeout)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
enum SetCommand {
    /// Create or update an address object
    Address(AddressArgs),

    /// Create or update an address group
    Group(GroupArgs),
}

#[derive(Debug, Args)]
struct AddressArgs {
    /// Name of the address object
    name: String,

    /// IP address or network in CIDR notation
    #[arg(long)]
    ip_netmask: Option<String>,

    /// Fully qualified domain name
    #[arg(long)]
    fqdn: Option<String>,

    /// IP range (e.g. 192.0.2.1-192.0.2.10)
    #[arg(long)]
    ip_range: Option<String>,

    /// Description of the address object
    #[arg(long)]
    description: Option<String>,

    /// Tags to apply (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Debug, Args)]
struct GroupArgs {
    /// Name of the address group
    name: String,

    /// Static member names (repeatable; for static groups)
    #[arg(long = "member")]
    members: Vec<String>,

    /// Filter expression (for dynamic groups)
    #[arg(long)]
    dynamic_filter: Option<String>,

    /// Description of the address group
    #[arg(long)]
    description: Option<String>,

    /// Tags to apply (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum DeleteCommand {
    /// Delete an address object
    Address {
        /// Name of the address object
        name: String,
    },

    /// Delete an address group
    Group {
        /// Name of the address group
        name: String,
    },
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Path to a YAML file with addresses and address groups
    file: PathBuf,

    /// Commit changes after loading
    #[arg(long)]
    commit: bool,

    /// Wait for the commit job to finish (implies --commit)
    #[arg(long)]
    wait: bool,

    /// Wall-clock budget for --wait, in seconds (default: configured job timeout)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum GetCommand {
    /// List address objects
    Addresses,

    /// List address groups
    Groups,
}

#[derive(Debug, Args)]
struct CommitArgs {
    /// Wait for the commit job to finish
    #[arg(long)]
    wait: bool,

    /// Wall-clock budget for --wait, in seconds (default: configured job timeout)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

/// Parse arguments, initialize logging and run the selected command
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if cli.dry_run {
        config.engine.dry_run = true;
    }
    if let Some(workers) = cli.workers {
        config.engine.pool_size = workers;
    }

    init_tracing(&config, cli.verbose);
    config.validate().context("Invalid configuration")?;

    let api = RestDeviceApi::new(&config.device).context("Failed to build device client")?;
    let engine = SyncEngine::new(api, config.engine.clone());

    info!(
        scope = %cli.device_group,
        dry_run = config.engine.dry_run,
        workers = config.engine.pool_size,
        "fwsync starting"
    );

    match cli.command {
        Command::Set(set) => run_set(&engine, set, &cli.device_group).await,
        Command::Delete(delete) => run_delete(&engine, delete, &cli.device_group).await,
        Command::Load(args) => run_load(&engine, args, &cli.device_group).await,
        Command::Get(get) => run_get(&engine, get, &cli.device_group).await,
        Command::Commit(args) => run_commit(&engine, args).await,
        Command::Status { job_id } => run_status(&engine, &job_id).await,
        Command::Wait {
            job_id,
            poll_interval_secs,
            timeout_secs,
        } => {
            let mut options = engine.wait_options();
            if let Some(interval) = poll_interval_secs {
                options.poll_interval_secs = interval;
            }
            if let Some(timeout) = timeout_secs {
                options.timeout_secs = timeout;
            }
            run_wait(&engine, &job_id, options).await
        }
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_set<D: DeviceApi + 'static>(
    engine: &SyncEngine<D>,
    command: SetCommand,
    scope: &str,
) -> anyhow::Result<()> {
    let object: ConfigObject = match command {
        SetCommand::Address(args) => {
            let mut address = Address::new(args.name);
            address.ip_netmask = args.ip_netmask;
            address.fqdn = args.fqdn;
            address.ip_range = args.ip_range;
            address.description = args.description;
            address.tags = args.tags;
            address.into()
        }
        SetCommand::Group(args) => {
            let mut group = AddressGroup::new(args.name);
            group.static_members = if args.members.is_empty() {
                None
            } else {
                Some(args.members)
            };
            group.dynamic_filter = args.dynamic_filter;
            group.description = args.description;
            group.tags = args.tags;
            group.into()
        }
    };
    object.validate()?;

    println!("Updating {} '{}' in {}...", object.kind(), object.name(), scope);
    let pending = engine.update_objects(vec![object], scope);
    let report = SyncEngine::<D>::join_all(pending).await;
    print_report(&report)
}

async fn run_delete<D: DeviceApi + 'static>(
    engine: &SyncEngine<D>,
    command: DeleteCommand,
    scope: &str,
) -> anyhow::Result<()> {
    let object: ConfigObject = match command {
        DeleteCommand::Address { name } => Address::new(name).into(),
        DeleteCommand::Group { name } => AddressGroup::new(name).into(),
    };

    println!("Deleting {} '{}' from {}...", object.kind(), object.name(), scope);
    let pending = engine.delete_objects(vec![object], scope);
    let report = SyncEngine::<D>::join_all(pending).await;
    print_report(&report)
}

async fn run_load<D: DeviceApi + 'static>(
    engine: &SyncEngine<D>,
    args: LoadArgs,
    scope: &str,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let file = ObjectsFile::from_yaml(&content)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    if file.is_empty() {
        println!("Nothing to load: no addresses or address groups in file");
        return Ok(());
    }
    file.validate()?;

    let objects: Vec<ConfigObject> = file
        .addresses
        .into_iter()
        .map(ConfigObject::from)
        .chain(file.address_groups.into_iter().map(ConfigObject::from))
        .collect();

    println!("Loading {} objects into {}...", objects.len(), scope);
    let pending = engine.create_objects(objects, scope);
    let report = SyncEngine::<D>::join_all(pending).await;
    print_report(&report)?;

    if args.commit || args.wait {
        let job = engine.commit().await?;
        println!("Commit job id: {}", job.id);

        if args.wait {
            let mut options = engine.wait_options();
            if let Some(timeout) = args.timeout_secs {
                options.timeout_secs = timeout;
            }
            run_wait(engine, &job.id, options).await?;
        }
    }

    Ok(())
}

async fn run_get<D: DeviceApi + 'static>(
    engine: &SyncEngine<D>,
    command: GetCommand,
    scope: &str,
) -> anyhow::Result<()> {
    let kind = match command {
        GetCommand::Addresses => ObjectKind::Address,
        GetCommand::Groups => ObjectKind::AddressGroup,
    };

    let objects = engine.fetch_all(kind, scope).await?;
    if objects.is_empty() {
        println!("No {} objects found in {}", kind, scope);
        return Ok(());
    }

    println!("Found {} {} objects in {}:", objects.len(), kind, scope);
    for object in &objects {
        println!("  - {}", describe(object));
    }
    Ok(())
}

async fn run_commit<D: DeviceApi + 'static>(
    engine: &SyncEngine<D>,
    args: CommitArgs,
) -> anyhow::Result<()> {
    println!("Committing changes...");
    let job = engine.commit().await?;
    println!("Commit job id: {}", job.id);

    if args.wait {
        let mut options = engine.wait_options();
        if let Some(timeout) = args.timeout_secs {
            options.timeout_secs = timeout;
        }
        run_wait(engine, &job.id, options).await?;
    }
    Ok(())
}

async fn run_status<D: DeviceApi + 'static>(
    engine: &SyncEngine<D>,
    job_id: &str,
) -> anyhow::Result<()> {
    let job = engine.poll_status(job_id).await?;
    print_job(&job);
    if job.state == JobState::Failed {
        anyhow::bail!(
            "Job {} failed: {}",
            job.id,
            job.detail.as_deref().unwrap_or("no detail")
        );
    }
    Ok(())
}

async fn run_wait<D: DeviceApi + 'static>(
    engine: &SyncEngine<D>,
    job_id: &str,
    options: WaitOptions,
) -> anyhow::Result<()> {
    println!("Waiting for job {}...", job_id);
    let job = engine
        .wait_for_job_with(job_id, options, |snapshot| {
            if !snapshot.is_terminal() {
                println!("  job {}: {} ({}%)", snapshot.id, snapshot.state, snapshot.progress);
            }
        })
        .await?;

    print_job(&job);
    if job.state == JobState::Failed {
        anyhow::bail!(
            "Job {} failed: {}",
            job.id,
            job.detail.as_deref().unwrap_or("no detail")
        );
    }
    Ok(())
}

fn print_job(job: &CommitJob) {
    match job.state {
        JobState::Succeeded => println!("Job {} succeeded", job.id),
        JobState::Failed => println!(
            "Job {} failed: {}",
            job.id,
            job.detail.as_deref().unwrap_or("no detail")
        ),
        state => println!("Job {} {} ({}%)", job.id, state, job.progress),
    }
}

fn print_report(report: &BatchReport) -> anyhow::Result<()> {
    if report.is_empty() {
        println!("No operations submitted");
        return Ok(());
    }

    for outcome in report.failures() {
        let error = outcome
            .result
            .as_ref()
            .err()
            .map(ToString::to_string)
            .unwrap_or_default();
        eprintln!("  {} failed: {}", outcome.object_name, error);
    }
    println!("{} succeeded, {} failed", report.succeeded(), report.failed());

    if report.failed() > 0 {
        anyhow::bail!(
            "{} of {} operations failed",
            report.failed(),
            report.len()
        );
    }
    Ok(())
}

fn describe(object: &ConfigObject) -> String {
    match object {
        ConfigObject::Address(addr) => match addr.value() {
            Some((kind, value)) => format!("{} ({}: {})", addr.name, kind, value),
            None => addr.name.clone(),
        },
        ConfigObject::Group(group) => {
            if let Some(members) = &group.static_members {
                format!("{} (static: {})", group.name, members.join(", "))
            } else if let Some(filter) = &group.dynamic_filter {
                format!("{} (dynamic: {})", group.name, filter)
            } else {
                group.name.clone()
            }
        }
    }
}
