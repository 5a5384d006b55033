//! Job intake CLI
//!
//! Entry point for the `job-intake` command-line tool.

use clap::{Parser, Subcommand};
use job_intake::collaborators::PrefixPermissions;
use job_intake::mock::StaticCatalog;
use job_intake::resources::{parse_memory, RunTime};
use job_intake::selection::select_queue;
use job_intake::{
    ErrorCode, ErrorPayload, ExecutionSystem, IntakeConfig, JobStatus, Software, SubmissionPipeline,
};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "job-intake")]
#[command(about = "Validate job requests and select batch queues", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a job request and print the normalized submission
    Submit {
        /// Software definition (JSON)
        #[arg(long)]
        app: PathBuf,

        /// Execution system with its batch queues (TOML)
        #[arg(long)]
        system: PathBuf,

        /// Job request (JSON)
        #[arg(long)]
        request: PathBuf,

        /// Requesting user
        #[arg(long)]
        owner: String,

        #[arg(long)]
        internal_username: Option<String>,

        /// Host intake config (TOML)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// URI prefixes the owner may read (repeatable)
        #[arg(long = "allow")]
        allow: Vec<String>,

        /// Reject relative input paths
        #[arg(long)]
        deny_relative: bool,

        /// Override the serialized list delimiter
        #[arg(long)]
        serialized_delimiter: Option<String>,
    },

    /// Print the first queue that fits the given resources
    SelectQueue {
        /// Execution system with its batch queues (TOML)
        #[arg(long)]
        system: PathBuf,

        /// Node count, or -1
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        nodes: i64,

        /// Memory per node, e.g. 4GB
        #[arg(long)]
        memory: Option<String>,

        /// Run time, HH:MM:SS
        #[arg(long)]
        time: Option<String>,
    },

    /// List job statuses
    Statuses {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("job_intake=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            app,
            system,
            request,
            owner,
            internal_username,
            config,
            allow,
            deny_relative,
            serialized_delimiter,
        } => {
            let overrides = serialized_delimiter
                .map(|d| json!({ "fields": { "serialized_list_delimiter": d } }));
            let permissions = PrefixPermissions::new(allow).deny_relative(deny_relative);
            run_submit(SubmitArgs {
                app,
                system,
                request,
                owner,
                internal_username,
                config,
                overrides,
                permissions,
            });
        }
        Commands::SelectQueue {
            system,
            nodes,
            memory,
            time,
        } => {
            run_select_queue(system, nodes, memory, time);
        }
        Commands::Statuses { json } => {
            run_statuses(json);
        }
    }
}

struct SubmitArgs {
    app: PathBuf,
    system: PathBuf,
    request: PathBuf,
    owner: String,
    internal_username: Option<String>,
    config: Option<PathBuf>,
    overrides: Option<Value>,
    permissions: PrefixPermissions,
}

fn run_submit(args: SubmitArgs) {
    let config = match IntakeConfig::build(args.config.as_deref(), args.overrides) {
        Ok(c) => c,
        Err(e) => fail(&format!("Error loading config: {}", e)),
    };

    let software = match Software::from_file(&args.app) {
        Ok(s) => s,
        Err(e) => fail(&format!("Error loading software definition: {}", e)),
    };

    let system = match ExecutionSystem::from_file(&args.system) {
        Ok(s) => s,
        Err(e) => fail(&format!("Error loading execution system: {}", e)),
    };

    let request = match load_request(&args.request) {
        Ok(r) => r,
        Err(payload) => exit_with_payload(&payload),
    };

    let catalog = StaticCatalog::new([software]);
    let pipeline = SubmissionPipeline::new(&config, &catalog, &args.permissions);

    match pipeline.submit(
        &system,
        &args.owner,
        args.internal_username.as_deref(),
        &request,
    ) {
        Ok(submission) => match serde_json::to_string_pretty(&submission) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&format!("Error serializing output: {}", e)),
        },
        Err(e) => exit_with_payload(&e.to_payload()),
    }
}

fn load_request(path: &PathBuf) -> Result<Map<String, Value>, ErrorPayload> {
    let content = fs::read_to_string(path).map_err(|e| {
        ErrorPayload::new(
            ErrorCode::ProcessingFailed,
            format!("Unable to read {}: {}", path.display(), e),
        )
    })?;

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ErrorPayload::new(
            ErrorCode::InvalidRequest,
            "Job request must be a JSON object",
        )),
        Err(e) => Err(ErrorPayload::new(
            ErrorCode::InvalidRequest,
            format!("Invalid JSON in job request: {}", e),
        )),
    }
}

fn run_select_queue(system_path: PathBuf, nodes: i64, memory: Option<String>, time: Option<String>) {
    let system = match ExecutionSystem::from_file(&system_path) {
        Ok(s) => s,
        Err(e) => fail(&format!("Error loading execution system: {}", e)),
    };

    let memory = match memory.as_deref().map(parse_memory) {
        None => None,
        Some(Some(m)) => Some(m),
        Some(None) => {
            eprintln!("Invalid memory value");
            process::exit(1);
        }
    };

    let time = match time.as_deref().map(str::parse::<RunTime>) {
        None => None,
        Some(Ok(t)) => Some(t),
        Some(Err(e)) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    match select_queue(&system, nodes, memory, time) {
        Some(queue) => println!("{}", queue.name),
        None => {
            eprintln!("No queue on {} fits the requested resources", system.id);
            process::exit(1);
        }
    }
}

fn run_statuses(json_output: bool) {
    if json_output {
        let statuses: Vec<Value> = JobStatus::ALL
            .iter()
            .map(|s| {
                json!({
                    "status": s.name(),
                    "description": s.description(),
                    "running": s.is_running(),
                })
            })
            .collect();
        match serde_json::to_string_pretty(&statuses) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&format!("Error serializing output: {}", e)),
        }
        return;
    }

    for status in JobStatus::ALL.iter() {
        let marker = if status.is_running() { "*" } else { " " };
        println!("{} {:<20} {}", marker, status.name(), status.description());
    }
}

fn exit_with_payload(payload: &ErrorPayload) -> ! {
    match serde_json::to_string_pretty(payload) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", payload),
    }
    if payload.code.is_client_error() {
        process::exit(1);
    }
    process::exit(2);
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(2);
}
