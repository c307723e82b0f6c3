use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::mysql::MySqlPoolOptions;

mod checker;
mod config;
mod delay;
mod error;
mod export;
mod models;
mod progress;
mod routes;
mod services;
mod usernames;

use checker::{describe_session, prepare, Checker, CheckerEvent, LoadedFile, RunOutcome, Start};
use config::Config;
use delay::DelayRange;
use error::{CheckerError, SessionStoreError};
use models::check_result::CheckResult;
use models::job::JobStatus;
use routes::jobs::job_models::CreateJobRequest;
use services::job_client::{watch_job, HttpJobRunner};
use services::job_registry::JobRegistry;
use services::profile_lookup::MockProfileApi;
use services::session_store::{FileSessionStore, MySqlSessionStore, SessionStore};

/// Finds the most recent post date for a list of profiles.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the job runner HTTP server.
    Serve {
        /// Overrides BIND_ADDRESS.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Check usernames in this process, resuming an interrupted session.
    Check(CheckArgs),
    /// Submit usernames to a running server and poll until the job ends.
    Watch(WatchArgs),
}

#[derive(Args)]
struct DelayArgs {
    /// Minimum pause between lookups, in seconds.
    #[arg(long)]
    min_delay: Option<u64>,
    /// Maximum pause between lookups, in seconds.
    #[arg(long)]
    max_delay: Option<u64>,
    /// Where to write the CSV export. Defaults to results_<date>.csv.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Text or CSV file with one username per line. Optional when resuming.
    file: Option<PathBuf>,
    /// Start over instead of resuming a stored session.
    #[arg(long)]
    no_resume: bool,
    #[command(flatten)]
    delays: DelayArgs,
}

#[derive(Args)]
struct WatchArgs {
    /// Text or CSV file with one username per line.
    file: PathBuf,
    /// Base URL of the job runner.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,
    #[command(flatten)]
    delays: DelayArgs,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let result = match cli.command {
        Command::Serve { bind } => return serve(config, bind).await,
        Command::Check(args) => check(&config, args).await,
        Command::Watch(args) => watch(&config, args).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn mock_api(config: &Config) -> MockProfileApi {
    MockProfileApi::new(config.mock_latency_ms.clone(), config.mock_random_failures)
}

async fn serve(config: Config, bind: Option<String>) -> std::io::Result<()> {
    let server_address = bind.unwrap_or_else(|| config.bind_address.clone());
    let jobs = web::Data::new(JobRegistry::new(mock_api(&config)));
    let config = web::Data::new(config);

    info!("Server running at http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(jobs.clone())
            .app_data(config.clone())
            .route("/", web::get().to(|| async { HttpResponse::Ok().body("Profile post date checker") }))
            .configure(routes::routes::jobs_configure)
            .configure(routes::routes::admin_configure)
    })
    .bind(server_address)?
    .run()
    .await
}

fn delay_range(config: &Config, args: &DelayArgs) -> Result<DelayRange, CheckerError> {
    DelayRange::new(
        args.min_delay.unwrap_or(config.min_delay),
        args.max_delay.unwrap_or(config.max_delay),
    )
}

// The loop notices after its current delay.
fn stop_on_ctrl_c() -> Arc<AtomicBool> {
    let active = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&active);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Stopping after the current delay...");
            flag.store(false, Ordering::SeqCst);
        }
    });
    active
}

async fn load_file(path: &Path) -> Result<LoadedFile, CheckerError> {
    let text = tokio::fs::read_to_string(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(LoadedFile { file_name, usernames: usernames::parse_usernames(&text) })
}

async fn write_export(results: &[CheckResult], output: Option<PathBuf>) -> Result<(), CheckerError> {
    let csv = match export::export_csv(results) {
        Ok(csv) => csv,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    let path = output.unwrap_or_else(|| PathBuf::from(export::todays_file_name()));
    tokio::fs::write(&path, csv).await?;
    println!("Results exported to {}", path.display());
    Ok(())
}

async fn check(config: &Config, args: CheckArgs) -> Result<(), CheckerError> {
    let delays = delay_range(config, &args.delays)?;
    let loaded = match &args.file {
        Some(path) => {
            let file = load_file(path).await?;
            println!("Loaded {} usernames. Ready to start.", file.usernames.len());
            if !file.usernames.is_empty() {
                println!("File Content Preview: {}", usernames::preview(&file.usernames));
            }
            Some(file)
        }
        None => None,
    };

    match &config.database_url {
        Some(url) => {
            let pool = MySqlPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .map_err(SessionStoreError::from)?;
            let store = MySqlSessionStore::connect(pool, &config.session_key).await?;
            run_check(config, &store, !args.no_resume, loaded, delays, args.delays.output).await
        }
        None => {
            let store = FileSessionStore::new(&config.session_file);
            info!("Using session file {}", store.path().display());
            run_check(config, &store, !args.no_resume, loaded, delays, args.delays.output).await
        }
    }
}

async fn run_check<S: SessionStore>(
    config: &Config,
    store: &S,
    resume: bool,
    loaded: Option<LoadedFile>,
    delays: DelayRange,
    output: Option<PathBuf>,
) -> Result<(), CheckerError> {
    let start = prepare(store, resume, loaded, delays).await?;
    if let Start::Resumed(session) = &start {
        println!("{}", describe_session(session));
    }
    let mut state = start.into_state();
    let pacing = DelayRange::new(state.min_delay, state.max_delay)?;

    let lookup = mock_api(config);
    let active = stop_on_ctrl_c();
    let mut rng = StdRng::from_rng(&mut rand::rng());

    let outcome = Checker::new(&lookup, store, resume)
        .run(&mut state, &active, &mut rng, |event| match event {
            CheckerEvent::Checking { username, position, total } => {
                let eta = progress::estimate_remaining(total + 1 - position, pacing);
                println!("Checking {} ({}/{})... {}", username, position, total, progress::format_eta(eta));
            }
            CheckerEvent::Checked { state, report } => {
                println!("  {} -> {}", report.result.username, report.result.post_date);
                if let Some(notice) = &report.notice {
                    println!("  {}", notice);
                }
                println!("  {}", progress::counter(state.current_index, state.total()));
            }
        })
        .await?;

    match outcome {
        RunOutcome::Completed => println!("Finished checking {} profiles.", state.total()),
        RunOutcome::Stopped => println!("Process stopped by user."),
    }
    write_export(&state.results, output).await
}

async fn watch(config: &Config, args: WatchArgs) -> Result<(), CheckerError> {
    // Validate locally so an inverted range fails before any request.
    delay_range(config, &args.delays)?;
    let file = load_file(&args.file).await?;
    if file.usernames.is_empty() {
        return Err(CheckerError::NoUsernames);
    }
    println!("Loaded {} usernames from {}.", file.usernames.len(), file.file_name);

    let request = CreateJobRequest {
        usernames: file.usernames,
        min_delay: args.delays.min_delay,
        max_delay: args.delays.max_delay,
    };
    let runner = HttpJobRunner::new(&args.server);
    let active = stop_on_ctrl_c();

    let job = watch_job(&runner, request, config.poll_interval, &active, |job| {
        println!("{:?}: {}", job.status, progress::counter(job.results.len(), job.total));
    })
    .await?;

    match job.status {
        JobStatus::Completed => println!("Finished checking {} profiles.", job.total),
        JobStatus::Stopped => println!("Process stopped by user."),
        status => warn!("Job {} ended while {:?}", job.token, status),
    }
    write_export(&job.results, args.delays.output).await
}
