use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::sample_dataset::{demo_csv, SAMPLE_CSV};
use crate::application::PredictionInput;
use crate::domain::feature_row::FieldValue;
use crate::infrastructure::bootstrap::{self, AppContext};
use crate::infrastructure::config::AppConfig;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_CSV_NOT_FOUND: u8 = 2;

#[derive(Parser)]
#[command(name = "price-app")]
#[command(about = "Train a price model from CSV and serve predictions", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $PRICE_APP_CONFIG, then ./price_app.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Train and persist a model
    Train {
        /// CSV file with price observations
        #[arg(long, required_unless_present = "demo", conflicts_with = "demo")]
        csv: Option<PathBuf>,

        /// Train on the built-in demo dataset
        #[arg(long)]
        demo: bool,
    },

    /// Predict a price with the persisted model
    Predict {
        /// Input field, repeatable: --field company=Acme
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Print the sample CSV template
    Sample,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.trim().is_empty() {
        return Err(format!("empty field name in '{}'", raw));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr so stdout stays
/// clean for `sample` and `predict`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Commands::Sample) = cli.command {
        print!("{}", SAMPLE_CSV);
        return ExitCode::SUCCESS;
    }

    let config = match AppConfig::load_with(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    init_tracing(&config.logging.filter);

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    let mut config = config;
    if let Commands::Serve { host, port } = &command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    let ctx = match bootstrap::setup(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("{}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let status = match command {
        Commands::Serve { .. } => serve(&ctx),
        Commands::Train { csv, demo } => train(&ctx, csv, demo),
        Commands::Predict { fields } => predict(&ctx, fields),
        Commands::Sample => EXIT_SUCCESS,
    };
    ExitCode::from(status)
}

fn serve(ctx: &AppContext) -> u8 {
    let result = actix_web::rt::System::new().block_on(async {
        let server = crate::interfaces::http::start_server(ctx)?;
        server.await
    });

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server stopped with an error");
            EXIT_FAILURE
        }
    }
}

fn train(ctx: &AppContext, csv: Option<PathBuf>, demo: bool) -> u8 {
    let result = match csv {
        Some(path) if !demo => {
            if !path.is_file() {
                eprintln!("CSV not found: {}", path.display());
                return EXIT_CSV_NOT_FOUND;
            }
            ctx.training.train_from_path(&path)
        }
        _ => ctx
            .training
            .train_from_bytes(demo_csv(ctx.schema.preset).as_bytes()),
    };

    match result {
        Ok(report) => {
            println!("{}", report.summary());
            println!("Saved model to: {}", report.artifact_path.display());
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            EXIT_FAILURE
        }
    }
}

fn predict(ctx: &AppContext, fields: Vec<(String, String)>) -> u8 {
    let input: PredictionInput = fields
        .into_iter()
        .map(|(key, value)| {
            let value = (!value.is_empty()).then_some(FieldValue::Text(value));
            (key, value)
        })
        .collect();

    match ctx.prediction.predict(&input) {
        Ok(prediction) => {
            println!("{:.2}", prediction.price);
            if !prediction.unmatched_fields.is_empty() {
                eprintln!(
                    "Note: no training data for {}",
                    prediction.unmatched_fields.join(", ")
                );
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            EXIT_FAILURE
        }
    }
}
