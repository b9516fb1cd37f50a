mod config;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ml_engine::{AlgorithmParams, DataFrame, FunctionName, Input, MlEngine, Model};
use ml_registration::{
    loopback::{InMemoryModelGroupManager, InMemoryModelMetaStore, ModelGroupDirectory},
    AccessMode, ModelFormat, ModelMetaInput, RegistrationOrchestrator, RegistrationTask, User,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use shared_logging::LogLevel;
use tokio::runtime::Runtime;

use crate::config::MlctlConfig;

#[derive(Parser, Debug)]
#[command(name = "mlctl", version, about = "ML commons engine and model registration")]
struct Cli {
    /// Path to `mlctl.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints metadata for every available algorithm.
    Algorithms,
    /// Trains a model and writes it as JSON.
    Train {
        #[arg(long)]
        algorithm: FunctionName,
        /// Data frame JSON (`{"columns": [...], "rows": [[...]]}`).
        #[arg(long)]
        data: PathBuf,
        /// Tagged parameter JSON.
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long)]
        model_out: PathBuf,
    },
    /// Scores a data frame with a trained model.
    Predict {
        #[arg(long)]
        algorithm: FunctionName,
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        params: Option<PathBuf>,
    },
    /// Runs an execute request.
    Execute {
        /// Input JSON (`{"function_name": ..., "data": ...}`).
        #[arg(long)]
        input: PathBuf,
    },
    /// Registers model metadata against in-memory collaborators.
    Register(RegisterArgs),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    /// Requesting user; omitted means an anonymous request.
    #[arg(long)]
    user: Option<String>,
    #[arg(long = "user-backend-role")]
    user_backend_roles: Vec<String>,
    #[arg(long, default_value = "")]
    model_group_id: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    version: Option<String>,
    #[arg(long, value_enum, default_value_t = FormatArg::TorchScript)]
    format: FormatArg,
    #[arg(long, default_value_t = 1)]
    total_chunks: u32,
    #[arg(long = "backend-role")]
    backend_roles: Vec<String>,
    #[arg(long, value_enum)]
    access_mode: Option<AccessModeArg>,
    #[arg(long)]
    add_all_backend_roles: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    TorchScript,
    Onnx,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AccessModeArg {
    Public,
    Private,
    Restricted,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MlctlConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Commands::Algorithms => {
            let metadata = engine(&config)?.metadata()?;
            print_json(&metadata)
        }
        Commands::Train {
            algorithm,
            data,
            params,
            model_out,
        } => {
            let frame: DataFrame = read_json(&data)?;
            let params = read_params(params.as_deref())?;
            let model = engine(&config)?.train(Some(algorithm), params.as_ref(), &frame)?;
            fs::write(&model_out, serde_json::to_vec_pretty(&model)?)
                .with_context(|| format!("writing model {}", model_out.display()))?;
            print_json(&json!({
                "function_name": model.function_name,
                "model": model_out,
                "bytes": model.content.len(),
            }))
        }
        Commands::Predict {
            algorithm,
            data,
            model,
            params,
        } => {
            let frame: DataFrame = read_json(&data)?;
            let model: Model = read_json(&model)?;
            let params = read_params(params.as_deref())?;
            let output = engine(&config)?.predict(Some(algorithm), params.as_ref(), &frame, &model)?;
            print_json(&output)
        }
        Commands::Execute { input } => {
            let input: Input = read_json(&input)?;
            let output = engine(&config)?.execute(Some(&input))?;
            print_json(&output)
        }
        Commands::Register(args) => handle_register(&config, args),
    }
}

fn engine(config: &MlctlConfig) -> Result<MlEngine> {
    let engine = MlEngine::new(config.registry()?);
    Ok(match config.telemetry("engine")? {
        Some(telemetry) => engine.with_telemetry(telemetry),
        None => engine,
    })
}

fn handle_register(config: &MlctlConfig, args: RegisterArgs) -> Result<()> {
    let requester = args
        .user
        .as_ref()
        .map(|name| User::named(name).with_backend_roles(args.user_backend_roles.iter().cloned()));
    let task = RegistrationTask::new(requester, descriptor(&args)?);
    let telemetry = config.telemetry("registration")?;

    let directory = ModelGroupDirectory::new();
    let mut builder = RegistrationOrchestrator::builder()
        .access_control(Arc::new(config.access_control(directory.clone())))
        .group_manager(Arc::new(InMemoryModelGroupManager::new(directory.clone())))
        .meta_store(Arc::new(InMemoryModelMetaStore::new(directory)));
    if let Some(telemetry) = telemetry.clone() {
        builder = builder.telemetry(telemetry);
    }
    let orchestrator = builder.build();

    let runtime = Runtime::new().context("starting tokio runtime")?;
    let handle = {
        let _guard = runtime.enter();
        orchestrator.submit(task)
    };
    print_json(&handle.ack())?;
    match runtime.block_on(handle.outcome()) {
        Ok(response) => print_json(&response),
        Err(err) => {
            if let Some(telemetry) = telemetry {
                let _ = telemetry.log(
                    LogLevel::Error,
                    "mlctl.register.failed",
                    json!({ "error": err.to_string() }),
                );
            }
            Err(err.into())
        }
    }
}

fn descriptor(args: &RegisterArgs) -> Result<ModelMetaInput> {
    anyhow::ensure!(args.total_chunks > 0, "total chunks must be positive");
    let mut builder = ModelMetaInput::builder(args.name.clone())
        .model_group_id(args.model_group_id.clone())
        .model_format(match args.format {
            FormatArg::TorchScript => ModelFormat::TorchScript,
            FormatArg::Onnx => ModelFormat::Onnx,
        })
        .total_chunks(args.total_chunks)
        .backend_roles(args.backend_roles.iter().cloned());
    if let Some(description) = &args.description {
        builder = builder.description(description.clone());
    }
    if let Some(version) = &args.version {
        builder = builder.version(version.clone());
    }
    if let Some(mode) = args.access_mode {
        builder = builder.access_mode(match mode {
            AccessModeArg::Public => AccessMode::Public,
            AccessModeArg::Private => AccessMode::Private,
            AccessModeArg::Restricted => AccessMode::Restricted,
        });
    }
    if args.add_all_backend_roles {
        builder = builder.add_all_backend_roles(true);
    }
    Ok(builder.build())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_params(path: Option<&Path>) -> Result<Option<AlgorithmParams>> {
    path.map(read_json).transpose()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
