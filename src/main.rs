use std::path::Path;
use std::process;

use anyhow::Context as _;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use k89::cli::{
    context_add, context_current, context_delete, context_list, context_use,
    format_context_list, format_current_context, run_create, run_delete, run_get, run_start,
    run_status, run_stop, Cli, Commands, ContextAction, ContextArgs, ServeArgs,
};
use k89::client::ControlPlaneClient;
use k89::cluster::{
    create_control_plane_router, ClusterController, ControlPlaneState, ControllerConfig,
    CONTROL_PLANE_PORT,
};
use k89::context::{
    load_config_from, load_controller_config, resolve_config_path, save_config_to,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Serve(args) => return serve(args).await,
        Commands::Context(args) => return context(args, &config_path),
        Commands::Status => run_status(&connect(&config_path)?).await?,
        Commands::Start => run_start(&connect(&config_path)?).await?,
        Commands::Stop => run_stop(&connect(&config_path)?).await?,
        Commands::Get(args) => run_get(&connect(&config_path)?, &args.resource).await?,
        Commands::Create(args) => run_create(&connect(&config_path)?, &args.resource).await?,
        Commands::Delete(args) => run_delete(&connect(&config_path)?, &args.resource).await?,
    };
    print!("{}", output);
    Ok(())
}

/// Client for the control plane named by the current context
fn connect(path: &Path) -> anyhow::Result<ControlPlaneClient> {
    let config = load_config_from(path).with_context(|| format!("loading {}", path.display()))?;
    let url = config.current_url()?;
    info!("Using context {} ({})", config.current_name(), url);
    Ok(ControlPlaneClient::new(url))
}

fn context(args: ContextArgs, path: &Path) -> anyhow::Result<()> {
    let mut config =
        load_config_from(path).with_context(|| format!("loading {}", path.display()))?;

    match args.action {
        ContextAction::List => print!("{}", format_context_list(&context_list(&config))),
        ContextAction::Current => {
            let (name, url) = context_current(&config)?;
            print!("{}", format_current_context(&name, &url));
        }
        ContextAction::Use { name } => {
            context_use(&mut config, &name)?;
            save_config_to(&config, path)?;
            println!("Switched to context \"{}\"", name);
        }
        ContextAction::Add {
            name,
            url,
            description,
        } => {
            context_add(&mut config, &name, &url, description.as_deref())?;
            save_config_to(&config, path)?;
            println!("Context \"{}\" added", name);
        }
        ContextAction::Delete { name } => {
            if context_delete(&mut config, &name)? {
                save_config_to(&config, path)?;
                println!("Context \"{}\" deleted", name);
            } else {
                anyhow::bail!("context \"{}\" not found", name);
            }
        }
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    // Load .env file if specified
    if let Some(ref env_file) = args.env_file {
        dotenvy::from_path(env_file)
            .with_context(|| format!("loading env file {}", env_file.display()))?;
    }

    let config = match args.cluster_config {
        Some(ref path) => load_controller_config(path)
            .with_context(|| format!("loading cluster config {}", path.display()))?,
        None => ControllerConfig::default(),
    };

    let controller = ClusterController::with_config(config);
    let app = create_control_plane_router(ControlPlaneState::with_controller(controller));

    let port = args.port.unwrap_or(CONTROL_PLANE_PORT);
    let addr = format!("{}:{}", args.bind_addr, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Control plane listening on {}", addr);
    info!("Endpoints:");
    info!("  GET    /health                               - Health check");
    info!("  GET    /v1/status                            - Cluster status");
    info!("  GET    /v1/cluster                           - Full snapshot");
    info!("  GET    /v1/nodes, POST /v1/nodes             - List / add nodes");
    info!("  DELETE /v1/nodes/{{name}}                      - Remove a node");
    info!("  GET    /v1/pods, POST /v1/pods               - List / schedule pods");
    info!("  DELETE /v1/namespaces/{{ns}}/pods/{{name}}      - Delete a pod");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}
