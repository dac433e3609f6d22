use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use nutriplan::config::{self, Config};
use nutriplan::llm::{LlmClient, PlanGenerator};
use nutriplan::render::{render_plan, RenderOptions};
use nutriplan::server::{create_router, AppState, SharedState};
use nutriplan::{parse_plan, DietPlan, Planner, ProfileForm};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nutriplan", version, about = "Personalized diet plans from an LLM")]
struct Cli {
    /// Config file (defaults to $NUTRIPLAN_CONFIG, then ~/.config/nutriplan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate a plan for a profile file and print it
    Generate {
        /// Profile questionnaire (.toml or .json)
        #[arg(long, short)]
        profile: PathBuf,
        /// Also write the model's raw markdown to this file
        #[arg(long)]
        save: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the prompt that would be sent for a profile
    Prompt {
        #[arg(long, short)]
        profile: PathBuf,
    },
    /// Parse a saved markdown answer without calling the model
    Parse {
        file: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Print the parsed plan as JSON
    #[arg(long)]
    json: bool,
    #[arg(long)]
    no_color: bool,
    #[arg(long, default_value_t = 100)]
    width: usize,
}

impl OutputArgs {
    fn print(&self, plan: &DietPlan) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(plan)?);
        } else {
            let opts = RenderOptions {
                width: self.width,
                color: !self.no_color && console::colors_enabled(),
            };
            print!("{}", render_plan(plan, &opts));
        }
        Ok(())
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("nutriplan=debug".parse()?)
        .add_directive("axum::rejection=trace".parse()?);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn load_profile(path: &Path) -> Result<nutriplan::UserProfile> {
    let form = ProfileForm::from_path(path)?;
    form.validate()
        .with_context(|| format!("Profile {} is incomplete", path.display()))
}

async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let generator: Arc<dyn PlanGenerator> = Arc::new(LlmClient::from_config(&config.llm)?);
    let state: SharedState = Arc::new(AppState {
        planner: Planner::new(generator),
    });
    let app = create_router(state);

    let listener_addr = format!(
        "{}:{}",
        host.unwrap_or(config.server.host),
        port.unwrap_or(config.server.port)
    );
    info!("Binding to {}", listener_addr);
    let listener = TcpListener::bind(&listener_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listener_addr))?;
    let api_host = config
        .llm
        .api_host()
        .unwrap_or_else(|| "unknown".to_string());
    info!(
        model = %config.llm.model,
        api_host = %api_host,
        "Server listening on http://{}",
        listener_addr
    );

    axum::serve(listener, app).await.map_err(|e| {
        error!("Server error: {}", e);
        e.into()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;
    config::load_env_files();

    match cli.command {
        Command::Serve { host, port } => {
            info!("NutriPlan service starting");
            let config = Config::load_auto(cli.config.as_deref())?;
            serve(config, host, port).await
        }
        Command::Generate {
            profile,
            save,
            output,
        } => {
            let config = Config::load_auto(cli.config.as_deref())?;
            let profile = load_profile(&profile)?;
            let generator: Arc<dyn PlanGenerator> =
                Arc::new(LlmClient::from_config(&config.llm)?);
            let planner = Planner::new(generator);

            eprintln!(
                "{} personalized diet plan with {}...",
                style("Generating").bold(),
                style(planner.model()).cyan()
            );
            let generated = planner.generate(&profile).await?;

            if let Some(path) = save {
                fs::write(&path, &generated.content)
                    .with_context(|| format!("Failed to write plan to {}", path.display()))?;
                eprintln!("{} {}", style("Saved to:").green().bold(), path.display());
            }
            output.print(&generated.plan)
        }
        Command::Prompt { profile } => {
            let profile = load_profile(&profile)?;
            print!("{}", nutriplan::prompt::build_prompt(&profile));
            Ok(())
        }
        Command::Parse { file, output } => {
            let markdown = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            output.print(&parse_plan(&markdown))
        }
    }
}
