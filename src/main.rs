use anyhow::Context;
use buffet::cli::{init, output::Output, Cli, Commands};
use buffet::db::BuffetDb;
use buffet::utils::config::BuffetConfig;
use buffet::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            provider,
        }) => {
            let result = init::run(
                init::InitConfig {
                    path: path.clone(),
                    force,
                    provider: provider.clone(),
                },
                &output,
            );

            match result {
                init::InitResult::Success => {
                    let db_path = path.join("data").join("buffet.db");
                    let db = BuffetDb::new(&db_path.to_string_lossy())
                        .await
                        .context("Failed to create database")?;
                    init::seed_defaults(&db, &provider, &output)
                        .await
                        .context("Failed to seed default agent settings")?;
                    output.hint("Start the server with: buffet-server");
                    Ok(())
                }
                init::InitResult::AlreadyExists => Ok(()),
                init::InitResult::Error(e) => anyhow::bail!("Initialization failed: {}", e),
            }
        }

        Some(Commands::Chat {
            ref user_id,
            ref user_name,
        }) => {
            let config = load_config(&cli)?;
            init_tracing(&config);
            let state = AppState::from_config(config).await?;
            run_chat(&state, &user_id, &user_name, &output).await
        }

        None => {
            let config = load_config(&cli)?;
            init_tracing(&config);
            serve(config).await
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BuffetConfig> {
    BuffetConfig::load(&cli.config).with_context(|| {
        format!(
            "Failed to load configuration from {} (run 'buffet-server init' to scaffold one)",
            cli.config.display()
        )
    })
}

fn init_tracing(config: &BuffetConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: BuffetConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config).await?;

    let app = buffet::api::create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "buffet-server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn run_chat(
    state: &AppState,
    user_id: &str,
    user_name: &str,
    output: &Output,
) -> anyhow::Result<()> {
    use std::io::BufRead;

    output.banner();
    output.info("Type a message and press enter. 'exit' or Ctrl-D quits.");
    output.hint("Send /refresh to pick up settings changes.");

    let stdin = std::io::stdin();
    loop {
        output.user_prompt(user_name);

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        // A failed turn should not end the session
        match state.invoker.invoke(user_id, user_name, message).await {
            Ok(reply) => output.assistant(&reply),
            Err(err) => output.error(&err.user_message()),
        }
    }

    Ok(())
}
