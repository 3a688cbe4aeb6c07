use clap::Parser;
use homework_tracker::{
    db::Db, router, services::generator::CompletionConfig, AppConfig, AppState,
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// SQLite database, e.g. `sqlite://homework.db`.
    #[arg(long, env, default_value = "sqlite://homework.db")]
    database_url: String,

    /// The address to bind to.
    #[arg(short, long, env, default_value = "127.0.0.1:1414")]
    address: String,

    /// Mark session cookies `Secure` (serve over HTTPS).
    #[arg(long, env, default_value_t = false)]
    secure_cookies: bool,

    /// Shared secret the auth provider presents on its sign-in callback.
    #[arg(long, env)]
    auth_callback_secret: Option<String>,

    /// Chat-completion endpoint used for question generation.
    #[arg(long, env, default_value = "https://api.openai.com/v1/chat/completions")]
    completion_api_url: String,

    /// Without a key, generation falls back to placeholder questions.
    #[arg(long, env)]
    completion_api_key: Option<String>,

    #[arg(long, env, default_value = "gpt-4o-mini")]
    completion_model: String,

    #[arg(long, env, default_value_t = 0.7)]
    completion_temperature: f32,

    #[arg(long, env, default_value_t = 4000)]
    completion_max_tokens: u32,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,homework_tracker=debug".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();

    if args.completion_api_key.is_none() {
        tracing::warn!("COMPLETION_API_KEY not set, question generation will use placeholders");
    }
    if args.auth_callback_secret.is_none() {
        tracing::warn!("AUTH_CALLBACK_SECRET not set, sign-in is disabled");
    }

    let db = Db::new(&args.database_url).await?;
    let config = AppConfig {
        secure_cookies: args.secure_cookies,
        auth_callback_secret: args.auth_callback_secret,
        completion: CompletionConfig {
            api_url: args.completion_api_url,
            api_key: args.completion_api_key,
            model: args.completion_model,
            temperature: args.completion_temperature,
            max_tokens: args.completion_max_tokens,
        },
    };
    let app = router(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(&args.address).await?;
    tracing::info!("listening on {}", args.address);
    axum::serve(listener, app).await?;

    Ok(())
}
