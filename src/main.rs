use clap::Parser;
use groq_relay::relay_state::{RelayConfig, RelayState};
use groq_relay::server::startup;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "groq-relay")]
#[command(about = "HTTP relay in front of the Groq chat-completion API")]
struct RelayArgs {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Full URL of the upstream chat-completion endpoint.
    #[arg(long, default_value = "https://api.groq.com/openai/v1/chat/completions")]
    upstream_url: String,

    /// Upstream bearer token. A missing key is reported per request, not
    /// here, so the server still starts without one.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used by the chat relay endpoint.
    #[arg(long, default_value = "llama-3.3-70b-versatile")]
    model: String,

    /// Token cap for the chat relay endpoint.
    #[arg(long, default_value_t = 256)]
    max_tokens: u32,

    /// Timeout for every upstream call, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    let args = RelayArgs::parse();
    let config = RelayConfig {
        host: args.host,
        port: args.port,
        upstream_url: args.upstream_url,
        api_key: args.api_key,
        model: args.model,
        max_tokens: args.max_tokens,
        timeout_secs: args.timeout_secs,
    };
    let state = RelayState::new(config.clone())?;

    actix_web::rt::System::new().block_on(async move {
        tokio::select! {
            res = startup(config, state) => {
                res?;
                Ok(())
            }
            _ = signal::ctrl_c() => {
                println!("Received Ctrl+C, shutting down");
                Ok(())
            }
        }
    })
}
