//!
//! market CLI
//! ----------
//! Small operator tool over a file-backed marketplace session: inspect it,
//! refresh tokens, fetch the delivery-agent CSRF token, log out, complete a 2FA
//! login, or pull delivery-agent stats.

use std::env;

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use marketplace_client::api::ApiClient;
use marketplace_client::config::ClientConfig;
use marketplace_client::session::SessionState;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--session-file <path>] <command> [args]\n\nCommands:\n  status                      show session state (no tokens printed)\n  refresh                     exchange the refresh token for a new pair\n  csrf                        fetch and store a delivery-agent CSRF token\n  logout                      clear the stored session\n  verify-2fa <user_id> <code> complete a 2FA login and store the session\n  agent-stats <agent_id>      delivery-agent dashboard stats\n\nEnvironment:\n  MARKET_API_BASE_URL, MARKET_SESSION_FILE, MARKET_REFRESH_SKEW_SECS, MARKET_HTTP_TIMEOUT_SECS\n\nDefaults:\n  --session-file defaults to ./market-session.json when MARKET_SESSION_FILE is unset."
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut cfg = ClientConfig::from_env()?;
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a URL"); print_usage(&program); std::process::exit(2); }
                cfg.api_base_url = args[i + 1].clone();
                i += 2; continue;
            }
            "--session-file" => {
                if i + 1 >= args.len() { eprintln!("--session-file requires a path"); print_usage(&program); std::process::exit(2); }
                cfg.session_file = Some(args[i + 1].clone().into());
                i += 2; continue;
            }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            other => { positional.push(other.to_string()); i += 1; }
        }
    }
    if cfg.session_file.is_none() {
        cfg.session_file = Some("market-session.json".into());
    }

    let Some(command) = positional.first().cloned() else {
        print_usage(&program);
        std::process::exit(2);
    };

    info!(
        target: "market",
        "market starting: api='{}', session_file={:?}",
        cfg.api_base_url, cfg.session_file
    );

    let client = ApiClient::from_config(&cfg)?;
    let session = client.session();

    match command.as_str() {
        "status" => {
            let state = session.state();
            println!("state: {}", match state { SessionState::Authenticated => "authenticated", SessionState::Anonymous => "anonymous" });
            if let Some(user) = session.current_user() {
                println!("user: {} {} <{}> id={} type={}", user.first_name, user.last_name, user.email, user.user_id, user.user_type);
            }
            println!("refresh token: {}", if session.refresh_token().is_some() { "present" } else { "absent" });
            println!("csrf token: {}", if session.csrf_token().is_some() { "present" } else { "absent" });
        }
        "refresh" => {
            session.refresh_tokens().await.map_err(|e| anyhow!("{} ({})", e, e.code_str()))?;
            println!("tokens refreshed");
        }
        "csrf" => {
            session.fetch_and_store_csrf_token().await.map_err(|e| anyhow!("{} ({})", e, e.code_str()))?;
            println!("csrf token stored");
        }
        "logout" => {
            session.clear_auth_data();
            println!("session cleared");
        }
        "verify-2fa" => {
            let (user_id, code) = match (positional.get(1), positional.get(2)) {
                (Some(u), Some(c)) => (u.parse::<i64>().context("user_id must be an integer")?, c.clone()),
                _ => { eprintln!("verify-2fa requires <user_id> <code>"); print_usage(&program); std::process::exit(2); }
            };
            let user = client.users().verify_2fa(user_id, &code).await?;
            println!("logged in as {} {} (id={})", user.first_name, user.last_name, user.user_id);
        }
        "agent-stats" => {
            let agent_id = positional
                .get(1)
                .ok_or_else(|| anyhow!("agent-stats requires <agent_id>"))?
                .parse::<i64>()
                .context("agent_id must be an integer")?;
            let agent = client.delivery_agent();
            agent.ensure_csrf().await?;
            let stats = agent.stats(agent_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        other => {
            eprintln!("unknown command: {}", other);
            print_usage(&program);
            std::process::exit(2);
        }
    }
    Ok(())
}
