use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use twitchbot_common::models::Config;
use twitchbot_core::builtin_commands::register_all;
use twitchbot_core::platforms::twitch_irc::TwitchIrcRuntime;
use twitchbot_core::registry::Resolution;
use twitchbot_core::services::dispatcher::failure_reply;
use twitchbot_core::services::session_log::{render_input, render_output};
use twitchbot_core::services::SessionLog;
use twitchbot_core::template::format_msg;
use twitchbot_core::test_utils::helpers::FakeMsg;
use twitchbot_core::{ChatMessage, Database, HandlerContext, Registry};

#[derive(Parser, Debug, Clone)]
#[command(name = "twitchbot")]
#[command(author, version, about = "twitchbot - a Twitch chat bot")]
struct Args {
    /// JSON config file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Log wire traffic and dispatch decisions
    #[arg(long, default_value = "false")]
    verbose: bool,

    /// Run a single chat message through the handlers and print the result
    #[arg(long)]
    test: Option<String>,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "twitchbot=debug" } else { "twitchbot=info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(level.parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("failed to set global subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let config = Arc::new(config);

    let db = Database::new(&config.db_path).await?;
    let mut registry = Registry::new();
    register_all(&mut registry, &db)?;

    if let Some(text) = args.test {
        return chat_message_test(config, registry, &text).await;
    }

    info!("twitchbot starting as {} in #{}", config.username, config.channel);
    let session_log = Arc::new(SessionLog::new(config.log_dir.clone(), true));
    let runtime = TwitchIrcRuntime::new(config.clone(), registry, session_log);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("could not listen for ctrl-c: {}", e);
            return;
        }
        info!("ctrl-c received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    runtime.run(shutdown_rx).await?;
    Ok(())
}

/// Resolves and runs one fake message without connecting anywhere.
async fn chat_message_test(config: Arc<Config>, registry: Registry, text: &str) -> anyhow::Result<()> {
    let ctx = HandlerContext::new(config.clone(), Arc::new(registry));
    let line = FakeMsg::new(&config, text).build();
    let message = ChatMessage::parse(&line).context("test message did not parse")?;
    println!("{}", render_input(&message));

    let Resolution::Handler { handler, message, .. } = ctx.registry.resolve(&line) else {
        println!("<<no handler>>");
        return Ok(());
    };

    let rendered = match handler.invoke(&ctx, &message).await {
        Ok(Some(reply)) => format_msg(&message, &reply).map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    match rendered {
        Ok(Some(reply)) => println!("{}", render_output(&config.username, &reply)),
        Ok(None) => println!("<<handler returned None>>"),
        Err(e) => {
            error!("handler failed: {:?}", e);
            print!("{}", failure_reply(&config.channel, &e));
        }
    }
    Ok(())
}
