//! oxide-serve CLI
//!
//! Serves a small demo application over HTTP/1.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::{json, Value};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_serve::ServeConfig;
use oxide_web::{
    middleware, App, BannerStarter, Blueprint, BuildError, Context, Engine, Method,
    RouteInfoStarter,
};

/// Radix-tree routed HTTP server.
#[derive(Parser)]
#[command(name = "oxide-serve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind (overrides the config file).
    #[arg(short, long, env = "OXIDE_ADDR")]
    addr: Option<SocketAddr>,

    /// JSON configuration file.
    #[arg(short, long, env = "OXIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Include fault details in 500 responses.
    #[arg(long)]
    debug: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Directory served under /static.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Do not log the startup banner.
    #[arg(long)]
    no_banner: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServeConfig) {
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if self.debug {
            config.engine.debug = true;
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = Some(dir.clone());
        }
        if self.no_banner {
            config.banner = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    oxide_serve::install_panic_hook();

    let mut config = match &cli.config {
        Some(path) => ServeConfig::from_file(path)?,
        None => ServeConfig::default(),
    };
    cli.apply(&mut config);

    // Build before binding so bad routes fail fast
    let app = Arc::new(build_app(&config)?);
    oxide_serve::serve(app, &config).await?;

    info!("Stopped");
    Ok(())
}

fn build_app(config: &ServeConfig) -> Result<App, BuildError> {
    let users = Blueprint::new("/users")
        .middleware(middleware::allow_options(&[Method::Get, Method::Post]))
        .get("/:id", show_user)
        .post("", echo_json);

    let mut engine = Engine::with_config(config.engine.clone())
        .interceptor(middleware::logger())
        .interceptor(middleware::gzip(6))
        .get("/ping", |ctx| ctx.string("pong"))
        .named("file", Method::Get, "/files/*path", |ctx| {
            let path = ctx.param("path").unwrap_or_default().to_string();
            ctx.string(path);
        })
        .include("/api", users)
        .starter(RouteInfoStarter);

    if config.banner {
        engine = engine.starter(BannerStarter::new(format!(
            "oxide-serve {} on http://{}",
            env!("CARGO_PKG_VERSION"),
            config.addr
        )));
    }
    if let Some(dir) = &config.static_dir {
        engine = engine.static_dir("/static", dir.clone());
    }

    engine.build()
}

fn show_user(ctx: &mut Context) {
    match ctx.params().parse::<u64>("id") {
        Ok(id) => respond_json(ctx, &json!({ "id": id })),
        Err(err) => ctx.abort_with_string(400, err.to_string()),
    }
}

fn echo_json(ctx: &mut Context) {
    match ctx.bind_json::<Value>() {
        Ok(value) => {
            ctx.set_status(201);
            respond_json(ctx, &value);
        }
        Err(err) => ctx.abort_with_string(400, err.to_string()),
    }
}

fn respond_json(ctx: &mut Context, value: &Value) {
    if let Err(err) = ctx.json(value) {
        tracing::error!(error = %err, "failed to encode response");
        ctx.abort_with_status(500);
    }
}
