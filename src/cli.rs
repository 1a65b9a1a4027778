use std::io;

use env_loadr::{
    active_environment, dotenv, format_error, replace_all, ActiveEnvironment, Documentation,
    Encoder, Env, Load,
};
use tracing_subscriber::EnvFilter;

/// Connection settings of the demo service
#[derive(Env, Debug, Default)]
pub struct DatabaseConfig {
    /// Connection string, may reference other variables
    #[env(default = "postgres://${DB_HOST:-localhost}/app")]
    pub url: String,
    /// Maximum number of pooled connections
    #[env(default = 4)]
    pub pool_size: u32,
}

#[derive(Env, Debug, Default)]
pub struct DemoConfig {
    /// Port to listen on
    #[env("PORT,noprefix", default = 8080)]
    pub port: u16,
    /// Graceful shutdown timeout
    #[env(default = "30s")]
    pub shutdown_timeout: std::time::Duration,
    pub database: DatabaseConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let (active, args) = active_environment(std::env::args().skip(1));
    match args.first().map(String::as_str) {
        Some("resolve") => resolve(args.get(1).map(String::as_str).unwrap_or("."), active.as_ref()),
        Some("load") => load(args.get(1).map(String::as_str).unwrap_or("."), active.as_ref()),
        Some("template") => template(),
        Some("docs") => generate_docs(),
        Some(arg) => println!(
            "unknown arg: {}. Available: resolve, load, template, docs",
            arg
        ),
        None => {
            println!("Usage: util-cli [--active-env ENV] [command]");
            println!("Commands:");
            println!("  resolve [dir] - Print the expanded variables of the .env files in dir");
            println!("  load [dir]    - Load DemoConfig from the environment and .env files in dir");
            println!("  template      - Print a .env template for DemoConfig");
            println!("  docs          - Generate CONFIG.md documentation");
        }
    };
}

fn resolve(dir: &str, active: Option<&ActiveEnvironment>) {
    let resolved = dotenv::read(dir, active).and_then(|map| replace_all(&map));
    let result = resolved.and_then(|map| Encoder::new(io::stdout()).encode_map(&map));
    if let Err(err) = result {
        eprintln!("{}", format_error(&err));
    }
}

fn load(dir: &str, active: Option<&ActiveEnvironment>) {
    match DemoConfig::load_from(dir, active) {
        Ok(config) => {
            println!("Config loaded successfully!");
            println!("  port: {}", config.port);
            println!("  shutdown_timeout: {:?}", config.shutdown_timeout);
            println!("  database.url: {}", config.database.url);
            println!("  database.pool_size: {}", config.database.pool_size);
        }
        Err(err) => eprintln!("{}", format_error(&err)),
    }
}

fn template() {
    let mut encoder = Encoder::new(io::stdout());
    if let Err(err) = encoder.encode(&DemoConfig::default()) {
        eprintln!("{}", format_error(&err));
    }
}

fn generate_docs() {
    println!("Generating documentation for DemoConfig...");
    let written = Documentation::of::<DemoConfig>()
        .map_err(|err| format_error(&err))
        .and_then(|docs| docs.write_docs("CONFIG.md").map_err(|e| e.to_string()));
    match written {
        Ok(_) => println!("✓ Documentation written to CONFIG.md"),
        Err(e) => eprintln!("✗ Failed to write documentation: {}", e),
    }
}
