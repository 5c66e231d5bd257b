mod bridge;

use clap::{Parser, Subcommand};
use ponte_channels::{telegram::TelegramApi, whatsapp::WhatsAppChannel};
use ponte_core::{config, traits::WhatsAppTransport};
use ponte_store::{AdminRegistry, Store};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ponte", version, about = "Ponte — WhatsApp to Telegram bridge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge.
    Start,
    /// Check the configuration and report what is missing.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            cfg.validate()?;

            let store = Store::new(&cfg.store).await?;
            let admins = Arc::new(
                AdminRegistry::load(store.clone(), &cfg.telegram.super_admin_id).await?,
            );

            let tg = Arc::new(TelegramApi::new(&cfg.telegram.bot_token));
            let wa: Arc<dyn WhatsAppTransport> =
                Arc::new(WhatsAppChannel::new(&cfg.ponte.data_dir));

            println!("Ponte — starting bridge...");
            let bridge = bridge::Bridge::new(&cfg, tg, wa, store, admins);
            bridge.run().await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Ponte — Status Check\n");
            println!("Config: {}", cli.config);
            println!();

            let set_or = |present: bool| if present { "set" } else { "missing" };
            println!(
                "  telegram bot token: {}",
                set_or(!cfg.telegram.bot_token.is_empty())
            );
            println!("  group id: {}", set_or(cfg.telegram.group_id != 0));
            println!(
                "  primary topic: {}",
                set_or(cfg.telegram.topic_primary != 0)
            );
            println!("  status topic: {}", set_or(cfg.telegram.topic_status != 0));
            println!(
                "  super admin: {}",
                set_or(!cfg.telegram.super_admin_id.is_empty())
            );
            println!();
            println!("  contact db: {}", cfg.store.db_path);
            println!("  data dir: {}", cfg.ponte.data_dir);

            match cfg.validate() {
                Ok(()) => println!("\nConfiguration complete."),
                Err(e) => println!("\n{e}"),
            }
        }
    }

    Ok(())
}
