use image_optimizer::cli::optimize_file;
use image_optimizer::{service, Config, DevMode};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-optimizer")]
#[command(about = "Upload an image and download a size-reduced copy")]
struct Cli {
    /// Enable development mode (keeps session files under ./dev_data)
    #[arg(long, global = true)]
    dev: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web page
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one optimization session against a local file
    Optimize {
        /// Image to process (jpg, jpeg or png)
        input: PathBuf,
        /// Quality level to download (defaults to the first configured level)
        #[arg(short, long)]
        quality: Option<u32>,
        /// Where to write the download
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let dev_mode = DevMode::new(cli.dev)?;
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(service::serve(config, dev_mode))?;
        }
        Commands::Optimize { input, quality, out_dir } => {
            let outcome = optimize_file(&input, quality, &out_dir, &config, &dev_mode)?;
            print!("{}", outcome.report);
            match outcome.written {
                Some(path) => println!("💾 Saved {}", path.display()),
                None => println!("Nothing to download"),
            }
        }
    }

    Ok(())
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}
