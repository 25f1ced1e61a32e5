use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

mod api;
mod app;
mod audio;
mod commands;
mod credentials;
mod ui;

#[derive(Parser)]
#[command(name = "voxlate")]
#[command(about = "Transcribe and translate YouTube videos through a voxlate server")]
struct Args {
    /// Config file to use instead of the per-user one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the HTTP API
    #[arg(long, global = true)]
    http_url: Option<String>,

    /// WebSocket endpoint of the job server
    #[arg(long, global = true)]
    ws_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Transcribe a video and translate it into another language
    Translate(commands::TranslateArgs),

    /// Sign in and store the credential
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "VOXLATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and store the credential
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "VOXLATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored credential
    Logout,

    /// Show the signed-in profile and usage
    Profile,

    /// List usage history, or show one entry
    History { id: Option<String> },

    /// Download the audio tracks of a history entry
    HistoryAudio {
        id: String,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// List payments
    Payments,

    /// Store an OpenAI API key on the server
    SetApiKey {
        #[arg(env = "OPENAI_API_KEY", hide_env_values = true)]
        key: String,
    },

    /// Replace the result text of a history entry
    EditText {
        id: String,
        #[arg(short, long)]
        text: String,
    },

    /// Translate a history entry into another language
    Retranslate {
        id: String,
        #[arg(short = 't', long = "to")]
        target_language: String,
    },

    /// Regenerate the translated audio of a history entry
    RemakeAudio {
        id: String,
        #[arg(short, long)]
        voice: String,
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Show or initialise the config file
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = shared::Config::load(args.config.as_deref())?;
    config.override_urls(args.http_url, args.ws_url);

    info!(
        "voxlate client (api {}, jobs {})",
        config.server.http_url, config.server.ws_url
    );

    commands::run(args.command, config, args.config).await
}
