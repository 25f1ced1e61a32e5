use anyhow::{bail, Context, Result};
use clap::Args;
use log::{info, warn};
use shared::{
    Config, Connector, EditTextRequest, Entitlement, JobInputs, JobRequest, JobSession, Prompt,
    RemakeAudioRequest, RetranslateRequest, SessionStage, SessionState, SessionStep, SubmitError,
    WsConnector,
};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ApiClient;
use crate::app::AppState;
use crate::audio;
use crate::credentials::CredentialStore;
use crate::ui::{self, Presenter};
use crate::Command;

#[derive(Args)]
pub struct TranslateArgs {
    /// YouTube video URL
    url: String,

    /// Target language, e.g. "Spanish"
    #[arg(short = 't', long = "to")]
    target_language: Option<String>,

    /// OpenAI API key for this job, when none is stored on the server
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Return the original audio track
    #[arg(long)]
    keep_original_audio: bool,

    /// Generate spoken audio of the translation
    #[arg(long)]
    target_audio: bool,

    /// Voice used for generated audio
    #[arg(long)]
    voice: Option<String>,

    /// Directory to write returned audio tracks to
    #[arg(long)]
    save_audio: Option<PathBuf>,
}

fn open_app(config: &Config) -> Result<AppState> {
    let api = ApiClient::new(
        &config.server.http_url,
        Duration::from_secs(config.server.request_timeout_seconds),
    )?;
    AppState::new(api, CredentialStore::open_default()?)
}

pub async fn run(command: Command, config: Config, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        Command::Config { init } => show_config(&config, config_path, init),
        Command::Translate(args) => {
            let mut app = open_app(&config)?;
            translate(&mut app, &config, args).await
        }
        Command::Login { email, password } => {
            let mut app = open_app(&config)?;
            let user = app.login(&email, &password).await?;
            println!("Logged in successfully as {}.", user.name);
            Ok(())
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let mut app = open_app(&config)?;
            let user = app.register(&name, &email, &password).await?;
            println!("Registered successfully as {}.", user.name);
            Ok(())
        }
        Command::Logout => {
            open_app(&config)?.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Profile => {
            let mut app = open_app(&config)?;
            let user = require_user(&mut app).await?;
            ui::print_profile(user);
            Ok(())
        }
        Command::History { id } => {
            let mut app = open_app(&config)?;
            require_token(&app)?;
            let items = app.history().await?;
            match id {
                Some(id) => {
                    let item = items
                        .iter()
                        .find(|item| item.id == id)
                        .with_context(|| format!("No history entry {}", id))?;
                    ui::print_history_item(item);
                }
                None => ui::print_history(items),
            }
            Ok(())
        }
        Command::HistoryAudio { id, out_dir } => {
            let mut app = open_app(&config)?;
            require_token(&app)?;
            let language = history_language(&mut app, &id).await?;
            let tracks = app.history_audio(&id).await?;
            let saved = audio::save_history_audio(&out_dir, &tracks, &language)?;
            report_saved(&saved);
            Ok(())
        }
        Command::Payments => {
            let mut app = open_app(&config)?;
            require_token(&app)?;
            let payments = app.payments().await?;
            ui::print_payments(&payments);
            Ok(())
        }
        Command::SetApiKey { key } => {
            let mut app = open_app(&config)?;
            require_token(&app)?;
            app.update_api_key(key.trim()).await?;
            println!("API key updated successfully.");
            Ok(())
        }
        Command::EditText { id, text } => {
            let mut app = open_app(&config)?;
            require_token(&app)?;
            let result = app
                .api()
                .edit_text(&EditTextRequest {
                    history_id: id,
                    text,
                })
                .await;
            let item = app.absorb(result)?;
            app.invalidate();
            ui::print_history_item(&item);
            Ok(())
        }
        Command::Retranslate {
            id,
            target_language,
        } => {
            let mut app = open_app(&config)?;
            require_token(&app)?;
            let result = app
                .api()
                .retranslate(&RetranslateRequest {
                    history_id: id,
                    target_lang: target_language,
                })
                .await;
            let item = app.absorb(result)?;
            app.invalidate();
            ui::print_history_item(&item);
            Ok(())
        }
        Command::RemakeAudio { id, voice, out_dir } => {
            let mut app = open_app(&config)?;
            require_token(&app)?;
            let result = app
                .api()
                .remake_audio(&RemakeAudioRequest {
                    history_id: id.clone(),
                    selected_voice: voice,
                })
                .await;
            let tracks = app.absorb(result)?;
            println!("Audio regenerated for {}.", id);

            if let Some(dir) = out_dir {
                let language = history_language(&mut app, &id).await?;
                let saved = audio::save_history_audio(&dir, &tracks, &language)?;
                report_saved(&saved);
            }
            Ok(())
        }
    }
}

async fn history_language(app: &mut AppState, id: &str) -> Result<String> {
    Ok(app
        .history()
        .await?
        .iter()
        .find(|item| item.id == id)
        .and_then(|item| item.target_language.clone())
        .unwrap_or_else(|| "unknown".to_string()))
}

async fn translate(app: &mut AppState, config: &Config, args: TranslateArgs) -> Result<()> {
    app.set_openai_api_key(args.api_key);
    app.refresh_profile().await?;

    let target_language = args
        .target_language
        .or_else(|| config.job.default_target_language.clone())
        .unwrap_or_default();

    let inputs = JobInputs {
        video_url: args.url,
        target_language: target_language.clone(),
        api_key: app.openai_api_key().map(str::to_string),
        keep_original_audio: args.keep_original_audio || config.job.keep_original_audio,
        generate_target_audio: args.target_audio || config.job.generate_target_audio,
        voice: args.voice.unwrap_or_else(|| config.job.default_voice.clone()),
    };

    let mut presenter = Presenter::stdout(config.ui.show_partial_text)?;
    let request = prepare_job(inputs, app.entitlement().as_ref(), &mut presenter)?;

    let mut session = JobSession::new(WsConnector, config.server.ws_url.as_str());
    session.submit(&request).await?;

    let end = follow_job(&mut session, &mut presenter, tokio::signal::ctrl_c()).await;
    let state = session.state().clone();
    session.reset().await;

    presenter.render_outcome(&state, &target_language)?;
    if end? == JobEnd::Cancelled {
        bail!("Cancelled");
    }
    conclude(&state)?;

    app.invalidate();
    if let Some(dir) = &args.save_audio {
        let saved = audio::save_session_audio(dir, &state, &target_language)?;
        report_saved(&saved);
    }
    if let Ok(Some(user)) = app.refresh_profile().await {
        info!("{} jobs left today", user.remaining_today());
    }
    Ok(())
}

/// Validates the inputs, showing the login prompt when no one is signed in.
fn prepare_job<W: Write>(
    inputs: JobInputs,
    entitlement: Option<&Entitlement>,
    presenter: &mut Presenter<W>,
) -> Result<JobRequest> {
    match JobRequest::prepare(inputs, entitlement) {
        Ok(request) => Ok(request),
        Err(e) => {
            if e == SubmitError::NotLoggedIn {
                presenter.render_prompt(Prompt::Login)?;
            }
            Err(e.into())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobEnd {
    Finished,
    ServerClosed,
    Cancelled,
}

/// Renders a submitted job until it finishes, the server hangs up, or
/// `cancel` resolves.
async fn follow_job<C, W, F>(
    session: &mut JobSession<C>,
    presenter: &mut Presenter<W>,
    cancel: F,
) -> Result<JobEnd>
where
    C: Connector,
    W: Write,
    F: Future,
{
    tokio::pin!(cancel);
    presenter.render(session.state())?;

    while !session.state().is_finished() {
        let step = tokio::select! {
            step = session.next_step() => step,
            _ = &mut cancel => return Ok(JobEnd::Cancelled),
        };

        match step {
            Some(SessionStep::Updated { prompt }) => {
                presenter.render(session.state())?;
                if let Some(prompt) = prompt {
                    presenter.render_prompt(prompt)?;
                }
            }
            Some(SessionStep::ChannelClosed) | None => {
                warn!("Job server closed the connection before the job finished");
                return Ok(JobEnd::ServerClosed);
            }
        }
    }
    Ok(JobEnd::Finished)
}

fn conclude(state: &SessionState) -> Result<()> {
    match state.stage {
        SessionStage::Complete => Ok(()),
        SessionStage::Failed => bail!(state
            .error_message
            .clone()
            .unwrap_or_else(|| "Processing failed".to_string())),
        _ => bail!("Connection closed before the job finished"),
    }
}

fn require_token(app: &AppState) -> Result<()> {
    if app.token().is_none() {
        bail!(ui::prompt_text(Prompt::Login));
    }
    Ok(())
}

async fn require_user(app: &mut AppState) -> Result<&shared::User> {
    require_token(app)?;
    app.refresh_profile()
        .await?
        .context("Failed to fetch profile")
}

fn report_saved(saved: &[PathBuf]) {
    if saved.is_empty() {
        println!("No audio available.");
    }
    for path in saved {
        println!("Saved {}", path.display());
    }
}

fn show_config(config: &Config, config_path: Option<PathBuf>, init: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if init {
        if path.exists() {
            bail!("Config already exists at {}", path.display());
        }
        config.save_to(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
