use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use shared::{PaymentHistoryItem, Prompt, SessionStage, SessionState, UsageHistoryItem, User};
use std::io::{self, Write};

const BAR_TEMPLATE: &str = "[{bar:30.cyan/blue}] {pos:>3}% {msg}";
const PARTIAL_CHARS: usize = 80;

/// Drives a terminal progress bar from session state and prints partial text
/// and outcomes to `out`.
pub struct Presenter<W: Write> {
    out: W,
    bar: ProgressBar,
    show_partial_text: bool,
    last_transcript: String,
    last_translation: String,
}

impl Presenter<io::Stdout> {
    pub fn stdout(show_partial_text: bool) -> Result<Self> {
        Self::new(io::stdout(), show_partial_text, ProgressDrawTarget::stderr())
    }
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W, show_partial_text: bool, target: ProgressDrawTarget) -> Result<Self> {
        let bar = ProgressBar::with_draw_target(Some(100), target);
        bar.set_style(ProgressStyle::with_template(BAR_TEMPLATE)?.progress_chars("#>-"));

        Ok(Self {
            out,
            bar,
            show_partial_text,
            last_transcript: String::new(),
            last_translation: String::new(),
        })
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    #[cfg(test)]
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn render(&mut self, state: &SessionState) -> io::Result<()> {
        if !state.is_processing() {
            return Ok(());
        }

        self.bar.set_position(u64::from(state.overall_percent));
        self.bar.set_message(state.label.clone());

        if !self.show_partial_text {
            return Ok(());
        }
        if state.transcript != self.last_transcript {
            self.last_transcript.clone_from(&state.transcript);
            if !state.transcript.is_empty() {
                let line = format!("  transcript: {}", tail(&state.transcript, PARTIAL_CHARS));
                self.print_line(&line)?;
            }
        }
        if state.translation != self.last_translation {
            self.last_translation.clone_from(&state.translation);
            if !state.translation.is_empty() {
                let line = format!("  translation: {}", tail(&state.translation, PARTIAL_CHARS));
                self.print_line(&line)?;
            }
        }
        Ok(())
    }

    pub fn render_outcome(&mut self, state: &SessionState, target_language: &str) -> io::Result<()> {
        self.bar.finish_and_clear();

        match state.stage {
            SessionStage::Complete => {
                writeln!(self.out, "Processing complete!")?;
                writeln!(self.out)?;
                writeln!(self.out, "== Transcript ({}) ==", state.detected_language)?;
                writeln!(self.out, "{}", state.transcript)?;
                writeln!(self.out)?;
                writeln!(self.out, "== Translation ({}) ==", target_language)?;
                writeln!(self.out, "{}", state.translation)?;
            }
            SessionStage::Failed => {
                let message = state.error_message.as_deref().unwrap_or("Processing failed");
                writeln!(self.out, "Error: {}", message)?;
            }
            _ => {}
        }
        self.out.flush()
    }

    pub fn render_prompt(&mut self, prompt: Prompt) -> io::Result<()> {
        self.print_line(prompt_text(prompt))
    }

    /// Writes a line above the bar without tearing it.
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        let out = &mut self.out;
        self.bar.suspend(|| {
            writeln!(out, "{}", line)?;
            out.flush()
        })
    }
}

pub fn prompt_text(prompt: Prompt) -> &'static str {
    match prompt {
        Prompt::Upgrade => {
            "Usage limit reached. Upgrade your plan or store your own OpenAI API key with `voxlate set-api-key`."
        }
        Prompt::Login => "Please log in with `voxlate login` to continue.",
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let skipped: String = text.chars().skip(count - max_chars).collect();
    format!("...{}", skipped)
}

pub fn print_profile(user: &User) {
    println!("{} <{}>", user.name, user.email);
    println!("  plan:          {}", user.subscription);
    println!(
        "  usage today:   {} / {} ({} left)",
        user.daily_usage,
        user.usage_limit,
        user.remaining_today()
    );
    println!("  total usage:   {}", user.total_usage);
    println!(
        "  stored key:    {}",
        if user.is_api_key_available { "yes" } else { "no" }
    );
}

pub fn print_history(items: &[UsageHistoryItem]) {
    if items.is_empty() {
        println!("No usage history yet.");
        return;
    }
    for item in items {
        println!(
            "{}  {:<24}  {:<12} {:<10} {:>6} tokens  {}",
            item.id,
            item.created_at,
            item.kind,
            item.target_language.as_deref().unwrap_or("-"),
            item.tokens_used,
            item.source_url.as_deref().unwrap_or(&item.source_type),
        );
    }
}

pub fn print_history_item(item: &UsageHistoryItem) {
    println!("{} ({}, {})", item.id, item.kind, item.created_at);
    if let Some(url) = &item.source_url {
        println!("source: {}", url);
    }
    println!();
    println!(
        "== Original ({}) ==",
        item.initial_language.as_deref().unwrap_or("Auto-detected")
    );
    println!("{}", item.source_text);
    println!();
    println!(
        "== Result ({}) ==",
        item.target_language.as_deref().unwrap_or("-")
    );
    println!("{}", item.result_text);
}

pub fn print_payments(items: &[PaymentHistoryItem]) {
    if items.is_empty() {
        println!("No payments yet.");
        return;
    }
    for item in items {
        println!(
            "{}  {:<24}  {:>8.2} {:<4} {:<10} {:<10} {}",
            item.transaction_id,
            item.created_at,
            item.amount,
            item.currency.to_uppercase(),
            item.status,
            item.subscription_plan,
            item.payment_method,
        );
    }
}
