use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::audio::PositionDisplay;
use crate::cli::{format_remaining, format_time};
use crate::error::{ErrorSeverity, PlayerError};
use crate::models::{PlaybackState, PlayerStatus, StatusMessage};

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display player status with position and progress
    pub fn display_full_status(status: &PlayerStatus) {
        println!("┌─ Player Status ─────────────────────────────────────────┐");

        if status.loaded {
            println!("│ Track: {}", Self::truncate(&status.display_name(), 50));
            if let Some(path) = &status.source {
                println!("│ Path: {}", Self::truncate(&path.display().to_string(), 51));
            }
            println!("│");
            println!("│ Status: {}", Self::format_playback_state(status.state));
            println!(
                "│ Position: {} / {}",
                format_time(status.position_micros),
                format_time(status.duration_micros)
            );
            println!(
                "│ Progress: [{}] {:.1}%",
                Self::create_progress_bar(status.progress(), 40),
                status.progress() * 100.0
            );
            println!(
                "│ Remaining: {}",
                Self::remaining_label(status)
            );
        } else {
            println!("│ No track loaded");
            println!("│ Status: {}", status.state.as_str());
        }

        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// One-line status
    pub fn display_compact_status(status: &PlayerStatus) {
        if status.loaded {
            println!(
                "{} | {} | {} / {} ({})",
                status.state.as_str(),
                Self::truncate(&status.display_name(), 30),
                format_time(status.position_micros),
                format_time(status.duration_micros),
                Self::remaining_label(status)
            );
        } else {
            println!("{} | No track loaded", status.state.as_str());
        }
    }

    fn remaining_label(status: &PlayerStatus) -> String {
        format!("-{}", format_time(status.remaining_micros()))
    }

    /// Display a recorded failure with its suggestions
    pub fn display_message(message: &StatusMessage) {
        eprintln!(
            "┌─ {} {} ─────────────────────────────────────────────────┐",
            Self::severity_icon(message.severity),
            message.severity.as_str()
        );
        for line in Self::wrap_text(&message.text, 55) {
            eprintln!("│ {}", line);
        }

        if !message.suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in message.suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }
        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    pub fn display_error(error: &PlayerError) {
        Self::display_message(&StatusMessage::from_error(error));
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &PlayerError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());
        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    fn severity_icon(severity: ErrorSeverity) -> &'static str {
        match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
            ErrorSeverity::Critical => "🔥",
        }
    }

    /// Wrap text to fit within specified width
    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.len() + word.len() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(std::mem::replace(&mut current_line, word.to_string()));
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
        lines
    }

    /// Truncate string to fit display width
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    pub fn create_progress_bar(progress: f32, width: usize) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * width as f32) as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    pub fn format_playback_state(state: PlaybackState) -> String {
        match state {
            PlaybackState::Playing => "▶ Playing".to_string(),
            PlaybackState::Paused => "⏸ Paused".to_string(),
            PlaybackState::Stopped => "⏹ Stopped".to_string(),
        }
    }
}

/// Position display drawn as a single self-overwriting terminal line.
///
/// Drawing can be switched off (interactive mode keeps the prompt clean);
/// the last pushed position is recorded either way.
pub struct TerminalDisplay {
    live: AtomicBool,
    last: Mutex<Option<(u64, u64)>>,
}

impl TerminalDisplay {
    pub fn new(live: bool) -> Self {
        Self {
            live: AtomicBool::new(live),
            last: Mutex::new(None),
        }
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    pub fn last_position(&self) -> Option<(u64, u64)> {
        self.last.lock().ok().and_then(|last| *last)
    }

    /// `0:03 [████░░░░] -0:07`
    pub fn render_line(current_micros: u64, total_micros: u64) -> String {
        let progress = if total_micros > 0 {
            current_micros as f32 / total_micros as f32
        } else {
            0.0
        };
        format!(
            "{} [{}] {}",
            format_time(current_micros),
            StatusDisplay::create_progress_bar(progress, 30),
            format_remaining(current_micros, total_micros)
        )
    }
}

impl PositionDisplay for TerminalDisplay {
    fn push_position(&self, current_micros: u64, total_micros: u64) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some((current_micros, total_micros));
        }
        if self.live.load(Ordering::SeqCst) {
            print!("\r{}", Self::render_line(current_micros, total_micros));
            let _ = io::stdout().flush();
        }
    }

    fn show_loaded(&self, total_micros: Option<u64>) {
        if total_micros.is_none() {
            if let Ok(mut last) = self.last.lock() {
                *last = None;
            }
        }
        if self.live.load(Ordering::SeqCst) {
            match total_micros {
                Some(total) => println!("\rLoaded ({})", format_time(total)),
                None => println!("\rNo track loaded"),
            }
        }
    }
}
