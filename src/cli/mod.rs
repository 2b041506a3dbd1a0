use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub mod status;
pub use status::{StatusDisplay, TerminalDisplay};

/// Single-track WAV player
#[derive(Parser)]
#[command(name = "solo")]
#[command(about = "Play one audio clip at a time from the terminal")]
#[command(version)]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Debug, PartialEq, Subcommand)]
pub enum Commands {
    /// Load a file, stopped at the start
    Open {
        /// Path to a WAV file
        path: PathBuf,
    },
    /// Start playback, optionally loading a file first
    Play {
        /// Optional file to load before playing
        path: Option<PathBuf>,
    },
    /// Pause playback while preserving position
    Pause,
    /// Stop playback and reset position
    Stop,
    /// Skip ahead (default step from the configuration)
    #[command(alias = "ff")]
    Forward {
        /// Amount (e.g., "10", "10s", "0:10")
        amount: Option<String>,
    },
    /// Skip back (default step from the configuration)
    #[command(alias = "rew")]
    Rewind {
        /// Amount (e.g., "10", "10s", "0:10")
        amount: Option<String>,
    },
    /// Seek to specific time position
    Seek {
        /// Time offset (e.g., "1:30", "90", "90s")
        position: String,
    },
    /// Display current player status
    Status,
    /// Release the loaded track
    Close,
    /// List available audio output devices
    Devices,
    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Settings subcommands
#[derive(Debug, PartialEq, Subcommand)]
pub enum ConfigAction {
    /// Print the current settings and where they are stored
    Show,
    /// Set the output device used for the next open (omit for the default)
    Device {
        /// Device name as listed by `devices`
        name: Option<String>,
    },
    /// Set the default forward/rewind step
    Step {
        /// Amount (e.g., "10", "10s", "0:10")
        amount: String,
    },
    /// Restore default settings
    Reset,
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir.join(rest);
            }
        } else if path == "~" {
            return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
        }
        PathBuf::from(path)
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        let Some((&name, rest)) = args.split_first() else {
            return Err(ParseError::EmptyCommand);
        };
        let path_arg = || (!rest.is_empty()).then(|| Self::expand_path(&rest.join(" ")));
        let amount_arg = || rest.first().map(|s| s.to_string());

        match name {
            "open" | "load" => path_arg()
                .map(|path| Commands::Open { path })
                .ok_or_else(|| ParseError::MissingArgument {
                    command: name.to_string(),
                    argument: "path".to_string(),
                }),
            "play" => Ok(Commands::Play { path: path_arg() }),
            "pause" => Ok(Commands::Pause),
            "stop" => Ok(Commands::Stop),
            "forward" | "ff" => Ok(Commands::Forward { amount: amount_arg() }),
            "rewind" | "rew" => Ok(Commands::Rewind { amount: amount_arg() }),
            "seek" => amount_arg()
                .map(|position| Commands::Seek { position })
                .ok_or_else(|| ParseError::MissingArgument {
                    command: "seek".to_string(),
                    argument: "position".to_string(),
                }),
            "status" => Ok(Commands::Status),
            "close" => Ok(Commands::Close),
            "devices" => Ok(Commands::Devices),
            "config" => Self::parse_config_action(rest).map(|action| Commands::Config { action }),
            "help" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: name.to_string(),
            }),
        }
    }

    fn parse_config_action(args: &[&str]) -> Result<ConfigAction, ParseError> {
        let Some((&action, rest)) = args.split_first() else {
            return Err(ParseError::MissingArgument {
                command: "config".to_string(),
                argument: "action".to_string(),
            });
        };
        match action {
            "show" => Ok(ConfigAction::Show),
            "device" => Ok(ConfigAction::Device {
                name: (!rest.is_empty()).then(|| rest.join(" ")),
            }),
            "step" => rest
                .first()
                .map(|amount| ConfigAction::Step {
                    amount: amount.to_string(),
                })
                .ok_or_else(|| ParseError::MissingArgument {
                    command: "config step".to_string(),
                    argument: "amount".to_string(),
                }),
            "reset" => Ok(ConfigAction::Reset),
            _ => Err(ParseError::UnknownCommand {
                command: format!("config {}", action),
            }),
        }
    }

    /// Display help information
    pub fn display_help() {
        println!("Solo Player - Available Commands:");
        println!();
        println!("Playback Control:");
        println!("  open <path>      - Load a WAV file (stopped at 0:00)");
        println!("  play [path]      - Start playback (optionally load a file first)");
        println!("  pause            - Pause playback");
        println!("  stop             - Stop playback and reset position");
        println!("  forward [time]   - Skip ahead (default 5s)");
        println!("  rewind [time]    - Skip back (default 5s)");
        println!("  seek <time>      - Seek to position (e.g., '1:30', '90s')");
        println!("  close            - Release the loaded track");
        println!();
        println!("Information:");
        println!("  status           - Show current player status");
        println!("  devices          - List audio output devices");
        println!();
        println!("Settings:");
        println!("  config show           - Show saved settings");
        println!("  config device [name]  - Choose the output device (none = default)");
        println!("  config step <time>    - Set the default forward/rewind step");
        println!("  config reset          - Restore default settings");
        println!();
        println!("General:");
        println!("  help             - Show this help message");
        println!("  exit, quit       - Exit the player");
    }

    /// Parse time string to Duration: "1:30", "1:30.5", "90", "90s"
    pub fn parse_time(time_str: &str) -> Result<Duration, ParseError> {
        let trimmed = time_str.trim();
        let invalid = || ParseError::InvalidTimeFormat {
            input: time_str.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid());
        }

        let seconds = if let Some((minutes, seconds)) = trimmed.split_once(':') {
            let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
            let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            minutes as f64 * 60.0 + seconds
        } else {
            let seconds: f64 = trimmed
                .strip_suffix('s')
                .unwrap_or(trimmed)
                .parse()
                .map_err(|_| invalid())?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }
            seconds
        };

        Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
    }

    /// Parse a time string straight to microseconds
    pub fn parse_micros(time_str: &str) -> Result<u64, ParseError> {
        Self::parse_time(time_str).map(|d| d.as_micros().min(u64::MAX as u128) as u64)
    }
}

/// Format microseconds as `M:SS` (minutes unpadded)
pub fn format_time(micros: u64) -> String {
    let total_seconds = micros / 1_000_000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Remaining time label, `-M:SS`
pub fn format_remaining(position_micros: u64, total_micros: u64) -> String {
    format!("-{}", format_time(total_micros.saturating_sub(position_micros)))
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid time format: {input}")]
    InvalidTimeFormat { input: String },

    #[error("Help requested")]
    HelpRequested,
}
