use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use solo_player::audio::ClipBackend;
use solo_player::cli::{
    format_time, CliApp, Commands, ConfigAction, ParseError, StatusDisplay, TerminalDisplay,
};
use solo_player::config::ConfigManager;
use solo_player::controller::PlayerController;
use solo_player::error::{ConfigError, PlayerError};
use solo_player::logging;
use solo_player::models::PlaybackState;

/// Wires the terminal display, the configuration and the player together
pub struct AppController {
    controller: PlayerController,
    backend: Arc<ClipBackend>,
    display: Arc<TerminalDisplay>,
    config_manager: Option<ConfigManager>,
    shutdown: Arc<AtomicBool>,
}

impl AppController {
    /// Without a config manager, defaults are used and settings cannot be saved
    pub fn new(config_manager: Option<ConfigManager>, live_display: bool) -> Self {
        let config = config_manager
            .as_ref()
            .map(|manager| manager.get_config().clone())
            .unwrap_or_default();
        let display = Arc::new(TerminalDisplay::new(live_display));
        let backend = Arc::new(ClipBackend::new(config.preferred_device.clone()));
        let controller = PlayerController::new(backend.clone(), display.clone(), &config);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || {
            println!("\nReceived interrupt signal. Shutting down gracefully...");
            shutdown_flag.store(true, Ordering::SeqCst);
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }

        info!("Application controller initialized");
        Self {
            controller,
            backend,
            display,
            config_manager,
            shutdown,
        }
    }

    /// Load `path` and announce it. Failures surface through `flush_status`.
    fn open(&self, path: &Path) -> bool {
        let loaded = self.controller.load(path);
        if loaded {
            let status = self.controller.status();
            println!(
                "Loaded: {} ({})",
                status.display_name(),
                format_time(status.duration_micros)
            );
        }
        loaded
    }

    fn skip_amount(&self, amount: Option<String>) -> Result<u64, ParseError> {
        match amount {
            Some(amount) => CliApp::parse_micros(&amount),
            None => Ok(self.controller.skip_step_micros()),
        }
    }

    fn require_loaded(&self) -> bool {
        let loaded = self.controller.status().loaded;
        if !loaded {
            println!("No track loaded. Use 'open <path>' first.");
        }
        loaded
    }

    /// Execute a single command
    pub fn execute_command(&mut self, command: Commands) -> Result<(), PlayerError> {
        match command {
            Commands::Open { path } => {
                self.open(&path);
            }
            Commands::Play { path } => {
                if let Some(path) = path {
                    if !self.open(&path) {
                        self.flush_status();
                        return Ok(());
                    }
                }
                if self.require_loaded() {
                    self.controller.play();
                    println!("Playing: {}", self.controller.status().display_name());
                }
            }
            Commands::Pause => {
                self.controller.pause();
                StatusDisplay::display_compact_status(&self.controller.status());
            }
            Commands::Stop => {
                self.controller.stop();
                StatusDisplay::display_compact_status(&self.controller.status());
            }
            Commands::Forward { amount } => {
                let delta = self.skip_amount(amount)?;
                if self.require_loaded() {
                    self.controller.fast_forward(delta);
                    println!("Position: {}", format_time(self.controller.status().position_micros));
                }
            }
            Commands::Rewind { amount } => {
                let delta = self.skip_amount(amount)?;
                if self.require_loaded() {
                    self.controller.rewind(delta);
                    println!("Position: {}", format_time(self.controller.status().position_micros));
                }
            }
            Commands::Seek { position } => {
                let micros = CliApp::parse_micros(&position)?;
                if self.require_loaded() {
                    self.controller.set_position(micros);
                    println!("Seeked to: {}", format_time(self.controller.status().position_micros));
                }
            }
            Commands::Status => {
                StatusDisplay::display_full_status(&self.controller.status());
            }
            Commands::Close => {
                self.controller.close();
                println!("OK: Closed");
            }
            Commands::Devices => {
                let devices = ClipBackend::list_output_devices()?;
                if devices.is_empty() {
                    println!("No output devices found");
                }
                let preferred = self.backend.preferred_device();
                for device in devices {
                    let marker = if preferred.as_deref() == Some(device.as_str()) { "*" } else { " " };
                    println!("{} {}", marker, device);
                }
            }
            Commands::Config { action } => self.execute_config(action)?,
        }
        self.flush_status();
        Ok(())
    }

    fn config_manager(&mut self) -> Result<&mut ConfigManager, ConfigError> {
        self.config_manager.as_mut().ok_or(ConfigError::ConfigDirNotFound)
    }

    fn execute_config(&mut self, action: ConfigAction) -> Result<(), PlayerError> {
        match action {
            ConfigAction::Show => {
                let manager = self.config_manager()?;
                let config = manager.get_config().clone();
                println!("Settings file: {}", manager.config_path().display());
                println!("  poll interval:   {}ms", config.poll_interval_ms);
                println!("  skip step:       {}", format_time(config.skip_step_micros()));
                println!("  display unit:    {}us", config.display_unit_micros);
                println!(
                    "  output device:   {}",
                    config.preferred_device.as_deref().unwrap_or("default")
                );
            }
            ConfigAction::Device { name } => {
                self.config_manager()?.set_preferred_device(name.clone())?;
                println!(
                    "Output device set to {} (used from the next open)",
                    name.as_deref().unwrap_or("default")
                );
                self.backend.set_preferred_device(name);
            }
            ConfigAction::Step { amount } => {
                let step_ms = CliApp::parse_micros(&amount)? / 1000;
                let manager = self.config_manager()?;
                manager.set_skip_step_ms(step_ms)?;
                let step_micros = manager.get_config().skip_step_micros();
                self.controller.set_skip_step_micros(step_micros);
                println!("Skip step set to {}", format_time(step_micros));
            }
            ConfigAction::Reset => {
                let manager = self.config_manager()?;
                manager.reset_to_defaults()?;
                let config = manager.get_config().clone();
                self.controller.set_skip_step_micros(config.skip_step_micros());
                self.backend.set_preferred_device(config.preferred_device);
                println!("Settings restored to defaults");
            }
        }
        Ok(())
    }

    /// Show and clear the controller's last failure
    fn flush_status(&self) {
        if let Some(message) = self.controller.take_last_status() {
            StatusDisplay::display_message(&message);
        }
    }

    /// Block until the track stops playing or Ctrl-C
    pub async fn wait_for_playback(&self) {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            if self.controller.status().state != PlaybackState::Playing {
                break;
            }
        }
        println!();
    }

    /// Run interactive mode
    pub async fn run_interactive_mode(&mut self) -> Result<(), PlayerError> {
        println!("Solo Player v{}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Option<String>>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => {
                        let _ = tx.send(None);
                        break;
                    }
                    Ok(_) => {
                        if tx.send(Some(line.trim().to_string())).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut interval = tokio::time::interval(Duration::from_millis(100));
        let mut awaiting_input = false;
        let mut was_playing = false;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            if !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                line = rx.recv() => {
                    awaiting_input = false;
                    let Some(Some(line)) = line else {
                        println!();
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    if line == "exit" || line == "quit" {
                        println!("Goodbye!");
                        break;
                    }
                    match CliApp::parse_command(&line) {
                        Ok(command) => {
                            if let Err(e) = self.execute_command(command) {
                                StatusDisplay::display_error(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            println!("Type 'help' for available commands.");
                        }
                    }
                }

                _ = interval.tick() => {
                    let playing = self.controller.status().state == PlaybackState::Playing;
                    if was_playing && !playing {
                        if let Some((position, total)) = self.display.last_position() {
                            if total > 0 && position >= total {
                                println!("\nTrack finished");
                                StatusDisplay::display_compact_status(&self.controller.status());
                                awaiting_input = false;
                            }
                        }
                    }
                    was_playing = playing;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Release the output line before exit
    pub fn shutdown(&mut self) {
        println!("Shutting down...");
        self.controller.close();
        self.display.set_live(false);
    }
}

fn load_config() -> Option<ConfigManager> {
    match ConfigManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            StatusDisplay::display_simple_error(&PlayerError::from(e));
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), PlayerError> {
    if let Err(e) = logging::init() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let cli = CliApp::parse();
    let config_manager = load_config();

    match cli.command {
        Some(command) => {
            let waits = matches!(command, Commands::Play { .. });
            let mut app = AppController::new(config_manager, waits);
            if let Err(e) = app.execute_command(command) {
                StatusDisplay::display_simple_error(&e);
                std::process::exit(1);
            }
            if waits {
                app.wait_for_playback().await;
            }
            app.controller.close();
        }
        None => {
            let mut app = AppController::new(config_manager, false);
            app.run_interactive_mode().await?;
        }
    }

    info!("Application shutdown complete");
    Ok(())
}
