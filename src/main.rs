use clap::Parser;
use color_eyre::Result;
use std::io::Write;
use std::path::Path;
use tasktrack::{Config, Profile, Tracker, cli::{Cli, Commands}, storage};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps config, database and logs apart from the real ones
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match &cli.config {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };

    let _logger = tasktrack::logging::init_logging(&config.log_level, &config.get_log_dir())?;

    // An unusable database still gives a working session, just not a saved one
    let opened = storage::open_or_memory(&config.get_database_path());
    let session_notice = opened
        .fallback_reason
        .as_ref()
        .map(|e| format!("Changes will not be saved: {}", e));
    let mut tracker = Tracker::load(opened.storage);

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let mut app = tasktrack::tui::App::new(config, tracker)?;
            if let Some(notice) = session_notice {
                app.set_status_message(notice);
            }
            tasktrack::tui::run_event_loop(app)?;
        }
        command => {
            let now = chrono::Local::now();
            let mut out = std::io::stdout();
            if let Some(notice) = session_notice {
                writeln!(out, "Note: {}", notice)?;
            }
            tasktrack::cli::run_command(command, &mut tracker, &now, &mut out)?;
        }
    }

    log::info!("event=app_exit status=ok");
    Ok(())
}
