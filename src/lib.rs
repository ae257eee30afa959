pub mod config;
pub mod dialog;
pub mod error;
pub mod mpc_client;
pub mod music_info;
pub mod music_intent;
pub mod news;
pub mod playlist_intent;
pub mod playlists;
pub mod radio;
pub mod skill;
pub mod track;
pub mod web_search;

pub use config::Settings;
pub use error::SkillError;
pub use music_info::{MatchType, Message, MusicInfo};
pub use skill::{Announcer, LocalMusicSkill, MediaEntry};

use std::process::ExitCode;

use clap::Parser;

/// Prints what the skill would say
pub struct ConsoleAnnouncer;

impl Announcer for ConsoleAnnouncer {
    fn speak(&self, message: &Message) {
        log::debug!("Speaking {:?}", message);
        println!("{}", dialog::render(message));
    }
}

/// Play local music, radio and playlists through mpc
#[derive(Parser, Debug)]
#[command(name = "local-music-skill")]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Search only: print the results without playing them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Rescan the music directory first
    #[arg(short, long)]
    update: bool,

    /// What the user said, e.g. "play album abbey road"
    #[arg(required = true)]
    utterance: Vec<String>,
}

impl CliArgs {
    fn sentence(&self) -> String {
        self.utterance.join(" ")
    }
}

/// Command line entry point: search for the utterance, then play the result
pub async fn run() -> ExitCode {
    env_logger::init();

    let cli = CliArgs::parse();

    log::info!("=== Local Music Skill ===");
    let settings = Settings::load().unwrap_or_else(|e| {
        log::warn!("Failed to load settings, using defaults: {}", e);
        Settings::default()
    });

    let mut skill = match LocalMusicSkill::from_settings(settings, Box::new(ConsoleAnnouncer)) {
        Ok(skill) => skill,
        Err(e) => {
            log::error!("✗ Failed to start: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    skill.initialize();

    if cli.update {
        if let Err(e) = skill.update_library() {
            log::error!("✗ Library update failed: {}", e);
        }
    }

    let entries = skill.search(&cli.sentence()).await;
    log::info!("Search returned {} entries", entries.len());

    if cli.dry_run {
        let info = skill.music_info();
        println!("match_type: {}", info.match_type);
        if let Some(message) = &info.message {
            println!("message: {}", dialog::render(message));
        }
        match serde_json::to_string_pretty(&entries) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize results: {}", e),
        }
        return ExitCode::SUCCESS;
    }

    let played = skill.play();
    let handled = matches!(skill.music_info().match_type, MatchType::PlaylistOp | MatchType::Control);
    if played || handled {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
