use rand::seq::SliceRandom;
use rand::Rng;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::SkillError;
use crate::music_info::{MatchType, Message, MusicInfo};
use crate::music_intent::{LibraryParse, MusicIntentParser, MusicQuery, PlayerControl};
use crate::track::{parse_mpc_output, Track, MPC_TRACK_FORMAT};

/// Delay before `mpc play` so the queue settles after a burst of adds
const PLAY_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs external programs
///
/// The skill never goes through a shell: arguments are passed as-is.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, SkillError>;
}

/// Runs programs with `std::process::Command`
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, SkillError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| SkillError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Client for the Music Player Daemon through the `mpc` command line
///
/// Library lookups run `mpc search` / `mpc listall` and reshape the
/// tab-separated output into tracks. Queue and transport commands are
/// passed straight through.
pub struct MpcClient {
    runner: Arc<dyn CommandRunner>,
    mpc_path: String,
    music_uri: String,
    max_queued: usize,
    play_delay: Duration,
}

impl MpcClient {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: &Settings) -> Self {
        MpcClient {
            runner,
            mpc_path: settings.mpc_path.clone(),
            music_uri: settings.music_uri.clone(),
            max_queued: settings.max_queued,
            play_delay: PLAY_SETTLE_DELAY,
        }
    }

    /// Override the settle delay before `mpc play`
    pub fn with_play_delay(mut self, delay: Duration) -> Self {
        self.play_delay = delay;
        self
    }

    pub fn max_queued(&self) -> usize {
        self.max_queued
    }

    pub fn music_uri(&self) -> &str {
        &self.music_uri
    }

    /// Run `mpc` and return its output whatever the exit code
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput, SkillError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        log::info!("Running command: {} {}", self.mpc_path, args.join(" "));
        let output = self.runner.run(&self.mpc_path, &args)?;
        if !output.success() {
            log::error!(
                "mpc {} returned exit code {}: {}",
                args.join(" "),
                output.status,
                output.stderr.trim()
            );
        }
        Ok(output)
    }

    /// Run `mpc`, treating a non-zero exit code as an error
    pub fn check(&self, args: &[&str]) -> Result<String, SkillError> {
        let output = self.run(args)?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(SkillError::Player {
                cmd: command_label(args),
                code: output.status,
            })
        }
    }

    /// Run the stream helper, treating a non-zero exit code as an error
    pub fn run_external(&self, program: &str, args: &[&str]) -> Result<String, SkillError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        log::info!("Running command: {} {}", program, args.join(" "));
        let output = self.runner.run(program, &args)?;
        if !output.success() {
            log::error!("{} returned exit code {}: {}", program, output.status, output.stderr.trim());
            return Err(SkillError::StreamHelper {
                cmd: format!("{} {}", program, args.join(" ")),
                code: output.status,
            });
        }
        Ok(output.stdout)
    }

    /// Run any `mpc` command and return its exit code
    ///
    /// A command that cannot be started reports -1.
    pub fn mpc_cmd(&self, args: &[&str]) -> i32 {
        match self.run(args) {
            Ok(output) => output.status,
            Err(e) => {
                log::error!("mpc {} could not run: {}", args.join(" "), e);
                -1
            }
        }
    }

    /// Keep playing after the current track ends
    pub fn initialize(&self) -> i32 {
        self.mpc_cmd(&["single", "off"])
    }

    /// Rescan the music directory
    pub fn update_library(&self, wait: bool) -> Result<(), SkillError> {
        log::info!("Updating mpd database (wait: {})", wait);
        if wait {
            self.check(&["update", "--wait"])?;
        } else {
            self.check(&["update"])?;
        }
        Ok(())
    }

    pub fn clear(&self) -> i32 {
        self.mpc_cmd(&["clear"])
    }

    pub fn add(&self, uri: &str) -> i32 {
        self.mpc_cmd(&["add", uri])
    }

    /// Start playback after a short settle delay
    pub fn play(&self) -> i32 {
        if !self.play_delay.is_zero() {
            std::thread::sleep(self.play_delay);
        }
        self.mpc_cmd(&["play"])
    }

    pub fn next(&self) -> i32 {
        self.mpc_cmd(&["next"])
    }

    pub fn prev(&self) -> i32 {
        self.mpc_cmd(&["prev"])
    }

    pub fn set_random(&self, on: bool) -> i32 {
        self.mpc_cmd(&["random", on_off(on)])
    }

    pub fn set_repeat(&self, on: bool) -> i32 {
        self.mpc_cmd(&["repeat", on_off(on)])
    }

    pub fn control(&self, control: PlayerControl) -> i32 {
        log::info!("Player control: {:?}", control);
        self.mpc_cmd(&[control.mpc_verb()])
    }

    /// File names of the tracks in the current queue, in queue order
    pub fn queue_files(&self) -> Result<Vec<String>, SkillError> {
        let stdout = self.check(&["--format", "%file%", "playlist"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Search the library allowing any number of `(tag, value)` qualifiers
    ///
    /// `command` is `search`, `find` or `listall` (the whole library).
    pub fn search_music(&self, command: &str, qualifiers: &[(&str, &str)]) -> Result<Vec<Track>, SkillError> {
        log::info!("search_music: command: {} qualifiers: {:?}", command, qualifiers);
        let mut args = vec!["--format", MPC_TRACK_FORMAT, command];
        for &(tag, value) in qualifiers {
            args.push(tag);
            args.push(value);
        }
        let stdout = self.check(&args)?;
        let tracks = parse_mpc_output(&stdout, &self.music_uri);
        log::info!("search_music: {} hits", tracks.len());
        Ok(tracks)
    }

    /// Parse a play phrase and look the music up in the library
    pub fn search_library(&self, phrase: &str) -> MusicInfo {
        self.lookup_library(phrase)
            .unwrap_or_else(|e| MusicInfo::from_error(&e))
    }

    /// Like `search_library`, but player failures stay errors
    pub fn lookup_library(&self, phrase: &str) -> Result<MusicInfo, SkillError> {
        log::info!("lookup_library() phrase: {}", phrase);
        match MusicIntentParser::parse_library_phrase(phrase) {
            LibraryParse::NotEnoughInfo { phrase } => Ok(MusicInfo::new(
                MatchType::Song,
                Some(Message::new("not_enough_info").with("phrase", phrase)),
                None,
            )),
            LibraryParse::Query(query) => self.get_music(&query),
        }
    }

    /// Dispatch a parsed query to the matching lookup
    pub fn get_music(&self, query: &MusicQuery) -> Result<MusicInfo, SkillError> {
        log::info!("get_music() query: {:?}", query);
        match query {
            MusicQuery::Album { album } => self.get_album(album, None),
            MusicQuery::AlbumArtist { album, artist } => self.get_album(album, Some(artist)),
            MusicQuery::Artist { artist } => self.get_artist(artist),
            MusicQuery::Genre { genre } => self.get_genre(genre),
            MusicQuery::AllMusic => self.get_all_music(),
            MusicQuery::Playlist { playlist } => self.get_playlist(playlist),
            MusicQuery::Track { track } => self.get_track(track, None),
            MusicQuery::TrackArtist { track, artist } => self.get_track(track, Some(artist)),
            MusicQuery::Unknown { music } => self.get_unknown_music(music, None),
            MusicQuery::UnknownArtist { music, artist } => self.get_unknown_music(music, Some(artist)),
        }
    }

    /// All tracks of one album, optionally by a specific artist
    pub fn get_album(&self, album_name: &str, artist_name: Option<&str>) -> Result<MusicInfo, SkillError> {
        log::info!("get_album() album_name: {} artist_name: {:?}", album_name, artist_name);
        let results = match artist_name {
            Some(artist) => self.search_music("search", &[("album", album_name), ("artist", artist)])?,
            None => self.search_music("search", &[("album", album_name)])?,
        };

        let Some(first) = results.first() else {
            log::info!("Did not find an album matching {}", album_name);
            let mut message = Message::new("music_not_found")
                .with("music_name", album_name)
                .with("album_name", album_name);
            if let Some(artist) = artist_name {
                message = message.with("artist_name", artist);
            }
            return Ok(MusicInfo::not_found(message));
        };

        let wrong_artist = artist_name.and_then(|wanted| {
            results
                .iter()
                .find(|t| t.artist_key() != wanted)
                .map(|t| t.artist.clone())
        });

        let message = match wrong_artist {
            Some(artist_found) => {
                log::info!("Playing album {} by {} instead", album_name, artist_found);
                Message::new("diff_album_artist")
                    .with("album_name", album_name)
                    .with("artist_found", artist_found)
            }
            None => Message::new("playing_album")
                .with("album_name", &first.album)
                .with("artist_name", &first.artist),
        };

        self.set_repeat(false);
        Ok(MusicInfo::found(MatchType::Album, message, results))
    }

    /// Up to `max_queued` shuffled tracks by an exact artist name
    pub fn get_artist(&self, artist_name: &str) -> Result<MusicInfo, SkillError> {
        log::info!("get_artist() artist_name: {}", artist_name);
        let mut results = self.search_music("search", &[("artist", artist_name)])?;
        results.shuffle(&mut rand::thread_rng());

        let tracks: Vec<Track> = results
            .into_iter()
            .filter(|t| {
                let exact = t.artist_key() == artist_name;
                if !exact {
                    log::debug!("Skipping artist that does not match: {}", t.artist);
                }
                exact
            })
            .take(self.max_queued)
            .collect();

        let message = Message::new("playing_artist").with("artist_name", artist_name);
        if tracks.is_empty() {
            log::info!("Did not find an artist matching {}", artist_name);
            return Ok(MusicInfo::not_found(
                Message::new("artist_not_found").with("artist_name", artist_name),
            ));
        }

        self.set_repeat(true);
        Ok(MusicInfo::found(MatchType::Artist, message, tracks))
    }

    /// Up to `max_queued` random tracks from the whole library
    pub fn get_all_music(&self) -> Result<MusicInfo, SkillError> {
        log::info!("get_all_music() getting random tracks");
        let mut results = self.search_music("listall", &[])?;
        if results.is_empty() {
            log::info!("Did not find any music");
            return Ok(MusicInfo::not_found(
                Message::new("music_not_found").with("music_name", "all music"),
            ));
        }

        results.shuffle(&mut rand::thread_rng());
        results.truncate(self.max_queued);

        self.set_repeat(true);
        let message = Message::new("playing_random").with("num_hits", results.len());
        Ok(MusicInfo::found(MatchType::Random, message, results))
    }

    /// Up to `max_queued` shuffled tracks of a genre
    pub fn get_genre(&self, genre_name: &str) -> Result<MusicInfo, SkillError> {
        log::info!("get_genre() genre_name: {}", genre_name);
        let mut results = self.search_music("search", &[("genre", genre_name)])?;
        if results.is_empty() {
            log::info!("Did not find genre {}", genre_name);
            return Ok(MusicInfo::not_found(
                Message::new("genre_not_found").with("genre_name", genre_name),
            ));
        }

        results.shuffle(&mut rand::thread_rng());
        results.truncate(self.max_queued);

        self.set_repeat(true);
        let message = Message::new("playing_genre").with("genre_name", genre_name);
        Ok(MusicInfo::found(MatchType::Genre, message, results))
    }

    /// A track by title, optionally by a specific artist
    pub fn get_track(&self, track_name: &str, artist_name: Option<&str>) -> Result<MusicInfo, SkillError> {
        log::info!("get_track() track_name: {} artist_name: {:?}", track_name, artist_name);
        let mut results = match artist_name {
            Some(artist) => self.search_music("search", &[("title", track_name), ("artist", artist)])?,
            None => self.search_music("search", &[("title", track_name)])?,
        };

        if results.is_empty() {
            log::info!("Did not find a track matching {}", track_name);
            let message = match artist_name {
                Some(artist) => Message::new("track_artist_not_found")
                    .with("track_name", track_name)
                    .with("artist_name", artist),
                None => Message::new("track_not_found").with("track_name", track_name),
            };
            return Ok(MusicInfo::not_found(message));
        }

        // Exact title and artist: play just that one
        if let Some(artist) = artist_name {
            if let Some(exact) = results
                .iter()
                .find(|t| t.title_key() == track_name && t.artist_key() == artist)
            {
                log::info!("Exact match: {} by {}", exact.title, exact.artist);
                self.set_repeat(false);
                let message = Message::new("playing_track")
                    .with("track_name", track_name)
                    .with("artist_name", &exact.artist)
                    .with("album_name", &exact.album);
                return Ok(MusicInfo::found(MatchType::Track, message, vec![exact.clone()]));
            }
        }

        let exact_titles: Vec<&Track> = results.iter().filter(|t| t.title_key() == track_name).collect();
        log::info!("get_track() exact title hits: {}", exact_titles.len());

        if let [found] = exact_titles.as_slice() {
            let found = (*found).clone();
            self.set_repeat(false);
            let message = match artist_name {
                Some(artist) if found.artist_key() != artist => {
                    log::info!("Found track {} by {} not by {}", track_name, found.artist, artist);
                    Message::new("diff_artist")
                        .with("track_name", track_name)
                        .with("album_name", &found.album)
                        .with("artist_found", &found.artist)
                }
                _ => Message::new("playing_track")
                    .with("track_name", track_name)
                    .with("artist_name", &found.artist)
                    .with("album_name", &found.album),
            };
            return Ok(MusicInfo::found(MatchType::Song, message, vec![found]));
        }

        results.truncate(self.max_queued);
        self.set_repeat(true);
        let message = Message::new("found_tracks")
            .with("track_name", track_name)
            .with("num_hits", results.len());
        Ok(MusicInfo::found(MatchType::Song, message, results))
    }

    /// Music named without a keyword: try artist, then album, then title
    pub fn get_unknown_music(&self, music_name: &str, artist_name: Option<&str>) -> Result<MusicInfo, SkillError> {
        log::info!("get_unknown_music() music_name: {} artist_name: {:?}", music_name, artist_name);

        for music_type in ["artist", "album", "title"] {
            // An artist was already named, so the music is an album or a track
            if music_type == "artist" && artist_name.is_some() {
                continue;
            }

            let mut qualifiers = vec![(music_type, music_name)];
            if let Some(artist) = artist_name {
                qualifiers.push(("artist", artist));
            }
            let mut results = self.search_music("search", &qualifiers)?;
            if results.is_empty() {
                continue;
            }
            log::info!("get_unknown_music() {} hits as {}", results.len(), music_type);

            match music_type {
                "artist" => {
                    results.retain(|t| t.artist_key() == music_name);
                    if results.is_empty() {
                        continue;
                    }
                    results.shuffle(&mut rand::thread_rng());
                    results.truncate(self.max_queued);
                    self.set_repeat(true);
                    let message = Message::new("playing_artist").with("artist_name", &results[0].artist);
                    return Ok(MusicInfo::found(MatchType::Artist, message, results));
                }
                "album" => {
                    self.set_repeat(false);
                    let message = Message::new("playing_album")
                        .with("album_name", &results[0].album)
                        .with("artist_name", &results[0].artist);
                    return Ok(MusicInfo::found(MatchType::Album, message, results));
                }
                _ => {
                    let index = rand::thread_rng().gen_range(0..results.len());
                    let track = results.swap_remove(index);
                    log::info!("get_unknown_music() picked track {}", track.path);
                    self.set_repeat(false);
                    let message = Message::new("playing_track")
                        .with("track_name", &track.title)
                        .with("album_name", &track.album)
                        .with("artist_name", &track.artist);
                    return Ok(MusicInfo::found(MatchType::Song, message, vec![track]));
                }
            }
        }

        log::info!("Did not find music matching {}", music_name);
        Ok(MusicInfo::not_found(
            Message::new("music_not_found").with("music_name", music_name),
        ))
    }
}

/// Arguments without a leading `--format <fmt>` pair, for messages
fn command_label(args: &[&str]) -> String {
    match args {
        ["--format", _, rest @ ..] => rest.join(" "),
        _ => args.join(" "),
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
