/// Skill facade driven by the voice assistant host
///
/// The host calls [`LocalMusicSkill::search`] with the user's sentence and,
/// if it picks this skill, [`LocalMusicSkill::play`]. The result bundle from
/// the search is kept in between.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Settings;
use crate::error::SkillError;
use crate::mpc_client::{MpcClient, SystemRunner};
use crate::music_info::{MatchType, Message, MusicInfo};
use crate::music_intent::{MusicIntentParser, RequestType};
use crate::news::{search_news, HttpNewsSource, NewsSource};
use crate::playlist_intent::parse_playlist_request;
use crate::track::Track;
use crate::web_search::{search_internet, MusicSearch, YouTubeSearch};

/// Confidence reported for every result
const MATCH_CONFIDENCE: u8 = 100;

/// How messages reach the user (text-to-speech in the host)
pub trait Announcer: Send + Sync {
    fn speak(&self, message: &Message);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Music,
    Audio,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackType {
    Audio,
}

/// One search result handed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub media_type: MediaType,
    pub playback: PlaybackType,
    pub image: Option<String>,
    pub skill_icon: String,
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub length: u64, // Milliseconds
    pub match_confidence: u8,
}

/// Plays local music, radio, internet music and news through `mpc`
pub struct LocalMusicSkill {
    mpc: MpcClient,
    settings: Settings,
    searcher: Box<dyn MusicSearch>,
    news: Box<dyn NewsSource>,
    announcer: Box<dyn Announcer>,
    music_info: MusicInfo,
}

impl LocalMusicSkill {
    pub fn new(
        mpc: MpcClient,
        settings: Settings,
        searcher: Box<dyn MusicSearch>,
        news: Box<dyn NewsSource>,
        announcer: Box<dyn Announcer>,
    ) -> Self {
        LocalMusicSkill {
            mpc,
            settings,
            searcher,
            news,
            announcer,
            music_info: MusicInfo::empty(),
        }
    }

    /// Wire the skill to the real `mpc`, video search and news page
    pub fn from_settings(mut settings: Settings, announcer: Box<dyn Announcer>) -> Result<Self, SkillError> {
        match settings.resolve_mpc() {
            Ok(path) => settings.mpc_path = path.display().to_string(),
            Err(e) => log::warn!("{}; will try to run {} anyway", e, settings.mpc_path),
        }

        let mpc = MpcClient::new(Arc::new(SystemRunner), &settings);
        let searcher = YouTubeSearch::from_settings(&settings)?;
        let news = HttpNewsSource::from_settings(&settings)?;
        Ok(Self::new(mpc, settings, Box::new(searcher), Box::new(news), announcer))
    }

    /// Prepare the player: keep playing after each track
    pub fn initialize(&self) {
        log::info!("Initializing local music skill");
        if self.mpc.initialize() != 0 {
            log::warn!("Could not turn off single mode");
        }
    }

    pub fn update_library(&self) -> Result<(), SkillError> {
        self.mpc.update_library(true)
    }

    /// Result bundle of the last search
    pub fn music_info(&self) -> &MusicInfo {
        &self.music_info
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Turn a sentence into search results
    ///
    /// Playlist operations and transport controls run here and return no
    /// results; their outcome is spoken by [`play`](Self::play).
    pub async fn search(&mut self, sentence: &str) -> Vec<MediaEntry> {
        let sentence = sentence.trim().to_lowercase();
        log::info!("search() sentence: {}", sentence);

        let request_type = MusicIntentParser::classify(&sentence);
        log::info!("search() request_type: {:?}", request_type);

        self.music_info = match request_type {
            RequestType::Control(control) => match self.mpc.control(control) {
                0 => MusicInfo::new(MatchType::Control, None, Some(Vec::new())),
                code => MusicInfo::new(
                    MatchType::Control,
                    Some(
                        Message::new("mpc_failed")
                            .with("cmd", control.mpc_verb())
                            .with("rc", code),
                    ),
                    Some(Vec::new()),
                ),
            },
            RequestType::PlaylistOp => self.mpc.manipulate_playlists(&sentence),
            RequestType::Music => self.search_music(&sentence).await,
            RequestType::Radio => self.mpc.play_radio(&sentence, &self.settings.stations_file),
            RequestType::Internet => {
                search_internet(self.searcher.as_ref(), &sentence, self.settings.internet_max_results).await
            }
            RequestType::Playlist => self.play_playlist(&sentence),
            RequestType::News => search_news(self.news.as_ref()).await,
        };
        log::info!(
            "search() match_type: {} message: {:?} tracks: {}",
            self.music_info.match_type,
            self.music_info.message_key(),
            self.music_info.track_count()
        );

        match &self.music_info.tracks {
            Some(tracks) => self.tracks_to_search_results(tracks),
            None => Vec::new(),
        }
    }

    /// Library first, then the internet
    async fn search_music(&self, sentence: &str) -> MusicInfo {
        let info = match self.mpc.lookup_library(sentence) {
            Ok(info) => info,
            // The player itself is broken
            Err(e) => return MusicInfo::from_error(&e),
        };
        if info.match_type != MatchType::None {
            return info;
        }

        log::info!("Not found in library, searching the internet");
        self.announcer
            .speak(&Message::new("searching_internet").with("sentence", sentence));
        search_internet(self.searcher.as_ref(), sentence, self.settings.internet_max_results).await
    }

    fn play_playlist(&self, sentence: &str) -> MusicInfo {
        let playlist_name = parse_playlist_request(sentence);
        if playlist_name.is_empty() {
            return MusicInfo::not_found(Message::new("playlist_name_missing"));
        }
        self.mpc
            .get_playlist(&playlist_name)
            .unwrap_or_else(|e| MusicInfo::from_error(&e))
    }

    pub fn tracks_to_search_results(&self, tracks: &[Track]) -> Vec<MediaEntry> {
        tracks
            .iter()
            .map(|track| MediaEntry {
                media_type: MediaType::Music,
                playback: PlaybackType::Audio,
                image: track.artwork.clone(),
                skill_icon: self.settings.skill_icon.clone(),
                uri: track.path.clone(),
                title: track.title.clone(),
                artist: track.artist.clone(),
                length: track.duration_ms,
                match_confidence: MATCH_CONFIDENCE,
            })
            .collect()
    }

    /// Queue and start the last search result, or speak why there is nothing to play
    ///
    /// Returns true when playback was started.
    pub fn play(&self) -> bool {
        let info = &self.music_info;
        log::info!("play() match_type: {}", info.match_type);

        match info.match_type {
            MatchType::None | MatchType::PlaylistOp | MatchType::Control => {
                if let Some(message) = &info.message {
                    self.announcer.speak(message);
                }
                return false;
            }
            // Already in the queue
            MatchType::Playlist => {
                self.mpc.set_random(true);
            }
            // Queued by the stream helper or already playing
            MatchType::Internet | MatchType::Next | MatchType::Prev => {}
            // Understood the request but found nothing to queue
            _ if info.tracks.is_none() => {
                if let Some(message) = &info.message {
                    self.announcer.speak(message);
                }
                return false;
            }
            _ => {
                self.mpc.clear();
                for track in info.tracks.iter().flatten() {
                    log::debug!("Adding to queue: {}", track.path);
                    self.mpc.add(&track.path);
                }
            }
        }

        if let Some(message) = &info.message {
            self.announcer.speak(message);
        }
        self.start_music()
    }

    fn start_music(&self) -> bool {
        let info = &self.music_info;
        match info.match_type {
            MatchType::Internet => {
                let tracks = info.tracks.as_deref().unwrap_or_default();
                match self.mpc.stream_internet_music(tracks, &self.settings.stream_helper) {
                    Ok(()) => true,
                    Err(e) => {
                        log::error!("Streaming internet music failed: {}", e);
                        false
                    }
                }
            }
            MatchType::Next => self.mpc.next() == 0,
            MatchType::Prev => self.mpc.prev() == 0,
            _ if !info.has_tracks() => {
                log::info!("Nothing to play");
                false
            }
            _ => self.mpc.play() == 0,
        }
    }
}
