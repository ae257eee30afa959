/// Saved playlist management
///
/// `mpc` cannot edit a stored playlist in place, so every edit loads the
/// playlist into the queue, changes the queue, removes the stored copy and
/// saves the queue under the same name.

use crate::error::SkillError;
use crate::mpc_client::MpcClient;
use crate::music_info::{MatchType, Message, MusicInfo};
use crate::music_intent::normalize_playlist_name;
use crate::playlist_intent::{parse_playlist_command, PlaylistCommand};
use crate::track::Track;

impl MpcClient {
    /// List, create, add to, remove from and delete playlists
    ///
    /// Always returns a `playlist_op` bundle; the message says what happened.
    pub fn manipulate_playlists(&self, utterance: &str) -> MusicInfo {
        log::info!("manipulate_playlists() utterance: {}", utterance);
        let command = parse_playlist_command(utterance);
        log::debug!("Playlist command: {:?}", command);

        let result = match command {
            PlaylistCommand::Create { playlist } => self.create_playlist(&playlist),
            PlaylistCommand::Delete { playlist } => self.delete_playlist(&playlist),
            PlaylistCommand::AddMusic { music, playlist } => self.add_to_playlist(&music, &playlist),
            PlaylistCommand::RemoveMusic { music, playlist } => self.delete_from_playlist(&music, &playlist),
            PlaylistCommand::List => self.list_playlists(),
            PlaylistCommand::MissingName => Ok(Message::new("playlist_name_missing")),
            PlaylistCommand::MissingToPlaylist => Ok(Message::new("to_playlist_missing")),
            PlaylistCommand::MissingFromPlaylist => Ok(Message::new("from_playlist_missing")),
            PlaylistCommand::Unrecognized => {
                Ok(Message::new("playlist_op_not_understood").with("utterance", utterance))
            }
        };

        let message = result.unwrap_or_else(|e| {
            log::error!("Playlist operation failed: {}", e);
            Message::from_error(&e)
        });
        log::info!("manipulate_playlists() message: {:?}", message);
        MusicInfo::playlist_op(message)
    }

    /// Load a playlist into the queue and return its files
    pub fn get_playlist(&self, playlist_name: &str) -> Result<MusicInfo, SkillError> {
        let playlist_name = normalize_playlist_name(playlist_name);
        log::info!("get_playlist() playlist_name: {}", playlist_name);

        self.clear();
        if !self.load_playlist(&playlist_name) {
            return Ok(MusicInfo::not_found(
                Message::new("playlist_not_found").with("playlist_name", &playlist_name),
            ));
        }

        let files = self.queue_files()?;
        if files.is_empty() {
            log::info!("Playlist {} is empty", playlist_name);
            return Ok(MusicInfo::new(
                MatchType::EmptyPlaylist,
                Some(Message::new("empty_playlist").with("playlist_name", &playlist_name)),
                Some(Vec::new()),
            ));
        }

        let tracks: Vec<Track> = files.into_iter().map(Track::from_uri).collect();
        log::info!("Playlist {} has {} tracks", playlist_name, tracks.len());
        Ok(MusicInfo::found(
            MatchType::Playlist,
            Message::new("playing_playlist").with("playlist_name", &playlist_name),
            tracks,
        ))
    }

    /// Names of all saved playlists
    pub fn playlist_names(&self) -> Result<Vec<String>, SkillError> {
        let stdout = self.check(&["lsplaylists"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Save the current queue as a new playlist
    pub fn create_playlist(&self, phrase: &str) -> Result<Message, SkillError> {
        let playlist_name = normalize_playlist_name(phrase);
        log::info!("create_playlist() playlist_name: {}", playlist_name);

        if self.playlist_names()?.contains(&playlist_name) {
            log::info!("Playlist already exists: {}", playlist_name);
            return Ok(Message::new("playlist_exists").with("playlist_name", &playlist_name));
        }

        self.check(&["save", &playlist_name])?;
        Ok(Message::new("created_playlist").with("playlist_name", phrase))
    }

    pub fn delete_playlist(&self, phrase: &str) -> Result<Message, SkillError> {
        let playlist_name = normalize_playlist_name(phrase);
        log::info!("delete_playlist() playlist_name: {}", playlist_name);

        if self.mpc_cmd(&["rm", &playlist_name]) != 0 {
            return Ok(Message::new("playlist_not_found").with("playlist_name", &playlist_name));
        }
        self.clear();
        Ok(Message::new("deleted_playlist").with("playlist_name", &playlist_name))
    }

    /// Add a track or an album to an existing playlist
    pub fn add_to_playlist(&self, music_name: &str, playlist: &str) -> Result<Message, SkillError> {
        let playlist_name = normalize_playlist_name(playlist);
        log::info!("add_to_playlist() music_name: {} playlist_name: {}", music_name, playlist_name);

        self.clear();
        if !self.load_playlist(&playlist_name) {
            log::info!("Did not find playlist {}", playlist_name);
            return Ok(Message::new("playlist_not_found").with("playlist_name", &playlist_name));
        }

        let found = self.search_library(music_name);
        let Some(tracks) = found.tracks.filter(|t| !t.is_empty()) else {
            log::info!("Did not find music {}", music_name);
            return Ok(Message::new("music_not_found").with("music_name", music_name));
        };

        // mpc happily adds duplicates
        for track in &tracks {
            self.check(&["add", &track.path])?;
        }
        self.resave_playlist(&playlist_name)?;

        Ok(Message::new("added_to_playlist")
            .with("music_name", music_name)
            .with("playlist_name", &playlist_name))
    }

    /// Remove a track or an album from an existing playlist
    pub fn delete_from_playlist(&self, music_name: &str, playlist: &str) -> Result<Message, SkillError> {
        let playlist_name = normalize_playlist_name(playlist);
        log::info!("delete_from_playlist() music_name: {} playlist_name: {}", music_name, playlist_name);

        self.clear();
        if !self.load_playlist(&playlist_name) {
            log::info!("Did not find playlist {}", playlist_name);
            return Ok(Message::new("playlist_not_found").with("playlist_name", &playlist_name));
        }

        let found = self.search_library(music_name);
        let Some(tracks) = found.tracks.filter(|t| !t.is_empty()) else {
            log::info!("Did not find music {}", music_name);
            return Ok(missing_track(music_name, &playlist_name));
        };

        let wanted: Vec<&str> = tracks.iter().map(|t| self.relative_path(&t.path)).collect();
        let positions: Vec<usize> = self
            .queue_files()?
            .iter()
            .enumerate()
            .filter(|(_, file)| wanted.contains(&self.relative_path(file)))
            .map(|(index, _)| index + 1)
            .collect();

        if positions.is_empty() {
            log::info!("{} is not in playlist {}", music_name, playlist_name);
            return Ok(missing_track(music_name, &playlist_name));
        }

        // Highest position first so earlier positions stay valid
        for position in positions.iter().rev() {
            self.check(&["del", &position.to_string()])?;
        }
        self.resave_playlist(&playlist_name)?;

        Ok(Message::new("deleted_from_playlist")
            .with("music_name", music_name)
            .with("playlist_name", &playlist_name))
    }

    /// Speak all saved playlists
    pub fn list_playlists(&self) -> Result<Message, SkillError> {
        let names = self.playlist_names()?;
        log::info!("list_playlists() found {} playlists", names.len());

        let message = match names.as_slice() {
            [] => Message::new("playlists_not_found"),
            [only] => Message::new("list_playlist").with("playlists", only),
            [rest @ .., last] => {
                Message::new("list_playlists").with("playlists", format!("{} and {}", rest.join(" "), last))
            }
        };
        Ok(message)
    }

    fn load_playlist(&self, playlist_name: &str) -> bool {
        self.mpc_cmd(&["load", playlist_name]) == 0
    }

    /// Replace the stored playlist with the current queue
    fn resave_playlist(&self, playlist_name: &str) -> Result<(), SkillError> {
        self.check(&["rm", playlist_name])?;
        self.check(&["save", playlist_name])?;
        Ok(())
    }

    /// Library file name without the configured URI prefix
    fn relative_path<'a>(&self, path: &'a str) -> &'a str {
        let prefix = self.music_uri();
        if prefix.is_empty() {
            return path;
        }
        path.strip_prefix(prefix).unwrap_or(path)
    }
}

fn missing_track(music_name: &str, playlist_name: &str) -> Message {
    Message::new("playlist_missing_track")
        .with("music_name", music_name)
        .with("playlist_name", playlist_name)
}
