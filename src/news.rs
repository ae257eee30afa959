/// News bulletin
///
/// The news page embeds the latest bulletin as an `audioUrl` property. The
/// MP3 is downloaded so the player can queue a local file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Settings;
use crate::error::{IntoSkillError, SkillError};
use crate::music_info::{MatchType, Message, MusicInfo};
use crate::track::Track;

const AUDIO_URL_KEY: &str = "audioUrl";

/// Why the bulletin URL could not be read off the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("news page has no audioUrl")]
    NoAudioUrl,

    #[error("audioUrl is not followed by a query string")]
    Unparsable,
}

impl ExtractError {
    /// Message spoken to the user
    pub fn message_key(&self) -> &'static str {
        match self {
            ExtractError::NoAudioUrl => "cannot_play_npr",
            ExtractError::Unparsable => "cannot_parse_npr",
        }
    }
}

/// Find the bulletin URL in the news page
///
/// The property looks like `"audioUrl":"https:\/\/host\/file.mp3?size=..."`:
/// skip the `":"` after the key, stop at the query string and unescape the
/// slashes.
pub fn extract_audio_url(page: &str) -> Result<String, ExtractError> {
    let start = page.find(AUDIO_URL_KEY).ok_or(ExtractError::NoAudioUrl)?;
    let rest = page
        .get(start + AUDIO_URL_KEY.len() + 3..)
        .ok_or(ExtractError::Unparsable)?;
    let end = rest.find('?').ok_or(ExtractError::Unparsable)?;
    Ok(rest[..end].replace('\\', ""))
}

/// File name for a downloaded bulletin: the URL's last path segment, or a
/// timestamped name when the URL has none
pub fn bulletin_file_name(audio_url: &str) -> String {
    url::Url::parse(audio_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("news-{}.mp3", chrono::Local::now().format("%Y%m%d-%H%M%S")))
}

/// Where the news comes from
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// HTML of the page that links the latest bulletin
    async fn fetch_page(&self) -> Result<String, SkillError>;

    /// Download the bulletin and return the local file
    async fn download(&self, audio_url: &str) -> Result<PathBuf, SkillError>;
}

/// Fetches bulletins over HTTP into the download directory
pub struct HttpNewsSource {
    client: reqwest::Client,
    news_url: String,
    download_dir: PathBuf,
}

impl HttpNewsSource {
    pub fn new(news_url: &str, download_dir: &Path, timeout: Duration) -> Result<Self, SkillError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpNewsSource {
            client,
            news_url: news_url.to_string(),
            download_dir: download_dir.to_path_buf(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SkillError> {
        Self::new(
            &settings.news_url,
            &settings.download_dir,
            Duration::from_secs(settings.http_timeout_secs),
        )
    }
}

#[async_trait]
impl NewsSource for HttpNewsSource {
    async fn fetch_page(&self) -> Result<String, SkillError> {
        log::info!("Fetching news page {}", self.news_url);
        let response = self.client.get(&self.news_url).send().await?;
        if !response.status().is_success() {
            return Err(SkillError::News(format!("news page returned status {}", response.status())));
        }
        Ok(response.text().await?)
    }

    async fn download(&self, audio_url: &str) -> Result<PathBuf, SkillError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_skill_err(|e| SkillError::News(format!("Failed to create {}: {}", self.download_dir.display(), e)))?;

        let file_name = bulletin_file_name(audio_url);
        let path = self.download_dir.join(file_name);
        log::info!("Downloading {} to {}", audio_url, path.display());

        let response = self.client.get(audio_url).send().await?;
        if !response.status().is_success() {
            return Err(SkillError::News(format!("bulletin download returned status {}", response.status())));
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(&path, &bytes).await?;
        log::info!("Downloaded {} bytes", bytes.len());
        Ok(path)
    }
}

/// Fetch the latest news bulletin
pub async fn search_news(source: &dyn NewsSource) -> MusicInfo {
    let page = match source.fetch_page().await {
        Ok(page) => page,
        Err(e) => {
            log::error!("Cannot fetch news page: {}", e);
            return MusicInfo::not_found(Message::new("cannot_play_npr"));
        }
    };

    let audio_url = match extract_audio_url(&page) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Cannot find news bulletin: {}", e);
            return MusicInfo::not_found(Message::new(e.message_key()));
        }
    };
    log::info!("search_news() bulletin URL: {}", audio_url);

    match source.download(&audio_url).await {
        Ok(path) => {
            let mut track = Track::from_uri(path.to_string_lossy());
            track.title = "NPR News Now".to_string();
            MusicInfo::found(MatchType::News, Message::new("playing_npr"), vec![track])
        }
        Err(e) => {
            log::error!("Cannot download news bulletin: {}", e);
            MusicInfo::not_found(Message::new("cannot_play_npr"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const PAGE: &str = r#"<script>{"title":"News Now","audioUrl":"https:\/\/ondemand.npr.org\/anon.npr-mp3\/npr\/newscasts\/2024\/10\/15\/newscast050.mp3?size=4500&d=300","duration":300}</script>"#;

    struct FakeNews {
        page: Option<String>,
        dir: TempDir,
        downloaded: Mutex<Vec<String>>,
    }

    impl FakeNews {
        fn new(page: Option<&str>) -> Self {
            FakeNews {
                page: page.map(str::to_string),
                dir: TempDir::new().unwrap(),
                downloaded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NewsSource for FakeNews {
        async fn fetch_page(&self) -> Result<String, SkillError> {
            self.page
                .clone()
                .ok_or_else(|| SkillError::News("offline".to_string()))
        }

        async fn download(&self, audio_url: &str) -> Result<PathBuf, SkillError> {
            self.downloaded.lock().unwrap().push(audio_url.to_string());
            let path = self.dir.path().join(bulletin_file_name(audio_url));
            std::fs::write(&path, b"ID3")?;
            Ok(path)
        }
    }

    #[test]
    fn test_extract_audio_url() {
        assert_eq!(
            extract_audio_url(PAGE).unwrap(),
            "https://ondemand.npr.org/anon.npr-mp3/npr/newscasts/2024/10/15/newscast050.mp3"
        );
    }

    #[test]
    fn test_extract_audio_url_failures() {
        assert_eq!(extract_audio_url("<html></html>"), Err(ExtractError::NoAudioUrl));
        assert_eq!(
            extract_audio_url(r#"{"audioUrl":"https://example.com/a.mp3"}"#),
            Err(ExtractError::Unparsable)
        );
        assert_eq!(extract_audio_url("audioUrl"), Err(ExtractError::Unparsable));
        assert_eq!(ExtractError::Unparsable.message_key(), "cannot_parse_npr");
    }

    #[test]
    fn test_bulletin_file_name() {
        assert_eq!(
            bulletin_file_name("https://ondemand.npr.org/npr/newscasts/newscast050.mp3"),
            "newscast050.mp3"
        );
        let fallback = bulletin_file_name("not a url");
        assert!(fallback.starts_with("news-") && fallback.ends_with(".mp3"));
    }

    #[tokio::test]
    async fn test_search_news() {
        let source = FakeNews::new(Some(PAGE));
        let info = search_news(&source).await;

        assert_eq!(info.match_type, MatchType::News);
        assert_eq!(info.message_key(), Some("playing_npr"));
        let tracks = info.tracks.unwrap();
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].path.ends_with("newscast050.mp3"));
        assert!(Path::new(&tracks[0].path).exists());
        assert_eq!(source.downloaded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_news_failures() {
        let info = search_news(&FakeNews::new(None)).await;
        assert_eq!(info.match_type, MatchType::None);
        assert_eq!(info.message_key(), Some("cannot_play_npr"));

        let source = FakeNews::new(Some("<html>redesigned</html>"));
        let info = search_news(&source).await;
        assert_eq!(info.message_key(), Some("cannot_play_npr"));
        assert!(source.downloaded.lock().unwrap().is_empty());

        let info = search_news(&FakeNews::new(Some(r#""audioUrl":"x.mp3""#))).await;
        assert_eq!(info.message_key(), Some("cannot_parse_npr"));
    }
}
