use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::Settings;
use crate::error::SkillError;
use crate::mpc_client::MpcClient;
use crate::music_info::{MatchType, Message, MusicInfo};
use crate::track::Track;

const YOUTUBE_RESULTS_URL: &str = "https://www.youtube.com/results";
const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Phrases that only say where to look
const INTERNET_PHRASES: [&str; 7] = [
    "on youtube",
    "in youtube",
    "from youtube",
    "from the internet",
    "from internet",
    "on the internet",
    "on internet",
];

/// Video search backend configuration
#[derive(Debug, Clone)]
pub enum SearchBackend {
    /// Scrape the public results page (no API key required)
    YouTubePage,
    /// YouTube Data API v3 (requires API key)
    YouTubeApi { api_key: String },
}

/// One video found on the internet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetResult {
    pub title: String,
    /// Watch page URL handed to the stream helper
    pub url: String,
    pub channel: Option<String>,
    /// Display length such as "4:13", when the backend reports it
    pub duration: Option<String>,
}

impl InternetResult {
    fn from_video_id(video_id: &str, title: String, channel: Option<String>, duration: Option<String>) -> Self {
        InternetResult {
            title,
            url: format!("{}{}", YOUTUBE_WATCH_URL, video_id),
            channel,
            duration,
        }
    }

    pub fn to_track(&self) -> Track {
        let mut track = Track::from_uri(&self.url);
        track.title = self.title.clone();
        if let Some(channel) = &self.channel {
            track.artist = channel.clone();
        }
        track
    }
}

/// Custom error types for internet search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unexpected results page: {0}")]
    PageLayout(String),
}

impl From<SearchError> for SkillError {
    fn from(err: SearchError) -> Self {
        SkillError::Search(err.to_string())
    }
}

/// Something that can look music up on the internet
#[async_trait]
pub trait MusicSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<InternetResult>, SearchError>;
}

/// Video search against YouTube
pub struct YouTubeSearch {
    backend: SearchBackend,
    client: reqwest::Client,
}

impl YouTubeSearch {
    pub fn new(backend: SearchBackend, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(YouTubeSearch { backend, client })
    }

    /// The Data API when a key is configured, the results page otherwise
    pub fn from_settings(settings: &Settings) -> Result<Self, SearchError> {
        let backend = match settings.youtube_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => SearchBackend::YouTubeApi {
                api_key: key.to_string(),
            },
            _ => SearchBackend::YouTubePage,
        };
        Self::new(backend, Duration::from_secs(settings.http_timeout_secs))
    }

    async fn search_page(&self, query: &str, max_results: usize) -> Result<Vec<InternetResult>, SearchError> {
        let search_url = format!("{}?search_query={}", YOUTUBE_RESULTS_URL, urlencoding::encode(query));
        log::debug!("GET {}", search_url);

        let response = self.client.get(&search_url).send().await.map_err(map_request_error)?;
        if !response.status().is_success() {
            log::error!("Results page returned error status: {}", response.status());
            return Err(SearchError::BackendUnavailable(format!(
                "Results page returned status: {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        parse_results_page(&html, max_results)
    }

    async fn search_api(&self, query: &str, api_key: &str, max_results: usize) -> Result<Vec<InternetResult>, SearchError> {
        log::debug!("GET {} (q={})", YOUTUBE_API_URL, query);
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(YOUTUBE_API_URL)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(map_request_error)?;

        match response.status().as_u16() {
            200 => {}
            400 | 401 => {
                log::error!("YouTube API rejected the key (status {})", response.status());
                return Err(SearchError::InvalidApiKey);
            }
            403 | 429 => {
                log::error!("YouTube API quota exceeded (status {})", response.status());
                return Err(SearchError::RateLimitExceeded);
            }
            status => {
                log::error!("YouTube API returned error status: {}", status);
                return Err(SearchError::BackendUnavailable(format!(
                    "YouTube API returned status: {}",
                    status
                )));
            }
        }

        let body = response.text().await?;
        parse_api_response(&body, usize::MAX)
    }
}

#[async_trait]
impl MusicSearch for YouTubeSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<InternetResult>, SearchError> {
        log::info!("Performing internet search: \"{}\" (max: {})", query, max_results);
        if query.trim().is_empty() {
            log::warn!("Empty search query provided");
            return Ok(Vec::new());
        }

        let clamped_max = max_results.clamp(1, 20);
        let results = match &self.backend {
            SearchBackend::YouTubePage => self.search_page(query, clamped_max).await?,
            SearchBackend::YouTubeApi { api_key } => self.search_api(query, api_key, clamped_max).await?,
        };
        log::info!("Internet search returned {} results", results.len());
        Ok(results)
    }
}

fn map_request_error(e: reqwest::Error) -> SearchError {
    log::error!("Internet search request failed: {}", e);
    if e.is_timeout() {
        SearchError::BackendUnavailable("request timed out".to_string())
    } else if e.is_connect() {
        SearchError::BackendUnavailable("could not connect".to_string())
    } else {
        SearchError::Network(e)
    }
}

/// Pull video results out of a results page
///
/// The page embeds its data as `var ytInitialData = {...};` and every video
/// is a `videoRenderer` object somewhere inside it.
pub fn parse_results_page(html: &str, max_results: usize) -> Result<Vec<InternetResult>, SearchError> {
    let start = html
        .find("ytInitialData")
        .ok_or_else(|| SearchError::PageLayout("no ytInitialData".to_string()))?;
    let after = &html[start..];
    let json_start = after
        .find('{')
        .ok_or_else(|| SearchError::PageLayout("no data object".to_string()))?;
    let json_text = &after[json_start..];
    let json_end = json_text.find("};").map(|i| i + 1).unwrap_or(json_text.len());

    // The first "};" can sit inside a string, so fall back to a streaming parse
    let data: Value = match serde_json::from_str(&json_text[..json_end]) {
        Ok(value) => value,
        Err(_) => {
            let mut stream = serde_json::Deserializer::from_str(json_text).into_iter::<Value>();
            stream
                .next()
                .ok_or_else(|| SearchError::PageLayout("empty data object".to_string()))??
        }
    };

    let mut renderers = Vec::new();
    collect_video_renderers(&data, &mut renderers);
    log::debug!("Found {} video renderers", renderers.len());

    Ok(renderers
        .into_iter()
        .filter_map(video_from_renderer)
        .take(max_results)
        .collect())
}

fn collect_video_renderers<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "videoRenderer" {
                    out.push(child);
                } else {
                    collect_video_renderers(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_video_renderers(item, out);
            }
        }
        _ => {}
    }
}

fn video_from_renderer(renderer: &Value) -> Option<InternetResult> {
    let video_id = renderer.get("videoId")?.as_str()?;
    let title = text_of(renderer.get("title")?)?;
    let channel = renderer.get("ownerText").and_then(text_of);
    let duration = renderer.get("lengthText").and_then(text_of);
    Some(InternetResult::from_video_id(video_id, title, channel, duration))
}

/// Text of a `{"runs": [{"text": ..}]}` or `{"simpleText": ..}` node
fn text_of(node: &Value) -> Option<String> {
    if let Some(text) = node.get("simpleText").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let runs = node.get("runs")?.as_array()?;
    let text: String = runs
        .iter()
        .filter_map(|r| r.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Pull video results out of a Data API search response
pub fn parse_api_response(body: &str, max_results: usize) -> Result<Vec<InternetResult>, SearchError> {
    #[derive(Deserialize)]
    struct ApiResponse {
        #[serde(default)]
        items: Vec<ApiItem>,
    }

    #[derive(Deserialize)]
    struct ApiItem {
        id: ApiId,
        snippet: ApiSnippet,
    }

    #[derive(Deserialize)]
    struct ApiId {
        #[serde(rename = "videoId")]
        video_id: Option<String>,
    }

    #[derive(Deserialize)]
    struct ApiSnippet {
        title: String,
        #[serde(rename = "channelTitle")]
        channel_title: Option<String>,
    }

    let response: ApiResponse = serde_json::from_str(body)?;
    Ok(response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            Some(InternetResult::from_video_id(
                &video_id,
                item.snippet.title,
                item.snippet.channel_title,
                None,
            ))
        })
        .take(max_results)
        .collect())
}

/// Turn "play hey jude on youtube" into "hey jude"
///
/// The first word is the verb and is always dropped.
pub fn clean_internet_phrase(utterance: &str) -> String {
    let lowered = utterance.trim().to_lowercase();
    let mut phrase = match lowered.split_once(char::is_whitespace) {
        Some((_, rest)) => format!(" {} ", rest),
        None => return String::new(),
    };
    for remove in INTERNET_PHRASES {
        phrase = phrase.replace(&format!(" {} ", remove), " ");
    }
    phrase.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Search the internet and queue up to `max_results` shuffled videos
pub async fn search_internet(searcher: &dyn MusicSearch, utterance: &str, max_results: usize) -> MusicInfo {
    log::info!("search_internet() utterance: {}", utterance);
    let phrase = clean_internet_phrase(utterance);
    log::info!("search_internet() searching for phrase: {}", phrase);

    let mut results = match searcher.search(&phrase, max_results).await {
        Ok(results) => results,
        Err(e) => {
            log::error!("Internet search failed: {}", e);
            Vec::new()
        }
    };

    if results.is_empty() {
        log::info!("Did not find any music on the internet");
        return MusicInfo::not_found(Message::new("music_not_found").with("music_name", utterance));
    }

    results.truncate(max_results);
    results.shuffle(&mut rand::thread_rng());
    for result in &results {
        log::info!("search_internet() adding url: {} ({})", result.url, result.title);
    }

    let tracks = results.iter().map(InternetResult::to_track).collect();
    MusicInfo::new(MatchType::Internet, None, Some(tracks))
}

impl MpcClient {
    /// Queue every video through the stream helper, then start playing
    ///
    /// Stops at the first helper failure.
    pub fn stream_internet_music(&self, tracks: &[Track], stream_helper: &str) -> Result<(), SkillError> {
        log::info!("stream_internet_music() streaming {} tracks", tracks.len());
        for track in tracks {
            log::info!("stream_internet_music() streaming from URL: {}", track.path);
            self.run_external(stream_helper, &[&track.path])?;
        }

        match self.play() {
            0 => Ok(()),
            code => Err(SkillError::Player {
                cmd: "play".to_string(),
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpc_client::testing::{client, ScriptedRunner};
    use std::sync::{Arc, Mutex};

    /// Returns canned results and remembers the query
    struct FakeSearch {
        results: Vec<InternetResult>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeSearch {
        fn new(count: usize) -> Self {
            let results = (0..count)
                .map(|i| InternetResult::from_video_id(&format!("vid{}", i), format!("Video {}", i), None, None))
                .collect();
            FakeSearch {
                results,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MusicSearch for FakeSearch {
        async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<InternetResult>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.results.clone())
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl MusicSearch for FailingSearch {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<InternetResult>, SearchError> {
            Err(SearchError::RateLimitExceeded)
        }
    }

    const RESULTS_PAGE: &str = r#"<html><script>var ytInitialData = {"contents":{"sectionListRenderer":{"contents":[{"itemSectionRenderer":{"contents":[
        {"videoRenderer":{"videoId":"A_MjCqQoLLA","title":{"runs":[{"text":"The Beatles - Hey Jude"}]},"ownerText":{"runs":[{"text":"The Beatles"}]},"lengthText":{"simpleText":"7:11"}}},
        {"adSlotRenderer":{"note":"skip me"}},
        {"videoRenderer":{"videoId":"kSQBSVkLvY8","title":{"runs":[{"text":"Hey Jude "},{"text":"(Live)"}]}}},
        {"videoRenderer":{"title":{"runs":[{"text":"no id"}]}}}
    ]}}]}}};</script></html>"#;

    #[test]
    fn test_clean_internet_phrase() {
        assert_eq!(clean_internet_phrase("play Hey Jude on YouTube"), "hey jude");
        assert_eq!(clean_internet_phrase("play track yesterday from the internet"), "track yesterday");
        assert_eq!(clean_internet_phrase("stream  hotel california  on internet"), "hotel california");
        assert_eq!(clean_internet_phrase("play"), "");
    }

    #[test]
    fn test_parse_results_page() {
        let results = parse_results_page(RESULTS_PAGE, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://www.youtube.com/watch?v=A_MjCqQoLLA");
        assert_eq!(results[0].title, "The Beatles - Hey Jude");
        assert_eq!(results[0].channel.as_deref(), Some("The Beatles"));
        assert_eq!(results[0].duration.as_deref(), Some("7:11"));
        assert_eq!(results[1].title, "Hey Jude (Live)");
        assert_eq!(results[1].channel, None);

        assert_eq!(parse_results_page(RESULTS_PAGE, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_results_page_without_data() {
        assert!(matches!(
            parse_results_page("<html>consent wall</html>", 3),
            Err(SearchError::PageLayout(_))
        ));
    }

    #[test]
    fn test_parse_api_response() {
        let body = r#"{"items":[
            {"id":{"kind":"youtube#video","videoId":"abc"},"snippet":{"title":"Song One","channelTitle":"Band"}},
            {"id":{"kind":"youtube#channel"},"snippet":{"title":"A channel"}}
        ]}"#;
        let results = parse_api_response(body, 3).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(results[0].to_track().artist, "Band");

        assert!(parse_api_response("{}", 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_internet() {
        let searcher = FakeSearch::new(5);
        let info = search_internet(&searcher, "play hey jude on youtube", 3).await;

        assert_eq!(info.match_type, MatchType::Internet);
        assert!(info.message.is_none());
        assert_eq!(info.track_count(), 3);
        assert!(info
            .tracks
            .unwrap()
            .iter()
            .all(|t| t.path.starts_with("https://www.youtube.com/watch?v=")));
        assert_eq!(searcher.queries.lock().unwrap().as_slice(), ["hey jude"]);
    }

    #[tokio::test]
    async fn test_search_internet_nothing_found() {
        let info = search_internet(&FakeSearch::new(0), "play zzzz", 3).await;
        assert_eq!(info.match_type, MatchType::None);
        let message = info.message.unwrap();
        assert_eq!(message.key, "music_not_found");
        assert_eq!(message.value("music_name"), Some("play zzzz"));

        let info = search_internet(&FailingSearch, "play zzzz", 3).await;
        assert_eq!(info.message_key(), Some("music_not_found"));
    }

    #[test]
    fn test_stream_internet_music() {
        let runner = Arc::new(ScriptedRunner::new());
        let tracks = vec![Track::from_uri("https://youtu.be/1"), Track::from_uri("https://youtu.be/2")];
        client(runner.clone())
            .stream_internet_music(&tracks, "/usr/local/sbin/ytadd")
            .unwrap();
        assert_eq!(runner.calls(), vec!["https://youtu.be/1", "https://youtu.be/2", "play"]);
    }

    #[test]
    fn test_stream_internet_music_stops_on_helper_failure() {
        let runner = Arc::new(ScriptedRunner::new().respond("https://youtu.be/1", 1, ""));
        let tracks = vec![Track::from_uri("https://youtu.be/1"), Track::from_uri("https://youtu.be/2")];
        let result = client(runner.clone()).stream_internet_music(&tracks, "ytadd");

        let err = result.unwrap_err();
        assert!(matches!(err, SkillError::StreamHelper { code: 1, .. }));
        assert_eq!(err.to_string(), "Stream helper ytadd https://youtu.be/1 failed with exit code 1");
        assert_eq!(runner.calls(), vec!["https://youtu.be/1"]);
    }
}
