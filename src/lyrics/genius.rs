use super::*;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const API_BASE: &str = "https://api.genius.com";

/// Genius API lyrics source.
///
/// Search and artist lookups go through the authenticated API; the lyrics
/// themselves are scraped from the song page.
pub struct GeniusProvider {
    client: reqwest::Client,
    token: String,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default, rename = "type")]
    hit_type: String,
    result: SongResult,
}

#[derive(Debug, Deserialize)]
struct SongResult {
    #[serde(default)]
    url: String,
    primary_artist: Option<ArtistSummary>,
}

#[derive(Debug, Deserialize)]
struct ArtistSummary {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtistPayload {
    artist: ArtistDetails,
}

#[derive(Debug, Deserialize)]
struct ArtistDetails {
    #[serde(default)]
    alternate_names: Vec<String>,
}

/// Whether any of the names Genius knows an artist by appears in the
/// requested main artist (case-insensitive containment).
///
/// Heuristic: an artist credited differently on the two services is rejected
/// even when the lyrics would have been right.
pub fn artist_name_matches(candidate_names: &[String], main_artist: &str) -> bool {
    let main_artist = main_artist.to_lowercase();
    candidate_names
        .iter()
        .map(|name| name.trim().to_lowercase())
        .any(|name| !name.is_empty() && main_artist.contains(&name))
}

const LYRICS_CONTAINER: &str = "data-lyrics-container=\"true\"";
const EXCLUDED_BLOCK: &str = "data-exclude-from-selection=\"true\"";
const DIV_OPEN: &str = "<div";
const DIV_CLOSE: &str = "</div>";

/// Offset of the `</div>` that closes a div whose opening tag ends right
/// before `html`, skipping over nested divs.
fn matching_div_close(html: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut pos = 0;

    loop {
        let rest = &html[pos..];
        let close = rest.find(DIV_CLOSE)?;
        match rest.find(DIV_OPEN) {
            Some(open) if open < close => {
                depth += 1;
                pos += open + DIV_OPEN.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + close);
                }
                pos += close + DIV_CLOSE.len();
            }
        }
    }
}

/// Drop nested blocks Genius marks as not part of the lyrics (headers,
/// contributor counts)
fn remove_excluded_blocks(block: &str) -> String {
    let mut output = String::with_capacity(block.len());
    let mut rest = block;

    while let Some(marker) = rest.find(EXCLUDED_BLOCK) {
        let Some(tag_start) = rest[..marker].rfind('<') else {
            break;
        };
        let Some(tag_end) = rest[marker..].find('>').map(|i| marker + i + 1) else {
            break;
        };
        let Some(inner_end) = matching_div_close(&rest[tag_end..]) else {
            break;
        };

        output.push_str(&rest[..tag_start]);
        rest = &rest[tag_end + inner_end + DIV_CLOSE.len()..];
    }

    output.push_str(rest);
    output
}

/// Pull the lyric text out of a Genius song page.
///
/// Lyrics live in one or more `data-lyrics-container="true"` blocks, which
/// may contain nested divs; line breaks are `<br>` tags.
pub fn extract_lyrics_html(html: &str) -> Option<String> {
    let mut captured = Vec::new();
    let mut remaining = html;

    while let Some(index) = remaining.find(LYRICS_CONTAINER) {
        let segment = &remaining[index..];
        let Some(content_start) = segment.find('>') else {
            break;
        };
        let after_start = &segment[content_start + 1..];
        let Some(content_end) = matching_div_close(after_start) else {
            break;
        };

        let block = remove_excluded_blocks(&after_start[..content_end])
            .replace("<br/>", "\n")
            .replace("<br />", "\n")
            .replace("<br>", "\n");
        let text = decode_html_entities(&strip_html_tags(&block));
        let text = text.trim();
        if !text.is_empty() {
            captured.push(text.to_string());
        }

        remaining = &after_start[content_end + DIV_CLOSE.len()..];
    }

    (!captured.is_empty()).then(|| captured.join("\n"))
}

fn strip_html_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_tag = false;

    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => output.push(c),
            _ => {}
        }
    }

    output
}

fn decode_html_entities(input: &str) -> String {
    input
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

impl GeniusProvider {
    /// Create a new Genius provider with the given API token
    pub fn new(token: String, request_timeout: Duration) -> LyricsResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (lyricdash lyrics client)"),
        );

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| LyricsError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            token,
            request_timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> LyricsError {
        if e.is_timeout() {
            LyricsError::Timeout(self.request_timeout)
        } else {
            LyricsError::ApiError(e.to_string())
        }
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> LyricsResult<T> {
        let response = self
            .client
            .get(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LyricsError::NotFound);
        }
        if !response.status().is_success() {
            return Err(LyricsError::ApiError(format!(
                "Genius API returned status: {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| LyricsError::ParseError(e.to_string()))?;
        Ok(envelope.response)
    }

    /// Primary name plus alternate names of a Genius artist
    async fn artist_names(&self, artist: &ArtistSummary) -> LyricsResult<Vec<String>> {
        let payload: ArtistPayload = self
            .api_get(&format!("/artists/{}", artist.id), &[])
            .await?;

        let mut names = payload.artist.alternate_names;
        names.push(artist.name.clone());
        Ok(names)
    }

    async fn fetch_page(&self, url: &str) -> LyricsResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(LyricsError::ApiError(format!(
                "Genius page returned status: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| LyricsError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl LyricsProvider for GeniusProvider {
    async fn fetch_lyrics(&self, song_query: &str, artist_query: &str) -> LyricsResult<String> {
        let search: SearchPayload = self.api_get("/search", &[("q", song_query)]).await?;

        let song = search
            .hits
            .into_iter()
            .find(|hit| hit.hit_type.eq_ignore_ascii_case("song") && !hit.result.url.is_empty())
            .map(|hit| hit.result)
            .ok_or(LyricsError::NotFound)?;

        let primary_artist = song.primary_artist.as_ref().ok_or(LyricsError::NotFound)?;
        let names = self.artist_names(primary_artist).await?;
        if !artist_name_matches(&names, artist_query) {
            return Err(LyricsError::ArtistMismatch(primary_artist.name.clone()));
        }

        tracing::debug!("Fetching lyrics page {}", song.url);
        let html = self.fetch_page(&song.url).await?;
        let raw = extract_lyrics_html(&html).ok_or(LyricsError::NotFound)?;

        let lyrics = clean_lyrics(&raw);
        if lyrics.is_empty() {
            return Err(LyricsError::NotFound);
        }
        Ok(lyrics)
    }

    fn name(&self) -> &str {
        "genius"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_name_matches() {
        let names = vec!["Drake".to_string(), "Champagne Papi".to_string()];
        assert!(artist_name_matches(&names, "Drake"));
        assert!(artist_name_matches(&names, "DRAKE"));
        assert!(!artist_name_matches(&names, "Rihanna"));

        // Containment, not equality
        let names = vec!["Jay-Z".to_string()];
        assert!(artist_name_matches(&names, "JAY-Z & Kanye West"));

        // Blank alternate names never match everything
        let names = vec!["  ".to_string()];
        assert!(!artist_name_matches(&names, "Anyone"));
    }

    #[test]
    fn test_extract_lyrics_html() {
        let html = r#"<html><div data-lyrics-container="true" class="x">[Intro]<br/>Hello, it&#x27;s me<br><i>I was</i> wondering</div>
            <div>noise</div>
            <div data-lyrics-container="true">Rock &amp; roll</div></html>"#;

        let text = extract_lyrics_html(html).unwrap();
        assert_eq!(
            text,
            "[Intro]\nHello, it's me\nI was wondering\nRock & roll"
        );
    }

    #[test]
    fn test_extract_lyrics_html_nested_divs() {
        let html = concat!(
            r#"<div data-lyrics-container="true" class="a">"#,
            r#"<div data-exclude-from-selection="true" class="h"><div>Translations</div>Hello Lyrics</div>"#,
            r#"First line<br/><div class="b">Second line</div><br/>Third line</div>"#,
            r#"<div>footer</div>"#
        );

        let text = extract_lyrics_html(html).unwrap();
        assert_eq!(text, "First line\nSecond line\nThird line");
    }

    #[test]
    fn test_matching_div_close_skips_nested() {
        let html = "a<div>b<div>c</div></div>d</div>e";
        let end = matching_div_close(html).unwrap();
        assert_eq!(&html[..end], "a<div>b<div>c</div></div>d");
        assert!(matching_div_close("no close here").is_none());
    }

    #[test]
    fn test_extract_lyrics_html_without_container() {
        assert!(extract_lyrics_html("<html><p>Nothing here</p></html>").is_none());
    }

    #[test]
    fn test_search_payload_parsing() {
        let envelope: ApiEnvelope<SearchPayload> = serde_json::from_value(serde_json::json!({
            "meta": { "status": 200 },
            "response": {
                "hits": [
                    { "type": "song", "result": {
                        "url": "https://genius.com/Adele-hello-lyrics",
                        "primary_artist": { "id": 2300, "name": "Adele" }
                    } }
                ]
            }
        }))
        .unwrap();

        let hit = &envelope.response.hits[0];
        assert_eq!(hit.hit_type, "song");
        assert_eq!(hit.result.primary_artist.as_ref().unwrap().id, 2300);
    }

    #[tokio::test]
    #[ignore] // Only run with a real Genius token
    async fn test_genius_fetch_lyrics() {
        let token = std::env::var("GENIUS_TOKEN").expect("GENIUS_TOKEN not set");
        let provider = GeniusProvider::new(token, Duration::from_secs(20)).unwrap();

        let lyrics = provider.fetch_lyrics("Adele Hello", "Adele").await.unwrap();

        assert!(!lyrics.is_empty());
        println!("Lyrics: {}", lyrics);
    }
}
