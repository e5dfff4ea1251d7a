//! IPTV-Org catalog provider
//!
//! Turns a parsed [`Playlist`] into what a media front-end needs:
//!
//! - **Main page**: channels grouped by their `group-title`
//! - **Search**: fuzzy match on channel titles
//! - **Load**: details page for one channel
//! - **Links**: playable stream links, with DRM data for DASH streams
//!
//! Channels travel between these calls as JSON-serialized [`PlaylistEntry`]
//! strings, so the front-end never needs to understand their fields.

use anyhow::{Context, Result};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    CatalogItem, CatalogSection, DrmInfo, LinkKind, LoadResponse, MediaKind, Playlist,
    PlaylistEntry, StreamLink,
};
use crate::services::fuzzy::{FuzzySearcher, SearchOptions};

/// Base URL of the published iptv-org playlists
pub const IPTV_ORG_BASE_URL: &str = "https://iptv-org.github.io/iptv/";

/// ClearKey DRM system id
pub const CLEARKEY_UUID: Uuid = Uuid::from_u128(0xe2719d58_a985_b3c9_781a_b030af78d30e);

/// Errors raised when handling channel data passed back by the front-end
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid channel data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Which iptv-org playlist is served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSource {
    pub name: String,
    pub lang: String,
    pub playlist_url: String,
}

impl ProviderSource {
    /// Every channel iptv-org knows about
    pub fn all() -> Self {
        Self {
            name: "IPTV-Org (all)".to_string(),
            lang: "en".to_string(),
            playlist_url: format!("{}index.m3u", IPTV_ORG_BASE_URL),
        }
    }

    /// Channels for one language, e.g. `deu`
    pub fn language(code: &str) -> Self {
        Self {
            name: format!("IPTV-Org ({})", code),
            lang: code.chars().take(2).collect(),
            playlist_url: format!("{}languages/{}.m3u", IPTV_ORG_BASE_URL, code),
        }
    }

    /// Build the source from configuration, validating the final URL
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut source = match config.language.as_deref() {
            Some(code) => Self::language(code),
            None => Self::all(),
        };

        if let Some(url) = &config.playlist_url {
            source.playlist_url = url.clone();
        }

        Url::parse(&source.playlist_url)
            .with_context(|| format!("Invalid playlist URL: {}", source.playlist_url))?;

        Ok(source)
    }
}

/// Catalog, search and link resolution for one playlist source
pub struct IptvOrgProvider {
    source: ProviderSource,
    searcher: FuzzySearcher,
    search_options: SearchOptions,
}

impl IptvOrgProvider {
    pub fn new(source: ProviderSource, search_options: SearchOptions) -> Self {
        Self {
            source,
            searcher: FuzzySearcher::default(),
            search_options,
        }
    }

    pub fn source(&self) -> &ProviderSource {
        &self.source
    }

    pub fn search_options(&self) -> &SearchOptions {
        &self.search_options
    }

    fn catalog_item(entry: &PlaylistEntry) -> Result<CatalogItem, ProviderError> {
        Ok(CatalogItem {
            name: entry.title.clone(),
            data: serde_json::to_string(entry)?,
            kind: MediaKind::Live,
            poster_url: entry.logo_url.clone(),
        })
    }

    /// Group channels by group title, groups in order of first appearance
    pub fn main_page(&self, playlist: &Playlist) -> Result<Vec<CatalogSection>, ProviderError> {
        let mut sections: Vec<CatalogSection> = Vec::new();
        let mut index: HashMap<Option<&str>, usize> = HashMap::new();

        for entry in &playlist.items {
            let group = entry.group_title.as_deref();
            let position = *index.entry(group).or_insert_with(|| {
                sections.push(CatalogSection {
                    name: group.unwrap_or_default().to_string(),
                    items: Vec::new(),
                    horizontal_images: true,
                });
                sections.len() - 1
            });

            sections[position].items.push(Self::catalog_item(entry)?);
        }

        Ok(sections)
    }

    /// Fuzzy search on channel titles
    pub fn search(
        &self,
        playlist: &Playlist,
        query: &str,
    ) -> Result<Vec<CatalogItem>, ProviderError> {
        self.search_with(playlist, query, &self.search_options)
    }

    /// Fuzzy search with explicit limits
    pub fn search_with(
        &self,
        playlist: &Playlist,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<CatalogItem>, ProviderError> {
        self.searcher
            .search(query, &playlist.items, options, |entry| entry.title.as_str())
            .into_iter()
            .map(Self::catalog_item)
            .collect()
    }

    /// Details page for a channel serialized by [`Self::main_page`] or [`Self::search`]
    pub fn load(&self, data: &str) -> Result<LoadResponse, ProviderError> {
        let entry: PlaylistEntry = serde_json::from_str(data)?;

        Ok(LoadResponse {
            name: entry.title,
            url: entry.url,
            data: data.to_string(),
            kind: MediaKind::Live,
            poster_url: entry.logo_url,
            plot: entry.group_title,
        })
    }

    /// Resolve the playable link for a serialized channel
    ///
    /// - `.mpd` URLs become DASH links with ClearKey data
    /// - `&e=.m3u` URLs are HLS
    /// - anything else is left for the player to infer
    pub fn load_links(&self, data: &str) -> Result<Vec<StreamLink>, ProviderError> {
        let entry: PlaylistEntry = serde_json::from_str(data)?;
        let referer = entry.referer.clone().unwrap_or_default();

        let link = if entry.url.contains("mpd") {
            StreamLink {
                source: self.source.name.clone(),
                name: self.source.name.clone(),
                url: entry.url,
                kind: LinkKind::Dash,
                referer,
                user_agent: entry.user_agent,
                drm: Some(DrmInfo {
                    key: entry.drm_key.unwrap_or_default().trim().to_string(),
                    kid: entry.drm_key_id.unwrap_or_default().trim().to_string(),
                    scheme: CLEARKEY_UUID,
                }),
            }
        } else if entry.url.contains("&e=.m3u") {
            StreamLink {
                source: self.source.name.clone(),
                name: self.source.name.clone(),
                url: entry.url,
                kind: LinkKind::Hls,
                referer,
                user_agent: entry.user_agent,
                drm: None,
            }
        } else {
            StreamLink {
                source: self.source.name.clone(),
                name: entry.title,
                url: entry.url,
                kind: LinkKind::Infer,
                referer,
                user_agent: entry.user_agent,
                drm: None,
            }
        };

        Ok(vec![link])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::m3u_parser::PlaylistParser;

    const PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 tvg-id="DasErste.de" tvg-logo="http://logo/erste.png" group-title="General",Das Erste HD
http://x/erste.m3u8
#EXTINF:-1 tvg-id="KiKA.de" group-title="Kids",KiKA
http://x/kika.m3u8
#EXTINF:-1 tvg-id="ZDF.de" group-title="General",ZDF
http://x/zdf.m3u8
#EXTINF:-1,Ungrouped Channel
http://x/other.m3u8
"#;

    fn provider() -> IptvOrgProvider {
        IptvOrgProvider::new(ProviderSource::all(), SearchOptions::default())
    }

    fn playlist() -> Playlist {
        PlaylistParser::parse(PLAYLIST).unwrap()
    }

    #[test]
    fn test_sources() {
        let all = ProviderSource::all();
        assert_eq!(all.name, "IPTV-Org (all)");
        assert_eq!(all.playlist_url, "https://iptv-org.github.io/iptv/index.m3u");

        let deu = ProviderSource::language("deu");
        assert_eq!(deu.name, "IPTV-Org (deu)");
        assert_eq!(deu.lang, "de");
        assert_eq!(deu.playlist_url, "https://iptv-org.github.io/iptv/languages/deu.m3u");
    }

    #[test]
    fn test_main_page_groups_in_order() {
        let sections = provider().main_page(&playlist()).unwrap();

        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["General", "Kids", ""]);

        let general: Vec<&str> = sections[0].items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(general, vec!["Das Erste HD", "ZDF"]);
        assert_eq!(sections[0].items[0].poster_url.as_deref(), Some("http://logo/erste.png"));
        assert!(sections.iter().all(|s| s.horizontal_images));
    }

    #[test]
    fn test_search() {
        let results = provider().search(&playlist(), "kika").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "KiKA");
        assert_eq!(results[0].kind, MediaKind::Live);

        let none = provider().search(&playlist(), "qqqqqq").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_load_round_trip() {
        let item = provider().search(&playlist(), "das erste").unwrap().remove(0);
        let loaded = provider().load(&item.data).unwrap();

        assert_eq!(loaded.name, "Das Erste HD");
        assert_eq!(loaded.url, "http://x/erste.m3u8");
        assert_eq!(loaded.poster_url.as_deref(), Some("http://logo/erste.png"));
        assert_eq!(loaded.plot.as_deref(), Some("General"));
    }

    #[test]
    fn test_load_invalid_data() {
        assert!(matches!(
            provider().load("not json"),
            Err(ProviderError::InvalidData(_))
        ));
    }

    #[test]
    fn test_links_dash_drm() {
        let mut entry = PlaylistEntry::new("http://x/manifest.mpd", "Dash");
        entry.drm_key = Some(" abc ".to_string());
        entry.drm_key_id = Some("def".to_string());
        entry.referer = Some("http://ref/".to_string());
        let data = serde_json::to_string(&entry).unwrap();

        let links = provider().load_links(&data).unwrap();
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.kind, LinkKind::Dash);
        assert_eq!(link.name, "IPTV-Org (all)");
        assert_eq!(link.referer, "http://ref/");

        let drm = link.drm.as_ref().unwrap();
        assert_eq!(drm.key, "abc");
        assert_eq!(drm.kid, "def");
        assert_eq!(drm.scheme.to_string(), "e2719d58-a985-b3c9-781a-b030af78d30e");
    }

    #[test]
    fn test_links_hls_and_infer() {
        let hls = PlaylistEntry::new("http://x/get.php?id=1&e=.m3u8", "Hls");
        let links = provider()
            .load_links(&serde_json::to_string(&hls).unwrap())
            .unwrap();
        assert_eq!(links[0].kind, LinkKind::Hls);
        assert_eq!(links[0].name, "IPTV-Org (all)");
        assert_eq!(links[0].referer, "");

        let mut plain = PlaylistEntry::new("http://x/live.m3u8", "Plain");
        plain.user_agent = Some("Mozilla".to_string());
        let links = provider()
            .load_links(&serde_json::to_string(&plain).unwrap())
            .unwrap();
        assert_eq!(links[0].kind, LinkKind::Infer);
        assert_eq!(links[0].name, "Plain");
        assert_eq!(links[0].user_agent.as_deref(), Some("Mozilla"));
        assert!(links[0].drm.is_none());
    }
}
