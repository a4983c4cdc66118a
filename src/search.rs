/// Search engine catalog and search target resolution
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifier of a search dispatcher, persisted as `chooseEngine`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngineId {
    /// The browser's own default engine via `chrome.search`
    #[default]
    Default,
    Google,
    Bing,
    Baidu,
}

impl SearchEngineId {
    pub const ALL: [SearchEngineId; 4] = [
        SearchEngineId::Default,
        SearchEngineId::Google,
        SearchEngineId::Bing,
        SearchEngineId::Baidu,
    ];

    pub fn key(&self) -> &'static str {
        self.engine().key
    }

    pub fn from_key(key: &str) -> Option<SearchEngineId> {
        SearchEngineId::ALL.into_iter().find(|id| id.key() == key)
    }

    pub fn engine(&self) -> &'static SearchEngine {
        match self {
            SearchEngineId::Default => &ENGINES[0],
            SearchEngineId::Google => &ENGINES[1],
            SearchEngineId::Bing => &ENGINES[2],
            SearchEngineId::Baidu => &ENGINES[3],
        }
    }
}

/// Static description of an engine shown in the engine menu
#[derive(Debug, PartialEq)]
pub struct SearchEngine {
    pub key: &'static str,
    pub name: &'static str,
    pub favicon: &'static str,
    /// Base URL and query parameter; `None` means the browser default engine
    endpoint: Option<(&'static str, &'static str)>,
}

static ENGINES: [SearchEngine; 4] = [
    SearchEngine {
        key: "default",
        name: "Default",
        favicon: "icon/default-search.svg",
        endpoint: None,
    },
    SearchEngine {
        key: "google",
        name: "Google",
        favicon: "icon/google.svg",
        endpoint: Some(("https://www.google.com/search", "q")),
    },
    SearchEngine {
        key: "bing",
        name: "Bing",
        favicon: "icon/bing.svg",
        endpoint: Some(("https://www.bing.com/search", "q")),
    },
    SearchEngine {
        key: "baidu",
        name: "Baidu",
        favicon: "icon/baidu.svg",
        endpoint: Some(("https://www.baidu.com/s", "wd")),
    },
];

impl SearchEngine {
    /// Build the results URL for a query, with the query properly encoded.
    /// Returns `None` for the browser default engine, which has no URL.
    pub fn search_url(&self, text: &str) -> Option<Url> {
        let (base, param) = self.endpoint?;
        Url::parse_with_params(base, &[(param, text)]).ok()
    }

    pub fn is_browser_default(&self) -> bool {
        self.endpoint.is_none()
    }
}

/// Where a search result opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    CurrentTab,
    NewTab,
}

impl Disposition {
    pub fn from_direct_link(is_direct_link: bool) -> Disposition {
        if is_direct_link {
            Disposition::CurrentTab
        } else {
            Disposition::NewTab
        }
    }

    /// Value understood by `chrome.search.query`
    pub fn as_chrome_str(&self) -> &'static str {
        match self {
            Disposition::CurrentTab => "CURRENT_TAB",
            Disposition::NewTab => "NEW_TAB",
        }
    }
}

/// A resolved search, ready to be executed by the browser bridge
#[derive(Debug, Clone, PartialEq)]
pub enum SearchTarget {
    BrowserDefault {
        text: String,
        disposition: Disposition,
    },
    Url {
        url: Url,
        disposition: Disposition,
    },
}

/// Resolve what a search for `text` should do. Blank queries resolve to nothing.
pub fn plan_search(engine: SearchEngineId, text: &str, is_direct_link: bool) -> Option<SearchTarget> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let disposition = Disposition::from_direct_link(is_direct_link);
    let engine = engine.engine();

    if engine.is_browser_default() {
        return Some(SearchTarget::BrowserDefault {
            text: text.to_string(),
            disposition,
        });
    }

    engine
        .search_url(text)
        .map(|url| SearchTarget::Url { url, disposition })
}
