// src/narrative.rs
//! Narrative generation: provider abstraction + file cache + daily limit.
//!
//! A free-text query is routed to one of five specializations, each with its
//! own system prompt, and the chosen provider turns the computed numbers into
//! a short prose summary. Everything here degrades: any failure surfaces as
//! an [`Unavailable`] reason and the caller assembles the response without
//! the narrative.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::availability::{BestEffort, Unavailable};

const MAX_NARRATIVE_CHARS: usize = 600;

// ------------------------------------------------------------
// Specializations
// ------------------------------------------------------------

/// Analyst persona chosen for a query. Routing is keyword based and the
/// first matching specialization wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Discovery,
    Recommendations,
    Analytics,
    Support,
    Strategy,
    General,
}

const ROUTES: &[(Specialization, &[&str])] = &[
    (
        Specialization::Discovery,
        &["find", "search", "looking for", "show me", "discover", "browse"],
    ),
    (
        Specialization::Recommendations,
        &["recommend", "suggest", "what should i watch", "for me", "personalized"],
    ),
    (
        Specialization::Analytics,
        &["trend", "analytic", "data", "performance", "insight", "statistics", "percentage", "share"],
    ),
    (
        Specialization::Support,
        &["plan", "subscription", "price", "cancel", "help", "support", "billing", "account"],
    ),
    (
        Specialization::Strategy,
        &["strategy", "business", "investment", "market", "acquisition", "roi", "budget"],
    ),
];

impl Specialization {
    /// Pick the persona for a query.
    pub fn route(query: &str) -> Self {
        let text = query.to_lowercase();
        for (spec, keywords) in ROUTES {
            if keywords.iter().any(|k| text.contains(k)) {
                return *spec;
            }
        }
        Specialization::General
    }

    pub fn name(&self) -> &'static str {
        match self {
            Specialization::Discovery => "discovery",
            Specialization::Recommendations => "recommendations",
            Specialization::Analytics => "analytics",
            Specialization::Support => "support",
            Specialization::Strategy => "strategy",
            Specialization::General => "general",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            Specialization::Discovery => {
                "You are a streaming catalog discovery analyst. Help users understand what \
                 content the catalog holds. Ground every statement in the numbers provided, \
                 mention concrete titles or genres where the data names them, and keep a \
                 professional, helpful tone. Two or three sentences."
            }
            Specialization::Recommendations => {
                "You are a content curation analyst. Interpret the provided catalog numbers \
                 as guidance for what viewers might enjoy, balancing popular categories with \
                 smaller international selections. Stay within the data given. Two or three \
                 sentences."
            }
            Specialization::Analytics => {
                "You are a streaming analytics specialist with expertise in industry data \
                 and business intelligence. Present the provided metrics as clear, actionable \
                 insight with specific numbers and percentages. Professional analytical tone \
                 for business stakeholders. Two or three sentences."
            }
            Specialization::Support => {
                "You are a customer support analyst for a streaming catalog service. Answer \
                 plainly and helpfully using only the provided data, with a friendly and \
                 patient tone. Two or three sentences."
            }
            Specialization::Strategy => {
                "You are a content strategy analyst advising on planning and investment. \
                 Read the provided catalog metrics for market dynamics and regional \
                 opportunities, and give data-driven strategic insight. Two or three \
                 sentences."
            }
            Specialization::General => {
                "You are a streaming catalog analyst. Summarize the provided metrics for a \
                 business reader in plain language. Two or three sentences."
            }
        }
    }
}

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Prose produced for a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Narrative {
    pub text: String,
    pub specialization: Specialization,
}

/// Trait object used by the engine and tests.
pub trait NarrativeClient: Send + Sync {
    /// Turn a query plus its computed analysis into prose.
    fn narrate<'a>(
        &'a self,
        query: &'a str,
        analysis_json: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<Narrative>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynNarrativeClient = Arc<dyn NarrativeClient>;

/// Config loaded from `config/ai.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    pub enabled: bool,
    /// "openai" is the only real provider.
    pub provider: Option<String>,
    /// Optional per-day call budget; defaults to 50 if absent.
    pub daily_limit: Option<u32>,
    /// Model override; defaults to gpt-4o-mini.
    pub model: Option<String>,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            daily_limit: Some(50),
            model: None,
        }
    }
}

/// Load config from `config/ai.json`, falling back to defaults on any error.
pub fn load_narrative_config() -> NarrativeConfig {
    let path = Path::new("config/ai.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => NarrativeConfig::default(),
    }
}

/// Factory: build a client according to config and environment.
///
/// * `AI_TEST_MODE=mock` returns a deterministic mock client.
/// * `enabled: false` returns a client that always reports `Disabled`.
/// * Otherwise the OpenAI provider wrapped with caching + daily limit.
pub fn build_client_from_config(config: &NarrativeConfig) -> DynNarrativeClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider {
            fixed: "The catalog shows steady international growth (mock).".to_string(),
        };
        return Arc::new(CachingClient::new(
            mock,
            default_cache_dir(),
            config.daily_limit.unwrap_or(50),
        ));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_deref() {
        Some("openai") => {
            let provider = OpenAiProvider::new(config.model.as_deref());
            Arc::new(CachingClient::new(
                provider,
                default_cache_dir(),
                config.daily_limit.unwrap_or(50),
            ))
        }
        _ => Arc::new(DisabledClient),
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider doing the remote call. Separated so the same caching
/// wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        specialization: Specialization,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// OpenAI Chat Completions provider. Requires `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(
        &'a self,
        specialization: Specialization,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(Unavailable::MissingCredentials);
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: specialization.system_prompt(),
                    },
                    Msg {
                        role: "user",
                        content: user_prompt,
                    },
                ],
                temperature: 0.3,
                max_tokens: 220,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(classify_reqwest_error)?;

            if !resp.status().is_success() {
                return Err(Unavailable::Transport(format!(
                    "provider returned {}",
                    resp.status()
                )));
            }
            let body: Resp = resp
                .json()
                .await
                .map_err(|e| Unavailable::Transport(e.to_string()))?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.as_str())
                .unwrap_or("");
            let cleaned = sanitize_narrative(content);
            if cleaned.is_empty() {
                Err(Unavailable::Transport("empty completion".to_string()))
            } else {
                Ok(cleaned)
            }
        })
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> Unavailable {
    if err.is_timeout() {
        Unavailable::Timeout
    } else {
        Unavailable::Transport(err.to_string())
    }
}

/// Always reports `Disabled`; used when narrative generation is off.
pub struct DisabledClient;

impl NarrativeClient for DisabledClient {
    fn narrate<'a>(
        &'a self,
        _query: &'a str,
        _analysis_json: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<Narrative>> + Send + 'a>> {
        Box::pin(async { Err(Unavailable::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        _specialization: Specialization,
        _user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// Counter state is guarded by a `Mutex` to keep it simple and safe.
pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir);
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    // Claim one unit of daily budget before calling out. Reserving up front
    // keeps concurrent misses from overshooting `daily_limit_max`.
    fn reserve_slot(&self) -> Result<(), Unavailable> {
        let mut g = self.counter.lock().expect("poisoned counter");
        if g.is_expired() {
            g.reset_to_today();
        }
        if g.count >= self.daily_limit_max {
            return Err(Unavailable::DailyLimitReached);
        }
        g.count = g.count.saturating_add(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
        Ok(())
    }

    fn release_slot(&self) {
        let mut g = self.counter.lock().expect("poisoned counter");
        g.count = g.count.saturating_sub(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
    }

    async fn narrate_impl(&self, query: &str, analysis_json: &str) -> BestEffort<Narrative> {
        let specialization = Specialization::route(query);

        // 1) Cache lookup. Keyed on persona + query + data so a refreshed
        // catalog produces a fresh narrative. Hits never touch the budget.
        let key = cache_key(specialization, query, analysis_json);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            return Ok(hit);
        }

        // 2) Daily budget. A failed call returns its slot.
        self.reserve_slot()?;

        // 3) Real call.
        let prompt = format!("Question: {query}\n\nComputed analysis (JSON):\n{analysis_json}");
        let text = match self.inner.fetch(specialization, &prompt).await {
            Ok(text) => text,
            Err(err) => {
                self.release_slot();
                return Err(err);
            }
        };
        let narrative = Narrative {
            text: sanitize_narrative(&text),
            specialization,
        };
        if narrative.text.is_empty() {
            self.release_slot();
            return Err(Unavailable::Transport("empty completion".to_string()));
        }
        let _ = write_cache_file(&self.cache_dir, &key, &narrative);
        Ok(narrative)
    }
}

impl<P: Provider> NarrativeClient for CachingClient<P> {
    fn narrate<'a>(
        &'a self,
        query: &'a str,
        analysis_json: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<Narrative>> + Send + 'a>> {
        Box::pin(self.narrate_impl(query, analysis_json))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/narrative")
}

fn cache_key(specialization: Specialization, query: &str, analysis_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(specialization.name().as_bytes());
    hasher.update(b"\x00");
    hasher.update(query.as_bytes());
    hasher.update(b"\x00");
    hasher.update(analysis_json.as_bytes());
    let digest = hasher.finalize();
    // First 16 hex chars are plenty for a local cache.
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<Narrative> {
    let buf = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &Narrative) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}
impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}
impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// Collapse whitespace to single spaces and cap the length on a char
/// boundary.
pub fn sanitize_narrative(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_NARRATIVE_CHARS));
    let mut prev_space = false;
    for ch in input.chars() {
        if out.chars().count() >= MAX_NARRATIVE_CHARS {
            break;
        }
        if ch.is_whitespace() {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_picks_first_matching_persona() {
        assert_eq!(Specialization::route("show me korean thrillers"), Specialization::Discovery);
        assert_eq!(
            Specialization::route("what percentage of content is korean?"),
            Specialization::Analytics
        );
        assert_eq!(
            Specialization::route("recommend something for me"),
            Specialization::Recommendations
        );
        assert_eq!(Specialization::route("cancel my plan"), Specialization::Support);
        assert_eq!(
            Specialization::route("content investment strategy"),
            Specialization::Strategy
        );
        assert_eq!(Specialization::route("hello there"), Specialization::General);
    }

    #[test]
    fn sanitize_collapses_and_caps() {
        assert_eq!(sanitize_narrative("  a\n\n b\tc  "), "a b c");
        let long = "x".repeat(2000);
        assert_eq!(sanitize_narrative(&long).chars().count(), MAX_NARRATIVE_CHARS);
    }

    #[tokio::test]
    async fn disabled_client_reports_disabled() {
        let client = DisabledClient;
        let out = client.narrate("anything", "{}").await;
        assert_eq!(out, Err(Unavailable::Disabled));
    }

    #[tokio::test]
    async fn caching_client_serves_cache_without_spending_budget() {
        let dir = tempfile::tempdir().unwrap();
        let client = CachingClient::new(
            MockProvider {
                fixed: "stable text".to_string(),
            },
            dir.path().to_path_buf(),
            2,
        );
        let a = client.narrate("top genres data", "{\"x\":1}").await.unwrap();
        let b = client.narrate("top genres data", "{\"x\":1}").await.unwrap();
        assert_eq!(a, b);
        // Only the first call consumed budget; a third distinct query still fits.
        let c = client.narrate("country data", "{\"y\":2}").await;
        assert!(c.is_ok());
    }

    #[tokio::test]
    async fn daily_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let client = CachingClient::new(
            MockProvider {
                fixed: "text".to_string(),
            },
            dir.path().to_path_buf(),
            1,
        );
        assert!(client.narrate("q1", "{}").await.is_ok());
        let out = client.narrate("q2", "{\"z\":3}").await;
        assert_eq!(out, Err(Unavailable::DailyLimitReached));
    }

    /// Fails on the first fetch, succeeds afterwards.
    struct FlakyProvider {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Provider for FlakyProvider {
        fn fetch<'a>(
            &'a self,
            _specialization: Specialization,
            _user_prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>> {
            let n = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Box::pin(async move {
                if n == 0 {
                    Err(Unavailable::Transport("connection reset".to_string()))
                } else {
                    Ok("recovered".to_string())
                }
            })
        }
        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn failed_call_returns_its_budget_slot() {
        let dir = tempfile::tempdir().unwrap();
        let client = CachingClient::new(
            FlakyProvider {
                calls: std::sync::atomic::AtomicUsize::new(0),
            },
            dir.path().to_path_buf(),
            1,
        );
        let first = client.narrate("q1", "{}").await;
        assert!(matches!(first, Err(Unavailable::Transport(_))));
        // The failed attempt released its slot, so the retry fits the limit.
        let second = client.narrate("q1", "{}").await.unwrap();
        assert_eq!(second.text, "recovered");
    }

    #[test]
    fn narrative_config_defaults_on_bad_json() {
        let cfg: NarrativeConfig = serde_json::from_str("not json").unwrap_or_default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.daily_limit, Some(50));
    }
}
