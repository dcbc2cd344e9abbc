// src/guardrail.rs
//! Safety evaluation of generated answers.
//!
//! Five criteria are scored independently by an LLM judge: content safety,
//! quality, business logic, bias, and cultural sensitivity. Each judgment is
//! parsed from the model's verdict word; a keyword blocklist screens child
//! and family audiences before any model call. One criterion failing or
//! erroring never aborts the others.
//!
//! The whole stage is best effort: without credentials the evaluation is
//! reported as unavailable and the query response ships without it.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::availability::{BestEffort, Unavailable};

/// Minimum mean score for an evaluation to pass.
const PASS_THRESHOLD: f64 = 0.6;
/// A failed criterion scoring below this counts as a critical failure.
const SEVERE_SCORE: f64 = 0.3;

// ------------------------------------------------------------
// Criteria
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    ContentSafety,
    Quality,
    BusinessLogic,
    BiasDetection,
    CulturalSensitivity,
}

pub const ALL_CRITERIA: [Criterion; 5] = [
    Criterion::ContentSafety,
    Criterion::Quality,
    Criterion::BusinessLogic,
    Criterion::BiasDetection,
    Criterion::CulturalSensitivity,
];

struct CriterionSpec {
    positive: &'static [&'static str],
    negative: &'static [&'static str],
    high_score: f64,
    low_score: f64,
}

impl Criterion {
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::ContentSafety => "content_safety",
            Criterion::Quality => "quality",
            Criterion::BusinessLogic => "business_logic",
            Criterion::BiasDetection => "bias_detection",
            Criterion::CulturalSensitivity => "cultural_sensitivity",
        }
    }

    fn spec(&self) -> CriterionSpec {
        match self {
            Criterion::ContentSafety => CriterionSpec {
                positive: &["SAFE"],
                negative: &["UNSAFE", "INAPPROPRIATE", "HARMFUL"],
                high_score: 0.9,
                low_score: 0.1,
            },
            Criterion::Quality => CriterionSpec {
                positive: &["GOOD", "EXCELLENT", "HIGH QUALITY"],
                negative: &["POOR", "LOW QUALITY", "INADEQUATE"],
                high_score: 0.85,
                low_score: 0.2,
            },
            Criterion::BusinessLogic => CriterionSpec {
                positive: &["VIABLE", "REALISTIC", "SOUND"],
                negative: &["UNREALISTIC", "UNFEASIBLE", "POOR STRATEGY"],
                high_score: 0.8,
                low_score: 0.2,
            },
            Criterion::BiasDetection => CriterionSpec {
                positive: &["FAIR", "UNBIASED", "INCLUSIVE"],
                negative: &["BIASED", "DISCRIMINATORY", "EXCLUSIVE"],
                high_score: 0.85,
                low_score: 0.3,
            },
            Criterion::CulturalSensitivity => CriterionSpec {
                positive: &["SENSITIVE", "APPROPRIATE", "RESPECTFUL"],
                negative: &["INSENSITIVE", "INAPPROPRIATE", "OFFENSIVE"],
                high_score: 0.9,
                low_score: 0.2,
            },
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            Criterion::ContentSafety => {
                "You are a content safety judge for a streaming analytics service. Consider \
                 age-appropriateness, content guidelines, and family-friendly standards. Be \
                 particularly strict about recommendations aimed at children and families. \
                 Respond with 'SAFE' if appropriate or 'UNSAFE' if inappropriate, followed \
                 by a short explanation."
            }
            Criterion::Quality => {
                "You are a quality assurance judge for a streaming analytics service. Assess \
                 accuracy, helpfulness, completeness, and presentation. Respond with 'GOOD' \
                 if high quality or 'POOR' if low quality, followed by a short explanation."
            }
            Criterion::BusinessLogic => {
                "You are a business strategy judge for a streaming analytics service. \
                 Consider market viability, strategic alignment, and feasibility of any \
                 recommendation. Respond with 'VIABLE' if realistic or 'UNREALISTIC' if \
                 not, followed by a short rationale."
            }
            Criterion::BiasDetection => {
                "You are a bias detection judge for a globally deployed analytics service. \
                 Identify cultural, demographic, genre, or regional bias. Respond with \
                 'FAIR' if unbiased and inclusive or 'BIASED' if biased, followed by a \
                 short analysis."
            }
            Criterion::CulturalSensitivity => {
                "You are a cultural sensitivity judge for an international audience. Assess \
                 cultural appropriateness and respect for diverse viewers. Respond with \
                 'SENSITIVE' if culturally appropriate or 'INSENSITIVE' if problematic, \
                 followed by a short analysis."
            }
        }
    }
}

// ------------------------------------------------------------
// Evaluation context
// ------------------------------------------------------------

/// Target audience of the evaluated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    General,
    Kids,
    Teen,
    Adult,
    Family,
}

impl ContentType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "kids" | "children" => Self::Kids,
            "teen" => Self::Teen,
            "adult" => Self::Adult,
            "family" => Self::Family,
            _ => Self::General,
        }
    }

    fn is_protected(&self) -> bool {
        matches!(self, Self::Kids | Self::Family)
    }
}

/// Caller-provided evaluation context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardContext {
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub business_context: Option<String>,
    #[serde(default)]
    pub bias_type: Option<String>,
}

fn safety_criteria_text(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Kids => {
            "Content is safe and appropriate for children under 13 with no mature themes"
        }
        ContentType::Teen => "Content is appropriate for teenagers aged 13-17 with minimal mature content",
        ContentType::Adult => {
            "Content follows mature content guidelines with appropriate age restrictions"
        }
        ContentType::Family => {
            "Content is suitable for family viewing with appropriate ratings and positive themes"
        }
        ContentType::General => {
            "Content is appropriate for general audiences and follows platform guidelines"
        }
    }
}

fn business_criteria_text(business_context: Option<&str>) -> &'static str {
    match business_context.unwrap_or("strategy") {
        "investment" => "Investment suggestions are financially sound and consider market risks",
        "market" => "Market analysis is accurate and provides actionable insights",
        "user_experience" => "Suggestions enhance user experience and platform engagement",
        "content" => "Content recommendations are commercially viable and audience-appropriate",
        _ => "Recommendations align with business strategy and market positioning",
    }
}

fn bias_criteria_text(bias_type: Option<&str>) -> &'static str {
    match bias_type.unwrap_or("comprehensive") {
        "cultural" => "Response is culturally sensitive and respectful of diverse global audiences",
        "demographic" => "Response does not unfairly favor specific age, gender, or demographic groups",
        "genre" => "Response provides balanced genre coverage without systematic bias",
        "regional" => "Response considers global audiences and avoids regional stereotypes",
        _ => "Response avoids cultural, demographic, genre, and regional biases",
    }
}

// ------------------------------------------------------------
// Blocklist screening
// ------------------------------------------------------------

/// Keyword screens applied before any model call. Loadable from
/// `config/guardrail.toml`; the embedded defaults cover well-known titles.
#[derive(Debug, Clone, Deserialize)]
pub struct Blocklist {
    #[serde(default)]
    pub inappropriate_for_kids: Vec<String>,
    #[serde(default)]
    pub adult_content_indicators: Vec<String>,
    #[serde(default)]
    pub positive_family_content: Vec<String>,
}

static PROBLEMATIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"not suitable for children",
        r"adult only",
        r"mature audiences only",
        r"contains graphic",
        r"explicit content",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid pattern"))
    .collect()
});

const EXTREME_CONTENT: &[&str] = &[
    "graphic violence",
    "explicit sexual content",
    "extreme drug use",
];

impl Default for Blocklist {
    fn default() -> Self {
        Self {
            inappropriate_for_kids: [
                "squid game",
                "dahmer",
                "ozark",
                "money heist",
                "the witcher",
                "stranger things",
                "dark",
                "black mirror",
                "mindhunter",
                "narcos",
                "breaking bad",
                "dexter",
                "hannibal",
                "american horror",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            adult_content_indicators: [
                "mature themes",
                "graphic violence",
                "sexual content",
                "drug use",
                "psychological thriller",
                "horror",
                "true crime",
                "rated r",
                "tv-ma",
                "explicit language",
                "disturbing content",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            positive_family_content: [
                "enola holmes",
                "princess switch",
                "christmas prince",
                "paddington",
                "klaus",
                "over the moon",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Blocklist {
    /// Load from a TOML file, falling back to the embedded defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(list) => list,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "bad blocklist file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Keyword screen. Returns false when the text must not be served to the
    /// given audience.
    pub fn screen(&self, text: &str, content_type: ContentType) -> bool {
        let lower = text.to_lowercase();

        if content_type.is_protected() {
            if let Some(hit) = self
                .inappropriate_for_kids
                .iter()
                .find(|k| lower.contains(k.as_str()))
            {
                tracing::warn!(keyword = %hit, "blocked title in family-facing answer");
                return false;
            }
            if let Some(hit) = self
                .adult_content_indicators
                .iter()
                .find(|k| lower.contains(k.as_str()))
            {
                tracing::warn!(indicator = %hit, "adult indicator in family-facing answer");
                return false;
            }
            if PROBLEMATIC_PATTERNS.iter().any(|p| p.is_match(&lower)) {
                return false;
            }
            if self
                .positive_family_content
                .iter()
                .any(|k| lower.contains(k.as_str()))
            {
                return true;
            }
        }

        if content_type == ContentType::Teen
            && EXTREME_CONTENT.iter().any(|k| lower.contains(k))
        {
            return false;
        }

        true
    }
}

// ------------------------------------------------------------
// Judgment parsing
// ------------------------------------------------------------

/// Verdict for one criterion.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriterionVerdict {
    pub criterion: Criterion,
    pub passed: bool,
    pub score: f64,
    pub explanation: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub errored: bool,
}

/// Parse a judge completion into a verdict.
///
/// A negative keyword overrides any positive one. Audience context nudges
/// the score: failures for kids content drop further, successes for family
/// content get a small boost.
pub fn parse_judgment(
    criterion: Criterion,
    response_text: &str,
    content_type: ContentType,
) -> CriterionVerdict {
    let spec = criterion.spec();
    let upper = response_text.to_uppercase();

    let mut passed = spec.positive.iter().any(|k| upper.contains(k));
    if spec.negative.iter().any(|k| upper.contains(k)) {
        passed = false;
    }

    let mut score = if passed {
        spec.high_score
    } else {
        spec.low_score
    };
    match content_type {
        ContentType::Kids if !passed => score = (score - 0.1).max(0.05),
        ContentType::Family if passed => score = (score + 0.05).min(1.0),
        _ => {}
    }

    CriterionVerdict {
        criterion,
        passed,
        score,
        explanation: response_text.trim().to_string(),
        errored: false,
    }
}

// ------------------------------------------------------------
// Judge transport
// ------------------------------------------------------------

/// Low-level judge call: instructions plus prompt in, raw verdict text out.
pub trait JudgeTransport: Send + Sync {
    fn judge<'a>(
        &'a self,
        instructions: &'a str,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

pub type DynJudgeTransport = Arc<dyn JudgeTransport>;

/// OpenAI Chat Completions judge. Requires `OPENAI_API_KEY`.
pub struct OpenAiJudge {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiJudge {
    pub fn new(api_key: impl Into<String>, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.into(),
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

impl JudgeTransport for OpenAiJudge {
    fn judge<'a>(
        &'a self,
        instructions: &'a str,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>> {
        Box::pin(async move {
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
                        content: instructions,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: 0.1,
                max_tokens: 300,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        Unavailable::Timeout
                    } else {
                        Unavailable::Transport(e.to_string())
                    }
                })?;
            if !resp.status().is_success() {
                return Err(Unavailable::Transport(format!(
                    "judge returned {}",
                    resp.status()
                )));
            }
            let body: Resp = resp
                .json()
                .await
                .map_err(|e| Unavailable::Transport(e.to_string()))?;
            body.choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| Unavailable::Transport("empty completion".to_string()))
        })
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic judge for tests: always answers with the positive verdict
/// word of whatever criterion the instructions belong to.
pub struct ApprovingJudge;

impl JudgeTransport for ApprovingJudge {
    fn judge<'a>(
        &'a self,
        instructions: &'a str,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>> {
        let verdict = ALL_CRITERIA
            .iter()
            .find(|c| c.instructions() == instructions)
            .map(|c| c.spec().positive[0])
            .unwrap_or("YES");
        Box::pin(async move { Ok(format!("{verdict}. Meets the criteria (mock).")) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Evaluation
// ------------------------------------------------------------

/// Full evaluation result.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetyEvaluation {
    pub overall_score: f64,
    pub passed: bool,
    pub criteria: Vec<CriterionVerdict>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub critical_failures: Vec<String>,
    pub recommendations: Vec<String>,
}

pub struct Guardrail {
    transport: Option<DynJudgeTransport>,
    blocklist: Blocklist,
}

impl Guardrail {
    pub fn new(transport: Option<DynJudgeTransport>, blocklist: Blocklist) -> Self {
        Self {
            transport,
            blocklist,
        }
    }

    /// Build from the environment: mock transport under `AI_TEST_MODE=mock`,
    /// OpenAI with `OPENAI_API_KEY`, otherwise no transport at all.
    pub fn from_env(blocklist_path: &Path) -> Self {
        let blocklist = Blocklist::load(blocklist_path);
        if std::env::var("AI_TEST_MODE")
            .map(|v| v == "mock")
            .unwrap_or(false)
        {
            return Self::new(Some(Arc::new(ApprovingJudge)), blocklist);
        }
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                Self::new(Some(Arc::new(OpenAiJudge::new(key, None))), blocklist)
            }
            _ => Self::new(None, blocklist),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport
            .as_ref()
            .map(|t| t.name())
            .unwrap_or("unavailable")
    }

    /// Evaluate an answer against all criteria.
    ///
    /// The keyword screen replaces the content safety judge call for kids
    /// and family audiences when it fails, so blocked titles never reach the
    /// model. Individual judge failures become zero-score verdicts.
    pub async fn evaluate(&self, answer: &str, ctx: &GuardContext) -> BestEffort<SafetyEvaluation> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(Unavailable::MissingCredentials)?;

        let screen_ok = self.blocklist.screen(answer, ctx.content_type);

        let mut verdicts = Vec::with_capacity(ALL_CRITERIA.len());
        for criterion in ALL_CRITERIA {
            if criterion == Criterion::ContentSafety
                && !screen_ok
                && ctx.content_type.is_protected()
            {
                verdicts.push(CriterionVerdict {
                    criterion,
                    passed: false,
                    score: 0.1,
                    explanation: "Failed keyword screen for family content".to_string(),
                    errored: false,
                });
                continue;
            }

            let prompt = build_prompt(criterion, answer, ctx);
            match transport.judge(criterion.instructions(), &prompt).await {
                Ok(text) => verdicts.push(parse_judgment(criterion, &text, ctx.content_type)),
                Err(err) => {
                    tracing::warn!(criterion = criterion.name(), %err, "judge call failed");
                    verdicts.push(CriterionVerdict {
                        criterion,
                        passed: false,
                        score: 0.0,
                        explanation: format!("evaluation failed: {err}"),
                        errored: true,
                    });
                }
            }
        }

        Ok(summarize(verdicts, ctx))
    }
}

fn build_prompt(criterion: Criterion, answer: &str, ctx: &GuardContext) -> String {
    let criteria_text = match criterion {
        Criterion::ContentSafety => safety_criteria_text(ctx.content_type),
        Criterion::Quality => {
            "Response is accurate, comprehensive, well formatted, and helpful"
        }
        Criterion::BusinessLogic => business_criteria_text(ctx.business_context.as_deref()),
        Criterion::BiasDetection => bias_criteria_text(ctx.bias_type.as_deref()),
        Criterion::CulturalSensitivity => {
            "Response demonstrates cultural sensitivity and avoids stereotypes"
        }
    };
    format!(
        "Criteria: {criteria_text}\nAudience: {:?}\n\nResponse under evaluation:\n{answer}\n\n\
         Respond with the judgment word followed by a short explanation.",
        ctx.content_type
    )
}

fn summarize(verdicts: Vec<CriterionVerdict>, ctx: &GuardContext) -> SafetyEvaluation {
    let mut critical_failures = Vec::new();
    let mut all_passed = true;

    for v in &verdicts {
        if v.errored {
            all_passed = false;
            critical_failures.push(format!("{} evaluation failed", v.criterion.name()));
            continue;
        }
        if !v.passed {
            all_passed = false;
            if v.criterion == Criterion::ContentSafety && ctx.content_type.is_protected() {
                critical_failures.push(format!(
                    "Critical safety failure for {:?} content",
                    ctx.content_type
                ));
            } else if v.score < SEVERE_SCORE {
                critical_failures.push(format!(
                    "Severe {} failure (score: {:.2})",
                    v.criterion.name(),
                    v.score
                ));
            }
        }
    }

    let overall_score = if verdicts.is_empty() {
        0.0
    } else {
        let sum: f64 = verdicts.iter().map(|v| v.score).sum();
        ((sum / verdicts.len() as f64) * 100.0).round() / 100.0
    };

    let passed = all_passed && overall_score >= PASS_THRESHOLD && critical_failures.is_empty();
    let recommendations = recommendations_for(&verdicts, overall_score, &critical_failures, ctx);

    SafetyEvaluation {
        overall_score,
        passed,
        criteria: verdicts,
        critical_failures,
        recommendations,
    }
}

fn recommendations_for(
    verdicts: &[CriterionVerdict],
    overall_score: f64,
    critical_failures: &[String],
    ctx: &GuardContext,
) -> Vec<String> {
    let mut recs = Vec::new();

    if !critical_failures.is_empty() {
        recs.push("Address critical failures before serving this answer".to_string());
    }

    for v in verdicts.iter().filter(|v| !v.passed) {
        match v.criterion {
            Criterion::ContentSafety => {
                recs.push("Review content appropriateness and age ratings".to_string());
                if ctx.content_type.is_protected() {
                    recs.push("Ensure child-safe content recommendations".to_string());
                }
            }
            Criterion::Quality => {
                recs.push("Enhance response detail, accuracy, and formatting".to_string());
            }
            Criterion::BusinessLogic => {
                recs.push("Validate commercial viability and strategic fit".to_string());
            }
            Criterion::BiasDetection => {
                recs.push("Address cultural, demographic, or regional biases".to_string());
            }
            Criterion::CulturalSensitivity => {
                recs.push("Improve cultural sensitivity and global appropriateness".to_string());
            }
        }
    }

    if overall_score < SEVERE_SCORE {
        recs.push("Answer requires major revision across multiple areas".to_string());
    } else if overall_score < PASS_THRESHOLD {
        recs.push("Answer needs improvements to meet quality standards".to_string());
    } else if recs.is_empty() {
        recs.push("Answer meets all evaluation standards".to_string());
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn positive_verdict_scores_high() {
        let v = parse_judgment(
            Criterion::ContentSafety,
            "SAFE. Suitable for everyone.",
            ContentType::General,
        );
        assert!(v.passed);
        assert_eq!(v.score, 0.9);
    }

    #[test]
    fn negative_overrides_positive() {
        let v = parse_judgment(
            Criterion::ContentSafety,
            "SAFE at first glance but actually UNSAFE for children.",
            ContentType::General,
        );
        assert!(!v.passed);
        assert_eq!(v.score, 0.1);
    }

    #[test]
    fn kids_failures_score_lower() {
        let v = parse_judgment(Criterion::Quality, "POOR answer.", ContentType::Kids);
        assert!(!v.passed);
        assert!((v.score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn kids_adjustment_never_goes_below_floor() {
        let v = parse_judgment(Criterion::ContentSafety, "UNSAFE.", ContentType::Kids);
        assert!((v.score - 0.05).abs() < 1e-9);
    }

    #[test]
    fn family_success_gets_boost_with_cap() {
        let v = parse_judgment(Criterion::CulturalSensitivity, "SENSITIVE.", ContentType::Family);
        assert!(v.passed);
        assert!((v.score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn blocklist_screens_known_titles_for_kids() {
        let list = Blocklist::default();
        assert!(!list.screen("Watch Squid Game tonight!", ContentType::Kids));
        assert!(!list.screen("great psychological thriller picks", ContentType::Family));
        assert!(list.screen("Watch Squid Game tonight!", ContentType::General));
        assert!(list.screen("Enola Holmes is a lovely film", ContentType::Family));
    }

    #[test]
    fn teen_screen_blocks_extreme_content() {
        let list = Blocklist::default();
        assert!(!list.screen("features graphic violence throughout", ContentType::Teen));
        assert!(list.screen("a tense thriller", ContentType::Teen));
    }

    struct CountingJudge {
        calls: AtomicUsize,
    }

    impl JudgeTransport for CountingJudge {
        fn judge<'a>(
            &'a self,
            instructions: &'a str,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_ne!(
                instructions,
                Criterion::ContentSafety.instructions(),
                "safety judge must be skipped for screened family content"
            );
            Box::pin(async { Ok("GOOD VIABLE FAIR SENSITIVE".to_string()) })
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn screened_family_content_skips_safety_judge() {
        let judge = Arc::new(CountingJudge {
            calls: AtomicUsize::new(0),
        });
        let guard = Guardrail::new(Some(judge.clone()), Blocklist::default());
        let ctx = GuardContext {
            content_type: ContentType::Kids,
            ..Default::default()
        };
        let eval = guard
            .evaluate("For your kids I recommend Squid Game", &ctx)
            .await
            .unwrap();

        // Four judge calls, not five.
        assert_eq!(judge.calls.load(Ordering::SeqCst), 4);
        assert!(!eval.passed);
        assert!(eval
            .critical_failures
            .iter()
            .any(|f| f.contains("safety failure")));
    }

    struct FailingJudge;

    impl JudgeTransport for FailingJudge {
        fn judge<'a>(
            &'a self,
            _instructions: &'a str,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = BestEffort<String>> + Send + 'a>> {
            Box::pin(async { Err(Unavailable::Timeout) })
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn judge_errors_zero_the_criterion_but_continue() {
        let guard = Guardrail::new(Some(Arc::new(FailingJudge)), Blocklist::default());
        let eval = guard
            .evaluate("some answer", &GuardContext::default())
            .await
            .unwrap();
        assert_eq!(eval.criteria.len(), 5);
        assert!(eval.criteria.iter().all(|v| v.errored && v.score == 0.0));
        assert!(!eval.passed);
        assert_eq!(eval.overall_score, 0.0);
    }

    #[tokio::test]
    async fn approving_judge_passes_everything() {
        let guard = Guardrail::new(Some(Arc::new(ApprovingJudge)), Blocklist::default());
        let eval = guard
            .evaluate("International content grew 60% since 2018", &GuardContext::default())
            .await
            .unwrap();
        assert!(eval.passed);
        assert!(eval.overall_score >= 0.6);
        assert!(eval.critical_failures.is_empty());
        assert_eq!(eval.recommendations, vec!["Answer meets all evaluation standards"]);
    }

    #[tokio::test]
    async fn no_transport_reports_unavailable() {
        let guard = Guardrail::new(None, Blocklist::default());
        let out = guard.evaluate("anything", &GuardContext::default()).await;
        assert_eq!(out, Err(Unavailable::MissingCredentials));
    }
}
