use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::config::{EnforcerConfig, ExtractConfig};
use crate::ops::check::{ValidationResult, validate};
use crate::ops::extract::fallback_markdown;
use crate::ops::guardrail::{drops_pois, introduces_extra_days};

/// Why a repair call produced no usable text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixError {
    #[error("text fixer unavailable: {0}")]
    Unavailable(String),
    #[error("text fixer timed out after {0}s")]
    Timeout(u64),
    #[error("text fixer failed: {0}")]
    Failed(String),
}

/// The external capability that rewrites invalid markdown.
///
/// Responses are never trusted: every one is validated again, and the fixer
/// is not assumed to be idempotent or free of side effects.
pub trait TextFixer {
    fn fix(&self, prompt: &str) -> Result<String, FixError>;
}

impl<F> TextFixer for F
where
    F: Fn(&str) -> Result<String, FixError>,
{
    fn fix(&self, prompt: &str) -> Result<String, FixError> {
        self(prompt)
    }
}

/// Shared flag checked between repair attempts
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No fixer configured; nothing was attempted
    NoFixer,
    FixerUnavailable,
    FixerTimeout,
    FixerFailed,
    EmptyResponse,
    /// A valid candidate added days the source never marks
    ExtraDays,
    /// A repaired candidate lost a POI the source names
    DroppedPois,
    RetryBudgetExhausted,
    Cancelled,
}

/// Final state of one enforcement run
#[derive(Debug, Clone, Serialize)]
pub struct EnforceOutcome {
    pub markdown: String,
    pub check: ValidationResult,
    /// Fixer calls made
    pub attempts: u32,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

/// Validate, repair through a [`TextFixer`], validate again, and fall back
/// to the deterministic extraction when repair cannot succeed.
pub struct Enforcer<'f> {
    fixer: Option<&'f dyn TextFixer>,
    max_attempts: u32,
    cancel: Option<CancelToken>,
    extract: ExtractConfig,
}

impl<'f> Enforcer<'f> {
    pub fn new(config: &EnforcerConfig) -> Self {
        Enforcer {
            fixer: None,
            max_attempts: config.max_attempts,
            cancel: None,
            extract: ExtractConfig::default(),
        }
    }

    pub fn with_fixer(mut self, fixer: &'f dyn TextFixer) -> Self {
        self.fixer = Some(fixer);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_extract_config(mut self, extract: ExtractConfig) -> Self {
        self.extract = extract;
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Drive `candidate` to a valid document. `source` is the text the
    /// fallback is extracted from and the reference for the day-count check.
    /// A repaired candidate must also keep every POI the source names.
    /// Always returns valid markdown.
    pub fn enforce(&self, candidate: &str, source: &str) -> EnforceOutcome {
        let mut current = candidate.to_string();
        let mut attempts = 0;

        loop {
            if self.cancelled() {
                return self.fallback(source, attempts, FallbackReason::Cancelled);
            }

            let check = validate(&current);
            if check.valid {
                if introduces_extra_days(source, &current) {
                    tracing::warn!(attempts, "candidate adds days beyond the source markers");
                    return self.fallback(source, attempts, FallbackReason::ExtraDays);
                }
                if attempts > 0 && drops_pois(source, &current) {
                    tracing::warn!(attempts, "repaired candidate no longer names every source POI");
                    return self.fallback(source, attempts, FallbackReason::DroppedPois);
                }
                if attempts > 0 {
                    tracing::info!(attempts, "repaired markdown accepted");
                }
                return EnforceOutcome {
                    markdown: current,
                    check,
                    attempts,
                    fallback_used: false,
                    fallback_reason: None,
                };
            }

            let Some(fixer) = self.fixer else {
                return self.fallback(source, attempts, FallbackReason::NoFixer);
            };
            if attempts >= self.max_attempts {
                return self.fallback(source, attempts, FallbackReason::RetryBudgetExhausted);
            }

            attempts += 1;
            tracing::info!(attempt = attempts, errors = check.errors.len(), "requesting repair");
            let prompt = build_repair_prompt(&current, &check);
            let response = match fixer.fix(&prompt) {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(error = %err, attempt = attempts, "repair call failed");
                    let reason = match err {
                        FixError::Unavailable(_) => FallbackReason::FixerUnavailable,
                        FixError::Timeout(_) => FallbackReason::FixerTimeout,
                        FixError::Failed(_) => FallbackReason::FixerFailed,
                    };
                    return self.fallback(source, attempts, reason);
                }
            };

            current = extract_markdown_payload(&response);
            if current.trim().is_empty() {
                return self.fallback(source, attempts, FallbackReason::EmptyResponse);
            }
        }
    }

    fn fallback(&self, source: &str, attempts: u32, reason: FallbackReason) -> EnforceOutcome {
        tracing::warn!(?reason, attempts, "using deterministic fallback");
        let markdown = fallback_markdown(source, &self.extract);
        let check = validate(&markdown);
        if !check.valid {
            tracing::error!(errors = ?check.messages(), "deterministic fallback failed validation");
        }
        EnforceOutcome {
            markdown,
            check,
            attempts,
            fallback_used: true,
            fallback_reason: Some(reason),
        }
    }
}

/// Prompt for one repair attempt: the full ordered error list, the grammar,
/// and the text to fix.
pub fn build_repair_prompt(markdown: &str, check: &ValidationResult) -> String {
    let errors = check
        .messages()
        .iter()
        .map(|m| format!("- {}", m))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "你是行程格式修复助手。下面的行程 Markdown 没有通过格式校验。\n\
只修复结构，不要编造原文中没有的地点、餐厅、车次或时间。\n\
\n\
格式要求：\n\
# 行程安排\n\
> 版本: v2\n\
\n\
## Day N（可选日期）\n\
- HH:MM - HH:MM | 活动 | 地点（可空） | 备注（可空）\n\
\n\
规则：\n\
1. 每个 Day 标题下至少有一行以 \"- \" 开头的行项目。\n\
2. 时间使用 24 小时制 HH:MM；结束时间可以留空，写成 \"HH:MM - \"。\n\
3. 不要新增原文中没有的 Day。\n\
4. 无法排进时间的内容放在以 \">\" 开头的行中。\n\
\n\
校验错误：\n\
{errors}\n\
\n\
待修复的 Markdown：\n\
{markdown}\n\
\n\
只输出修复后的 Markdown，不要解释。\n"
    )
}

static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\n(.*?)```").unwrap());

#[derive(Deserialize)]
struct MarkdownEnvelope {
    #[serde(alias = "markdown")]
    markdown_content: String,
}

/// Unwrap a fixer response: raw markdown, a fenced block, or a JSON
/// envelope `{"markdown_content": "..."}` (possibly fenced itself).
pub fn extract_markdown_payload(response: &str) -> String {
    let trimmed = response.trim();
    let unfenced = FENCED
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str().trim());

    if unfenced.starts_with('{')
        && let Ok(envelope) = serde_json::from_str::<MarkdownEnvelope>(unfenced)
    {
        return envelope.markdown_content.trim().to_string();
    }
    unfenced.to_string()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const BROKEN: &str = "# 行程安排\n## Day 1\n- - | 欧堡酒店 |\n";
    const REPAIRED: &str = "# 行程安排\n> 版本: v2\n\n## Day 1\n- 09:00 - | 入住 | 欧堡酒店 |\n";
    const SOURCE: &str = "随便一段生成前输入（不一定是v2行程表）";

    fn config(max_attempts: u32) -> EnforcerConfig {
        EnforcerConfig {
            max_attempts,
            ..EnforcerConfig::default()
        }
    }

    #[test]
    fn valid_candidate_is_accepted_without_calls() {
        let out = Enforcer::new(&config(3)).enforce(REPAIRED, SOURCE);
        assert!(!out.fallback_used);
        assert_eq!(out.attempts, 0);
        assert_eq!(out.markdown, REPAIRED);
    }

    #[test]
    fn no_fixer_falls_back_immediately() {
        let out = Enforcer::new(&config(5)).enforce(BROKEN, SOURCE);
        assert!(out.fallback_used);
        assert!(out.check.valid);
        assert!(validate(&out.markdown).valid);
        assert_eq!(out.attempts, 0);
        assert_eq!(out.fallback_reason, Some(FallbackReason::NoFixer));
    }

    #[test]
    fn repair_succeeds_on_second_attempt() {
        let calls = Cell::new(0);
        let fixer = |_: &str| -> Result<String, FixError> {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Ok("## Day 1\n- 9点 | 还是错的".to_string())
            } else {
                Ok(format!("```markdown\n{}```", REPAIRED))
            }
        };
        let out = Enforcer::new(&config(3)).with_fixer(&fixer).enforce(BROKEN, SOURCE);
        assert!(!out.fallback_used);
        assert_eq!(out.attempts, 2);
        assert_eq!(out.markdown, REPAIRED.trim());
    }

    #[test]
    fn budget_is_bounded() {
        let calls = Cell::new(0u32);
        let fixer = |_: &str| -> Result<String, FixError> {
            calls.set(calls.get() + 1);
            Ok(BROKEN.to_string())
        };
        let out = Enforcer::new(&config(3)).with_fixer(&fixer).enforce(BROKEN, SOURCE);
        assert_eq!(calls.get(), 3);
        assert_eq!(out.attempts, 3);
        assert_eq!(out.fallback_reason, Some(FallbackReason::RetryBudgetExhausted));
        assert!(out.check.valid);
    }

    #[test]
    fn fixer_errors_force_fallback() {
        let cases = [
            (FixError::Unavailable("no key".into()), FallbackReason::FixerUnavailable),
            (FixError::Timeout(60), FallbackReason::FixerTimeout),
            (FixError::Failed("500".into()), FallbackReason::FixerFailed),
        ];
        for (err, reason) in cases {
            let fixer = move |_: &str| -> Result<String, FixError> { Err(err.clone()) };
            let out = Enforcer::new(&config(3)).with_fixer(&fixer).enforce(BROKEN, SOURCE);
            assert_eq!(out.fallback_reason, Some(reason));
            assert_eq!(out.attempts, 1);
            assert!(out.check.valid);
        }
    }

    #[test]
    fn empty_response_forces_fallback() {
        let fixer = |_: &str| -> Result<String, FixError> { Ok("  \n".to_string()) };
        let out = Enforcer::new(&config(3)).with_fixer(&fixer).enforce(BROKEN, SOURCE);
        assert_eq!(out.fallback_reason, Some(FallbackReason::EmptyResponse));
    }

    #[test]
    fn extra_days_are_rejected() {
        let source = "D1：中央大街→索菲亚教堂\nD2：冰雪大世界\n";
        let candidate = "## Day 1\n- 09:00 - | 游览 | 中央大街 |\n## Day 2\n- 09:00 - | 游览 | 冰雪大世界 |\n## Day 3\n- 09:00 - | 交通 | 机场 |\n";
        let out = Enforcer::new(&config(3)).enforce(candidate, source);
        assert_eq!(out.fallback_reason, Some(FallbackReason::ExtraDays));
        assert!(!out.markdown.contains("## Day 3"));
        assert!(out.markdown.contains("冰雪大世界"));
    }

    #[test]
    fn cancellation_yields_fallback() {
        let token = CancelToken::new();
        token.cancel();
        let out = Enforcer::new(&config(3))
            .with_cancel(token)
            .enforce(REPAIRED, SOURCE);
        assert_eq!(out.fallback_reason, Some(FallbackReason::Cancelled));
        assert!(out.check.valid);
    }

    #[test]
    fn repair_that_drops_a_poi_is_rejected() {
        let source = "Day1: 外滩-豫园\n";
        let fixer = |_: &str| -> Result<String, FixError> {
            Ok("## Day 1\n- 09:00 - | 游览 | 外滩 |\n".to_string())
        };
        let out = Enforcer::new(&config(3)).with_fixer(&fixer).enforce(BROKEN, source);
        assert_eq!(out.fallback_reason, Some(FallbackReason::DroppedPois));
        assert_eq!(out.attempts, 1);
        assert!(out.check.valid);
        assert!(out.markdown.contains("豫园"));
    }

    #[test]
    fn repair_keeping_every_poi_is_accepted() {
        let source = "Day1: 外滩-豫园\n";
        let repaired = "## Day 1\n- 09:00 - | 游览 | 外滩 |\n- 10:00 - | 游览 | 豫园 |";
        let fixer = |_: &str| -> Result<String, FixError> { Ok(repaired.to_string()) };
        let out = Enforcer::new(&config(3)).with_fixer(&fixer).enforce(BROKEN, source);
        assert!(!out.fallback_used);
        assert_eq!(out.markdown, repaired);
    }

    #[test]
    fn cancellation_during_a_repair_stops_the_loop() {
        let token = CancelToken::new();
        let calls = Cell::new(0u32);
        let remote = token.clone();
        let fixer = |_: &str| -> Result<String, FixError> {
            calls.set(calls.get() + 1);
            remote.cancel();
            Ok(BROKEN.to_string())
        };
        let out = Enforcer::new(&config(3))
            .with_fixer(&fixer)
            .with_cancel(token)
            .enforce(BROKEN, SOURCE);
        assert_eq!(calls.get(), 1);
        assert_eq!(out.attempts, 1);
        assert_eq!(out.fallback_reason, Some(FallbackReason::Cancelled));
        assert!(out.check.valid);
    }

    #[test]
    fn prompt_lists_every_error() {
        let check = validate(BROKEN);
        let prompt = build_repair_prompt(BROKEN, &check);
        for message in check.messages() {
            assert!(prompt.contains(&message), "missing {}", message);
        }
        assert!(prompt.contains(BROKEN));
    }

    #[test]
    fn payload_forms() {
        assert_eq!(extract_markdown_payload("  ## Day 1\n"), "## Day 1");
        assert_eq!(extract_markdown_payload("好的：\n```md\n## Day 1\n```\n"), "## Day 1");
        assert_eq!(
            extract_markdown_payload(r###"{"markdown_content": "## Day 1\n- 09:00 - | A"}"###),
            "## Day 1\n- 09:00 - | A"
        );
        assert_eq!(
            extract_markdown_payload("```json\n{\"markdown\": \"## Day 2\"}\n```"),
            "## Day 2"
        );
        assert_eq!(extract_markdown_payload("{not json"), "{not json");
    }
}
