use serde::Serialize;

use crate::model::config::ItineraConfig;
use crate::ops::check::{ValidationResult, looks_low_quality, validate};
use crate::ops::enforce::{CancelToken, EnforceOutcome, Enforcer, TextFixer};
use crate::ops::extract::fallback_markdown;
use crate::ops::guardrail::{ensure_contains_all_pois, extract_pois_by_day, fallback_from_pois};
use crate::ops::rationalize::{RationalizeOptions, rationalize};
use crate::ops::sanitize::sanitize_times;
use crate::parse::itinerary_parser::parse_itinerary;
use crate::parse::itinerary_serializer::render;

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub markdown: String,
    pub check: ValidationResult,
    pub enforce: EnforceOutcome,
    /// The enforced plan was too thin and was rebuilt from the source's POIs
    pub rebuilt_from_pois: bool,
    pub pois_added: usize,
}

/// Optional collaborators for [`run_pipeline`]
#[derive(Default)]
pub struct PipelineHooks<'f> {
    /// A drafted plan to enforce instead of the extraction
    pub draft: Option<&'f str>,
    pub fixer: Option<&'f dyn TextFixer>,
    pub cancel: Option<CancelToken>,
}

/// Source text in, canonical markdown out. Always returns a valid document.
pub fn run_pipeline(input: &str, config: &ItineraConfig, hooks: PipelineHooks<'_>) -> PipelineOutput {
    let extracted;
    let candidate = match hooks.draft {
        Some(draft) => draft,
        None => {
            extracted = fallback_markdown(input, &config.extract);
            extracted.as_str()
        }
    };

    let mut enforcer = Enforcer::new(&config.enforcer).with_extract_config(config.extract.clone());
    if let Some(fixer) = hooks.fixer {
        enforcer = enforcer.with_fixer(fixer);
    }
    if let Some(cancel) = hooks.cancel {
        enforcer = enforcer.with_cancel(cancel);
    }
    let enforced = enforcer.enforce(candidate, input);

    let pois = extract_pois_by_day(input);
    let rebuilt_from_pois = !pois.is_empty() && looks_low_quality(&enforced.markdown, &config.quality);
    let doc = if rebuilt_from_pois {
        tracing::info!(days = pois.len(), "plan too thin, rebuilding from source POIs");
        fallback_from_pois(&pois, &config.schedule)
    } else {
        parse_itinerary(&enforced.markdown).document
    };

    let options = RationalizeOptions {
        schedule: &config.schedule,
        durations: &config.durations,
        reference: Some(input),
    };
    let mut doc = rationalize(&doc, &options);
    let pois_added = ensure_contains_all_pois(&mut doc, &pois, &config.schedule);
    sanitize_times(&mut doc, &config.schedule);

    let mut markdown = render(&doc);
    let mut check = validate(&markdown);
    if !check.valid {
        tracing::error!(errors = ?check.messages(), "pipeline produced invalid markdown, using fallback");
        markdown = fallback_markdown(input, &config.extract);
        check = validate(&markdown);
    }

    PipelineOutput {
        markdown,
        check,
        enforce: enforced,
        rebuilt_from_pois,
        pois_added,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::enforce::FixError;

    const SHANGHAI: &str = "\
# 团建行程方案

## 行程路线
- Day1: 南京路步行街-上海邮政博物馆-外白渡桥-乍浦路桥
- Day2：愚园路-安福路-武康路-武康大楼
";

    #[test]
    fn free_text_becomes_valid_and_keeps_pois() {
        let out = run_pipeline(SHANGHAI, &ItineraConfig::default(), PipelineHooks::default());
        assert!(out.check.valid, "{:?}\n{}", out.check.errors, out.markdown);
        for poi in ["南京路步行街", "乍浦路桥", "愚园路", "武康大楼"] {
            assert!(out.markdown.contains(poi), "missing {}\n{}", poi, out.markdown);
        }
        assert!(!out.markdown.contains("## Day 3"));
    }

    #[test]
    fn running_on_own_output_is_stable() {
        let config = ItineraConfig::default();
        let first = run_pipeline(SHANGHAI, &config, PipelineHooks::default());
        let second = run_pipeline(
            SHANGHAI,
            &config,
            PipelineHooks {
                draft: Some(&first.markdown),
                ..PipelineHooks::default()
            },
        );
        assert_eq!(first.markdown, second.markdown);
    }

    #[test]
    fn broken_draft_without_fixer_falls_back() {
        let out = run_pipeline(
            SHANGHAI,
            &ItineraConfig::default(),
            PipelineHooks {
                draft: Some("# 行程安排\n## Day 1\n- - | 欧堡酒店 |\n"),
                ..PipelineHooks::default()
            },
        );
        assert!(out.enforce.fallback_used);
        assert!(out.check.valid);
        assert!(out.markdown.contains("外白渡桥"));
    }

    #[test]
    fn failing_fixer_never_surfaces() {
        let fixer = |_: &str| -> Result<String, FixError> { Err(FixError::Timeout(1)) };
        let out = run_pipeline(
            "",
            &ItineraConfig::default(),
            PipelineHooks {
                draft: Some("not an itinerary"),
                fixer: Some(&fixer),
                cancel: None,
            },
        );
        assert!(out.check.valid);
        assert!(out.enforce.fallback_used);
    }
}
