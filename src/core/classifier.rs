//! Name classifier.
//!
//! Turns a raw file or folder name into a [`ParseCandidate`] using the AI
//! backend. The answer must match a strict schema; anything else is a
//! classification failure, never a partially filled candidate.

use crate::core::retry::RetryPolicy;
use crate::models::media::{MediaKind, ParseCandidate};
use crate::services::AiBackend;
use crate::{Error, Result};
use chrono::Datelike;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Schema of the AI answer. Every field must be present; `year` may be null.
#[derive(Debug, Deserialize)]
struct AiClassification {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    original_title: String,
    #[serde(deserialize_with = "Option::deserialize")]
    year: Option<u16>,
    confidence: f32,
}

/// AI-backed name classifier.
pub struct NameClassifier {
    backend: Arc<dyn AiBackend>,
    retry: RetryPolicy,
}

impl NameClassifier {
    pub fn new(backend: Arc<dyn AiBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Classify a raw name as the declared kind.
    pub async fn classify(&self, raw_name: &str, kind: MediaKind) -> Result<ParseCandidate> {
        self.classify_with_context(raw_name, kind, None, &CancellationToken::new())
            .await
    }

    /// Classify a raw name, passing an extra naming hint (e.g., the parent folder).
    ///
    /// An interrupt stops further attempts and yields [`Error::Cancelled`].
    pub async fn classify_with_context(
        &self,
        raw_name: &str,
        kind: MediaKind,
        context: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ParseCandidate> {
        let prompt = build_prompt(raw_name, kind, context);
        tracing::debug!("Classifying {} '{}'", kind, raw_name);

        let start = std::time::Instant::now();
        let content = self
            .retry
            .run("AI classification", cancel, || self.backend.complete(&prompt))
            .await
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                e => Error::Classification {
                    name: raw_name.to_string(),
                    reason: e.to_string(),
                },
            })?;
        tracing::debug!(
            "AI answered in {:.1}s: {}",
            start.elapsed().as_secs_f32(),
            content
        );

        parse_response(&content, kind).map_err(|reason| Error::Classification {
            name: raw_name.to_string(),
            reason,
        })
    }
}

/// Kind-specific instruction template.
fn build_prompt(raw_name: &str, kind: MediaKind, context: Option<&str>) -> String {
    let type_hint = match kind {
        MediaKind::Movie => "这是一个电影文件",
        MediaKind::TvShow => "这是一个电视剧文件夹，代表整部剧集",
    };
    let context_line = context
        .map(|c| format!("所在文件夹: {}\n", c))
        .unwrap_or_default();
    let type_value = kind.wire_name();

    format!(
        r#"你是一个视频文件名解析专家。请分析以下名称，提取作品信息。

名称: {raw_name}
{context_line}提示: {type_hint}

请以JSON格式返回以下字段：
1. type: 固定为 "{type_value}"
2. title: 中文标题
3. original_title: 原始标题（通常是英文）
4. year: 发行年份（4位数字），无法确定时返回null
5. confidence: 你对解析结果的置信度（0.0到1.0之间的小数）

注意事项：
- 忽略分辨率（如1080p、4K）、编码格式（如x265、HEVC）、音频格式（如DTS、AAC）等技术信息
- 忽略发布组名称（通常在方括号或末尾）
- 忽略季数和集数（如S01、E05）
- 续集编号（如2、3、II、III）是标题的一部分
- 版本信息（如"导演剪辑版"、"加长版"、"IMAX版"）不是标题的一部分
- 如果只能识别出一个标题，title 和 original_title 都填写该标题

只返回JSON对象，不要包含其他文字：
{{"type": "{type_value}", "title": "...", "original_title": "...", "year": ..., "confidence": ...}}"#
    )
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Validate an AI answer against the schema and the declared kind.
fn parse_response(content: &str, kind: MediaKind) -> std::result::Result<ParseCandidate, String> {
    let answer: AiClassification = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| format!("malformed response: {}", e))?;

    if answer.kind != kind.wire_name() {
        return Err(format!(
            "expected type '{}', got '{}'",
            kind.wire_name(),
            answer.kind
        ));
    }

    if !answer.confidence.is_finite() || !(0.0..=1.0).contains(&answer.confidence) {
        return Err(format!("confidence {} outside [0, 1]", answer.confidence));
    }

    if let Some(year) = answer.year {
        let max_year = chrono::Utc::now().year() as u16 + 5;
        if !(1900..=max_year).contains(&year) {
            return Err(format!("implausible year {}", year));
        }
    }

    let localized_title = answer.title.trim().to_string();
    let original_title = answer.original_title.trim().to_string();
    if localized_title.is_empty() && original_title.is_empty() {
        return Err("no title in response".to_string());
    }

    Ok(ParseCandidate {
        kind,
        localized_title,
        original_title,
        year: answer.year,
        confidence: answer.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedAi {
        answers: Vec<Result<String>>,
        calls: AtomicUsize,
    }

    impl FixedAi {
        fn new(answers: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                answers,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AiBackend for FixedAi {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answers.get(n.min(self.answers.len() - 1)) {
                Some(Ok(s)) => Ok(s.clone()),
                Some(Err(_)) => Err(Error::AiBackend("connection refused".into())),
                None => Err(Error::AiBackend("no answer".into())),
            }
        }
    }

    const AVATAR: &str = r#"{"type":"movie","title":"阿凡达","original_title":"Avatar","year":2009,"confidence":0.95}"#;

    #[tokio::test]
    async fn test_classify_avatar() {
        let ai = FixedAi::new(vec![Ok(AVATAR.to_string())]);
        let classifier = NameClassifier::new(ai, RetryPolicy::none());

        let candidate = classifier
            .classify("阿凡达.Avatar.2009.1080p.BluRay.x264.mkv", MediaKind::Movie)
            .await
            .unwrap();

        assert_eq!(candidate.kind, MediaKind::Movie);
        assert_eq!(candidate.localized_title, "阿凡达");
        assert_eq!(candidate.original_title, "Avatar");
        assert_eq!(candidate.year, Some(2009));
    }

    #[tokio::test]
    async fn test_retries_backend_errors_then_fails() {
        let ai = FixedAi::new(vec![Err(Error::other("x"))]);
        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::from_secs(1));
        let classifier = NameClassifier::new(ai.clone(), policy);

        let err = classifier.classify("x.mkv", MediaKind::Movie).await.unwrap_err();
        assert!(matches!(err, Error::Classification { .. }));
        assert_eq!(ai.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_answer_is_not_retried() {
        let ai = FixedAi::new(vec![Ok("not json".to_string())]);
        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::from_secs(1));
        let classifier = NameClassifier::new(ai.clone(), policy);

        assert!(classifier.classify("x.mkv", MediaKind::Movie).await.is_err());
        assert_eq!(ai.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interrupt_is_not_a_classification_failure() {
        let ai = FixedAi::new(vec![Ok(AVATAR.to_string())]);
        let classifier = NameClassifier::new(ai.clone(), RetryPolicy::none());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = classifier
            .classify_with_context("x.mkv", MediaKind::Movie, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(ai.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_fields_fail() {
        let no_year = r#"{"type":"movie","title":"阿凡达","original_title":"Avatar","confidence":0.9}"#;
        assert!(parse_response(no_year, MediaKind::Movie).is_err());

        let no_conf = r#"{"type":"movie","title":"阿凡达","original_title":"Avatar","year":2009}"#;
        assert!(parse_response(no_conf, MediaKind::Movie).is_err());
    }

    #[test]
    fn test_null_year_is_accepted() {
        let raw = r#"{"type":"tv_show","title":"权力的游戏","original_title":"Game of Thrones","year":null,"confidence":0.8}"#;
        let candidate = parse_response(raw, MediaKind::TvShow).unwrap();
        assert_eq!(candidate.year, None);
    }

    #[test]
    fn test_mistyped_fields_fail() {
        let string_year = r#"{"type":"movie","title":"a","original_title":"b","year":"2009","confidence":0.9}"#;
        assert!(parse_response(string_year, MediaKind::Movie).is_err());

        let big_conf = r#"{"type":"movie","title":"a","original_title":"b","year":2009,"confidence":85}"#;
        assert!(parse_response(big_conf, MediaKind::Movie).is_err());
    }

    #[test]
    fn test_kind_mismatch_fails() {
        assert!(parse_response(AVATAR, MediaKind::TvShow).is_err());
    }

    #[test]
    fn test_blank_titles_fail() {
        let raw = r#"{"type":"movie","title":" ","original_title":"","year":2009,"confidence":0.9}"#;
        assert!(parse_response(raw, MediaKind::Movie).is_err());
    }

    #[test]
    fn test_implausible_year_fails() {
        let raw = r#"{"type":"movie","title":"a","original_title":"b","year":1080,"confidence":0.9}"#;
        assert!(parse_response(raw, MediaKind::Movie).is_err());
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let fenced = format!("```json\n{}\n```", AVATAR);
        let candidate = parse_response(&fenced, MediaKind::Movie).unwrap();
        assert_eq!(candidate.original_title, "Avatar");
    }

    #[test]
    fn test_prompt_mentions_kind_and_context() {
        let prompt = build_prompt("Avatar.mkv", MediaKind::Movie, Some("阿凡达"));
        assert!(prompt.contains("Avatar.mkv"));
        assert!(prompt.contains("所在文件夹: 阿凡达"));
        assert!(prompt.contains("\"movie\""));

        let prompt = build_prompt("Game of Thrones", MediaKind::TvShow, None);
        assert!(prompt.contains("tv_show"));
        assert!(!prompt.contains("所在文件夹"));
    }
}
