// src/memory/features/signals.rs
// Deterministic creative-signal classification. Keyword and shape rules
// over the opening sentence (hook) and the closing lines (call to action);
// no model call involved, so generation can fall back to this under budget
// denial and still get stable signals.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    Question,
    Contrarian,
    Transformation,
    List,
    Story,
    Statistic,
    Statement,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::Question => "question",
            HookType::Contrarian => "contrarian",
            HookType::Transformation => "transformation",
            HookType::List => "list",
            HookType::Story => "story",
            HookType::Statistic => "statistic",
            HookType::Statement => "statement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtaType {
    Save,
    Comment,
    Share,
    Link,
    None,
}

impl CtaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CtaType::Save => "save",
            CtaType::Comment => "comment",
            CtaType::Share => "share",
            CtaType::Link => "link",
            CtaType::None => "none",
        }
    }
}

/// Hook and CTA classification for one piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeSignals {
    pub hook_type: HookType,
    pub cta_type: CtaType,
}

static LIST_HOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+|top \d+)\s+(ways?|tips?|steps?|reasons?|mistakes?|lessons?|hacks?)\b").unwrap());
static STATISTIC_HOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^\s*\d+(\.\d+)?%)|(\d+(\.\d+)?%\s+of\b)|(^\s*\d[\d,.]*\s)").unwrap());
static TRANSFORMATION_HOOK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(went from|from zero to|before and after|transformed|turned .{1,40} into|in (just )?\d+ (days?|weeks?|months?))\b").unwrap()
});
static STORY_HOOK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(when i|last (week|month|year)|a few (days|weeks|months) ago|i remember|storytime|i('| a)?m going to tell you|yesterday|i once)\b").unwrap()
});
static CONTRARIAN_HOOK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(unpopular opinion|hot take|stop (doing|posting|using)|everyone is wrong|nobody talks about|the truth about|myth|you don('|')t need)\b").unwrap()
});
static QUESTION_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(what|why|how|when|where|who|which|did you|do you|have you|are you|is your|ever wonder)\b").unwrap()
});

/// Classifies the opening sentence and closing call-to-action of a text.
/// Empty or whitespace-only content is a plain statement with no CTA.
pub fn derive_creative_signals(content: &str) -> CreativeSignals {
    CreativeSignals {
        hook_type: classify_hook(content),
        cta_type: classify_cta(content),
    }
}

fn opening_sentence(content: &str) -> &str {
    let trimmed = content.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

fn classify_hook(content: &str) -> HookType {
    let opener = opening_sentence(content);
    if opener.trim().is_empty() {
        return HookType::Statement;
    }

    // Question first: a contrarian question still reads as a question hook.
    if opener.trim_end().ends_with('?') || QUESTION_OPENER.is_match(opener) {
        return HookType::Question;
    }
    if CONTRARIAN_HOOK.is_match(opener) {
        return HookType::Contrarian;
    }
    if LIST_HOOK.is_match(opener) {
        return HookType::List;
    }
    if STATISTIC_HOOK.is_match(opener) {
        return HookType::Statistic;
    }
    if TRANSFORMATION_HOOK.is_match(opener) {
        return HookType::Transformation;
    }
    if STORY_HOOK.is_match(opener) {
        return HookType::Story;
    }
    HookType::Statement
}

fn classify_cta(content: &str) -> CtaType {
    // The CTA lives at the end; look at the last few non-empty lines.
    let tail = content
        .lines()
        .rev()
        .filter(|l| !l.trim().is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if tail.is_empty() {
        return CtaType::None;
    }

    if tail.contains("save this") || tail.contains("bookmark") {
        return CtaType::Save;
    }
    if tail.contains("share this")
        || tail.contains("tag a")
        || tail.contains("tag someone")
        || tail.contains("repost")
        || tail.contains("send this to")
    {
        return CtaType::Share;
    }
    if tail.contains("link in bio")
        || tail.contains("click the link")
        || tail.contains("sign up")
        || tail.contains("learn more at")
        || tail.contains("check out the link")
    {
        return CtaType::Link;
    }
    if tail.contains("comment")
        || tail.contains("let me know")
        || tail.contains("tell me")
        || tail.contains("drop a")
        || tail.contains("what do you think")
    {
        return CtaType::Comment;
    }
    CtaType::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_hook() {
        let signals = derive_creative_signals("Why do most launches flop?\nHere's the data.");
        assert_eq!(signals.hook_type, HookType::Question);
    }

    #[test]
    fn test_contrarian_hook() {
        let signals =
            derive_creative_signals("Unpopular opinion: posting daily is hurting your reach.");
        assert_eq!(signals.hook_type, HookType::Contrarian);
    }

    #[test]
    fn test_list_hook() {
        let signals = derive_creative_signals("5 ways to fix your onboarding flow today.");
        assert_eq!(signals.hook_type, HookType::List);
    }

    #[test]
    fn test_statistic_hook() {
        let signals = derive_creative_signals("73% of carts get abandoned before checkout.");
        assert_eq!(signals.hook_type, HookType::Statistic);
    }

    #[test]
    fn test_story_hook() {
        let signals = derive_creative_signals("Last year I almost shut the company down.");
        assert_eq!(signals.hook_type, HookType::Story);
    }

    #[test]
    fn test_transformation_hook() {
        let signals = derive_creative_signals("We went from 0 to 40k followers in 6 months.");
        assert_eq!(signals.hook_type, HookType::Transformation);
    }

    #[test]
    fn test_plain_statement_defaults() {
        let signals = derive_creative_signals("Our new feature shipped today.");
        assert_eq!(signals.hook_type, HookType::Statement);
        assert_eq!(signals.cta_type, CtaType::None);
    }

    #[test]
    fn test_cta_variants() {
        assert_eq!(
            derive_creative_signals("Great tips here.\n\nSave this for later!").cta_type,
            CtaType::Save
        );
        assert_eq!(
            derive_creative_signals("Thoughts?\nLet me know in the comments.").cta_type,
            CtaType::Comment
        );
        assert_eq!(
            derive_creative_signals("Useful?\nShare this with your team.").cta_type,
            CtaType::Share
        );
        assert_eq!(
            derive_creative_signals("Ready to start?\nLink in bio.").cta_type,
            CtaType::Link
        );
    }

    #[test]
    fn test_empty_content() {
        let signals = derive_creative_signals("   ");
        assert_eq!(signals.hook_type, HookType::Statement);
        assert_eq!(signals.cta_type, CtaType::None);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let content = "How did we double engagement?\nComment below.";
        assert_eq!(derive_creative_signals(content), derive_creative_signals(content));
    }
}
