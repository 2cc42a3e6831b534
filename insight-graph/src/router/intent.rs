//! Keyword-based intent classification

use crate::state::Intent;

/// Keywords that mark a question as a KPI question
pub const KPI_KEYWORDS: &[&str] = &["revenue", "sales", "units", "trend", "top", "leaderboard"];

/// Keywords that mark a question as a sentiment question
pub const SENTIMENT_KEYWORDS: &[&str] = &["sentiment", "feedback", "review"];

/// One classification rule: fires when any keyword is a substring of the question
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub intent: Intent,
}

impl KeywordRule {
    pub fn new(keywords: &[&str], intent: Intent) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            intent,
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Ordered rule list, evaluated top to bottom
///
/// Every rule is checked and the *last* one that fires decides the intent,
/// so a question mentioning both sales and feedback is a sentiment question.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<KeywordRule>,
    default_intent: Intent,
}

impl IntentClassifier {
    pub fn new(default_intent: Intent) -> Self {
        Self {
            rules: Vec::new(),
            default_intent,
        }
    }

    /// Append a rule; later rules override earlier matches
    pub fn rule(mut self, keywords: &[&str], intent: Intent) -> Self {
        self.rules.push(KeywordRule::new(keywords, intent));
        self
    }

    /// Classifier for the agent-backed pipeline: every question goes to the agent
    pub fn agent_only() -> Self {
        Self::new(Intent::DispatchToAgent)
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn default_intent(&self) -> Intent {
        self.default_intent
    }

    pub fn classify(&self, question: &str) -> Intent {
        let lowered = question.to_lowercase();
        let mut intent = self.default_intent;
        for rule in &self.rules {
            if rule.matches(&lowered) {
                intent = rule.intent;
            }
        }
        intent
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(Intent::Fallback)
            .rule(KPI_KEYWORDS, Intent::Kpi)
            .rule(SENTIMENT_KEYWORDS, Intent::Sentiment)
    }
}
