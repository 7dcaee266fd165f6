//! Question Provider Facade (C7): calls an external Gemini-style generator under a
//! hard timeout, falling back to a static reserve bank on any failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::engine::DraftQuestion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationSource {
    Ai,
    Fallback,
}

impl GenerationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub questions: Vec<DraftQuestion>,
    pub source: GenerationSource,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Abstraction over the upstream generator so tests can substitute a slow or
/// failing stand-in without reaching the network.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(&self, topic: &str, count: usize) -> anyhow::Result<Vec<DraftQuestion>>;
}

pub struct GeminiQuestionSource {
    client: reqwest::Client,
    config: QuestionProviderConfig,
}

impl GeminiQuestionSource {
    pub fn new(config: QuestionProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    text: String,
    options: Vec<String>,
    #[serde(rename = "correctIndex")]
    correct_index: i64,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    questions: Vec<RawQuestion>,
}

#[async_trait]
impl QuestionSource for GeminiQuestionSource {
    async fn fetch(&self, topic: &str, count: usize) -> anyhow::Result<Vec<DraftQuestion>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            anyhow::bail!("no GEMINI_API_KEY configured");
        };
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.config.model, api_key
        );
        let prompt = format!(
            "Generate {count} multiple-choice trivia questions about \"{topic}\". \
             Respond as JSON: {{\"questions\":[{{\"text\":str,\"options\":[4 strings],\"correctIndex\":0-3}}]}}."
        );
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
            }))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing generated text in provider response"))?;
        let parsed: RawResponse = serde_json::from_str(text)?;

        Ok(parsed
            .questions
            .into_iter()
            .filter_map(|q| validate(q))
            .collect())
    }
}

struct UnconfiguredSource;

#[async_trait]
impl QuestionSource for UnconfiguredSource {
    async fn fetch(&self, _topic: &str, _count: usize) -> anyhow::Result<Vec<DraftQuestion>> {
        anyhow::bail!("no question source configured")
    }
}

fn validate(raw: RawQuestion) -> Option<DraftQuestion> {
    if raw.text.trim().is_empty() {
        return None;
    }
    if raw.options.len() != 4 || raw.options.iter().any(|o| o.trim().is_empty()) {
        return None;
    }
    if !(0..4).contains(&raw.correct_index) {
        return None;
    }
    let options: [String; 4] = raw.options.try_into().ok()?;
    Some(DraftQuestion {
        text: raw.text,
        options,
        correct_option: raw.correct_index as u8,
    })
}

pub struct QuestionProvider {
    source: Box<dyn QuestionSource>,
    timeout: Duration,
}

impl QuestionProvider {
    pub fn new(source: Box<dyn QuestionSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn gemini(config: QuestionProviderConfig) -> Self {
        let timeout = config.timeout;
        Self::new(Box::new(GeminiQuestionSource::new(config)), timeout)
    }

    /// A provider that always falls back to the static bank, for tests and any
    /// deployment run with no `GEMINI_API_KEY` configured.
    pub fn static_bank() -> Self {
        Self::new(Box::new(UnconfiguredSource), Duration::from_millis(50))
    }

    /// Returns at least `2 * per_team` questions, substituting from the static bank
    /// for whatever the upstream call failed to supply (or all of it, on failure).
    pub async fn generate(&self, topic: &str, per_team: u8) -> GenerationResult {
        let needed = 2 * per_team as usize;
        let outcome = tokio::time::timeout(self.timeout, self.source.fetch(topic, needed)).await;

        match outcome {
            Ok(Ok(questions)) if questions.len() >= needed => GenerationResult {
                questions,
                source: GenerationSource::Ai,
                reason: None,
            },
            Ok(Ok(partial)) => {
                let reason = format!(
                    "provider returned {} of {needed} required questions",
                    partial.len()
                );
                warn!(reason = %reason, "question provider partial result, filling from fallback bank");
                let mut questions = partial;
                top_up_from_bank(topic, needed, &mut questions);
                GenerationResult {
                    questions,
                    source: GenerationSource::Fallback,
                    reason: Some(reason),
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "question provider call failed, using fallback bank");
                GenerationResult {
                    questions: bank_for(topic, needed),
                    source: GenerationSource::Fallback,
                    reason: Some(err.to_string()),
                }
            }
            Err(_elapsed) => {
                warn!(timeout_secs = self.timeout.as_secs(), "question provider timed out, using fallback bank");
                GenerationResult {
                    questions: bank_for(topic, needed),
                    source: GenerationSource::Fallback,
                    reason: Some("provider call exceeded the configured timeout".to_owned()),
                }
            }
        }
    }
}

fn top_up_from_bank(topic: &str, needed: usize, questions: &mut Vec<DraftQuestion>) {
    if questions.len() >= needed {
        return;
    }
    let missing = needed - questions.len();
    questions.extend(bank_for(topic, missing).into_iter().take(missing));
}

/// Static reserve bank keyed by a lowercase substring match against `topic`; falls
/// back to a generic bank if nothing matches. Entries are cycled to reach `count`.
fn bank_for(topic: &str, count: usize) -> Vec<DraftQuestion> {
    let topic_lower = topic.to_lowercase();
    let table: &[(&str, &[(&str, [&str; 4], u8)])] = &[
        ("geography", GEOGRAPHY_BANK),
        ("history", HISTORY_BANK),
        ("science", SCIENCE_BANK),
        ("movie", MOVIES_BANK),
        ("film", MOVIES_BANK),
        ("sport", SPORTS_BANK),
    ];
    let bank = table
        .iter()
        .find(|(key, _)| topic_lower.contains(key))
        .map(|(_, bank)| *bank)
        .unwrap_or(GENERAL_BANK);

    (0..count)
        .map(|i| {
            let (text, options, correct) = bank[i % bank.len()];
            DraftQuestion {
                text: text.to_owned(),
                options: options.map(str::to_owned),
                correct_option: correct,
            }
        })
        .collect()
}

type BankEntry = (&'static str, [&'static str; 4], u8);

const GEOGRAPHY_BANK: &[BankEntry] = &[
    ("What is the capital of France?", ["Paris", "Rome", "Madrid", "Berlin"], 0),
    ("Which is the longest river in the world?", ["Amazon", "Nile", "Yangtze", "Mississippi"], 1),
    ("Which continent is the Sahara desert on?", ["Asia", "Australia", "Africa", "South America"], 2),
    ("What is the smallest country in the world?", ["Monaco", "Vatican City", "San Marino", "Liechtenstein"], 1),
    ("Which country has the most natural lakes?", ["Canada", "Russia", "Finland", "USA"], 0),
];

const HISTORY_BANK: &[BankEntry] = &[
    ("In what year did World War II end?", ["1943", "1944", "1945", "1946"], 2),
    ("Who was the first President of the United States?", ["Jefferson", "Washington", "Adams", "Franklin"], 1),
    ("The Roman Empire fell in what century?", ["3rd", "4th", "5th", "6th"], 2),
    ("Which empire built the Colosseum?", ["Greek", "Roman", "Persian", "Ottoman"], 1),
    ("The Berlin Wall fell in which year?", ["1987", "1988", "1989", "1991"], 2),
];

const SCIENCE_BANK: &[BankEntry] = &[
    ("What is the chemical symbol for gold?", ["Go", "Gd", "Au", "Ag"], 2),
    ("How many planets are in the solar system?", ["7", "8", "9", "10"], 1),
    ("What gas do plants absorb from the atmosphere?", ["Oxygen", "Nitrogen", "Carbon dioxide", "Helium"], 2),
    ("What is the speed of light approximately?", ["300,000 km/s", "150,000 km/s", "1,000,000 km/s", "30,000 km/s"], 0),
    ("What part of the cell contains DNA?", ["Mitochondria", "Nucleus", "Ribosome", "Cytoplasm"], 1),
];

const MOVIES_BANK: &[BankEntry] = &[
    ("Who directed Jaws?", ["George Lucas", "Steven Spielberg", "Martin Scorsese", "James Cameron"], 1),
    ("Which movie won Best Picture in 1995?", ["Pulp Fiction", "Forrest Gump", "Braveheart", "Shawshank Redemption"], 1),
    ("What is the highest-grossing film of all time (unadjusted)?", ["Titanic", "Avengers: Endgame", "Avatar", "Star Wars"], 2),
    ("Who played the Joker in The Dark Knight?", ["Jared Leto", "Joaquin Phoenix", "Heath Ledger", "Jack Nicholson"], 2),
    ("What studio produced Toy Story?", ["DreamWorks", "Pixar", "Illumination", "Blue Sky"], 1),
];

const SPORTS_BANK: &[BankEntry] = &[
    ("How many players are on a soccer team on the field?", ["9", "10", "11", "12"], 2),
    ("How often are the Summer Olympics held?", ["Every 2 years", "Every 3 years", "Every 4 years", "Every 5 years"], 2),
    ("In tennis, what does 'love' mean?", ["One point", "Zero points", "A tie", "Match point"], 1),
    ("Which country has won the most FIFA World Cups?", ["Germany", "Argentina", "Brazil", "Italy"], 2),
    ("How many rings are on the Olympic flag?", ["4", "5", "6", "7"], 1),
];

const GENERAL_BANK: &[BankEntry] = &[
    ("What is the largest ocean on Earth?", ["Atlantic", "Indian", "Arctic", "Pacific"], 3),
    ("How many continents are there?", ["5", "6", "7", "8"], 2),
    ("What is the tallest mountain in the world?", ["K2", "Everest", "Kilimanjaro", "Denali"], 1),
    ("What is the most spoken language in the world?", ["English", "Mandarin", "Spanish", "Hindi"], 1),
    ("How many strings does a standard guitar have?", ["4", "5", "6", "7"], 2),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct SlowSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl QuestionSource for SlowSource {
        async fn fetch(&self, _topic: &str, _count: usize) -> anyhow::Result<Vec<DraftQuestion>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    struct FailingSource;

    #[async_trait]
    impl QuestionSource for FailingSource {
        async fn fetch(&self, _topic: &str, _count: usize) -> anyhow::Result<Vec<DraftQuestion>> {
            anyhow::bail!("upstream unavailable")
        }
    }

    #[tokio::test]
    async fn falls_back_on_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = QuestionProvider::new(
            Box::new(SlowSource { calls: Arc::clone(&calls) }),
            Duration::from_millis(20),
        );
        let result = provider.generate("geography", 5).await;
        assert_eq!(result.source, GenerationSource::Fallback);
        assert_eq!(result.questions.len(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_on_upstream_error() {
        let provider = QuestionProvider::new(Box::new(FailingSource), Duration::from_secs(5));
        let result = provider.generate("science trivia", 5).await;
        assert_eq!(result.source, GenerationSource::Fallback);
        assert_eq!(result.questions.len(), 10);
        assert!(result.reason.unwrap().contains("upstream unavailable"));
    }

    #[test]
    fn bank_lookup_is_case_insensitive_substring_match() {
        let questions = bank_for("World History Facts", 4);
        assert_eq!(questions.len(), 4);
    }
}
