//! Rule-based fact extraction from conversational turns.
//!
//! `FactExtractor` runs a fixed, ordered set of cue-phrase rules over a
//! single utterance and returns every match as a candidate fact. A separate
//! topic pass tags utterances with a small fixed taxonomy; exchanges long
//! enough to be more than small talk also yield one summary fact.
//!
//! Extraction is pure and never fails: an utterance with no cue phrases
//! simply produces an empty list.

use std::sync::LazyLock;

use kindred_types::config::ExtractionConfig;
use kindred_types::extraction::{ExtractedFact, FactRule, SpeakerRole, Topic};
use kindred_types::memory::MemoryType;
use regex::{Captures, Regex};

/// Maximum payload length kept from a clause.
const MAX_PAYLOAD_CHARS: usize = 120;

/// Words kept from a captured name.
const MAX_NAME_WORDS: usize = 3;

struct CueRule {
    rule: FactRule,
    regex: Regex,
}

/// Cue-phrase rules, in the order their facts are reported.
static CUE_RULES: LazyLock<Vec<CueRule>> = LazyLock::new(|| {
    let rules = [
        (
            FactRule::Name,
            r"(?i)\b(?:my name is|my name's|call me|i am called|i'm called)\s+",
        ),
        (
            FactRule::Residence,
            r"(?i)\b(?P<cue>i live in|i'm living in|i am living in|i moved to|i'm from|i am from)\s+",
        ),
        (FactRule::Like, r"(?i)\bi (?P<cue>love|like|enjoy|adore)\s+"),
        (
            FactRule::Dislike,
            r"(?i)\bi (?:hate|dislike|can't stand|cannot stand|don't like|do not like)\s+",
        ),
        (
            FactRule::Occupation,
            r"(?i)\b(?:i work|i'm working|i am working)\s+(?P<cue>as|at|for)\s+|\bmy (?:job|profession) is\s+",
        ),
        (
            FactRule::Family,
            r"(?i)\bmy (?P<cue>wife|husband|partner|mother|mom|father|dad|sister|brother|son|daughter|grandmother|grandma|grandfather|grandpa|girlfriend|boyfriend|kids|children)\b\s*",
        ),
        (
            FactRule::Goal,
            r"(?i)\b(?:i want to|i'd like to|i would like to|i hope to|i plan to|i'm planning to|my goal is to)\s+|\bi (?P<cue>dream) of\s+",
        ),
        (FactRule::Feeling, r"(?i)\b(?:i feel|i'm feeling|i am feeling)\s+"),
    ];

    rules
        .into_iter()
        .filter_map(|(rule, pattern)| match Regex::new(pattern) {
            Ok(regex) => Some(CueRule { rule, regex }),
            Err(e) => {
                tracing::error!(?rule, error = %e, "invalid cue rule pattern; rule disabled");
                None
            }
        })
        .collect()
});

/// Conjunctions that end a captured clause.
static CLAUSE_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:and|but|because|so|although|while)\s+").ok());

const TOPIC_KEYWORDS: [(Topic, &[&str]); 7] = [
    (
        Topic::Work,
        &["work", "job", "office", "career", "boss", "colleague", "meeting", "deadline", "salary"],
    ),
    (
        Topic::Family,
        &[
            "family", "mom", "mother", "dad", "father", "sister", "brother", "wife", "husband",
            "son", "daughter", "kid", "children", "parent",
        ],
    ),
    (
        Topic::Hobbies,
        &[
            "hobby", "hobbies", "read", "book", "music", "guitar", "painting", "game", "hike",
            "hiking", "cook", "sport", "garden",
        ],
    ),
    (
        Topic::Health,
        &["health", "doctor", "sick", "exercise", "gym", "sleep", "diet", "hospital", "medicine"],
    ),
    (
        Topic::Travel,
        &["travel", "trip", "vacation", "flight", "holiday", "abroad", "journey", "visit"],
    ),
    (
        Topic::Technology,
        &["computer", "software", "code", "coding", "programming", "app", "phone", "internet", "technology"],
    ),
    (
        Topic::Emotions,
        &[
            "feel", "feeling", "happy", "sad", "angry", "anxious", "stressed", "excited", "lonely",
            "worried", "upset",
        ],
    ),
];

const POSITIVE_WORDS: [&str; 8] = [
    "happy", "excited", "great", "good", "glad", "grateful", "proud", "calm",
];
const NEGATIVE_WORDS: [&str; 10] = [
    "sad", "anxious", "stressed", "tired", "lonely", "angry", "depressed", "worried", "upset",
    "afraid",
];

/// Stateless-by-input extractor of candidate facts.
#[derive(Debug, Clone)]
pub struct FactExtractor {
    min_exchange_length: usize,
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl FactExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            min_exchange_length: config.min_exchange_length,
        }
    }

    /// Extract candidate facts from a single utterance.
    ///
    /// Every rule is tried and every match returned, ordered by rule and then
    /// by position. Companion utterances are not about the user and yield
    /// nothing.
    pub fn extract(&self, utterance: &str, role: SpeakerRole) -> Vec<ExtractedFact> {
        if role == SpeakerRole::Companion {
            return Vec::new();
        }

        let text = normalize_apostrophes(utterance);
        let mut facts: Vec<ExtractedFact> = Vec::new();

        for cue in CUE_RULES.iter() {
            for caps in cue.regex.captures_iter(&text) {
                let Some(whole) = caps.get(0) else { continue };
                let Some(payload) = clause_payload(&text[whole.end()..], cue.rule) else {
                    continue;
                };
                let statement = render_statement(cue.rule, &caps, &payload);
                if facts.iter().any(|f| f.statement == statement) {
                    continue;
                }

                facts.push(ExtractedFact {
                    statement,
                    memory_type: cue.rule.memory_type(),
                    confidence: cue.rule.confidence(),
                    rule: cue.rule,
                    tags: vec![rule_tag(cue.rule).to_string()],
                    emotional_impact: emotional_impact(cue.rule, &payload),
                });
            }
        }

        facts
    }

    /// Tag text with the fixed topic taxonomy, in taxonomy order.
    pub fn topics(text: &str) -> Vec<Topic> {
        let tokens: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        TOPIC_KEYWORDS
            .iter()
            .filter(|(_, keywords)| {
                tokens
                    .iter()
                    .any(|token| keywords.iter().any(|kw| token_matches(token, kw)))
            })
            .map(|(topic, _)| *topic)
            .collect()
    }

    /// Extract facts from a full exchange (user message plus companion reply).
    ///
    /// Returns the user's facts, followed by one `Experience` summary when the
    /// exchange is long enough and touched at least one known topic.
    pub fn extract_exchange(&self, user_message: &str, reply: &str) -> Vec<ExtractedFact> {
        let mut facts = self.extract(user_message, SpeakerRole::User);

        let combined_len = user_message.chars().count() + reply.chars().count();
        if combined_len < self.min_exchange_length {
            return facts;
        }

        let topics = Self::topics(&format!("{user_message} {reply}"));
        if topics.is_empty() {
            return facts;
        }

        let names: Vec<String> = topics.iter().map(Topic::to_string).collect();
        facts.push(ExtractedFact {
            statement: format!("Talked about {}", join_natural(&names)),
            memory_type: MemoryType::Experience,
            confidence: FactRule::ExchangeSummary.confidence(),
            rule: FactRule::ExchangeSummary,
            tags: names,
            emotional_impact: 0.0,
        });

        facts
    }
}

fn normalize_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}

fn token_matches(token: &str, keyword: &str) -> bool {
    token == keyword
        || token
            .strip_prefix(keyword)
            .is_some_and(|rest| matches!(rest, "s" | "es" | "ing" | "ed"))
}

/// Cut the clause following a cue at punctuation or a conjunction.
fn clause_payload(rest: &str, rule: FactRule) -> Option<String> {
    let end = rest
        .find(['.', '!', '?', ';', ',', '\n'])
        .unwrap_or(rest.len());
    let mut clause = &rest[..end];

    if let Some(m) = CLAUSE_BREAK.as_ref().and_then(|re| re.find(clause)) {
        clause = &clause[..m.start()];
    }

    let mut payload = clause.trim().trim_matches('"').to_string();
    if rule == FactRule::Name {
        payload = payload
            .split_whitespace()
            .take(MAX_NAME_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
    }
    if payload.chars().count() > MAX_PAYLOAD_CHARS {
        payload = payload.chars().take(MAX_PAYLOAD_CHARS).collect();
    }

    if payload.chars().filter(|c| c.is_alphanumeric()).count() < 2 {
        return None;
    }

    Some(third_person(&payload))
}

/// Rewrite first-person possessives so the statement reads about the user.
fn third_person(payload: &str) -> String {
    payload
        .split(' ')
        .map(|w| match w.to_lowercase().as_str() {
            "my" => "their",
            "me" => "them",
            "myself" => "themselves",
            _ => w,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn cue(caps: &Captures<'_>) -> Option<String> {
    caps.name("cue").map(|m| m.as_str().to_lowercase())
}

fn render_statement(rule: FactRule, caps: &Captures<'_>, payload: &str) -> String {
    match rule {
        FactRule::Name => format!("User's name is {payload}"),
        FactRule::Residence => match cue(caps).as_deref() {
            Some(c) if c.ends_with("from") => format!("User is from {payload}"),
            Some("i moved to") => format!("User moved to {payload}"),
            _ => format!("User lives in {payload}"),
        },
        FactRule::Like => {
            let verb = match cue(caps).as_deref() {
                Some("love") => "loves",
                Some("enjoy") => "enjoys",
                Some("adore") => "adores",
                _ => "likes",
            };
            format!("User {verb} {payload}")
        }
        FactRule::Dislike => format!("User dislikes {payload}"),
        FactRule::Occupation => {
            let prep = cue(caps).unwrap_or_else(|| "as".to_string());
            format!("User works {prep} {payload}")
        }
        FactRule::Family => {
            let relation = cue(caps).unwrap_or_else(|| "family".to_string());
            if payload.starts_with('\'') {
                format!("User's {relation}{payload}")
            } else {
                format!("User's {relation} {payload}")
            }
        }
        FactRule::Goal => match cue(caps).as_deref() {
            Some("dream") => format!("User dreams of {payload}"),
            _ => format!("User wants to {payload}"),
        },
        FactRule::Feeling => format!("User feels {payload}"),
        FactRule::ExchangeSummary => format!("Talked about {payload}"),
    }
}

fn rule_tag(rule: FactRule) -> &'static str {
    match rule {
        FactRule::Name => "identity",
        FactRule::Residence => "location",
        FactRule::Like => "interest",
        FactRule::Dislike => "aversion",
        FactRule::Occupation => "work",
        FactRule::Family => "family",
        FactRule::Goal => "goal",
        FactRule::Feeling => "feeling",
        FactRule::ExchangeSummary => "summary",
    }
}

fn emotional_impact(rule: FactRule, payload: &str) -> f32 {
    match rule {
        FactRule::Like => 0.5,
        FactRule::Dislike => -0.5,
        FactRule::Feeling => {
            let lower = payload.to_lowercase();
            let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
            if words.iter().any(|w| NEGATIVE_WORDS.contains(w)) {
                -0.6
            } else if words.iter().any(|w| POSITIVE_WORDS.contains(w)) {
                0.6
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn join_natural(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
