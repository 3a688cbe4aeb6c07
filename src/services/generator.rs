use std::time::Duration;

use color_eyre::{eyre::OptionExt, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{HomeworkContent, Question, DEFAULT_QUESTION_SCORE};
use crate::names::{DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT, MIN_QUESTION_COUNT};

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// CompletionClient trait
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait CompletionClient: Send + Sync {
    /// False when no API key is configured (dev mode).
    fn is_enabled(&self) -> bool;

    /// Returns the first choice's message content.
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl HttpCompletionClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

impl CompletionClient for HttpCompletionClient {
    fn is_enabled(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .timeout(COMPLETION_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            tracing::error!("completion API error: {status} - {text}");
            color_eyre::eyre::bail!("completion API returned {status}");
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_eyre("completion API returned no choices")
    }
}

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    /// Template name; derived from subject and topic when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub bloom_levels: Vec<String>,
    #[serde(default = "default_exercise_type")]
    pub exercise_type: String,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_exercise_type() -> String {
    "multiple_choice".to_string()
}

fn default_question_count() -> usize {
    DEFAULT_QUESTION_COUNT
}

fn default_difficulty() -> String {
    "medium".to_string()
}

impl GenerateRequest {
    pub fn question_count(&self) -> usize {
        self.question_count.clamp(MIN_QUESTION_COUNT, MAX_QUESTION_COUNT)
    }

    pub fn homework_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}: {}", self.subject.trim(), self.topic.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedHomework {
    pub content: HomeworkContent,
    /// True when generation failed and the questions are stand-ins.
    pub is_placeholder: bool,
}

// ---------------------------------------------------------------------------
// QuestionGenerator
// ---------------------------------------------------------------------------

pub struct QuestionGenerator<C: CompletionClient = HttpCompletionClient> {
    client: C,
}

impl<C: CompletionClient + Clone> Clone for QuestionGenerator<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<C: CompletionClient> QuestionGenerator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Never fails: anything that goes wrong yields placeholder questions.
    pub async fn generate(&self, req: &GenerateRequest) -> GeneratedHomework {
        if !self.client.is_enabled() {
            tracing::info!("completion API not configured, using placeholder questions");
            return placeholder(req);
        }

        let (system, user) = build_prompt(req);
        let text = match self.client.complete(&system, &user).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("question generation failed: {e}");
                return placeholder(req);
            }
        };

        match parse_completion(&text) {
            Some(mut content) => {
                fill_metadata(&mut content.metadata, req);
                GeneratedHomework {
                    content,
                    is_placeholder: false,
                }
            }
            None => {
                tracing::warn!("completion output had no usable questions");
                placeholder(req)
            }
        }
    }
}

pub fn build_prompt(req: &GenerateRequest) -> (String, String) {
    let system = "You write homework exercises for school teachers. \
        Reply with a single JSON object and nothing else. \
        The object has a \"metadata\" object and a \"questions\" array. \
        Each question has \"question\", \"options\" (array of strings, only for multiple choice), \
        \"correct_answer\", \"correct_option_index\" (only for multiple choice), \
        \"explanation\", \"score\" (positive integer) and \"difficulty\"."
        .to_string();

    let bloom = if req.bloom_levels.is_empty() {
        "any".to_string()
    } else {
        req.bloom_levels.join(", ")
    };

    let user = format!(
        "Subject: {}\nTopic: {}\nBloom taxonomy levels: {bloom}\nExercise type: {}\n\
         Difficulty: {}\nNumber of questions: {}",
        req.subject,
        req.topic,
        req.exercise_type,
        req.difficulty,
        req.question_count(),
    );

    (system, user)
}

/// Pulls the JSON document out of free-form model output: a fenced code
/// block if there is one, else the outermost brace span.
pub fn parse_completion(text: &str) -> Option<HomeworkContent> {
    let candidates = [fenced_block(text), brace_span(text)];
    candidates
        .into_iter()
        .flatten()
        .find_map(|raw| serde_json::from_str::<HomeworkContent>(raw).ok())
        .filter(|content| !content.questions.is_empty())
        .filter(|content| content.questions.iter().all(|q| q.score > 0))
        .filter(|content| content.total_score().is_some())
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    // skip the info string, e.g. ```json
    let body_start = rest.find('\n').map_or(0, |i| i + 1);
    let body = &rest[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn fill_metadata(metadata: &mut Map<String, Value>, req: &GenerateRequest) {
    metadata
        .entry("subject")
        .or_insert_with(|| Value::from(req.subject.clone()));
    metadata
        .entry("topic")
        .or_insert_with(|| Value::from(req.topic.clone()));
    metadata
        .entry("exercise_type")
        .or_insert_with(|| Value::from(req.exercise_type.clone()));
    metadata
        .entry("bloom_levels")
        .or_insert_with(|| Value::from(req.bloom_levels.clone()));
}

pub fn placeholder(req: &GenerateRequest) -> GeneratedHomework {
    let questions = (1..=req.question_count())
        .map(|i| Question {
            question: format!("{} ({}): question {i}", req.topic, req.subject),
            options: None,
            correct_answer: None,
            correct_option_index: None,
            explanation: None,
            score: DEFAULT_QUESTION_SCORE,
            difficulty: Some(req.difficulty.clone()),
            extra: Map::new(),
        })
        .collect();

    let mut metadata = Map::new();
    fill_metadata(&mut metadata, req);
    metadata.insert("placeholder".to_string(), Value::Bool(true));

    GeneratedHomework {
        content: HomeworkContent {
            metadata,
            questions,
        },
        is_placeholder: true,
    }
}
