//! Response pipeline — safety filter → rule table → generative fallback.
//!
//! Stages run in strict priority order with short-circuit evaluation;
//! exactly one stage determines the reply for a given message, and no stage
//! re-runs. Every processed message and its final reply are handed to the
//! history sink afterwards.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::llm::TextGenerator;
use crate::pipeline::rules::RuleTable;
use crate::pipeline::safety::SafetyFilter;
use crate::pipeline::types::{ChatMessage, PipelineReply, ReplySource};
use crate::store::HistorySink;

/// Default deadline for the generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// The response pipeline.
///
/// Holds no per-request mutable state; one instance is shared across
/// concurrent requests behind an `Arc`. The rule table is read-only after
/// construction, so lookups need no locking.
pub struct ResponsePipeline {
    safety: SafetyFilter,
    rules: RuleTable,
    llm: Arc<dyn TextGenerator>,
    history: Arc<dyn HistorySink>,
    generation_timeout: Duration,
}

impl ResponsePipeline {
    pub fn new(
        rules: RuleTable,
        llm: Arc<dyn TextGenerator>,
        history: Arc<dyn HistorySink>,
    ) -> Self {
        Self {
            safety: SafetyFilter::new(),
            rules,
            llm,
            history,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Override the generation deadline.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Run a message through the three stages and persist the outcome.
    ///
    /// The stages themselves cannot fail; the only error path is the history
    /// write. If the caller drops the returned future (request cancelled),
    /// the generation call is abandoned with it and no history write occurs.
    pub async fn process(&self, message: &ChatMessage) -> Result<PipelineReply, PipelineError> {
        let result = self.respond(message).await;

        info!(
            source = result.source.label(),
            mood = %message.mood,
            "Reply computed"
        );

        self.history
            .record(&message.text, &result.reply, &message.mood, Utc::now())
            .await?;

        Ok(result)
    }

    /// Pick the reply: first stage that matches wins.
    async fn respond(&self, message: &ChatMessage) -> PipelineReply {
        if let Some(crisis) = self.safety.check(&message.text) {
            return PipelineReply {
                reply: crisis.to_string(),
                source: ReplySource::Safety,
            };
        }

        if let Some(response) = self.rules.lookup(&message.text) {
            debug!("Rule table matched, skipping generation");
            return PipelineReply {
                reply: response.to_string(),
                source: ReplySource::Rule,
            };
        }

        self.generate(message).await
    }

    /// Generative fallback with local failure recovery.
    ///
    /// Exactly one generation call is attempted; no retry, no backoff. Any
    /// failure, including the deadline, degrades to a supportive reply with
    /// a short diagnostic fragment — never an error to the caller.
    async fn generate(&self, message: &ChatMessage) -> PipelineReply {
        let prompt = build_wellness_prompt(&message.text, &message.mood);

        let outcome =
            tokio::time::timeout(self.generation_timeout, self.llm.generate(&prompt)).await;

        match outcome {
            Ok(Ok(text)) => PipelineReply {
                reply: text,
                source: ReplySource::Generative,
            },
            Ok(Err(e)) => {
                warn!(
                    model = self.llm.model_name(),
                    error = %e,
                    "Generation failed, degrading"
                );
                PipelineReply {
                    reply: degraded_reply(&e.to_string()),
                    source: ReplySource::Degraded,
                }
            }
            Err(_) => {
                warn!(
                    model = self.llm.model_name(),
                    timeout = ?self.generation_timeout,
                    "Generation timed out, degrading"
                );
                PipelineReply {
                    reply: degraded_reply(&format!(
                        "timed out after {:?}",
                        self.generation_timeout
                    )),
                    source: ReplySource::Degraded,
                }
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the generation prompt: persona, mood label, verbatim user text.
fn build_wellness_prompt(text: &str, mood: &str) -> String {
    format!(
        "You are an empathetic wellness assistant named WellBot. \
         The user's current mood is {mood}. User says: {text}. \
         Be supportive, concise, and professional."
    )
}

/// Synthesize the degraded reply: non-empty and supportive, with a short
/// diagnostic fragment for operators instead of a raw error page.
fn degraded_reply(diagnostic: &str) -> String {
    format!("I'm having trouble connecting right now, but I'm here for you. (Error: {diagnostic})")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Mutex;

    use super::*;
    use crate::error::{DatabaseError, LlmError};
    use crate::store::ChatRecord;

    // ── Test doubles ────────────────────────────────────────────────

    enum MockBehavior {
        Reply(&'static str),
        Fail,
        Hang,
    }

    /// Mock generator with a scripted outcome and a call counter.
    struct MockGenerator {
        behavior: MockBehavior,
        calls: AtomicUsize,
    }

    impl MockGenerator {
        fn new(behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        fn model_name(&self) -> &str {
            "mock"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                MockBehavior::Reply(text) => Ok(text.to_string()),
                MockBehavior::Fail => Err(LlmError::RequestFailed {
                    provider: "mock".to_string(),
                    reason: "simulated timeout".to_string(),
                }),
                MockBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok("too late".to_string())
                }
            }
        }
    }

    /// In-memory history sink.
    #[derive(Default)]
    struct MemoryHistory {
        records: Mutex<Vec<ChatRecord>>,
    }

    #[async_trait]
    impl HistorySink for MemoryHistory {
        async fn record(
            &self,
            user_message: &str,
            bot_response: &str,
            mood: &str,
            timestamp: DateTime<Utc>,
        ) -> Result<String, DatabaseError> {
            let id = uuid::Uuid::new_v4().to_string();
            self.records.lock().await.push(ChatRecord {
                id: id.clone(),
                user_message: user_message.to_string(),
                bot_response: bot_response.to_string(),
                mood: mood.to_string(),
                timestamp,
            });
            Ok(id)
        }

        async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, DatabaseError> {
            let records = self.records.lock().await;
            Ok(records.iter().rev().take(limit).cloned().collect())
        }
    }

    fn pipeline_with(
        rules: RuleTable,
        llm: Arc<MockGenerator>,
    ) -> (ResponsePipeline, Arc<MemoryHistory>) {
        let history = Arc::new(MemoryHistory::default());
        let pipeline = ResponsePipeline::new(
            rules,
            llm,
            Arc::clone(&history) as Arc<dyn HistorySink>,
        );
        (pipeline, history)
    }

    fn greeting_rules() -> RuleTable {
        RuleTable::from_pairs(vec![(
            "HELLO".to_string(),
            "Hi! I'm WellBot.".to_string(),
        )])
    }

    // ── Stage ordering ──────────────────────────────────────────────

    #[tokio::test]
    async fn crisis_short_circuits_before_rules_and_generation() {
        let llm = MockGenerator::new(MockBehavior::Reply("should not be used"));
        let (pipeline, _history) = pipeline_with(greeting_rules(), Arc::clone(&llm));

        let msg = ChatMessage::new("I want to kill myself", "Sad");
        let result = pipeline.process(&msg).await.unwrap();

        assert_eq!(result.source, ReplySource::Safety);
        assert!(result.reply.contains("crisis helpline"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn crisis_detected_case_insensitively_mid_sentence() {
        let llm = MockGenerator::new(MockBehavior::Reply("unused"));
        let (pipeline, _history) = pipeline_with(RuleTable::empty(), Arc::clone(&llm));

        let msg = ChatMessage::new("sometimes I think about SELF HARM at night", "Neutral");
        let result = pipeline.process(&msg).await.unwrap();

        assert_eq!(result.source, ReplySource::Safety);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn rule_match_skips_generation_regardless_of_mood() {
        let llm = MockGenerator::new(MockBehavior::Reply("unused"));
        let (pipeline, _history) = pipeline_with(greeting_rules(), Arc::clone(&llm));

        for mood in ["Neutral", "Anxious"] {
            let msg = ChatMessage::new("hello", mood);
            let result = pipeline.process(&msg).await.unwrap();
            assert_eq!(result.source, ReplySource::Rule);
            assert_eq!(result.reply, "Hi! I'm WellBot.");
        }
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn rule_pattern_as_substring_does_not_match() {
        let llm = MockGenerator::new(MockBehavior::Reply("generated instead"));
        let (pipeline, _history) = pipeline_with(greeting_rules(), Arc::clone(&llm));

        let msg = ChatMessage::new("hello there", "Neutral");
        let result = pipeline.process(&msg).await.unwrap();

        assert_eq!(result.source, ReplySource::Generative);
        assert_eq!(llm.call_count(), 1);
    }

    // ── Generative fallback ─────────────────────────────────────────

    #[tokio::test]
    async fn generation_success_returns_service_text_verbatim() {
        let llm = MockGenerator::new(MockBehavior::Reply(
            "That sounds stressful; let's talk through it.",
        ));
        let (pipeline, _history) = pipeline_with(RuleTable::empty(), Arc::clone(&llm));

        let msg = ChatMessage::new("I am anxious about my exam", "Anxious");
        let result = pipeline.process(&msg).await.unwrap();

        assert_eq!(result.source, ReplySource::Generative);
        assert_eq!(result.reply, "That sounds stressful; let's talk through it.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn generation_failure_degrades_without_error() {
        let llm = MockGenerator::new(MockBehavior::Fail);
        let (pipeline, _history) = pipeline_with(RuleTable::empty(), Arc::clone(&llm));

        let msg = ChatMessage::new("I am anxious about my exam", "Anxious");
        let result = pipeline.process(&msg).await.unwrap();

        assert_eq!(result.source, ReplySource::Degraded);
        assert!(!result.reply.is_empty());
        assert!(result.reply.contains("(Error:"));
        // Exactly one attempt, no retry.
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn generation_deadline_degrades_without_error() {
        let llm = MockGenerator::new(MockBehavior::Hang);
        let history = Arc::new(MemoryHistory::default());
        let pipeline = ResponsePipeline::new(
            RuleTable::empty(),
            Arc::clone(&llm) as Arc<dyn TextGenerator>,
            Arc::clone(&history) as Arc<dyn HistorySink>,
        )
        .with_generation_timeout(Duration::from_millis(50));

        let msg = ChatMessage::new("are you still there?", "Neutral");
        let result = pipeline.process(&msg).await.unwrap();

        assert_eq!(result.source, ReplySource::Degraded);
        assert!(result.reply.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_message_flows_through_to_generation() {
        let llm = MockGenerator::new(MockBehavior::Reply("I'm here whenever you're ready."));
        let (pipeline, _history) = pipeline_with(greeting_rules(), Arc::clone(&llm));

        let msg = ChatMessage::new("", "Neutral");
        let result = pipeline.process(&msg).await.unwrap();

        assert_eq!(result.source, ReplySource::Generative);
        assert_eq!(llm.call_count(), 1);
    }

    // ── History hand-off ────────────────────────────────────────────

    #[tokio::test]
    async fn every_reply_source_is_persisted() {
        let llm = MockGenerator::new(MockBehavior::Reply("generated reply"));
        let (pipeline, history) = pipeline_with(greeting_rules(), Arc::clone(&llm));

        pipeline
            .process(&ChatMessage::new("I want to end my life", "Sad"))
            .await
            .unwrap();
        pipeline
            .process(&ChatMessage::new("hello", "Neutral"))
            .await
            .unwrap();
        pipeline
            .process(&ChatMessage::new("tell me something kind", "Tired"))
            .await
            .unwrap();

        let records = history.recent(10).await.unwrap();
        assert_eq!(records.len(), 3);
        // Newest first.
        assert_eq!(records[0].user_message, "tell me something kind");
        assert_eq!(records[0].bot_response, "generated reply");
        assert_eq!(records[0].mood, "Tired");
        assert_eq!(records[2].mood, "Sad");
        assert!(records[2].bot_response.contains("crisis helpline"));
    }

    #[tokio::test]
    async fn degraded_reply_is_persisted_like_any_other() {
        let llm = MockGenerator::new(MockBehavior::Fail);
        let (pipeline, history) = pipeline_with(RuleTable::empty(), Arc::clone(&llm));

        pipeline
            .process(&ChatMessage::new("anyone there?", "Lonely"))
            .await
            .unwrap();

        let records = history.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].bot_response.contains("(Error:"));
    }

    // ── Prompt and degraded-reply helpers ───────────────────────────

    #[test]
    fn prompt_embeds_persona_mood_and_verbatim_text() {
        let prompt = build_wellness_prompt("I am anxious about my exam", "Anxious");
        assert!(prompt.contains("WellBot"));
        assert!(prompt.contains("current mood is Anxious"));
        assert!(prompt.contains("User says: I am anxious about my exam."));
        assert!(prompt.contains("supportive, concise, and professional"));
    }

    #[test]
    fn degraded_reply_embeds_diagnostic() {
        let reply = degraded_reply("connection refused");
        assert!(reply.contains("I'm here for you"));
        assert!(reply.contains("(Error: connection refused)"));
    }
}
