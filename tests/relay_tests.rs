// tests for the model fallback chain, using a scripted fake provider

use allergyguard::{Error, FAILURE_MARKER, RelayOutcome, TextModel, relay};
use std::sync::Mutex;

/// Fake provider scripted per model name. Records the order models were
/// attempted in so tests can assert the chain never skips ahead.
struct ScriptedProvider {
    outcomes: Vec<(&'static str, Result<&'static str, &'static str>)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<(&'static str, Result<&'static str, &'static str>)>) -> Self {
        Self {
            outcomes,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl TextModel for ScriptedProvider {
    async fn generate(&self, model: &str, _prompt: &str) -> Result<String, Error> {
        self.calls.lock().unwrap().push(model.to_string());

        match self.outcomes.iter().find(|(name, _)| *name == model) {
            Some((_, Ok(text))) => Ok(text.to_string()),
            Some((_, Err(msg))) => Err(Error::Gemini(msg.to_string())),
            None => panic!("unscripted model {model}"),
        }
    }
}

fn candidates(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_first_success_wins() {
    let provider = ScriptedProvider::new(vec![("a", Ok("answer from a")), ("b", Ok("answer from b"))]);

    let outcome = relay(&provider, &candidates(&["a", "b"]), "question").await;

    assert_eq!(outcome, RelayOutcome::Answered("answer from a".to_string()));
    assert_eq!(provider.calls(), vec!["a"]);
}

#[tokio::test]
async fn test_falls_back_past_failure() {
    let provider = ScriptedProvider::new(vec![
        ("a", Err("rate limited")),
        ("b", Ok("answer from b")),
        ("c", Ok("answer from c")),
    ]);

    let outcome = relay(&provider, &candidates(&["a", "b", "c"]), "question").await;

    assert_eq!(outcome, RelayOutcome::Answered("answer from b".to_string()));
    // c was never needed, so it must never be invoked
    assert_eq!(provider.calls(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_exhaustion_keeps_last_error() {
    let provider = ScriptedProvider::new(vec![
        ("a", Err("first failure")),
        ("b", Err("second failure")),
    ]);

    let outcome = relay(&provider, &candidates(&["a", "b"]), "question").await;

    match &outcome {
        RelayOutcome::Exhausted { last_error } => {
            assert!(last_error.contains("second failure"));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }

    let reply = outcome.into_reply();
    assert!(!reply.is_empty());
    assert!(reply.contains(FAILURE_MARKER));
    assert!(reply.contains("second failure"));
}

#[tokio::test]
async fn test_candidate_order_is_preserved() {
    // same providers, opposite orderings: the earlier-listed success wins
    let provider = ScriptedProvider::new(vec![("a", Ok("from a")), ("b", Ok("from b"))]);

    let forward = relay(&provider, &candidates(&["a", "b"]), "q").await;
    assert_eq!(forward, RelayOutcome::Answered("from a".to_string()));

    let backward = relay(&provider, &candidates(&["b", "a"]), "q").await;
    assert_eq!(backward, RelayOutcome::Answered("from b".to_string()));
}

#[tokio::test]
async fn test_no_retry_of_a_failed_candidate() {
    let provider = ScriptedProvider::new(vec![("a", Err("down")), ("b", Err("also down"))]);

    let outcome = relay(&provider, &candidates(&["a", "b"]), "q").await;

    assert!(outcome.is_exhausted());
    // each candidate attempted exactly once, in order
    assert_eq!(provider.calls(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_empty_candidate_list_is_exhausted() {
    let provider = ScriptedProvider::new(vec![]);

    let outcome = relay(&provider, &[], "q").await;

    assert!(outcome.is_exhausted());
    assert!(provider.calls().is_empty());
}

#[test]
fn test_answered_reply_is_verbatim() {
    let reply = RelayOutcome::Answered("Avoid peanuts.".to_string()).into_reply();
    assert_eq!(reply, "Avoid peanuts.");
    assert!(!reply.contains(FAILURE_MARKER));
}

#[test]
fn test_prompt_framings() {
    let plain = allergyguard::question_prompt("is satay safe?", "peanut");
    assert!(plain.contains("peanut allergy"));
    assert!(plain.contains("is satay safe?"));

    let persona = allergyguard::assistant_prompt("who am I?", "peanut", "Sam");
    assert!(persona.contains("AllergyGuard"));
    assert!(persona.contains("Name: Sam"));
    assert!(persona.contains("Allergy: peanut"));
    assert!(persona.contains("who am I?"));
}
