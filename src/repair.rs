//! Bounded, time-boxed verify-and-repair loop.
//!
//! Each attempt composes a harness for the current candidate, executes it,
//! and on failure feeds the diagnostic back to the repair oracle for a
//! replacement candidate. Attempts are strictly sequential: the oracle
//! consumes the previous attempt's diagnostic, so nothing can overlap.
//!
//! The whole loop races a wall-clock timeout. Executions run on a blocking
//! thread and are awaited, so the race settles at the deadline even while
//! a subprocess is still running. Losing the race returns the original
//! pre-loop candidate; the in-flight oracle request is cancelled when the
//! loop future is dropped, and an execution left behind is bounded by the
//! executor's own kill-on-deadline timeout, so no work leaks past the
//! session.

use crate::executor::{ExecutionResult, Runner};
use crate::harness::compose;
use crate::language::{classify, LanguageVariant};
use crate::oracle::RepairOracle;
use crate::sanitize::sanitize;
use std::sync::Arc;
use std::time::Duration;

/// System prompt for repair completions.
pub const REPAIR_SYSTEM_PROMPT: &str = "You are a code generation assistant.";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Execution attempts per session; the oracle is consulted between
    /// attempts, so it is called at most `max_attempts - 1` times.
    pub max_attempts: u32,
    /// Wall-clock budget for the whole session.
    pub timeout: Duration,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// What a verification session hands back: the caller always receives
/// some code, repaired or original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub success: bool,
    pub code: String,
    pub output: String,
}

impl RepairOutcome {
    fn unsuccessful(code: String) -> Self {
        Self {
            success: false,
            code,
            output: String::new(),
        }
    }
}

/// Assemble the feedback prompt for one failed attempt. The diagnostic is
/// embedded verbatim; the oracle needs the compiler's exact words.
pub fn feedback_prompt(
    intent: &str,
    variant: LanguageVariant,
    candidate: &str,
    diagnostic: &str,
) -> String {
    format!(
        "You generated this code from the following request:\n\n\
         Request: {intent}\n\n\
         Code:\n\n```{lang}\n{candidate}\n```\n\n\
         Running it produced this error:\n{diagnostic}\n\n\
         Output only the complete fixed code, with no extra explanation.",
        lang = variant.name(),
    )
}

/// Verify a candidate and repair it if needed.
///
/// This is the sole entry point callers should depend on. The language
/// hint, when present, is authoritative; classification otherwise runs on
/// the raw text so fence annotations are still visible.
pub async fn verify_and_repair<O, R>(
    intent: &str,
    code: &str,
    language_hint: Option<&str>,
    oracle: &O,
    runner: Arc<R>,
    config: &RepairConfig,
) -> RepairOutcome
where
    O: RepairOracle,
    R: Runner + Send + Sync + 'static,
{
    let variant = classify(code, language_hint);
    let original = sanitize(code);

    let session = repair_loop(intent, &original, variant, oracle, runner, config);
    match tokio::time::timeout(config.timeout, session).await {
        Ok(outcome) => outcome,
        // Timeout lost the race: the original pre-loop candidate comes
        // back, not an intermediate repair.
        Err(_) => RepairOutcome::unsuccessful(original),
    }
}

async fn repair_loop<O, R>(
    intent: &str,
    original: &str,
    variant: LanguageVariant,
    oracle: &O,
    runner: Arc<R>,
    config: &RepairConfig,
) -> RepairOutcome
where
    O: RepairOracle,
    R: Runner + Send + Sync + 'static,
{
    let mut candidate = original.to_string();
    let mut attempt = 0u32;

    while attempt < config.max_attempts {
        let program = compose(&candidate, variant);

        // Off to the blocking pool, so awaiting the handle is a real
        // suspension point and the session deadline can fire mid-run. An
        // abandoned run is still killed by the executor's command timeout.
        let run = {
            let runner = Arc::clone(&runner);
            tokio::task::spawn_blocking(move || runner.run(variant, &program))
        };
        let result = match run.await {
            Ok(result) => result,
            Err(err) => ExecutionResult::failed(format!("execution task failed: {err}")),
        };

        if result.success {
            return RepairOutcome {
                success: true,
                code: candidate,
                output: result.stdout,
            };
        }

        attempt += 1;
        if attempt >= config.max_attempts {
            break;
        }

        let prompt = feedback_prompt(intent, variant, &candidate, result.diagnostic());
        match oracle.complete(REPAIR_SYSTEM_PROMPT, &prompt).await {
            Ok(next) => {
                let next = sanitize(&next);
                // The oracle's response replaces the candidate entirely.
                if !next.is_empty() {
                    candidate = next;
                }
            }
            Err(err) => {
                // Oracle transport failures count as a failed attempt; the
                // candidate stays as-is for the next round.
                eprintln!("  Warning: repair oracle call failed: {err:#}");
            }
        }
    }

    RepairOutcome::unsuccessful(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionResult;
    use anyhow::Result;
    use std::sync::Mutex;

    /// Oracle that replays scripted responses and records prompts.
    struct ScriptedOracle {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl RepairOracle for ScriptedOracle {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            let next = self.responses.lock().unwrap().pop();
            Ok(next.unwrap_or_else(|| "still broken".to_string()))
        }
    }

    /// Runner with a scripted sequence of results, counting executions.
    struct ScriptedRunner {
        results: Mutex<Vec<ExecutionResult>>,
        executions: Mutex<usize>,
        delay: Option<Duration>,
    }

    impl ScriptedRunner {
        fn always_failing() -> Self {
            Self {
                results: Mutex::new(Vec::new()),
                executions: Mutex::new(0),
                delay: None,
            }
        }

        fn with_results(mut results: Vec<ExecutionResult>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                executions: Mutex::new(0),
                delay: None,
            }
        }

        fn stalled(delay: Duration) -> Self {
            Self {
                results: Mutex::new(Vec::new()),
                executions: Mutex::new(0),
                delay: Some(delay),
            }
        }

        fn executions(&self) -> usize {
            *self.executions.lock().unwrap()
        }
    }

    impl Runner for ScriptedRunner {
        fn run(&self, _variant: LanguageVariant, _code: &str) -> ExecutionResult {
            *self.executions.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| ExecutionResult::failed("error: does not compile".to_string()))
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_skips_oracle() {
        let oracle = ScriptedOracle::new(vec![]);
        let runner = Arc::new(ScriptedRunner::with_results(vec![ExecutionResult::ok(
            "Test result: 2\n".to_string(),
        )]));
        let config = RepairConfig::default();

        let outcome = verify_and_repair(
            "add two numbers",
            "def add(a, b):\n    return a + b",
            Some("python"),
            &oracle,
            Arc::clone(&runner),
            &config,
        )
        .await;

        assert!(outcome.success);
        assert_eq!(outcome.output, "Test result: 2\n");
        assert_eq!(runner.executions(), 1);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_bounded_retries_exhaust_attempts() {
        let oracle = ScriptedOracle::new(vec!["attempt two", "attempt three", "attempt four"]);
        let runner = Arc::new(ScriptedRunner::always_failing());
        let config = RepairConfig::default();

        let outcome = verify_and_repair(
            "do a thing",
            "broken code",
            Some("python"),
            &oracle,
            Arc::clone(&runner),
            &config,
        )
        .await;

        assert!(!outcome.success);
        assert_eq!(outcome.output, "");
        // Exactly max_attempts executions, max_attempts - 1 oracle calls.
        assert_eq!(runner.executions(), 4);
        assert_eq!(oracle.calls(), 3);
        // The last oracle response is what comes back.
        assert_eq!(outcome.code, "attempt four");
    }

    #[tokio::test]
    async fn test_timeout_returns_original_candidate() {
        let oracle = ScriptedOracle::new(vec!["intermediate repair"]);
        let runner = Arc::new(ScriptedRunner::stalled(Duration::from_millis(50)));
        let config = RepairConfig {
            max_attempts: 10,
            timeout: Duration::from_millis(10),
        };

        let outcome = verify_and_repair(
            "do a thing",
            "original code",
            Some("python"),
            &oracle,
            Arc::clone(&runner),
            &config,
        )
        .await;

        assert!(!outcome.success);
        assert_eq!(outcome.code, "original code");
        assert_eq!(outcome.output, "");
    }

    #[tokio::test]
    async fn test_timeout_settles_while_execution_is_still_running() {
        let oracle = ScriptedOracle::new(vec![]);
        let runner = Arc::new(ScriptedRunner::stalled(Duration::from_millis(500)));
        let config = RepairConfig {
            max_attempts: 10,
            timeout: Duration::from_millis(50),
        };

        let started = std::time::Instant::now();
        let outcome = verify_and_repair(
            "do a thing",
            "original code",
            Some("python"),
            &oracle,
            Arc::clone(&runner),
            &config,
        )
        .await;
        let elapsed = started.elapsed();

        // The session returns at the deadline, not after the blocked run
        // finishes, and no further execution is launched past it.
        assert!(!outcome.success);
        assert_eq!(outcome.code, "original code");
        assert!(
            elapsed < Duration::from_millis(300),
            "session overran its budget: {elapsed:?}"
        );
        assert_eq!(runner.executions(), 1);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_feedback_prompt_embeds_diagnostic_verbatim() {
        let oracle = ScriptedOracle::new(vec!["fixed = True"]);
        let runner = Arc::new(ScriptedRunner::with_results(vec![
            ExecutionResult::failed("SyntaxError: invalid syntax on line 3".to_string()),
            ExecutionResult::ok("done\n".to_string()),
        ]));
        let config = RepairConfig::default();

        let outcome = verify_and_repair(
            "set a flag",
            "fixed =",
            Some("python"),
            &oracle,
            Arc::clone(&runner),
            &config,
        )
        .await;

        assert!(outcome.success);
        let prompts = oracle.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("SyntaxError: invalid syntax on line 3"));
        assert!(prompts[0].contains("Request: set a flag"));
        assert!(prompts[0].contains("```python"));
        // The oracle's response replaced the candidate entirely.
        assert_eq!(outcome.code, "fixed = True");
    }

    #[tokio::test]
    async fn test_oracle_failure_counts_as_failed_attempt() {
        struct FailingOracle {
            calls: Mutex<usize>,
        }
        impl RepairOracle for FailingOracle {
            async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
                *self.calls.lock().unwrap() += 1;
                Err(anyhow::anyhow!("connection reset"))
            }
        }

        let oracle = FailingOracle {
            calls: Mutex::new(0),
        };
        let runner = Arc::new(ScriptedRunner::always_failing());
        let config = RepairConfig::default();

        let outcome = verify_and_repair(
            "do a thing",
            "broken code",
            Some("python"),
            &oracle,
            Arc::clone(&runner),
            &config,
        )
        .await;

        // The session runs to exhaustion instead of aborting, and the
        // candidate is unchanged because no oracle response ever arrived.
        assert!(!outcome.success);
        assert_eq!(outcome.code, "broken code");
        assert_eq!(runner.executions(), 4);
        assert_eq!(*oracle.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_fenced_candidate_is_sanitized_before_return() {
        let oracle = ScriptedOracle::new(vec![]);
        let runner = Arc::new(ScriptedRunner::with_results(vec![ExecutionResult::ok(
            "ok\n".to_string(),
        )]));
        let config = RepairConfig::default();

        let outcome = verify_and_repair(
            "greet",
            "```python\ndef greet():\n    return \"hi\"\n```",
            None,
            &oracle,
            Arc::clone(&runner),
            &config,
        )
        .await;

        assert!(outcome.success);
        assert_eq!(outcome.code, "def greet():\n    return \"hi\"");
    }

    #[test]
    fn test_feedback_prompt_shape() {
        let prompt = feedback_prompt(
            "sort a list",
            LanguageVariant::Cpp,
            "void sort_it() {}",
            "undefined reference to `main`",
        );
        assert!(prompt.contains("Request: sort a list"));
        assert!(prompt.contains("```cpp\nvoid sort_it() {}\n```"));
        assert!(prompt.contains("undefined reference to `main`"));
    }
}
