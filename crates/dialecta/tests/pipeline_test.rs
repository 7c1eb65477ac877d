//! End-to-end run through the CLI wiring against mock backends.

use std::sync::{Arc, Mutex};

use dialecta::app::run_debate;
use dialecta::terminal::{print_summary, TerminalSink};
use dialecta_core::{Credentials, DialectaConfig, OutputMode, Provider, Role, SharedSink};
use tokio_util::sync::CancellationToken;

const SIDE: &str = "## 💡 One-Liner\nWorth doing.\n\n## 📝 Full Argument\nCost is low, payoff is high.";
const VERDICT: &str = "## 💡 One-Liner\nGo ahead.\n\n## 📝 Full Verdict\nThe affirmative case holds.";

#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

/// Every role on the OpenAI-compatible backend, sides and judge on separate
/// mock servers.
fn config(sides_url: &str, judge_url: &str, report_dir: Option<std::path::PathBuf>) -> DialectaConfig {
    let mut config = DialectaConfig::default();
    for role in Role::ALL {
        let rc = config.role_mut(role);
        rc.provider = Provider::DeepSeek;
        rc.model = "deepseek-chat".into();
        rc.base_url = Some(if role == Role::Judge { judge_url } else { sides_url }.to_string());
    }
    config.output = OutputMode::Batch;
    config.report_dir = report_dir;
    config
}

#[tokio::test]
async fn batch_run_renders_and_writes_report() {
    let mut sides = mockito::Server::new_async().await;
    let mut judge = mockito::Server::new_async().await;
    let sides_mock = sides
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_header("content-type", "application/json")
        .with_body(completion(SIDE))
        .expect(2)
        .create_async()
        .await;
    let judge_mock = judge
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::Regex("Cost is low, payoff is high".into()))
        .with_header("content-type", "application/json")
        .with_body(completion(VERDICT))
        .expect(1)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let buffer = Buffer::default();
    let sink: SharedSink = Arc::new(TerminalSink::new(Box::new(buffer.clone())));

    let result = run_debate(
        config(&sides.url(), &judge.url(), Some(tmp.path().to_path_buf())),
        Credentials::new().with(Provider::DeepSeek, "test-key"),
        "Should we adopt the new build system?",
        Some(sink),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    sides_mock.assert_async().await;
    judge_mock.assert_async().await;

    assert_eq!(result.pro.headline, "Worth doing.");
    assert_eq!(result.con.full_body, "Cost is low, payoff is high.");
    assert_eq!(result.judge.headline, "Go ahead.");
    assert_eq!(result.judge.full_body, "The affirmative case holds.");

    let report = result.report_path.clone().expect("report written");
    let text = std::fs::read_to_string(&report).unwrap();
    assert!(text.contains("Should we adopt the new build system?"));
    assert!(text.contains("The affirmative case holds."));

    let rendered = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(rendered.contains("[Affirmative / pro] Worth doing."));
    assert!(rendered.contains("[Adjudicator / judge] Go ahead."));

    let mut summary = Vec::new();
    print_summary(&mut summary, &result, OutputMode::Batch).unwrap();
    let summary = String::from_utf8(summary).unwrap();
    assert!(summary.contains(&report));
    assert!(summary.contains("Cost is low, payoff is high."));
    assert!(summary.contains("The affirmative case holds."));
}

#[tokio::test]
async fn side_failure_skips_the_judge() {
    let mut sides = mockito::Server::new_async().await;
    let mut judge = mockito::Server::new_async().await;
    sides
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("upstream down")
        .create_async()
        .await;
    let judge_mock = judge
        .mock("POST", "/chat/completions")
        .with_body(completion(VERDICT))
        .expect(0)
        .create_async()
        .await;

    let err = run_debate(
        config(&sides.url(), &judge.url(), None),
        Credentials::new().with(Provider::DeepSeek, "test-key"),
        "material",
        None,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    judge_mock.assert_async().await;
    let debate = err
        .downcast_ref::<dialecta_core::DebateError>()
        .expect("debate error");
    assert_eq!(debate.role(), Some(Role::Pro));
    assert!(format!("{err}").contains("500"));
}
