use std::env;
use std::rc::Rc;

use snafu::{OptionExt, Snafu};

use pigeon_client::BotReply;
use pigeon_storage::{
    ChatEntry, DEFAULT_GREETING_KEY, MemoryStore, TranscriptKeys, TranscriptStore,
};
use pigeon_widget::testing::{RecordingSurface, ScriptedBackend, ScriptedVoice};
use pigeon_widget::{ChatWidget, WidgetSettings};

#[derive(Debug, Clone, Copy)]
enum Scenario {
    HelloRoundtrip,
    GreetingOnce,
    TypingCleanup,
    StaleResponse,
    Reset,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "hello_roundtrip" => Some(Self::HelloRoundtrip),
            "greeting_once" => Some(Self::GreetingOnce),
            "typing_cleanup" => Some(Self::TypingCleanup),
            "stale_response" => Some(Self::StaleResponse),
            "reset" => Some(Self::Reset),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::HelloRoundtrip => "hello_roundtrip",
            Self::GreetingOnce => "greeting_once",
            Self::TypingCleanup => "typing_cleanup",
            Self::StaleResponse => "stale_response",
            Self::Reset => "reset",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

struct Session {
    widget: ChatWidget,
    backend: Rc<ScriptedBackend>,
    surface: RecordingSurface,
    store: MemoryStore,
}

impl Session {
    fn open(store: MemoryStore) -> Self {
        let backend = Rc::new(ScriptedBackend::new());
        let surface = RecordingSurface::new();
        let widget = ChatWidget::new(
            &WidgetSettings::default(),
            backend.clone(),
            Box::new(surface.clone()),
            Box::new(store.clone()),
            Rc::new(ScriptedVoice::supported()),
        );

        Self {
            widget,
            backend,
            surface,
            store,
        }
    }

    fn persisted(&self) -> Vec<ChatEntry> {
        TranscriptStore::new(Box::new(self.store.clone()), TranscriptKeys::default()).load()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        println!("runner_ok=false");
        eprintln!("runner_error={error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let scenario = parse_args(env::args().skip(1))?;
    println!("scenario={}", scenario.name());

    match scenario {
        Scenario::HelloRoundtrip => run_hello_roundtrip().await,
        Scenario::GreetingOnce => run_greeting_once().await,
        Scenario::TypingCleanup => run_typing_cleanup().await,
        Scenario::StaleResponse => run_stale_response().await,
        Scenario::Reset => run_reset().await,
        Scenario::All => run_all().await,
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<Scenario> {
    let mut scenario = None;
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--scenario" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-scenario-value",
                    arg: "--scenario",
                })?;

                let parsed = Scenario::parse(&value).context(UnknownScenarioSnafu {
                    stage: "parse-args-scenario",
                    raw: value,
                })?;
                scenario = Some(parsed);
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    scenario.context(MissingScenarioSnafu {
        stage: "parse-args-scenario-required",
    })
}

async fn run_all() -> RunnerResult<()> {
    run_hello_roundtrip().await?;
    run_greeting_once().await?;
    run_typing_cleanup().await?;
    run_stale_response().await?;
    run_reset().await?;
    println!("all_passed=true");
    Ok(())
}

async fn run_hello_roundtrip() -> RunnerResult<()> {
    let store = MemoryStore::new();
    let session = Session::open(store.clone());
    session.backend.push_chat(vec![BotReply::text("hello!")]);
    session.widget.submit("hi").await;

    let expected = vec![ChatEntry::user_text("hi"), ChatEntry::bot_text("hello!")];
    let persisted_ok = session.persisted() == expected;
    println!("persisted_matches={persisted_ok}");

    let reopened = Session::open(store);
    reopened.widget.start().await;
    let replay_ok = reopened.widget.entries() == expected;
    println!("replay_matches={replay_ok}");

    check(
        persisted_ok && replay_ok,
        "hello_roundtrip",
        "transcript did not survive a reload",
    )
}

async fn run_greeting_once() -> RunnerResult<()> {
    let session = Session::open(MemoryStore::new());
    session
        .backend
        .push_greeting(vec![BotReply::text("Welcome!")]);

    session.widget.check_greeting().await;
    session.widget.check_greeting().await;

    let calls = session.backend.greeting_calls();
    println!("greeting_calls={calls}");
    check(calls == 1, "greeting_once", format!("expected 1 fetch, saw {calls}"))
}

async fn run_typing_cleanup() -> RunnerResult<()> {
    let session = Session::open(MemoryStore::new());
    session.backend.push_chat(vec![BotReply::text("ok")]);
    session.backend.push_chat_failure();

    session.widget.submit("first").await;
    let after_success = session.surface.typing_count();
    session.widget.submit("second").await;
    let after_failure = session.surface.typing_count();

    println!("typing_after_success={after_success}");
    println!("typing_after_failure={after_failure}");
    check(
        after_success == 0 && after_failure == 0,
        "typing_cleanup",
        "typing indicator left behind",
    )
}

async fn run_stale_response() -> RunnerResult<()> {
    let session = Session::open(MemoryStore::new());
    let older = session.backend.push_deferred_chat();
    let newer = session.backend.push_deferred_chat();

    futures::join!(
        session.widget.submit("older"),
        session.widget.submit("newer"),
        async {
            let _ = newer.send(Ok(vec![BotReply::text("for newer")]));
            let _ = older.send(Ok(vec![BotReply::text("for older")]));
        }
    );

    let rendered_stale = session
        .widget
        .entries()
        .iter()
        .any(|entry| entry.message() == "for older");
    println!("rendered_stale={rendered_stale}");
    check(
        !rendered_stale,
        "stale_response",
        "superseded response was rendered",
    )
}

async fn run_reset() -> RunnerResult<()> {
    let session = Session::open(MemoryStore::new());
    session
        .backend
        .push_greeting(vec![BotReply::text("Welcome!")]);
    session.backend.push_chat(vec![BotReply::text("hello!")]);
    session.widget.start().await;
    session.widget.submit("hi").await;

    session
        .backend
        .push_greeting(vec![BotReply::text("Welcome back!")]);
    let acknowledged = session.widget.reset().await;

    let history_restarted = session.persisted() == vec![ChatEntry::bot_text("Welcome back!")];
    let greeted_again = session.store.contains(DEFAULT_GREETING_KEY);
    println!("reset_acknowledged={acknowledged}");
    println!("visible_nodes={}", session.surface.len());
    check(
        acknowledged && history_restarted && greeted_again && session.surface.len() == 1,
        "reset",
        "reset did not restart the conversation",
    )
}

fn check(condition: bool, scenario: &'static str, reason: impl Into<String>) -> RunnerResult<()> {
    if !condition {
        return ScenarioFailedSnafu {
            stage: "scenario-check",
            scenario,
            reason: reason.into(),
        }
        .fail();
    }

    println!("runner_ok=true");
    Ok(())
}
