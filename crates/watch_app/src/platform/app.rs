use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use watch_core::{update, AppState, ConnectionStatus, Msg};
use watch_logging::{watch_info, watch_warn};

use super::cli::Cli;
use super::config::WatchConfig;
use super::effects::EffectRunner;
use super::logging;
use super::render::render;
use super::session::{Outcome, Session, Step};

const EVENT_WAIT: Duration = Duration::from_millis(250);
const CLOSE_GRACE: Duration = Duration::from_secs(2);

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = WatchConfig::load(&cli.config)?;
    config.apply_overrides(&cli);
    config.validate()?;
    logging::initialize(config.log_destination);

    let runner =
        EffectRunner::new(config.engine_settings()).context("failed to start the IO engine")?;
    let mut app = App::new(runner, config.max_threads);
    let mut session = Session::new(cli.urls);

    app.dispatch(Msg::OpenRequested {
        address: config.ws_url.clone(),
    });
    let mut step = session.start();

    let outcome = loop {
        match step {
            Step::Exit(outcome) => break outcome,
            Step::Submit(url) => {
                watch_info!("submitting {}", url);
                app.dispatch(Msg::SubmitRequested {
                    url,
                    max_threads: app.max_threads,
                });
            }
            Step::Wait => {}
        }

        let msg = app.runner.next_msg(EVENT_WAIT);
        let answers_submit = matches!(msg, Msg::SubmitResponded { .. } | Msg::SubmitFailed { .. });
        let before = app.tracked_job();
        app.dispatch(msg);

        step = if answers_submit {
            let after = app.tracked_job();
            session.submit_answered(after.filter(|id| before.as_ref() != Some(id)))
        } else {
            session.observe(&app.state.view())
        };
    };

    app.close_channel();
    match outcome {
        Outcome::Success => Ok(ExitCode::SUCCESS),
        Outcome::Failure => {
            watch_warn!("finished with failures");
            Ok(ExitCode::FAILURE)
        }
    }
}

struct App {
    runner: EffectRunner,
    state: AppState,
    max_threads: u32,
    last_line: String,
}

impl App {
    fn new(runner: EffectRunner, max_threads: u32) -> Self {
        Self {
            runner,
            state: AppState::new(),
            max_threads,
            last_line: String::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.run(effects);
        if state.consume_dirty() {
            let line = render(&state.view());
            if line != self.last_line {
                println!("{line}");
                self.last_line = line;
            }
        }
        self.state = state;
    }

    /// Close the push channel and wait for the socket to report it, so the
    /// close frame goes out before the process exits.
    fn close_channel(&mut self) {
        let open = matches!(
            self.state.connection().status(),
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        );
        self.dispatch(Msg::CloseRequested);
        if !open {
            return;
        }
        let deadline = Instant::now() + CLOSE_GRACE;
        while Instant::now() < deadline {
            let msg = self.runner.next_msg(EVENT_WAIT);
            let closed = matches!(msg, Msg::ConnectionLost { .. });
            self.dispatch(msg);
            if closed {
                break;
            }
        }
    }

    fn tracked_job(&self) -> Option<String> {
        self.state.reconciler().job().map(|job| job.id.clone())
    }
}
