use std::sync::Arc;

use anyhow::Context;
use jobwatch_core::{update, AnalysisStatus, JobItem, ListState, Msg, PageRequest};
use jobwatch_engine::{
    AlertSummary, AnalysisSummary, ApiClient, EngineEvent, EngineHandle, JobListSource,
    PollCadence, WireSource,
};
use jobwatch_logging::{watch_error, watch_info, watch_warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::{Command, HELP};
use crate::config::WatchConfig;
use crate::effects::{DetailOutcome, EffectRunner};
use crate::render::{render_detail, render_list, AlertsLine};

const ANALYSES: &str = "analyses";
const ALERTS: &str = "alerts";

pub async fn run(config: WatchConfig, bearer_token: Option<String>) -> anyhow::Result<()> {
    let client = ApiClient::new(config.source_settings(bearer_token))
        .context("invalid server settings")?;
    let cadence = PollCadence::new(config.poll_interval());

    let analyses: EngineHandle<JobItem<AnalysisStatus>> = EngineHandle::new(
        Arc::new(JobListSource::<AnalysisSummary>::new(client.clone())),
        cadence.clone(),
        config.poll_settings(),
    );
    let alerts: EngineHandle<AlertSummary> = EngineHandle::new(
        Arc::new(WireSource::<AlertSummary>::new(client.clone())),
        cadence.clone(),
        config.poll_settings(),
    );
    let (details_tx, details_rx) = mpsc::unbounded_channel();

    let mut app = App {
        state: ListState::new(
            ANALYSES,
            config.page_size,
            AnalysisStatus::phases(),
            config.snapshot_scope,
        ),
        effects: EffectRunner::new(analyses, client, details_tx),
        alerts,
        alerts_line: AlertsLine::default(),
        alerts_dirty: false,
        details_rx,
        cadence,
        alerts_request: PageRequest::new(ALERTS, 1, config.page_size),
    };

    watch_info!("Watching {} every {:?}", config.base_url, config.poll_interval());
    println!("{HELP}");
    app.run_loop().await
}

struct App {
    state: ListState<AnalysisStatus>,
    effects: EffectRunner,
    alerts: EngineHandle<AlertSummary>,
    alerts_line: AlertsLine,
    alerts_dirty: bool,
    details_rx: mpsc::UnboundedReceiver<DetailOutcome>,
    cadence: PollCadence,
    alerts_request: PageRequest,
}

impl App {
    async fn run_loop(&mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        self.dispatch(Msg::Mounted);
        self.alerts.start(self.alerts_request.clone());
        self.render();

        loop {
            tokio::select! {
                event = self.effects.next_event() => match event {
                    Some(event) => self.dispatch(event.into_msg()),
                    None => break,
                },
                event = self.alerts.recv() => {
                    if let Some(event) = event {
                        self.apply_alerts(event);
                    }
                }
                outcome = self.details_rx.recv() => {
                    if let Some(outcome) = outcome {
                        self.show_detail(outcome);
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read stdin")? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if !self.handle_line(&line) {
                        break;
                    }
                }
            }
            self.render();
        }

        self.dispatch(Msg::Unmounted);
        self.alerts.stop_all();
        watch_info!("Stopped watching");
        Ok(())
    }

    /// Returns false when the operator asked to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                println!("? {err}");
                return true;
            }
        };

        match &command {
            Command::Quit => return false,
            Command::Help => println!("{HELP}"),
            Command::Interval(interval) => {
                self.cadence.set_interval(*interval);
                println!("Poll interval set to {interval:?}");
            }
            Command::Refresh => self.alerts.refresh_all(),
            _ => {}
        }
        if let Some(msg) = command.to_msg() {
            self.dispatch(msg);
        }
        true
    }

    fn dispatch(&mut self, msg: Msg<AnalysisStatus>) {
        let (state, effects) = update(self.state.clone(), msg);
        self.state = state;
        self.effects.run(effects);
    }

    fn apply_alerts(&mut self, event: EngineEvent<AlertSummary>) {
        match event {
            EngineEvent::FetchStarted { .. } => return,
            EngineEvent::PageLoaded { page, .. } => {
                self.alerts_line = AlertsLine::from_page(&page);
            }
            EngineEvent::PageFailed { error, .. } => {
                watch_warn!("Alerts unavailable: {}", error);
                self.alerts_line.error = Some(error.to_string());
            }
        }
        self.alerts_dirty = true;
    }

    fn show_detail(&mut self, outcome: DetailOutcome) {
        match outcome.result {
            Ok(detail) => println!("{}", render_detail(&detail)),
            Err(err) => {
                watch_error!("Failed to open {}: {}", outcome.job_id, err);
                println!("! could not open {}: {err}", outcome.job_id);
            }
        }
        self.dispatch(Msg::NavigationFinished);
    }

    fn render(&mut self) {
        let list_dirty = self.state.consume_dirty();
        let alerts_dirty = std::mem::take(&mut self.alerts_dirty);
        if list_dirty || alerts_dirty {
            println!("{}", render_list(&self.state.view(), &self.alerts_line));
        }
    }
}

