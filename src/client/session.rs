use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::api::{ClientError, DashboardApi};
use super::controller::{DashboardController, DashboardView, Effect, Event};
use crate::dashboard::CsvExport;

const COMMAND_BUFFER: usize = 64;

enum Command {
    Event(Event),
    Shutdown,
}

/// Front-end handle to a running dashboard session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<DashboardView>,
    downloads: mpsc::UnboundedReceiver<CsvExport>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, event: Event) -> Result<(), ClientError> {
        self.commands
            .send(Command::Event(event))
            .await
            .map_err(|_| ClientError::SessionClosed)
    }

    /// Latest published view; `changed()` on the receiver wakes after each processed event.
    pub fn view(&self) -> watch::Receiver<DashboardView> {
        self.view.clone()
    }

    pub async fn next_download(&mut self) -> Option<CsvExport> {
        self.downloads.recv().await
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Starts the session loop. It owns the controller and runs the effects it produces.
pub fn spawn_session(api: Arc<dyn DashboardApi>, controller: DashboardController) -> SessionHandle {
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let (view_tx, view) = watch::channel(controller.view());
    let (downloads_tx, downloads) = mpsc::unbounded_channel();

    let session = Session {
        api,
        controller,
        receiver,
        loopback: commands.downgrade(),
        view: view_tx,
        downloads: downloads_tx,
        timer: None,
    };
    let task = tokio::spawn(session.run());

    SessionHandle {
        commands,
        view,
        downloads,
        task,
    }
}

struct Session {
    api: Arc<dyn DashboardApi>,
    controller: DashboardController,
    receiver: mpsc::Receiver<Command>,
    // Weak so the loop ends once every handle is gone.
    loopback: mpsc::WeakSender<Command>,
    view: watch::Sender<DashboardView>,
    downloads: mpsc::UnboundedSender<CsvExport>,
    timer: Option<JoinHandle<()>>,
}

impl Session {
    async fn run(mut self) {
        info!("dashboard session started");
        while let Some(command) = self.receiver.recv().await {
            match command {
                Command::Event(event) => {
                    for effect in self.controller.handle(event) {
                        self.execute(effect);
                    }
                    self.view.send_replace(self.controller.view());
                }
                Command::Shutdown => break,
            }
        }
        self.stop_timer();
        info!("dashboard session stopped");
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Fetch { seq, query } => {
                let api = Arc::clone(&self.api);
                let loopback = self.loopback.clone();
                tokio::spawn(async move {
                    let result = api.fetch(&query).await;
                    post(&loopback, Event::FetchCompleted { seq, result }).await;
                });
            }
            Effect::StartTimer(interval) => self.start_timer(interval),
            Effect::StopTimer => self.stop_timer(),
            Effect::ScheduleAlertExit { kind, after } => {
                let loopback = self.loopback.clone();
                tokio::spawn(async move {
                    time::sleep(after).await;
                    post(&loopback, Event::AlertExitElapsed(kind)).await;
                });
            }
            Effect::Acknowledge(request) => {
                let api = Arc::clone(&self.api);
                let loopback = self.loopback.clone();
                tokio::spawn(async move {
                    let result = api.acknowledge(&request).await;
                    post(&loopback, Event::AcknowledgeCompleted { request, result }).await;
                });
            }
            Effect::Download(export) => {
                debug!(file = %export.file_name, "export ready");
                if self.downloads.send(export).is_err() {
                    debug!("export dropped: no download receiver");
                }
            }
        }
    }

    fn start_timer(&mut self, interval: Duration) {
        self.stop_timer();
        let loopback = self.loopback.clone();
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !post(&loopback, Event::Tick).await {
                    break;
                }
            }
        }));
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

async fn post(loopback: &mpsc::WeakSender<Command>, event: Event) -> bool {
    match loopback.upgrade() {
        Some(sender) => sender.send(Command::Event(event)).await.is_ok(),
        None => false,
    }
}
