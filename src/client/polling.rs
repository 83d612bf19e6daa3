use std::time::Duration;

/// Timer changes the session runtime has to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start(Duration),
    Stop,
}

/// Auto-refresh gate: the timer runs only while auto-refresh is on and the view is visible.
#[derive(Debug, Clone)]
pub struct Polling {
    interval: Duration,
    auto_refresh: bool,
    visible: bool,
    running: bool,
}

impl Polling {
    pub fn new(interval: Duration, auto_refresh: bool) -> Self {
        Self {
            interval,
            auto_refresh,
            visible: true,
            running: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a tick arriving now may fetch.
    pub fn may_poll(&self) -> bool {
        self.auto_refresh && self.visible
    }

    /// Brings the timer in line with the current gate.
    pub fn reconcile(&mut self) -> Option<TimerCommand> {
        match (self.may_poll(), self.running) {
            (true, false) => {
                self.running = true;
                Some(TimerCommand::Start(self.interval))
            }
            (false, true) => {
                self.running = false;
                Some(TimerCommand::Stop)
            }
            _ => None,
        }
    }

    pub fn toggle_auto_refresh(&mut self) -> Option<TimerCommand> {
        self.auto_refresh = !self.auto_refresh;
        self.reconcile()
    }

    pub fn set_visible(&mut self, visible: bool) -> Option<TimerCommand> {
        self.visible = visible;
        self.reconcile()
    }
}
