use std::collections::{HashMap, HashSet};

use crate::models::{AcknowledgeAlertRequest, Alert, AlertKind};

/// Per-alert UI state. Removal is the absence of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertPhase {
    #[default]
    Collapsed,
    Expanded,
    /// Dismissal requested; waiting for the exit delay to elapse.
    Exiting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEntry {
    pub alert: Alert,
    pub phase: AlertPhase,
}

/// What removing an alert amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dismissal {
    /// Persist the dismissal server-side.
    Acknowledge(AcknowledgeAlertRequest),
    /// Hide the kind for the rest of this session only.
    SessionOnly(AlertKind),
}

/// Alerts currently on screen, sorted by severity, plus everything hidden during this session.
#[derive(Debug, Default)]
pub struct AlertBoard {
    entries: Vec<AlertEntry>,
    session_dismissed: HashSet<AlertKind>,
    acknowledged: HashSet<AcknowledgeAlertRequest>,
}

impl AlertBoard {
    pub fn entries(&self) -> &[AlertEntry] {
        &self.entries
    }

    pub fn phase(&self, kind: AlertKind) -> Option<AlertPhase> {
        self.entries
            .iter()
            .find(|entry| entry.alert.kind == kind)
            .map(|entry| entry.phase)
    }

    fn is_hidden(&self, alert: &Alert) -> bool {
        if self.session_dismissed.contains(&alert.kind) {
            return true;
        }
        alert
            .acknowledgement()
            .is_some_and(|ack| self.acknowledged.contains(&ack))
    }

    /// Replaces the alert list with a freshly loaded one, keeping the phase of kinds still present.
    pub fn replace(&mut self, alerts: Vec<Alert>) {
        let phases: HashMap<AlertKind, AlertPhase> = self
            .entries
            .iter()
            .map(|entry| (entry.alert.kind, entry.phase))
            .collect();

        let mut entries: Vec<AlertEntry> = alerts
            .into_iter()
            .filter(|alert| !self.is_hidden(alert))
            .map(|alert| AlertEntry {
                phase: phases.get(&alert.kind).copied().unwrap_or_default(),
                alert,
            })
            .collect();
        entries.sort_by_key(|entry| entry.alert.severity.rank());
        self.entries = entries;
    }

    /// Tap: collapsed and expanded swap. Returns whether anything changed.
    pub fn toggle(&mut self, kind: AlertKind) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.alert.kind == kind) else {
            return false;
        };
        entry.phase = match entry.phase {
            AlertPhase::Collapsed => AlertPhase::Expanded,
            AlertPhase::Expanded => AlertPhase::Collapsed,
            AlertPhase::Exiting => return false,
        };
        true
    }

    /// Close: the alert starts exiting. Returns `false` if it is absent or already exiting.
    pub fn begin_exit(&mut self, kind: AlertKind) -> bool {
        match self.entries.iter_mut().find(|entry| entry.alert.kind == kind) {
            Some(entry) if entry.phase != AlertPhase::Exiting => {
                entry.phase = AlertPhase::Exiting;
                true
            }
            _ => false,
        }
    }

    /// Exit delay elapsed: removes the alert and records how it was dismissed.
    pub fn finish_exit(&mut self, kind: AlertKind) -> Option<Dismissal> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.alert.kind == kind && entry.phase == AlertPhase::Exiting)?;
        let entry = self.entries.remove(index);

        match entry.alert.acknowledgement() {
            Some(request) => {
                self.acknowledged.insert(request.clone());
                Some(Dismissal::Acknowledge(request))
            }
            None => {
                self.session_dismissed.insert(kind);
                Some(Dismissal::SessionOnly(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertSeverity;

    fn alert(kind: AlertKind, severity: AlertSeverity, signed: bool) -> Alert {
        Alert {
            kind,
            severity,
            count: 1,
            orders: vec![],
            signature: signed.then(|| format!("sig-{kind}")),
            scope_hash: signed.then(|| "scope".to_string()),
        }
    }

    fn kinds(board: &AlertBoard) -> Vec<AlertKind> {
        board.entries().iter().map(|entry| entry.alert.kind).collect()
    }

    #[test]
    fn alerts_are_sorted_by_severity() {
        let mut board = AlertBoard::default();
        board.replace(vec![
            alert(AlertKind::Autocontrollo, AlertSeverity::Low, false),
            alert(AlertKind::Overdue, AlertSeverity::Critical, false),
            alert(AlertKind::Suspended, AlertSeverity::Medium, false),
        ]);
        assert_eq!(
            kinds(&board),
            vec![AlertKind::Overdue, AlertKind::Suspended, AlertKind::Autocontrollo]
        );
    }

    #[test]
    fn tap_toggles_and_reload_keeps_phase() {
        let mut board = AlertBoard::default();
        board.replace(vec![alert(AlertKind::Overdue, AlertSeverity::High, false)]);
        assert!(board.toggle(AlertKind::Overdue));
        assert_eq!(board.phase(AlertKind::Overdue), Some(AlertPhase::Expanded));

        board.replace(vec![alert(AlertKind::Overdue, AlertSeverity::Critical, false)]);
        assert_eq!(board.phase(AlertKind::Overdue), Some(AlertPhase::Expanded));

        assert!(board.toggle(AlertKind::Overdue));
        assert_eq!(board.phase(AlertKind::Overdue), Some(AlertPhase::Collapsed));
        assert!(!board.toggle(AlertKind::Suspended));
    }

    #[test]
    fn signed_alert_is_acknowledged_and_stays_hidden() {
        let mut board = AlertBoard::default();
        let signed = alert(AlertKind::Overdue, AlertSeverity::High, true);
        board.replace(vec![signed.clone()]);

        assert!(board.begin_exit(AlertKind::Overdue));
        assert!(!board.begin_exit(AlertKind::Overdue));
        assert!(!board.toggle(AlertKind::Overdue));

        let dismissal = board.finish_exit(AlertKind::Overdue).unwrap();
        assert_eq!(dismissal, Dismissal::Acknowledge(signed.acknowledgement().unwrap()));
        assert!(board.entries().is_empty());

        board.replace(vec![signed]);
        assert!(board.entries().is_empty());
    }

    #[test]
    fn changed_signature_shows_again_after_acknowledgement() {
        let mut board = AlertBoard::default();
        board.replace(vec![alert(AlertKind::Overdue, AlertSeverity::High, true)]);
        board.begin_exit(AlertKind::Overdue);
        board.finish_exit(AlertKind::Overdue);

        let mut changed = alert(AlertKind::Overdue, AlertSeverity::High, true);
        changed.signature = Some("another-set".into());
        board.replace(vec![changed]);
        assert_eq!(kinds(&board), vec![AlertKind::Overdue]);
    }

    #[test]
    fn unsigned_alert_is_hidden_for_the_session() {
        let mut board = AlertBoard::default();
        board.replace(vec![alert(AlertKind::Suspended, AlertSeverity::Medium, false)]);
        board.begin_exit(AlertKind::Suspended);
        assert_eq!(
            board.finish_exit(AlertKind::Suspended),
            Some(Dismissal::SessionOnly(AlertKind::Suspended))
        );

        board.replace(vec![alert(AlertKind::Suspended, AlertSeverity::High, false)]);
        assert!(board.entries().is_empty());
    }

    #[test]
    fn finish_without_exit_does_nothing() {
        let mut board = AlertBoard::default();
        board.replace(vec![alert(AlertKind::Overdue, AlertSeverity::High, true)]);
        assert!(board.finish_exit(AlertKind::Overdue).is_none());
        assert_eq!(board.entries().len(), 1);
    }
}
