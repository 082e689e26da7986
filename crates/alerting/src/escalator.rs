//! Alert escalation

use crate::sound::SoundCommand;
use crate::AlertError;
use dms::{AlertLevel, DrowsinessResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Alert category
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AlertType {
    #[default]
    None,
    EyesClosed,
    Drowsiness,
    HeadMovement,
    /// Raised by a source outside the vision pipeline
    External(String),
}

impl AlertType {
    pub fn as_str(&self) -> &str {
        match self {
            AlertType::None => "none",
            AlertType::EyesClosed => "eyes_closed",
            AlertType::Drowsiness => "drowsiness",
            AlertType::HeadMovement => "head_movement",
            AlertType::External(label) => label,
        }
    }

    /// Select the alert type for a drowsiness result (first match wins)
    pub fn classify(result: &DrowsinessResult) -> Self {
        if result.eyes_closed {
            AlertType::EyesClosed
        } else if result.alert_level >= AlertLevel::Alert {
            AlertType::Drowsiness
        } else if result.head_distracted {
            AlertType::HeadMovement
        } else {
            AlertType::None
        }
    }
}

impl From<AlertType> for String {
    fn from(alert_type: AlertType) -> Self {
        alert_type.as_str().to_string()
    }
}

/// Parses serialized labels; unknown labels become [`AlertType::External`]
impl From<String> for AlertType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "none" => AlertType::None,
            "eyes_closed" => AlertType::EyesClosed,
            "drowsiness" => AlertType::Drowsiness,
            "head_movement" => AlertType::HeadMovement,
            _ => AlertType::External(label),
        }
    }
}

/// Escalator-owned alert state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertState {
    pub current_level: AlertLevel,
    /// A sound was requested and not yet stopped
    pub is_sounding: bool,
}

/// Result of one escalation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub alert_level: AlertLevel,
    pub alert_type: AlertType,
    /// Severity rose to an audible level on this step
    pub notified: bool,
}

/// Edge-triggered alert escalator.
///
/// Sound is requested only when the level rises to [`AlertLevel::Alert`] or
/// above; holding a level never re-triggers it. Requests are fire-and-forget
/// over a bounded channel so evaluation never blocks.
pub struct AlertEscalator {
    state: AlertState,
    notifier: Option<mpsc::Sender<SoundCommand>>,
    notifications: usize,
}

impl AlertEscalator {
    /// Create an escalator that sends sound commands to a worker
    pub fn new(notifier: mpsc::Sender<SoundCommand>) -> Self {
        Self {
            state: AlertState::default(),
            notifier: Some(notifier),
            notifications: 0,
        }
    }

    /// Create an escalator without a sound backend
    pub fn silent() -> Self {
        Self {
            state: AlertState::default(),
            notifier: None,
            notifications: 0,
        }
    }

    /// Escalate from a drowsiness result
    pub fn evaluate(&mut self, result: &DrowsinessResult) -> AlertOutcome {
        self.escalate(result.alert_level, AlertType::classify(result))
    }

    /// Inject an alert from an auxiliary source (e.g. a physiological sensor)
    pub fn trigger_external(&mut self, label: impl Into<String>, level: AlertLevel) -> AlertOutcome {
        let label = label.into();
        info!("External alert '{}' at level {}", label, level.as_u8());
        self.escalate(level, AlertType::External(label))
    }

    fn escalate(&mut self, level: AlertLevel, alert_type: AlertType) -> AlertOutcome {
        let previous = self.state.current_level;
        let notified = level > previous && level >= AlertLevel::Alert;

        if notified {
            self.notifications += 1;
            info!(
                "Alert escalated {} -> {} ({})",
                previous.as_str(),
                level.as_str(),
                alert_type.as_str()
            );
            if self.send(SoundCommand::Start(level)).is_ok() {
                self.state.is_sounding = true;
            }
        } else if level < AlertLevel::Alert && self.state.is_sounding {
            debug!("Alert dropped to {}, silencing", level.as_str());
            match self.send(SoundCommand::Stop) {
                // Retried on the next evaluation below Alert
                Err(AlertError::QueueFull) => {}
                Ok(()) | Err(AlertError::WorkerClosed) => self.state.is_sounding = false,
            }
        }

        self.state.current_level = level;

        AlertOutcome {
            alert_level: level,
            alert_type,
            notified,
        }
    }

    fn send(&mut self, command: SoundCommand) -> Result<(), AlertError> {
        let Some(notifier) = &self.notifier else {
            return Err(AlertError::WorkerClosed);
        };

        match notifier.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                warn!("Sound queue full, dropping {:?}", dropped);
                Err(AlertError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Sound worker gone, continuing without sound");
                self.notifier = None;
                Err(AlertError::WorkerClosed)
            }
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn current_level(&self) -> AlertLevel {
        self.state.current_level
    }

    /// Number of escalations that requested a sound
    pub fn notification_count(&self) -> usize {
        self.notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_at(level: AlertLevel) -> DrowsinessResult {
        DrowsinessResult {
            alert_level: level,
            ..DrowsinessResult::neutral()
        }
    }

    fn drain(rx: &mut mpsc::Receiver<SoundCommand>) -> Vec<SoundCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    #[test]
    fn test_edge_triggered_sequence() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut escalator = AlertEscalator::new(tx);

        let levels = [0u8, 2, 2, 2, 1, 3];
        for level in levels {
            let level = AlertLevel::try_from(level).unwrap();
            escalator.evaluate(&result_at(level));
        }

        let starts: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|c| matches!(c, SoundCommand::Start(_)))
            .collect();
        assert_eq!(
            starts,
            vec![
                SoundCommand::Start(AlertLevel::Alert),
                SoundCommand::Start(AlertLevel::Critical)
            ]
        );
        assert_eq!(escalator.notification_count(), 2);
        assert_eq!(escalator.current_level(), AlertLevel::Critical);
    }

    #[test]
    fn test_decrease_below_alert_stops_sound() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut escalator = AlertEscalator::new(tx);

        escalator.evaluate(&result_at(AlertLevel::Critical));
        assert!(escalator.state().is_sounding);

        // Dropping to Alert keeps the current sound
        escalator.evaluate(&result_at(AlertLevel::Alert));
        assert!(escalator.state().is_sounding);

        escalator.evaluate(&result_at(AlertLevel::Warning));
        assert!(!escalator.state().is_sounding);

        assert_eq!(
            drain(&mut rx),
            vec![SoundCommand::Start(AlertLevel::Critical), SoundCommand::Stop]
        );
    }

    #[test]
    fn test_warning_never_sounds() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut escalator = AlertEscalator::new(tx);

        let outcome = escalator.evaluate(&result_at(AlertLevel::Warning));
        assert!(!outcome.notified);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_decrease_is_recorded_for_next_edge() {
        let mut escalator = AlertEscalator::silent();

        assert!(escalator.evaluate(&result_at(AlertLevel::Alert)).notified);
        assert!(!escalator.evaluate(&result_at(AlertLevel::Normal)).notified);
        assert_eq!(escalator.current_level(), AlertLevel::Normal);
        assert!(escalator.evaluate(&result_at(AlertLevel::Alert)).notified);
    }

    #[test]
    fn test_type_priority() {
        let mut escalator = AlertEscalator::silent();

        let closed = DrowsinessResult {
            eyes_closed: true,
            head_distracted: true,
            alert_level: AlertLevel::Critical,
            ..DrowsinessResult::neutral()
        };
        assert_eq!(escalator.evaluate(&closed).alert_type, AlertType::EyesClosed);

        let drowsy = DrowsinessResult {
            head_distracted: true,
            alert_level: AlertLevel::Alert,
            ..DrowsinessResult::neutral()
        };
        assert_eq!(escalator.evaluate(&drowsy).alert_type, AlertType::Drowsiness);

        let distracted = DrowsinessResult {
            head_distracted: true,
            alert_level: AlertLevel::Normal,
            ..DrowsinessResult::neutral()
        };
        assert_eq!(escalator.evaluate(&distracted).alert_type, AlertType::HeadMovement);

        assert_eq!(
            escalator.evaluate(&DrowsinessResult::neutral()).alert_type,
            AlertType::None
        );
    }

    #[test]
    fn test_external_alert_uses_same_edge_rule() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut escalator = AlertEscalator::new(tx);

        let outcome = escalator.trigger_external("low_pulse", AlertLevel::Critical);
        assert_eq!(outcome.alert_type, AlertType::External("low_pulse".into()));
        assert!(outcome.notified);

        // Same level again does not re-fire
        assert!(!escalator.trigger_external("low_pulse", AlertLevel::Critical).notified);
        assert_eq!(drain(&mut rx), vec![SoundCommand::Start(AlertLevel::Critical)]);
    }

    #[test]
    fn test_full_queue_does_not_block() {
        let (tx, _rx) = mpsc::channel(1);
        let mut escalator = AlertEscalator::new(tx);

        escalator.evaluate(&result_at(AlertLevel::Alert));
        escalator.evaluate(&result_at(AlertLevel::Normal));
        let outcome = escalator.evaluate(&result_at(AlertLevel::Critical));

        assert!(outcome.notified);
        assert_eq!(escalator.notification_count(), 2);
    }

    #[test]
    fn test_closed_worker_degrades_to_silent() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut escalator = AlertEscalator::new(tx);

        let outcome = escalator.evaluate(&result_at(AlertLevel::Critical));
        assert!(outcome.notified);
        assert!(!escalator.state().is_sounding);
    }

    #[test]
    fn test_alert_type_labels() {
        assert_eq!(String::from(AlertType::HeadMovement), "head_movement");
        assert_eq!(AlertType::from("eyes_closed".to_string()), AlertType::EyesClosed);
        assert_eq!(
            AlertType::from("arduino_pulse".to_string()),
            AlertType::External("arduino_pulse".into())
        );
    }

    #[test]
    fn test_dropped_stop_keeps_sounding() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut escalator = AlertEscalator::new(tx);

        escalator.evaluate(&result_at(AlertLevel::Alert));
        // Queue still holds the Start, so this Stop is dropped
        escalator.evaluate(&result_at(AlertLevel::Warning));
        assert!(escalator.state().is_sounding);

        assert_eq!(drain(&mut rx), vec![SoundCommand::Start(AlertLevel::Alert)]);
        escalator.evaluate(&result_at(AlertLevel::Normal));
        assert!(!escalator.state().is_sounding);
        assert_eq!(drain(&mut rx), vec![SoundCommand::Stop]);
    }

    #[test]
    fn test_external_label_keeps_source() {
        let mut escalator = AlertEscalator::silent();

        let outcome = escalator.trigger_external("drowsiness", AlertLevel::Alert);
        assert_eq!(outcome.alert_type, AlertType::External("drowsiness".into()));
        assert_eq!(outcome.alert_type.as_str(), "drowsiness");
    }
}
