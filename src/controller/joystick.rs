//! Joystick collaborator
//!
//! [`Joystick`] is the handle the gamepad keeps: it answers state queries from
//! the latest sample. [`JoystickPoller`] is the task side that samples the ADC
//! on a fixed interval, classifies the reading and emits it to the router.

use super::ControllerError;
use crate::hal::{HalError, JoystickAdc};
use crate::input::{
    InputEvent, JoystickFormat, JoystickSample, JoystickValue, RawReading, ZoneClassifier,
};
use statum::{machine, state};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Latest sample as seen by the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoystickSnapshot {
    pub raw: RawReading,
    pub state: JoystickSample,
    pub samples: u64,
}

type SharedSnapshot = Arc<RwLock<JoystickSnapshot>>;

#[state]
#[derive(Debug, Clone)]
pub enum PollerState {
    Idle,
    Polling,
}

#[machine]
pub struct JoystickPoller<S: PollerState> {
    /// Lent to the blocking pool for the duration of each read
    adc: Option<Box<dyn JoystickAdc>>,
    classifier: ZoneClassifier,
    report: JoystickFormat,
    interval: Duration,
    snapshot: SharedSnapshot,
    events: mpsc::Sender<InputEvent>,
}

impl JoystickPoller<Idle> {
    pub fn create(
        adc: Box<dyn JoystickAdc>,
        classifier: ZoneClassifier,
        report: JoystickFormat,
        interval: Duration,
        snapshot: SharedSnapshot,
        events: mpsc::Sender<InputEvent>,
    ) -> Self {
        debug!(
            "Creating joystick poller: every {:?}, reporting {:?}",
            interval, report
        );
        Self::new(Some(adc), classifier, report, interval, snapshot, events)
    }

    pub fn start(self) -> JoystickPoller<Polling> {
        info!("Joystick poller entering Polling state");
        self.transition()
    }
}

/// Why a single poll did not deliver a sample
#[derive(Debug)]
enum PollError {
    Read(HalError),
    Lost(String),
    Closed,
}

impl JoystickPoller<Polling> {
    /// Samples once, updates the snapshot and emits the value
    ///
    /// ADC conversions block on the bus, so the read runs on the blocking
    /// pool and the ADC is handed back afterwards.
    async fn poll_once(&mut self) -> Result<(), PollError> {
        let mut adc = self
            .adc
            .take()
            .ok_or_else(|| PollError::Lost("ADC not returned by a previous read".into()))?;
        let (adc, reading) = task::spawn_blocking(move || {
            let reading = adc.read();
            (adc, reading)
        })
        .await
        .map_err(|e| PollError::Lost(e.to_string()))?;
        self.adc = Some(adc);

        let raw = reading.map_err(PollError::Read)?;
        let state = self.classifier.classify(raw);

        {
            let mut snapshot = self
                .snapshot
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            snapshot.raw = raw;
            snapshot.state = state;
            snapshot.samples += 1;
        }

        let value = match self.report {
            JoystickFormat::Raw => JoystickValue::Raw(raw),
            JoystickFormat::Classified => JoystickValue::Classified(state),
        };
        debug!("Joystick sample {:?}", value);

        match self.events.try_send(InputEvent::Joystick(value)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                // Samples are periodic, the next one supersedes this one
                warn!("Input queue full, dropping joystick sample");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(PollError::Closed),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Joystick polling started ({:?} interval)", self.interval);
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Joystick polling cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(()) => {}
                        Err(PollError::Read(e)) => warn!("Joystick read failed: {}", e),
                        Err(PollError::Lost(e)) => {
                            error!("Joystick ADC lost, polling stops: {}", e);
                            break;
                        }
                        Err(PollError::Closed) => {
                            info!("Router gone, joystick polling stops");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Gamepad-side handle of the joystick collaborator
pub struct Joystick {
    classifier: ZoneClassifier,
    report: JoystickFormat,
    interval: Duration,
    snapshot: SharedSnapshot,
    adc: Option<Box<dyn JoystickAdc>>,
}

impl Joystick {
    pub fn new(
        adc: Box<dyn JoystickAdc>,
        classifier: ZoneClassifier,
        report: JoystickFormat,
        interval: Duration,
    ) -> Self {
        Self {
            classifier,
            report,
            interval,
            snapshot: Arc::new(RwLock::new(JoystickSnapshot::default())),
            adc: Some(adc),
        }
    }

    /// Spawns the polling task; the ADC moves into it
    pub fn start_polling(
        &mut self,
        events: mpsc::Sender<InputEvent>,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, ControllerError> {
        let adc = self.adc.take().ok_or_else(|| {
            error!("Joystick polling requested twice");
            ControllerError::AlreadyStarted("joystick polling".into())
        })?;

        let poller = JoystickPoller::create(
            adc,
            self.classifier,
            self.report,
            self.interval,
            self.snapshot.clone(),
            events,
        )
        .start();
        Ok(tokio::spawn(poller.run(cancel)))
    }

    pub fn is_polling(&self) -> bool {
        self.adc.is_none()
    }

    pub fn current_state(&self) -> JoystickSample {
        self.snapshot().state
    }

    pub fn raw_count(&self) -> RawReading {
        self.snapshot().raw
    }

    pub fn snapshot(&self) -> JoystickSnapshot {
        *self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn x_reversed(&self) -> bool {
        self.classifier.reverse_x
    }

    pub fn y_reversed(&self) -> bool {
        self.classifier.reverse_y
    }

    pub fn classifier(&self) -> ZoneClassifier {
        self.classifier
    }

    pub fn classify(&self, raw: RawReading) -> JoystickSample {
        self.classifier.classify(raw)
    }
}

impl std::fmt::Debug for Joystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joystick")
            .field("classifier", &self.classifier)
            .field("report", &self.report)
            .field("interval", &self.interval)
            .field("polling", &self.is_polling())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockAdc;
    use crate::input::{XZone, YZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn joystick(report: JoystickFormat) -> (Joystick, crate::hal::mock::StickHandle) {
        let (adc, stick) = MockAdc::new();
        let joystick = Joystick::new(
            Box::new(adc),
            ZoneClassifier::default(),
            report,
            Duration::from_millis(1000),
        );
        (joystick, stick)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_reports_classified() {
        let (mut joystick, stick) = joystick(JoystickFormat::Classified);
        stick.set(RawReading::new(u16::MAX, RawReading::MID_SCALE));
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = joystick.start_polling(tx, cancel.clone()).unwrap();

        // First tick fires immediately
        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            InputEvent::Joystick(JoystickValue::Classified(JoystickSample::new(
                XZone::RightMax,
                YZone::Centered
            )))
        );

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(stick.reads(), 3);
        assert_eq!(joystick.current_state().x, XZone::RightMax);
        assert_eq!(joystick.raw_count().x, u16::MAX);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_raw_when_configured() {
        let (mut joystick, stick) = joystick(JoystickFormat::Raw);
        let raw = RawReading::new(100, 200);
        stick.set(raw);
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = joystick.start_polling(tx, cancel.clone()).unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            InputEvent::Joystick(JoystickValue::Raw(raw))
        );

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_keeps_polling() {
        let (mut joystick, stick) = joystick(JoystickFormat::Classified);
        stick.disconnect(true);
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let task = joystick.start_polling(tx, cancel.clone()).unwrap();

        time::sleep(Duration::from_millis(1500)).await;
        assert!(rx.try_recv().is_err());

        stick.disconnect(false);
        time::sleep(Duration::from_millis(1000)).await;
        assert!(rx.try_recv().is_ok());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_router_is_gone() {
        let (mut joystick, _stick) = joystick(JoystickFormat::Classified);
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let task = joystick
            .start_polling(tx, CancellationToken::new())
            .unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let (mut joystick, _stick) = joystick(JoystickFormat::Classified);
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = joystick.start_polling(tx.clone(), cancel.clone()).unwrap();
        assert!(matches!(
            joystick.start_polling(tx, cancel.clone()),
            Err(ControllerError::AlreadyStarted(_))
        ));
        cancel.cancel();
        task.await.unwrap();
    }

    /// Blocks inside `read` until the test opens the gate
    struct GatedAdc {
        entered: mpsc::UnboundedSender<()>,
        gate: std::sync::mpsc::Receiver<()>,
        blocked: Arc<AtomicBool>,
    }

    impl JoystickAdc for GatedAdc {
        fn read(&mut self) -> Result<RawReading, HalError> {
            self.blocked.store(true, Ordering::SeqCst);
            let _ = self.entered.send(());
            let opened = self.gate.recv_timeout(Duration::from_secs(2)).is_ok();
            self.blocked.store(false, Ordering::SeqCst);
            if opened {
                Ok(RawReading::centered())
            } else {
                Err(HalError::Disconnected("gate never opened".into()))
            }
        }
    }

    #[tokio::test]
    async fn test_slow_read_does_not_stall_runtime() {
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let (gate_tx, gate_rx) = std::sync::mpsc::channel();
        let blocked = Arc::new(AtomicBool::new(false));
        let adc = GatedAdc {
            entered: entered_tx,
            gate: gate_rx,
            blocked: blocked.clone(),
        };
        let mut joystick = Joystick::new(
            Box::new(adc),
            ZoneClassifier::default(),
            JoystickFormat::Raw,
            Duration::from_secs(60),
        );
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = joystick.start_polling(tx, cancel.clone()).unwrap();

        // This single-threaded runtime only gets here while the read is
        // still parked if the read runs off the async worker
        entered_rx.recv().await.unwrap();
        assert!(blocked.load(Ordering::SeqCst));

        gate_tx.send(()).unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            InputEvent::Joystick(JoystickValue::Raw(RawReading::centered()))
        );

        cancel.cancel();
        task.await.unwrap();
    }

    #[test]
    fn test_reversal_flags_are_read_through() {
        let (adc, _) = MockAdc::new();
        let joystick = Joystick::new(
            Box::new(adc),
            ZoneClassifier::new(0x2000, true, false),
            JoystickFormat::Classified,
            Duration::from_secs(1),
        );
        assert!(joystick.x_reversed());
        assert!(!joystick.y_reversed());
    }
}
