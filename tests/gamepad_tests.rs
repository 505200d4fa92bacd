use handheld_gamepad::config::GamepadConfig;
use handheld_gamepad::cursor::CursorPosition;
use handheld_gamepad::hal::mock::{DisplayOp, MockBoard};
use handheld_gamepad::hal::GrayFrame;
use handheld_gamepad::input::{
    ButtonId, JoystickFormat, JoystickSample, JoystickValue, RawReading, XZone, YZone,
};
use handheld_gamepad::mode::Mode;
use handheld_gamepad::router::{CallbackRegistry, DiagnosticSink};
use handheld_gamepad::{Gamepad, GamepadError, InitOptions};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;

const MID: u16 = RawReading::MID_SCALE;
/// Just past the default deadzone, lands in the min band
const NUDGE: u16 = 0x2100;

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<(ButtonId, bool)>>,
}

impl DiagnosticSink for RecordingSink {
    fn button(&self, button: ButtonId, pressed: bool) {
        self.records.lock().unwrap().push((button, pressed));
    }
}

fn menu_config() -> GamepadConfig {
    let mut config = GamepadConfig::default();
    config.mode.initial = Mode::InternalMenu;
    config
}

#[tokio::test(start_paused = true)]
async fn test_menu_mode_max_right_moves_six_pixels() {
    let config = menu_config();
    let (hardware, board) = MockBoard::new(&config);
    board.stick.set(RawReading::new(u16::MAX, MID));

    let gamepad = Gamepad::initialize(config, hardware, CallbackRegistry::new()).unwrap();
    assert_eq!(gamepad.cursor(), CursorPosition::new(64, 64));

    let mut cursor = gamepad.subscribe_cursor();
    cursor.changed().await.unwrap();
    assert_eq!(*cursor.borrow(), CursorPosition::new(70, 64));
    assert_eq!(
        gamepad.current_joystick_state(),
        JoystickSample::new(XZone::RightMax, YZone::Centered)
    );

    // Next poll one interval later
    cursor.changed().await.unwrap();
    assert_eq!(*cursor.borrow(), CursorPosition::new(76, 64));

    gamepad.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_menu_mode_down_min_moves_one_row() {
    let config = menu_config();
    let (hardware, board) = MockBoard::new(&config);
    board.stick.set(RawReading::new(MID, MID + NUDGE));

    let gamepad = Gamepad::initialize(config, hardware, CallbackRegistry::new()).unwrap();
    let mut cursor = gamepad.subscribe_cursor();
    cursor.changed().await.unwrap();
    assert_eq!(*cursor.borrow(), CursorPosition::new(64, 65));

    gamepad.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_menu_mode_clamps_at_left_edge() {
    let mut config = menu_config();
    config.cursor.start_x = Some(0);
    config.cursor.start_y = Some(10);
    let (hardware, board) = MockBoard::new(&config);
    board.stick.set(RawReading::new(MID - NUDGE, MID));

    let gamepad = Gamepad::initialize(config, hardware, CallbackRegistry::new()).unwrap();
    time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(board.stick.reads(), 3);
    assert_eq!(
        gamepad.current_joystick_state(),
        JoystickSample::new(XZone::LeftMin, YZone::Centered)
    );
    assert_eq!(gamepad.cursor(), CursorPosition::new(0, 10));

    gamepad.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_external_run_forwards_button_and_keeps_cursor() {
    let config = GamepadConfig::default();
    let pin_a = config.buttons.a.unwrap();
    let (hardware, board) = MockBoard::new(&config);
    board.stick.set(RawReading::new(u16::MAX, u16::MAX));

    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let callbacks = CallbackRegistry::new().with_button(ButtonId::A, move |pin, pressed, held| {
        sink.lock().unwrap().push((pin, pressed, held));
        Ok(())
    });

    let gamepad = Gamepad::initialize(config, hardware, callbacks).unwrap();
    assert_eq!(gamepad.mode(), Mode::ExternalRun);

    time::sleep(Duration::from_millis(20)).await;
    board.press(ButtonId::A, true);
    time::sleep(Duration::from_millis(120)).await;
    board.press(ButtonId::A, false);
    time::sleep(Duration::from_millis(100)).await;

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], (pin_a, true, Duration::ZERO));
    let (pin, pressed, held) = calls[1];
    assert_eq!((pin, pressed), (pin_a, false));
    assert!(
        held >= Duration::from_millis(115) && held <= Duration::from_millis(125),
        "held = {:?}",
        held
    );

    // No joystick handler either: samples are dropped, the cursor stays put
    assert_eq!(gamepad.cursor(), CursorPosition::new(64, 64));
    gamepad.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_classified_sample_forwarded_as_is_when_raw_requested() {
    let config = GamepadConfig::default();
    assert_eq!(config.joystick.report, JoystickFormat::Classified);
    let (hardware, board) = MockBoard::new(&config);
    board.stick.set(RawReading::new(MID, 0));

    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let callbacks = CallbackRegistry::new().with_joystick(JoystickFormat::Raw, move |format, value| {
        sink.lock().unwrap().push((format, value));
        Ok(())
    });

    let gamepad = Gamepad::initialize(config, hardware, callbacks).unwrap();
    time::sleep(Duration::from_millis(10)).await;

    let calls = log.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![(
            JoystickFormat::Raw,
            JoystickValue::Classified(JoystickSample::new(XZone::Centered, YZone::UpMax))
        )]
    );
    assert_eq!(gamepad.cursor(), CursorPosition::new(64, 64));
    gamepad.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_raw_report_converted_when_classified_requested() {
    let mut config = GamepadConfig::default();
    config.joystick.report = JoystickFormat::Raw;
    let (hardware, board) = MockBoard::new(&config);
    board.stick.set(RawReading::new(0, MID));

    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let callbacks =
        CallbackRegistry::new().with_joystick(JoystickFormat::Classified, move |_, value| {
            sink.lock().unwrap().push(value);
            Ok(())
        });

    let gamepad = Gamepad::initialize(config, hardware, callbacks).unwrap();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(
        log.lock().unwrap().clone(),
        vec![JoystickValue::Classified(JoystickSample::new(
            XZone::LeftMax,
            YZone::Centered
        ))]
    );
    gamepad.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_menu_mode_buttons_go_to_diagnostics() {
    let config = menu_config();
    let (hardware, board) = MockBoard::new(&config);

    let forwarded = Arc::new(Mutex::new(0usize));
    let counter = forwarded.clone();
    let callbacks = CallbackRegistry::new().with_button(ButtonId::B, move |_, _, _| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    let sink = Arc::new(RecordingSink::default());
    let options = InitOptions {
        splash: None,
        diagnostics: Some(sink.clone()),
    };

    let gamepad = Gamepad::initialize_with(config, hardware, callbacks, options).unwrap();
    time::sleep(Duration::from_millis(20)).await;
    board.press(ButtonId::B, true);
    time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*forwarded.lock().unwrap(), 0);
    assert_eq!(*sink.records.lock().unwrap(), vec![(ButtonId::B, true)]);

    // Switching modes takes effect for the next event
    gamepad.set_mode(Mode::ExternalRun);
    board.press(ButtonId::B, false);
    time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*forwarded.lock().unwrap(), 1);
    assert_eq!(sink.records.lock().unwrap().len(), 1);

    gamepad.shutdown().await;
}

#[tokio::test]
async fn test_render_buffer_clears_composes_and_presents() {
    let config = GamepadConfig::default();
    let (hardware, board) = MockBoard::new(&config);
    let mut gamepad = Gamepad::initialize(config, hardware, CallbackRegistry::new()).unwrap();

    let mut frame = GrayFrame::new(128, 128);
    frame.set_pixel(3, 4, 9);
    gamepad.render_buffer(&frame).unwrap();

    let ops = board.panel.ops();
    assert_eq!(
        ops[3..],
        [
            DisplayOp::Fill(0),
            DisplayOp::Blit {
                x: 0,
                y: 0,
                key: Some(0)
            },
            DisplayOp::Show
        ]
    );
    let shown = board.panel.last_presented().unwrap();
    assert_eq!(shown.pixel(3, 4), Some(9));
    assert_eq!(shown.pixel(0, 0), Some(0));

    gamepad.shutdown().await;
}

#[tokio::test]
async fn test_render_failure_is_hardware_error() {
    let config = GamepadConfig::default();
    let (hardware, board) = MockBoard::new(&config);
    let mut gamepad = Gamepad::initialize(config, hardware, CallbackRegistry::new()).unwrap();

    board.panel.fail_show(true);
    let result = gamepad.render_buffer(&GrayFrame::new(128, 128));
    assert!(matches!(result, Err(GamepadError::Hardware(_))));

    gamepad.shutdown().await;
}

#[tokio::test]
async fn test_splash_failure_aborts_initialization() {
    let config = GamepadConfig::default();
    let (hardware, board) = MockBoard::new(&config);
    board.panel.fail_show(true);

    let result = Gamepad::initialize(config, hardware, CallbackRegistry::new());
    assert!(matches!(result, Err(GamepadError::Hardware(_))));
}

#[tokio::test]
async fn test_invalid_configuration_rejected_before_hardware_use() {
    let mut config = GamepadConfig::default();
    config.velocity.x.remove("right-max");
    let (hardware, board) = MockBoard::new(&GamepadConfig::default());

    let result = Gamepad::initialize(config, hardware, CallbackRegistry::new());
    assert!(matches!(result, Err(GamepadError::Configuration(_))));
    assert!(board.panel.ops().is_empty());
}

#[tokio::test]
async fn test_reversal_is_read_through() {
    let mut config = GamepadConfig::default();
    config.joystick.reverse_y = true;
    let (hardware, _board) = MockBoard::new(&config);

    let gamepad = Gamepad::initialize(config, hardware, CallbackRegistry::new()).unwrap();
    assert_eq!(gamepad.joystick_axis_reversal(), (false, true));
    gamepad.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_delivery() {
    let config = GamepadConfig::default();
    let (hardware, board) = MockBoard::new(&config);

    let log = Arc::new(Mutex::new(0usize));
    let counter = log.clone();
    let callbacks = CallbackRegistry::new().with_button(ButtonId::A, move |_, _, _| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    let gamepad = Gamepad::initialize(config, hardware, callbacks).unwrap();
    gamepad.shutdown().await;

    board.press(ButtonId::A, true);
    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*log.lock().unwrap(), 0);
}
