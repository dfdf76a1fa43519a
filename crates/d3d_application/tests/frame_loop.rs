//! The frame loop driven by scripted window events.

mod common;

use std::time::Duration;

use common::context;
use common::deferred_gpu;
use common::RecordingApp;
use common::MIN;
use common::START;
use d3d_application::device::Extent;
use d3d_application::events::Key;
use d3d_application::events::MouseButtons;
use d3d_application::events::SizeKind;
use d3d_application::events::WindowEvent;
use d3d_application::headless::HeadlessDevice;
use d3d_application::headless::HeadlessGpu;
use d3d_application::headless::HeadlessWindow;
use d3d_application::headless::ScriptStep;
use d3d_application::FrameLoop;

type TestLoop = FrameLoop<HeadlessDevice, HeadlessWindow, RecordingApp>;

fn frame_loop(gpu: &HeadlessGpu, script: Vec<ScriptStep>) -> TestLoop {
    let window = HeadlessWindow::new(START, script);
    FrameLoop::new(
        window,
        context(gpu).unwrap(),
        RecordingApp::default(),
        "Test",
        Duration::ZERO,
    )
}

fn resized(width: u32, height: u32, kind: SizeKind) -> ScriptStep {
    ScriptStep::Event(WindowEvent::Resized {
        extent: Extent::new(width, height),
        kind,
    })
}

#[test]
fn each_idle_iteration_renders_a_frame() {
    let gpu = deferred_gpu();
    let mut frame_loop = frame_loop(&gpu, vec![ScriptStep::Idle(10)]);
    assert_eq!(frame_loop.run().unwrap(), 0);
    assert_eq!(frame_loop.frames_rendered(), 10);
    assert_eq!(frame_loop.app().updates, 10);
    assert_eq!(frame_loop.app().draws, 10);
    assert_eq!(gpu.stats().presents, 10);
    assert_eq!(frame_loop.app().resizes, vec![START]);
}

#[test]
fn drag_resize_rebuilds_once_when_released() {
    let gpu = deferred_gpu();
    let mut script = vec![ScriptStep::Idle(1), ScriptStep::Event(WindowEvent::EnterSizeMove)];
    script.extend((1..=20).map(|i| resized(800 + i * 10, 600 + i * 5, SizeKind::Restored)));
    script.push(ScriptStep::Event(WindowEvent::ExitSizeMove));
    script.push(ScriptStep::Idle(1));

    let mut frame_loop = frame_loop(&gpu, script);
    frame_loop.run().unwrap();
    assert_eq!(gpu.stats().buffer_resizes, 2);
    assert_eq!(
        frame_loop.app().resizes,
        vec![START, Extent::new(1000, 700)]
    );
    assert_eq!(frame_loop.context().extent(), Extent::new(1000, 700));
    assert_eq!(frame_loop.frames_rendered(), 2);
}

#[test]
fn minimize_pauses_and_restore_rebuilds_once() {
    let gpu = deferred_gpu();
    let script = vec![
        resized(0, 0, SizeKind::Minimized),
        ScriptStep::Idle(3),
        resized(800, 600, SizeKind::Restored),
        ScriptStep::Idle(1),
    ];
    let mut frame_loop = frame_loop(&gpu, script);
    frame_loop.run().unwrap();
    assert_eq!(gpu.stats().buffer_resizes, 2);
    assert_eq!(frame_loop.frames_rendered(), 1);
    assert!(!frame_loop.window_state().minimized());
}

#[test]
fn deactivated_window_renders_nothing() {
    let gpu = deferred_gpu();
    let script = vec![
        ScriptStep::Event(WindowEvent::Deactivated),
        ScriptStep::Idle(3),
        ScriptStep::Event(WindowEvent::Activated),
        ScriptStep::Idle(2),
    ];
    let mut frame_loop = frame_loop(&gpu, script);
    frame_loop.run().unwrap();
    assert_eq!(frame_loop.frames_rendered(), 2);
    assert!(!frame_loop.clock().is_stopped());
}

#[test]
fn tiny_programmatic_resize_is_clamped() {
    let gpu = deferred_gpu();
    let mut frame_loop = frame_loop(&gpu, vec![resized(1, 1, SizeKind::Restored)]);
    frame_loop.run().unwrap();
    assert_eq!(frame_loop.context().extent(), MIN);
    assert_eq!(frame_loop.app().resizes.last(), Some(&MIN));
}

#[test]
fn escape_quits_with_exit_code_zero() {
    let gpu = deferred_gpu();
    let script = vec![
        ScriptStep::Idle(2),
        ScriptStep::Event(WindowEvent::KeyUp(Key::Escape)),
        ScriptStep::Idle(100),
    ];
    let mut frame_loop = frame_loop(&gpu, script);
    assert_eq!(frame_loop.run().unwrap(), 0);
    assert_eq!(frame_loop.frames_rendered(), 2);
    assert!(frame_loop.app().keys.is_empty());
}

#[test]
fn quit_exit_code_is_returned() {
    let gpu = deferred_gpu();
    let script = vec![
        ScriptStep::Idle(1),
        ScriptStep::Event(WindowEvent::Quit { exit_code: 3 }),
    ];
    let mut frame_loop = frame_loop(&gpu, script);
    assert_eq!(frame_loop.run().unwrap(), 3);
    assert_eq!(frame_loop.frames_rendered(), 1);
}

#[test]
fn f2_toggles_multisampling() {
    let gpu = deferred_gpu();
    gpu.set_msaa_quality_levels(4);
    let script = vec![
        ScriptStep::Event(WindowEvent::KeyUp(Key::F2)),
        ScriptStep::Idle(1),
    ];
    let mut frame_loop = frame_loop(&gpu, script);
    frame_loop.run().unwrap();
    assert!(frame_loop.context().multisampling());
    assert_eq!(gpu.stats().swap_chains_created, 2);
    assert_eq!(frame_loop.app().resizes, vec![START, START]);
    assert_eq!(gpu.stats().state_mismatches, 0);
}

#[test]
fn input_reaches_the_application() {
    let gpu = deferred_gpu();
    let buttons = MouseButtons {
        left: true,
        ..Default::default()
    };
    let script = vec![
        ScriptStep::Event(WindowEvent::MouseDown { buttons, x: 10, y: 20 }),
        ScriptStep::Event(WindowEvent::MouseMove { buttons, x: 15, y: 25 }),
        ScriptStep::Event(WindowEvent::MouseUp {
            buttons: MouseButtons::default(),
            x: 15,
            y: 25,
        }),
        ScriptStep::Event(WindowEvent::KeyUp(Key::Other(0x41))),
    ];
    let mut frame_loop = frame_loop(&gpu, script);
    frame_loop.run().unwrap();
    let app = frame_loop.app();
    assert_eq!((app.mouse_downs, app.mouse_moves, app.mouse_ups), (1, 1, 1));
    assert_eq!(app.keys, vec![Key::Other(0x41)]);
    assert_eq!(frame_loop.frames_rendered(), 0);
}
