mod box_demo;
mod camera;

use box_demo::BoxDemo;
use d3d_application::config::AppConfig;
use d3d_application::config::CommandLine;
use d3d_application::headless::CompletionMode;
use d3d_application::headless::HeadlessDevice;
use d3d_application::headless::HeadlessGpu;
use d3d_application::headless::HeadlessWindow;
use d3d_application::AppReport;
use d3d_application::AppResult;
use d3d_application::FrameLoop;
use d3d_application::GraphicsContext;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let command_line =
        CommandLine::parse(std::env::args().skip(1)).map_err(AppReport::into_inner)?;
    let mut config = match &command_line.config_path {
        Some(path) => AppConfig::load(path).map_err(AppReport::into_inner)?,
        None => AppConfig::default(),
    };
    config.apply(&command_line);

    let exit_code = run(&config, &command_line).map_err(AppReport::into_inner)?;
    info!(exit_code, "Exiting");
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

#[cfg(windows)]
fn run(config: &AppConfig, command_line: &CommandLine) -> AppResult<i32> {
    if command_line.headless {
        run_headless(config, command_line.frames)
    } else {
        run_windowed(config)
    }
}

#[cfg(not(windows))]
fn run(config: &AppConfig, command_line: &CommandLine) -> AppResult<i32> {
    if !command_line.headless {
        tracing::warn!("Direct3D 12 is only available on Windows, running headless");
    }
    run_headless(config, command_line.frames)
}

#[cfg(windows)]
fn run_windowed(config: &AppConfig) -> AppResult<i32> {
    use d3d_application::d3d12::D3d12Device;
    use d3d_application::events::Window;
    use d3d_application::win32::Win32Window;

    let graphics = &config.graphics;
    let device = D3d12Device::new(graphics)?;
    let title = if graphics.use_warp_device {
        format!("{} (WARP)", config.window.title)
    } else {
        config.window.title.clone()
    };

    let min_extent = config.window.min_extent();
    let window = Win32Window::new(&title, config.window.extent(), min_extent)?;
    let context = GraphicsContext::new(
        device,
        window.hwnd(),
        graphics,
        window.client_extent(),
        min_extent,
    )?;
    let demo = BoxDemo::new(&context, graphics.clear_color)?;
    let mut frame_loop = FrameLoop::new(
        window,
        context,
        demo,
        title,
        config.frame_loop.paused_sleep(),
    );
    frame_loop.run()
}

fn run_headless(config: &AppConfig, frames: u32) -> AppResult<i32> {
    let gpu = HeadlessGpu::new(CompletionMode::Deferred);
    let extent = config.window.extent();
    let context = GraphicsContext::new(
        HeadlessDevice::new(gpu.clone()),
        (),
        &config.graphics,
        extent,
        config.window.min_extent(),
    )?;
    let demo = BoxDemo::new(&context, config.graphics.clear_color)?;
    let mut frame_loop = FrameLoop::new(
        HeadlessWindow::idle_for(extent, frames),
        context,
        demo,
        config.window.title.clone(),
        config.frame_loop.paused_sleep(),
    );
    let exit_code = frame_loop.run()?;

    let stats = gpu.stats();
    info!(
        frames = frame_loop.frames_rendered(),
        presents = stats.presents,
        draws = stats.draws,
        blocking_waits = stats.blocking_waits,
        fence = gpu.completed_value(),
        "Headless run finished"
    );
    Ok(exit_code)
}
