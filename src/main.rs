use std::process::ExitCode;

use anyhow::Result;
use kutory::{logging, Context};
use tracing::{error, info};
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder, WindowButtons},
};

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;
const WINDOW_TITLE: &str = "Vulkan";

fn main() -> ExitCode {
    if let Err(e) = logging::init() {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let event_loop = EventLoop::new()?;
    let window = init_window(&event_loop)?;
    let mut context = Some(Context::new(&window)?);

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            window_id: _,
        } => {
            elwt.exit();
        }
        Event::LoopExiting => {
            info!("window closed, shutting down");
            // tear the context down before the loop returns
            context.take();
        }
        _ => {}
    })?;

    Ok(())
}

fn init_window(event_loop: &EventLoop<()>) -> Result<Window> {
    let window = WindowBuilder::new()
        .with_inner_size(PhysicalSize::<u32>::from((WINDOW_WIDTH, WINDOW_HEIGHT)))
        .with_resizable(false)
        .with_enabled_buttons(WindowButtons::CLOSE)
        .with_active(true)
        .with_title(WINDOW_TITLE)
        .build(event_loop)?;
    Ok(window)
}
