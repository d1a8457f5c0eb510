use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use dda_raycaster::config::internal_resolution;
use dda_raycaster::error::Error;
use dda_raycaster::gpu::{GpuDevice, GpuRenderer, GpuSurface};
use dda_raycaster::present::SoftPresenter;
use dda_raycaster::render::{self, Renderer};
use dda_raycaster::{CameraState, ColumnKernel, MaterialPalette, RenderConfig, Scene, Strategy, WorldGrid};

#[derive(Parser)]
#[command(name = "dda-raycaster", about = "Grid DDA raycaster")]
struct Cli {
    /// Execution strategy
    #[arg(long, value_enum, default_value_t = Strategy::Scalar)]
    strategy: Strategy,

    /// Per-batch kernel for the parallel strategy
    #[arg(long, value_enum, default_value_t = ColumnKernel::Scalar)]
    kernel: ColumnKernel,

    /// Worker threads for the parallel strategy (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Columns per parallel task
    #[arg(long, default_value_t = 32)]
    batch_columns: usize,

    /// Internal frame height; the width follows the window aspect
    #[arg(long, default_value_t = 480)]
    height: usize,

    /// Horizontal field of view in degrees
    #[arg(long, default_value_t = 66.0)]
    fov: f32,

    /// Text map, one digit per cell
    #[arg(long)]
    map: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

enum Backend {
    Cpu {
        renderer: Box<dyn Renderer>,
        presenter: SoftPresenter,
    },
    Device {
        // Dropped before the renderer, which owns the device.
        surface: GpuSurface,
        renderer: GpuRenderer,
        window: Arc<Window>,
    },
}

impl Backend {
    fn window(&self) -> &Window {
        match self {
            Backend::Cpu { presenter, .. } => presenter.window(),
            Backend::Device { window, .. } => window.as_ref(),
        }
    }
}

struct App {
    config: RenderConfig,
    target_height: usize,
    scene: Scene,
    backend: Option<Backend>,
    failure: Option<anyhow::Error>,

    frame_counter: u32,
    last_fps_log: Instant,

    keys_down: HashSet<KeyCode>,
    last_tick: Instant,
    move_speed: f32,
    turn_speed: f32,
}

impl App {
    fn new(config: RenderConfig, scene: Scene) -> Self {
        Self {
            target_height: config.height,
            config,
            scene,
            backend: None,
            failure: None,
            frame_counter: 0,
            last_fps_log: Instant::now(),
            keys_down: HashSet::new(),
            last_tick: Instant::now(),
            move_speed: 5.0,
            turn_speed: 3.0,
        }
    }

    fn create_backend(&mut self, event_loop: &ActiveEventLoop) -> Result<Backend> {
        let attributes = Window::default_attributes()
            .with_title(format!("DDA raycaster ({})", self.config.strategy))
            .with_inner_size(LogicalSize::new(800.0, 600.0));
        let window = event_loop.create_window(attributes).context("create window")?;

        let size = window.inner_size();
        let (width, height) = internal_resolution(size.width as usize, size.height as usize, self.target_height);
        self.config.width = width;
        self.config.height = height;

        match self.config.strategy {
            Strategy::Device => {
                let window = Arc::new(window);
                let (gpu, surface) = GpuDevice::for_window(window.clone())?;
                let surface = GpuSurface::new(&gpu, surface, size.width, size.height)?;
                let renderer = GpuRenderer::new(gpu, &self.config, &self.scene, surface.format())?;
                Ok(Backend::Device {
                    surface,
                    renderer,
                    window,
                })
            }
            _ => {
                let renderer = render::build_cpu(&self.config)?;
                let presenter = SoftPresenter::new(Rc::new(window))?;
                Ok(Backend::Cpu { renderer, presenter })
            }
        }
    }

    fn draw(&mut self) -> Result<(), Error> {
        let Some(backend) = &mut self.backend else {
            return Ok(());
        };
        match backend {
            Backend::Cpu { renderer, presenter } => {
                let frame = renderer.render_frame(&self.scene)?;
                presenter.present(frame)?;
            }
            Backend::Device { surface, renderer, .. } => surface.present(renderer, &self.scene)?,
        }
        Ok(())
    }

    fn resize(&mut self, window_w: u32, window_h: u32) {
        if window_w == 0 || window_h == 0 {
            return;
        }
        let (width, height) = internal_resolution(window_w as usize, window_h as usize, self.target_height);
        self.config.width = width;
        self.config.height = height;
        match &mut self.backend {
            Some(Backend::Cpu { renderer, .. }) => renderer.resize(width, height),
            Some(Backend::Device { surface, renderer, .. }) => {
                surface.resize(renderer.gpu(), window_w, window_h);
                renderer.resize(width, height);
            }
            None => return,
        }
        tracing::debug!(width, height, window_w, window_h, "internal frame resized");
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }

    fn log_fps(&mut self) {
        self.frame_counter += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_fps_log).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_counter as f32 / elapsed;
            tracing::info!(strategy = %self.config.strategy, fps = format_args!("{fps:.1}"), "frame rate");
            self.frame_counter = 0;
            self.last_fps_log = now;
        }
    }

    fn tick(&mut self) {
        let now = Instant::now();
        // Cap dt so a stalled frame doesn't teleport the player.
        let dt = now.duration_since(self.last_tick).min(Duration::from_millis(100));
        self.last_tick = now;
        let dt_s = dt.as_secs_f32();

        let axis = |pos: KeyCode, neg: KeyCode| {
            self.keys_down.contains(&pos) as i32 as f32 - self.keys_down.contains(&neg) as i32 as f32
        };
        let fwd = axis(KeyCode::KeyW, KeyCode::KeyS);
        let strafe = axis(KeyCode::KeyD, KeyCode::KeyA);
        let turn = axis(KeyCode::KeyE, KeyCode::KeyQ);

        if turn != 0.0 {
            self.scene.rotate_camera(turn * self.turn_speed * dt_s);
        }

        let camera = self.scene.camera();
        let wish = camera.forward.normalize_or_zero() * fwd + camera.right.normalize_or_zero() * strafe;
        if wish != Vec2::ZERO {
            self.scene.try_move(wish.normalize() * self.move_speed * dt_s);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.backend.is_some() {
            return;
        }
        match self.create_backend(event_loop) {
            Ok(backend) => {
                backend.window().request_redraw();
                self.backend = Some(backend);
                self.last_tick = Instant::now();
            }
            Err(err) => self.fail(event_loop, err.context("renderer setup failed")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("close requested; stopping");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed if code == KeyCode::Escape => event_loop.exit(),
                ElementState::Pressed => {
                    self.keys_down.insert(code);
                }
                ElementState::Released => {
                    self.keys_down.remove(&code);
                }
            },

            WindowEvent::Resized(size) => self.resize(size.width, size.height),

            WindowEvent::RedrawRequested => {
                if !self.backend.as_ref().is_some_and(|b| b.window().id() == id) {
                    return;
                }
                self.tick();
                if let Err(err) = self.draw() {
                    self.fail(event_loop, anyhow::Error::new(err).context("frame failed"));
                    return;
                }
                self.log_fps();
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(backend) = &self.backend {
            backend.window().request_redraw();
        }
    }
}

fn load_scene(map: Option<&PathBuf>, fov: f32) -> Result<Scene, Error> {
    let Some(path) = map else {
        return Ok(Scene::demo(fov)?);
    };
    let text = std::fs::read_to_string(path).map_err(|source| Error::MapFile {
        path: path.display().to_string(),
        source,
    })?;
    let grid = WorldGrid::parse(&text)?;
    // Center of the first open cell, looking along +X.
    let spawn = (0..grid.height())
        .flat_map(|y| (0..grid.width()).map(move |x| (x, y)))
        .find(|&(x, y)| grid.get(x, y) == Some(0))
        .map(|(x, y)| Vec2::new(x as f32 + 0.5, y as f32 + 0.5))
        .unwrap_or(Vec2::splat(0.5));
    let camera = CameraState::from_yaw(spawn, 0.0, fov);
    Ok(Scene::new(grid, MaterialPalette::default(), camera)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = RenderConfig {
        strategy: cli.strategy,
        kernel: cli.kernel,
        height: cli.height,
        threads: cli.threads,
        batch_columns: cli.batch_columns,
        fov_degrees: cli.fov,
        ..RenderConfig::default()
    };
    config.validate().context("invalid configuration")?;
    let scene = load_scene(cli.map.as_ref(), cli.fov).context("failed to load scene")?;

    tracing::info!(strategy = %config.strategy, kernel = ?config.kernel, "dda-raycaster starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, scene);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
