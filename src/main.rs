use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tui_globe::app::App;
use tui_globe::demo::{demo_theme, DemoVectorSource, ProceduralTileStore};
use tui_globe::map::{Projection, TileProjection, VectorOverlay, ViewParams};
use tui_globe::raster::Canvas;
use tui_globe::scene::MapTheme;
use tui_globe::tile::TileLayout;
use tui_globe::{ui, MapModel};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Map theme (TOML); the procedural planet is shown when absent
    #[arg(short, long)]
    theme: Option<PathBuf>,

    /// Initial projection: spherical, equirectangular or mercator
    #[arg(short, long, default_value = "spherical")]
    projection: Projection,

    /// Render one frame to a PNG file instead of opening the viewer
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Snapshot width in pixels
    #[arg(long, default_value_t = 800)]
    width: usize,

    /// Snapshot height in pixels
    #[arg(long, default_value_t = 600)]
    height: usize,

    /// Write logs to this file while the viewer is open
    #[arg(long)]
    log: Option<PathBuf>,

    /// Vector tile worker threads, overriding the theme
    #[arg(long)]
    threads: Option<usize>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Logs go to stderr for snapshots. The viewer owns the terminal, so it
/// only logs when given a file.
fn init_logging(args: &Args) -> Result<()> {
    if args.snapshot.is_some() {
        tracing_subscriber::fmt::fmt().with_env_filter(env_filter()).with_writer(std::io::stderr).init();
    } else if let Some(path) = &args.log {
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        tracing_subscriber::fmt::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn build_model(args: &Args) -> Result<MapModel> {
    let Some(path) = &args.theme else {
        return demo_model(args.threads.unwrap_or(4));
    };

    let mut theme = MapTheme::load(path).with_context(|| format!("loading theme {}", path.display()))?;
    if let (Some(vector), Some(threads)) = (&mut theme.vector, args.threads) {
        vector.worker_threads = threads.max(1);
    }
    Ok(MapModel::new(theme)?)
}

fn demo_model(threads: usize) -> Result<MapModel> {
    let mut model = MapModel::empty(demo_theme());
    let store = ProceduralTileStore::new(TileLayout::new(64, 64, 2, 1), 5);
    model.set_texture_layer(Arc::new(store), TileProjection::Equirectangular, None);
    model.set_vector_layer(Arc::new(DemoVectorSource), TileLayout::slippy(), threads.max(1), Some(8))?;
    Ok(model)
}

fn snapshot(mut model: MapModel, projection: Projection, width: usize, height: usize, path: &Path) -> Result<()> {
    let view = ViewParams::world(projection, width, height);
    let mut canvas = Canvas::new(width, height);
    model.paint_globe(&view, &mut canvas);

    let submitted = model.update_vector_tiles(&view);
    if let Some(vector) = model.vector_model() {
        if !vector.wait_idle(Duration::from_secs(30)) {
            warn!(pending = vector.pending(), "vector tiles still loading, writing partial snapshot");
        }
    }

    let mut overlay = VectorOverlay::new();
    for event in model.drain_vector_tiles() {
        overlay.insert(event);
    }
    overlay.render(&mut canvas, &view);

    canvas
        .to_image()
        .save(path)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    info!(
        path = %path.display(),
        level = ?model.tile_zoom_level(),
        submitted,
        vector_tiles = overlay.tile_count(),
        "snapshot written"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let model = build_model(&args)?;

    if let Some(path) = &args.snapshot {
        return snapshot(model, args.projection, args.width, args.height, path);
    }

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, model, args.projection);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, model: MapModel, projection: Projection) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(model, projection, size.width as usize, size.height as usize);

    loop {
        app.update();
        if app.needs_redraw() {
            app.redraw();
        }
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                    KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -10),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 10),

                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                    KeyCode::Char('p') | KeyCode::Char('P') => app.cycle_projection(),
                    KeyCode::Char('i') | KeyCode::Char('I') => app.toggle_interlace(),
                    KeyCode::Char('s') | KeyCode::Char('S') => app.toggle_smooth(),
                    KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_vector(),
                    KeyCode::Char('L') => app.toggle_labels(),

                    KeyCode::Char('r') | KeyCode::Char('0') => app.reset(),
                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
