/// Demo driver
/// Builds a small voxel island, orbits a camera around it and prints frames to the terminal
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Print;
use crossterm::{cursor, execute, queue, terminal};
use glam::{IVec3, Vec3};
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use std::collections::HashMap;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use termcraft::*;

const SETTINGS_PATH: &str = "termcraft.toml";
/// Seconds per full day/night cycle.
const DAY_LENGTH: f32 = 120.0;
const ORBIT_RADIUS: f32 = 16.0;
const ORBIT_SPEED: f32 = 0.15;

/// Restores the terminal even when the render loop bails out with `?`.
struct TerminalGuard {
    cursor_visible: bool,
}

impl TerminalGuard {
    fn new(cursor_visible: bool) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, terminal::EnterAlternateScreen)?;
        if !cursor_visible {
            execute!(out, cursor::Hide)?;
        }
        Ok(Self { cursor_visible })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        if !self.cursor_visible {
            let _ = execute!(out, cursor::Show);
        }
        let _ = execute!(out, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // stderr shares the terminal with the frame, so only errors by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error"))
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();

    let settings = RenderSettings::load_or_default(SETTINGS_PATH);
    let sampler: Arc<dyn TextureSampler> = Arc::new(TextureAtlas::default());

    let scene = build_scene();
    let scene_mesh = mesh_scene(&scene);
    log::info!(
        "scene: {} blocks, {} triangles",
        scene.len(),
        scene_mesh.len()
    );

    let mut context = RenderContext::new(settings.clone(), sampler);
    let guard = TerminalGuard::new(settings.cursor_visible)?;
    let result = run(&mut context, &settings, &scene, &scene_mesh);
    drop(guard);

    #[cfg(feature = "profiling")]
    log::info!("\n{}", FUNCTION_COUNTERS.snapshot().report());

    result
}

fn run(
    context: &mut RenderContext,
    settings: &RenderSettings,
    scene: &HashMap<IVec3, BlockType>,
    scene_mesh: &Mesh,
) -> Result<(), Box<dyn Error>> {
    let mut out = io::stdout();
    let start = Instant::now();
    let frame_budget = settings.frame_duration();

    let mut selected = 0usize;
    let mut show_debug = settings.debug_info;
    let mut paused = false;
    let mut orbit_angle = 0.0f32;
    let mut last_frame = Instant::now();
    let mut fps = 0.0f32;

    loop {
        let frame_start = Instant::now();

        // --- INPUT ---
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('p') => paused = !paused,
                    KeyCode::Char('d') => show_debug = !show_debug,
                    KeyCode::Char(c @ '1'..='9') => {
                        let slot = c as usize - '1' as usize;
                        if slot < BlockType::PLACEABLE.len() {
                            selected = slot;
                        }
                    }
                    _ => {}
                }
            }
        }

        // --- FRAME SETUP ---
        let (columns, rows) = if settings.fixed_window_size {
            (settings.width, settings.height)
        } else {
            let (w, h) = terminal::size()?;
            (w as usize, h as usize)
        };

        let dt = last_frame.elapsed().as_secs_f32();
        last_frame = Instant::now();
        if dt > 0.0 {
            fps = fps * 0.9 + (1.0 / dt) * 0.1;
        }
        if !paused {
            orbit_angle += dt * ORBIT_SPEED;
        }

        let time = start.elapsed().as_secs_f32();
        let eye = Vec3::new(
            orbit_angle.cos() * ORBIT_RADIUS,
            9.0,
            orbit_angle.sin() * ORBIT_RADIUS,
        );
        let mut camera = Camera::for_frame(eye, columns, rows);
        camera.look_at(Vec3::new(0.0, 2.0, 0.0));

        let (sun_direction, sky_brightness) = day_cycle(time);

        let mut params = FrameParams::new(columns, rows);
        params.view = camera.view_matrix();
        params.projection = camera.projection_matrix();
        params.time = time;
        params.sun_direction = sun_direction;
        params.sky_brightness = sky_brightness;
        params.sky_color = settings.sky_color();
        params.selected_block = BlockType::PLACEABLE[selected];
        params.hud_status = paused.then(|| "paused".to_string());
        params.debug_text = show_debug.then(|| {
            format!("{:.0} fps\n{}", fps, context.stats().summary())
        });

        // --- RENDER ---
        {
            termcraft::perf_scope!("frame");
            let mut frame_mesh = scene_mesh.clone();
            frame_mesh.highlight_block(aimed_block(scene, camera.position, camera.forward()));
            let frame = context.render_ref(frame_mesh, &params);

            // Raw mode disables newline translation, so place every row explicitly
            for (y, line) in frame.split('\n').enumerate() {
                queue!(out, cursor::MoveTo(0, y as u16), Print(line))?;
            }
            out.flush()?;
        }

        // --- PACING ---
        let elapsed = frame_start.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        }
    }
}

/// Sun direction and sky brightness for `time` seconds into the day.
fn day_cycle(time: f32) -> (Vec3, f32) {
    // Start mid-morning
    let angle = (time / DAY_LENGTH + 0.15) * std::f32::consts::TAU;
    let sun = Vec3::new(angle.cos(), angle.sin(), 0.35).normalize();
    let brightness = (sun.y * 2.0 + 0.5).clamp(0.0, 1.0);
    (sun, brightness)
}

/// First block hit by a ray from `origin`, marched in small fixed steps.
fn aimed_block(blocks: &HashMap<IVec3, BlockType>, origin: Vec3, dir: Vec3) -> Option<IVec3> {
    const STEP: f32 = 0.05;
    const MAX_DISTANCE: f32 = 40.0;

    let steps = (MAX_DISTANCE / STEP) as usize;
    (0..steps)
        .map(|i| (origin + dir * (i as f32 * STEP)).floor().as_ivec3())
        .find(|cell| blocks.get(cell).is_some_and(|block| !block.is_air()))
}

/// A grass island with a pond, a tree and a glass block.
fn build_scene() -> HashMap<IVec3, BlockType> {
    let mut blocks = HashMap::new();
    const RADIUS: i32 = 7;

    for x in -RADIUS..=RADIUS {
        for z in -RADIUS..=RADIUS {
            if x * x + z * z > RADIUS * RADIUS {
                continue;
            }
            let edge = x * x + z * z > (RADIUS - 2) * (RADIUS - 2);
            let pond = (x - 3) * (x - 3) + (z + 2) * (z + 2) <= 3;

            blocks.insert(IVec3::new(x, -1, z), BlockType::Dirt);
            let surface = match (pond, edge) {
                (true, _) => BlockType::Water,
                (false, true) => BlockType::Sand,
                (false, false) => BlockType::Grass,
            };
            blocks.insert(IVec3::new(x, 0, z), surface);
        }
    }

    // Tree
    for y in 1..=4 {
        blocks.insert(IVec3::new(-2, y, 1), BlockType::Wood);
    }
    for x in -4..=0 {
        for z in -1..=3 {
            for y in 4..=6 {
                let corner = (x == -4 || x == 0) && (z == -1 || z == 3);
                if !corner && !(x == -2 && z == 1 && y < 6) {
                    blocks.insert(IVec3::new(x, y, z), BlockType::Leaves);
                }
            }
        }
    }

    blocks.insert(IVec3::new(2, 1, 3), BlockType::Glass);
    blocks.insert(IVec3::new(-4, 1, -3), BlockType::Stone);
    blocks.insert(IVec3::new(-4, 2, -3), BlockType::Stone);
    blocks
}

/// Mesh every face that borders air or a different transparent block.
fn mesh_scene(blocks: &HashMap<IVec3, BlockType>) -> Mesh {
    let mut mesh = Mesh::with_capacity(blocks.len() * 4);
    for (&coord, &block) in blocks {
        for side in Side::ALL {
            let visible = match blocks.get(&(coord + side.normal())) {
                None => true,
                Some(&neighbour) => neighbour.is_transparent() && neighbour != block,
            };
            if visible {
                mesh.push_block_face(coord, block, side);
            }
        }
    }
    mesh
}
