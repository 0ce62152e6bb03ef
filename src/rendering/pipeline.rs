/// Render context: owns the frame buffers and shaders and runs
/// vertex stage -> rasterizer -> compositing -> post -> HUD -> encoder.
use crate::config::RenderSettings;
use crate::meshing::Mesh;
use crate::perf::FrameStats;
use crate::rendering::compositor::{composite, post_process, Lighting};
use crate::rendering::encoder;
use crate::rendering::framebuffer::{ColorBuffer, FragmentBuffer, Framebuffer, HudBuffer};
use crate::rendering::hud::{self, HudState};
use crate::rendering::rasterizer::Rasterizer;
use crate::rendering::shading::{
    ClipSpaceShader, FragmentShader, IdentityPost, PostShader, TexturedShader, VertexShader,
    VignettePost,
};
use crate::rendering::texture::TextureSampler;
use crate::rendering::vertex_stage::VertexStage;
use crate::voxel::BlockType;
use glam::{Mat4, Vec3};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-frame inputs supplied by the caller.
#[derive(Clone, Debug)]
pub struct FrameParams {
    pub width: usize,
    pub height: usize,
    pub view: Mat4,
    pub projection: Mat4,
    /// Seconds since start.
    pub time: f32,
    /// Points towards the sun.
    pub sun_direction: Vec3,
    /// 0 at night, 1 at noon.
    pub sky_brightness: f32,
    /// Daylight sky color; the background is this scaled by `sky_brightness`.
    pub sky_color: Vec3,
    pub selected_block: BlockType,
    pub hud_status: Option<String>,
    pub debug_text: Option<String>,
}

impl FrameParams {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            time: 0.0,
            sun_direction: Vec3::Y,
            sky_brightness: 1.0,
            sky_color: Vec3::from_array(RenderSettings::default().sky_color),
            selected_block: BlockType::Grass,
            hud_status: None,
            debug_text: None,
        }
    }

    #[inline]
    pub fn background(&self) -> Vec3 {
        self.sky_color * self.sky_brightness
    }
}

pub struct RenderContext {
    settings: RenderSettings,
    vertex_shader: Box<dyn VertexShader>,
    fragment_shader: Box<dyn FragmentShader>,
    post_shader: Box<dyn PostShader>,
    sampler: Arc<dyn TextureSampler>,
    rasterizer: Rasterizer,
    framebuffer: Framebuffer,
    // Triangle arena of the last frame; fragments index into it
    mesh: Mesh,
    output: String,
    stats: FrameStats,
}

impl RenderContext {
    /// Context with the default shaders: clip-space transform, textured
    /// lighting and, if enabled in `settings`, a vignette.
    pub fn new(settings: RenderSettings, sampler: Arc<dyn TextureSampler>) -> Self {
        let fragment_shader = TexturedShader::new(
            sampler.clone(),
            settings.sky_color(),
            settings.render_distance,
            settings.fog,
        );
        let post_shader: Box<dyn PostShader> = if settings.vignette {
            Box::new(VignettePost)
        } else {
            Box::new(IdentityPost)
        };

        Self {
            settings,
            vertex_shader: Box::new(ClipSpaceShader),
            fragment_shader: Box::new(fragment_shader),
            post_shader,
            sampler,
            rasterizer: Rasterizer::new(),
            framebuffer: Framebuffer::default(),
            mesh: Mesh::new(),
            output: String::new(),
            stats: FrameStats::default(),
        }
    }

    pub fn with_vertex_shader(mut self, shader: impl VertexShader + 'static) -> Self {
        self.vertex_shader = Box::new(shader);
        self
    }

    pub fn with_fragment_shader(mut self, shader: impl FragmentShader + 'static) -> Self {
        self.fragment_shader = Box::new(shader);
        self
    }

    pub fn with_post_shader(mut self, shader: impl PostShader + 'static) -> Self {
        self.post_shader = Box::new(shader);
        self
    }

    #[inline]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Run every stage except encoding. Buffers are resized when the frame
    /// dimensions change and cleared either way, so nothing from the
    /// previous frame survives.
    pub fn draw(&mut self, mesh: Mesh, params: &FrameParams) {
        let frame_start = Instant::now();
        let (width, height) = (params.width, params.height);
        let background = params.background();

        self.mesh = mesh;
        self.framebuffer.prepare(width, height, background);

        // --- 1. VERTEX STAGE ---
        let stage_start = Instant::now();
        let vertex_stats = VertexStage {
            shader: self.vertex_shader.as_ref(),
            view: params.view,
            projection: params.projection,
            time: params.time,
            show_both_faces: self.settings.show_both_faces,
            width,
            height,
        }
        .run(&mut self.mesh);
        let vertex_time = stage_start.elapsed();

        // --- 2. RASTERIZATION ---
        let stage_start = Instant::now();
        let fragments = self.rasterizer.rasterize(
            &self.mesh.triangles,
            &mut self.framebuffer.fragments,
            self.sampler.as_ref(),
        );
        let raster_time = stage_start.elapsed();

        // --- 3. SHADING, POST, HUD ---
        let stage_start = Instant::now();
        let lighting = Lighting {
            sun_direction: params.sun_direction,
            sky_brightness: params.sky_brightness,
            sky: background,
            time: params.time,
        };
        composite(
            &self.framebuffer.fragments,
            &mut self.framebuffer.color,
            &self.mesh.triangles,
            self.fragment_shader.as_ref(),
            &lighting,
        );
        post_process(
            &mut self.framebuffer.color,
            &mut self.framebuffer.scratch,
            self.post_shader.as_ref(),
            params.time,
        );

        hud::draw_hud(
            &mut self.framebuffer.hud,
            &HudState {
                selected_block: params.selected_block,
                status: params.hud_status.as_deref(),
                color_mode: self.settings.color_mode,
            },
        );
        if let Some(text) = params.debug_text.as_deref() {
            hud::layout_debug_text(&mut self.framebuffer.debug, text);
            hud::overlay_debug(
                &mut self.framebuffer.hud,
                &self.framebuffer.debug,
                self.settings.color_mode,
            );
        }
        let composite_time = stage_start.elapsed();

        self.stats = FrameStats {
            triangles: vertex_stats.triangles,
            active_triangles: vertex_stats.active_triangles,
            fragments,
            vertex_time,
            raster_time,
            composite_time,
            encode_time: Duration::ZERO,
            frame_time: frame_start.elapsed(),
        };
    }

    /// Draw and encode one frame.
    pub fn render(&mut self, mesh: Mesh, params: &FrameParams) -> String {
        self.render_ref(mesh, params).to_owned()
    }

    /// Like [`RenderContext::render`], returning a view into an output
    /// buffer that is reused between frames.
    pub fn render_ref(&mut self, mesh: Mesh, params: &FrameParams) -> &str {
        let frame_start = Instant::now();
        self.draw(mesh, params);

        let encode_start = Instant::now();
        encoder::encode_into(
            &mut self.output,
            &self.framebuffer.color,
            &self.framebuffer.hud,
            self.settings.color_mode,
        );
        self.stats.encode_time = encode_start.elapsed();
        self.stats.frame_time = frame_start.elapsed();

        let budget = self.settings.frame_duration();
        if self.stats.frame_time > budget {
            log::debug!(
                "frame took {:.2}ms (budget {:.2}ms)",
                self.stats.frame_time.as_secs_f64() * 1000.0,
                budget.as_secs_f64() * 1000.0
            );
        }
        log::debug!(
            "frame: {} triangles, {} active, {} fragments",
            self.stats.triangles,
            self.stats.active_triangles,
            self.stats.fragments
        );

        &self.output
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    #[inline]
    pub fn color_buffer(&self) -> &ColorBuffer {
        &self.framebuffer.color
    }

    #[inline]
    pub fn fragment_buffer(&self) -> &FragmentBuffer {
        &self.framebuffer.fragments
    }

    #[inline]
    pub fn hud_buffer(&self) -> &HudBuffer {
        &self.framebuffer.hud
    }

    /// Triangles that survived the last frame's vertex stage.
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
}
