// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

mod config;

pub use config::{Color, GaugeSpec, DEFAULT_PALETTE};

// External crate imports
use pixels::{Pixels, SurfaceTexture};
use rusttype::{point, Font, PositionedGlyph, Scale};
use thiserror::Error;

// Standard library imports
use std::f64::consts::PI;
use std::sync::mpsc::Receiver;
use std::time::Instant;

// Window management imports
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

// ============================================================================
// DIAL GEOMETRY CONSTANTS
// ============================================================================

/// Angle where the sweep begins, pointing toward the lower left.
const ARC_START: f64 = PI * 0.75;
/// Total angular span of the dial.
const ARC_LENGTH: f64 = PI * 1.5;
/// Width of the thin background ring behind the ticks.
const RING_WIDTH: f64 = 3.0;
/// Label distance past the gradient band; the top label sits further out
/// because centered text would otherwise brush the ring.
const LABEL_OFFSET: f64 = 23.0;
const LABEL_OFFSET_TOP: f64 = 30.0;

// ============================================================================
// PUBLIC API - ERRORS, STATE, COMMANDS
// ============================================================================

/// Errors surfaced before any painting happens. These are caller bugs, not
/// runtime faults; painting itself is total once inputs validate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GaugeError {
    #[error("invalid range: max_value ({max}) must be greater than min_value ({min})")]
    InvalidRange { min: f64, max: f64 },
    #[error("invalid gauge spec: {0}")]
    InvalidSpec(String),
}

/// Per-instance values shown on one dial.
#[derive(Debug, Clone, Copy)]
pub struct GaugeState {
    pub min_value: f64,
    pub max_value: f64,
    pub current_position: f64,
}

/// Command enum for driving a shown gauge from another thread
#[derive(Debug, Clone)]
pub enum GaugeCommand {
    SetPosition(f64),
    SetRange(f64, f64),
}

/// Main gauge struct - the primary public interface
#[derive(Debug, Clone)]
pub struct Gauge {
    spec: GaugeSpec,
    state: GaugeState,
}

impl Gauge {
    pub fn new(spec: GaugeSpec, min_value: f64, max_value: f64) -> Result<Self, GaugeError> {
        spec.validate()?;
        check_range(min_value, max_value)?;
        Ok(Self {
            spec,
            state: GaugeState {
                min_value,
                max_value,
                current_position: min_value,
            },
        })
    }

    pub fn spec(&self) -> &GaugeSpec {
        &self.spec
    }

    pub fn state(&self) -> &GaugeState {
        &self.state
    }

    pub fn set_position(&mut self, value: f64) {
        self.state.current_position = value.clamp(self.state.min_value, self.state.max_value);
    }

    pub fn set_range(&mut self, min_value: f64, max_value: f64) -> Result<(), GaugeError> {
        check_range(min_value, max_value)?;
        self.state.min_value = min_value;
        self.state.max_value = max_value;
        self.state.current_position = self.state.current_position.clamp(min_value, max_value);
        Ok(())
    }

    /// Paint the full dial into an RGBA8 framebuffer.
    pub fn render(&self, frame: &mut [u8], width: usize, height: usize) -> Result<(), GaugeError> {
        render_gauge(
            frame,
            width,
            height,
            &self.spec,
            self.state.min_value,
            self.state.max_value,
            self.state.current_position,
        )
    }

    /// Open a window and repaint the dial at the configured framerate.
    pub fn show(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(None)
    }

    /// Like [`Gauge::show`], additionally draining a command channel once
    /// per frame so another thread can move the gauge.
    pub fn show_with_commands(
        &mut self,
        receiver: Receiver<GaugeCommand>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(Some(receiver))
    }

    fn run_window(
        &self,
        receiver: Option<Receiver<GaugeCommand>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let spec = self.spec.clone();
        let mut state = self.state;
        let font = load_font(&spec)?;

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&spec.title)
            .with_inner_size(LogicalSize::new(
                spec.window_width as f64,
                spec.window_height as f64,
            ))
            .with_resizable(false)
            .build(&event_loop)?;
        let window = std::sync::Arc::new(window);
        let window_clone = window.clone();

        let size = window.inner_size();
        let mut fb_width = size.width as usize;
        let mut fb_height = size.height as usize;
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;

        let frame_duration = std::time::Duration::from_secs_f64(1.0 / spec.max_framerate);
        let mut last_frame = Instant::now();

        log::info!(
            "showing gauge \"{}\" ({}x{}, range [{}, {}])",
            spec.title,
            fb_width,
            fb_height,
            state.min_value,
            state.max_value
        );

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        fb_width = new_size.width as usize;
                        fb_height = new_size.height as usize;
                        let _ = pixels.resize_buffer(new_size.width, new_size.height);
                        let _ = pixels.resize_surface(new_size.width, new_size.height);
                    }
                    WindowEvent::RedrawRequested => {
                        if let Some(ref receiver) = receiver {
                            drain_commands(&mut state, receiver);
                        }
                        // Full three-layer repaint every frame; the layers
                        // depend on each other's radii, so there is no
                        // incremental patching.
                        let scene = build_scene(&spec, &state, fb_width, fb_height);
                        let mut canvas = Canvas::new(pixels.frame_mut(), fb_width, fb_height);
                        scene.render(&mut canvas, &font);
                        let _ = pixels.render();
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = Instant::now();
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }
}

fn check_range(min_value: f64, max_value: f64) -> Result<(), GaugeError> {
    if max_value <= min_value {
        return Err(GaugeError::InvalidRange {
            min: min_value,
            max: max_value,
        });
    }
    Ok(())
}

fn load_font(spec: &GaugeSpec) -> Result<Font<'static>, GaugeError> {
    Font::try_from_vec(spec.font_data.to_vec())
        .ok_or_else(|| GaugeError::InvalidSpec("font data could not be parsed".into()))
}

fn drain_commands(state: &mut GaugeState, receiver: &Receiver<GaugeCommand>) {
    while let Ok(command) = receiver.try_recv() {
        log::debug!("gauge command: {command:?}");
        match command {
            GaugeCommand::SetPosition(value) => {
                state.current_position = value.clamp(state.min_value, state.max_value);
            }
            GaugeCommand::SetRange(min, max) => {
                if max > min {
                    state.min_value = min;
                    state.max_value = max;
                    state.current_position = state.current_position.clamp(min, max);
                } else {
                    log::warn!("ignoring range update with max <= min: [{min}, {max}]");
                }
            }
        }
    }
}

/// Paint a complete dial into `frame`, an RGBA8 buffer of `width * height`
/// pixels. Layers run in a fixed order: gradient arc, then ticks, then
/// labels; each layer's radius builds on the one before it, so the order is
/// load-bearing.
pub fn render_gauge(
    frame: &mut [u8],
    width: usize,
    height: usize,
    spec: &GaugeSpec,
    min_value: f64,
    max_value: f64,
    current_position: f64,
) -> Result<(), GaugeError> {
    spec.validate()?;
    check_range(min_value, max_value)?;
    let font = load_font(spec)?;
    let state = GaugeState {
        min_value,
        max_value,
        current_position,
    };
    let scene = build_scene(spec, &state, width, height);
    let mut canvas = Canvas::new(frame, width, height);
    scene.render(&mut canvas, &font);
    Ok(())
}

// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
enum DrawCommand {
    Clear(Color),
    /// Arc band stroked with a linear gradient running along the chord
    /// between the segment's endpoints.
    GradientArc {
        cx: f64,
        cy: f64,
        r: f64,
        thickness: f64,
        start_angle: f64,
        end_angle: f64,
        from: Color,
        to: Color,
    },
    /// Solid arc band with rounded caps at both ends.
    Ring {
        cx: f64,
        cy: f64,
        r: f64,
        thickness: f64,
        start_angle: f64,
        end_angle: f64,
        color: Color,
    },
    Tick {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        thickness: f32,
        color: Color,
    },
    Label {
        x: f64,
        y: f64,
        text: String,
        align: TextAlign,
        font_size: f32,
        color: Color,
    },
}

struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    fn render(&self, canvas: &mut Canvas, font: &Font) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => {
                    canvas.clear(*color);
                }
                DrawCommand::GradientArc {
                    cx,
                    cy,
                    r,
                    thickness,
                    start_angle,
                    end_angle,
                    from,
                    to,
                } => {
                    raster_arc_band(
                        canvas,
                        *cx,
                        *cy,
                        *r,
                        *thickness,
                        *start_angle,
                        *end_angle,
                        *from,
                        *to,
                    );
                }
                DrawCommand::Ring {
                    cx,
                    cy,
                    r,
                    thickness,
                    start_angle,
                    end_angle,
                    color,
                } => {
                    raster_ring(
                        canvas,
                        *cx,
                        *cy,
                        *r,
                        *thickness,
                        *start_angle,
                        *end_angle,
                        *color,
                    );
                }
                DrawCommand::Tick {
                    x0,
                    y0,
                    x1,
                    y1,
                    thickness,
                    color,
                } => {
                    raster_line(canvas, *x0, *y0, *x1, *y1, *thickness, *color);
                }
                DrawCommand::Label {
                    x,
                    y,
                    text,
                    align,
                    font_size,
                    color,
                } => {
                    raster_text(
                        canvas,
                        *x,
                        *y,
                        text,
                        *align,
                        font,
                        Scale::uniform(*font_size),
                        *color,
                    );
                }
            }
        }
    }
}

// ============================================================================
// SCENE BUILDING - THE THREE PAINT LAYERS
// ============================================================================

/// Where the dial sits on the surface. The vertical center is pushed a
/// little below the midline so the open quarter of the sweep balances the
/// labels above it; the radius leaves room for ticks and labels outside
/// the band.
#[derive(Debug, Clone, Copy)]
struct Dial {
    cx: f64,
    cy: f64,
    radius: f64,
}

impl Dial {
    fn new(width: usize, height: usize) -> Self {
        Self {
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0 * 1.11,
            radius: width as f64 / 2.0 * 0.5,
        }
    }

    fn point_at(&self, angle: f64, radius: f64) -> (f64, f64) {
        (
            self.cx + angle.cos() * radius,
            self.cy + angle.sin() * radius,
        )
    }
}

/// Assemble the full dial. Callers must have validated the spec and range
/// already; building is a pure function of its arguments.
fn build_scene(spec: &GaugeSpec, state: &GaugeState, width: usize, height: usize) -> Scene {
    let mut scene = Scene::new();
    scene.add_command(DrawCommand::Clear(spec.background_color));

    let dial = Dial::new(width, height);
    paint_arc(&mut scene, &dial, &spec.palette, spec.gradient_thickness);
    paint_ticks(&mut scene, &dial, spec);
    paint_labels(&mut scene, &dial, spec, state);
    paint_pointer(&mut scene, &dial, state);
    scene
}

/// Gradient layer: `palette.len() - 1` adjacent segments starting at
/// `ARC_START`. The segment width divisor is coupled to the default
/// four-stop palette, which yields three quarter-turn segments covering the
/// 270-degree sweep; longer palettes still join end to end but narrow the
/// per-segment span.
fn paint_arc(scene: &mut Scene, dial: &Dial, palette: &[Color], thickness: f64) {
    let part_length = PI / (palette.len() as f64 - 2.0);
    let mut start = ARC_START;
    for i in 0..palette.len() - 1 {
        scene.add_command(DrawCommand::GradientArc {
            cx: dial.cx,
            cy: dial.cy,
            r: dial.radius,
            thickness,
            start_angle: start,
            end_angle: start + part_length,
            from: palette[i],
            to: palette[(i + 1) % palette.len()],
        });
        start += part_length;
    }
}

/// Tick layer: a thin ring just outside the gradient band, then a large
/// tick on every interval boundary and five small ticks per interval. Both
/// tiers include the final index on purpose, so ticks land on both ends of
/// the sweep.
fn paint_ticks(scene: &mut Scene, dial: &Dial, spec: &GaugeSpec) {
    let arc_radius = dial.radius + spec.gradient_thickness * 0.8;
    scene.add_command(DrawCommand::Ring {
        cx: dial.cx,
        cy: dial.cy,
        r: arc_radius,
        thickness: RING_WIDTH,
        start_angle: ARC_START,
        end_angle: ARC_START + ARC_LENGTH,
        color: spec.line_color,
    });

    let start_degree = spec.degree_unit * 135.0;
    let small_count = spec.line_count * 5;
    let large_increment = ARC_LENGTH / spec.line_count as f64;
    let small_increment = ARC_LENGTH / small_count as f64;

    for k in 0..=spec.line_count {
        let angle = start_degree + k as f64 * large_increment;
        let (x0, y0) = dial.point_at(angle, arc_radius);
        let (x1, y1) = dial.point_at(angle, arc_radius + spec.tick_size_large);
        scene.add_command(DrawCommand::Tick {
            x0,
            y0,
            x1,
            y1,
            thickness: spec.line_stroke_large,
            color: spec.line_color,
        });
    }
    for k in 0..=small_count {
        let angle = start_degree + k as f64 * small_increment;
        let (x0, y0) = dial.point_at(angle, arc_radius);
        let (x1, y1) = dial.point_at(angle, arc_radius + spec.tick_size_small);
        scene.add_command(DrawCommand::Tick {
            x0,
            y0,
            x1,
            y1,
            thickness: spec.line_stroke_small,
            color: spec.line_color,
        });
    }
}

/// Label layer: `line_count + 1` values computed directly from the index,
/// so repeated addition cannot drift past the boundary. Alignment pivots on
/// the dial midpoint to keep text clear of the band on both sides: labels
/// rising up the left half end at their anchor, the top label is centered
/// and pushed further out, labels descending the right half start at it.
fn paint_labels(scene: &mut Scene, dial: &Dial, spec: &GaugeSpec, state: &GaugeState) {
    let start_degree = spec.degree_unit * 135.0;
    let angle_increment = ARC_LENGTH / spec.line_count as f64;
    let value_increment = (state.max_value - state.min_value) / spec.line_count as f64;
    let midpoint = spec.line_count as f64 / 2.0;

    for i in 0..=spec.line_count {
        let (align, offset) = if (i as f64) < midpoint {
            (TextAlign::Right, LABEL_OFFSET)
        } else if i as f64 == midpoint {
            (TextAlign::Center, LABEL_OFFSET_TOP)
        } else {
            (TextAlign::Left, LABEL_OFFSET)
        };
        let angle = start_degree + i as f64 * angle_increment;
        let (x, y) = dial.point_at(angle, dial.radius + spec.gradient_thickness + offset);
        scene.add_command(DrawCommand::Label {
            x,
            y,
            text: format_label(state.min_value + i as f64 * value_increment),
            align,
            font_size: spec.label_font_size,
            color: spec.label_color,
        });
    }
}

/// Extension point for a value indicator. `current_position` travels with
/// the state and the command channel, but no pointer visual is drawn yet.
fn paint_pointer(_scene: &mut Scene, _dial: &Dial, _state: &GaugeState) {}

/// Whole values print without a decimal point, anything else in the
/// shortest float form.
fn format_label(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value}")
    }
}

// ============================================================================
// RASTER BACKEND
// ============================================================================

struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }
}

fn set_pixel(frame: &mut [u8], width: usize, x: usize, y: usize, color: Color, alpha: f32) {
    if x < width && y < frame.len() / (width * 4) {
        let idx = (y * width + x) * 4;
        let a = alpha.clamp(0.0, 1.0);
        let (r, g, b) = color.as_tuple();
        let src = [r as f32, g as f32, b as f32];
        let dst = [frame[idx] as f32, frame[idx + 1] as f32, frame[idx + 2] as f32];
        let out = [
            (src[0] * a + dst[0] * (1.0 - a)).round() as u8,
            (src[1] * a + dst[1] * (1.0 - a)).round() as u8,
            (src[2] * a + dst[2] * (1.0 - a)).round() as u8,
            0xff,
        ];
        frame[idx..idx + 4].copy_from_slice(&out);
    }
}

fn lerp_color(from: Color, to: Color, t: f64) -> Color {
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Color::new(
        mix(from.r, to.r),
        mix(from.g, to.g),
        mix(from.b, to.b),
    )
}

/// Stroke an arc band centered on radius `r`, blending from `from` to `to`
/// along the chord between the band's endpoints (the same coloring a linear
/// gradient between those two points would give). Angles are normalized
/// into one turn starting at `ARC_START`, so segment bounds must lie in
/// `[ARC_START, ARC_START + 2π)`.
fn raster_arc_band(
    canvas: &mut Canvas,
    cx: f64,
    cy: f64,
    r: f64,
    thickness: f64,
    start_angle: f64,
    end_angle: f64,
    from: Color,
    to: Color,
) {
    let inner = r - thickness / 2.0;
    let outer = r + thickness / 2.0;

    // Chord endpoints drive the gradient direction.
    let x_start = cx + start_angle.cos() * r;
    let y_start = cy + start_angle.sin() * r;
    let x_end = cx + end_angle.cos() * r;
    let y_end = cy + end_angle.sin() * r;
    let dx = x_end - x_start;
    let dy = y_end - y_start;
    let chord_len_sq = dx * dx + dy * dy;

    let min_x = ((cx - outer - 1.0).floor() as i32).max(0);
    let max_x = ((cx + outer + 1.0).ceil() as i32).min(canvas.width as i32 - 1);
    let min_y = ((cy - outer - 1.0).floor() as i32).max(0);
    let max_y = ((cy + outer + 1.0).ceil() as i32).min(canvas.height as i32 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let pdx = x as f64 - cx;
            let pdy = y as f64 - cy;
            let dist = (pdx * pdx + pdy * pdy).sqrt();
            if dist < inner - 1.0 || dist > outer + 1.0 {
                continue;
            }

            let mut angle = pdy.atan2(pdx);
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            if angle < ARC_START {
                angle += 2.0 * PI;
            }
            if angle < start_angle || angle > end_angle {
                continue;
            }

            let aa = if dist > outer {
                1.0 - (dist - outer).min(1.0)
            } else if dist < inner {
                1.0 - (inner - dist).min(1.0)
            } else {
                1.0
            };
            if aa <= 0.0 {
                continue;
            }

            let t = if chord_len_sq > 0.0 {
                (((x as f64 - x_start) * dx + (y as f64 - y_start) * dy) / chord_len_sq)
                    .clamp(0.0, 1.0)
            } else {
                0.0
            };
            set_pixel(
                canvas.frame,
                canvas.width,
                x as usize,
                y as usize,
                lerp_color(from, to, t),
                aa as f32,
            );
        }
    }
}

/// Solid arc band with rounded caps: the band itself plus a disc of half
/// the band width at each end.
fn raster_ring(
    canvas: &mut Canvas,
    cx: f64,
    cy: f64,
    r: f64,
    thickness: f64,
    start_angle: f64,
    end_angle: f64,
    color: Color,
) {
    raster_arc_band(
        canvas,
        cx,
        cy,
        r,
        thickness,
        start_angle,
        end_angle,
        color,
        color,
    );
    for angle in [start_angle, end_angle] {
        let px = cx + angle.cos() * r;
        let py = cy + angle.sin() * r;
        raster_disc(canvas, px, py, thickness / 2.0, color);
    }
}

fn raster_disc(canvas: &mut Canvas, cx: f64, cy: f64, radius: f64, color: Color) {
    let min_x = ((cx - radius - 1.0).floor() as i32).max(0);
    let max_x = ((cx + radius + 1.0).ceil() as i32).min(canvas.width as i32 - 1);
    let min_y = ((cy - radius - 1.0).floor() as i32).max(0);
    let max_y = ((cy + radius + 1.0).ceil() as i32).min(canvas.height as i32 - 1);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dist = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            let aa = if dist > radius {
                1.0 - (dist - radius).min(1.0)
            } else {
                1.0
            };
            if aa > 0.0 {
                set_pixel(
                    canvas.frame,
                    canvas.width,
                    x as usize,
                    y as usize,
                    color,
                    aa as f32,
                );
            }
        }
    }
}

fn raster_line(
    canvas: &mut Canvas,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    thickness: f32,
    color: Color,
) {
    let pad = thickness.ceil() as i32 + 1;
    let min_x = ((x0.min(x1).floor() as i32) - pad).max(0);
    let max_x = ((x0.max(x1).ceil() as i32) + pad).min(canvas.width as i32 - 1);
    let min_y = ((y0.min(y1).floor() as i32) - pad).max(0);
    let max_y = ((y0.max(y1).ceil() as i32) + pad).min(canvas.height as i32 - 1);
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len_sq = dx * dx + dy * dy;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f64 - x0;
            let py = y as f64 - y0;
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let lx = x0 + t * dx;
            let ly = y0 + t * dy;
            let dist = ((lx - x as f64).powi(2) + (ly - y as f64).powi(2)).sqrt();
            let aa = (1.0 - (dist - thickness as f64 / 2.0).clamp(0.0, 1.0)).clamp(0.0, 1.0);
            if aa > 0.01 {
                set_pixel(
                    canvas.frame,
                    canvas.width,
                    x as usize,
                    y as usize,
                    color,
                    aa as f32,
                );
            }
        }
    }
}

/// Draw `text` anchored at `(x, y)` with a middle vertical baseline.
/// Right-aligned text ends at the anchor, centered text straddles it,
/// left-aligned text starts at it.
fn raster_text(
    canvas: &mut Canvas,
    x: f64,
    y: f64,
    text: &str,
    align: TextAlign,
    font: &Font,
    scale: Scale,
    color: Color,
) {
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();
    let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    );
    if min_x >= max_x {
        return;
    }
    let width_px = max_x - min_x;
    let height_px = max_y - min_y;
    let offset_x = match align {
        TextAlign::Left => x.round() as i32,
        TextAlign::Center => x.round() as i32 - width_px / 2,
        TextAlign::Right => x.round() as i32 - width_px,
    };
    let offset_y = y.round() as i32 - height_px / 2;
    for glyph in glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                let px = offset_x + gx as i32 + bb.min.x - min_x;
                let py = offset_y + gy as i32 + bb.min.y - min_y;
                if px >= 0 && px < canvas.width as i32 && py >= 0 && py < canvas.height as i32 {
                    set_pixel(
                        canvas.frame,
                        canvas.width,
                        px as usize,
                        py as usize,
                        color,
                        v,
                    );
                }
            });
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: usize = 400;
    const HEIGHT: usize = 300;

    fn scene_for(spec: &GaugeSpec, min: f64, max: f64) -> Scene {
        let state = GaugeState {
            min_value: min,
            max_value: max,
            current_position: min,
        };
        build_scene(spec, &state, WIDTH, HEIGHT)
    }

    fn count_ticks(scene: &Scene, want: f32) -> usize {
        scene
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Tick { thickness, .. } if *thickness == want))
            .count()
    }

    fn labels(scene: &Scene) -> Vec<(String, TextAlign)> {
        scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Label { text, align, .. } => Some((text.clone(), *align)),
                _ => None,
            })
            .collect()
    }

    fn gradient_segments(scene: &Scene) -> Vec<(f64, f64, Color, Color)> {
        scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::GradientArc {
                    start_angle,
                    end_angle,
                    from,
                    to,
                    ..
                } => Some((*start_angle, *end_angle, *from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn tick_counts_match_line_count() {
        for n in [1usize, 4, 6, 10] {
            let spec = GaugeSpec::builder().line_count(n).build();
            let scene = scene_for(&spec, 0.0, 100.0);
            assert_eq!(
                count_ticks(&scene, spec.line_stroke_large),
                n + 1,
                "large ticks for line_count {n}"
            );
            assert_eq!(
                count_ticks(&scene, spec.line_stroke_small),
                5 * n + 1,
                "small ticks for line_count {n}"
            );
        }
    }

    #[test]
    fn one_background_ring_outside_the_band() {
        let spec = GaugeSpec::default();
        let scene = scene_for(&spec, 0.0, 100.0);
        let rings: Vec<_> = scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Ring {
                    r,
                    thickness,
                    start_angle,
                    end_angle,
                    ..
                } => Some((*r, *thickness, *start_angle, *end_angle)),
                _ => None,
            })
            .collect();
        assert_eq!(rings.len(), 1);
        let (r, thickness, start, end) = rings[0];
        let dial = Dial::new(WIDTH, HEIGHT);
        assert!((r - (dial.radius + spec.gradient_thickness * 0.8)).abs() < 1e-9);
        assert_eq!(thickness, RING_WIDTH);
        assert!((start - ARC_START).abs() < 1e-9);
        assert!((end - (ARC_START + ARC_LENGTH)).abs() < 1e-9);
    }

    #[test]
    fn labels_for_0_to_200_dial() {
        let spec = GaugeSpec::builder().line_count(4).build();
        let scene = scene_for(&spec, 0.0, 200.0);
        let got = labels(&scene);
        let texts: Vec<&str> = got.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, ["0", "50", "100", "150", "200"]);
        assert_eq!(
            got.iter().map(|(_, a)| *a).collect::<Vec<_>>(),
            [
                TextAlign::Right,
                TextAlign::Right,
                TextAlign::Center,
                TextAlign::Left,
                TextAlign::Left,
            ]
        );
    }

    #[test]
    fn label_step_is_constant() {
        let spec = GaugeSpec::builder().line_count(7).build();
        let scene = scene_for(&spec, 3.0, 17.0);
        let values: Vec<f64> = labels(&scene)
            .iter()
            .map(|(t, _)| t.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 8);
        assert_eq!(values[0], 3.0);
        assert_eq!(*values.last().unwrap(), 17.0);
        for pair in values.windows(2) {
            assert!((pair[1] - pair[0] - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn minimal_dial_has_two_of_everything() {
        let spec = GaugeSpec::builder().line_count(1).build();
        let scene = scene_for(&spec, 0.0, 100.0);
        assert_eq!(count_ticks(&scene, spec.line_stroke_large), 2);
        assert_eq!(count_ticks(&scene, spec.line_stroke_small), 6);
        let got = labels(&scene);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].0, "0");
        assert_eq!(got[1].0, "100");
    }

    #[test]
    fn default_palette_gives_three_quarter_turn_segments() {
        let spec = GaugeSpec::default();
        let scene = scene_for(&spec, 0.0, 100.0);
        let segments = gradient_segments(&scene);
        assert_eq!(segments.len(), 3);
        assert!((segments[0].0 - 0.75 * PI).abs() < 1e-9);
        assert!((segments[2].1 - 2.25 * PI).abs() < 1e-9);
        for (i, (start, end, from, to)) in segments.iter().enumerate() {
            assert!((end - start - PI / 2.0).abs() < 1e-9, "segment {i} span");
            assert_eq!(*from, DEFAULT_PALETTE[i]);
            assert_eq!(*to, DEFAULT_PALETTE[i + 1]);
        }
        // Adjacent segments share their boundary angle.
        assert!((segments[0].1 - segments[1].0).abs() < 1e-9);
        assert!((segments[1].1 - segments[2].0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_range_is_rejected() {
        let spec = GaugeSpec::default();
        assert_eq!(
            Gauge::new(spec.clone(), 10.0, 10.0).unwrap_err(),
            GaugeError::InvalidRange {
                min: 10.0,
                max: 10.0
            }
        );
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        assert!(matches!(
            render_gauge(&mut frame, WIDTH, HEIGHT, &spec, 5.0, -5.0, 0.0),
            Err(GaugeError::InvalidRange { .. })
        ));
    }

    #[test]
    fn invalid_spec_is_rejected_before_painting() {
        let spec = GaugeSpec::builder().line_count(0).build();
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        assert!(matches!(
            render_gauge(&mut frame, WIDTH, HEIGHT, &spec, 0.0, 100.0, 0.0),
            Err(GaugeError::InvalidSpec(_))
        ));
    }

    #[test]
    fn render_is_idempotent() {
        let spec = GaugeSpec::builder().line_count(4).build();
        let mut first = vec![0u8; WIDTH * HEIGHT * 4];
        let mut second = vec![0u8; WIDTH * HEIGHT * 4];
        render_gauge(&mut first, WIDTH, HEIGHT, &spec, 0.0, 200.0, 50.0).unwrap();
        render_gauge(&mut second, WIDTH, HEIGHT, &spec, 0.0, 200.0, 50.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn scene_building_is_pure() {
        let spec = GaugeSpec::default();
        let a = scene_for(&spec, 0.0, 100.0);
        let b = scene_for(&spec, 0.0, 100.0);
        assert_eq!(a.commands, b.commands);
    }

    #[test]
    fn band_pixels_are_painted() {
        let spec = GaugeSpec::default();
        let mut frame = vec![0u8; WIDTH * HEIGHT * 4];
        render_gauge(&mut frame, WIDTH, HEIGHT, &spec, 0.0, 100.0, 0.0).unwrap();
        // Top of the dial, in the middle of the gradient band.
        let dial = Dial::new(WIDTH, HEIGHT);
        let x = dial.cx.round() as usize;
        let y = (dial.cy - dial.radius).round() as usize;
        let idx = (y * WIDTH + x) * 4;
        let bg = spec.background_color;
        assert_ne!(
            (frame[idx], frame[idx + 1], frame[idx + 2]),
            (bg.r, bg.g, bg.b)
        );
    }

    #[test]
    fn position_updates_clamp_to_range() {
        let mut gauge = Gauge::new(GaugeSpec::default(), 0.0, 100.0).unwrap();
        gauge.set_position(250.0);
        assert_eq!(gauge.state().current_position, 100.0);
        gauge.set_position(-10.0);
        assert_eq!(gauge.state().current_position, 0.0);
    }

    #[test]
    fn range_updates_revalidate() {
        let mut gauge = Gauge::new(GaugeSpec::default(), 0.0, 100.0).unwrap();
        gauge.set_position(80.0);
        gauge.set_range(0.0, 50.0).unwrap();
        assert_eq!(gauge.state().current_position, 50.0);
        assert!(matches!(
            gauge.set_range(9.0, 9.0),
            Err(GaugeError::InvalidRange { .. })
        ));
    }

    #[test]
    fn label_formatting() {
        assert_eq!(format_label(50.0), "50");
        assert_eq!(format_label(-3.0), "-3");
        assert_eq!(format_label(0.25), "0.25");
        assert_eq!(format_label(12.5), "12.5");
    }
}
