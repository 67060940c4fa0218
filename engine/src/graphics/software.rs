//! CPU triangle rasteriser
//!
//! A small stand-in for the hardware path: transforms vertices with the bound matrices, fills
//! triangles with a depth test, samples textures nearest-neighbour, applies the per-draw
//! directional lights plus emission, discards fragments inside `cullRadius` and gamma-corrects
//! the result. The framebuffer can be written out as a binary PPM.

use super::backend::{
    uniforms, GeometryHandle, RenderBackend, ShaderHandle, TextureHandle, UniformState,
};
use super::mesh::{Mesh, Vertex};
use super::texture::TextureImage;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::io::{self, Write};
use tracing::{debug, warn};

/// Ambient term added to every lit fragment
pub const AMBIENT: f32 = 0.1;
/// Gamma used when a draw does not set one
pub const DEFAULT_GAMMA: f32 = 2.2;
/// Upper bound on lights honoured per draw
pub const MAX_LIGHTS: usize = 16;

const MIN_CLIP_W: f32 = 1e-5;

/// Counters for the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub draws: usize,
    pub triangles: usize,
    pub fragments: usize,
}

#[derive(Debug)]
struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Vec3>,
    depth: Vec<f32>,
}

impl Framebuffer {
    fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![Vec3::ZERO; len],
            depth: vec![f32::INFINITY; len],
        }
    }

    fn clear(&mut self, color: Vec3) {
        self.color.fill(color);
        self.depth.fill(f32::INFINITY);
    }
}

/// Everything a fragment needs that is constant across one draw
struct Shading<'a> {
    normal_matrix: Mat3,
    texture: Option<&'a TextureImage>,
    lights: Vec<(Vec3, Vec3, f32)>,
    emission: Vec3,
    inv_gamma: f32,
    cull_radius: f32,
}

impl<'a> Shading<'a> {
    fn from_uniforms(state: &UniformState, texture: Option<&'a TextureImage>) -> Self {
        let count = state.int(uniforms::LIGHT_COUNT).clamp(0, MAX_LIGHTS as i32) as usize;
        let lights = (0..count)
            .map(|i| {
                (
                    state.vec3(&uniforms::light_direction(i)),
                    state.vec3(&uniforms::light_color(i)),
                    state.scalar_or(&uniforms::light_intensity(i), 0.0),
                )
            })
            .collect();

        let gamma = state.scalar_or(uniforms::GAMMA, DEFAULT_GAMMA);
        let gamma = if gamma.is_finite() && gamma > 0.0 { gamma } else { 1.0 };

        Self {
            normal_matrix: Mat3::from_mat4(state.matrix(uniforms::MODEL)),
            texture,
            lights,
            emission: state.vec3(uniforms::EMISSION_COLOR)
                * state.scalar_or(uniforms::EMISSION_INTENSITY, 0.0),
            inv_gamma: 1.0 / gamma,
            cull_radius: state.scalar_or(uniforms::CULL_RADIUS, 0.0),
        }
    }

    fn shade(&self, normal: Vec3, uv: Vec2) -> Vec3 {
        let albedo = self
            .texture
            .map_or(Vec3::ONE, |texture| texture.sample_nearest(uv));
        let normal = (self.normal_matrix * normal).normalize_or_zero();

        // Light directions arrive in world axes while geometry sits in the camera-relative frame,
        // which is the world mirrored through the camera, so the direction towards the light is
        // the incoming direction itself.
        let diffuse = self
            .lights
            .iter()
            .fold(Vec3::ZERO, |acc, (direction, color, intensity)| {
                acc + *color * *intensity * normal.dot(*direction).max(0.0)
            });

        let linear = albedo * (Vec3::splat(AMBIENT) + diffuse) + self.emission;
        linear.clamp(Vec3::ZERO, Vec3::ONE).powf(self.inv_gamma)
    }
}

struct ProjectedVertex {
    screen: Vec2,
    depth: f32,
    inv_w: f32,
    view: Vec3,
    normal: Vec3,
    uv: Vec2,
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Software rasteriser backend
#[derive(Debug)]
pub struct SoftwareBackend {
    framebuffer: Framebuffer,
    clear_color: Vec3,
    geometry: Vec<Mesh>,
    textures: Vec<TextureImage>,
    pending: UniformState,
    stats: RasterStats,
}

impl SoftwareBackend {
    /// Create a backend with a black framebuffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: Framebuffer::new(width, height),
            clear_color: Vec3::ZERO,
            geometry: Vec::new(),
            textures: Vec::new(),
            pending: UniformState::default(),
            stats: RasterStats::default(),
        }
    }

    /// Color the framebuffer is cleared to at the start of each frame
    pub fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = color;
    }

    /// Resize and clear the framebuffer
    pub fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = Framebuffer::new(width, height);
        self.framebuffer.clear(self.clear_color);
    }

    /// Framebuffer width in pixels
    pub fn width(&self) -> u32 {
        self.framebuffer.width
    }

    /// Framebuffer height in pixels
    pub fn height(&self) -> u32 {
        self.framebuffer.height
    }

    /// Counters for the current frame
    pub fn stats(&self) -> RasterStats {
        self.stats
    }

    /// Gamma-corrected color of a pixel, row 0 at the top
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec3> {
        if x >= self.framebuffer.width || y >= self.framebuffer.height {
            return None;
        }
        Some(self.framebuffer.color[(y * self.framebuffer.width + x) as usize])
    }

    /// Depth of a pixel in normalized device coordinates, infinity where nothing was drawn
    pub fn depth(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.framebuffer.width || y >= self.framebuffer.height {
            return None;
        }
        Some(self.framebuffer.depth[(y * self.framebuffer.width + x) as usize])
    }

    /// The framebuffer as packed RGB8 bytes
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.framebuffer
            .color
            .iter()
            .flat_map(|c| {
                let c = (c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
                [c.x as u8, c.y as u8, c.z as u8]
            })
            .collect()
    }

    /// Write the framebuffer as a binary (P6) PPM image
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(
            out,
            "P6\n{} {}\n255\n",
            self.framebuffer.width, self.framebuffer.height
        )?;
        out.write_all(&self.to_rgb8())?;
        out.flush()
    }

    fn rasterize(
        framebuffer: &mut Framebuffer,
        stats: &mut RasterStats,
        shading: &Shading,
        vertices: [ProjectedVertex; 3],
    ) {
        let [a, b, c] = &vertices;
        let area = edge(a.screen, b.screen, c.screen);
        if area.abs() <= f32::EPSILON {
            return;
        }
        stats.triangles += 1;

        let min = a.screen.min(b.screen).min(c.screen).floor().max(Vec2::ZERO);
        let max = a
            .screen
            .max(b.screen)
            .max(c.screen)
            .ceil()
            .min(Vec2::new(framebuffer.width as f32, framebuffer.height as f32));

        for y in min.y as u32..max.y as u32 {
            for x in min.x as u32..max.x as u32 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b.screen, c.screen, p) / area;
                let w1 = edge(c.screen, a.screen, p) / area;
                let w2 = 1.0 - w0 - w1;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * a.depth + w1 * b.depth + w2 * c.depth;
                let index = (y * framebuffer.width + x) as usize;
                if !(-1.0..=1.0).contains(&depth) || depth >= framebuffer.depth[index] {
                    continue;
                }

                // Perspective-correct weights
                let inv_w = w0 * a.inv_w + w1 * b.inv_w + w2 * c.inv_w;
                let (p0, p1, p2) = (
                    w0 * a.inv_w / inv_w,
                    w1 * b.inv_w / inv_w,
                    w2 * c.inv_w / inv_w,
                );

                let view = a.view * p0 + b.view * p1 + c.view * p2;
                if view.length() < shading.cull_radius {
                    continue;
                }

                let normal = a.normal * p0 + b.normal * p1 + c.normal * p2;
                let uv = a.uv * p0 + b.uv * p1 + c.uv * p2;

                framebuffer.depth[index] = depth;
                framebuffer.color[index] = shading.shade(normal, uv);
                stats.fragments += 1;
            }
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn submit_geometry(&mut self, mesh: &Mesh) -> GeometryHandle {
        self.geometry.push(mesh.clone());
        debug!(
            vertices = mesh.vertices.len(),
            triangles = mesh.triangle_count(),
            "Stored geometry for software rasteriser"
        );
        GeometryHandle(self.geometry.len() as u32 - 1)
    }

    fn upload_texture(&mut self, image: &TextureImage) -> TextureHandle {
        self.textures.push(image.clone());
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn begin_frame(&mut self) {
        self.framebuffer.clear(self.clear_color);
        self.pending.clear();
        self.stats = RasterStats::default();
    }

    fn bind_shader(&mut self, shader: ShaderHandle) {
        if shader != ShaderHandle::LIT_TEXTURED {
            warn!(?shader, "Software backend only provides the lit textured shader");
        }
        self.pending.shader = Some(shader);
    }

    fn set_matrix(&mut self, name: &str, value: Mat4) {
        self.pending.matrices.insert(name.to_string(), value);
    }

    fn set_scalar(&mut self, name: &str, value: f32) {
        self.pending.scalars.insert(name.to_string(), value);
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.pending.vec3s.insert(name.to_string(), value);
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.pending.ints.insert(name.to_string(), value);
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.pending.texture = Some(texture);
    }

    fn finalize_draw(&mut self, geometry: GeometryHandle) {
        let state = std::mem::take(&mut self.pending);
        let Some(mesh) = self.geometry.get(geometry.0 as usize) else {
            warn!(?geometry, "Draw with unknown geometry skipped");
            return;
        };

        let texture = state.texture.and_then(|handle| {
            let texture = self.textures.get(handle.0 as usize);
            if texture.is_none() {
                warn!(?handle, "Unknown texture, drawing untextured");
            }
            texture
        });
        let shading = Shading::from_uniforms(&state, texture);

        let model_view = state.matrix(uniforms::VIEW) * state.matrix(uniforms::MODEL);
        let projection = state.matrix(uniforms::PROJECTION);
        let size = Vec2::new(
            self.framebuffer.width as f32,
            self.framebuffer.height as f32,
        );

        let project = |vertex: &Vertex| -> Option<ProjectedVertex> {
            let view = model_view.transform_point3(Vec3::from(vertex.position));
            let clip: Vec4 = projection * view.extend(1.0);
            // Triangles crossing the camera plane are dropped rather than clipped
            if clip.w <= MIN_CLIP_W {
                return None;
            }
            let ndc = clip.truncate() / clip.w;
            Some(ProjectedVertex {
                screen: Vec2::new((ndc.x * 0.5 + 0.5) * size.x, (0.5 - ndc.y * 0.5) * size.y),
                depth: ndc.z,
                inv_w: 1.0 / clip.w,
                view,
                normal: Vec3::from(vertex.normal),
                uv: Vec2::from(vertex.uv),
            })
        };

        self.stats.draws += 1;
        for [a, b, c] in mesh.triangles() {
            let (Some(a), Some(b), Some(c)) = (project(a), project(b), project(c)) else {
                continue;
            };
            Self::rasterize(&mut self.framebuffer, &mut self.stats, &shading, [a, b, c]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_cube(backend: &mut SoftwareBackend, cull_radius: f32, emission: f32) {
        let cube = backend.submit_geometry(&Mesh::cube(1.0));
        backend.begin_frame();
        backend.bind_shader(ShaderHandle::LIT_TEXTURED);
        backend.set_matrix(uniforms::MODEL, Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)));
        backend.set_matrix(uniforms::VIEW, Mat4::IDENTITY);
        backend.set_matrix(
            uniforms::PROJECTION,
            Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 0.1, 100.0),
        );
        backend.set_scalar(uniforms::CULL_RADIUS, cull_radius);
        backend.set_scalar(uniforms::GAMMA, 1.0);
        backend.set_vec3(uniforms::EMISSION_COLOR, Vec3::ONE);
        backend.set_scalar(uniforms::EMISSION_INTENSITY, emission);
        backend.set_int(uniforms::LIGHT_COUNT, 0);
        backend.finalize_draw(cube);
    }

    #[test]
    fn test_cube_in_front_covers_center() {
        let mut backend = SoftwareBackend::new(16, 16);
        draw_cube(&mut backend, 0.0, 0.0);

        let stats = backend.stats();
        assert_eq!(stats.draws, 1);
        assert!(stats.fragments > 0);

        let center = backend.pixel(8, 8).unwrap();
        // Untextured, unlit: only the ambient term
        assert!((center - Vec3::splat(AMBIENT)).length() < 1e-4);
        assert!(backend.depth(8, 8).unwrap() < 1.0);

        // Corners stay clear
        assert_eq!(backend.pixel(0, 0), Some(Vec3::ZERO));
        assert_eq!(backend.depth(0, 0), Some(f32::INFINITY));
    }

    #[test]
    fn test_cull_radius_discards_near_fragments() {
        let mut backend = SoftwareBackend::new(16, 16);
        draw_cube(&mut backend, 100.0, 0.0);
        assert_eq!(backend.stats().fragments, 0);
        assert_eq!(backend.pixel(8, 8), Some(Vec3::ZERO));
    }

    #[test]
    fn test_emission_saturates() {
        let mut backend = SoftwareBackend::new(8, 8);
        draw_cube(&mut backend, 0.0, 5.0);
        assert_eq!(backend.pixel(4, 4), Some(Vec3::ONE));
    }

    #[test]
    fn test_light_facing_surface_is_brighter() {
        let mut backend = SoftwareBackend::new(16, 16);
        let cube = backend.submit_geometry(&Mesh::cube(1.0));
        backend.begin_frame();
        backend.set_matrix(uniforms::MODEL, Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)));
        backend.set_matrix(
            uniforms::PROJECTION,
            Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 0.1, 100.0),
        );
        backend.set_scalar(uniforms::GAMMA, 1.0);
        backend.set_int(uniforms::LIGHT_COUNT, 1);
        // The visible face has normal +Z
        backend.set_vec3(&uniforms::light_direction(0), Vec3::Z);
        backend.set_vec3(&uniforms::light_color(0), Vec3::ONE);
        backend.set_scalar(&uniforms::light_intensity(0), 0.5);
        backend.finalize_draw(cube);

        let center = backend.pixel(8, 8).unwrap();
        assert!((center - Vec3::splat(AMBIENT + 0.5)).length() < 1e-4);
    }

    #[test]
    fn test_unknown_geometry_is_skipped() {
        let mut backend = SoftwareBackend::new(4, 4);
        backend.begin_frame();
        backend.finalize_draw(GeometryHandle(7));
        assert_eq!(backend.stats().draws, 0);
    }

    #[test]
    fn test_write_ppm_header_and_size() {
        let mut backend = SoftwareBackend::new(3, 2);
        backend.set_clear_color(Vec3::new(1.0, 0.0, 0.0));
        backend.begin_frame();

        let mut bytes = Vec::new();
        backend.write_ppm(&mut bytes).unwrap();
        let header = b"P6\n3 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 3 * 2 * 3);
        assert_eq!(&bytes[header.len()..header.len() + 3], &[255, 0, 0]);
    }
}
