//! Hardware backend
//!
//! Packs every finalized draw into `Pod` uniform blocks. A [`GpuUpload`] turns the packed frame
//! into `wgpu` buffers and textures on a device, either one owned by a window or a headless
//! [`GpuContext`].

use super::backend::{
    uniforms, GeometryHandle, RenderBackend, ShaderHandle, TextureHandle, UniformState,
};
use super::mesh::Mesh;
use super::texture::TextureImage;
use super::uniform::{LightUniform, LightsUniform, ObjectUniform, MAX_GPU_LIGHTS};
use bytemuck::Pod;
use glam::{Mat4, Vec3};
use thiserror::Error;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

/// Errors while acquiring a device
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Device and queue without a surface
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Open a device on any available adapter, without a window
    pub async fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_info = adapter.get_info();
        info!(
            gpu_name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "Headless GPU adapter selected"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Headless Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Blocking form of [`GpuContext::headless`]
    pub fn headless_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::headless())
    }
}

fn uniform_buffer<T: Pod>(device: &wgpu::Device, label: &str, block: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(block),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// One draw, packed for upload
#[derive(Debug, Clone, PartialEq)]
pub struct GpuDrawPacket {
    pub geometry: GeometryHandle,
    pub shader: ShaderHandle,
    pub texture: Option<TextureHandle>,
    pub object: ObjectUniform,
    pub lights: LightsUniform,
}

impl GpuDrawPacket {
    fn pack(geometry: GeometryHandle, state: &UniformState) -> Self {
        let mut object = ObjectUniform::new(
            state.matrix(uniforms::MODEL),
            state.matrix(uniforms::VIEW),
            state.matrix(uniforms::PROJECTION),
        );
        let emission = state.vec3(uniforms::EMISSION_COLOR);
        object.emission = [
            emission.x,
            emission.y,
            emission.z,
            state.scalar_or(uniforms::EMISSION_INTENSITY, 0.0),
        ];
        object.params[0] = state.scalar_or(uniforms::CULL_RADIUS, 0.0);
        object.params[1] = state.scalar_or(uniforms::GAMMA, object.params[1]);

        let requested = state.int(uniforms::LIGHT_COUNT).max(0) as usize;
        if requested > MAX_GPU_LIGHTS {
            warn!(
                requested,
                max = MAX_GPU_LIGHTS,
                "Too many lights for one draw, extra lights dropped"
            );
        }
        let count = requested.min(MAX_GPU_LIGHTS);
        object.counts[0] = count as u32;

        let mut lights = LightsUniform::default();
        for (i, slot) in lights.lights.iter_mut().take(count).enumerate() {
            *slot = LightUniform::new(
                state.vec3(&uniforms::light_direction(i)),
                state.vec3(&uniforms::light_color(i)),
                state.scalar_or(&uniforms::light_intensity(i), 0.0),
            );
        }

        Self {
            geometry,
            shader: state.shader.unwrap_or_default(),
            texture: state.texture,
            object,
            lights,
        }
    }
}

/// Backend that prepares draws for `wgpu`
#[derive(Debug, Default)]
pub struct GpuBackend {
    geometry: Vec<Mesh>,
    textures: Vec<TextureImage>,
    pending: UniformState,
    packets: Vec<GpuDrawPacket>,
}

impl GpuBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws packed since the last [`RenderBackend::begin_frame`]
    pub fn packets(&self) -> &[GpuDrawPacket] {
        &self.packets
    }

    /// Meshes submitted so far, indexed by [`GeometryHandle`]
    pub fn geometry(&self) -> &[Mesh] {
        &self.geometry
    }

    /// Images uploaded so far, indexed by [`TextureHandle`]
    pub fn textures(&self) -> &[TextureImage] {
        &self.textures
    }
}

/// Vertex and index buffers for one submitted mesh
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Uniform buffers for one packed draw
pub struct GpuDrawBuffers {
    pub object: wgpu::Buffer,
    pub lights: wgpu::Buffer,
}

/// Device-side copy of a [`GpuBackend`]'s resources and current frame
#[derive(Default)]
pub struct GpuUpload {
    geometry: Vec<GpuGeometry>,
    textures: Vec<wgpu::Texture>,
    draws: Vec<GpuDrawBuffers>,
    active_draws: usize,
}

impl GpuUpload {
    /// Create an upload with nothing on the device yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the device up to date with `backend`
    ///
    /// Geometry and textures are created the first time they are seen. Uniform buffers from
    /// earlier frames are rewritten in place, and new ones are only created when a frame has more
    /// draws than any before it.
    pub fn sync(&mut self, backend: &GpuBackend, device: &wgpu::Device, queue: &wgpu::Queue) {
        for (index, mesh) in backend.geometry().iter().enumerate().skip(self.geometry.len()) {
            self.geometry.push(create_geometry(device, index, mesh));
        }
        for (index, image) in backend.textures().iter().enumerate().skip(self.textures.len()) {
            self.textures.push(create_texture(device, queue, index, image));
        }

        for (i, packet) in backend.packets().iter().enumerate() {
            match self.draws.get(i) {
                Some(buffers) => {
                    queue.write_buffer(&buffers.object, 0, bytemuck::bytes_of(&packet.object));
                    queue.write_buffer(&buffers.lights, 0, bytemuck::bytes_of(&packet.lights));
                }
                None => {
                    let object = format!("Draw {i} Object Uniform");
                    let lights = format!("Draw {i} Lights Uniform");
                    self.draws.push(GpuDrawBuffers {
                        object: uniform_buffer(device, &object, &packet.object),
                        lights: uniform_buffer(device, &lights, &packet.lights),
                    });
                }
            }
        }
        self.active_draws = backend.packets().len();

        debug!(
            geometry = self.geometry.len(),
            textures = self.textures.len(),
            draws = self.active_draws,
            "Synced GPU upload"
        );
    }

    /// Buffers for submitted geometry
    pub fn geometry(&self, handle: GeometryHandle) -> Option<&GpuGeometry> {
        self.geometry.get(handle.0 as usize)
    }

    /// Texture for an uploaded image
    pub fn texture(&self, handle: TextureHandle) -> Option<&wgpu::Texture> {
        self.textures.get(handle.0 as usize)
    }

    /// Uniform buffers for the draws of the last synced frame, in draw order
    pub fn draws(&self) -> &[GpuDrawBuffers] {
        &self.draws[..self.active_draws]
    }
}

fn create_geometry(device: &wgpu::Device, index: usize, mesh: &Mesh) -> GpuGeometry {
    GpuGeometry {
        vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Geometry {index} Vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        }),
        index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Geometry {index} Indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        }),
        index_count: mesh.indices.len() as u32,
    }
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    index: usize,
    image: &TextureImage,
) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("Texture {index}")),
            size: wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        image.as_bytes(),
    )
}

impl RenderBackend for GpuBackend {
    fn submit_geometry(&mut self, mesh: &Mesh) -> GeometryHandle {
        self.geometry.push(mesh.clone());
        GeometryHandle(self.geometry.len() as u32 - 1)
    }

    fn upload_texture(&mut self, image: &TextureImage) -> TextureHandle {
        self.textures.push(image.clone());
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn begin_frame(&mut self) {
        self.packets.clear();
        self.pending.clear();
    }

    fn bind_shader(&mut self, shader: ShaderHandle) {
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
        if geometry.0 as usize >= self.geometry.len() {
            warn!(?geometry, "Draw with unknown geometry skipped");
            return;
        }
        self.packets.push(GpuDrawPacket::pack(geometry, &state));
    }
}
