//! Shaders, shader constants and the fixed-function fallback set.

use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;

use crate::driver::{GlCall, ProgramHandle, ProgramSource};
use crate::error::GraphicsResult;
use crate::resource::{DeviceShared, GpuResource, ResourceId, ResourceKind, ResourceLink};

/// Descriptor for creating a shader.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDescriptor {
    /// Opaque path of the vertex stage source.
    pub vertex_file: String,
    /// Opaque path of the pixel stage source.
    pub pixel_file: String,
    /// Requested pixel shader model.
    pub pixel_version: f32,
    /// Sampler uniforms, bound to texture units in order.
    pub samplers: Vec<String>,
}

impl ShaderDescriptor {
    /// Create a descriptor from vertex and pixel source paths.
    pub fn new(vertex_file: impl Into<String>, pixel_file: impl Into<String>) -> Self {
        Self {
            vertex_file: vertex_file.into(),
            pixel_file: pixel_file.into(),
            pixel_version: 2.0,
            samplers: Vec::new(),
        }
    }

    /// Set the pixel shader model.
    pub fn with_pixel_version(mut self, version: f32) -> Self {
        self.pixel_version = version;
        self
    }

    /// Add a sampler uniform; it is bound to the next texture unit.
    pub fn with_sampler(mut self, name: impl Into<String>) -> Self {
        self.samplers.push(name.into());
        self
    }

    fn source(&self) -> ProgramSource {
        ProgramSource {
            vertex_file: self.vertex_file.clone(),
            pixel_file: self.pixel_file.clone(),
            pixel_version: self.pixel_version,
        }
    }
}

#[derive(Debug)]
struct NativeState {
    program: ProgramHandle,
    zombie: bool,
}

/// A linked shader program.
#[derive(Debug)]
pub struct Shader {
    link: ResourceLink,
    desc: ShaderDescriptor,
    native: Mutex<NativeState>,
}

impl Shader {
    pub(crate) fn create(
        shared: &Arc<DeviceShared>,
        desc: &ShaderDescriptor,
    ) -> GraphicsResult<Arc<Self>> {
        let link = shared.link();
        let program = link.driver().create_program(&desc.source())?;
        log::trace!(
            "Created shader {} ({}, {})",
            link.id(),
            desc.vertex_file,
            desc.pixel_file
        );

        let shader = Arc::new(Self {
            link,
            desc: desc.clone(),
            native: Mutex::new(NativeState {
                program,
                zombie: false,
            }),
        });
        shared.register(&shader);
        Ok(shader)
    }

    /// Creation descriptor.
    pub fn desc(&self) -> &ShaderDescriptor {
        &self.desc
    }

    /// Current native program (null while zombified).
    pub fn program(&self) -> ProgramHandle {
        self.native.lock().program
    }

    /// Make this program current.
    pub(crate) fn use_program(&self) {
        let program = self.program();
        self.link.driver().submit(GlCall::UseProgram(program));
    }

    /// Handle for the named constant.
    pub fn const_handle(&self, name: &str) -> ShaderConstHandle {
        ShaderConstHandle {
            name: name.to_string(),
        }
    }

    /// Allocate a constant buffer for this shader, with samplers preset to
    /// their texture units.
    pub fn alloc_const_buffer(self: &Arc<Self>) -> Arc<ShaderConstBuffer> {
        let buffer = ShaderConstBuffer::new(self.clone());
        for (unit, sampler) in self.desc.samplers.iter().enumerate() {
            buffer.set(&self.const_handle(sampler), ShaderConstValue::Int(unit as i32));
        }
        Arc::new(buffer)
    }
}

impl GpuResource for Shader {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Shader
    }

    fn zombify(&self) {
        let mut native = self.native.lock();
        if native.zombie {
            return;
        }
        self.link.driver().submit(GlCall::DeleteProgram(native.program));
        native.program = ProgramHandle::NONE;
        native.zombie = true;
    }

    fn resurrect(&self) -> GraphicsResult<()> {
        let mut native = self.native.lock();
        if !native.zombie {
            return Ok(());
        }
        native.program = self.link.driver().create_program(&self.desc.source())?;
        native.zombie = false;
        Ok(())
    }

    fn is_zombie(&self) -> bool {
        self.native.lock().zombie
    }

    fn describe(&self) -> String {
        format!(
            "Shader {} / {} ps {:.1}",
            self.desc.vertex_file, self.desc.pixel_file, self.desc.pixel_version
        )
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.link.unregister();
        let native = self.native.get_mut();
        if !native.zombie {
            self.link.driver().submit(GlCall::DeleteProgram(native.program));
        }
    }
}

/// Name of a shader constant, resolved against the program at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderConstHandle {
    name: String,
}

impl ShaderConstHandle {
    /// Constant name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Value of a shader constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderConstValue {
    Mat4(Mat4),
    Float4([f32; 4]),
    Int(i32),
}

#[derive(Debug)]
struct ConstEntry {
    name: String,
    value: ShaderConstValue,
    dirty: bool,
}

#[derive(Debug, Default)]
struct ConstState {
    entries: Vec<ConstEntry>,
    uploaded_for: Option<ProgramHandle>,
}

/// Constant values for one shader.
///
/// Only values changed since the last upload are sent, unless the program
/// changed (e.g. after a resurrect), in which case everything is re-sent.
#[derive(Debug)]
pub struct ShaderConstBuffer {
    shader: Arc<Shader>,
    state: Mutex<ConstState>,
}

impl ShaderConstBuffer {
    fn new(shader: Arc<Shader>) -> Self {
        Self {
            shader,
            state: Mutex::new(ConstState::default()),
        }
    }

    /// The shader this buffer belongs to.
    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    /// Set a constant value.
    pub fn set(&self, handle: &ShaderConstHandle, value: ShaderConstValue) {
        let mut state = self.state.lock();
        match state.entries.iter_mut().find(|e| e.name == handle.name) {
            Some(entry) => {
                if entry.value != value {
                    entry.value = value;
                    entry.dirty = true;
                }
            }
            None => state.entries.push(ConstEntry {
                name: handle.name.clone(),
                value,
                dirty: true,
            }),
        }
    }

    /// Set a matrix constant.
    pub fn set_matrix(&self, handle: &ShaderConstHandle, value: Mat4) {
        self.set(handle, ShaderConstValue::Mat4(value));
    }

    /// Current value of a constant.
    pub fn get(&self, handle: &ShaderConstHandle) -> Option<ShaderConstValue> {
        self.state
            .lock()
            .entries
            .iter()
            .find(|e| e.name == handle.name)
            .map(|e| e.value)
    }

    /// Upload pending values to the shader's program.
    pub(crate) fn activate(&self) {
        let program = self.shader.program();
        if program.is_none() {
            return;
        }
        let driver = self.shader.link.driver();

        let mut state = self.state.lock();
        let full = state.uploaded_for != Some(program);
        for entry in state.entries.iter_mut().filter(|e| full || e.dirty) {
            entry.dirty = false;
            let Some(location) = driver.uniform_location(program, &entry.name) else {
                continue;
            };
            driver.submit(match entry.value {
                ShaderConstValue::Mat4(m) => GlCall::UniformMatrix4 {
                    location,
                    value: *bytemuck::cast_ref::<Mat4, [f32; 16]>(&m),
                },
                ShaderConstValue::Float4(value) => GlCall::Uniform4f { location, value },
                ShaderConstValue::Int(value) => GlCall::Uniform1i { location, value },
            });
        }
        state.uploaded_for = Some(program);
    }
}

/// Fixed-function emulation modes served by built-in shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericShaderType {
    /// Flat vertex colour.
    Color,
    /// Texture modulated by vertex colour.
    ModColorTexture,
    /// Texture added to vertex colour.
    AddColorTexture,
    /// Plain texture.
    Texture,
    /// Restoring a render target; not served by this device.
    TargetRestore,
}

impl GenericShaderType {
    /// The types served by built-in shaders.
    pub const ALL: [GenericShaderType; 4] = [
        Self::Color,
        Self::ModColorTexture,
        Self::AddColorTexture,
        Self::Texture,
    ];

    /// Name of the model-view-projection constant.
    pub const MODEL_VIEW: &'static str = "$modelView";

    /// Shader descriptor for this type, `None` for [`Self::TargetRestore`].
    pub fn descriptor(self) -> Option<ShaderDescriptor> {
        const ROOT: &str = "shaders/common/fixedFunction/gl";
        let (stem, textured) = match self {
            Self::Color => ("color", false),
            Self::ModColorTexture => ("modColorTexture", true),
            Self::AddColorTexture => ("addColorTexture", true),
            Self::Texture => ("texture", true),
            Self::TargetRestore => return None,
        };

        let desc = ShaderDescriptor::new(
            format!("{ROOT}/{stem}V.glsl"),
            format!("{ROOT}/{stem}P.glsl"),
        )
        .with_pixel_version(2.0);
        Some(if textured {
            desc.with_sampler("$diffuseMap")
        } else {
            desc
        })
    }
}

/// A built-in shader with its constant buffer.
#[derive(Debug, Clone)]
pub(crate) struct GenericShader {
    pub shader: Arc<Shader>,
    pub buffer: Arc<ShaderConstBuffer>,
    pub model_view: ShaderConstHandle,
}

impl GenericShader {
    pub fn create(shared: &Arc<DeviceShared>, ty: GenericShaderType) -> GraphicsResult<Self> {
        let desc = ty.descriptor().ok_or_else(|| {
            crate::GraphicsError::InvalidParameter(format!("no built-in shader for {ty:?}"))
        })?;
        let shader = Shader::create(shared, &desc)?;
        let buffer = shader.alloc_const_buffer();
        let model_view = shader.const_handle(GenericShaderType::MODEL_VIEW);
        Ok(Self {
            shader,
            buffer,
            model_view,
        })
    }
}

static_assertions::assert_impl_all!(Shader: Send, Sync);
static_assertions::assert_impl_all!(ShaderConstBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;

    fn setup() -> (Arc<RecordingDriver>, Arc<DeviceShared>) {
        let driver = Arc::new(RecordingDriver::new());
        let shared = DeviceShared::new(driver.clone());
        (driver, shared)
    }

    #[test]
    fn test_generic_descriptors() {
        let desc = GenericShaderType::Color.descriptor().unwrap();
        assert_eq!(desc.vertex_file, "shaders/common/fixedFunction/gl/colorV.glsl");
        assert!(desc.samplers.is_empty());

        let desc = GenericShaderType::ModColorTexture.descriptor().unwrap();
        assert_eq!(desc.pixel_file, "shaders/common/fixedFunction/gl/modColorTextureP.glsl");
        assert_eq!(desc.samplers, vec!["$diffuseMap".to_string()]);

        assert!(GenericShaderType::TargetRestore.descriptor().is_none());
    }

    #[test]
    fn test_const_buffer_uploads_only_changes() {
        let (driver, shared) = setup();
        let shader = Shader::create(&shared, &ShaderDescriptor::new("a.glsl", "b.glsl")).unwrap();
        let buffer = shader.alloc_const_buffer();
        let mvp = shader.const_handle("$modelView");
        let tint = shader.const_handle("$tint");

        buffer.set_matrix(&mvp, Mat4::IDENTITY);
        buffer.set(&tint, ShaderConstValue::Float4([1.0; 4]));
        driver.clear_calls();

        buffer.activate();
        assert_eq!(driver.take_calls().len(), 2);

        buffer.activate();
        assert!(driver.calls().is_empty());

        buffer.set(&tint, ShaderConstValue::Float4([0.5; 4]));
        buffer.set_matrix(&mvp, Mat4::IDENTITY);
        buffer.activate();
        assert_eq!(driver.take_calls().len(), 1);
    }

    #[test]
    fn test_const_buffer_reuploads_after_resurrect() {
        let (driver, shared) = setup();
        let shader = Shader::create(&shared, &ShaderDescriptor::new("a.glsl", "b.glsl")).unwrap();
        let buffer = shader.alloc_const_buffer();
        buffer.set_matrix(&shader.const_handle("$modelView"), Mat4::IDENTITY);
        buffer.activate();

        shader.zombify();
        shader.resurrect().unwrap();
        driver.clear_calls();

        buffer.activate();
        assert_eq!(driver.calls().len(), 1);
    }

    #[test]
    fn test_missing_uniform_skipped() {
        let (driver, shared) = setup();
        driver.hide_uniform("$unused");
        let shader = Shader::create(&shared, &ShaderDescriptor::new("a.glsl", "b.glsl")).unwrap();
        let buffer = shader.alloc_const_buffer();
        buffer.set(&shader.const_handle("$unused"), ShaderConstValue::Int(3));
        driver.clear_calls();

        buffer.activate();
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_samplers_preset() {
        let (_driver, shared) = setup();
        let desc = ShaderDescriptor::new("a.glsl", "b.glsl")
            .with_sampler("$diffuseMap")
            .with_sampler("$normalMap");
        let shader = Shader::create(&shared, &desc).unwrap();
        let buffer = shader.alloc_const_buffer();
        assert_eq!(
            buffer.get(&shader.const_handle("$normalMap")),
            Some(ShaderConstValue::Int(1))
        );
    }
}
