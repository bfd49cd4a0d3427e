//! Recording driver for testing and development.
//!
//! This driver doesn't talk to a GPU. It records every submitted command and
//! object creation as a [`GlCall`] so tests can assert on the exact native
//! call stream, and it can simulate a lost context so resurrection failure
//! paths can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{GraphicsError, GraphicsResult};

use super::gl::{self, GLenum};
use super::{
    BufferHandle, DebugCallback, Extension, FramebufferHandle, GlCall, GlDriver, ProgramHandle,
    ProgramSource, QueryHandle, SyncHandle, SyncStatus, TextureHandle, VertexArrayHandle,
};

/// A recorded object creation, kept alongside the command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Created {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    Framebuffer(FramebufferHandle),
    Query(QueryHandle),
    VertexArray(VertexArrayHandle),
    Program(ProgramHandle, ProgramSource),
    Sync(SyncHandle),
}

struct RecorderState {
    calls: Vec<GlCall>,
    created: Vec<Created>,
    next_name: u32,
    context_valid: bool,
    bindings_loaded: u32,
    extensions: HashSet<Extension>,
    integers: HashMap<GLenum, i32>,
    shading_language_version: f32,
    uniform_locations: HashMap<String, i32>,
    hidden_uniforms: HashSet<String>,
    query_result: Option<u64>,
    sync_status: SyncStatus,
    debug_callback: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

/// Recording GL driver.
pub struct RecordingDriver {
    state: Mutex<RecorderState>,
}

impl RecordingDriver {
    /// Create a recording driver emulating a GL 3.3 core context with sync
    /// objects, anisotropic filtering and `KHR_debug`, but no native
    /// per-binding vertex attributes.
    pub fn new() -> Self {
        let extensions = [
            Extension::ArbSync,
            Extension::ArbTextureFilterAnisotropic,
            Extension::KhrDebug,
        ]
        .into_iter()
        .collect();

        let integers = [
            (gl::MAX_TEXTURE_IMAGE_UNITS, 16),
            (gl::MAX_TEXTURE_UNITS, 4),
            (gl::MAX_COLOR_ATTACHMENTS, 8),
        ]
        .into_iter()
        .collect();

        Self {
            state: Mutex::new(RecorderState {
                calls: Vec::new(),
                created: Vec::new(),
                next_name: 1,
                context_valid: true,
                bindings_loaded: 0,
                extensions,
                integers,
                shading_language_version: 3.3,
                uniform_locations: HashMap::new(),
                hidden_uniforms: HashSet::new(),
                query_result: Some(1),
                sync_status: SyncStatus::AlreadySignaled,
                debug_callback: None,
            }),
        }
    }

    /// Replace the exposed extension set.
    pub fn with_extensions(self, extensions: &[Extension]) -> Self {
        self.state.lock().extensions = extensions.iter().copied().collect();
        self
    }

    /// Expose one more extension.
    pub fn with_extension(self, extension: Extension) -> Self {
        self.state.lock().extensions.insert(extension);
        self
    }

    /// Override an integer limit.
    pub fn with_integer(self, pname: GLenum, value: i32) -> Self {
        self.state.lock().integers.insert(pname, value);
        self
    }

    /// Override the reported shading language version.
    pub fn with_shading_language_version(self, version: f32) -> Self {
        self.state.lock().shading_language_version = version;
        self
    }

    /// Make `uniform_location` report `name` as missing from every program.
    pub fn hide_uniform(&self, name: &str) {
        self.state.lock().hidden_uniforms.insert(name.to_string());
    }

    /// Mark the context as usable or lost.
    pub fn set_context_valid(&self, valid: bool) {
        self.state.lock().context_valid = valid;
    }

    /// Set the value returned by query reads (`None` = not yet available).
    pub fn set_query_result(&self, result: Option<u64>) {
        self.state.lock().query_result = result;
    }

    /// Set the status returned by fence waits.
    pub fn set_sync_status(&self, status: SyncStatus) {
        self.state.lock().sync_status = status;
    }

    /// Deliver a message through the installed debug callback, as a driver
    /// with debug output would.
    pub fn emit_debug_message(&self, message: &str) {
        let callback = self.state.lock().debug_callback.clone();
        if let Some(callback) = callback {
            callback(message);
        }
    }

    /// Returns true if a debug callback is installed.
    pub fn has_debug_callback(&self) -> bool {
        self.state.lock().debug_callback.is_some()
    }

    /// Number of times bindings were loaded.
    pub fn bindings_loaded(&self) -> u32 {
        self.state.lock().bindings_loaded
    }

    /// Snapshot of the recorded command stream.
    pub fn calls(&self) -> Vec<GlCall> {
        self.state.lock().calls.clone()
    }

    /// Take the recorded command stream, leaving it empty.
    pub fn take_calls(&self) -> Vec<GlCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// Discard the recorded command stream.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Snapshot of the recorded object creations.
    pub fn created(&self) -> Vec<Created> {
        self.state.lock().created.clone()
    }

    fn allocate(&self, make: impl FnOnce(u32) -> Created) -> GraphicsResult<u32> {
        let mut state = self.state.lock();
        if !state.context_valid {
            return Err(GraphicsError::ContextLost);
        }
        let name = state.next_name;
        state.next_name += 1;
        state.created.push(make(name));
        Ok(name)
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RecordingDriver")
            .field("calls", &state.calls.len())
            .field("context_valid", &state.context_valid)
            .field("extensions", &state.extensions)
            .finish_non_exhaustive()
    }
}

impl GlDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "Recording Driver"
    }

    fn load_bindings(&self) -> GraphicsResult<()> {
        let mut state = self.state.lock();
        if !state.context_valid {
            return Err(GraphicsError::InitializationFailed(
                "no current context to resolve entry points".to_string(),
            ));
        }
        state.bindings_loaded += 1;
        Ok(())
    }

    fn has_extension(&self, extension: Extension) -> bool {
        self.state.lock().extensions.contains(&extension)
    }

    fn get_integer(&self, pname: GLenum) -> i32 {
        self.state.lock().integers.get(&pname).copied().unwrap_or(0)
    }

    fn shading_language_version(&self) -> f32 {
        self.state.lock().shading_language_version
    }

    fn submit(&self, call: GlCall) {
        log::trace!("RecordingDriver: {:?}", call);
        self.state.lock().calls.push(call);
    }

    fn gen_buffer(&self) -> GraphicsResult<BufferHandle> {
        self.allocate(|n| Created::Buffer(BufferHandle(n)))
            .map(BufferHandle)
    }

    fn gen_texture(&self) -> GraphicsResult<TextureHandle> {
        self.allocate(|n| Created::Texture(TextureHandle(n)))
            .map(TextureHandle)
    }

    fn gen_framebuffer(&self) -> GraphicsResult<FramebufferHandle> {
        self.allocate(|n| Created::Framebuffer(FramebufferHandle(n)))
            .map(FramebufferHandle)
    }

    fn gen_query(&self) -> GraphicsResult<QueryHandle> {
        self.allocate(|n| Created::Query(QueryHandle(n)))
            .map(QueryHandle)
    }

    fn gen_vertex_array(&self) -> GraphicsResult<VertexArrayHandle> {
        self.allocate(|n| Created::VertexArray(VertexArrayHandle(n)))
            .map(VertexArrayHandle)
    }

    fn create_program(&self, source: &ProgramSource) -> GraphicsResult<ProgramHandle> {
        let source = source.clone();
        self.allocate(|n| Created::Program(ProgramHandle(n), source))
            .map(ProgramHandle)
    }

    fn uniform_location(&self, _program: ProgramHandle, name: &str) -> Option<i32> {
        let mut state = self.state.lock();
        if state.hidden_uniforms.contains(name) {
            return None;
        }
        let next = state.uniform_locations.len() as i32;
        Some(
            *state
                .uniform_locations
                .entry(name.to_string())
                .or_insert(next),
        )
    }

    fn fence_sync(&self) -> GraphicsResult<SyncHandle> {
        self.allocate(|n| Created::Sync(SyncHandle(u64::from(n))))
            .map(|n| SyncHandle(u64::from(n)))
    }

    fn client_wait_sync(&self, _sync: SyncHandle, _timeout_ns: u64) -> SyncStatus {
        let state = self.state.lock();
        if !state.context_valid {
            return SyncStatus::WaitFailed;
        }
        state.sync_status
    }

    fn query_result(&self, _query: QueryHandle, wait: bool) -> Option<u64> {
        let state = self.state.lock();
        match state.query_result {
            Some(result) => Some(result),
            // A blocking read on a stuck query reports nothing drawn.
            None if wait => Some(0),
            None => None,
        }
    }

    fn set_debug_callback(&self, callback: Option<DebugCallback>) {
        self.state.lock().debug_callback = callback.map(Arc::from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let driver = RecordingDriver::new();
        let a = driver.gen_buffer().unwrap();
        let b = driver.gen_buffer().unwrap();
        let t = driver.gen_texture().unwrap();
        assert_ne!(a, b);
        assert_ne!(a.0, t.0);
        assert!(!a.is_none());
    }

    #[test]
    fn test_lost_context_refuses_creation() {
        let driver = RecordingDriver::new();
        driver.set_context_valid(false);
        assert_eq!(driver.gen_buffer(), Err(GraphicsError::ContextLost));
        assert!(driver.load_bindings().is_err());

        driver.set_context_valid(true);
        assert!(driver.gen_buffer().is_ok());
    }

    #[test]
    fn test_uniform_locations_are_stable() {
        let driver = RecordingDriver::new();
        let first = driver.uniform_location(ProgramHandle(1), "$modelView");
        let other = driver.uniform_location(ProgramHandle(1), "$diffuseMap");
        let again = driver.uniform_location(ProgramHandle(7), "$modelView");
        assert_eq!(first, again);
        assert_ne!(first, other);

        driver.hide_uniform("$missing");
        assert_eq!(driver.uniform_location(ProgramHandle(1), "$missing"), None);
    }

    #[test]
    fn test_debug_callback_delivery() {
        let driver = RecordingDriver::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        driver.set_debug_callback(Some(Box::new(move |msg: &str| {
            sink.lock().push(msg.to_string());
        })));
        driver.emit_debug_message("buffer too small");
        assert_eq!(seen.lock().as_slice(), ["buffer too small".to_string()]);
    }

    #[test]
    fn test_erase_handles() {
        let call = GlCall::BindBuffer {
            target: gl::ARRAY_BUFFER,
            buffer: BufferHandle(12),
        };
        assert_eq!(
            call.erase_handles(),
            GlCall::BindBuffer {
                target: gl::ARRAY_BUFFER,
                buffer: BufferHandle::NONE,
            }
        );
    }
}
