//! GPU resource lifetime tracking.
//!
//! Every object backed by a native handle (buffers, textures, targets,
//! queries, fences, shaders) is created through the device and registered in
//! its [`ResourceRegistry`]. When the native context is lost the device
//! zombifies every registered resource (native handle released, description
//! kept) and resurrects them once a context is available again.
//!
//! Resources are owned by `Arc`s handed to callers; the registry only holds
//! weak references. A resource unregisters itself before it deletes its
//! native object on drop.

mod registry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::driver::{BufferHandle, GlDriver, TextureHandle};
use crate::error::GraphicsResult;

pub use registry::ResourceRegistry;

/// Unique identifier of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VertexBuffer,
    PrimitiveBuffer,
    Texture,
    Cubemap,
    TextureTarget,
    WindowTarget,
    OcclusionQuery,
    Fence,
    Shader,
}

/// Capability shared by every GPU-backed resource.
pub trait GpuResource: Send + Sync {
    /// Registry identifier.
    fn id(&self) -> ResourceId;

    /// Resource kind.
    fn kind(&self) -> ResourceKind;

    /// Release the native object, keeping enough description to recreate it.
    /// Calling it on a zombie is a no-op.
    fn zombify(&self);

    /// Recreate the native object from the kept description. A live resource
    /// is left untouched. On failure the resource stays a zombie.
    fn resurrect(&self) -> GraphicsResult<()>;

    /// Returns true while the resource holds no native object.
    fn is_zombie(&self) -> bool;

    /// Logical description, independent of native handle identity.
    fn describe(&self) -> String;
}

/// A native object name whose deletion the binding cache must learn about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetiredName {
    Buffer(BufferHandle),
    Texture(TextureHandle),
}

/// Device state shared with the resources it created.
pub(crate) struct DeviceShared {
    driver: Arc<dyn GlDriver>,
    registry: Mutex<ResourceRegistry>,
    next_id: AtomicU64,
    retired: Mutex<Vec<RetiredName>>,
}

impl DeviceShared {
    pub fn new(driver: Arc<dyn GlDriver>) -> Arc<Self> {
        Arc::new(Self {
            driver,
            registry: Mutex::new(ResourceRegistry::new()),
            next_id: AtomicU64::new(1),
            retired: Mutex::new(Vec::new()),
        })
    }

    pub fn driver(&self) -> &Arc<dyn GlDriver> {
        &self.driver
    }

    /// Allocate an id and a link for a resource about to be created.
    pub fn link(self: &Arc<Self>) -> ResourceLink {
        let id = ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        ResourceLink {
            id,
            shared: Arc::downgrade(self),
            driver: self.driver.clone(),
        }
    }

    /// Insert a freshly created resource into the registry.
    pub fn register<R: GpuResource + 'static>(&self, resource: &Arc<R>) {
        let weak: Weak<R> = Arc::downgrade(resource);
        let weak: Weak<dyn GpuResource> = weak;
        self.registry.lock().register(resource.id(), weak);
        log::trace!("Registered {:?} {}", resource.kind(), resource.id());
    }

    /// Live resources, newest first.
    ///
    /// The registry lock is released before the caller touches any resource,
    /// so a resource dropped during iteration can unregister itself.
    pub fn resources(&self) -> Vec<Arc<dyn GpuResource>> {
        self.registry.lock().snapshot()
    }

    pub fn resource_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_registered(&self, id: ResourceId) -> bool {
        self.registry.lock().contains(id)
    }

    /// Zombify every registered resource.
    pub fn zombify_all(&self) -> usize {
        let resources = self.resources();
        for resource in &resources {
            resource.zombify();
        }
        resources.len()
    }

    /// Resurrect every registered resource. Returns the number of resources
    /// that stayed zombies.
    pub fn resurrect_all(&self) -> usize {
        let mut failures = 0;
        for resource in self.resources() {
            if let Err(e) = resource.resurrect() {
                log::warn!(
                    "Failed to resurrect {:?} {}: {}",
                    resource.kind(),
                    resource.id(),
                    e
                );
                failures += 1;
            }
        }
        failures
    }

    fn unregister(&self, id: ResourceId) {
        self.registry.lock().unregister(id);
    }

    fn retire(&self, name: RetiredName) {
        self.retired.lock().push(name);
    }

    /// Names deleted since the last call.
    pub fn take_retired(&self) -> Vec<RetiredName> {
        std::mem::take(&mut *self.retired.lock())
    }
}

/// A resource's connection to the device that created it.
pub(crate) struct ResourceLink {
    id: ResourceId,
    shared: Weak<DeviceShared>,
    driver: Arc<dyn GlDriver>,
}

impl ResourceLink {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn driver(&self) -> &dyn GlDriver {
        self.driver.as_ref()
    }

    /// Remove the owning resource from the registry. Safe to call twice.
    pub fn unregister(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.unregister(self.id);
        }
    }

    /// Report a deleted native name to the device's binding cache.
    pub fn retire(&self, name: RetiredName) {
        if let Some(shared) = self.shared.upgrade() {
            shared.retire(name);
        }
    }
}

impl std::fmt::Debug for ResourceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLink").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use crate::error::GraphicsError;
    use std::sync::atomic::AtomicBool;

    struct DummyResource {
        link: ResourceLink,
        zombie: AtomicBool,
        fail_resurrect: AtomicBool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl GpuResource for DummyResource {
        fn id(&self) -> ResourceId {
            self.link.id()
        }
        fn kind(&self) -> ResourceKind {
            ResourceKind::Fence
        }
        fn zombify(&self) {
            if !self.zombie.swap(true, Ordering::SeqCst) {
                self.log.lock().push(format!("zombify {}", self.id()));
            }
        }
        fn resurrect(&self) -> GraphicsResult<()> {
            if self.fail_resurrect.load(Ordering::SeqCst) {
                return Err(GraphicsError::ContextLost);
            }
            if self.zombie.swap(false, Ordering::SeqCst) {
                self.log.lock().push(format!("resurrect {}", self.id()));
            }
            Ok(())
        }
        fn is_zombie(&self) -> bool {
            self.zombie.load(Ordering::SeqCst)
        }
        fn describe(&self) -> String {
            format!("dummy {}", self.id())
        }
    }

    impl Drop for DummyResource {
        fn drop(&mut self) {
            self.link.unregister();
        }
    }

    fn dummy(shared: &Arc<DeviceShared>, log: &Arc<Mutex<Vec<String>>>) -> Arc<DummyResource> {
        let dummy = Arc::new(DummyResource {
            link: shared.link(),
            zombie: AtomicBool::new(false),
            fail_resurrect: AtomicBool::new(false),
            log: log.clone(),
        });
        shared.register(&dummy);
        dummy
    }

    #[test]
    fn test_walk_is_newest_first() {
        let shared = DeviceShared::new(Arc::new(RecordingDriver::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = dummy(&shared, &log);
        let b = dummy(&shared, &log);

        assert_eq!(shared.zombify_all(), 2);
        assert_eq!(
            log.lock().as_slice(),
            [format!("zombify {}", b.id()), format!("zombify {}", a.id())]
        );
    }

    #[test]
    fn test_zombify_is_idempotent() {
        let shared = DeviceShared::new(Arc::new(RecordingDriver::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = dummy(&shared, &log);

        shared.zombify_all();
        shared.zombify_all();
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_drop_unregisters() {
        let shared = DeviceShared::new(Arc::new(RecordingDriver::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = dummy(&shared, &log);
        let id = a.id();
        assert!(shared.is_registered(id));

        drop(a);
        assert!(!shared.is_registered(id));
        assert_eq!(shared.resource_count(), 0);
    }

    #[test]
    fn test_resurrect_failure_is_local() {
        let shared = DeviceShared::new(Arc::new(RecordingDriver::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = dummy(&shared, &log);
        let b = dummy(&shared, &log);
        b.fail_resurrect.store(true, Ordering::SeqCst);

        shared.zombify_all();
        assert_eq!(shared.resurrect_all(), 1);
        assert!(!a.is_zombie());
        assert!(b.is_zombie());

        b.fail_resurrect.store(false, Ordering::SeqCst);
        assert_eq!(shared.resurrect_all(), 0);
        assert!(!b.is_zombie());
    }
}
