//! Occlusion queries and fences.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::gl;
use crate::driver::{GlCall, QueryHandle, SyncHandle, SyncStatus};
use crate::error::GraphicsResult;
use crate::resource::{DeviceShared, GpuResource, ResourceId, ResourceKind, ResourceLink};

/// Result of an occlusion query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcclusionQueryStatus {
    /// No query has been issued.
    Unset,
    /// The result is not available yet.
    Waiting,
    /// No samples passed.
    Occluded,
    /// At least one sample passed.
    NotOccluded,
    /// The query could not be issued.
    Error,
}

#[derive(Debug)]
struct QueryState {
    handle: QueryHandle,
    zombie: bool,
    active: bool,
    issued: bool,
}

/// Counts the samples that pass depth testing between `begin` and `end`.
#[derive(Debug)]
pub struct OcclusionQuery {
    link: ResourceLink,
    state: Mutex<QueryState>,
}

impl OcclusionQuery {
    pub(crate) fn create(shared: &Arc<DeviceShared>) -> GraphicsResult<Arc<Self>> {
        let link = shared.link();
        let handle = link.driver().gen_query()?;
        let query = Arc::new(Self {
            link,
            state: Mutex::new(QueryState {
                handle,
                zombie: false,
                active: false,
                issued: false,
            }),
        });
        shared.register(&query);
        Ok(query)
    }

    /// Start counting. Returns false if the query could not be started.
    pub fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.zombie || state.active {
            return false;
        }
        self.link.driver().submit(GlCall::BeginQuery {
            target: gl::SAMPLES_PASSED,
            query: state.handle,
        });
        state.active = true;
        true
    }

    /// Stop counting.
    pub fn end(&self) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }
        self.link.driver().submit(GlCall::EndQuery(gl::SAMPLES_PASSED));
        state.active = false;
        state.issued = true;
    }

    /// Poll the result. With `block` the call waits for it. The sample count
    /// is returned alongside when available.
    pub fn status(&self, block: bool) -> (OcclusionQueryStatus, Option<u64>) {
        let state = self.state.lock();
        if state.zombie {
            return (OcclusionQueryStatus::Error, None);
        }
        if !state.issued {
            return (OcclusionQueryStatus::Unset, None);
        }
        match self.link.driver().query_result(state.handle, block) {
            None => (OcclusionQueryStatus::Waiting, None),
            Some(0) => (OcclusionQueryStatus::Occluded, Some(0)),
            Some(samples) => (OcclusionQueryStatus::NotOccluded, Some(samples)),
        }
    }
}

impl GpuResource for OcclusionQuery {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::OcclusionQuery
    }

    fn zombify(&self) {
        let mut state = self.state.lock();
        if state.zombie {
            return;
        }
        self.link.driver().submit(GlCall::DeleteQuery(state.handle));
        state.handle = QueryHandle::NONE;
        state.zombie = true;
        state.active = false;
        state.issued = false;
    }

    fn resurrect(&self) -> GraphicsResult<()> {
        let mut state = self.state.lock();
        if !state.zombie {
            return Ok(());
        }
        state.handle = self.link.driver().gen_query()?;
        state.zombie = false;
        Ok(())
    }

    fn is_zombie(&self) -> bool {
        self.state.lock().zombie
    }

    fn describe(&self) -> String {
        "OcclusionQuery".to_string()
    }
}

impl Drop for OcclusionQuery {
    fn drop(&mut self) {
        self.link.unregister();
        let state = self.state.get_mut();
        if !state.zombie {
            self.link.driver().submit(GlCall::DeleteQuery(state.handle));
        }
    }
}

/// Progress of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceStatus {
    /// Not issued.
    Unset,
    /// Issued, not reached by the GPU yet.
    Pending,
    /// Reached by the GPU.
    Processed,
}

/// How a fence is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceKind {
    /// Native sync object.
    Sync,
    /// Full pipeline flush; used when sync objects are unavailable.
    General,
}

#[derive(Debug)]
struct FenceState {
    sync: SyncHandle,
    issued: bool,
    processed: bool,
    zombie: bool,
}

/// CPU/GPU synchronisation point.
#[derive(Debug)]
pub struct Fence {
    link: ResourceLink,
    kind: FenceKind,
    state: Mutex<FenceState>,
}

impl Fence {
    pub(crate) fn create(shared: &Arc<DeviceShared>, kind: FenceKind) -> Arc<Self> {
        let fence = Arc::new(Self {
            link: shared.link(),
            kind,
            state: Mutex::new(FenceState {
                sync: SyncHandle::NONE,
                issued: false,
                processed: false,
                zombie: false,
            }),
        });
        shared.register(&fence);
        fence
    }

    /// Implementation kind.
    pub fn fence_kind(&self) -> FenceKind {
        self.kind
    }

    fn release_sync(&self, state: &mut FenceState) {
        if !state.sync.is_none() {
            self.link.driver().submit(GlCall::DeleteSync(state.sync));
            state.sync = SyncHandle::NONE;
        }
    }

    /// Insert the fence into the command stream, replacing any earlier one.
    pub fn issue(&self) {
        let mut state = self.state.lock();
        if state.zombie {
            return;
        }
        self.release_sync(&mut state);
        state.processed = false;

        match self.kind {
            FenceKind::Sync => match self.link.driver().fence_sync() {
                Ok(sync) => {
                    state.sync = sync;
                    state.issued = true;
                }
                Err(e) => {
                    log::warn!("Failed to issue fence {}: {}", self.link.id(), e);
                    state.issued = false;
                }
            },
            FenceKind::General => {
                self.link.driver().submit(GlCall::Flush);
                state.issued = true;
            }
        }
    }

    /// Poll without blocking.
    pub fn status(&self) -> FenceStatus {
        let mut state = self.state.lock();
        if !state.issued {
            return FenceStatus::Unset;
        }
        if state.processed {
            return FenceStatus::Processed;
        }
        match self.kind {
            FenceKind::Sync => match self.link.driver().client_wait_sync(state.sync, 0) {
                SyncStatus::AlreadySignaled | SyncStatus::ConditionSatisfied => {
                    state.processed = true;
                    FenceStatus::Processed
                }
                SyncStatus::TimeoutExpired => FenceStatus::Pending,
                SyncStatus::WaitFailed => FenceStatus::Unset,
            },
            FenceKind::General => FenceStatus::Pending,
        }
    }

    /// Wait until the GPU reaches the fence.
    pub fn block(&self) {
        let mut state = self.state.lock();
        if !state.issued || state.processed {
            return;
        }
        match self.kind {
            FenceKind::Sync => {
                let result = self.link.driver().client_wait_sync(state.sync, u64::MAX);
                if result == SyncStatus::WaitFailed {
                    log::warn!("Wait on fence {} failed", self.link.id());
                    return;
                }
            }
            FenceKind::General => self.link.driver().submit(GlCall::Finish),
        }
        state.processed = true;
    }
}

impl GpuResource for Fence {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Fence
    }

    fn zombify(&self) {
        let mut state = self.state.lock();
        if state.zombie {
            return;
        }
        self.release_sync(&mut state);
        state.issued = false;
        state.processed = false;
        state.zombie = true;
    }

    // Nothing to recreate: the fence comes back unset.
    fn resurrect(&self) -> GraphicsResult<()> {
        self.state.lock().zombie = false;
        Ok(())
    }

    fn is_zombie(&self) -> bool {
        self.state.lock().zombie
    }

    fn describe(&self) -> String {
        format!("Fence {:?}", self.kind)
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        self.link.unregister();
        let state = self.state.get_mut();
        if !state.sync.is_none() {
            self.link.driver().submit(GlCall::DeleteSync(state.sync));
        }
    }
}

static_assertions::assert_impl_all!(OcclusionQuery: Send, Sync);
static_assertions::assert_impl_all!(Fence: Send, Sync);
