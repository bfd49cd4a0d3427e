//! Render target selection, viewport and clip rect.

use glam::{Mat4, Vec3, Vec4};

use super::{GlDevice, PendingState};
use crate::driver::GlCall;
use crate::target::{RenderTarget, TargetRef};
use crate::types::RectI;

/// Orthographic projection mapping `clip` to clip space, with Y growing
/// downwards. An empty clip maps to identity.
fn clip_projection(clip: &RectI) -> Mat4 {
    if clip.is_empty() {
        return Mat4::IDENTITY;
    }
    let left = clip.point.x as f32;
    let right = (clip.point.x + clip.extent.x) as f32;
    let bottom = clip.extent.y as f32;
    let top = 0.0f32;
    let near = 0.0f32;
    let far = 1.0f32;

    let tx = -(right + left) / (right - left);
    let ty = -(top + bottom) / (top - bottom);
    let tz = -(far + near) / (far - near);

    let ortho = Mat4::from_cols(
        Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / (top - bottom), 0.0, 0.0),
        Vec4::new(0.0, 0.0, -2.0 / (far - near), 0.0),
        Vec4::new(tx, ty, tz, 1.0),
    );
    ortho * Mat4::from_translation(Vec3::new(0.0, -(clip.point.y as f32), 0.0))
}

impl GlDevice {
    /// Target drawing currently goes to.
    pub fn active_render_target(&self) -> Option<&TargetRef> {
        self.current_target.as_ref()
    }

    /// Route drawing to `target` and reset the viewport to cover it. Takes
    /// effect at the next flush.
    pub fn set_active_render_target(&mut self, target: impl Into<TargetRef>) {
        let target = target.into();
        if self
            .current_target
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&target))
        {
            return;
        }

        if self.deactivate_target.is_none() {
            self.deactivate_target = self.current_target.take();
        }
        let size = target.target().size();
        self.current_target = Some(target);
        self.pending |= PendingState::RENDER_TARGET;
        self.set_viewport(RectI::from_extent(size));
    }

    /// Save the current target and switch to `target`.
    pub fn push_active_render_target(&mut self, target: impl Into<TargetRef>) {
        if let Some(current) = self.current_target.clone() {
            self.target_stack.push(current);
        }
        self.set_active_render_target(target);
    }

    /// Return to the target saved by the matching push.
    pub fn pop_active_render_target(&mut self) {
        let previous = self.target_stack.pop();
        assert!(
            previous.is_some(),
            "pop_active_render_target: render target stack is empty"
        );
        if let Some(previous) = previous {
            self.set_active_render_target(previous);
        }
    }

    /// Depth of the render target stack.
    pub fn render_target_stack_depth(&self) -> usize {
        self.target_stack.len()
    }

    /// Current viewport.
    pub fn viewport(&self) -> RectI {
        self.viewport
    }

    /// Set the viewport; applied at the next flush.
    pub fn set_viewport(&mut self, rect: RectI) {
        if self.viewport != rect {
            self.viewport = rect;
            self.pending |= PendingState::VIEWPORT;
        }
    }

    /// Effective clip rect of the last [`GlDevice::set_clip_rect`].
    pub fn clip_rect(&self) -> RectI {
        self.clip
    }

    /// Restrict 2D drawing to `rect`, clamped to the active target.
    ///
    /// Sets an orthographic projection mapping the clamped rect onto the
    /// viewport with Y growing downwards, resets view and world to identity
    /// and sets the viewport to the clamped rect.
    pub fn set_clip_rect(&mut self, rect: RectI) {
        let target = self.current_target.as_ref();
        assert!(
            target.is_some(),
            "set_clip_rect: a render target must be set before any rendering operation"
        );
        let size = target.map(|t| t.target().size()).unwrap_or_default();

        self.clip = rect.intersect(&RectI::from_extent(size));
        self.projection = clip_projection(&self.clip);
        self.view = Mat4::IDENTITY;
        self.world = Mat4::IDENTITY;
        self.set_viewport(self.clip);
    }

    /// Activate the current target if it changed or has pending
    /// attachments, then apply a changed viewport.
    pub(super) fn update_render_targets(&mut self) {
        if let Some(current) = self.current_target.clone() {
            if self.pending.contains(PendingState::RENDER_TARGET)
                || current.target().is_pending_state()
            {
                if let Some(previous) = self.deactivate_target.take() {
                    previous.target().deactivate();
                }
                self.stats.render_target_changes =
                    self.stats.render_target_changes.wrapping_add(1);

                match &current {
                    TargetRef::Texture(target) => {
                        target.apply_state();
                        target.make_active();
                    }
                    TargetRef::Window(window) => {
                        window.make_active();
                        if self.bound_context != Some(window.context()) {
                            log::debug!("Switched to context {:?}", window.context());
                            self.bound_context = Some(window.context());
                            // A different context keeps its own state.
                            self.cache.invalidate();
                            self.mark_all_dirty();
                            self.pending.remove(PendingState::RENDER_TARGET);
                            self.apply_states();
                        }
                    }
                }
                self.pending.remove(PendingState::RENDER_TARGET);
            }
        }

        if self.pending.contains(PendingState::VIEWPORT) {
            let rect = self.viewport;
            self.driver.submit(GlCall::Viewport {
                x: rect.point.x,
                y: rect.point.y,
                width: rect.extent.x,
                height: rect.extent.y,
            });
            self.pending.remove(PendingState::VIEWPORT);
        }
    }

    /// Reconcile every piece of device-global state.
    pub(super) fn update_states(&mut self) {
        self.update_render_targets();
        self.apply_states();
    }

    /// Apply a changed state block and changed texture units.
    pub(super) fn apply_states(&mut self) {
        let driver = self.driver.clone();

        if self.pending.contains(PendingState::STATE_BLOCK) {
            let block = self.state_block.clone();
            let unchanged = self
                .applied_state_block
                .as_ref()
                .is_some_and(|applied| std::sync::Arc::ptr_eq(applied, &block));
            if !unchanged {
                block.activate(self.applied_state_block.as_deref(), driver.as_ref());
                self.applied_state_block = Some(block);
            }
        }

        if self.pending.contains(PendingState::TEXTURES) {
            let mut units = std::mem::take(&mut self.dirty_units);
            while units != 0 {
                let unit = units.trailing_zeros();
                units &= units - 1;
                match &self.textures[unit as usize] {
                    Some(texture) => texture.bind(unit, &mut self.cache),
                    None => {
                        self.cache.unbind_unit(unit, driver.as_ref());
                    }
                }
            }
        }

        self.pending
            .remove(PendingState::STATE_BLOCK | PendingState::TEXTURES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2I;

    #[test]
    fn test_clip_projection_maps_corners() {
        let clip = RectI::new(0, 0, 200, 100);
        let proj = clip_projection(&clip);

        let top_left = proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = proj * Vec4::new(200.0, 100.0, 0.0, 1.0);
        assert!(top_left.truncate().abs_diff_eq(Vec3::new(-1.0, 1.0, -1.0), 1e-6));
        assert!(bottom_right.truncate().abs_diff_eq(Vec3::new(1.0, -1.0, -1.0), 1e-6));
    }

    #[test]
    fn test_clip_projection_of_empty_rect_is_identity() {
        let proj = clip_projection(&RectI::new(640, 480, 0, 0));
        assert_eq!(proj, Mat4::IDENTITY);
        assert!(proj.is_finite());
    }

    #[test]
    fn test_clip_projection_offsets_origin() {
        let clip = RectI::new(10, 20, 100, 50);
        let proj = clip_projection(&clip);

        let origin = proj * Vec4::new(10.0, 20.0, 0.0, 1.0);
        assert!((origin.x + 1.0).abs() < 1e-6);
        assert!((origin.y - 1.0).abs() < 1e-6);
        assert_eq!(RectI::from_extent(Point2I::new(4, 4)), RectI::new(0, 0, 4, 4));
    }
}
