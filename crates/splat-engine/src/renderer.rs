//! Public facade wiring the chunk store, async sorter, and frame encoder
//! into the single `Renderer` entry point (§2, §6).

use std::sync::Arc;

use splat_core::ChunkId;
use splat_gpu::GpuDevice;
use splat_render::{CommandBuffer, FrameEncoder, FrameEncoderConfig, GraphicsBackend, ViewportDesc};
use splat_sort::AsyncSorter;
use splat_store::{ChunkStore, EnabledSetPublisher, SplatChunk};
use tracing::info;

use crate::config::RendererConfig;
use crate::error::Result;

/// Owns the chunk store, the asynchronous sorter, and the per-frame
/// encoder, and exposes the chunk-lifecycle and `render()` surface a
/// caller actually needs (§2's seven components, minus the external
/// `GraphicsBackend`/`GpuDevice` collaborators this type is handed).
pub struct Renderer {
    store: Arc<ChunkStore>,
    sorter: Arc<AsyncSorter>,
    encoder: FrameEncoder,
    config: RendererConfig,
}

impl Renderer {
    /// Build a renderer against `device` (buffer allocation) and `backend`
    /// (pipeline compilation and command recording), both external
    /// collaborators supplied by the caller (§1).
    pub fn new(device: Arc<dyn GpuDevice>, backend: Arc<dyn GraphicsBackend>, config: RendererConfig) -> Result<Self> {
        let sorter = AsyncSorter::new(device.clone(), config.sort_by_distance);
        let publisher: Arc<dyn EnabledSetPublisher> = Arc::new(sorter.clone());
        let store = Arc::new(ChunkStore::new(config.max_simultaneous_renders, publisher));

        let encoder_config = FrameEncoderConfig {
            high_quality_depth: config.high_quality_depth,
            max_indexed_splat_count: config.max_indexed_splat_count,
        };
        let encoder = FrameEncoder::new(
            store.clone(),
            sorter.clone(),
            backend,
            device,
            config.max_simultaneous_renders,
            encoder_config,
        )?;

        info!(
            max_simultaneous_renders = config.max_simultaneous_renders,
            sort_by_distance = config.sort_by_distance,
            high_quality_depth = config.high_quality_depth,
            "renderer constructed"
        );

        Ok(Self {
            store,
            sorter,
            encoder,
            config,
        })
    }

    /// Add a chunk (optionally locality-presorted), returning its id.
    pub fn add_chunk(&self, chunk: SplatChunk, sort_locality: bool) -> ChunkId {
        self.store.add_chunk(chunk, sort_locality)
    }

    /// Remove a chunk. Suspends until any in-flight render completes and
    /// no other exclusive-access holder is ahead of it (§4.3).
    pub fn remove_chunk(&self, id: ChunkId) {
        self.store.remove_chunk(id);
    }

    /// Remove every chunk.
    pub fn remove_all(&self) {
        self.store.remove_all();
    }

    /// Toggle a chunk's enabled flag.
    pub fn set_chunk_enabled(&self, id: ChunkId, on: bool) {
        self.store.set_enabled(id, on);
    }

    /// Whether `id` is currently enabled (no synchronization guarantee
    /// against a concurrent mutation, as the underlying store documents).
    pub fn is_chunk_enabled(&self, id: ChunkId) -> bool {
        self.store.is_enabled(id)
    }

    /// Sum of splat counts over every currently enabled chunk.
    pub fn splat_count(&self) -> usize {
        self.store.splat_count()
    }

    /// Change the sorter's depth metric for subsequent sorts.
    pub fn set_sort_by_distance(&self, on: bool) {
        self.sorter.set_sort_by_distance(on);
    }

    /// The configuration this renderer was built with.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Encode one frame. `viewports` is truncated to
    /// [`RendererConfig::clamped_view_count`] if it exceeds it. Returns
    /// `false` if the frame was dropped — the caller must not submit `cmd`
    /// or present a result (§6).
    pub fn render(&self, viewports: &[ViewportDesc], has_depth_target: bool, cmd: &mut dyn CommandBuffer) -> bool {
        let max = self.config.clamped_view_count() as usize;
        let viewports = if viewports.len() > max { &viewports[..max] } else { viewports };
        self.encoder
            .render(viewports, has_depth_target, self.config.access_timeout, self.config.sort_timeout, cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Quat, Vec3};
    use splat_core::{CameraPose, Color, Opacity, Scale, ScenePoint};
    use splat_gpu::HostDevice;
    use splat_render::testing::{NullBackend, RecordingCommandBuffer};
    use splat_render::ViewportRect;
    use std::thread;
    use std::time::Duration;

    fn sample_chunk(n: usize) -> SplatChunk {
        let points: Vec<_> = (0..n)
            .map(|i| ScenePoint {
                position: Vec3::new(i as f32, 0.0, 0.0),
                color: Color::SrgbU8([4, 5, 6]),
                opacity: Opacity::Linear(1.0),
                scale: Scale::Linear(Vec3::ONE),
                rotation: Quat::IDENTITY,
            })
            .collect();
        SplatChunk::new(HostDevice::unbounded(), &points).unwrap()
    }

    fn sample_viewport() -> ViewportDesc {
        ViewportDesc {
            rect: ViewportRect {
                x: 0.0,
                y: 0.0,
                width: 640.0,
                height: 480.0,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            screen_size: (640, 480),
            camera: CameraPose::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z),
        }
    }

    fn new_renderer(config: RendererConfig) -> Renderer {
        let backend: Arc<dyn GraphicsBackend> = Arc::new(NullBackend::new());
        Renderer::new(HostDevice::unbounded(), backend, config).unwrap()
    }

    #[test]
    fn truncates_viewports_to_implementation_maximum() {
        let renderer = new_renderer(RendererConfig::default());
        renderer.add_chunk(sample_chunk(3), false);

        let viewports = [sample_viewport(), sample_viewport(), sample_viewport()];
        let mut cmd = RecordingCommandBuffer::new();
        // Three viewports requested, clamped to 2; the call must not panic
        // on an over-long viewport slice and must still attempt a render.
        renderer.render(&viewports, false, &mut cmd);
    }

    #[test]
    fn in_flight_render_suspends_exclusive_access_until_completion() {
        let config = RendererConfig {
            max_simultaneous_renders: 1,
            access_timeout: Duration::from_millis(200),
            sort_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let renderer = Arc::new(new_renderer(config));
        let id = renderer.add_chunk(sample_chunk(5), false);

        let mut cmd = RecordingCommandBuffer::new();
        let viewport = sample_viewport();
        assert!(renderer.render(&[viewport], false, &mut cmd));

        let waiter = Arc::clone(&renderer);
        let handle = thread::spawn(move || {
            waiter.remove_chunk(id);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished(), "remove_chunk must suspend while a render is still in flight");

        cmd.complete();
        handle.join().unwrap();
        assert_eq!(renderer.splat_count(), 0);
    }

    #[test]
    fn chunk_lifecycle_round_trips() {
        let renderer = new_renderer(RendererConfig::default());
        let id = renderer.add_chunk(sample_chunk(4), false);
        assert!(renderer.is_chunk_enabled(id));
        assert_eq!(renderer.splat_count(), 4);

        renderer.set_chunk_enabled(id, false);
        assert!(!renderer.is_chunk_enabled(id));
        assert_eq!(renderer.splat_count(), 0);

        renderer.remove_all();
        assert_eq!(renderer.splat_count(), 0);
    }
}
