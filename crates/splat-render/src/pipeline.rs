//! Pipeline-variant selection and lazy, cached resolution (§4.6).

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::backend::{BackendError, GraphicsBackend, PipelineHandle};

/// The two draw strategies the frame encoder can choose between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineVariant {
    /// One vertex + one fragment shader; writes only the nearest splat's
    /// depth. Used whenever continuous depth is not required.
    SingleStage,
    /// initialize -> draw -> postprocess over tile imageblock memory,
    /// producing alpha-weighted continuous depth.
    MultiStage,
}

impl PipelineVariant {
    /// The selection rule of §4.6 / §4.5 step 10: multi-stage only when a
    /// depth target is attached, high-quality depth was requested, the
    /// backend supports tile imageblock memory, and the target is not a
    /// simulator.
    pub fn select(
        has_depth_target: bool,
        high_quality_depth: bool,
        backend: &dyn GraphicsBackend,
    ) -> Self {
        let wants_multi_stage = has_depth_target && high_quality_depth;
        if wants_multi_stage && backend.supports_tile_imageblock() && !backend.is_simulator() {
            PipelineVariant::MultiStage
        } else {
            PipelineVariant::SingleStage
        }
    }
}

/// Lazily resolves and caches one [`PipelineHandle`] per [`PipelineVariant`].
#[derive(Default)]
pub struct PipelineCache {
    handles: Mutex<HashMap<PipelineVariant, PipelineHandle>>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `variant`, compiling through `backend` only the first time
    /// it's requested.
    pub fn resolve(
        &self,
        variant: PipelineVariant,
        backend: &dyn GraphicsBackend,
    ) -> Result<PipelineHandle, BackendError> {
        if let Some(handle) = self.handles.lock().get(&variant).copied() {
            return Ok(handle);
        }
        let handle = backend.compile_pipeline(variant)?;
        self.handles.lock().insert(variant, handle);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingBackend {
        compiles: AtomicU64,
        tile_support: bool,
        simulator: bool,
    }

    impl GraphicsBackend for CountingBackend {
        fn compile_pipeline(&self, _variant: PipelineVariant) -> Result<PipelineHandle, BackendError> {
            let id = self.compiles.fetch_add(1, Ordering::SeqCst);
            Ok(PipelineHandle(id))
        }
        fn supports_tile_imageblock(&self) -> bool {
            self.tile_support
        }
        fn is_simulator(&self) -> bool {
            self.simulator
        }
    }

    #[test]
    fn no_depth_target_selects_single_stage() {
        let backend = CountingBackend {
            compiles: AtomicU64::new(0),
            tile_support: true,
            simulator: false,
        };
        assert_eq!(PipelineVariant::select(false, true, &backend), PipelineVariant::SingleStage);
    }

    #[test]
    fn depth_without_high_quality_selects_single_stage() {
        let backend = CountingBackend {
            compiles: AtomicU64::new(0),
            tile_support: true,
            simulator: false,
        };
        assert_eq!(PipelineVariant::select(true, false, &backend), PipelineVariant::SingleStage);
    }

    #[test]
    fn high_quality_depth_selects_multi_stage_when_supported() {
        let backend = CountingBackend {
            compiles: AtomicU64::new(0),
            tile_support: true,
            simulator: false,
        };
        assert_eq!(PipelineVariant::select(true, true, &backend), PipelineVariant::MultiStage);
    }

    #[test]
    fn simulator_never_gets_multi_stage() {
        let backend = CountingBackend {
            compiles: AtomicU64::new(0),
            tile_support: true,
            simulator: true,
        };
        assert_eq!(PipelineVariant::select(true, true, &backend), PipelineVariant::SingleStage);
    }

    #[test]
    fn cache_compiles_each_variant_once() {
        let backend = CountingBackend {
            compiles: AtomicU64::new(0),
            tile_support: true,
            simulator: false,
        };
        let cache = PipelineCache::new();
        let a = cache.resolve(PipelineVariant::SingleStage, &backend).unwrap();
        let b = cache.resolve(PipelineVariant::SingleStage, &backend).unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.compiles.load(Ordering::SeqCst), 1);
    }
}
