//! Renderer configuration surface (§6 Configuration table).
//!
//! Constructed programmatically only — there is no CLI, file, or
//! environment-variable surface (§6's closing line); a caller embeds this
//! in its own app config however it likes.

use std::time::Duration;

/// Hard implementation ceiling on simultaneous viewports (stereo only),
/// independent of whatever a caller requests via `max_view_count` (§6).
pub const IMPLEMENTATION_MAX_VIEW_COUNT: u32 = 2;

/// Render-target color format. Informational only: a real backend
/// interprets it when creating the actual attachment; this crate never
/// allocates a texture itself (§1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorFormat {
    #[default]
    Bgra8Unorm,
    Rgba16Float,
}

/// Render-target depth format, as [`ColorFormat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DepthFormat {
    #[default]
    Depth32Float,
    Depth16Unorm,
}

/// Every tunable named in §6's Configuration table, plus the `access_timeout`
/// / `sort_timeout` pair §4.5 and §5 default to 100 ms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    /// Upper bound on per-frame viewports, clamped to
    /// [`IMPLEMENTATION_MAX_VIEW_COUNT`] by [`Self::clamped_view_count`].
    pub max_view_count: u32,
    /// Upper bound on in-flight GPU frames and uniform ring length.
    pub max_simultaneous_renders: usize,
    pub color_format: ColorFormat,
    pub depth_format: DepthFormat,
    pub sample_count: u32,
    /// Selects the multi-stage pipeline when a depth target is attached
    /// and the backend supports it (§4.6).
    pub high_quality_depth: bool,
    pub clear_color: [f32; 4],
    /// Depth metric: euclidean² distance (`true`, the default) vs.
    /// forward-dot projection (`false`).
    pub sort_by_distance: bool,
    /// Indexing/instancing crossover (§4.5 step 6).
    pub max_indexed_splat_count: u32,
    /// How long `render()` sleep-polls for a render slot before dropping
    /// the frame (§4.3, §5).
    pub access_timeout: Duration,
    /// How long `render()` sleep-polls for a sorted index buffer before
    /// dropping the frame (§4.4, §5).
    pub sort_timeout: Duration,
}

impl RendererConfig {
    /// `max_view_count` clamped to the implementation maximum and floored
    /// at 1 (§6).
    pub fn clamped_view_count(&self) -> u32 {
        self.max_view_count.clamp(1, IMPLEMENTATION_MAX_VIEW_COUNT)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_view_count: IMPLEMENTATION_MAX_VIEW_COUNT,
            max_simultaneous_renders: 3,
            color_format: ColorFormat::default(),
            depth_format: DepthFormat::default(),
            sample_count: 1,
            high_quality_depth: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            sort_by_distance: true,
            max_indexed_splat_count: splat_core::MAX_INDEXED_SPLAT_COUNT,
            access_timeout: Duration::from_millis(100),
            sort_timeout: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_count_clamps_to_implementation_maximum() {
        let config = RendererConfig {
            max_view_count: 9,
            ..Default::default()
        };
        assert_eq!(config.clamped_view_count(), IMPLEMENTATION_MAX_VIEW_COUNT);
    }

    #[test]
    fn view_count_floors_at_one() {
        let config = RendererConfig {
            max_view_count: 0,
            ..Default::default()
        };
        assert_eq!(config.clamped_view_count(), 1);
    }

    #[test]
    fn defaults_match_spec_values() {
        let config = RendererConfig::default();
        assert!(config.sort_by_distance);
        assert_eq!(config.max_indexed_splat_count, 1024);
        assert_eq!(config.access_timeout, Duration::from_millis(100));
        assert_eq!(config.sort_timeout, Duration::from_millis(100));
    }
}
