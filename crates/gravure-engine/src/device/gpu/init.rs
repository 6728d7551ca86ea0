/// Initialization parameters for the headless wgpu context.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Adapter preference.
    pub power_preference: wgpu::PowerPreference,

    /// Use a software adapter even when hardware is present.
    pub force_fallback_adapter: bool,

    /// Required wgpu features, on top of the timer features requested by
    /// `timers`.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    ///
    /// The scratch buffer grows on demand, so storage buffer limits bound the
    /// largest scene that can be rendered.
    pub required_limits: wgpu::Limits,

    /// Request timestamp queries when the adapter supports them.
    pub timers: bool,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            timers: true,
        }
    }
}

/// Features needed for `Device::new_timer`.
pub(crate) const TIMER_FEATURES: wgpu::Features =
    wgpu::Features::TIMESTAMP_QUERY.union(wgpu::Features::TIMESTAMP_QUERY_INSIDE_ENCODERS);
