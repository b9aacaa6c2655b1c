//! Per-frame render graph.
//!
//! A [`FramePlan`] is the ordered list of passes for one frame. Building it
//! involves no GPU calls, so the pass order can be checked against a
//! recording [`PassRecorder`] without a device.

use std::sync::Arc;

use clarity_core::{Orientation, ParamKind, Viewport};

use crate::pipeline_cache::Pipeline;

/// Texture read by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    Luma,
    Chroma,
    Rgb,
    Blur,
    PingPong(usize),
}

/// Attachment written by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSlot {
    Rgb,
    Blur,
    PingPong(usize),
    Surface,
}

impl TargetSlot {
    /// The same texture seen as a pass input.
    pub fn as_source(self) -> Option<TextureSlot> {
        match self {
            Self::Rgb => Some(TextureSlot::Rgb),
            Self::Blur => Some(TextureSlot::Blur),
            Self::PingPong(i) => Some(TextureSlot::PingPong(i)),
            Self::Surface => None,
        }
    }
}

/// One draw of a full-screen quad.
pub struct PassNode<P> {
    pub pipeline: Arc<Pipeline<P>>,
    /// Bound at group 0 bindings 0, 1, 2.
    pub sources: [TextureSlot; 3],
    pub target: TargetSlot,
    pub geometry: Orientation,
    /// `None` covers the whole target.
    pub viewport: Option<Viewport>,
}

impl<P> PassNode<P> {
    pub fn params(&self) -> ParamKind {
        self.pipeline.params()
    }

    pub fn name(&self) -> &str {
        self.pipeline.name()
    }
}

/// Receives passes in submission order.
pub trait PassRecorder<P> {
    fn record(&mut self, pass: &PassNode<P>);
}

/// Pipelines and presentation state for one frame.
pub struct GraphInputs<'a, P> {
    pub color: &'a Arc<Pipeline<P>>,
    /// Horizontal then vertical blur, present only when the blur pre-pass runs.
    pub blur: Option<[&'a Arc<Pipeline<P>>; 2]>,
    pub filter_passes: &'a [Arc<Pipeline<P>>],
    pub present: &'a Arc<Pipeline<P>>,
    pub orientation: Orientation,
    pub viewport: Viewport,
}

pub struct FramePlan<P> {
    passes: Vec<PassNode<P>>,
}

impl<P> FramePlan<P> {
    /// Lay out the frame: color conversion, optional separable blur, the
    /// filter passes alternating between the ping-pong targets, and the
    /// present pass.
    pub fn build(inputs: &GraphInputs<'_, P>) -> Self {
        let mut passes = Vec::with_capacity(inputs.filter_passes.len() + 4);
        let offscreen = |pipeline: &Arc<Pipeline<P>>, sources, target| PassNode {
            pipeline: Arc::clone(pipeline),
            sources,
            target,
            geometry: Orientation::LandscapeRight,
            viewport: None,
        };

        use TextureSlot as T;
        passes.push(offscreen(
            inputs.color,
            [T::Luma, T::Chroma, T::Chroma],
            TargetSlot::Rgb,
        ));

        let blurred = match inputs.blur {
            Some([x, y]) => {
                passes.push(offscreen(x, [T::Rgb; 3], TargetSlot::PingPong(0)));
                passes.push(offscreen(y, [T::PingPong(0); 3], TargetSlot::Blur));
                T::Blur
            }
            None => T::Rgb,
        };

        let mut current = T::Rgb;
        for (i, pipeline) in inputs.filter_passes.iter().enumerate() {
            let target = TargetSlot::PingPong(i % 2);
            passes.push(offscreen(pipeline, [current, blurred, T::Rgb], target));
            current = T::PingPong(i % 2);
        }

        passes.push(PassNode {
            pipeline: Arc::clone(inputs.present),
            sources: [current, blurred, T::Rgb],
            target: TargetSlot::Surface,
            geometry: inputs.orientation,
            viewport: Some(inputs.viewport),
        });

        Self { passes }
    }

    pub fn passes(&self) -> &[PassNode<P>] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(PassNode::name).collect()
    }

    pub fn record(&self, recorder: &mut impl PassRecorder<P>) {
        for pass in &self.passes {
            recorder.record(pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TARGET_FORMAT;
    use crate::pipeline_cache::PipelineCache;
    use crate::pipeline_cache::fake::CountingCompiler;
    use clarity_core::{Extent, ShaderMap};

    struct Pipelines {
        color: Arc<Pipeline<()>>,
        blur: [Arc<Pipeline<()>>; 2],
        present: Arc<Pipeline<()>>,
        filters: Vec<Arc<Pipeline<()>>>,
    }

    fn pipelines(filters: &[&str]) -> Pipelines {
        let mut cache = PipelineCache::new(CountingCompiler::new(), ShaderMap::builtin(), TARGET_FORMAT);
        let mut get = |name: &str| cache.get(name).expect("builtin pipeline");
        Pipelines {
            color: get("yuv_rgb"),
            blur: [get("blur_x"), get("blur_y")],
            present: get("blit"),
            filters: filters.iter().map(|n| get(n)).collect(),
        }
    }

    fn plan(p: &Pipelines, blur: bool) -> FramePlan<()> {
        FramePlan::build(&GraphInputs {
            color: &p.color,
            blur: blur.then(|| [&p.blur[0], &p.blur[1]]),
            filter_passes: &p.filters,
            present: &p.present,
            orientation: Orientation::Portrait,
            viewport: Viewport::full(Extent::new(100, 200)),
        })
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(String, [TextureSlot; 3], TargetSlot)>,
    }

    impl PassRecorder<()> for Recorder {
        fn record(&mut self, pass: &PassNode<()>) {
            self.seen.push((pass.name().to_owned(), pass.sources, pass.target));
        }
    }

    #[test]
    fn test_plan_without_filters_presents_rgb() {
        let p = pipelines(&[]);
        let plan = plan(&p, false);
        assert_eq!(plan.pass_names(), ["yuv_rgb", "blit"]);
        assert_eq!(plan.passes()[1].sources[0], TextureSlot::Rgb);
    }

    #[test]
    fn test_blur_runs_through_ping_into_blur_target() {
        let p = pipelines(&["sobel"]);
        let mut recorder = Recorder::default();
        plan(&p, true).record(&mut recorder);
        let names: Vec<&str> = recorder.seen.iter().map(|s| s.0.as_str()).collect();
        assert_eq!(names, ["yuv_rgb", "blur_x", "blur_y", "sobel", "blit"]);
        assert_eq!(recorder.seen[1].2, TargetSlot::PingPong(0));
        assert_eq!(recorder.seen[2].1[0], TextureSlot::PingPong(0));
        assert_eq!(recorder.seen[2].2, TargetSlot::Blur);
        assert_eq!(recorder.seen[3].1[1], TextureSlot::Blur);
    }

    #[test]
    fn test_filter_passes_alternate_ping_pong() {
        let p = pipelines(&["high_contrast", "sobel", "grayscale"]);
        let plan = plan(&p, false);
        let filters = &plan.passes()[1..4];
        assert_eq!(filters[0].sources, [TextureSlot::Rgb, TextureSlot::Rgb, TextureSlot::Rgb]);
        assert_eq!(filters[0].target, TargetSlot::PingPong(0));
        assert_eq!(filters[1].sources[0], TextureSlot::PingPong(0));
        assert_eq!(filters[1].target, TargetSlot::PingPong(1));
        assert_eq!(filters[2].sources[0], TextureSlot::PingPong(1));
        assert_eq!(filters[2].target, TargetSlot::PingPong(0));
        for pass in filters {
            assert_ne!(pass.target.as_source(), Some(pass.sources[0]));
        }
        let present = &plan.passes()[4];
        assert_eq!(present.sources[0], TextureSlot::PingPong(0));
    }

    #[test]
    fn test_only_present_uses_orientation_and_viewport() {
        let p = pipelines(&["sobel"]);
        let plan = plan(&p, true);
        let (present, offscreen) = plan.passes().split_last().expect("non-empty plan");
        assert_eq!(present.target, TargetSlot::Surface);
        assert_eq!(present.geometry, Orientation::Portrait);
        assert!(present.viewport.is_some());
        for pass in offscreen {
            assert_eq!(pass.geometry, Orientation::LandscapeRight);
            assert!(pass.viewport.is_none());
        }
    }
}
