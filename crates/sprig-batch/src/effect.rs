//! Effects: the shader state a batch bracket draws with.
//!
//! An [`Effect`] is a set of techniques, each made of one or more passes. A
//! pass wraps a render pipeline; drawing a command runs every pass of the
//! active technique once. Per-command state (textures, materials) is written
//! into [`EffectParameters`] by the command payload before the passes run.
//!
//! # Example
//!
//! ```ignore
//! use sprig_batch::*;
//!
//! let effect = Effect::new("sprite")
//!     .with_technique(EffectTechnique::new("default").with_pass(EffectPass::new("main", pipeline)))
//!     .with_bind_group(PROJECTION_BIND_GROUP, projection);
//! ```

use sprig_test_utils::{GpuBindGroup, GpuRenderPipeline, GraphicsDevice};

use crate::error::{BatchError, BatchResult};

/// Bind group index textures are bound at by [`TextureCommandData`](crate::TextureCommandData).
pub const TEXTURE_BIND_GROUP: u32 = 0;

/// Bind group index conventionally used for the view/projection uniform.
pub const PROJECTION_BIND_GROUP: u32 = 1;

/// One pass of a technique.
#[derive(Debug, Clone)]
pub struct EffectPass {
    name: String,
    pipeline: GpuRenderPipeline,
}

impl EffectPass {
    pub fn new(name: impl Into<String>, pipeline: GpuRenderPipeline) -> Self {
        Self {
            name: name.into(),
            pipeline,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &GpuRenderPipeline {
        &self.pipeline
    }

    /// Apply the pass state to the device.
    pub fn apply(&self, device: &dyn GraphicsDevice) {
        device.set_pipeline(&self.pipeline);
    }
}

/// A named, ordered list of passes.
#[derive(Debug, Clone)]
pub struct EffectTechnique {
    name: String,
    passes: Vec<EffectPass>,
}

impl EffectTechnique {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passes: Vec::new(),
        }
    }

    pub fn with_pass(mut self, pass: EffectPass) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passes(&self) -> &[EffectPass] {
        &self.passes
    }
}

/// Shader state shared by every draw of a bracket.
///
/// Effects are immutable once built and handed to a batch as `Arc<Effect>`.
#[derive(Debug, Clone)]
pub struct Effect {
    label: String,
    techniques: Vec<EffectTechnique>,
    active_technique: usize,
    parameters: EffectParameters,
}

impl Effect {
    /// Create an effect with no techniques. Add at least one with
    /// [`with_technique`](Self::with_technique) before use.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            techniques: Vec::new(),
            active_technique: 0,
            parameters: EffectParameters::new(),
        }
    }

    /// Convenience for the common one-technique, one-pass effect.
    pub fn single_pass(label: impl Into<String>, pipeline: GpuRenderPipeline) -> Self {
        Self::new(label)
            .with_technique(EffectTechnique::new("default").with_pass(EffectPass::new("main", pipeline)))
    }

    pub fn with_technique(mut self, technique: EffectTechnique) -> Self {
        self.techniques.push(technique);
        self
    }

    /// Bind a group for every draw made with this effect. Command payloads
    /// may override the same slot per draw.
    pub fn with_bind_group(mut self, index: u32, bind_group: GpuBindGroup) -> Self {
        self.parameters.set_bind_group(index, bind_group);
        self
    }

    /// Select the technique whose passes are run when drawing.
    pub fn with_active_technique(mut self, name: &str) -> BatchResult<Self> {
        match self.techniques.iter().position(|t| t.name == name) {
            Some(index) => {
                self.active_technique = index;
                Ok(self)
            }
            None => Err(BatchError::InvalidArgument(format!(
                "effect '{}' has no technique named '{}'",
                self.label, name
            ))),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn techniques(&self) -> &[EffectTechnique] {
        &self.techniques
    }

    pub fn active_technique(&self) -> Option<&EffectTechnique> {
        self.techniques.get(self.active_technique)
    }

    /// Passes of the active technique (empty if the effect has none).
    pub fn passes(&self) -> &[EffectPass] {
        self.active_technique()
            .map(EffectTechnique::passes)
            .unwrap_or(&[])
    }

    /// Parameters bound for every draw made with this effect.
    pub fn parameters(&self) -> &EffectParameters {
        &self.parameters
    }

    /// Check that the effect can draw: it needs an active technique with at
    /// least one pass.
    pub fn validate(&self) -> BatchResult<()> {
        if self.passes().is_empty() {
            return Err(BatchError::InvalidArgument(format!(
                "effect '{}' has no passes in its active technique",
                self.label
            )));
        }
        Ok(())
    }
}

/// Per-draw shader parameters: bind groups keyed by group index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectParameters {
    /// Sorted by index, at most one entry per index.
    bind_groups: Vec<(u32, GpuBindGroup)>,
}

impl EffectParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `bind_group` at `index`, replacing whatever was there.
    pub fn set_bind_group(&mut self, index: u32, bind_group: GpuBindGroup) {
        match self.bind_groups.binary_search_by_key(&index, |(slot, _)| *slot) {
            Ok(pos) => self.bind_groups[pos].1 = bind_group,
            Err(pos) => self.bind_groups.insert(pos, (index, bind_group)),
        }
    }

    pub fn remove_bind_group(&mut self, index: u32) -> Option<GpuBindGroup> {
        self.bind_groups
            .binary_search_by_key(&index, |(slot, _)| *slot)
            .ok()
            .map(|pos| self.bind_groups.remove(pos).1)
    }

    pub fn bind_group(&self, index: u32) -> Option<&GpuBindGroup> {
        self.bind_groups
            .binary_search_by_key(&index, |(slot, _)| *slot)
            .ok()
            .map(|pos| &self.bind_groups[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &GpuBindGroup)> {
        self.bind_groups.iter().map(|(slot, group)| (*slot, group))
    }

    pub fn len(&self) -> usize {
        self.bind_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bind_groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.bind_groups.clear();
    }

    /// Replace the contents with a copy of `other`, reusing the allocation.
    pub fn reset_to(&mut self, other: &EffectParameters) {
        self.bind_groups.clone_from(&other.bind_groups);
    }

    /// Bind every parameter on the device.
    pub fn apply(&self, device: &dyn GraphicsDevice) {
        for (index, bind_group) in &self.bind_groups {
            device.set_bind_group(*index, bind_group);
        }
    }
}
