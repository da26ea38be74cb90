//! Draw command records and the payloads that decide whether they merge.

use sprig_test_utils::GpuBindGroup;

use crate::effect::{EffectParameters, TEXTURE_BIND_GROUP};

/// How a batch orders and submits the commands of a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchSortMode {
    /// Every command is drawn as soon as it is enqueued. Nothing merges.
    Immediate,
    /// Commands are buffered, merged, and drawn in enqueue order on flush.
    #[default]
    Deferred,
    /// Like [`Deferred`](Self::Deferred), but drawn by descending sort key.
    /// Commands with equal keys have no guaranteed relative order.
    DeferredSorted,
}

impl std::fmt::Display for BatchSortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchSortMode::Immediate => write!(f, "Immediate"),
            BatchSortMode::Deferred => write!(f, "Deferred"),
            BatchSortMode::DeferredSorted => write!(f, "DeferredSorted"),
        }
    }
}

/// Per-command state carried by a draw command.
///
/// Equality decides mergeability: two consecutive commands with the same
/// sort key and equal data become one draw. Payloads should hold handles
/// (which compare by identity) rather than owned resources, so dropping a
/// drawn command never frees GPU memory by accident.
pub trait BatchDrawCommandData: Clone + PartialEq {
    /// Write this payload's parameters into the effect state for one draw.
    fn apply_to(&self, parameters: &mut EffectParameters);
}

/// Payload-free commands always merge with each other.
impl BatchDrawCommandData for () {
    fn apply_to(&self, _parameters: &mut EffectParameters) {}
}

/// One texture bound at [`TEXTURE_BIND_GROUP`].
///
/// The usual payload for sprite batching: runs sharing a texture merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureCommandData {
    pub texture: GpuBindGroup,
}

impl TextureCommandData {
    pub fn new(texture: GpuBindGroup) -> Self {
        Self { texture }
    }
}

impl BatchDrawCommandData for TextureCommandData {
    fn apply_to(&self, parameters: &mut EffectParameters) {
        parameters.set_bind_group(TEXTURE_BIND_GROUP, self.texture.clone());
    }
}

/// Any number of bind groups, for materials that need more than a texture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaterialCommandData {
    bind_groups: Vec<(u32, GpuBindGroup)>,
}

impl MaterialCommandData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_group(mut self, index: u32, bind_group: GpuBindGroup) -> Self {
        self.bind_groups.push((index, bind_group));
        self
    }
}

impl BatchDrawCommandData for MaterialCommandData {
    fn apply_to(&self, parameters: &mut EffectParameters) {
        for (index, bind_group) in &self.bind_groups {
            parameters.set_bind_group(*index, bind_group.clone());
        }
    }
}

/// One contiguous run of indices drawn with one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDrawCommand<D> {
    pub sort_key: u32,
    pub start_index: u32,
    /// Grows in place when later commands merge into this one.
    pub primitive_count: u32,
    pub data: D,
}

impl<D: BatchDrawCommandData> BatchDrawCommand<D> {
    pub fn new(start_index: u32, primitive_count: u32, sort_key: u32, data: D) -> Self {
        Self {
            sort_key,
            start_index,
            primitive_count,
            data,
        }
    }

    /// Whether a command with this key and payload can be folded into `self`.
    #[inline]
    pub fn can_merge(&self, sort_key: u32, data: &D) -> bool {
        self.sort_key == sort_key && self.data == *data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_requires_key_and_data() {
        let t1 = TextureCommandData::new(GpuBindGroup::mock(1));
        let t2 = TextureCommandData::new(GpuBindGroup::mock(2));
        let command = BatchDrawCommand::new(0, 2, 1, t1.clone());

        assert!(command.can_merge(1, &t1));
        assert!(!command.can_merge(2, &t1));
        assert!(!command.can_merge(1, &t2));
    }

    #[test]
    fn test_texture_payload_binds_texture_slot() {
        let mut params = EffectParameters::new();
        TextureCommandData::new(GpuBindGroup::mock(4)).apply_to(&mut params);
        assert_eq!(
            params.bind_group(TEXTURE_BIND_GROUP),
            Some(&GpuBindGroup::mock(4))
        );
    }

    #[test]
    fn test_material_payload_binds_all_groups() {
        let material = MaterialCommandData::new()
            .with_bind_group(0, GpuBindGroup::mock(1))
            .with_bind_group(2, GpuBindGroup::mock(3));
        let mut params = EffectParameters::new();
        material.apply_to(&mut params);
        assert_eq!(params.len(), 2);
        assert_eq!(params.bind_group(2), Some(&GpuBindGroup::mock(3)));
    }

    #[test]
    fn test_unit_payload_always_mergeable() {
        let command = BatchDrawCommand::new(0, 1, 5, ());
        assert!(command.can_merge(5, &()));
    }
}
