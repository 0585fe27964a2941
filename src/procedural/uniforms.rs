//! Per-frame uniform upload closures.
//!
//! Uploads are rebuilt only when the uniform set or pipeline changes and are
//! then replayed every prepared frame against the current [`UniformContext`].

use std::collections::BTreeMap;
use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use serde_json::Value;

use crate::gpu::batch::Batch;
use crate::procedural::data::MAX_PROCEDURAL_TEXTURE_CHANNELS;
use crate::utils::time::{CivilDate, elapsed_millis_as_secs};

/// Uniform-buffer slot of the standard inputs block.
pub const STANDARD_INPUTS_SLOT: u32 = 0;

/// First reflection slot assigned to custom uniforms, in name order.
pub const CUSTOM_UNIFORM_SLOT: u32 = 8;

/// Standard inputs block, laid out for a std140 uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StandardInputs {
    pub position: Vec4,
    pub scale: Vec4,
    /// (year, zero-based month, day, seconds of day)
    pub date: Vec4,
    pub resolution: [Vec4; MAX_PROCEDURAL_TEXTURE_CHANNELS],
    pub orientation: Mat4,
    pub time: f32,
    pub frame_count: i32,
    pub _padding: [f32; 2],
}

/// Object and timing state read by the upload closures.
#[derive(Debug, Clone)]
pub struct UniformContext {
    pub position: Vec3,
    pub scale: Vec3,
    pub orientation: Mat3,
    pub start: Instant,
    pub frame_count: i32,
    /// Size of each bound channel, `None` when the slot is unbound.
    pub channel_sizes: [Option<Vec2>; MAX_PROCEDURAL_TEXTURE_CHANNELS],
}

impl Default for UniformContext {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            orientation: Mat3::IDENTITY,
            start: Instant::now(),
            frame_count: 0,
            channel_sizes: [None; MAX_PROCEDURAL_TEXTURE_CHANNELS],
        }
    }
}

impl UniformContext {
    /// Restarts the clock and frame counter after a pipeline build.
    pub fn restart(&mut self) {
        self.start = Instant::now();
        self.frame_count = 0;
    }
}

pub type UniformUpload = Box<dyn Fn(&mut Batch, &mut UniformContext) + Send + Sync>;

/// Builds the upload list: one closure per usable custom uniform, in name
/// order, followed by the standard inputs block.
#[must_use]
pub fn build_uniform_uploads(uniforms: &BTreeMap<String, Value>) -> Vec<UniformUpload> {
    let mut uploads: Vec<UniformUpload> = uniforms
        .values()
        .zip(CUSTOM_UNIFORM_SLOT..)
        .filter_map(|(value, slot)| custom_uniform_upload(slot, value))
        .collect();
    uploads.push(standard_inputs_upload());
    uploads
}

/// Upload for one custom uniform. Numbers upload as a float; arrays upload
/// as a vector of their first four elements. Anything else is skipped.
#[must_use]
pub fn custom_uniform_upload(slot: u32, value: &Value) -> Option<UniformUpload> {
    if let Some(v) = value.as_f64() {
        let v = v as f32;
        return Some(Box::new(move |batch: &mut Batch, _: &mut UniformContext| {
            batch.uniform1f(slot, v);
        }));
    }

    let components: Vec<f32> = value
        .as_array()?
        .iter()
        .take(4)
        .map(|c| c.as_f64().unwrap_or_default() as f32)
        .collect();

    let upload: UniformUpload = match *components.as_slice() {
        [] => return None,
        [x] => Box::new(move |batch: &mut Batch, _: &mut UniformContext| {
            batch.uniform1f(slot, x);
        }),
        [x, y] => Box::new(move |batch: &mut Batch, _: &mut UniformContext| {
            batch.uniform2f(slot, Vec2::new(x, y));
        }),
        [x, y, z] => Box::new(move |batch: &mut Batch, _: &mut UniformContext| {
            batch.uniform3f(slot, Vec3::new(x, y, z));
        }),
        [x, y, z, w, ..] => Box::new(move |batch: &mut Batch, _: &mut UniformContext| {
            batch.uniform4f(slot, Vec4::new(x, y, z, w));
        }),
    };
    Some(upload)
}

/// Upload for the standard inputs block. Advances the frame counter.
#[must_use]
pub fn standard_inputs_upload() -> UniformUpload {
    Box::new(|batch: &mut Batch, ctx: &mut UniformContext| {
        ctx.frame_count += 1;
        let inputs = standard_inputs(ctx, CivilDate::now_utc());
        batch.set_uniform_buffer(STANDARD_INPUTS_SLOT, bytemuck::bytes_of(&inputs));
    })
}

#[must_use]
pub fn standard_inputs(ctx: &UniformContext, date: CivilDate) -> StandardInputs {
    let resolution = ctx.channel_sizes.map(|size| match size {
        Some(size) => Vec4::new(size.x, size.y, 1.0, 1.0),
        None => Vec4::ONE,
    });

    StandardInputs {
        position: ctx.position.extend(1.0),
        scale: ctx.scale.extend(1.0),
        date: Vec4::new(
            date.year as f32,
            date.month0 as f32,
            date.day as f32,
            date.seconds_of_day,
        ),
        resolution,
        orientation: Mat4::from_mat3(ctx.orientation),
        time: elapsed_millis_as_secs(ctx.start),
        frame_count: ctx.frame_count,
        _padding: [0.0; 2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::batch::BatchCommand;
    use serde_json::json;

    #[test]
    fn standard_inputs_block_is_std140_sized() {
        assert_eq!(std::mem::size_of::<StandardInputs>(), 192);
    }

    #[test]
    fn arrays_truncate_to_four_components() {
        let mut batch = Batch::new();
        let mut ctx = UniformContext::default();
        let upload = custom_uniform_upload(9, &json!([1, 2, 3, 4, 5])).unwrap();
        upload(&mut batch, &mut ctx);
        assert!(matches!(
            batch.commands()[0],
            BatchCommand::Uniform4f { slot: 9, value } if value == Vec4::new(1.0, 2.0, 3.0, 4.0)
        ));
    }

    #[test]
    fn unsupported_values_have_no_upload() {
        assert!(custom_uniform_upload(8, &json!([])).is_none());
        assert!(custom_uniform_upload(8, &json!("fast")).is_none());
        assert!(custom_uniform_upload(8, &json!({ "x": 1 })).is_none());
    }

    #[test]
    fn unbound_channels_report_unit_resolution() {
        let mut ctx = UniformContext::default();
        ctx.channel_sizes[1] = Some(Vec2::new(64.0, 32.0));
        let inputs = standard_inputs(&ctx, CivilDate::now_utc());
        assert_eq!(inputs.resolution[0], Vec4::ONE);
        assert_eq!(inputs.resolution[1], Vec4::new(64.0, 32.0, 1.0, 1.0));
    }

    #[test]
    fn frame_counter_advances_per_upload() {
        let mut batch = Batch::new();
        let mut ctx = UniformContext::default();
        let upload = standard_inputs_upload();
        upload(&mut batch, &mut ctx);
        upload(&mut batch, &mut ctx);
        assert_eq!(ctx.frame_count, 2);

        let bytes = batch.last_uniform_buffer(STANDARD_INPUTS_SLOT).unwrap();
        let inputs: StandardInputs = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(inputs.frame_count, 2);
    }
}
