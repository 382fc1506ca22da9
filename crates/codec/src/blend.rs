//! Linear temporal blend interpolation backend.
//!
//! Each intermediate frame is a per-channel weighted average of the
//! bracketing pair, in 8.8 fixed point. This is the always-available
//! default; motion-compensated backends plug in behind the same trait.

use crate::adapter::{CodecError, InterpolationBackend};
use crate::frame::Frame;

pub struct BlendBackend;

impl InterpolationBackend for BlendBackend {
    fn name(&self) -> &'static str {
        "blend"
    }

    fn synthesize(&self, a: &Frame, b: &Frame, weight: f32) -> Result<Vec<u8>, CodecError> {
        if a.data.len() != b.data.len() {
            return Err(CodecError::Decode(format!(
                "bracketing frames differ in size: {} vs {} bytes",
                a.data.len(),
                b.data.len()
            )));
        }

        let scale = (weight.clamp(0.0, 1.0) * 256.0).round() as u32;
        let inverse = 256 - scale;
        let data = a
            .data
            .iter()
            .zip(&b.data)
            .map(|(&pa, &pb)| ((u32::from(pa) * inverse + u32::from(pb) * scale + 128) >> 8) as u8)
            .collect();
        Ok(data)
    }
}
