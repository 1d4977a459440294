pub type Token = u32;

#[cfg(feature = "double-precision")]
pub type Count = f64;
#[cfg(not(feature = "double-precision"))]
pub type Count = f32;

/// Reserved token literal for the NULL word (sampler index 0).
pub const NULL_LITERAL: &str = "<NULL>";

pub const MAX_SENT_LEN: usize = 0x400;
