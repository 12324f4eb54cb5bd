pub mod blend;
pub mod sampler;
