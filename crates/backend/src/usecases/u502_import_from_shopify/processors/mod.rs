pub mod daily;
pub mod normalize;
pub mod refund;
