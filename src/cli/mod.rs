//! Release workflow driven by the command line

pub mod orchestration;

pub use orchestration::{
    Confirmation, ReleaseOutcome, ReleasePreview, ReleaseReport, ReleaseRequest, Releaser,
};
