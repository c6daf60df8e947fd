use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("perspective points are degenerate, homography has no solution")]
    DegenerateHomography,

    #[error("frame size {actual:?} does not match extractor size {expected:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
