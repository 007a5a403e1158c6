use bitflags::bitflags;

bitflags! {
    /// Status word reported by the external navigation board.
    #[derive(Copy, Clone, Debug, Default, PartialEq)]
    pub struct NavStatus: u8 {
        const HEADING_OK = 1;
    }
}

/// Heading correction terms computed externally from absolute heading data.
/// `hc0` is the cosine-like scalar term and `hcz` the sine-like term of a
/// small rotation about the reference Z axis.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HeadingCorrection {
    pub hc0: f32,
    pub hcz: f32,
}

pub trait Navigation {
    fn status(&self) -> NavStatus;
    fn heading_correction(&self) -> HeadingCorrection;
}
