//! Video source boundary and the single-writer latest-frame slot owned by
//! the analysis task for its whole lifetime, read by that same task's
//! status handler.
//!
//! Grounded on `streaming.py`'s `VideoStream`: a frame buffer locked only
//! for the copy-out, never held across the slow work on either side.

use std::sync::Mutex;

/// One captured frame. Raw pixel decoding/encoding is out of scope (see the
/// crate-level Non-goals); this only carries what the driver needs to know
/// a frame exists and what shape it is.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub trait VideoSource: Send + Sync {
    fn latest_frame(&self) -> Option<Frame>;
    fn dims(&self) -> (u32, u32);
}

/// A fixed-dimension stand-in for the real camera grabber: holds whatever
/// frame was last written by the capture task, under a lock held only for
/// the clone.
pub struct StaticFrameSource {
    width: u32,
    height: u32,
    slot: Mutex<Option<Frame>>,
}

impl StaticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        StaticFrameSource {
            width,
            height,
            slot: Mutex::new(None),
        }
    }

    /// Publish a newly captured frame, replacing whatever was there.
    pub fn publish(&self, frame: Frame) {
        let mut slot = self.slot.lock().expect("video frame mutex poisoned");
        *slot = Some(frame);
    }
}

impl VideoSource for StaticFrameSource {
    fn latest_frame(&self) -> Option<Frame> {
        self.slot.lock().expect("video frame mutex poisoned").clone()
    }

    fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_no_frame() {
        let source = StaticFrameSource::new(640, 480);
        assert!(source.latest_frame().is_none());
        assert_eq!(source.dims(), (640, 480));
    }

    #[test]
    fn publish_replaces_the_slot() {
        let source = StaticFrameSource::new(640, 480);
        source.publish(Frame {
            width: 640,
            height: 480,
            data: vec![0u8; 4],
        });
        assert!(source.latest_frame().is_some());
        source.publish(Frame {
            width: 640,
            height: 480,
            data: vec![1u8; 4],
        });
        assert_eq!(source.latest_frame().unwrap().data, vec![1u8; 4]);
    }
}
