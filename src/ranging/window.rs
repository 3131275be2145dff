use super::RangingSample;

pub const MAX_WINDOW: usize = 16;

/// Moving window over the latest samples, oldest overwritten first
#[derive(Copy, Clone, Debug)]
pub struct Window {
    samples: [RangingSample; MAX_WINDOW],
    size: usize,
    next: usize,
}

impl Window {
    /// Every slot starts out invalid, `size` is clamped to `1..=MAX_WINDOW`
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, MAX_WINDOW);
        Self { samples: [RangingSample::INVALID; MAX_WINDOW], size, next: 0 }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn push(&mut self, sample: RangingSample) {
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % self.size;
    }

    /// Sum of valid samples divided by the window size,
    /// invalid once more than half of the slots are invalid
    pub fn average(&self) -> RangingSample {
        let samples = &self.samples[..self.size];
        let invalid = samples.iter().filter(|sample| !sample.is_valid()).count();
        if invalid * 2 > self.size {
            return RangingSample::INVALID;
        }
        let sum: i32 = samples.iter().filter_map(|sample| sample.ticks()).map(i32::from).sum();
        RangingSample(sum / self.size as i32)
    }
}

mod test {
    #[test]
    fn test_average() {
        use super::{RangingSample, Window};

        let mut window = Window::new(4);
        assert_eq!(window.average(), RangingSample::INVALID);
        window.push(RangingSample(580));
        window.push(RangingSample(580));
        assert_eq!(window.average(), RangingSample(290));
        window.push(RangingSample(600));
        assert_eq!(window.average(), RangingSample(440));
        window.push(RangingSample::INVALID);
        window.push(RangingSample::INVALID);
        assert_eq!(window.average(), RangingSample(295));
        window.push(RangingSample::INVALID);
        assert_eq!(window.average(), RangingSample::INVALID);
    }

    #[test]
    fn test_size_clamped() {
        use super::{Window, MAX_WINDOW};

        assert_eq!(Window::new(0).size(), 1);
        assert_eq!(Window::new(32).size(), MAX_WINDOW);
    }
}
