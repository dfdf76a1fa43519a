#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    pub fps: f32,
    /// Milliseconds per frame.
    pub mspf: f32,
}

/// Averages frame count over one-second windows of clock time.
#[derive(Debug, Default)]
pub struct FrameStats {
    frame_count: u32,
    window_start: f32,
}

impl FrameStats {
    /// Counts one frame at `total_time` and reports once a second has passed.
    pub fn frame(&mut self, total_time: f32) -> Option<FrameRate> {
        self.frame_count += 1;
        if total_time - self.window_start < 1.0 {
            return None;
        }
        let fps = self.frame_count as f32;
        self.frame_count = 0;
        self.window_start += 1.0;
        Some(FrameRate {
            fps,
            mspf: 1000.0 / fps,
        })
    }
}

impl FrameRate {
    pub fn caption(&self, title: &str) -> String {
        format!("{title}    fps: {:.0}   mspf: {:.3}", self.fps, self.mspf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_second() {
        let mut stats = FrameStats::default();
        let mut reports = Vec::new();
        for frame in 1..=120 {
            if let Some(rate) = stats.frame(frame as f32 / 60.0) {
                reports.push(rate);
            }
        }
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].fps, 60.0);
        assert!((reports[0].mspf - 16.666_666).abs() < 1e-3);
    }

    #[test]
    fn caption_appends_rate() {
        let rate = FrameRate {
            fps: 60.0,
            mspf: 1000.0 / 60.0,
        };
        assert_eq!(rate.caption("Box"), "Box    fps: 60   mspf: 16.667");
    }
}
