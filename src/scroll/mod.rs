//! Virtual page scroll
//!
//! The window has no document to scroll, so the page height is derived from
//! the section count: every section is worth `vh_per_section` percent of the
//! viewport height. Wheel and keyboard input move a pixel offset through
//! that range.

use crate::config::PageConfig;

#[derive(Debug, Clone)]
pub struct ScrollDriver {
    config: PageConfig,
    viewport_height: f32,
    offset: f32,
}

impl ScrollDriver {
    pub fn new(config: PageConfig, viewport_height: f32) -> Self {
        Self {
            config,
            viewport_height: viewport_height.max(0.0),
            offset: 0.0,
        }
    }

    /// Total page height in pixels
    pub fn total_height(&self) -> f32 {
        self.config.section_count as f32 * self.config.vh_per_section / 100.0 * self.viewport_height
    }

    /// Distance the page can actually scroll; zero or negative when the
    /// viewport is taller than the content
    pub fn scroll_range(&self) -> f32 {
        self.total_height() - self.viewport_height
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// Normalised progress in `[0, 1]`
    pub fn progress(&self) -> f32 {
        progress_for(self.offset, self.scroll_range())
    }

    /// Horizontal translation of the section strip, in percent of one section
    pub fn slide_offset_percent(&self) -> f32 {
        slide_offset_percent(self.progress(), self.config.section_count)
    }

    pub fn scroll_to(&mut self, offset: f32) {
        self.offset = offset.clamp(0.0, self.scroll_range().max(0.0));
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll_to(self.offset + delta);
    }

    /// Wheel notches or arrow-key presses
    pub fn scroll_lines(&mut self, lines: f32) {
        self.scroll_by(lines * self.config.line_height);
    }

    pub fn scroll_pages(&mut self, pages: f32) {
        self.scroll_by(pages * self.viewport_height);
    }

    /// Keeps progress stable across window resizes
    pub fn set_viewport_height(&mut self, height: f32) {
        let progress = self.progress();
        self.viewport_height = height.max(0.0);
        self.scroll_to(progress * self.scroll_range());
    }
}

pub fn progress_for(offset: f32, range: f32) -> f32 {
    if range <= 0.0 {
        return 0.0;
    }
    (offset / range).clamp(0.0, 1.0)
}

pub fn slide_offset_percent(progress: f32, section_count: usize) -> f32 {
    -progress * section_count.saturating_sub(1) as f32 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(sections: usize) -> PageConfig {
        PageConfig {
            section_count: sections,
            vh_per_section: 200.0,
            line_height: 60.0,
        }
    }

    #[test]
    fn test_five_sections_span_ten_viewports() {
        let mut driver = ScrollDriver::new(page(5), 900.0);
        assert_eq!(driver.total_height(), 9000.0);
        assert_eq!(driver.progress(), 0.0);
        assert_eq!(driver.slide_offset_percent(), 0.0);

        driver.scroll_to(driver.total_height() - 900.0);
        assert_eq!(driver.progress(), 1.0);
        assert_eq!(driver.slide_offset_percent(), -400.0);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut driver = ScrollDriver::new(page(5), 1000.0);
        driver.scroll_by(-50.0);
        assert_eq!(driver.offset(), 0.0);
        driver.scroll_pages(100.0);
        assert_eq!(driver.offset(), driver.scroll_range());
        assert_eq!(driver.progress(), 1.0);
    }

    #[test]
    fn test_degenerate_range_forces_zero_progress() {
        assert_eq!(progress_for(120.0, 0.0), 0.0);
        assert_eq!(progress_for(120.0, -10.0), 0.0);

        let mut driver = ScrollDriver::new(page(0), 800.0);
        driver.scroll_lines(3.0);
        assert_eq!(driver.progress(), 0.0);
    }

    #[test]
    fn test_resize_keeps_progress() {
        let mut driver = ScrollDriver::new(page(5), 800.0);
        driver.scroll_to(driver.scroll_range() * 0.25);
        driver.set_viewport_height(1200.0);
        assert!((driver.progress() - 0.25).abs() < 1e-5);
    }
}
