//! Page copy: the sliding section strip, the footer and the pre-order badge

use imgui::{Condition, Ui};

const TEXT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const TEXT_SOFT: [f32; 4] = [1.0, 1.0, 1.0, 0.75];
const TEXT_FAINT: [f32; 4] = [1.0, 1.0, 1.0, 0.5];

const REMEMBERING: &str = "Your Truffle operates as a constant stream of intelligence, \
continuously inferring and processing your requests. It's a collaboration, a silent dialogue. \
Always anticipating, adapting, and aligning with your intent.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// One paragraph of a section, with an optional heading above it
#[derive(Debug, Clone, Copy)]
pub struct CopyBlock {
    pub heading: Option<&'static str>,
    pub text: &'static str,
    pub align: Align,
    /// Vertical placement as a fraction of the viewport height
    pub top: f32,
}

impl CopyBlock {
    const fn new(heading: Option<&'static str>, text: &'static str, align: Align, top: f32) -> Self {
        Self {
            heading,
            text,
            align,
            top,
        }
    }
}

/// One viewport-wide panel of the sliding strip
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub blocks: &'static [CopyBlock],
    /// Wrap width as a fraction of the viewport width
    pub max_width: f32,
}

pub const SECTIONS: [Section; 5] = [
    Section {
        blocks: &[
            CopyBlock::new(Some("Meet truffle1"), "", Align::Left, 0.15),
            CopyBlock::new(None, "Your private eco-cortex", Align::Right, 0.8),
        ],
        max_width: 0.7,
    },
    Section {
        blocks: &[
            CopyBlock::new(Some("Remembering you"), REMEMBERING, Align::Left, 0.05),
            CopyBlock::new(Some("Remembering you"), REMEMBERING, Align::Right, 0.38),
            CopyBlock::new(Some("Remembering you"), REMEMBERING, Align::Left, 0.7),
        ],
        max_width: 0.3,
    },
    Section {
        blocks: &[CopyBlock::new(
            None,
            "The shell, a vessel for your exo-cortex that transcends traditional hardware, \
is a thoughtfully designed object reminiscent of the human form. Elevated beyond mere tech, \
a sculpture worthy of your space.",
            Align::Left,
            0.3,
        )],
        max_width: 0.8,
    },
    Section {
        blocks: &[CopyBlock::new(
            None,
            "There is no cloud, server, or gatekeeper. All processing is local and runs on your \
machine. Powered by Truffle1's optimized processor equals full privacy, efficiency, and \
infinite inference time.",
            Align::Left,
            0.3,
        )],
        max_width: 0.8,
    },
    Section {
        blocks: &[CopyBlock::new(
            None,
            "From within the Truffle1, light breathes, a subtle emanation that communicates your \
device's state and mood. It's a visual language, a display of illumination tied to the \
processes within the machine.",
            Align::Left,
            0.15,
        )],
        max_width: 0.8,
    },
];

const FOOTER: [&str; 2] = [
    "Your Truffle operates as a constant stream of intelligence, continuously inferring and \
processing your requests.",
    "It's a collaboration, a silent dialogue. Always anticipating, adapting, and aligning with \
your intent.",
];

/// Left edge of section `index` on a strip translated by `slide_percent`
pub fn section_origin_x(index: usize, slide_percent: f32, viewport_width: f32) -> f32 {
    viewport_width * (index as f32 + slide_percent / 100.0)
}

/// Horizontal padding inside a section
fn padding(viewport_width: f32) -> f32 {
    (viewport_width * 0.08).clamp(24.0, 128.0)
}

fn page_window<'ui>(ui: &'ui Ui, name: &str, position: [f32; 2], size: [f32; 2]) -> imgui::Window<'ui, 'ui, String> {
    ui.window(name.to_string())
        .position(position, Condition::Always)
        .size(size, Condition::Always)
        .no_decoration()
        .no_inputs()
        .movable(false)
        .bg_alpha(0.0)
        .focus_on_appearing(false)
}

/// Draws every section that intersects the viewport
pub fn draw_sections(ui: &Ui, slide_percent: f32, viewport: [f32; 2]) {
    let [width, height] = viewport;
    let pad = padding(width);

    for (index, section) in SECTIONS.iter().enumerate() {
        let x = section_origin_x(index, slide_percent, width);
        if x >= width || x + width <= 0.0 {
            continue;
        }

        page_window(ui, &format!("section-{index}"), [x, 0.0], [width, height]).build(|| {
            let wrap = width * section.max_width;
            for block in section.blocks {
                let block_x = match block.align {
                    Align::Left => pad,
                    Align::Right => width - pad - wrap,
                };
                ui.set_cursor_pos([block_x, height * block.top]);
                let _wrap = ui.push_text_wrap_pos_with_pos(block_x + wrap);
                if let Some(heading) = block.heading {
                    ui.text_colored(TEXT, heading);
                    ui.set_cursor_pos([block_x, ui.cursor_pos()[1]]);
                }
                if !block.text.is_empty() {
                    ui.text_colored(TEXT_SOFT, block.text);
                }
            }
        });
    }
}

/// Fixed footer copy in the bottom-right corner
pub fn draw_footer(ui: &Ui, viewport: [f32; 2]) {
    let [width, height] = viewport;
    let size = [(width * 0.2).clamp(200.0, 320.0), 200.0];
    let position = [width - size[0] - 16.0, height - size[1] - 32.0];

    page_window(ui, "footer", position, size).build(|| {
        let _wrap = ui.push_text_wrap_pos_with_pos(size[0] - 8.0);
        for line in FOOTER {
            ui.text_colored(TEXT_FAINT, line);
            ui.spacing();
        }
    });
}

/// Product badge in the bottom-left corner
pub fn draw_preorder(ui: &Ui, viewport: [f32; 2]) {
    let height = viewport[1];
    ui.window("pre-order")
        .position([40.0, height - 40.0], Condition::Always)
        .position_pivot([0.0, 1.0])
        .always_auto_resize(true)
        .no_decoration()
        .movable(false)
        .bg_alpha(0.0)
        .build(|| {
            ui.text_colored(TEXT, "Truffle1");
            ui.text_colored(TEXT_SOFT, "Available for pre-order");
            if ui.button("pre-order now") {
                log::info!("Pre-order requested");
            }
        });
}

/// The full page layer drawn over the canvas
pub fn draw_page(ui: &Ui, slide_percent: f32, viewport: [f32; 2]) {
    draw_sections(ui, slide_percent, viewport);
    draw_footer(ui, viewport);
    draw_preorder(ui, viewport);
}
