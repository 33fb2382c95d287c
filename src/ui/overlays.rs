//! Overlays shown in place of the 3D canvas

use imgui::{Condition, StyleColor, Ui};

use crate::canvas::{CanvasState, SlotState};

const LOADING_LABEL: &str = "Loading model";
const SCENE_ERROR: &str = "Something went wrong with the 3D scene.";
const CONTEXT_LOST: &str = "Display connection lost.";
const CONTEXT_LOST_ADVICE: &str = "Large FBX or OBJ files can use too much GPU memory. \
Try converting the model to GLB (smaller and faster), or use a simplified version. \
Closing other windows may help.";

const MUTED: [f32; 4] = [0.44, 0.44, 0.48, 1.0];
const ERROR_TEXT: [f32; 4] = [0.97, 0.44, 0.44, 1.0];

/// Which overlay covers the canvas this frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Loading,
    SceneError(String),
    ContextLost,
}

impl Overlay {
    /// A lost context hides everything else; load failures come next
    pub fn choose(canvas: CanvasState, slot: &SlotState) -> Overlay {
        if canvas == CanvasState::ContextLost {
            return Overlay::ContextLost;
        }
        match slot {
            SlotState::Failed(message) => Overlay::SceneError(message.clone()),
            SlotState::Loading => Overlay::Loading,
            SlotState::Idle | SlotState::Ready => Overlay::None,
        }
    }

    /// Whether the scene may be drawn underneath
    pub fn shows_scene(&self) -> bool {
        matches!(self, Overlay::None | Overlay::Loading)
    }
}

/// Buttons offered while the display connection is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Recreate the rendering surface
    TryAgain,
    /// Rebuild the whole application state
    ReloadPage,
}

fn centered<'ui>(ui: &'ui Ui, name: &str, viewport: [f32; 2]) -> imgui::Window<'ui, 'ui, String> {
    ui.window(name.to_string())
        .position([viewport[0] * 0.5, viewport[1] * 0.5], Condition::Always)
        .position_pivot([0.5, 0.5])
        .always_auto_resize(true)
        .no_decoration()
        .movable(false)
}

fn draw_loading(ui: &Ui, viewport: [f32; 2]) {
    centered(ui, "loading", viewport).bg_alpha(0.0).build(|| {
        // Three dots stepping with time stand in for a spinner
        let step = (ui.time() * 3.0) as usize % 3;
        let dots = &"..."[..=step];
        ui.text_colored(MUTED, format!("{LOADING_LABEL}{dots}"));
    });
}

fn draw_scene_error(ui: &Ui, viewport: [f32; 2], message: &str) {
    centered(ui, "scene-error", viewport).build(|| {
        ui.text(SCENE_ERROR);
        ui.spacing();
        let _wrap = ui.push_text_wrap_pos_with_pos(viewport[0] * 0.5);
        ui.text_colored(ERROR_TEXT, message);
    });
}

fn draw_context_lost(ui: &Ui, viewport: [f32; 2]) -> Option<RecoveryAction> {
    centered(ui, "context-lost", viewport)
        .build(|| {
            ui.text(CONTEXT_LOST);
            {
                let _wrap = ui.push_text_wrap_pos_with_pos(viewport[0].min(720.0) * 0.6);
                ui.text_colored(MUTED, CONTEXT_LOST_ADVICE);
            }
            ui.spacing();

            let mut action = None;
            if ui.button("Try again") {
                action = Some(RecoveryAction::TryAgain);
            }
            ui.same_line();
            let _button = ui.push_style_color(StyleColor::Button, [1.0, 1.0, 1.0, 1.0]);
            let _text = ui.push_style_color(StyleColor::Text, [0.09, 0.09, 0.11, 1.0]);
            if ui.button("Reload page") {
                action = Some(RecoveryAction::ReloadPage);
            }
            action
        })
        .flatten()
}

/// Draws `overlay` and returns the recovery action the user picked, if any
pub fn draw_overlay(ui: &Ui, overlay: &Overlay, viewport: [f32; 2]) -> Option<RecoveryAction> {
    match overlay {
        Overlay::None => None,
        Overlay::Loading => {
            draw_loading(ui, viewport);
            None
        }
        Overlay::SceneError(message) => {
            draw_scene_error(ui, viewport, message);
            None
        }
        Overlay::ContextLost => draw_context_lost(ui, viewport),
    }
}
