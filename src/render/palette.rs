use image::Rgb;
use std::collections::HashMap;

/// Display colors, handed out in this order
pub const PALETTE: [Rgb<u8>; 8] = [
    Rgb([255, 152, 0]),   // orange
    Rgb([33, 150, 243]),  // blue
    Rgb([76, 175, 80]),   // green
    Rgb([244, 67, 54]),   // red
    Rgb([233, 30, 99]),   // pink
    Rgb([0, 188, 212]),   // cyan
    Rgb([156, 39, 176]),  // purple
    Rgb([158, 158, 158]), // gray
];

/// Round-robin class-to-color assignment for one rendering session
///
/// A class keeps the color it was first given until [`ColorAssigner::reset`].
/// Not meant to be shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct ColorAssigner {
    next: usize,
    assigned: HashMap<u32, Rgb<u8>>,
}

impl ColorAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color for `class_id`, assigning the next palette entry on first sight
    pub fn color_for(&mut self, class_id: u32) -> Rgb<u8> {
        if let Some(color) = self.assigned.get(&class_id) {
            return *color;
        }

        let color = PALETTE[self.next % PALETTE.len()];
        self.next = (self.next + 1) % PALETTE.len();
        self.assigned.insert(class_id, color);
        tracing::debug!("Assigned color {:?} to class {}", color.0, class_id);
        color
    }

    /// Color already assigned to `class_id`, if any
    pub fn get(&self, class_id: u32) -> Option<Rgb<u8>> {
        self.assigned.get(&class_id).copied()
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Forget all assignments and restart at the first palette entry
    pub fn reset(&mut self) {
        self.assigned.clear();
        self.next = 0;
    }
}
