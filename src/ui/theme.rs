use crate::ui::LineRole;
use crossterm::style::{Color, ContentStyle, Stylize};

// Gray text with a single orange accent. Add roles here instead of coloring at call sites.
pub const MUTED: Color = Color::Rgb {
    r: 156,
    g: 163,
    b: 175,
};
pub const DIM: Color = Color::Rgb {
    r: 107,
    g: 114,
    b: 128,
};
pub const ACCENT: Color = Color::Rgb {
    r: 255,
    g: 159,
    b: 26,
};

pub fn style_for(role: LineRole) -> ContentStyle {
    let base = ContentStyle::new();
    match role {
        LineRole::Header | LineRole::Title => base.bold(),
        LineRole::Selected => base.bold().with(ACCENT),
        LineRole::Prompt => base.with(ACCENT),
        LineRole::Detail => base.dim(),
        LineRole::Meta => base.dim().with(MUTED),
        LineRole::Footer | LineRole::Notice => base.with(DIM),
        LineRole::Plain | LineRole::Blank => base,
    }
}
