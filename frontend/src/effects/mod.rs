mod cursor_glyph;
mod dom_surface;

pub use cursor_glyph::resolve_cursor_css;
pub use dom_surface::DomSurface;
