//! Code block rendering: a shadowed rounded container plus monospace text.
//!
//! Text goes through resvg as an SVG `<text>` run per line, using the system
//! font database.

use std::sync::{Arc, OnceLock};

use log::{debug, warn};
use resvg::tiny_skia::Paint;
use resvg::usvg::{Options, Tree, fontdb};

use super::{Canvas, shadow, with_opacity};
use crate::composition::{CODE_FONT_FAMILY, CODE_FONT_SIZE, CodeBlock, rounded_rect_path};

/// Draws the block, its shadow and its text onto `canvas`.
pub fn draw_code_block(canvas: &mut Canvas, block: &CodeBlock) {
    let Some(path) = rounded_rect_path(block.rect, block.corner_radius) else {
        return;
    };

    shadow::draw_shadow(canvas, &path, &block.shadow);

    let mut paint = Paint::default();
    paint.set_color(with_opacity(block.fill, block.fill_opacity));
    paint.anti_alias = true;
    canvas.fill_path(&path, &paint);

    if block.lines.is_empty() {
        return;
    }

    let svg = code_svg(block);
    match Tree::from_str(&svg, &text_options()) {
        Ok(tree) => {
            let transform = canvas.transform();
            resvg::render(&tree, transform, &mut canvas.pixmap_mut().as_mut());
        }
        Err(err) => warn!("failed to lay out code text: {err}"),
    }
}

/// SVG document holding the block's text, in canvas coordinates and clipped
/// to the block.
pub fn code_svg(block: &CodeBlock) -> String {
    let rect = block.rect;
    let mut svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
            r#"<clipPath id="code-clip"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath>"#,
            r#"<g clip-path="url(#code-clip)" font-family="{}" font-size="{}""#,
            r#" xml:space="preserve">"#,
        ),
        (rect.x + rect.width).max(1.0),
        (rect.y + rect.height).max(1.0),
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        CODE_FONT_FAMILY,
        CODE_FONT_SIZE,
    );
    for line in &block.lines {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" fill="{}">{}</text>"#,
            line.x,
            line.baseline,
            line.color,
            escape_xml(&line.text)
        ));
    }
    svg.push_str("</g></svg>");
    svg
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn text_options() -> Options<'static> {
    Options {
        fontdb: font_database(),
        ..Options::default()
    }
}

fn font_database() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            debug!("loaded {} font faces", db.len());
            Arc::new(db)
        })
        .clone()
}
