//! SVG adapter for the draw-command list.
//!
//! The only place pixels are written. Everything here is mechanical
//! translation of [`DrawCommand`]s; the transform math lives upstream.

use crate::error::{NetraError, Result};
use crate::render::scene::DrawCommand;
use crate::render::transform::Viewport;
use std::fmt::Write;
use std::path::Path;

const DASH_PATTERN: &str = "6 4";

/// Render a command list to an SVG document
pub fn to_svg(commands: &[DrawCommand], viewport: Viewport) -> String {
    let mut svg = String::new();

    writeln!(&mut svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#).unwrap();
    writeln!(
        &mut svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">"#,
        viewport.width, viewport.height, viewport.width, viewport.height
    )
    .unwrap();

    for command in commands {
        match command {
            DrawCommand::Clear { color } => {
                writeln!(
                    &mut svg,
                    r#"  <rect width="100%" height="100%" fill="{}"/>"#,
                    color
                )
                .unwrap();
            }
            DrawCommand::Rect { x, y, w, h, color } => {
                writeln!(
                    &mut svg,
                    r#"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
                    x, y, w, h, color
                )
                .unwrap();
            }
            DrawCommand::Circle { cx, cy, r, color } => {
                writeln!(
                    &mut svg,
                    r#"  <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"/>"#,
                    cx, cy, r, color
                )
                .unwrap();
            }
            DrawCommand::Ring {
                cx,
                cy,
                r,
                width,
                color,
                dashed,
            } => {
                write!(
                    &mut svg,
                    r#"  <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="none" stroke="{}" stroke-width="{:.1}""#,
                    cx, cy, r, color, width
                )
                .unwrap();
                if *dashed {
                    write!(&mut svg, r#" stroke-dasharray="{}""#, DASH_PATTERN).unwrap();
                }
                writeln!(&mut svg, "/>").unwrap();
            }
            DrawCommand::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
            } => {
                writeln!(
                    &mut svg,
                    r#"  <line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{:.1}" stroke-linecap="round"/>"#,
                    x1, y1, x2, y2, color, width
                )
                .unwrap();
            }
            DrawCommand::Polyline {
                points,
                width,
                color,
                dashed,
                closed,
            } => {
                if points.is_empty() {
                    continue;
                }
                let mut path_d = String::new();
                for (i, (x, y)) in points.iter().enumerate() {
                    if i == 0 {
                        write!(&mut path_d, "M {:.1} {:.1}", x, y).unwrap();
                    } else {
                        write!(&mut path_d, " L {:.1} {:.1}", x, y).unwrap();
                    }
                }
                if *closed {
                    path_d.push_str(" Z");
                }
                write!(
                    &mut svg,
                    r#"  <path d="{}" fill="none" stroke="{}" stroke-width="{:.1}" stroke-linejoin="round""#,
                    path_d, color, width
                )
                .unwrap();
                if *dashed {
                    write!(&mut svg, r#" stroke-dasharray="{}""#, DASH_PATTERN).unwrap();
                }
                writeln!(&mut svg, "/>").unwrap();
            }
            DrawCommand::Text {
                x,
                y,
                size,
                color,
                content,
            } => {
                writeln!(
                    &mut svg,
                    r#"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="{:.0}" text-anchor="middle" fill="{}">{}</text>"#,
                    x, y, size, color, content
                )
                .unwrap();
            }
        }
    }

    writeln!(&mut svg, "</svg>").unwrap();
    svg
}

/// Render and write to a file, creating parent directories as needed
pub fn save(commands: &[DrawCommand], viewport: Viewport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(NetraError::Transport)?;
        }
    }
    std::fs::write(path, to_svg(commands, viewport)).map_err(NetraError::Transport)?;
    Ok(())
}
