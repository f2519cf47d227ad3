/*!
# WGSL Shaders

One module per primitive kind. Each is compiled as `COMMON` followed by the
kind's source, so the uniform block, `VsOut` and `fs_main` live in one place.
*/

use crate::batch::PrimitiveKind;

/// Globals uniform, `VsOut`, quad helper and the shared fragment stage
pub const COMMON: &str = include_str!("common.wgsl");

pub const RECT_SHADER: &str = include_str!("rect.wgsl");

pub const LINE_SHADER: &str = include_str!("line.wgsl");

pub const TRIANGLE_SHADER: &str = include_str!("triangle.wgsl");

/// Ribbon strip evaluated from the instance's control points and `vertex_index`
pub const RIBBON_SHADER: &str = include_str!("ribbon.wgsl");

/// Full WGSL source for one primitive kind.
pub fn source_for(kind: PrimitiveKind) -> String {
    let body = match kind {
        PrimitiveKind::Rect => RECT_SHADER,
        PrimitiveKind::Line => LINE_SHADER,
        PrimitiveKind::Triangle => TRIANGLE_SHADER,
        PrimitiveKind::Ribbon => RIBBON_SHADER,
    };
    format!("{}\n{}", COMMON, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_entry_points() {
        for kind in PrimitiveKind::ALL {
            let src = source_for(kind);
            assert!(src.contains("fn vs_main"), "{:?}", kind);
            assert!(src.contains("fn fs_main"), "{:?}", kind);
            assert!(src.contains("var<uniform> globals"), "{:?}", kind);
        }
    }
}
