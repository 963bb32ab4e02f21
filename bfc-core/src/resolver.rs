//! Bracket resolver — matches every `WHILE`/`END` placeholder pair
//! using the position list the emitter recorded (an explicit
//! open-brackets stack, not a byte-content scan) and patches both
//! templates' displacement fields in place.

use crate::emitter::{Placeholder, PlaceholderKind};
use crate::error::CompileError;
use crate::template;

/// Patches the 4-byte little-endian displacement field of the
/// template at `pos` (at its documented tail offset).
fn patch_displacement(code: &mut [u8], pos: usize, template_len: usize, disp: i32) {
    let field_start = pos + template_len - 4;
    code[field_start..field_start + 4].copy_from_slice(&disp.to_le_bytes());
}

/// Walks `placeholders` in emission order, matching each `END` against
/// the most recently opened `WHILE`, and patches both displacement
/// fields so `WHILE` jumps past its `END` and `END` jumps back to the
/// first byte of its loop body.
pub fn resolve(code: &mut [u8], placeholders: &[Placeholder]) -> Result<(), CompileError> {
    let w = template::WHILE.len();
    let e = template::END.len();

    let mut open: Vec<usize> = Vec::new();

    for placeholder in placeholders {
        match placeholder.kind {
            PlaceholderKind::While => open.push(placeholder.pos),
            PlaceholderKind::End => {
                let while_pos = open.pop().ok_or(CompileError::MismatchedClosingBracket)?;
                let end_pos = placeholder.pos;

                // Displacements are measured from the end of each
                // jump's own encoding to its target byte.
                let while_disp = (end_pos + e) as i64 - (while_pos + w) as i64;
                let end_disp = (while_pos + w) as i64 - (end_pos + e) as i64;

                patch_displacement(code, while_pos, w, while_disp as i32);
                patch_displacement(code, end_pos, e, end_disp as i32);
            }
        }
    }

    if !open.is_empty() {
        return Err(CompileError::MismatchedOpeningBracket);
    }
    Ok(())
}
