//! Peephole emitter — walks the opcode list once, fusing runs of
//! arithmetic and pointer motion into single immediate-operand
//! instructions, and appends a zero-displacement `WHILE`/`END`
//! template for every loop opcode, recording its position so the
//! resolver never has to recover it by scanning code bytes.

use crate::error::CompileError;
use crate::opcode::Opcode;
use crate::template;

/// Which loop template a [`Placeholder`] was emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    While,
    End,
}

/// The position (in the code buffer) of an emitted `WHILE`/`END`
/// template whose displacement field the resolver still needs to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub pos: usize,
    pub kind: PlaceholderKind,
}

/// Appends `bytes` to `code`, surfacing allocation failure as a typed
/// error instead of letting `Vec` abort the process.
fn push(code: &mut Vec<u8>, bytes: &[u8]) -> Result<(), CompileError> {
    code.try_reserve(bytes.len())
        .map_err(|_| CompileError::AllocationFailure)?;
    code.extend_from_slice(bytes);
    Ok(())
}

/// Emits machine code for `ops` into a fresh code buffer, prefixed with
/// the `INIT` template (its tape-pointer immediate is filled in later,
/// once the image assembler knows the tape's virtual address), and
/// returns the ordered list of loop placeholders alongside it.
pub fn emit(ops: &[Opcode]) -> Result<(Vec<u8>, Vec<Placeholder>), CompileError> {
    let mut code = Vec::new();
    let mut placeholders = Vec::new();
    push(&mut code, &template::INIT)?;

    let mut i = 0;
    while i < ops.len() {
        match ops[i] {
            Opcode::Inc | Opcode::Dec => {
                let mut net: i64 = 0;
                while i < ops.len() && matches!(ops[i], Opcode::Inc | Opcode::Dec) {
                    net += if ops[i] == Opcode::Inc { 1 } else { -1 };
                    i += 1;
                }
                let addend = (net.rem_euclid(256)) as i64;
                let addend = if addend > 127 { addend - 256 } else { addend } as i8;
                match addend {
                    0 => {}
                    1 => push(&mut code, &template::INC)?,
                    -1 => push(&mut code, &template::DEC)?,
                    n => {
                        let mut bytes = template::ADD;
                        bytes[2] = n as u8;
                        push(&mut code, &bytes)?;
                    }
                }
            }
            Opcode::Right | Opcode::Left => {
                let mut net: i64 = 0;
                while i < ops.len() && matches!(ops[i], Opcode::Right | Opcode::Left) {
                    net += if ops[i] == Opcode::Right { 1 } else { -1 };
                    i += 1;
                }
                let offset = net.rem_euclid(1i64 << 32);
                let offset = if offset > i32::MAX as i64 {
                    offset - (1i64 << 32)
                } else {
                    offset
                } as i32;
                match offset {
                    0 => {}
                    1 => push(&mut code, &template::RIGHT)?,
                    -1 => push(&mut code, &template::LEFT)?,
                    n => {
                        let mut bytes = template::ADDP;
                        bytes[2..6].copy_from_slice(&n.to_le_bytes());
                        push(&mut code, &bytes)?;
                    }
                }
            }
            Opcode::While => {
                placeholders.push(Placeholder { pos: code.len(), kind: PlaceholderKind::While });
                push(&mut code, &template::WHILE)?;
                i += 1;
            }
            Opcode::End => {
                placeholders.push(Placeholder { pos: code.len(), kind: PlaceholderKind::End });
                push(&mut code, &template::END)?;
                i += 1;
            }
            Opcode::Put => {
                push(&mut code, &template::PUT)?;
                i += 1;
            }
            Opcode::Get => {
                push(&mut code, &template::GET)?;
                i += 1;
            }
        }
    }

    Ok((code, placeholders))
}
