//! Core compiler pipeline: lex, peephole-emit, resolve loop
//! placeholders, assemble into an ELF64 image.
//!
//! The four stages are kept as separate modules so each can be
//! exercised in isolation; [`compile`] is the only entry point the
//! driver crate needs.

pub mod emitter;
pub mod error;
pub mod image;
pub mod opcode;
pub mod resolver;
pub mod template;

pub use error::CompileError;

/// Compiles a tape-machine source buffer straight to an ELF64
/// executable image.
pub fn compile(source: &[u8]) -> Result<Vec<u8>, CompileError> {
    let ops = opcode::lex(source);
    let (mut code, placeholders) = emitter::emit(&ops)?;
    resolver::resolve(&mut code, &placeholders)?;
    Ok(image::assemble(code))
}
