//! Image assembler — wraps the resolved code buffer in a minimal
//! two-segment ELF64 executable.
//!
//! No dynamic linking, no section headers, no string tables: only
//! what the kernel's ELF loader strictly consults. This is hand-rolled
//! byte layout rather than a build against a general-purpose object
//! writer, because the target is an exact, minimal `ET_EXEC` image
//! with a fixed field-for-field layout that a section/symbol-oriented
//! writer does not expose control over (see DESIGN.md).

use crate::template;

const EI_NIDENT: usize = 16;
const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;

const ET_EXEC: u16 = 2;
const EM_X86_64: u16 = 62;
const EV_CURRENT: u32 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const ELFOSABI_SYSV: u8 = 0;
const SHN_UNDEF: u16 = 0;

const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

const PAGE_SIZE: u64 = 0x1000;
const CODE_FILE_OFFSET: u64 = 0x1000;
const ENTRY_POINT: u64 = 0x1000;
const TAPE_SIZE: u64 = 30_000;

/// Appends a single program header to `out`.
fn write_phdr(out: &mut Vec<u8>, p_type: u32, p_flags: u32, p_offset: u64, p_vaddr: u64, p_filesz: u64, p_memsz: u64, p_align: u64) {
    out.extend_from_slice(&p_type.to_le_bytes());
    out.extend_from_slice(&p_flags.to_le_bytes());
    out.extend_from_slice(&p_offset.to_le_bytes());
    out.extend_from_slice(&p_vaddr.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes()); // p_paddr, unused
    out.extend_from_slice(&p_filesz.to_le_bytes());
    out.extend_from_slice(&p_memsz.to_le_bytes());
    out.extend_from_slice(&p_align.to_le_bytes());
}

/// The tape segment's virtual address: the next page boundary
/// strictly above the code segment.
pub fn tape_vaddr(code_size: u64) -> u64 {
    CODE_FILE_OFFSET + code_size + (PAGE_SIZE - (code_size % PAGE_SIZE))
}

/// Consumes the resolved code buffer (which does not yet carry
/// `EXIT` or its tape-pointer immediate), appends `EXIT`, patches the
/// `INIT` placeholder with the tape segment's virtual address, and
/// returns the complete ELF64 executable image.
pub fn assemble(mut code: Vec<u8>) -> Vec<u8> {
    code.extend_from_slice(&template::EXIT);
    let code_size = code.len() as u64;
    let tape_addr = tape_vaddr(code_size);

    code[2..10].copy_from_slice(&tape_addr.to_le_bytes());

    let mut out = Vec::with_capacity(EHDR_SIZE + 2 * PHDR_SIZE + code.len());

    // e_ident
    let mut e_ident = [0u8; EI_NIDENT];
    e_ident[0] = 0x7F;
    e_ident[1] = b'E';
    e_ident[2] = b'L';
    e_ident[3] = b'F';
    e_ident[4] = ELFCLASS64;
    e_ident[5] = ELFDATA2LSB;
    e_ident[6] = EV_CURRENT as u8;
    e_ident[7] = ELFOSABI_SYSV;
    out.extend_from_slice(&e_ident);

    out.extend_from_slice(&ET_EXEC.to_le_bytes());
    out.extend_from_slice(&EM_X86_64.to_le_bytes());
    out.extend_from_slice(&EV_CURRENT.to_le_bytes());
    out.extend_from_slice(&ENTRY_POINT.to_le_bytes());
    out.extend_from_slice(&(EHDR_SIZE as u64).to_le_bytes()); // e_phoff
    out.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes()); // e_ehsize
    out.extend_from_slice(&(PHDR_SIZE as u16).to_le_bytes()); // e_phentsize
    out.extend_from_slice(&2u16.to_le_bytes()); // e_phnum
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
    out.extend_from_slice(&SHN_UNDEF.to_le_bytes()); // e_shstrndx

    debug_assert_eq!(out.len(), EHDR_SIZE);

    write_phdr(&mut out, PT_LOAD, PF_X | PF_R, CODE_FILE_OFFSET, ENTRY_POINT, code_size, code_size, PAGE_SIZE);
    write_phdr(&mut out, PT_LOAD, PF_W | PF_R, 0, tape_addr, 0, TAPE_SIZE, PAGE_SIZE);

    debug_assert_eq!(out.len(), EHDR_SIZE + 2 * PHDR_SIZE);

    out.resize(CODE_FILE_OFFSET as usize, 0);
    out.extend_from_slice(&code);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_match_the_external_interface() {
        let image = assemble(template::INIT.to_vec());
        assert_eq!(&image[0..4], b"\x7FELF");
        assert_eq!(image[4], ELFCLASS64);
        assert_eq!(image[5], ELFDATA2LSB);
        assert_eq!(image[7], ELFOSABI_SYSV);
        assert_eq!(u16::from_le_bytes(image[16..18].try_into().unwrap()), ET_EXEC);
        assert_eq!(u16::from_le_bytes(image[18..20].try_into().unwrap()), EM_X86_64);
        assert_eq!(u64::from_le_bytes(image[24..32].try_into().unwrap()), ENTRY_POINT);
        assert_eq!(u64::from_le_bytes(image[32..40].try_into().unwrap()), EHDR_SIZE as u64);
        assert_eq!(u64::from_le_bytes(image[40..48].try_into().unwrap()), 0);
        assert_eq!(u16::from_le_bytes(image[52..54].try_into().unwrap()), EHDR_SIZE as u16);
        assert_eq!(u16::from_le_bytes(image[54..56].try_into().unwrap()), PHDR_SIZE as u16);
        assert_eq!(u16::from_le_bytes(image[56..58].try_into().unwrap()), 2);
        assert_eq!(u16::from_le_bytes(image[58..60].try_into().unwrap()), 0);
        assert_eq!(u16::from_le_bytes(image[60..62].try_into().unwrap()), 0);
        assert_eq!(u16::from_le_bytes(image[62..64].try_into().unwrap()), SHN_UNDEF);
    }

    #[test]
    fn empty_program_code_segment_is_init_plus_exit() {
        let image = assemble(template::INIT.to_vec());
        let code_start = CODE_FILE_OFFSET as usize;
        let code_size = template::INIT.len() + template::EXIT.len();
        assert_eq!(image.len(), code_start + code_size);
        assert_eq!(&image[code_start + template::INIT.len()..code_start + code_size], &template::EXIT);
    }

    #[test]
    fn tape_vaddr_is_page_aligned_and_strictly_above_code() {
        for code_size in [0u64, 1, 27, 4095, 4096, 4097, 9000] {
            let vaddr = tape_vaddr(code_size);
            assert_eq!(vaddr % PAGE_SIZE, 0);
            assert!(vaddr > CODE_FILE_OFFSET + code_size);
        }
    }

    #[test]
    fn empty_program_tape_vaddr_is_0x2000() {
        // code_size = INIT(15) + EXIT(12) = 27.
        assert_eq!(tape_vaddr(27), 0x2000);
    }

    #[test]
    fn init_placeholder_is_patched_with_tape_vaddr() {
        let image = assemble(template::INIT.to_vec());
        let code_start = CODE_FILE_OFFSET as usize;
        let patched = u64::from_le_bytes(image[code_start + 2..code_start + 10].try_into().unwrap());
        assert_eq!(patched, 0x2000);
    }

    #[test]
    fn second_phdr_has_zero_file_size_and_30000_byte_mem_size() {
        let image = assemble(template::INIT.to_vec());
        let phdr1 = &image[EHDR_SIZE + PHDR_SIZE..EHDR_SIZE + 2 * PHDR_SIZE];
        let p_filesz = u64::from_le_bytes(phdr1[32..40].try_into().unwrap());
        let p_memsz = u64::from_le_bytes(phdr1[40..48].try_into().unwrap());
        assert_eq!(p_filesz, 0);
        assert_eq!(p_memsz, TAPE_SIZE);
    }
}
