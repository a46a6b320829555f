//! Trap entry stubs.
//!
//! One 16-byte stub per vector, laid out back to back from `trap_stubs`.
//! Each stub normalizes the stack (pushing a zero error code where the CPU
//! does not supply one, then the vector number) and jumps to a common tail
//! that saves the remaining registers into a [`RegisterSnapshot`], calls the
//! dispatcher with a pointer to it and restores whatever the handler left
//! there before `iretq`.
//!
//! This is the only place in the interrupt core that is not ordinary Rust.

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
use super::registers::RegisterSnapshot;

pub const STUB_SIZE: u64 = 16;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
core::arch::global_asm!(
    r#"
.macro trap_stub_noerr vector
    .balign 16
    push 0
    push \vector
    jmp trap_common
.endm

.macro trap_stub_err vector
    .balign 16
    push \vector
    jmp trap_common
.endm

.section .text.trap_stubs, "ax"
.balign 16
.global trap_stubs
trap_stubs:
.irp v, 0,1,2,3,4,5,6,7
    trap_stub_noerr \v
.endr
    trap_stub_err 8
    trap_stub_noerr 9
.irp v, 10,11,12,13,14
    trap_stub_err \v
.endr
.irp v, 15,16
    trap_stub_noerr \v
.endr
    trap_stub_err 17
.irp v, 18,19,20
    trap_stub_noerr \v
.endr
    trap_stub_err 21
.irp v, 22,23,24,25,26,27,28
    trap_stub_noerr \v
.endr
    trap_stub_err 29
    trap_stub_err 30
    trap_stub_noerr 31
.set trap_vector, 32
.rept 224
    trap_stub_noerr trap_vector
    .set trap_vector, trap_vector + 1
.endr

trap_common:
    push rax
    push rbx
    push rcx
    push rdx
    push rsi
    push rdi
    push rbp
    push r8
    push r9
    push r10
    push r11
    push r12
    push r13
    push r14
    push r15
    xor eax, eax
    mov ax, ds
    push rax

    mov rdi, rsp
    mov rbp, rsp
    and rsp, -16
    cld
    call {dispatch}
    mov rsp, rbp

    pop rax
    mov ds, ax
    pop r15
    pop r14
    pop r13
    pop r12
    pop r11
    pop r10
    pop r9
    pop r8
    pop rbp
    pop rdi
    pop rsi
    pop rdx
    pop rcx
    pop rbx
    pop rax
    add rsp, 16
    iretq
"#,
    dispatch = sym trap_dispatch,
);

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
extern "C" {
    fn trap_stubs();
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
extern "C" fn trap_dispatch(frame: &mut RegisterSnapshot) {
    super::INTERRUPTS.dispatch(frame);
}

/// Entry address of the stub for `vector`.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub fn entry_address(vector: u8) -> u64 {
    trap_stubs as usize as u64 + vector as u64 * STUB_SIZE
}
