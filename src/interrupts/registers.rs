//! # Register Snapshot
//!
//! The record every trap stub builds on the interrupt stack before entering
//! the dispatcher. Lowest address first:
//!
//! ```text
//! ┌──────────────┐ ◀── rsp handed to the dispatcher
//! │ ds           │  saved by the stub
//! │ r15 .. r8    │
//! │ rbp rdi rsi  │  general-purpose registers,
//! │ rdx rcx rbx  │  reverse of push order
//! │ rax          │
//! ├──────────────┤
//! │ vector       │  pushed by the stub
//! │ error_code   │  pushed by the CPU, or a stub-synthesized 0
//! ├──────────────┤
//! │ rip cs       │
//! │ rflags       │  pushed by the CPU
//! │ rsp ss       │
//! └──────────────┘
//! ```
//!
//! Handlers receive `&mut RegisterSnapshot`; whatever they leave in it is what
//! the stub restores before `iretq`.

use core::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct RegisterSnapshot {
    pub ds: u64,
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// 32/16/8-bit views of an accumulator-style register (`rax` → `eax`,
/// `ax`, `al`, `ah`).
macro_rules! legacy_views {
    ($field:ident => $e:ident, $x:ident, $l:ident, $h:ident) => {
        #[inline]
        pub fn $e(&self) -> u32 {
            self.$field as u32
        }

        #[inline]
        pub fn $x(&self) -> u16 {
            self.$field as u16
        }

        #[inline]
        pub fn $l(&self) -> u8 {
            self.$field as u8
        }

        #[inline]
        pub fn $h(&self) -> u8 {
            (self.$field >> 8) as u8
        }
    };
    ($field:ident => $e:ident, $x:ident, $l:ident) => {
        #[inline]
        pub fn $e(&self) -> u32 {
            self.$field as u32
        }

        #[inline]
        pub fn $x(&self) -> u16 {
            self.$field as u16
        }

        #[inline]
        pub fn $l(&self) -> u8 {
            self.$field as u8
        }
    };
}

impl RegisterSnapshot {
    /// A zeroed snapshot for `vector`, as a stub would build for a vector
    /// without a hardware error code.
    pub const fn for_vector(vector: u8) -> Self {
        Self {
            ds: 0,
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            r11: 0,
            r10: 0,
            r9: 0,
            r8: 0,
            rbp: 0,
            rdi: 0,
            rsi: 0,
            rdx: 0,
            rcx: 0,
            rbx: 0,
            rax: 0,
            vector: vector as u64,
            error_code: 0,
            rip: 0,
            cs: 0,
            rflags: 0,
            rsp: 0,
            ss: 0,
        }
    }

    legacy_views!(rax => eax, ax, al, ah);
    legacy_views!(rbx => ebx, bx, bl, bh);
    legacy_views!(rcx => ecx, cx, cl, ch);
    legacy_views!(rdx => edx, dx, dl, dh);
    legacy_views!(rsi => esi, si, sil);
    legacy_views!(rdi => edi, di, dil);
    legacy_views!(rbp => ebp, bp, bpl);
    legacy_views!(rsp => esp, sp, spl);

    /// Vector number as the CPU delivered it.
    #[inline]
    pub fn vector(&self) -> u8 {
        self.vector as u8
    }

    /// Replaces the low 16 bits of `rax`, keeping the upper bits.
    pub fn set_ax(&mut self, value: u16) {
        self.rax = (self.rax & !0xFFFF) | value as u64;
    }

    /// Replaces the low 8 bits of `rax`, keeping the upper bits.
    pub fn set_al(&mut self, value: u8) {
        self.rax = (self.rax & !0xFF) | value as u64;
    }
}

/// The register dump printed on an unhandled exception, one line per
/// [`DumpLine`].
#[derive(Clone, Copy)]
pub struct RegisterDump<'a> {
    regs: &'a RegisterSnapshot,
    line: DumpLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpLine {
    General,
    Extended,
    Control,
    Trap,
}

impl DumpLine {
    pub const ALL: [DumpLine; 4] = [
        DumpLine::General,
        DumpLine::Extended,
        DumpLine::Control,
        DumpLine::Trap,
    ];
}

impl RegisterSnapshot {
    pub fn dump(&self, line: DumpLine) -> RegisterDump<'_> {
        RegisterDump { regs: self, line }
    }
}

impl fmt::Display for RegisterDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.regs;
        match self.line {
            DumpLine::General => write!(
                f,
                "  rax={:#x}  rbx={:#x}  rcx={:#x}  rdx={:#x}  rsi={:#x}  rdi={:#x}",
                r.rax, r.rbx, r.rcx, r.rdx, r.rsi, r.rdi
            ),
            DumpLine::Extended => write!(
                f,
                "  r8={:#x}  r9={:#x}  r10={:#x}  r11={:#x}  r12={:#x}  r13={:#x}  r14={:#x}  r15={:#x}",
                r.r8, r.r9, r.r10, r.r11, r.r12, r.r13, r.r14, r.r15
            ),
            DumpLine::Control => write!(
                f,
                "  rsp={:#x}  rbp={:#x}  rip={:#x}  rflags={:#x}  cs={:#x}  ds={:#x}  ss={:#x}",
                r.rsp, r.rbp, r.rip, r.rflags, r.cs, r.ds, r.ss
            ),
            DumpLine::Trap => write!(
                f,
                "  interrupt={:#x}  errorcode={:#x}",
                r.vector, r.error_code
            ),
        }
    }
}
