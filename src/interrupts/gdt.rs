// gdt.rs
use spin::Lazy;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};

use super::tss::TSS;

#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    pub code: SegmentSelector,
    pub data: SegmentSelector,
    pub tss: SegmentSelector,
}

static GDT: Lazy<(GlobalDescriptorTable, Selectors)> = Lazy::new(|| {
    let mut gdt = GlobalDescriptorTable::new();

    let code = gdt.append(Descriptor::kernel_code_segment());
    let data = gdt.append(Descriptor::kernel_data_segment());
    let tss = gdt.append(Descriptor::tss_segment(&TSS));

    (gdt, Selectors { code, data, tss })
});

pub fn selectors() -> Selectors {
    GDT.1
}

/// Loads the segment table and reloads the segment registers. The TSS is
/// loaded separately, once the gates are installed.
pub fn init() {
    GDT.0.load();
    let selectors = GDT.1;

    unsafe {
        use x86_64::instructions::segmentation::{Segment, CS, DS, ES, SS};

        CS::set_reg(selectors.code);
        DS::set_reg(selectors.data);
        ES::set_reg(selectors.data);
        SS::set_reg(selectors.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x86_64::PrivilegeLevel;

    #[test]
    fn kernel_selectors_follow_the_null_descriptor() {
        let sel = selectors();
        assert_eq!(sel.code.0, 0x08);
        assert_eq!(sel.data.0, 0x10);
        assert_eq!(sel.tss.0, 0x18);
        assert_eq!(sel.code.rpl(), PrivilegeLevel::Ring0);
    }
}
