//! Cover sheet assembly: one merged PDF per transmittal with page labels
//! naming each drawing, plus the fab folder suffix-merge check.

mod assembler;

pub use assembler::CoverSheetAssembler;
