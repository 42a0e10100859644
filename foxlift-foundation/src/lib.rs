//! Foundational types shared by every stage of the FoxPro translator.

pub mod errors;
pub mod ident;
pub mod source;
