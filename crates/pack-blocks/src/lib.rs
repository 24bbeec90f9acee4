//! Template rendering and marker-delimited section management.
//!
//! Generated files are plain text holding any number of managed sections:
//!
//! ```text
//! free-form user text
//! <!-- pack:begin core v1.2.0 -->
//! generated content
//! <!-- pack:end core -->
//! more user text
//! ```
//!
//! Everything outside a well-formed begin/end pair belongs to the user and is
//! preserved byte-for-byte by every operation in this crate. A begin marker
//! without a matching end marker makes that section untouchable.
//!
//! Layers, leaf first:
//!
//! - [`template`]: placeholder substitution and edit-hint stripping
//! - [`document`]: a single linear parse of a file into user/section spans
//! - [`composer`]: compose, parse, replace and remove sections
//! - [`validator`]: drift detection and repair against expected sections

pub mod composer;
pub mod document;
pub mod error;
pub mod template;
pub mod validator;

pub use composer::{
    CORE_SECTION_ID, Contribution, Section, compose, extract_user_content, parse_sections,
    remove_section, render, replace_section, unpaired_sections,
};
pub use document::{Document, Span, SpanKind};
pub use error::{Error, Result};
pub use template::{find_unreplaced_placeholders, strip_edit_hints, substitute};
pub use validator::{
    ExpectedSection, FixResult, MISSING_VERSION, SectionState, SectionStatus, ValidationResult,
    fix, fix_file, validate, validate_file,
};
