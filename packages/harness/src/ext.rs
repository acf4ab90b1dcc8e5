//! Extension methods used when rendering terminal output.

use std::borrow::Cow;

use ::indent::indent_all_by;
use extfn::extfn;

/// Indent every non-empty line by `level` spaces.
#[extfn]
pub fn indent<'a>(self: impl Into<Cow<'a, str>>, level: usize) -> String {
    indent_all_by(level, self)
}

/// `1 test`, `2 tests`.
#[extfn]
pub fn counted(self: usize, noun: &str) -> String {
    if self == 1 {
        format!("{self} {noun}")
    } else {
        format!("{self} {noun}s")
    }
}
