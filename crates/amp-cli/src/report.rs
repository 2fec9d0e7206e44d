//! Fatal error summary.

use std::io::{self, Write};

/// Write the one-line summary for a failed command.
///
/// The context chain is joined onto a single line.
pub fn write_error(out: &mut impl Write, error: &anyhow::Error) -> io::Result<()> {
    writeln!(out, "error: {error:#}")
}
