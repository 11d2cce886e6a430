use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;

/// Two users, an admin and a 100.00 gig — the preamble most scenarios need.
pub const SEED: &[&str] = &[
    "user, 1, , , buyer",
    "user, 2, , , seller",
    "user, 9, , , admin",
    "gig, 2, 1, 100.00,",
];

pub fn write_ops(path: &Path, seed: bool, rows: &[&str]) -> Result<(), Error> {
    let mut file = File::create(path)?;
    writeln!(file, "op, user, target, amount, arg")?;
    if seed {
        for row in SEED {
            writeln!(file, "{row}")?;
        }
    }
    for row in rows {
        writeln!(file, "{row}")?;
    }
    Ok(())
}
