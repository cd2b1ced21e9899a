//! `frost cat`: raw file contents.

use std::io::Write;
use std::path::Path;

use anyhow::Context;

pub fn execute(image: &Path, path: &str) -> anyhow::Result<()> {
    let vfs = super::open_image(image)?;
    let data = vfs.read(path).with_context(|| format!("cannot read {}", path))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}
