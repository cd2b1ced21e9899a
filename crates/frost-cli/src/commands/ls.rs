//! `frost ls`: list one directory of the image.

use std::path::Path;

use anyhow::Context;
use frost_vfs::join_path;

pub fn execute(image: &Path, dir: &str) -> anyhow::Result<()> {
    let vfs = super::open_image(image)?;
    let names = vfs.list_dir(dir).with_context(|| format!("cannot list {}", dir))?;

    for name in names {
        if vfs.is_dir(&join_path(dir, &name)) {
            println!("{}/", name);
        } else {
            println!("{}", name);
        }
    }
    Ok(())
}
