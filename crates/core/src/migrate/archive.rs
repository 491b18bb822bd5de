use std::io::Read as _;

use tar::{Builder, Header};

use super::dir::Dir;
use super::sum::SUM_FILENAME;
use crate::{Error, Result};

/// Serializes a migration directory as an uncompressed tar stream: the sum
/// file first (when present), then the SQL files in name order. Lossless
/// under [`unarchive_dir`].
pub fn archive_dir(dir: &dyn Dir) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());

    if let Ok(sum) = dir.read_file(SUM_FILENAME) {
        append(&mut builder, SUM_FILENAME, &sum)?;
    }
    for file in dir.files()? {
        append(&mut builder, file.name(), file.bytes())?;
    }

    builder.into_inner().map_err(Error::from)
}

fn append(builder: &mut Builder<Vec<u8>>, name: &str, content: &[u8]) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, content)?;
    Ok(())
}

/// Restores an archived directory into `dir`.
pub fn unarchive_dir(bytes: &[u8], dir: &dyn Dir) -> Result<()> {
    let mut archive = tar::Archive::new(bytes);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry
            .path()?
            .to_string_lossy()
            .into_owned();
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content)?;
        dir.write_file(&name, &content)?;
    }
    Ok(())
}
