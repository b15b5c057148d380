use std::path::Path;

use tokio::{
    fs::{self, File},
    io::{self, AsyncBufReadExt, Lines},
};

/// Read a file from the given path into a list of strings
pub async fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let mut r = file_reader(path).await?;
    let mut lines = Vec::new();

    while let Some(line) = r.next_line().await? {
        lines.push(line);
    }

    Ok(lines)
}

/// List the regular files in a directory, sorted by file name
pub async fn list_files<P: AsRef<Path>>(dir: P) -> io::Result<Vec<std::path::PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();

    Ok(files)
}

async fn file_reader<P: AsRef<Path>>(path: P) -> io::Result<Lines<io::BufReader<File>>> {
    let f = File::open(path).await?;

    Ok(io::BufReader::new(f).lines())
}
