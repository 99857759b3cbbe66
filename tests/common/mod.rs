// tests/common/mod.rs

//! Shared test utilities: synthetic APEX archives and a fake debugfs.

#![allow(dead_code)]

use art_apex_check::{Bitness, Checklist};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One entry of a synthetic host payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    File,
    Exec,
    Dir,
    Symlink,
}

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

/// Zip `members` into an archive and return its bytes
pub fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in members {
        writer.start_file(*name, stored()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Build a host payload zip with the given entries and permissions
pub fn host_payload(entries: &[(String, Node)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, node) in entries {
        match node {
            Node::File => {
                writer
                    .start_file(path.as_str(), stored().unix_permissions(0o644))
                    .unwrap();
                writer.write_all(b"data").unwrap();
            }
            Node::Exec => {
                writer
                    .start_file(path.as_str(), stored().unix_permissions(0o755))
                    .unwrap();
                writer.write_all(b"\x7fELF").unwrap();
            }
            Node::Dir => writer.add_directory(path.as_str(), stored()).unwrap(),
            Node::Symlink => {
                let target = path.rsplit('/').next().unwrap_or(path.as_str());
                writer
                    .add_symlink(path.as_str(), format!("{}64", target), stored())
                    .unwrap()
            }
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Write an APEX holding `member` with `data` into `dir`
pub fn write_apex(dir: &Path, name: &str, member: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let members = [("apex_manifest.json", b"{}".as_slice()), (member, data)];
    std::fs::write(&path, zip_bytes(&members)).unwrap();
    path
}

pub fn write_host_apex(dir: &Path, entries: &[(String, Node)]) -> PathBuf {
    write_apex(
        dir,
        "com.android.art.host.apex",
        "apex_payload.zip",
        &host_payload(entries),
    )
}

/// Entries a host package needs to satisfy `checklists` under `bitness`
///
/// Symlinks stand in for the preferred executable; the suffixed executables
/// they point at are listed separately.
pub fn layout_for(bitness: &dyn Bitness, checklists: &[&Checklist]) -> Vec<(String, Node)> {
    let mut entries = Vec::new();
    for checklist in checklists {
        for path in &checklist.files {
            entries.push((path.clone(), Node::File));
        }
        for name in &checklist.executables {
            entries.push((format!("bin/{}", name), Node::Exec));
        }
        for name in &checklist.executable_symlinks {
            entries.push((format!("bin/{}", name), Node::Symlink));
        }
        for name in &checklist.symlinked_multilib_executables {
            for executable in bitness.symlinked_multilib_executables(name) {
                entries.push((format!("bin/{}", executable), Node::Exec));
            }
            entries.push((format!("bin/{}", name), Node::Symlink));
        }
        for name in &checklist.symlinked_prefer32_executables {
            for executable in bitness.symlinked_prefer32_executables(name) {
                entries.push((format!("bin/{}", executable), Node::Exec));
            }
            entries.push((format!("bin/{}", name), Node::Symlink));
        }
        for name in &checklist.multilib_executables {
            for executable in bitness.multilib_executables(name) {
                entries.push((format!("bin/{}", executable), Node::Exec));
            }
        }
        for basename in &checklist.native_libraries {
            for dir in bitness.library_dirs() {
                entries.push((format!("{}/{}.so", dir, basename), Node::File));
            }
        }
        for basename in &checklist.prefer64_libraries {
            entries.push((
                format!("{}/{}.so", bitness.prefer64_library_dir(), basename),
                Node::File,
            ));
        }
        for name in &checklist.single_libraries {
            entries.push((
                format!("{}/{}", bitness.library_dirs()[0], name),
                Node::File,
            ));
        }
        for basename in &checklist.java_libraries {
            entries.push((format!("javalib/{}.jar", basename), Node::File));
        }
    }
    // The first entry recorded for a path wins, keep the list unique
    let mut seen = std::collections::BTreeSet::new();
    entries.retain(|(path, _)| seen.insert(path.clone()));
    entries
}

/// True if `dir` has no entries
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

/// One `ls -l -p` line as printed by debugfs
pub fn debugfs_line(inode: u32, bits: &str, name: &str) -> String {
    format!("/{}/{}/0/2000/{}/64/\n", inode, bits, name)
}

/// Text "image" read by [`fake_debugfs`]: a `@ <dir>` header per directory
/// followed by the lines to print for it
pub fn fake_image(dirs: &[(&str, &[(&str, &str)])]) -> Vec<u8> {
    let mut image = String::new();
    let mut inode = 11;
    for (dir, entries) in dirs {
        image.push_str(&format!("@ {}\n", dir));
        image.push_str("debugfs 1.46.5 (30-Dec-2021)\n");
        image.push_str(&debugfs_line(inode, "040755", "."));
        image.push_str(&debugfs_line(2, "040755", ".."));
        for (bits, name) in *entries {
            inode += 1;
            image.push_str(&debugfs_line(inode, bits, name));
        }
    }
    image.into_bytes()
}

pub fn write_target_apex(dir: &Path, dirs: &[(&str, &[(&str, &str)])]) -> PathBuf {
    write_apex(dir, "com.android.art.apex", "apex_payload.img", &fake_image(dirs))
}

/// Script standing in for debugfs: prints the section of the image named by
/// the `ls -l -p <dir>` request
///
/// Written once per test binary; rewriting an executable while another test
/// spawns it fails with ETXTBSY.
#[cfg(unix)]
pub fn fake_debugfs() -> &'static Path {
    use std::os::unix::fs::PermissionsExt;

    static SCRIPT: OnceLock<PathBuf> = OnceLock::new();
    SCRIPT.get_or_init(|| {
        let path = Path::new(env!("CARGO_TARGET_TMPDIR"))
            .join(format!("fake-debugfs-{}.sh", std::process::id()));
        std::fs::write(
            &path,
            "#!/bin/sh\n\
             [ \"$1\" = \"-R\" ] || exit 2\n\
             dir=\"${2#ls -l -p }\"\n\
             exec awk -v d=\"$dir\" '/^@ /{p=($2==d);next} p' \"$3\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    })
    .as_path()
}
