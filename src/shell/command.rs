use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;

use crate::fs::config::TOTAL_INODES;
use crate::fs::inode_table::FileType;
use crate::fs::FileSystem;

#[derive(Debug)]
pub enum Command {
    Help,
    Ls(Option<String>),
    Pwd,
    Cd(String),
    Mkdir(String),
    Rmdir(String),
    Create(String),
    Rm(String),
    Ln(String, String),
    Symlink(String, String),
    Read(String),
    Write(String, String),
    Truncate(String, u32),
    Stat(String),
    Format,
    Exit,
}

pub fn execute_command(cmd: &Command, fs: &mut FileSystem) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Ls(path) => {
            let path = path.as_deref().unwrap_or("");
            for entry in fs.readdir(path)? {
                let icon = match fs.descriptor(entry.ino)?.kind {
                    FileType::Directory => "📁",
                    FileType::Symlink => "🔗",
                    _ => "📄",
                };
                println!("{}  {}", icon, entry.name);
            }
        }
        Command::Pwd => println!("📍 {}", fs.pwd()?.cyan()),
        Command::Cd(path) => {
            fs.cd(path)?;
            println!("📂 Moved to {}", fs.pwd()?.blue());
        }
        Command::Mkdir(path) => {
            fs.mkdir(path)?;
            println!("✅ Created directory: {}", path.green());
        }
        Command::Rmdir(path) => {
            fs.rmdir(path)?;
            println!("🗑️ Removed directory: {}", path.red());
        }
        Command::Create(path) => {
            fs.create(path)?;
            println!("📝 Created file: {}", path.green());
        }
        Command::Rm(path) => {
            fs.unlink(path)?;
            println!("❌ Deleted file: {}", path.red());
        }
        Command::Ln(src, dst) => {
            fs.link(src, dst)?;
            println!("🔗 Linked {} -> {}", dst.green(), src);
        }
        Command::Symlink(path, target) => {
            fs.symlink(path, target)?;
            println!("🔗 Symlinked {} -> {}", path.green(), target);
        }
        Command::Read(path) => {
            let handle = fs.open(path)?;
            let size = fs.stat(path)?.size;
            let bytes = fs.read(&handle, 0, size as usize)?;
            fs.close(&handle);
            println!("📖 {}", path.cyan());
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        Command::Write(path, content) => {
            if fs.lookup(path, false).is_err() {
                fs.create(path)?;
            }
            fs.truncate(path, content.len() as u32)?;
            let handle = fs.open(path)?;
            fs.write(&handle, 0, content.as_bytes())?;
            fs.close(&handle);
            println!("✏️  Wrote {} bytes to {}", content.len(), path.cyan());
        }
        Command::Truncate(path, size) => {
            fs.truncate(path, *size)?;
            println!("✂️  {} now {} bytes", path.cyan(), size);
        }
        Command::Stat(path) => {
            let inode = fs.stat(path)?;
            let kind = match inode.kind {
                FileType::Regular => "File",
                FileType::Directory => "Directory",
                FileType::Symlink => "Symlink",
                FileType::Unused => "Unused",
            };
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {}\n{}: {} bytes",
                "📊 File Info".bright_yellow().bold(),
                "Inode".blue(),
                inode.ino,
                "Type".blue(),
                kind,
                "Links".blue(),
                inode.refs,
                "Size".blue(),
                inode.size,
            );
            if inode.kind == FileType::Symlink {
                println!("{}: {}", "Target".blue(), fs.read_link(path)?);
            }
        }
        Command::Format => {
            println!("💾 Formatting virtual disk...");
            let pb = ProgressBar::new(100);
            pb.set_style(
                ProgressStyle::with_template("[{bar:40.green/black}] {pos:>3}% {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            pb.set_position(10);
            fs.mkfs(TOTAL_INODES)?;
            pb.set_position(100);
            pb.finish_with_message("✅ Disk formatted successfully!");
        }
        Command::Exit => println!("{}", "👋 Exiting BlockFS shell...".yellow().bold()),
    }

    Ok(())
}

fn print_help() {
    println!("{}", "📘 BlockFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls [path]            List directory entries
  pwd                  Print current path
  cd <path>            Change directory (follows symlinks)
  mkdir <path>         Create directory
  rmdir <path>         Remove empty directory
  create <path>        Create empty file
  rm <path>            Remove file or symlink
  ln <src> <dst>       Hard-link dst to the file at src
  symlink <path> <to>  Create symlink at path pointing to <to>
  read <path>          Print file content
  write <path> <str>   Replace file content with string
  truncate <path> <n>  Resize file to n bytes
  stat <path>          Show descriptor info
  format               Re-create the file system
  help                 Show this help message
  exit                 Quit the shell
"
        .bright_black()
    );
}
