pub mod command;
pub mod parse;

use std::io::{self, Write};
use std::sync::Arc;

use crate::disk::FileDisk;
use crate::fs::config::TOTAL_INODES;
use crate::fs::FileSystem;
use crate::shell::{command::execute_command, parse::parse_command};

const DISK_PATH: &str = "disk.img";

pub fn start_shell() {
    println!("BlockFS v0.1.0");
    println!("Using virtual disk: {}", DISK_PATH);
    println!("Type 'help' for command list.\n");

    let disk = match FileDisk::new(DISK_PATH) {
        Ok(disk) => Arc::new(disk),
        Err(e) => {
            println!("Error: cannot open {}: {}", DISK_PATH, e);
            return;
        }
    };

    let mut fs = FileSystem::new(disk);
    if !fs.is_formatted() {
        if let Err(e) = fs.mkfs(TOTAL_INODES) {
            println!("Error: format failed: {}", e);
            return;
        }
    }

    loop {
        let prompt = fs.pwd().unwrap_or_else(|_| "?".to_string());
        print!("{}>", prompt);
        io::stdout().flush().unwrap();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Error: failed to read input");
            continue;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Some(cmd) => {
                if let Err(e) = execute_command(&cmd, &mut fs) {
                    println!("Error: {}", e);
                }
                // exit 命令特殊处理
                if matches!(cmd, command::Command::Exit) {
                    break;
                }
            }
            None => println!("Invalid command. Type 'help' for command list."),
        }
    }

    println!("Bye!");
}
