use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls(args.first().map(|s| s.to_string()))),
        "pwd" => Some(Command::Pwd),
        "cd" => args.first().map(|&path| Command::Cd(path.to_string())),
        "mkdir" => args.first().map(|&path| Command::Mkdir(path.to_string())),
        "rmdir" => args.first().map(|&path| Command::Rmdir(path.to_string())),
        "create" => args.first().map(|&path| Command::Create(path.to_string())),
        "rm" => args.first().map(|&path| Command::Rm(path.to_string())),
        "ln" => {
            if args.len() == 2 {
                Some(Command::Ln(args[0].to_string(), args[1].to_string()))
            } else {
                None
            }
        }
        "symlink" => {
            if args.len() == 2 {
                Some(Command::Symlink(args[0].to_string(), args[1].to_string()))
            } else {
                None
            }
        }
        "read" => args.first().map(|&path| Command::Read(path.to_string())),
        "write" => {
            if args.len() >= 2 {
                Some(Command::Write(args[0].to_string(), args[1..].join(" ")))
            } else {
                None
            }
        }
        "truncate" => {
            if args.len() == 2 {
                args[1]
                    .parse::<u32>()
                    .ok()
                    .map(|size| Command::Truncate(args[0].to_string(), size))
            } else {
                None
            }
        }
        "stat" => args.first().map(|&path| Command::Stat(path.to_string())),
        "format" => Some(Command::Format),
        "exit" => Some(Command::Exit),
        _ => None,
    }
}
