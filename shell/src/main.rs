//! A small interactive client over an `octofs` disk image: open (or format)
//! an image file and accept `ls`/`cat`/`mkdir`/`touch`/`rm`/`cd`/`pwd`
//! commands against it, mirroring the spirit of the teacher's `user/bin/sh.rs`
//! without the process/pipe machinery that belongs to a real shell.

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};

use octofs::{FileDisk, FileSystem, Task};

const DEFAULT_SECTOR_COUNT: u32 = 8192;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: shell <fs.img> [--format]");
        std::process::exit(1);
    }

    let image_path = &args[1];
    let format = args.iter().skip(2).any(|a| a == "--format") || !std::path::Path::new(image_path).exists();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(image_path)
        .unwrap_or_else(|e| panic!("shell: failed to open {image_path}: {e}"));

    let device = FileDisk::open(file, DEFAULT_SECTOR_COUNT)
        .unwrap_or_else(|e| panic!("shell: failed to size {image_path}: {e}"));
    let fs = FileSystem::init(Box::new(device), format);
    let task = Task::new();

    let mut cwd = "/".to_string();
    let stdin = io::stdin();

    loop {
        print!("{cwd} $ ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = words.first() else { continue };

        match cmd {
            "exit" | "quit" => break,
            "pwd" => println!("{cwd}"),
            "ls" => cmd_ls(&fs, &task, words.get(1).copied().unwrap_or(".")),
            "cat" => words[1..].iter().for_each(|path| cmd_cat(&fs, &task, path)),
            "touch" => words[1..].iter().for_each(|path| cmd_touch(&fs, &task, path)),
            "mkdir" => words[1..].iter().for_each(|path| cmd_mkdir(&fs, &task, path)),
            "rm" => words[1..].iter().for_each(|path| cmd_rm(&fs, &task, path)),
            "cd" => cmd_cd(&fs, &task, &mut cwd, words.get(1).copied().unwrap_or("/")),
            "" => {}
            other => eprintln!("shell: unknown command: {other}"),
        }
    }

    fs.done().expect("shell: failed to flush free map");
}

fn cmd_ls(fs: &FileSystem, task: &Task, path: &str) {
    let mut file = match fs.open(task, path) {
        Ok(f) => f,
        Err(e) => return eprintln!("ls: {path}: {e}"),
    };

    if !fs.isdir(&file) {
        println!("{path}");
        fs.close(file);
        return;
    }

    loop {
        match fs.readdir(&mut file) {
            Ok(Some(name)) => println!("{name}"),
            Ok(None) => break,
            Err(e) => {
                eprintln!("ls: {path}: {e}");
                break;
            }
        }
    }

    fs.close(file);
}

fn cmd_cat(fs: &FileSystem, task: &Task, path: &str) {
    let mut file = match fs.open(task, path) {
        Ok(f) => f,
        Err(e) => return eprintln!("cat: {path}: {e}"),
    };

    let mut buf = [0u8; 512];
    loop {
        match fs.read(&mut file, &mut buf) {
            Ok(0) => break,
            Ok(n) => {
                io::stdout().write_all(&buf[..n as usize]).ok();
            }
            Err(e) => {
                eprintln!("cat: {path}: {e}");
                break;
            }
        }
    }

    fs.close(file);
}

fn cmd_touch(fs: &FileSystem, task: &Task, path: &str) {
    if let Err(e) = fs.create(task, path, 0) {
        eprintln!("touch: {path}: {e}");
    }
}

fn cmd_mkdir(fs: &FileSystem, task: &Task, path: &str) {
    if let Err(e) = fs.mkdir(task, path) {
        eprintln!("mkdir: {path}: {e}");
    }
}

fn cmd_rm(fs: &FileSystem, task: &Task, path: &str) {
    if let Err(e) = fs.remove(task, path) {
        eprintln!("rm: {path}: {e}");
    }
}

fn cmd_cd(fs: &FileSystem, task: &Task, cwd: &mut String, path: &str) {
    if let Err(e) = fs.chdir(task, path) {
        return eprintln!("cd: {path}: {e}");
    }
    *cwd = normalize(cwd, path);
}

/// Purely cosmetic: the prompt's displayed path, kept in lockstep with the
/// real working directory the facade tracks in `task`. There is no `getcwd`
/// operation to reconstruct this from sectors, so the shell maintains its
/// own string the same way a caller without a path-reversal facility would.
fn normalize(cwd: &str, path: &str) -> String {
    let mut stack: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        cwd.split('/').filter(|s| !s.is_empty()).collect()
    };

    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}
