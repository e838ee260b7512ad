use anyhow::{bail, Context};
use common::auth::{decrypt_users, encrypt_users, User};
use common::Role;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 || args[1] != "add-user" {
        eprintln!("Usage: {} add-user <users_file> <role> [secret_key]", args[0]);
        eprintln!("       role is one of admin, instructor, student");
        eprintln!("       (If secret_key is not provided, it is read from AUTH_SECRET env var)");
        eprintln!("       (Credentials are read from stdin/prompt)");
        std::process::exit(1);
    }

    let users_file_path = &args[2];
    let role: Role = args[3].parse()?;

    let secret_key = match args.get(4) {
        Some(key) => key.clone(),
        None => env::var("AUTH_SECRET").context("AUTH_SECRET env var not set and key not provided")?,
    };

    let username = prompt("Enter username: ")?;
    if username.is_empty() {
        bail!("username must not be empty");
    }
    let password = prompt("Enter password: ")?;

    let new_user = User::with_password(username.clone(), &password, role)?;

    let mut users = Vec::new();
    if Path::new(users_file_path).exists() {
        let content = fs::read_to_string(users_file_path)?;
        if !content.trim().is_empty() {
            match decrypt_users(&content, &secret_key) {
                Ok(existing_users) => {
                    users = existing_users;
                    if users.iter().any(|u| u.username == username) {
                        eprintln!("User {} already exists. Updating password and role.", username);
                        users.retain(|u| u.username != username);
                    }
                }
                Err(_) => {
                    eprintln!("Warning: Could not decrypt existing users file. Overwriting.");
                }
            }
        }
    }

    users.push(new_user);

    let encrypted_content = encrypt_users(&users, &secret_key).context("Failed to encrypt users")?;
    fs::write(users_file_path, encrypted_content).context("Failed to write users file")?;

    println!("User {} ({}) added/updated successfully in {}", username, role, users_file_path);
    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
